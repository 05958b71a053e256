//! Migration Runner - Applies pending changesets against the remote backend
//!
//! Resolves the tracking namespace, computes the pending set from the
//! ledger, applies each changeset's operations in order and records every
//! success in the ledger.

use std::time::Instant;

use realmshift_core::config::DEFAULT_NAMESPACE;
use realmshift_core::{Changeset, MigratorConfig, MigratorResult, OperationExecutor};

use super::definitions::{MigrationError, MigrationFailure, MigrationResult, MigrationStatus};
use super::ledger::AttributeLedger;

/// Migration runner that drives an [`OperationExecutor`]
pub struct MigrationRunner<'a, E: OperationExecutor + ?Sized> {
    executor: &'a E,
    ledger: AttributeLedger<'a, E>,
    default_namespace: String,
}

impl<'a, E: OperationExecutor + ?Sized> MigrationRunner<'a, E> {
    /// Create a runner with the default ledger keys and fallback namespace
    pub fn new(executor: &'a E) -> Self {
        Self {
            executor,
            ledger: AttributeLedger::new(executor),
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Create a runner following the migrator configuration
    pub fn with_config(executor: &'a E, config: &MigratorConfig) -> Self {
        Self {
            executor,
            ledger: AttributeLedger::with_config(executor, config),
            default_namespace: config.get_default_namespace().clone(),
        }
    }

    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    pub fn ledger(&self) -> &AttributeLedger<'a, E> {
        &self.ledger
    }

    /// Pick the namespace whose ledger decides what is pending
    ///
    /// An existing hint wins, then the first existing operation target in
    /// changeset order, then the hint itself or the default namespace.
    pub fn determine_tracking_namespace(
        &self,
        changesets: &[Changeset],
        target_namespace: Option<&str>,
    ) -> String {
        let hint = target_namespace.map(str::trim).filter(|ns| !ns.is_empty());

        if let Some(namespace) = hint {
            if self.executor.namespace_exists(namespace) {
                return namespace.to_string();
            }
        }

        let existing = changesets
            .iter()
            .flat_map(|c| c.operations())
            .filter_map(|op| op.target_namespace())
            .find(|ns| self.executor.namespace_exists(ns));

        match existing {
            Some(namespace) => namespace.to_string(),
            None => hint.unwrap_or(self.default_namespace.as_str()).to_string(),
        }
    }

    /// Changesets a run would apply, without touching the remote side
    pub fn preview_migrations<'c>(
        &self,
        changesets: &'c [Changeset],
        target_namespace: Option<&str>,
    ) -> MigratorResult<Vec<&'c Changeset>> {
        let namespace = self.determine_tracking_namespace(changesets, target_namespace);
        Ok(self.ledger.pending_changesets(&namespace, changesets)?)
    }

    /// Ledger status of the tracking namespace
    pub fn status(
        &self,
        changesets: &[Changeset],
        target_namespace: Option<&str>,
    ) -> MigratorResult<MigrationStatus> {
        let namespace = self.determine_tracking_namespace(changesets, target_namespace);
        Ok(self.ledger.status(&namespace, changesets)?)
    }

    /// Apply every pending changeset in version order
    pub fn execute_migrations(
        &self,
        changesets: &[Changeset],
        target_namespace: Option<&str>,
    ) -> MigratorResult<MigrationResult> {
        let start_time = Instant::now();

        let tracking_namespace = self.determine_tracking_namespace(changesets, target_namespace);
        tracing::info!("Using tracking namespace: {}", tracking_namespace);

        let pending = self
            .ledger
            .pending_changesets(&tracking_namespace, changesets)?;

        let mut result = MigrationResult::empty(tracking_namespace.clone());
        result.total_pending = pending.len();

        if pending.is_empty() {
            tracing::info!("No pending changesets, namespace is up to date");
            result.execution_time_ms = start_time.elapsed().as_millis();
            return Ok(result);
        }

        tracing::info!("Found {} pending changesets", pending.len());

        for changeset in pending {
            tracing::info!(
                "Applying changeset {} by {}{}",
                changeset.version(),
                changeset.author(),
                changeset
                    .comment()
                    .map(|c| format!(": {}", c))
                    .unwrap_or_default()
            );

            let outcome = self
                .execute_changeset(changeset)
                .and_then(|()| self.record(changeset, &tracking_namespace));

            match outcome {
                Ok(()) => result.applied.push(changeset.clone()),
                Err(failure) => {
                    let error = MigrationError {
                        changeset: changeset.clone(),
                        failure,
                    };
                    tracing::error!("{}", error);
                    result.errors.push(error);

                    if changeset.fail_on_error() {
                        tracing::error!(
                            "Stopping migration run at changeset {}",
                            changeset.version()
                        );
                        result.aborted_at = Some(changeset.version());
                        break;
                    }

                    tracing::warn!(
                        "Continuing after failed changeset {} (failOnError is false)",
                        changeset.version()
                    );
                }
            }
        }

        result.total_applied = result.applied.len();
        result.execution_time_ms = start_time.elapsed().as_millis();

        tracing::info!(
            "Migration run finished: {} of {} applied, {} failed in {}ms",
            result.total_applied,
            result.total_pending,
            result.errors.len(),
            result.execution_time_ms
        );
        Ok(result)
    }

    /// Apply one changeset's operations in order, stopping at the first failure
    pub fn execute_changeset(&self, changeset: &Changeset) -> Result<(), MigrationFailure> {
        let total = changeset.operations().len();

        for (index, operation) in changeset.operations().iter().enumerate() {
            tracing::debug!(
                "Executing operation {}/{}: {}",
                index + 1,
                total,
                operation.describe()
            );

            operation
                .apply(self.executor)
                .map_err(|source| MigrationFailure::Operation {
                    index,
                    description: operation.describe(),
                    source,
                })?;
        }

        Ok(())
    }

    fn record(&self, changeset: &Changeset, tracking_namespace: &str) -> Result<(), MigrationFailure> {
        let namespace = self.affected_namespace(changeset, tracking_namespace);

        if !self.executor.namespace_exists(&namespace) {
            tracing::warn!(
                "Namespace '{}' does not exist, changeset {} was applied but not recorded",
                namespace,
                changeset.version()
            );
            return Ok(());
        }

        self.ledger
            .record_migration(&namespace, changeset)
            .map(|_| ())
            .map_err(MigrationFailure::Ledger)
    }

    /// First operation target that exists now, else the tracking namespace
    fn affected_namespace(&self, changeset: &Changeset, tracking_namespace: &str) -> String {
        changeset
            .operations()
            .iter()
            .filter_map(|op| op.target_namespace())
            .find(|ns| self.executor.namespace_exists(ns))
            .unwrap_or(tracking_namespace)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryTarget;
    use realmshift_core::model::{NamedSpec, RealmSpec};
    use realmshift_core::{AttributeStore, MigratorConfigBuilder, MigratorError, Operation};
    use serde_json::Map;

    fn create_realm(name: &str) -> Operation {
        Operation::CreateRealm(RealmSpec {
            name: name.to_string(),
            settings: Map::new(),
        })
    }

    fn create_group(realm: &str, name: &str) -> Operation {
        Operation::CreateGroup(NamedSpec {
            realm: realm.to_string(),
            name: name.to_string(),
            settings: Map::new(),
        })
    }

    #[test]
    fn test_tracking_namespace_prefers_existing_hint() {
        let target = InMemoryTarget::new().with_namespace("acme").with_namespace("other");
        let runner = MigrationRunner::new(&target);
        let changesets =
            vec![Changeset::new(1, "a").with_operation(create_group("other", "staff"))];

        assert_eq!(
            runner.determine_tracking_namespace(&changesets, Some("acme")),
            "acme"
        );
        assert_eq!(
            runner.determine_tracking_namespace(&changesets, Some("missing")),
            "other"
        );
        assert_eq!(
            runner.determine_tracking_namespace(&changesets, Some("  ")),
            "other"
        );
    }

    #[test]
    fn test_tracking_namespace_fallbacks() {
        let target = InMemoryTarget::new();
        let runner = MigrationRunner::new(&target);
        let changesets = vec![Changeset::new(1, "a").with_operation(create_realm("acme"))];

        assert_eq!(
            runner.determine_tracking_namespace(&changesets, Some("acme")),
            "acme"
        );
        assert_eq!(runner.determine_tracking_namespace(&changesets, None), "master");

        let runner = runner.with_default_namespace("root");
        assert_eq!(runner.determine_tracking_namespace(&[], None), "root");
    }

    #[test]
    fn test_execute_changeset_stops_at_first_failure() {
        let target = InMemoryTarget::new().with_namespace("acme");
        let runner = MigrationRunner::new(&target);
        let changeset = Changeset::new(1, "a")
            .with_operation(create_group("acme", "one"))
            .with_operation(create_group("ghost", "two"))
            .with_operation(create_group("acme", "three"));

        match runner.execute_changeset(&changeset).unwrap_err() {
            MigrationFailure::Operation {
                index, description, ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(description, "Create group 'two' in realm 'ghost'");
            }
            other => panic!("unexpected failure: {}", other),
        }
        assert_eq!(target.applied_operations().len(), 1);
    }

    #[test]
    fn test_first_run_records_in_created_namespace() {
        let target = InMemoryTarget::new();
        let runner = MigrationRunner::new(&target);
        let changesets = vec![
            Changeset::new(1, "a").with_operation(create_realm("acme")),
            Changeset::new(2, "a").with_operation(create_group("acme", "staff")),
        ];

        let result = runner.execute_migrations(&changesets, None).unwrap();
        assert_eq!(result.tracking_namespace, "master");
        assert_eq!(result.total_applied, 2);
        assert_eq!(runner.ledger().last_applied_version("acme").unwrap(), 2);

        let again = runner.execute_migrations(&changesets, None).unwrap();
        assert_eq!(again.tracking_namespace, "acme");
        assert_eq!(again.total_pending, 0);
    }

    #[test]
    fn test_unrecordable_changeset_still_counts_as_applied() {
        let target = InMemoryTarget::new().with_namespace("acme");
        let runner = MigrationRunner::new(&target);
        let changesets = vec![Changeset::new(1, "a").with_operation(Operation::DeleteRealm(
            realmshift_core::model::RealmRef {
                name: "acme".to_string(),
            },
        ))];

        let result = runner.execute_migrations(&changesets, Some("acme")).unwrap();
        assert!(result.is_success());
        assert_eq!(result.total_applied, 1);
        assert!(target.namespaces().is_empty());
    }

    #[test]
    fn test_ledger_write_failure_follows_fail_on_error() {
        let target = InMemoryTarget::new()
            .with_namespace("acme")
            .fail_attribute_writes("migrator.lastVersion");
        let runner = MigrationRunner::new(&target);
        let changesets = vec![
            Changeset::new(1, "a")
                .with_fail_on_error(false)
                .with_operation(create_group("acme", "one")),
            Changeset::new(2, "a").with_operation(create_group("acme", "two")),
            Changeset::new(3, "a").with_operation(create_group("acme", "three")),
        ];

        let result = runner.execute_migrations(&changesets, Some("acme")).unwrap();
        assert_eq!(result.total_applied, 0);
        assert_eq!(result.errors.len(), 2);
        assert!(matches!(result.errors[0].failure, MigrationFailure::Ledger(_)));
        assert_eq!(result.aborted_at, Some(2));
        assert_eq!(target.applied_operations().len(), 2);
    }

    #[test]
    fn test_ledger_read_failure_aborts_before_mutation() {
        let target = InMemoryTarget::new()
            .with_namespace("acme")
            .fail_attribute_reads("acme");
        let runner = MigrationRunner::new(&target);
        let changesets = vec![Changeset::new(1, "a").with_operation(create_group("acme", "one"))];

        let err = runner.execute_migrations(&changesets, Some("acme")).unwrap_err();
        assert!(matches!(err, MigratorError::Ledger(_)));
        assert!(target.applied_operations().is_empty());
        assert!(runner.preview_migrations(&changesets, Some("acme")).is_err());
    }

    #[test]
    fn test_runner_with_config_keys() {
        let target = InMemoryTarget::new().with_namespace("acme");
        let config = MigratorConfigBuilder::new()
            .last_version_key("release".to_string())
            .default_namespace("acme".to_string())
            .build()
            .expect("Failed to build config");
        let runner = MigrationRunner::with_config(&target, &config);
        let changesets = vec![Changeset::new(4, "a").with_operation(create_group("acme", "x"))];

        let result = runner.execute_migrations(&changesets, None).unwrap();
        assert_eq!(result.tracking_namespace, "acme");
        assert_eq!(target.attribute("acme", "release").as_deref(), Some("4"));
        assert_eq!(runner.determine_tracking_namespace(&[], None), "acme");
        assert!(target.namespace_exists("acme"));
    }

    #[test]
    fn test_dyn_executor() {
        let target = InMemoryTarget::new().with_namespace("acme");
        let executor: &dyn OperationExecutor = &target;
        let runner = MigrationRunner::new(executor);
        let changesets = vec![Changeset::new(1, "a").with_operation(create_group("acme", "x"))];

        let status = runner.status(&changesets, Some("acme")).unwrap();
        assert_eq!(status.pending_count, 1);
    }
}

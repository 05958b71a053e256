//! Migration ledger stored in remote namespace attributes
//!
//! Two attributes per namespace hold the state: the last applied version as
//! a stringified integer, and the full history as a JSON array of
//! [`MigrationRecord`]s.

use realmshift_core::config::{DEFAULT_HISTORY_KEY, DEFAULT_LAST_VERSION_KEY};
use realmshift_core::{AttributeStore, Changeset, LedgerError, LedgerResult, MigratorConfig};
use std::collections::HashMap;

use super::definitions::{MigrationRecord, MigrationStatus};

/// Reads and writes migration state through an [`AttributeStore`]
pub struct AttributeLedger<'a, S: AttributeStore + ?Sized> {
    store: &'a S,
    last_version_key: String,
    history_key: String,
}

impl<'a, S: AttributeStore + ?Sized> AttributeLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_keys(store, DEFAULT_LAST_VERSION_KEY, DEFAULT_HISTORY_KEY)
    }

    pub fn with_keys(
        store: &'a S,
        last_version_key: impl Into<String>,
        history_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            last_version_key: last_version_key.into(),
            history_key: history_key.into(),
        }
    }

    pub fn with_config(store: &'a S, config: &MigratorConfig) -> Self {
        Self::with_keys(
            store,
            config.get_last_version_key().clone(),
            config.get_history_key().clone(),
        )
    }

    pub fn last_version_key(&self) -> &str {
        &self.last_version_key
    }

    pub fn history_key(&self) -> &str {
        &self.history_key
    }

    fn read_attributes(&self, namespace: &str) -> LedgerResult<Option<HashMap<String, String>>> {
        if !self.store.namespace_exists(namespace) {
            return Ok(None);
        }

        self.store
            .attributes(namespace)
            .map(Some)
            .map_err(|source| LedgerError::Read {
                namespace: namespace.to_string(),
                source,
            })
    }

    /// Last applied version, 0 when nothing usable is recorded
    pub fn last_applied_version(&self, namespace: &str) -> LedgerResult<u32> {
        let attributes = match self.read_attributes(namespace)? {
            Some(attributes) => attributes,
            None => return Ok(0),
        };

        let raw = match attributes.get(&self.last_version_key) {
            Some(raw) => raw,
            None => return Ok(0),
        };

        match raw.trim().parse::<u32>() {
            Ok(version) => Ok(version),
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed '{}' attribute in namespace '{}' ({:?}): {}",
                    self.last_version_key,
                    namespace,
                    raw,
                    e
                );
                Ok(0)
            }
        }
    }

    /// Recorded history in write order, empty when absent or malformed
    pub fn history(&self, namespace: &str) -> LedgerResult<Vec<MigrationRecord>> {
        let attributes = match self.read_attributes(namespace)? {
            Some(attributes) => attributes,
            None => return Ok(Vec::new()),
        };

        let raw = match attributes.get(&self.history_key) {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Vec::new()),
        };

        match serde_json::from_str::<Vec<MigrationRecord>>(raw) {
            Ok(history) => Ok(history),
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed '{}' attribute in namespace '{}': {}",
                    self.history_key,
                    namespace,
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    pub fn is_version_applied(&self, namespace: &str, version: u32) -> LedgerResult<bool> {
        Ok(self
            .history(namespace)?
            .iter()
            .any(|record| record.version == version))
    }

    /// Append the changeset to the history and advance the last version
    pub fn record_migration(
        &self,
        namespace: &str,
        changeset: &Changeset,
    ) -> LedgerResult<MigrationRecord> {
        let mut history = self.history(namespace)?;
        let record = MigrationRecord::for_changeset(changeset);
        history.push(record.clone());

        match serde_json::to_string(&history) {
            Ok(serialized) => self.write(namespace, &self.history_key, &serialized)?,
            Err(e) => tracing::warn!(
                "Failed to serialize migration history for namespace '{}': {}",
                namespace,
                e
            ),
        }

        self.write(
            namespace,
            &self.last_version_key,
            &changeset.version().to_string(),
        )?;

        tracing::debug!(
            "Recorded migration {} in namespace '{}'",
            changeset.id(),
            namespace
        );
        Ok(record)
    }

    fn write(&self, namespace: &str, key: &str, value: &str) -> LedgerResult<()> {
        self.store
            .set_attribute(namespace, key, value)
            .map_err(|source| LedgerError::Write {
                namespace: namespace.to_string(),
                key: key.to_string(),
                source,
            })
    }

    /// Changesets above the last applied version, ascending
    pub fn pending_changesets<'c>(
        &self,
        namespace: &str,
        changesets: &'c [Changeset],
    ) -> LedgerResult<Vec<&'c Changeset>> {
        let last_applied = self.last_applied_version(namespace)?;

        let mut pending: Vec<&Changeset> = changesets
            .iter()
            .filter(|c| c.version() > last_applied)
            .collect();
        pending.sort_by_key(|c| c.version());

        Ok(pending)
    }

    pub fn status(&self, namespace: &str, changesets: &[Changeset]) -> LedgerResult<MigrationStatus> {
        let last_applied_version = self.last_applied_version(namespace)?;
        let history = self.history(namespace)?;
        let available_version = changesets.iter().map(|c| c.version()).max().unwrap_or(0);
        let pending_count = changesets
            .iter()
            .filter(|c| c.version() > last_applied_version)
            .count();

        Ok(MigrationStatus {
            namespace: namespace.to_string(),
            last_applied_version,
            available_version,
            pending_count,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryTarget;

    fn changesets(versions: &[u32]) -> Vec<Changeset> {
        versions
            .iter()
            .map(|v| Changeset::new(*v, "tester").with_comment(format!("change {}", v)))
            .collect()
    }

    #[test]
    fn test_fresh_namespace_has_nothing_applied() {
        let target = InMemoryTarget::new();
        let ledger = AttributeLedger::new(&target);

        assert_eq!(ledger.last_applied_version("acme").unwrap(), 0);
        assert!(ledger.history("acme").unwrap().is_empty());

        let all = changesets(&[1, 2]);
        let pending = ledger.pending_changesets("acme", &all).unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_record_migration_is_monotonic() {
        let target = InMemoryTarget::new().with_namespace("acme");
        let ledger = AttributeLedger::new(&target);
        let all = changesets(&[1, 2]);

        ledger.record_migration("acme", &all[0]).unwrap();
        let before = ledger.history("acme").unwrap().len();
        let record = ledger.record_migration("acme", &all[1]).unwrap();

        assert_eq!(ledger.last_applied_version("acme").unwrap(), 2);
        let history = ledger.history("acme").unwrap();
        assert_eq!(history.len(), before + 1);

        let last = history.last().unwrap();
        assert_eq!(last, &record);
        assert_eq!(last.version, 2);
        assert_eq!(last.author, "tester");
        assert_eq!(last.comment.as_deref(), Some("change 2"));
        assert!(ledger.is_version_applied("acme", 1).unwrap());
        assert!(!ledger.is_version_applied("acme", 3).unwrap());
    }

    #[test]
    fn test_storage_format() {
        let target = InMemoryTarget::new().with_namespace("acme");
        let ledger = AttributeLedger::new(&target);
        ledger
            .record_migration("acme", &Changeset::new(7, "ops"))
            .unwrap();

        assert_eq!(
            target.attribute("acme", "migrator.lastVersion").as_deref(),
            Some("7")
        );
        let history: serde_json::Value =
            serde_json::from_str(&target.attribute("acme", "migrator.history").unwrap()).unwrap();
        assert_eq!(history[0]["version"], 7);
        assert_eq!(history[0]["author"], "ops");
        assert!(history[0]["appliedAt"].is_string());
    }

    #[test]
    fn test_custom_keys() {
        let target = InMemoryTarget::new().with_namespace("acme");
        let ledger = AttributeLedger::with_keys(&target, "v", "h");
        ledger
            .record_migration("acme", &Changeset::new(1, "ops"))
            .unwrap();

        assert_eq!(target.attribute("acme", "v").as_deref(), Some("1"));
        assert!(target.attribute("acme", "h").is_some());
        assert_eq!(target.attribute("acme", "migrator.lastVersion"), None);
    }

    #[test]
    fn test_malformed_ledger_is_soft() {
        let target = InMemoryTarget::new().with_namespace("acme");
        target.set_attribute("acme", "migrator.lastVersion", "seven").unwrap();
        target.set_attribute("acme", "migrator.history", "{not json").unwrap();
        let ledger = AttributeLedger::new(&target);

        assert_eq!(ledger.last_applied_version("acme").unwrap(), 0);
        assert!(ledger.history("acme").unwrap().is_empty());

        target.set_attribute("acme", "migrator.lastVersion", " 3 ").unwrap();
        assert_eq!(ledger.last_applied_version("acme").unwrap(), 3);
    }

    #[test]
    fn test_epoch_timestamps_are_readable() {
        let target = InMemoryTarget::new().with_namespace("acme");
        target
            .set_attribute(
                "acme",
                "migrator.history",
                r#"[{"version":1,"author":"legacy","appliedAt":1700000000,"comment":"imported"}]"#,
            )
            .unwrap();
        let ledger = AttributeLedger::new(&target);

        let history = ledger.history("acme").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].applied_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_pending_is_sorted_and_idempotent() {
        let target = InMemoryTarget::new().with_namespace("acme");
        target.set_attribute("acme", "migrator.lastVersion", "2").unwrap();
        let ledger = AttributeLedger::new(&target);
        let all = changesets(&[5, 1, 3, 2, 4]);

        let first: Vec<u32> = ledger
            .pending_changesets("acme", &all)
            .unwrap()
            .iter()
            .map(|c| c.version())
            .collect();
        let second: Vec<u32> = ledger
            .pending_changesets("acme", &all)
            .unwrap()
            .iter()
            .map(|c| c.version())
            .collect();

        assert_eq!(first, vec![3, 4, 5]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_status() {
        let target = InMemoryTarget::new().with_namespace("acme");
        let ledger = AttributeLedger::new(&target);
        let all = changesets(&[1, 2, 3]);
        ledger.record_migration("acme", &all[0]).unwrap();

        let status = ledger.status("acme", &all).unwrap();
        assert_eq!(status.namespace, "acme");
        assert_eq!(status.last_applied_version, 1);
        assert_eq!(status.available_version, 3);
        assert_eq!(status.pending_count, 2);
        assert_eq!(status.history.len(), 1);
        assert!(!status.is_up_to_date());

        let empty = ledger.status("acme", &[]).unwrap();
        assert_eq!(empty.available_version, 0);
        assert!(empty.is_up_to_date());
    }

    #[test]
    fn test_history_write_failure_does_not_advance_version() {
        let target = InMemoryTarget::new()
            .with_namespace("acme")
            .fail_attribute_writes("migrator.history");
        let ledger = AttributeLedger::new(&target);

        let err = ledger
            .record_migration("acme", &Changeset::new(1, "ops"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Write { ref key, .. } if key == "migrator.history"));
        assert_eq!(ledger.last_applied_version("acme").unwrap(), 0);
    }

    #[test]
    fn test_remote_read_failure_is_an_error() {
        let target = InMemoryTarget::new()
            .with_namespace("acme")
            .fail_attribute_reads("acme");
        let ledger = AttributeLedger::new(&target);

        assert!(matches!(
            ledger.last_applied_version("acme"),
            Err(LedgerError::Read { .. })
        ));
        assert!(ledger.pending_changesets("acme", &changesets(&[1])).is_err());
    }
}

//! Load-then-run workflow driven by [`MigratorConfig`]

use std::path::Path;

use realmshift_core::{
    Changeset, ChangesetCollection, MigratorConfig, MigratorResult, OperationExecutor,
};

use crate::migrations::{
    ChangesetLoader, MigrationResult, MigrationRunner, MigrationStatus, ValidationResult,
};

/// Entry points for preview, migrate, status and validate runs
pub struct MigrationWorkflow {
    config: MigratorConfig,
    loader: ChangesetLoader,
}

impl MigrationWorkflow {
    pub fn new(config: MigratorConfig) -> MigratorResult<Self> {
        config.validate()?;
        let loader = ChangesetLoader::with_config(&config)?;
        Ok(Self { config, loader })
    }

    /// Build from `REALMSHIFT_*` environment variables
    pub fn from_env() -> MigratorResult<Self> {
        Self::new(MigratorConfig::from_env()?)
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    pub fn loader(&self) -> &ChangesetLoader {
        &self.loader
    }

    /// Load the configured changelog directory
    pub fn load(&self) -> MigratorResult<ChangesetCollection> {
        Ok(self.loader.load_directory(self.config.get_changelog_dir())?)
    }

    /// Changesets a migrate run would apply
    pub fn preview<E>(&self, executor: &E) -> MigratorResult<Vec<Changeset>>
    where
        E: OperationExecutor + ?Sized,
    {
        let changesets = self.load()?;
        let runner = MigrationRunner::with_config(executor, &self.config);
        let pending = runner.preview_migrations(&changesets, self.config.target_namespace_hint())?;

        tracing::info!("Dry run: {} changesets would be applied", pending.len());
        Ok(pending.into_iter().cloned().collect())
    }

    /// Load and apply every pending changeset
    pub fn migrate<E>(&self, executor: &E) -> MigratorResult<MigrationResult>
    where
        E: OperationExecutor + ?Sized,
    {
        let changesets = self.load()?;

        if changesets.is_empty() {
            tracing::info!(
                "No changesets found in {}",
                self.config.get_changelog_dir().display()
            );
            let namespace = self
                .config
                .target_namespace_hint()
                .unwrap_or(self.config.get_default_namespace().as_str());
            return Ok(MigrationResult::empty(namespace));
        }

        let runner = MigrationRunner::with_config(executor, &self.config);
        runner.execute_migrations(&changesets, self.config.target_namespace_hint())
    }

    pub fn status<E>(&self, executor: &E) -> MigratorResult<MigrationStatus>
    where
        E: OperationExecutor + ?Sized,
    {
        let changesets = self.load()?;
        let runner = MigrationRunner::with_config(executor, &self.config);
        runner.status(&changesets, self.config.target_namespace_hint())
    }

    /// Validate a file or directory, defaulting to the changelog directory
    pub fn validate(&self, path: Option<&Path>) -> MigratorResult<Vec<ValidationResult>> {
        let path = path.unwrap_or(self.config.get_changelog_dir().as_path());

        if path.is_dir() {
            Ok(self.loader.validate_directory(path)?)
        } else {
            Ok(vec![self.loader.validate(path)])
        }
    }
}

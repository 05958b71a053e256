//! # realmshift-migrator
//!
//! Versioned configuration changes for REST-administered identity backends.
//! Changelog files are loaded into an ordered changeset collection, the
//! pending subset is computed from a ledger kept in the target's own
//! namespace attributes, and each pending changeset is applied in order.
//!
//! ```no_run
//! use realmshift_migrator::{InMemoryTarget, MigrationWorkflow, MigratorConfig};
//!
//! let workflow = MigrationWorkflow::new(MigratorConfig::default())?;
//! let result = workflow.migrate(&InMemoryTarget::new())?;
//! println!("applied {} of {}", result.total_applied, result.total_pending);
//! # Ok::<(), realmshift_migrator::MigratorError>(())
//! ```

pub mod backends;
pub mod logging;
pub mod migrations;
pub mod workflow;

pub use backends::InMemoryTarget;
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use migrations::{
    AttributeLedger, ChangesetLoader, MigrationError, MigrationFailure, MigrationRecord,
    MigrationResult, MigrationRunner, MigrationStatus, ValidationResult,
};
pub use workflow::MigrationWorkflow;

pub use realmshift_core::{
    AttributeStore, ChangeLog, Changeset, ChangesetCollection, LedgerError, LoadError,
    MigratorConfig, MigratorConfigBuilder, MigratorError, MigratorResult, Operation,
    OperationError, OperationExecutor,
};

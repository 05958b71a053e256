//! # realmshift-core
//!
//! Shared building blocks for versioned, repeatable configuration changes
//! against a REST-administered identity backend: the changeset model,
//! operation variants, error taxonomy, configuration, and the ports the
//! migrator uses to reach the remote side.

pub mod config;
pub mod error;
pub mod model;
pub mod remote;

pub use config::{ConfigError, MigratorConfig, MigratorConfigBuilder};
pub use error::{
    LedgerError, LedgerResult, LoadError, LoadResult, MigratorError, MigratorResult,
    OperationError,
};
pub use model::{ChangeLog, Changeset, ChangesetCollection, Include, Operation};
pub use remote::{AttributeStore, OperationExecutor};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error taxonomy for changeset loading, remote operations and the ledger
//!
//! Load-time errors (`LoadError`) always surface before any remote mutation.
//! Execution-time errors (`OperationError`, `LedgerError`) are captured per
//! changeset by the migration runner.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for loading changelog definitions
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for ledger reads and writes
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result type for migrator entry points
pub type MigratorResult<T> = Result<T, MigratorError>;

/// Errors raised while turning definition files into a changeset collection
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to parse changelog '{}': {message}", .file.display())]
    Parse { file: PathBuf, message: String },

    #[error(
        "Duplicate changeset version {version}: declared by '{first_author}' in {} and by '{second_author}' in {}",
        display_source(.first_file),
        display_source(.second_file)
    )]
    DuplicateVersion {
        version: u32,
        first_author: String,
        first_file: Option<PathBuf>,
        second_author: String,
        second_file: Option<PathBuf>,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Cyclic include detected: {chain}")]
    CyclicInclude { chain: String },

    #[error("Changelog schema error: {message}")]
    Schema { message: String },
}

fn display_source(file: &Option<PathBuf>) -> String {
    match file {
        Some(path) => format!("'{}'", path.display()),
        None => "<memory>".to_string(),
    }
}

impl LoadError {
    /// Create a parse error for the given file
    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Version named by a duplicate-version error
    pub fn duplicate_version(&self) -> Option<u32> {
        match self {
            Self::DuplicateVersion { version, .. } => Some(*version),
            _ => None,
        }
    }
}

/// A single remote call was rejected or failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct OperationError {
    reason: String,
}

impl OperationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The reason phrase reported by the remote side
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Errors talking to the attribute store that backs the ledger
///
/// Malformed ledger payloads are not errors; they read as "nothing applied".
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Failed to read ledger attributes of namespace '{namespace}': {source}")]
    Read {
        namespace: String,
        source: OperationError,
    },

    #[error("Failed to write ledger attribute '{key}' of namespace '{namespace}': {source}")]
    Write {
        namespace: String,
        key: String,
        source: OperationError,
    },
}

/// Aggregate error for migrator entry points
#[derive(Debug, Error)]
pub enum MigratorError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_version_message_names_both_sides() {
        let err = LoadError::DuplicateVersion {
            version: 7,
            first_author: "alice".to_string(),
            first_file: Some(PathBuf::from("a/001.yaml")),
            second_author: "bob".to_string(),
            second_file: None,
        };

        let message = err.to_string();
        assert!(message.contains("Duplicate changeset version 7"));
        assert!(message.contains("'alice' in 'a/001.yaml'"));
        assert!(message.contains("'bob' in <memory>"));
        assert_eq!(err.duplicate_version(), Some(7));
    }

    #[test]
    fn test_migrator_error_is_transparent() {
        let err: MigratorError = OperationError::new("409 Conflict").into();
        assert_eq!(err.to_string(), "409 Conflict");

        let err: MigratorError = LoadError::invalid_input("Not a directory: x").into();
        assert_eq!(err.to_string(), "Invalid input: Not a directory: x");
    }
}

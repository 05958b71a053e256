//! Migration Definitions - Ledger records and run outcomes
//!
//! Defines the types produced by the ledger and the runner: MigrationRecord,
//! MigrationStatus, MigrationResult, MigrationError and ValidationResult.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

use realmshift_core::{Changeset, LedgerError, OperationError};

/// One successfully applied changeset, as stored in the ledger history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    /// Changeset version
    pub version: u32,
    /// Changeset author
    pub author: String,
    /// When the changeset was recorded
    #[serde(deserialize_with = "deserialize_applied_at")]
    pub applied_at: DateTime<Utc>,
    /// Changeset comment, carried for audit purposes
    #[serde(default)]
    pub comment: Option<String>,
}

impl MigrationRecord {
    /// Record a changeset as applied now
    pub fn for_changeset(changeset: &Changeset) -> Self {
        Self {
            version: changeset.version(),
            author: changeset.author().to_string(),
            applied_at: Utc::now(),
            comment: changeset.comment().map(str::to_string),
        }
    }
}

/// `appliedAt` is written as RFC 3339; epoch seconds are accepted on read
#[derive(Deserialize)]
#[serde(untagged)]
enum AppliedAt {
    Text(String),
    EpochSeconds(f64),
}

fn deserialize_applied_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match AppliedAt::deserialize(deserializer)? {
        AppliedAt::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
        AppliedAt::EpochSeconds(seconds) => {
            let whole = seconds.floor();
            let nanos = ((seconds - whole) * 1_000_000_000.0).round() as u32;
            Utc.timestamp_opt(whole as i64, nanos.min(999_999_999))
                .single()
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", seconds)))
        }
    }
}

/// Derived view of a namespace's migration state
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationStatus {
    /// Namespace the ledger was read from
    pub namespace: String,
    /// Last version recorded in the ledger, 0 if none
    pub last_applied_version: u32,
    /// Highest version among the loaded changesets, 0 if none
    pub available_version: u32,
    /// Number of loaded changesets above the last applied version
    pub pending_count: usize,
    /// Ledger history in recorded order
    pub history: Vec<MigrationRecord>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending_count == 0
    }
}

/// Why a changeset could not be completed
#[derive(Debug, Clone)]
pub enum MigrationFailure {
    /// An operation was rejected; later operations of the changeset did not run
    Operation {
        /// Zero-based position of the failed operation
        index: usize,
        description: String,
        source: OperationError,
    },
    /// All operations succeeded but the ledger could not be updated
    Ledger(LedgerError),
}

impl fmt::Display for MigrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationFailure::Operation {
                index,
                description,
                source,
            } => write!(f, "operation {} ({}) failed: {}", index + 1, description, source),
            MigrationFailure::Ledger(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for MigrationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationFailure::Operation { source, .. } => Some(source),
            MigrationFailure::Ledger(err) => Some(err),
        }
    }
}

/// A changeset that failed during a run, with its cause
#[derive(Debug, Clone)]
pub struct MigrationError {
    pub changeset: Changeset,
    pub failure: MigrationFailure,
}

impl MigrationError {
    pub fn message(&self) -> String {
        format!("Changeset {}: {}", self.changeset.version(), self.failure)
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Result of running migrations
#[derive(Debug, Clone)]
pub struct MigrationResult {
    /// Namespace the run was tracked against
    pub tracking_namespace: String,
    /// Number of changesets that were pending at the start of the run
    pub total_pending: usize,
    /// Number of changesets that were applied and recorded
    pub total_applied: usize,
    /// Changesets that were applied, in order
    pub applied: Vec<Changeset>,
    /// Failures, in order
    pub errors: Vec<MigrationError>,
    /// Version of the fail-fast changeset that stopped the run, if any
    pub aborted_at: Option<u32>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationResult {
    /// Result of a run that had nothing to do
    pub fn empty(tracking_namespace: impl Into<String>) -> Self {
        Self {
            tracking_namespace: tracking_namespace.into(),
            total_pending: 0,
            total_applied: 0,
            applied: Vec::new(),
            errors: Vec::new(),
            aborted_at: None,
            execution_time_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted_at.is_some()
    }
}

/// Result of validating a changelog file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub file: PathBuf,
    /// Error description if invalid
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid(file: impl Into<PathBuf>) -> Self {
        Self {
            valid: true,
            file: file.into(),
            error: None,
        }
    }

    pub fn invalid(file: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            file: file.into(),
            error: Some(error.into()),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "VALID: {}", self.file.display()),
            Some(error) => write!(f, "INVALID: {} - {}", self.file.display(), error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip_uses_rfc3339() {
        let changeset = Changeset::new(4, "alice").with_comment("add roles");
        let record = MigrationRecord::for_changeset(&changeset);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["version"], 4);
        assert_eq!(json["author"], "alice");
        assert_eq!(json["comment"], "add roles");
        assert!(json["appliedAt"].is_string());

        let back: MigrationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_accepts_epoch_seconds() {
        let record: MigrationRecord = serde_json::from_str(
            r#"{"version":1,"author":"bob","appliedAt":1700000000.5,"comment":null}"#,
        )
        .unwrap();

        assert_eq!(record.applied_at.timestamp(), 1_700_000_000);
        assert_eq!(record.applied_at.timestamp_subsec_millis(), 500);
        assert_eq!(record.comment, None);
    }

    #[test]
    fn test_record_rejects_garbage_timestamp() {
        let result: Result<MigrationRecord, _> =
            serde_json::from_str(r#"{"version":1,"author":"bob","appliedAt":"yesterday"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_migration_error_message() {
        let error = MigrationError {
            changeset: Changeset::new(3, "carol"),
            failure: MigrationFailure::Operation {
                index: 1,
                description: "Create user 'bob' in realm 'demo'".to_string(),
                source: OperationError::new("409 Conflict"),
            },
        };

        assert_eq!(
            error.message(),
            "Changeset 3: operation 2 (Create user 'bob' in realm 'demo') failed: 409 Conflict"
        );
    }

    #[test]
    fn test_validation_result_display() {
        assert_eq!(ValidationResult::valid("a.yaml").to_string(), "VALID: a.yaml");
        assert_eq!(
            ValidationResult::invalid("b.yaml", "missing author").to_string(),
            "INVALID: b.yaml - missing author"
        );
    }

    #[test]
    fn test_empty_result_is_success() {
        let result = MigrationResult::empty("master");
        assert!(result.is_success());
        assert!(!result.has_errors());
        assert!(!result.was_aborted());
        assert_eq!(result.total_pending, 0);
    }
}

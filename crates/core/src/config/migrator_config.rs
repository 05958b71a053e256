//! Migrator configuration types and builders

use serde::{Deserialize, Serialize};
use service_builder::builder;
use std::env;
use std::path::PathBuf;

use crate::config::validation::parse_flag;
use crate::config::ConfigError;

/// Ledger attribute holding the last applied version
pub const DEFAULT_LAST_VERSION_KEY: &str = "migrator.lastVersion";

/// Ledger attribute holding the serialized migration history
pub const DEFAULT_HISTORY_KEY: &str = "migrator.history";

/// Namespace used for tracking when nothing better can be resolved
pub const DEFAULT_NAMESPACE: &str = "master";

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn default_extensions() -> Vec<String> {
    vec!["yaml".to_string(), "yml".to_string(), "json".to_string()]
}

/// Configuration for loading and applying changesets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[builder]
pub struct MigratorConfig {
    /// Directory scanned recursively for changelog files
    #[builder(default = "PathBuf::from(\"changelog\")", getter)]
    pub changelog_dir: PathBuf,

    /// Validate every changelog document against the embedded schema
    #[builder(default = "true", getter)]
    pub validate_schema: bool,

    /// Namespace to track migrations against, if known up front
    #[builder(default, getter)]
    pub target_namespace: Option<String>,

    /// Fallback tracking namespace
    #[builder(default = "DEFAULT_NAMESPACE.to_string()", getter)]
    pub default_namespace: String,

    /// Attribute key for the last applied version
    #[builder(default = "DEFAULT_LAST_VERSION_KEY.to_string()", getter)]
    pub last_version_key: String,

    /// Attribute key for the migration history
    #[builder(default = "DEFAULT_HISTORY_KEY.to_string()", getter)]
    pub history_key: String,

    /// File extensions recognised as changelog files
    #[builder(default = "default_extensions()", getter)]
    pub file_extensions: Vec<String>,

    #[builder(default = "\"info\".to_string()", getter)]
    pub log_level: String,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            changelog_dir: PathBuf::from("changelog"),
            validate_schema: true,
            target_namespace: None,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            last_version_key: DEFAULT_LAST_VERSION_KEY.to_string(),
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            file_extensions: default_extensions(),
            log_level: "info".to_string(),
        }
    }
}

impl MigratorConfig {
    /// Load configuration from `REALMSHIFT_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("REALMSHIFT_CHANGELOG_DIR") {
            config.changelog_dir = PathBuf::from(dir);
        }

        config.target_namespace = lookup("REALMSHIFT_TARGET_NAMESPACE")
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());

        if let Some(ns) = lookup("REALMSHIFT_DEFAULT_NAMESPACE") {
            config.default_namespace = ns.trim().to_string();
        }

        if let Some(skip) = lookup("REALMSHIFT_SKIP_VALIDATION") {
            config.validate_schema = !parse_flag("skip_validation", &skip)?;
        }

        if let Some(level) = lookup("REALMSHIFT_LOG_LEVEL") {
            config.log_level = level.trim().to_lowercase();
        }

        config.validate()?;
        tracing::debug!(
            "Loaded migrator configuration (changelog_dir: {}, validate_schema: {})",
            config.changelog_dir.display(),
            config.validate_schema
        );
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_namespace.trim().is_empty() {
            return Err(ConfigError::missing_required(
                "default_namespace",
                "a fallback tracking namespace is required",
            ));
        }

        for (field, key) in [
            ("last_version_key", &self.last_version_key),
            ("history_key", &self.history_key),
        ] {
            if key.trim().is_empty() {
                return Err(ConfigError::missing_required(
                    field,
                    "ledger attribute keys must not be blank",
                ));
            }
        }

        if self.last_version_key == self.history_key {
            return Err(ConfigError::invalid_value(
                "history_key",
                self.history_key.clone(),
                "a key different from last_version_key",
            ));
        }

        if self.file_extensions.is_empty() {
            return Err(ConfigError::missing_required(
                "file_extensions",
                "at least one changelog file extension is required",
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::invalid_value(
                "log_level",
                self.log_level.clone(),
                format!("one of: {}", VALID_LOG_LEVELS.join(", ")),
            ));
        }

        Ok(())
    }

    /// Tracking namespace hint, ignoring blank values
    pub fn target_namespace_hint(&self) -> Option<&str> {
        self.target_namespace
            .as_deref()
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
    }
}

impl MigratorConfigBuilder {
    /// Configuration for local development against a throwaway backend
    pub fn development() -> Self {
        MigratorConfigBuilder::new()
            .validate_schema(true)
            .log_level("debug".to_string())
    }

    /// Configuration for tests: no schema overhead, quiet logs
    pub fn testing() -> Self {
        MigratorConfigBuilder::new()
            .validate_schema(false)
            .log_level("warn".to_string())
    }
}

//! Logging setup for migration runs
//!
//! Installs a `tracing` subscriber with an env filter and either plain,
//! pretty or JSON output on stderr, so stdout stays free for reports.

use std::io;
use thiserror::Error;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use realmshift_core::MigratorConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Logging configuration for migration runs
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Emit JSON lines instead of text
    pub json_format: bool,
    pub pretty_print: bool,
    /// Include file and line number information
    pub include_location: bool,
    /// Environment filter (e.g. "realmshift_migrator=debug,info"), overrides `level`
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: false,
            include_location: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// JSON output for scheduled or CI runs
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            include_location: false,
            env_filter: Some("realmshift_migrator=info,realmshift_core=info,warn".to_string()),
        }
    }

    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            include_location: true,
            env_filter: Some("realmshift_migrator=debug,realmshift_core=debug,info".to_string()),
        }
    }

    /// Minimal output
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            pretty_print: false,
            include_location: false,
            env_filter: None,
        }
    }

    /// Text logging at the configured migrator level
    pub fn from_config(config: &MigratorConfig) -> Self {
        Self {
            level: config.get_log_level().clone(),
            ..Self::default()
        }
    }

    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter directive applied when `RUST_LOG` is not set
    pub fn directive(&self) -> &str {
        self.env_filter.as_deref().unwrap_or(&self.level)
    }
}

/// Install the global subscriber; fails if one is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.directive())?,
    };

    let layer = Layer::new()
        .with_writer(io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?;
    } else if config.pretty_print {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.pretty())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?;
    }

    tracing::debug!(
        target: "realmshift::logging",
        "Logging initialized (level: {}, format: {})",
        config.level,
        if config.json_format { "JSON" } else { "text" }
    );
    Ok(())
}

//! Logging initialization and configuration

use crate::{TelemetryError, TelemetryResult};
use dpos_config::LoggingSettings;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, text, compact)
    pub format: LogFormat,

    /// Enable ANSI colors (ignored by the JSON format)
    pub color: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Compact single-line format
    Compact,
    /// JSON format for machine parsing
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(TelemetryError::InvalidSettings(format!(
                "unknown log format '{}'",
                other
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            color: true,
        }
    }
}

impl LogConfig {
    /// Builds a logging configuration from loaded settings
    pub fn from_settings(settings: &LoggingSettings) -> TelemetryResult<Self> {
        Ok(Self {
            level: settings.level.clone(),
            format: settings.format.parse()?,
            color: settings.color,
        })
    }
}

/// Initialize the logging system
///
/// Fails with [`TelemetryError::LoggingInit`] if a global subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Text => fmt::layer().with_ansi(config.color).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_ansi(config.color).boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!("Logging initialized with level: {}", config.level);
    Ok(())
}

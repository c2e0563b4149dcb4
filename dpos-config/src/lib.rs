//! DPoS Configuration Module
//!
//! Configuration types for the block state engine. Every section has serde
//! defaults, so an empty TOML document yields a usable devnet configuration.
//!
//! ```rust
//! use dpos_config::Settings;
//!
//! let settings = Settings::from_toml_str(
//!     r#"
//!     [engine]
//!     genesis_height = 1
//!
//!     [logging]
//!     level = "debug"
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(settings.logging.level, "debug");
//! ```

mod engine;
mod error;
mod network;

pub use engine::{EngineSettings, DEFAULT_FORGED_HISTORY_DEPTH, DEFAULT_GENESIS_HEIGHT};
pub use error::{ConfigError, ConfigResult};
pub use network::NetworkSettings;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Logging settings (consumed by `dpos-telemetry`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,

    /// Log format (text, compact, json)
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable ANSI colors
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_color() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            color: default_color(),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Block state engine parameters
    #[serde(default)]
    pub engine: EngineSettings,

    /// Network identity
    #[serde(default)]
    pub network: NetworkSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Parses and validates settings from a TOML document
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        let settings: Settings = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads and validates settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&contents)?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Checks cross-field and range constraints
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.genesis_height == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.genesis_height",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.engine.forged_history_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.forged_history_depth",
                reason: "must be at least 1".to_string(),
            });
        }

        match self.logging.format.as_str() {
            "text" | "compact" | "json" => Ok(()),
            other => Err(ConfigError::Invalid {
                field: "logging.format",
                reason: format!("unknown format '{}'", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.engine.genesis_height, 1);
        assert_eq!(settings.engine.forged_history_depth, 16);
        assert_eq!(settings.network.address_version, 0x1e);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [network]
            address_version = 23
            "#,
        )
        .unwrap();
        assert_eq!(settings.network.address_version, 23);
        assert_eq!(settings.network.name, "devnet");
        assert_eq!(settings.engine, EngineSettings::default());
    }

    #[test]
    fn test_zero_genesis_height_rejected() {
        let err = Settings::from_toml_str("[engine]\ngenesis_height = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "engine.genesis_height",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_history_depth_rejected() {
        let err = Settings::from_toml_str("[engine]\nforged_history_depth = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "engine.forged_history_depth",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let err = Settings::from_toml_str("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "logging.format", .. }));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = Settings::from_toml_str("[engine\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nforged_history_depth = 4").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.engine.forged_history_depth, 4);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

//! # DPoS Telemetry
//!
//! Logging setup for hosts embedding the block state engine.
//!
//! The engine itself only emits `tracing` events; this crate installs the
//! subscriber that renders them (text, compact or JSON, filtered through
//! `RUST_LOG` or the configured level).

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogConfig, LogFormat};

/// Initialize logging from loaded settings
pub fn init(settings: &dpos_config::LoggingSettings) -> TelemetryResult<()> {
    let config = LogConfig::from_settings(settings)?;
    init_logging(&config)
}

//! Telemetry error types

use thiserror::Error;

/// Telemetry-related errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Logging settings could not be interpreted
    #[error("Invalid logging settings: {0}")]
    InvalidSettings(String),
}

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

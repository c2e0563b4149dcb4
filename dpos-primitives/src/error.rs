//! Error types for primitive parsing.

use thiserror::Error;

/// Errors raised while constructing primitive identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Input was not valid hexadecimal.
    #[error("invalid hex: {message}")]
    InvalidHex {
        /// Decoder message.
        message: String,
    },

    /// Public key had the wrong byte length.
    #[error("invalid public key length: expected {expected}, got {actual}")]
    InvalidPublicKeyLength {
        /// Required length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// Public key prefix byte was not a compressed-point marker.
    #[error("invalid public key prefix: 0x{0:02x}")]
    InvalidPublicKeyPrefix(u8),

    /// Address string was empty.
    #[error("address must not be empty")]
    EmptyAddress,

    /// Transaction id string was empty.
    #[error("transaction id must not be empty")]
    EmptyTransactionId,
}

impl PrimitiveError {
    /// Create an invalid hex error.
    pub fn invalid_hex<S: Into<String>>(message: S) -> Self {
        Self::InvalidHex {
            message: message.into(),
        }
    }
}

/// Result type for primitive operations.
pub type PrimitiveResult<T> = Result<T, PrimitiveError>;

//! Transaction identifier.

use crate::{PrimitiveError, PrimitiveResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hex-encoded transaction id.
///
/// Also used as the key of timed locks: a lock is addressed by the id of the
/// transaction that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Creates a transaction id from its string form.
    pub fn new<S: Into<String>>(value: S) -> PrimitiveResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(PrimitiveError::EmptyTransactionId);
        }
        Ok(Self(value))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TransactionId {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_id_rejected() {
        assert_eq!(
            TransactionId::new(""),
            Err(PrimitiveError::EmptyTransactionId)
        );
    }

    #[test]
    fn test_id_ordering_is_lexicographic() {
        let a = TransactionId::new("aa").unwrap();
        let b = TransactionId::new("ab").unwrap();
        assert!(a < b);
    }
}

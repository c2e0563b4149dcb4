//! Account address.

use crate::{PrimitiveError, PrimitiveResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base58 account address.
///
/// The ledger treats addresses as opaque strings; derivation from a public
/// key is delegated to an [`AddressDerivation`](crate::AddressDerivation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Creates an address from its string form.
    pub fn new<S: Into<String>>(value: S) -> PrimitiveResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(PrimitiveError::EmptyAddress);
        }
        Ok(Self(value))
    }

    /// Wraps an encoder output that is non-empty by construction.
    pub(crate) fn from_encoded(value: String) -> Self {
        Self(value)
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

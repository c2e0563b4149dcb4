//! Compressed secp256k1 public key.

use crate::{PrimitiveError, PrimitiveResult};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Size of a compressed public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 33;

/// A compressed public key (`0x02`/`0x03` prefix followed by the x coordinate).
///
/// Signature verification happens before blocks reach the state engine, so
/// only the encoding is checked here, never the curve point itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Creates a public key from raw compressed bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> PrimitiveResult<Self> {
        match bytes[0] {
            0x02 | 0x03 => Ok(Self(bytes)),
            other => Err(PrimitiveError::InvalidPublicKeyPrefix(other)),
        }
    }

    /// Creates a public key from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> PrimitiveResult<Self> {
        let array: [u8; PUBLIC_KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| PrimitiveError::InvalidPublicKeyLength {
                    expected: PUBLIC_KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Self::from_bytes(array)
    }

    /// Parses a hex-encoded public key, with or without a `0x` prefix.
    pub fn from_hex(value: &str) -> PrimitiveResult<Self> {
        let trimmed = value.strip_prefix("0x").unwrap_or(value);
        let bytes = hex::decode(trimmed).map_err(|e| PrimitiveError::invalid_hex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Returns the lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

//! Address derivation from public keys.

use crate::{Address, PublicKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Default address version byte.
pub const DEFAULT_ADDRESS_VERSION: u8 = 0x1e;

/// Capability that maps a public key to its account address.
///
/// The ledger calls this when a public key is first seen so that the key can
/// be bound to the account it controls.
pub trait AddressDerivation: Send + Sync {
    /// Derives the address controlled by `public_key`.
    fn derive(&self, public_key: &PublicKey) -> Address;
}

/// Base58Check over `version || ripemd160(public_key)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ripemd160AddressDerivation {
    version: u8,
}

impl Ripemd160AddressDerivation {
    /// Creates a derivation for the given network version byte.
    pub fn new(version: u8) -> Self {
        Self { version }
    }

    /// Returns the configured version byte.
    pub fn version(&self) -> u8 {
        self.version
    }
}

impl Default for Ripemd160AddressDerivation {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS_VERSION)
    }
}

impl AddressDerivation for Ripemd160AddressDerivation {
    fn derive(&self, public_key: &PublicKey) -> Address {
        let hash = Ripemd160::digest(public_key.as_bytes());

        let mut payload = Vec::with_capacity(1 + hash.len() + 4);
        payload.push(self.version);
        payload.extend_from_slice(&hash);

        let checksum = Sha256::digest(Sha256::digest(&payload));
        payload.extend_from_slice(&checksum[..4]);

        Address::from_encoded(bs58::encode(payload).into_string())
    }
}

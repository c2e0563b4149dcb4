//! # DPoS Primitives
//!
//! Identifier types shared by every layer of the state engine.
//!
//! - `Address`: opaque base58 account address
//! - `PublicKey`: compressed public key, used to look up validators and senders
//! - `TransactionId`: transaction hash, also the key of timed locks
//! - `AddressDerivation`: capability that maps a public key to its address
//!
//! ## Design Principles
//!
//! - **Zero dependencies on other dpos-* crates**
//! - **Opaque identifiers**: signature checks and hashing of blocks happen
//!   upstream; these types only guarantee well-formed encodings
//!
//! ## Example
//!
//! ```rust
//! use dpos_primitives::{AddressDerivation, PublicKey, Ripemd160AddressDerivation};
//!
//! let key = PublicKey::from_hex(
//!     "02aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
//! )
//! .unwrap();
//! let address = Ripemd160AddressDerivation::default().derive(&key);
//! assert!(!address.as_str().is_empty());
//! ```

pub mod address;
pub mod derivation;
pub mod error;
pub mod public_key;
pub mod transaction_id;

pub use address::Address;
pub use derivation::{AddressDerivation, Ripemd160AddressDerivation, DEFAULT_ADDRESS_VERSION};
pub use error::{PrimitiveError, PrimitiveResult};
pub use public_key::{PublicKey, PUBLIC_KEY_SIZE};
pub use transaction_id::TransactionId;

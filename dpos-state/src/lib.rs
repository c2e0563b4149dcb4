//! # DPoS State
//!
//! Account entries and the in-memory account ledger the block state engine
//! mutates.
//!
//! ## Accounts
//!
//! An [`Account`] holds a signed arbitrary-precision balance plus a fixed set
//! of typed, optional attributes:
//!
//! - the delegate it votes for
//! - [`DelegateAttributes`] when the account is itself a validator
//! - active timed locks ([`HtlcLock`]) and their locked total
//!
//! ## Ledger
//!
//! [`AccountLedger`] indexes accounts by address (primary), public key,
//! delegate username, active lock id and vote target. Attribute changes go
//! through [`AccountLedger::update`], which reindexes the account before the
//! change becomes visible.

mod account;
mod error;
mod index;
mod ledger;

pub use account::{
    Account, DelegateAttributes, ForgedBlock, HtlcAttributes, HtlcLock, LockExpiration,
};
pub use error::{StateError, StateResult};
pub use ledger::{AccountLedger, AccountLookup, LedgerSnapshot, SettledLock};

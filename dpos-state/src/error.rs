//! State error types

use dpos_primitives::{Address, PublicKey, TransactionId};
use num_bigint::BigInt;
use thiserror::Error;

/// Errors raised by accounts and the account ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// No account is indexed under the lookup key
    #[error("Account not found: {lookup}")]
    AccountNotFound {
        /// Human readable description of the lookup key
        lookup: String,
    },

    /// Account has no validator attributes
    #[error("Account {address} is not a delegate")]
    NotADelegate { address: Address },

    /// Account already carries validator attributes
    #[error("Account {address} is already a delegate")]
    DelegateAlreadyRegistered { address: Address },

    /// Delegate username is held by another account
    #[error("Delegate username '{username}' is already taken")]
    UsernameTaken { username: String },

    /// Account already backs a delegate
    #[error("Account {address} already votes for {delegate}")]
    AlreadyVoted { address: Address, delegate: PublicKey },

    /// Account backs no delegate
    #[error("Account {address} has not voted")]
    NotVoted { address: Address },

    /// Account backs a different delegate than the one named
    #[error("Account {address} votes for {actual}, not {expected}")]
    VoteMismatch {
        address: Address,
        expected: PublicKey,
        actual: PublicKey,
    },

    /// Resignation state does not allow the operation
    #[error("Delegate {address} resignation state is {resigned}")]
    ResignationState { address: Address, resigned: bool },

    /// Debit would take the balance below zero
    #[error("Insufficient balance for account {address}: required {required}, available {available}")]
    InsufficientBalance {
        address: Address,
        required: BigInt,
        available: BigInt,
    },

    /// No active lock with this id
    #[error("Lock not found: {id}")]
    LockNotFound { id: TransactionId },

    /// A lock with this id is already active
    #[error("Lock already exists: {id}")]
    LockAlreadyExists { id: TransactionId },

    /// No settled lock archived under this id
    #[error("Settled lock not found: {id}")]
    SettledLockNotFound { id: TransactionId },

    /// Account is already bound to another public key
    #[error("Account {address} is bound to {existing}, cannot bind {requested}")]
    PublicKeyMismatch {
        address: Address,
        existing: PublicKey,
        requested: PublicKey,
    },

    /// A secondary index key already points at another account
    #[error("Index conflict in {index}: key {key} belongs to {owner}")]
    IndexConflict {
        index: &'static str,
        key: String,
        owner: Address,
    },

    /// Production counter would go below zero
    #[error("Delegate {address} has no produced blocks to revert")]
    NoProducedBlocks { address: Address },

    /// Reverted block is not the last block the delegate produced
    #[error("Delegate {address} last produced block {actual}, cannot revert {expected}")]
    LastBlockMismatch {
        address: Address,
        expected: String,
        actual: String,
    },
}

impl StateError {
    /// Account lookup by address failed
    pub fn address_not_found(address: &Address) -> Self {
        Self::AccountNotFound {
            lookup: format!("address {}", address),
        }
    }

    /// Account lookup by public key failed
    pub fn public_key_not_found(public_key: &PublicKey) -> Self {
        Self::AccountNotFound {
            lookup: format!("public key {}", public_key),
        }
    }

    /// Account lookup by delegate username failed
    pub fn username_not_found(username: &str) -> Self {
        Self::AccountNotFound {
            lookup: format!("username {}", username),
        }
    }

    /// Whether the error means the ledger disagrees with the chain it
    /// represents, as opposed to a transaction that cannot be applied.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            StateError::AccountNotFound { .. }
                | StateError::LockNotFound { .. }
                | StateError::SettledLockNotFound { .. }
                | StateError::IndexConflict { .. }
                | StateError::NoProducedBlocks { .. }
                | StateError::LastBlockMismatch { .. }
        )
    }
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;

//! Chain error types

use crate::transaction::TransactionKey;
use dpos_primitives::{Address, PublicKey, TransactionId};
use dpos_state::StateError;
use thiserror::Error;

/// A condition showing the ledger disagrees with the chain it represents.
///
/// Integrity faults are never retryable; the engine hands them to its
/// [`FaultReporter`](crate::FaultReporter) and the host decides whether to halt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityFault {
    /// Block producer has no account at a height where one must exist
    #[error("Producer {public_key} of block {block_id} at height {height} has no account")]
    MissingProducer {
        public_key: PublicKey,
        block_id: String,
        height: u32,
    },

    /// Sender, recipient or lock owner required by a transaction is unknown
    #[error("Account required by transaction {transaction} not found: {lookup}")]
    AccountNotFound {
        transaction: TransactionId,
        lookup: String,
    },

    /// A claimed lock is not in the lock index
    #[error("Lock {lock} referenced by transaction {transaction} not found")]
    LockNotFound {
        transaction: TransactionId,
        lock: TransactionId,
    },

    /// An account votes for a key that carries no validator attributes
    #[error("Vote target {delegate} is not a delegate")]
    VoteTargetNotDelegate { delegate: PublicKey },

    /// Block producer after genesis carries no validator attributes
    #[error("Producer {address} of block {block_id} at height {height} is not a delegate")]
    ProducerNotDelegate {
        address: Address,
        block_id: String,
        height: u32,
    },

    /// The ledger failed a lookup that every valid chain satisfies
    #[error("Ledger inconsistent: {0}")]
    InconsistentLedger(StateError),

    /// Undoing a partially processed block failed
    #[error("Rollback of block {block_id} at height {height} failed: {reason}")]
    RollbackIncomplete {
        block_id: String,
        height: u32,
        reason: String,
    },

    /// Undoing a partially applied or reverted transaction failed
    #[error("Rollback of transaction {transaction} at height {height} failed: {reason}")]
    TransactionRollbackIncomplete {
        transaction: TransactionId,
        height: u32,
        reason: String,
    },
}

/// Chain-related errors
#[derive(Debug, Error)]
pub enum ChainError {
    /// Ledger integrity violation
    #[error("Integrity fault: {0}")]
    Integrity(IntegrityFault),

    /// No handler registered for the transaction kind
    #[error("No handler registered for transaction type {0}")]
    UnknownTransactionType(TransactionKey),

    /// A handler is already registered for the transaction kind
    #[error("Handler already registered for transaction type {0}")]
    DuplicateHandler(TransactionKey),

    /// Effect handler refused the transaction against the current ledger
    #[error("Transaction {transaction} rejected: {reason}")]
    Rejected {
        transaction: TransactionId,
        reason: String,
    },

    /// State error
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Undoing a failed block operation failed as well
    #[error("Rollback failed: {rollback} (while undoing: {original})")]
    RollbackFailed {
        original: Box<ChainError>,
        rollback: Box<ChainError>,
    },
}

impl ChainError {
    /// Creates a rejection for `transaction`.
    pub fn rejected(transaction: &TransactionId, reason: impl Into<String>) -> Self {
        Self::Rejected {
            transaction: transaction.clone(),
            reason: reason.into(),
        }
    }

    /// Whether the error must stop block processing instead of being
    /// treated as an invalid block.
    pub fn is_fatal(&self) -> bool {
        match self {
            ChainError::Integrity(_) | ChainError::RollbackFailed { .. } => true,
            ChainError::State(e) => e.is_integrity_fault(),
            ChainError::UnknownTransactionType(_)
            | ChainError::DuplicateHandler(_)
            | ChainError::Rejected { .. } => false,
        }
    }

    /// The integrity fault carried by this error, if any.
    pub fn integrity_fault(&self) -> Option<&IntegrityFault> {
        match self {
            ChainError::Integrity(fault) => Some(fault),
            _ => None,
        }
    }

    /// The fault to hand to a [`FaultReporter`](crate::FaultReporter).
    ///
    /// `None` for recoverable errors and for `RollbackFailed`, whose fault is
    /// reported where the rollback fails.
    pub fn reportable_fault(&self) -> Option<IntegrityFault> {
        match self {
            ChainError::Integrity(fault) => Some(fault.clone()),
            ChainError::State(e) if e.is_integrity_fault() => {
                Some(IntegrityFault::InconsistentLedger(e.clone()))
            }
            _ => None,
        }
    }
}

impl From<IntegrityFault> for ChainError {
    fn from(fault: IntegrityFault) -> Self {
        ChainError::Integrity(fault)
    }
}

/// Result type for chain operations
pub type ChainResult<T> = Result<T, ChainError>;

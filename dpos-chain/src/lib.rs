//! # DPoS Chain
//!
//! Reversible block state engine for delegated proof-of-stake ledgers.
//!
//! ## Features
//!
//! - Block apply / revert with all-or-nothing rollback
//! - Transaction effect handlers looked up by (type group, type)
//! - Delegate vote-balance bookkeeping for every value movement
//! - Producer reward, fee and production statistics
//!
//! ## Architecture
//!
//! For each transaction the [`BlockStateEngine`] runs the registered
//! [`TransactionHandler`] (direct balance and attribute effects) and then the
//! [`VoteBalanceUpdater`] (secondary effects on delegate vote weight). Blocks
//! and transactions arrive already validated; integrity violations are handed
//! to an injected [`FaultReporter`].
//!
//! ## Example
//!
//! ```rust
//! use dpos_chain::{BlockStateEngine, EngineConfig, TracingFaultReporter, TransactionHandlerRegistry};
//! use dpos_primitives::Ripemd160AddressDerivation;
//! use dpos_state::AccountLedger;
//! use std::sync::Arc;
//!
//! let ledger = AccountLedger::new(Arc::new(Ripemd160AddressDerivation::default()));
//! let engine = BlockStateEngine::new(
//!     ledger,
//!     TransactionHandlerRegistry::with_core_handlers(),
//!     Arc::new(TracingFaultReporter),
//!     EngineConfig::default(),
//! );
//! assert_eq!(engine.height(), 0);
//! ```

mod block;
mod engine;
mod error;
mod fault;
pub mod handlers;
mod transaction;
mod vote_balance;

pub use block::Block;
pub use engine::{BlockStateEngine, EngineConfig};
pub use error::{ChainError, ChainResult, IntegrityFault};
pub use fault::{FaultReporter, RecordingFaultReporter, TracingFaultReporter};
pub use handlers::{HandlerContext, TransactionHandler, TransactionHandlerRegistry};
pub use transaction::{
    CoreTransactionType, Payment, Transaction, TransactionAsset, TransactionKey, VoteChange,
    VoteDirection, CORE_TYPE_GROUP,
};
pub use vote_balance::{Direction, LockContext, VoteBalanceChanges, VoteBalanceUpdater};

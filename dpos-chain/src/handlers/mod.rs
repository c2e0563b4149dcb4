//! Transaction effect handlers.
//!
//! A handler applies the direct effects of one transaction kind to the
//! ledger (balances and attributes) and reverts them exactly. Vote weight is
//! not a handler concern; the engine runs the
//! [`VoteBalanceUpdater`](crate::VoteBalanceUpdater) after every handler call.
//!
//! Handlers must leave the ledger untouched when they fail. Multi-account
//! handlers check everything that can fail before their first mutation.

mod delegate;
mod htlc;
mod multi_payment;
mod transfer;
mod vote;

pub use delegate::{DelegateRegistrationHandler, DelegateResignationHandler};
pub use htlc::{HtlcClaimHandler, HtlcLockHandler, HtlcRefundHandler};
pub use multi_payment::MultiPaymentHandler;
pub use transfer::TransferHandler;
pub use vote::VoteHandler;

use crate::error::{ChainError, ChainResult};
use crate::transaction::{Transaction, TransactionKey};
use dpos_primitives::Address;
use dpos_state::{Account, AccountLedger, StateError, StateResult};
use hashbrown::HashMap;
use num_bigint::BigInt;
use std::fmt;
use std::sync::Arc;

/// Chain position a transaction is processed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerContext {
    /// Height of the block carrying the transaction.
    pub height: u32,
    /// Last height of the genesis distribution.
    pub genesis_height: u32,
}

impl HandlerContext {
    pub fn new(height: u32, genesis_height: u32) -> Self {
        Self {
            height,
            genesis_height,
        }
    }

    /// Genesis wallets are allowed to go negative; everybody else is not.
    pub fn enforces_balance(&self) -> bool {
        self.height > self.genesis_height
    }
}

/// Applies and reverts the direct effects of one transaction kind.
pub trait TransactionHandler: Send + Sync {
    /// The kind this handler is registered under.
    fn key(&self) -> TransactionKey;

    fn apply(
        &self,
        ctx: &HandlerContext,
        transaction: &Transaction,
        ledger: &mut AccountLedger,
    ) -> ChainResult<()>;

    /// Exact inverse of [`apply`](Self::apply).
    fn revert(
        &self,
        ctx: &HandlerContext,
        transaction: &Transaction,
        ledger: &mut AccountLedger,
    ) -> ChainResult<()>;
}

/// Handlers keyed by (type group, type).
#[derive(Clone, Default)]
pub struct TransactionHandlerRegistry {
    handlers: HashMap<TransactionKey, Arc<dyn TransactionHandler>>,
}

impl TransactionHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding a handler for every core transaction kind.
    pub fn with_core_handlers() -> Self {
        let core: [Arc<dyn TransactionHandler>; 8] = [
            Arc::new(TransferHandler),
            Arc::new(DelegateRegistrationHandler),
            Arc::new(VoteHandler),
            Arc::new(MultiPaymentHandler),
            Arc::new(DelegateResignationHandler),
            Arc::new(HtlcLockHandler),
            Arc::new(HtlcClaimHandler),
            Arc::new(HtlcRefundHandler),
        ];

        let mut registry = Self::new();
        for handler in core {
            registry.handlers.insert(handler.key(), handler);
        }
        registry
    }

    /// Registers `handler`, refusing to replace an existing one.
    pub fn register(&mut self, handler: Arc<dyn TransactionHandler>) -> ChainResult<()> {
        let key = handler.key();
        if self.handlers.contains_key(&key) {
            return Err(ChainError::DuplicateHandler(key));
        }
        tracing::debug!("Registered transaction handler for type {}", key);
        self.handlers.insert(key, handler);
        Ok(())
    }

    /// Looks up the handler for `key`.
    pub fn get(&self, key: TransactionKey) -> ChainResult<Arc<dyn TransactionHandler>> {
        self.handlers
            .get(&key)
            .cloned()
            .ok_or(ChainError::UnknownTransactionType(key))
    }

    pub fn contains(&self, key: TransactionKey) -> bool {
        self.handlers.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for TransactionHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().copied().collect();
        keys.sort();
        f.debug_struct("TransactionHandlerRegistry")
            .field("keys", &keys)
            .finish()
    }
}

/// Debits `total`, refusing overdrafts above the genesis height.
pub(crate) fn charge(ctx: &HandlerContext, account: &mut Account, total: &BigInt) -> StateResult<()> {
    if ctx.enforces_balance() {
        account.debit_checked(total)
    } else {
        account.debit(total);
        Ok(())
    }
}

/// Turns a state error raised while applying into a rejection, unless it
/// points at an inconsistent ledger.
pub(crate) fn rejection(transaction: &Transaction, error: StateError) -> ChainError {
    if error.is_integrity_fault() {
        ChainError::State(error)
    } else {
        ChainError::rejected(&transaction.id, error.to_string())
    }
}

pub(crate) fn asset_mismatch(transaction: &Transaction, expected: &str) -> ChainError {
    ChainError::rejected(
        &transaction.id,
        format!("expected {} asset, found {:?}", expected, transaction.asset),
    )
}

pub(crate) fn required_recipient(transaction: &Transaction) -> ChainResult<&Address> {
    transaction
        .recipient
        .as_ref()
        .ok_or_else(|| ChainError::rejected(&transaction.id, "missing recipient"))
}

/// Address of a sender that must already be known.
pub(crate) fn sender_address(ledger: &AccountLedger, transaction: &Transaction) -> ChainResult<Address> {
    Ok(ledger.address_of(&transaction.sender_public_key)?.clone())
}

#[cfg(test)]
pub(crate) mod test_support {
    use dpos_primitives::{Address, PublicKey, Ripemd160AddressDerivation, TransactionId};
    use dpos_state::AccountLedger;
    use num_bigint::BigInt;
    use std::sync::Arc;

    use super::HandlerContext;

    pub fn ledger() -> AccountLedger {
        AccountLedger::new(Arc::new(Ripemd160AddressDerivation::default()))
    }

    pub fn key(fill: u8) -> PublicKey {
        let mut bytes = [fill; 33];
        bytes[0] = 0x02;
        PublicKey::from_bytes(bytes).unwrap()
    }

    pub fn id(value: &str) -> TransactionId {
        TransactionId::new(value).unwrap()
    }

    pub fn ctx() -> HandlerContext {
        HandlerContext::new(10, 1)
    }

    /// Binds `public_key` and credits `balance` to it.
    pub fn funded(ledger: &mut AccountLedger, public_key: PublicKey, balance: i64) -> Address {
        let address = ledger.bind_public_key(&public_key).unwrap();
        ledger
            .update(&address, |account| {
                account.credit(&BigInt::from(balance));
                Ok(())
            })
            .unwrap();
        address
    }

    pub fn balance(ledger: &AccountLedger, address: &Address) -> BigInt {
        ledger.find_by_address(address).unwrap().balance().clone()
    }
}

//! Block state engine.
//!
//! Applies and reverts whole blocks against the account ledger. A block is
//! all or nothing: when any step fails, whatever was done for the block so
//! far is undone in reverse before the error is returned.

use crate::block::Block;
use crate::error::{ChainError, ChainResult, IntegrityFault};
use crate::fault::FaultReporter;
use crate::handlers::{HandlerContext, TransactionHandlerRegistry};
use crate::transaction::{CoreTransactionType, Transaction};
use crate::vote_balance::{Direction, LockContext, VoteBalanceChanges, VoteBalanceUpdater};
use dpos_primitives::{Address, PublicKey};
use dpos_state::{Account, AccountLedger, StateError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Height at which an unknown producer is created instead of faulting.
    /// Sender balance checks are waived up to and including this height.
    pub genesis_height: u32,
    /// Number of produced-block summaries kept per delegate.
    pub forged_history_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            genesis_height: 1,
            forged_history_depth: 16,
        }
    }
}

/// Applies and reverts blocks against an in-memory ledger.
///
/// The engine is the single writer of its ledger. Hosts sharing it across
/// threads must hold one exclusive lock around each block call.
pub struct BlockStateEngine {
    ledger: AccountLedger,
    handlers: TransactionHandlerRegistry,
    vote_balances: VoteBalanceUpdater,
    fault_reporter: Arc<dyn FaultReporter>,
    config: EngineConfig,
    height: u32,
}

impl BlockStateEngine {
    pub fn new(
        ledger: AccountLedger,
        handlers: TransactionHandlerRegistry,
        fault_reporter: Arc<dyn FaultReporter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ledger,
            handlers,
            vote_balances: VoteBalanceUpdater::new(),
            fault_reporter,
            config,
            height: 0,
        }
    }

    /// Resumes at `height`, for a ledger restored from a snapshot.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> AccountLedger {
        self.ledger
    }

    pub fn handlers(&self) -> &TransactionHandlerRegistry {
        &self.handlers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Height of the last applied block.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Forgets settled HTLC locks of blocks at or below `final_height`.
    ///
    /// Claims and refunds in those blocks can no longer be reverted.
    pub fn prune_settled_locks(&mut self, final_height: u32) -> usize {
        self.ledger.prune_settled_locks(final_height)
    }

    /// Applies every transaction of `block` and credits its producer.
    pub fn apply_block(&mut self, block: &Block) -> ChainResult<()> {
        let producer = self.resolve_producer(block, true)?;
        let ctx = self.context(block.height);

        let mut applied = Vec::with_capacity(block.transactions.len());
        match self.apply_block_effects(block, &producer, &ctx, &mut applied) {
            Ok(()) => {
                self.height = block.height;
                debug!(
                    "Applied block {} at height {} with {} transactions (producer {})",
                    block.id,
                    block.height,
                    block.transactions.len(),
                    producer
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "Failed to apply block {} at height {}: {} - reverting {} applied transactions",
                    block.id,
                    block.height,
                    err,
                    applied.len()
                );
                self.report(&err);
                match self.revert_applied(&ctx, &applied) {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(self.rollback_failed(block, err, rollback)),
                }
            }
        }
    }

    /// Exact inverse of [`apply_block`](Self::apply_block).
    pub fn revert_block(&mut self, block: &Block) -> ChainResult<()> {
        let producer = self.resolve_producer(block, false)?;
        let ctx = self.context(block.height);

        let mut uncredited = false;
        let mut reverted = Vec::with_capacity(block.transactions.len());
        match self.revert_block_effects(block, &producer, &ctx, &mut uncredited, &mut reverted) {
            Ok(()) => {
                self.height = block.height.saturating_sub(1);
                debug!(
                    "Reverted block {} at height {} with {} transactions (producer {})",
                    block.id,
                    block.height,
                    block.transactions.len(),
                    producer
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "Failed to revert block {} at height {}: {} - re-applying {} reverted transactions",
                    block.id,
                    block.height,
                    err,
                    reverted.len()
                );
                self.report(&err);
                match self.reapply_reverted(block, &producer, &ctx, &reverted, uncredited) {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(self.rollback_failed(block, err, rollback)),
                }
            }
        }
    }

    /// Applies a single transaction as if it were in the next block.
    pub fn apply_transaction(&mut self, transaction: &Transaction) -> ChainResult<()> {
        let ctx = self.context(self.height.saturating_add(1));
        let result = self.apply_transaction_at(&ctx, transaction);
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    /// Reverts a single transaction applied with
    /// [`apply_transaction`](Self::apply_transaction).
    pub fn revert_transaction(&mut self, transaction: &Transaction) -> ChainResult<()> {
        let ctx = self.context(self.height.saturating_add(1));
        let result = self.revert_transaction_at(&ctx, transaction);
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn context(&self, height: u32) -> HandlerContext {
        HandlerContext::new(height, self.config.genesis_height)
    }

    /// Finds the producer's account, creating it for the genesis block.
    fn resolve_producer(&mut self, block: &Block, allow_genesis: bool) -> ChainResult<Address> {
        if let Ok(address) = self.ledger.address_of(&block.generator_public_key) {
            return Ok(address.clone());
        }

        if allow_genesis && block.height == self.config.genesis_height {
            let address = self.ledger.bind_public_key(&block.generator_public_key)?;
            info!(
                "Created genesis producer account {} for {}",
                address, block.generator_public_key
            );
            return Ok(address);
        }

        let fault = IntegrityFault::MissingProducer {
            public_key: block.generator_public_key,
            block_id: block.id.clone(),
            height: block.height,
        };
        self.fault_reporter.report(&fault);
        Err(ChainError::Integrity(fault))
    }

    fn apply_block_effects<'b>(
        &mut self,
        block: &'b Block,
        producer: &Address,
        ctx: &HandlerContext,
        applied: &mut Vec<&'b Transaction>,
    ) -> ChainResult<()> {
        for transaction in &block.transactions {
            self.apply_transaction_at(ctx, transaction)?;
            applied.push(transaction);
        }
        self.credit_producer(block, producer)?;
        Ok(())
    }

    fn revert_block_effects<'b>(
        &mut self,
        block: &'b Block,
        producer: &Address,
        ctx: &HandlerContext,
        uncredited: &mut bool,
        reverted: &mut Vec<&'b Transaction>,
    ) -> ChainResult<()> {
        *uncredited = self.debit_producer(block, producer)?;
        for transaction in block.transactions.iter().rev() {
            self.revert_transaction_at(ctx, transaction)?;
            reverted.push(transaction);
        }
        Ok(())
    }

    fn revert_applied(&mut self, ctx: &HandlerContext, applied: &[&Transaction]) -> ChainResult<()> {
        for transaction in applied.iter().rev() {
            warn!("Reverting transaction {}", transaction.id);
            self.revert_transaction_at(ctx, transaction)?;
        }
        Ok(())
    }

    fn reapply_reverted(
        &mut self,
        block: &Block,
        producer: &Address,
        ctx: &HandlerContext,
        reverted: &[&Transaction],
        uncredited: bool,
    ) -> ChainResult<()> {
        for transaction in reverted.iter().rev() {
            warn!("Re-applying transaction {}", transaction.id);
            self.apply_transaction_at(ctx, transaction)?;
        }
        if uncredited {
            self.credit_producer(block, producer)?;
        }
        Ok(())
    }

    fn is_declared_producer(&self, account: &Account, generator: &PublicKey) -> bool {
        account.public_key() == Some(generator)
            || account.address() == &self.ledger.derive_address(generator)
    }

    /// Credits reward and fees to the producer and records the block.
    ///
    /// A genesis producer without validator attributes is credited but keeps
    /// no production statistics. Returns whether the producer was credited.
    fn credit_producer(&mut self, block: &Block, producer: &Address) -> ChainResult<bool> {
        self.settle_producer(block, producer, Direction::Apply)
    }

    /// Inverse of [`credit_producer`](Self::credit_producer).
    fn debit_producer(&mut self, block: &Block, producer: &Address) -> ChainResult<bool> {
        self.settle_producer(block, producer, Direction::Revert)
    }

    fn settle_producer(
        &mut self,
        block: &Block,
        producer: &Address,
        direction: Direction,
    ) -> ChainResult<bool> {
        let account = self.ledger.find_by_address(producer)?;
        if !self.is_declared_producer(account, &block.generator_public_key) {
            warn!(
                "Account {} is not the producer of block {}, skipping producer bookkeeping",
                producer, block.id
            );
            return Ok(false);
        }

        let records_stats = account.is_delegate();
        if !records_stats && block.height > self.config.genesis_height {
            return Err(ChainError::Integrity(IntegrityFault::ProducerNotDelegate {
                address: producer.clone(),
                block_id: block.id.clone(),
                height: block.height,
            }));
        }

        let income = block.producer_income();
        let mut changes = VoteBalanceChanges::new();
        if let Some(delegate) = account.vote() {
            changes.add(*delegate, direction.signed(income.clone()));
        }
        self.vote_balances.validate(&self.ledger, &changes)?;

        let depth = self.config.forged_history_depth;
        self.ledger.update(producer, |account| {
            match direction {
                Direction::Apply => {
                    if records_stats {
                        account.record_forged_block(block.forged_summary(), depth)?;
                    }
                    account.credit(&income);
                }
                Direction::Revert => {
                    if records_stats {
                        account.unrecord_forged_block(&block.forged_summary())?;
                    }
                    account.debit(&income);
                }
            }
            Ok(())
        })?;
        self.vote_balances.commit(&mut self.ledger, &changes)?;
        Ok(true)
    }

    fn apply_transaction_at(&mut self, ctx: &HandlerContext, transaction: &Transaction) -> ChainResult<()> {
        let handler = self.handlers.get(transaction.key())?;
        let lock = if transaction.is_core(CoreTransactionType::HtlcClaim) {
            Some(self.claimed_lock(transaction)?)
        } else {
            None
        };

        handler.apply(ctx, transaction, &mut self.ledger)?;
        if let Err(err) = self.update_vote_balances(transaction, lock.as_ref(), Direction::Apply) {
            return match handler.revert(ctx, transaction, &mut self.ledger) {
                Ok(()) => Err(err),
                Err(undo) => {
                    error!("Failed to undo transaction {}: {}", transaction.id, undo);
                    Err(self.transaction_rollback_failed(ctx, transaction, err, undo))
                }
            };
        }
        Ok(())
    }

    fn revert_transaction_at(&mut self, ctx: &HandlerContext, transaction: &Transaction) -> ChainResult<()> {
        let handler = self.handlers.get(transaction.key())?;
        handler.revert(ctx, transaction, &mut self.ledger)?;

        let result = if transaction.is_core(CoreTransactionType::HtlcClaim) {
            self.claimed_lock(transaction).and_then(|lock| {
                self.update_vote_balances(transaction, Some(&lock), Direction::Revert)
            })
        } else {
            self.update_vote_balances(transaction, None, Direction::Revert)
        };

        if let Err(err) = result {
            return match handler.apply(ctx, transaction, &mut self.ledger) {
                Ok(()) => Err(err),
                Err(redo) => {
                    error!("Failed to restore transaction {}: {}", transaction.id, redo);
                    Err(self.transaction_rollback_failed(ctx, transaction, err, redo))
                }
            };
        }
        Ok(())
    }

    /// Owner and amount of the lock a claim settles, read while the lock
    /// is still active.
    fn claimed_lock(&self, transaction: &Transaction) -> ChainResult<LockContext> {
        let lock_not_found = || {
            let lock = transaction
                .lock_reference()
                .cloned()
                .unwrap_or_else(|| transaction.id.clone());
            ChainError::Integrity(IntegrityFault::LockNotFound {
                transaction: transaction.id.clone(),
                lock,
            })
        };

        let id = transaction.lock_reference().ok_or_else(lock_not_found)?;
        let owner = self.ledger.find_by_lock(id).map_err(|_| lock_not_found())?;
        let lock = owner.lock(id).ok_or_else(lock_not_found)?;
        Ok(LockContext {
            owner: owner.address().clone(),
            amount: lock.amount.clone(),
        })
    }

    fn update_vote_balances(
        &mut self,
        transaction: &Transaction,
        lock: Option<&LockContext>,
        direction: Direction,
    ) -> ChainResult<()> {
        let sender = self
            .ledger
            .address_of(&transaction.sender_public_key)
            .map_err(|e| account_missing(transaction, e))?
            .clone();
        let recipient = transaction
            .recipient
            .as_ref()
            .filter(|address| self.ledger.has_address(address));

        self.vote_balances
            .update(&mut self.ledger, transaction, &sender, recipient, lock, direction)?;
        Ok(())
    }

    fn report(&self, err: &ChainError) {
        if let Some(fault) = err.reportable_fault() {
            self.fault_reporter.report(&fault);
        }
    }

    fn rollback_failed(&self, block: &Block, original: ChainError, rollback: ChainError) -> ChainError {
        let fault = IntegrityFault::RollbackIncomplete {
            block_id: block.id.clone(),
            height: block.height,
            reason: rollback.to_string(),
        };
        self.fault_reporter.report(&fault);
        ChainError::RollbackFailed {
            original: Box::new(original),
            rollback: Box::new(rollback),
        }
    }

    fn transaction_rollback_failed(
        &self,
        ctx: &HandlerContext,
        transaction: &Transaction,
        original: ChainError,
        rollback: ChainError,
    ) -> ChainError {
        self.report(&original);
        let fault = IntegrityFault::TransactionRollbackIncomplete {
            transaction: transaction.id.clone(),
            height: ctx.height,
            reason: rollback.to_string(),
        };
        self.fault_reporter.report(&fault);
        ChainError::RollbackFailed {
            original: Box::new(original),
            rollback: Box::new(rollback),
        }
    }
}

fn account_missing(transaction: &Transaction, error: StateError) -> ChainError {
    match error {
        StateError::AccountNotFound { lookup } => ChainError::Integrity(IntegrityFault::AccountNotFound {
            transaction: transaction.id.clone(),
            lookup,
        }),
        other => ChainError::State(other),
    }
}

impl fmt::Debug for BlockStateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockStateEngine")
            .field("height", &self.height)
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("handlers", &self.handlers)
            .finish()
    }
}

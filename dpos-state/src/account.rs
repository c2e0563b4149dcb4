//! Account state representation.

use crate::{StateError, StateResult};
use dpos_primitives::{Address, PublicKey, TransactionId};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Summary of a block recorded against the delegate that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgedBlock {
    /// Block id.
    pub id: String,
    /// Block height.
    pub height: u32,
    /// Block timestamp.
    pub timestamp: u64,
    /// Producer reward.
    pub reward: BigInt,
    /// Sum of the fees of the block's transactions.
    pub total_fee: BigInt,
}

/// Validator attributes, present only on accounts registered as delegates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateAttributes {
    username: String,
    vote_balance: BigInt,
    produced_blocks: u64,
    forged_fees: BigInt,
    forged_rewards: BigInt,
    /// Most recent block last. Bounded by the engine's history depth.
    recent_blocks: VecDeque<ForgedBlock>,
    resigned: bool,
}

impl DelegateAttributes {
    /// Creates fresh attributes for a newly registered delegate.
    pub fn new<S: Into<String>>(username: S) -> Self {
        Self {
            username: username.into(),
            vote_balance: BigInt::zero(),
            produced_blocks: 0,
            forged_fees: BigInt::zero(),
            forged_rewards: BigInt::zero(),
            recent_blocks: VecDeque::new(),
            resigned: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Aggregate balance of the accounts backing this delegate.
    pub fn vote_balance(&self) -> &BigInt {
        &self.vote_balance
    }

    /// Adds `delta` (which may be negative) to the vote balance.
    pub fn adjust_vote_balance(&mut self, delta: &BigInt) {
        self.vote_balance += delta;
    }

    pub fn produced_blocks(&self) -> u64 {
        self.produced_blocks
    }

    pub fn forged_fees(&self) -> &BigInt {
        &self.forged_fees
    }

    pub fn forged_rewards(&self) -> &BigInt {
        &self.forged_rewards
    }

    /// The last block this delegate produced, if still remembered.
    pub fn last_block(&self) -> Option<&ForgedBlock> {
        self.recent_blocks.back()
    }

    pub fn is_resigned(&self) -> bool {
        self.resigned
    }

    pub(crate) fn set_resigned(&mut self, resigned: bool) {
        self.resigned = resigned;
    }

    /// Records a produced block, keeping at most `history_depth` summaries.
    pub(crate) fn record_forged(&mut self, block: ForgedBlock, history_depth: usize) {
        self.produced_blocks += 1;
        self.forged_fees += &block.total_fee;
        self.forged_rewards += &block.reward;
        self.recent_blocks.push_back(block);
        while self.recent_blocks.len() > history_depth.max(1) {
            self.recent_blocks.pop_front();
        }
    }

    /// Undoes [`record_forged`](Self::record_forged) for the most recent block.
    pub(crate) fn unrecord_forged(&mut self, address: &Address, block: &ForgedBlock) -> StateResult<()> {
        if self.produced_blocks == 0 {
            return Err(StateError::NoProducedBlocks {
                address: address.clone(),
            });
        }

        if let Some(last) = self.recent_blocks.back() {
            if last.id != block.id {
                return Err(StateError::LastBlockMismatch {
                    address: address.clone(),
                    expected: block.id.clone(),
                    actual: last.id.clone(),
                });
            }
        }

        self.recent_blocks.pop_back();
        self.produced_blocks -= 1;
        self.forged_fees -= &block.total_fee;
        self.forged_rewards -= &block.reward;
        Ok(())
    }
}

/// When a timed lock becomes refundable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum LockExpiration {
    /// Unix timestamp in seconds.
    EpochTimestamp(u64),
    /// Block height.
    BlockHeight(u32),
}

/// An active timed lock, keyed by the id of the transaction that created it.
///
/// Lock records are never mutated after creation: they are inserted by the
/// lock transaction and removed whole by a claim or refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtlcLock {
    pub amount: BigInt,
    pub recipient: Address,
    pub secret_hash: String,
    pub expiration: LockExpiration,
}

/// Timed-lock attributes of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtlcAttributes {
    locks: BTreeMap<TransactionId, HtlcLock>,
    locked_balance: BigInt,
}

impl HtlcAttributes {
    fn is_empty(&self) -> bool {
        self.locks.is_empty() && self.locked_balance.is_zero()
    }
}

/// A ledger entry: balance plus the typed attributes the engine maintains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    address: Address,
    public_key: Option<PublicKey>,
    balance: BigInt,
    vote: Option<PublicKey>,
    delegate: Option<DelegateAttributes>,
    htlc: HtlcAttributes,
}

impl Account {
    /// Creates a new zero-balance account.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            public_key: None,
            balance: BigInt::zero(),
            vote: None,
            delegate: None,
            htlc: HtlcAttributes::default(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    /// Binds the public key. Binding the same key again is a no-op.
    pub fn set_public_key(&mut self, public_key: PublicKey) -> StateResult<()> {
        match self.public_key {
            Some(existing) if existing != public_key => Err(StateError::PublicKeyMismatch {
                address: self.address.clone(),
                existing,
                requested: public_key,
            }),
            _ => {
                self.public_key = Some(public_key);
                Ok(())
            }
        }
    }

    pub fn balance(&self) -> &BigInt {
        &self.balance
    }

    /// Adds `amount` to the balance.
    pub fn credit(&mut self, amount: &BigInt) {
        self.balance += amount;
    }

    /// Subtracts `amount` from the balance without a sufficiency check.
    pub fn debit(&mut self, amount: &BigInt) {
        self.balance -= amount;
    }

    /// Subtracts `amount` from the balance, refusing to go negative.
    pub fn debit_checked(&mut self, amount: &BigInt) -> StateResult<()> {
        if (&self.balance - amount).is_negative() {
            return Err(StateError::InsufficientBalance {
                address: self.address.clone(),
                required: amount.clone(),
                available: self.balance.clone(),
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// The delegate this account currently backs.
    pub fn vote(&self) -> Option<&PublicKey> {
        self.vote.as_ref()
    }

    pub fn has_voted(&self) -> bool {
        self.vote.is_some()
    }

    /// Starts backing `delegate`.
    pub fn cast_vote(&mut self, delegate: PublicKey) -> StateResult<()> {
        if let Some(current) = self.vote {
            return Err(StateError::AlreadyVoted {
                address: self.address.clone(),
                delegate: current,
            });
        }
        self.vote = Some(delegate);
        Ok(())
    }

    /// Stops backing `delegate`.
    pub fn withdraw_vote(&mut self, delegate: &PublicKey) -> StateResult<()> {
        match self.vote {
            None => Err(StateError::NotVoted {
                address: self.address.clone(),
            }),
            Some(current) if current != *delegate => Err(StateError::VoteMismatch {
                address: self.address.clone(),
                expected: *delegate,
                actual: current,
            }),
            Some(_) => {
                self.vote = None;
                Ok(())
            }
        }
    }

    pub fn is_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    pub fn delegate(&self) -> Option<&DelegateAttributes> {
        self.delegate.as_ref()
    }

    /// Validator attributes, or `NotADelegate`.
    pub fn delegate_mut(&mut self) -> StateResult<&mut DelegateAttributes> {
        let address = &self.address;
        self.delegate.as_mut().ok_or_else(|| StateError::NotADelegate {
            address: address.clone(),
        })
    }

    /// Attaches validator attributes.
    pub fn register_delegate(&mut self, attributes: DelegateAttributes) -> StateResult<()> {
        if self.delegate.is_some() {
            return Err(StateError::DelegateAlreadyRegistered {
                address: self.address.clone(),
            });
        }
        self.delegate = Some(attributes);
        Ok(())
    }

    /// Detaches and returns validator attributes.
    pub fn unregister_delegate(&mut self) -> StateResult<DelegateAttributes> {
        self.delegate.take().ok_or_else(|| StateError::NotADelegate {
            address: self.address.clone(),
        })
    }

    /// Flips the resignation flag from `!resigned` to `resigned`.
    pub fn set_resigned(&mut self, resigned: bool) -> StateResult<()> {
        let address = self.address.clone();
        let delegate = self.delegate_mut()?;
        if delegate.is_resigned() == resigned {
            return Err(StateError::ResignationState {
                address,
                resigned: delegate.is_resigned(),
            });
        }
        delegate.set_resigned(resigned);
        Ok(())
    }

    /// Records a block produced by this delegate.
    pub fn record_forged_block(&mut self, block: ForgedBlock, history_depth: usize) -> StateResult<()> {
        self.delegate_mut()?.record_forged(block, history_depth);
        Ok(())
    }

    /// Reverts [`record_forged_block`](Self::record_forged_block).
    pub fn unrecord_forged_block(&mut self, block: &ForgedBlock) -> StateResult<()> {
        let address = self.address.clone();
        self.delegate_mut()?.unrecord_forged(&address, block)
    }

    /// Active locks created by this account.
    pub fn locks(&self) -> &BTreeMap<TransactionId, HtlcLock> {
        &self.htlc.locks
    }

    pub fn lock(&self, id: &TransactionId) -> Option<&HtlcLock> {
        self.htlc.locks.get(id)
    }

    /// Sum of the amounts of all active locks.
    pub fn locked_balance(&self) -> &BigInt {
        &self.htlc.locked_balance
    }

    /// Registers a new lock and adds its amount to the locked balance.
    pub fn add_lock(&mut self, id: TransactionId, lock: HtlcLock) -> StateResult<()> {
        if self.htlc.locks.contains_key(&id) {
            return Err(StateError::LockAlreadyExists { id });
        }
        self.htlc.locked_balance += &lock.amount;
        self.htlc.locks.insert(id, lock);
        Ok(())
    }

    /// Removes a lock and subtracts its amount from the locked balance.
    pub fn remove_lock(&mut self, id: &TransactionId) -> StateResult<HtlcLock> {
        let lock = self
            .htlc
            .locks
            .remove(id)
            .ok_or_else(|| StateError::LockNotFound { id: id.clone() })?;
        self.htlc.locked_balance -= &lock.amount;
        Ok(lock)
    }

    /// True when the account holds no value and no attributes. The public
    /// key binding is not considered.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero()
            && self.vote.is_none()
            && self.delegate.is_none()
            && self.htlc.is_empty()
    }
}

//! Secondary effects of transactions on delegate vote weight.
//!
//! A delegate's vote balance is the aggregate balance of the accounts
//! backing it. Whenever a transaction moves value into or out of such an
//! account, or starts or stops a vote, the backed delegate's weight moves
//! with it. The updater runs strictly after the effect handler, so balances
//! it reads already include the transaction.
//!
//! Rules, with `V(D)` the vote balance of delegate `D` (revert negates each):
//!
//! | Transaction | Effect |
//! |---|---|
//! | vote `+D` | apply `V(D) += sender.balance`, revert `V(D) -= sender.balance - fee` |
//! | unvote `-D` | apply `V(D) -= sender.balance + fee`, revert `V(D) += sender.balance` |
//! | sender backs `D` | `V(D) -= amount + fee` |
//! | lock, sender backs `D` | `V(D) -= fee` |
//! | claim, claimer backs `D` | `V(D) += locked - fee` |
//! | claim, lock owner backs `D` | `V(D) -= locked` |
//! | multi-payment, recipient `i` backs `D` | `V(D) += amount_i` |
//! | other non-lock, recipient backs `D` | `V(D) += amount` |
//!
//! For multi-payments `amount` is the sum of the payments.

use crate::error::{ChainError, ChainResult, IntegrityFault};
use crate::transaction::{CoreTransactionType, Transaction, TransactionAsset, VoteDirection};
use dpos_primitives::{Address, PublicKey};
use dpos_state::AccountLedger;
use num_bigint::BigInt;
use num_traits::Zero;
use std::collections::BTreeMap;

/// Which way a transaction is being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Apply,
    Revert,
}

impl Direction {
    /// `delta` for apply, `-delta` for revert.
    pub fn signed(self, delta: BigInt) -> BigInt {
        match self {
            Direction::Apply => delta,
            Direction::Revert => -delta,
        }
    }
}

/// The lock a claim settles, resolved before the claim removes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockContext {
    pub owner: Address,
    pub amount: BigInt,
}

/// Net vote-balance deltas, keyed by delegate public key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteBalanceChanges {
    deltas: BTreeMap<PublicKey, BigInt>,
}

impl VoteBalanceChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the change for `delegate`. Entries netting to zero
    /// are dropped.
    pub fn add(&mut self, delegate: PublicKey, delta: BigInt) {
        let entry = self.deltas.entry(delegate).or_insert_with(BigInt::zero);
        *entry += delta;
        if entry.is_zero() {
            self.deltas.remove(&delegate);
        }
    }

    pub fn get(&self, delegate: &PublicKey) -> Option<&BigInt> {
        self.deltas.get(delegate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PublicKey, &BigInt)> + '_ {
        self.deltas.iter()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// Computes and commits vote-balance changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct VoteBalanceUpdater;

impl VoteBalanceUpdater {
    pub fn new() -> Self {
        Self
    }

    /// Computes the changes `transaction` causes and commits them.
    ///
    /// Nothing is written unless every affected delegate exists.
    pub fn update(
        &self,
        ledger: &mut AccountLedger,
        transaction: &Transaction,
        sender: &Address,
        recipient: Option<&Address>,
        lock: Option<&LockContext>,
        direction: Direction,
    ) -> ChainResult<VoteBalanceChanges> {
        let changes = self.compute(ledger, transaction, sender, recipient, lock, direction)?;
        self.commit(ledger, &changes)?;
        Ok(changes)
    }

    /// Computes the changes without touching the ledger.
    pub fn compute(
        &self,
        ledger: &AccountLedger,
        transaction: &Transaction,
        sender: &Address,
        recipient: Option<&Address>,
        lock: Option<&LockContext>,
        direction: Direction,
    ) -> ChainResult<VoteBalanceChanges> {
        let mut changes = VoteBalanceChanges::new();
        let sender_account = ledger.find_by_address(sender)?;
        let kind = transaction.core_type();

        if kind == Some(CoreTransactionType::Vote) {
            if let TransactionAsset::Vote(change) = &transaction.asset {
                let balance = sender_account.balance();
                let fee = &transaction.fee;
                let delta = match (change.direction, direction) {
                    (VoteDirection::Vote, Direction::Apply) => balance.clone(),
                    (VoteDirection::Vote, Direction::Revert) => -(balance - fee),
                    (VoteDirection::Unvote, Direction::Apply) => -(balance + fee),
                    (VoteDirection::Unvote, Direction::Revert) => balance.clone(),
                };
                changes.add(change.delegate, delta);
            }
            return Ok(changes);
        }

        let claimed = match kind {
            Some(CoreTransactionType::HtlcClaim) => Some(lock.ok_or_else(|| missing_lock(transaction))?),
            _ => None,
        };

        if let Some(delegate) = sender_account.vote() {
            let delta = match (kind, claimed) {
                (Some(CoreTransactionType::HtlcLock), _) => -transaction.fee.clone(),
                (_, Some(lock)) => &lock.amount - &transaction.fee,
                _ => -(transaction.transferred_amount() + &transaction.fee),
            };
            changes.add(*delegate, direction.signed(delta));
        }

        if let Some(lock) = claimed {
            let owner = ledger.find_by_address(&lock.owner)?;
            if let Some(delegate) = owner.vote() {
                changes.add(*delegate, direction.signed(-lock.amount.clone()));
            }
        }

        for payment in transaction.payments() {
            let account = ledger.find_by_address(&payment.recipient)?;
            if let Some(delegate) = account.vote() {
                changes.add(*delegate, direction.signed(payment.amount.clone()));
            }
        }

        if kind != Some(CoreTransactionType::HtlcLock) {
            if let Some(recipient) = recipient {
                let account = ledger.find_by_address(recipient)?;
                if let Some(delegate) = account.vote() {
                    changes.add(*delegate, direction.signed(transaction.amount.clone()));
                }
            }
        }

        Ok(changes)
    }

    /// Checks that every target of `changes` is a delegate.
    pub fn validate(&self, ledger: &AccountLedger, changes: &VoteBalanceChanges) -> ChainResult<()> {
        self.targets(ledger, changes).map(|_| ())
    }

    fn targets<'c>(
        &self,
        ledger: &AccountLedger,
        changes: &'c VoteBalanceChanges,
    ) -> ChainResult<Vec<(Address, &'c BigInt)>> {
        let mut targets = Vec::with_capacity(changes.len());
        for (delegate, delta) in changes.iter() {
            let not_delegate = || {
                ChainError::Integrity(IntegrityFault::VoteTargetNotDelegate {
                    delegate: *delegate,
                })
            };
            let account = ledger.find_by_public_key(delegate).map_err(|_| not_delegate())?;
            if !account.is_delegate() {
                return Err(not_delegate());
            }
            targets.push((account.address().clone(), delta));
        }
        Ok(targets)
    }

    /// Adds every delta to its delegate's vote balance.
    ///
    /// All targets are checked first, so a missing delegate leaves the
    /// ledger untouched.
    pub fn commit(&self, ledger: &mut AccountLedger, changes: &VoteBalanceChanges) -> ChainResult<()> {
        for (address, delta) in self.targets(ledger, changes)? {
            ledger.update(&address, |account| {
                account.delegate_mut()?.adjust_vote_balance(delta);
                Ok(())
            })?;
        }
        Ok(())
    }
}

fn missing_lock(transaction: &Transaction) -> ChainError {
    let lock = transaction
        .lock_reference()
        .cloned()
        .unwrap_or_else(|| transaction.id.clone());
    ChainError::Integrity(IntegrityFault::LockNotFound {
        transaction: transaction.id.clone(),
        lock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::VoteChange;
    use dpos_primitives::{Ripemd160AddressDerivation, TransactionId};
    use dpos_state::DelegateAttributes;
    use std::sync::Arc;

    fn key(fill: u8) -> PublicKey {
        let mut bytes = [fill; 33];
        bytes[0] = 0x03;
        PublicKey::from_bytes(bytes).unwrap()
    }

    fn id(value: &str) -> TransactionId {
        TransactionId::new(value).unwrap()
    }

    /// Ledger with delegate `key(9)` and an account `key(1)` backing it.
    fn ledger(voter_balance: i64) -> (AccountLedger, Address) {
        let mut ledger = AccountLedger::new(Arc::new(Ripemd160AddressDerivation::default()));
        let delegate = ledger.bind_public_key(&key(9)).unwrap();
        ledger
            .update(&delegate, |a| a.register_delegate(DelegateAttributes::new("nine")))
            .unwrap();
        let voter = ledger.bind_public_key(&key(1)).unwrap();
        ledger
            .update(&voter, |a| {
                a.credit(&BigInt::from(voter_balance));
                a.cast_vote(key(9))
            })
            .unwrap();
        (ledger, voter)
    }

    fn vote_balance(ledger: &AccountLedger, delegate: &PublicKey) -> BigInt {
        ledger
            .find_by_public_key(delegate)
            .unwrap()
            .delegate()
            .unwrap()
            .vote_balance()
            .clone()
    }

    #[test]
    fn test_changes_net_out_zero_entries() {
        let mut changes = VoteBalanceChanges::new();
        changes.add(key(1), BigInt::from(5));
        changes.add(key(2), BigInt::from(-3));
        changes.add(key(1), BigInt::from(-5));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get(&key(2)), Some(&BigInt::from(-3)));
        assert_eq!(changes.get(&key(1)), None);
    }

    #[test]
    fn test_vote_rule_uses_post_handler_balance() {
        let (ledger, voter) = ledger(990);
        let tx = Transaction::vote(id("v"), key(1), VoteChange::vote(key(9)), BigInt::from(10));

        let apply = VoteBalanceUpdater
            .compute(&ledger, &tx, &voter, None, None, Direction::Apply)
            .unwrap();
        assert_eq!(apply.get(&key(9)), Some(&BigInt::from(990)));

        // Revert sees the restored balance, fee included.
        let revert = VoteBalanceUpdater
            .compute(&ledger, &tx, &voter, None, None, Direction::Revert)
            .unwrap();
        assert_eq!(revert.get(&key(9)), Some(&BigInt::from(-980)));
    }

    #[test]
    fn test_unvote_rule() {
        let (ledger, voter) = ledger(990);
        let tx = Transaction::vote(id("u"), key(1), VoteChange::unvote(key(9)), BigInt::from(10));

        let apply = VoteBalanceUpdater
            .compute(&ledger, &tx, &voter, None, None, Direction::Apply)
            .unwrap();
        assert_eq!(apply.get(&key(9)), Some(&BigInt::from(-1000)));

        let revert = VoteBalanceUpdater
            .compute(&ledger, &tx, &voter, None, None, Direction::Revert)
            .unwrap();
        assert_eq!(revert.get(&key(9)), Some(&BigInt::from(990)));
    }

    #[test]
    fn test_lock_only_moves_fee() {
        let (ledger, voter) = ledger(590);
        let tx = Transaction::htlc_lock(
            id("l"),
            key(1),
            voter.clone(),
            BigInt::from(400),
            BigInt::from(10),
            "",
            dpos_state::LockExpiration::BlockHeight(9),
        );
        // The voter is also the lock recipient; locks skip the recipient rule.
        let changes = VoteBalanceUpdater
            .compute(&ledger, &tx, &voter, Some(&voter), None, Direction::Apply)
            .unwrap();
        assert_eq!(changes.get(&key(9)), Some(&BigInt::from(-10)));
    }

    #[test]
    fn test_claim_without_lock_context_is_integrity_fault() {
        let (ledger, voter) = ledger(0);
        let tx = Transaction::htlc_claim(id("c"), key(1), id("lock"), "s", BigInt::from(1));
        let err = VoteBalanceUpdater
            .compute(&ledger, &tx, &voter, None, None, Direction::Apply)
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::Integrity(IntegrityFault::LockNotFound { .. })
        ));
    }

    #[test]
    fn test_commit_checks_targets_first() {
        let (mut ledger, _voter) = ledger(100);
        let mut changes = VoteBalanceChanges::new();
        changes.add(key(9), BigInt::from(50));
        changes.add(key(1), BigInt::from(50));

        let err = VoteBalanceUpdater.commit(&mut ledger, &changes).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(vote_balance(&ledger, &key(9)), BigInt::from(0));

        let mut single = VoteBalanceChanges::new();
        single.add(key(9), BigInt::from(7));
        VoteBalanceUpdater.commit(&mut ledger, &single).unwrap();
        assert_eq!(vote_balance(&ledger, &key(9)), BigInt::from(7));
    }

    #[test]
    fn test_target_without_account_is_integrity_fault() {
        let (ledger, _voter) = ledger(100);
        let mut changes = VoteBalanceChanges::new();
        changes.add(key(42), BigInt::from(5));

        let err = VoteBalanceUpdater.validate(&ledger, &changes).unwrap_err();
        assert!(matches!(
            err,
            ChainError::Integrity(IntegrityFault::VoteTargetNotDelegate { delegate }) if delegate == key(42)
        ));
    }
}

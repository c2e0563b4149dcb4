//! Hash time-locked transfers: lock, claim and refund.
//!
//! A lock escrows value on the sender's account under the lock
//! transaction's id. Claim (by the recipient) and refund (by the owner)
//! remove the lock and move it to the ledger's settled-lock archive, from
//! which their reverts restore it.

use super::{asset_mismatch, charge, rejection, required_recipient, sender_address};
use super::{HandlerContext, TransactionHandler};
use crate::error::{ChainError, ChainResult};
use crate::transaction::{CoreTransactionType, Transaction, TransactionAsset, TransactionKey};
use dpos_primitives::{Address, TransactionId};
use dpos_state::{AccountLedger, HtlcLock, SettledLock, StateError};
use num_traits::Signed;

/// Owner address and lock record of the active lock `id`.
fn active_lock(ledger: &AccountLedger, id: &TransactionId) -> ChainResult<(Address, HtlcLock)> {
    let owner = ledger.find_by_lock(id)?;
    let lock = owner
        .lock(id)
        .cloned()
        .ok_or_else(|| StateError::LockNotFound { id: id.clone() })?;
    Ok((owner.address().clone(), lock))
}

fn settled_lock(ledger: &AccountLedger, id: &TransactionId) -> ChainResult<SettledLock> {
    let settled = ledger
        .settled_lock(id)
        .cloned()
        .ok_or_else(|| StateError::SettledLockNotFound { id: id.clone() })?;
    ledger.find_by_address(&settled.owner)?;
    Ok(settled)
}

fn lock_reference<'a>(tx: &'a Transaction, expected: &str) -> ChainResult<&'a TransactionId> {
    tx.lock_reference().ok_or_else(|| asset_mismatch(tx, expected))
}

/// Escrows `amount` from the sender for the recipient.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtlcLockHandler;

impl TransactionHandler for HtlcLockHandler {
    fn key(&self) -> TransactionKey {
        CoreTransactionType::HtlcLock.key()
    }

    fn apply(&self, ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let (secret_hash, expiration) = match &tx.asset {
            TransactionAsset::HtlcLock {
                secret_hash,
                expiration,
            } => (secret_hash, *expiration),
            _ => return Err(asset_mismatch(tx, "htlc lock")),
        };
        let recipient = required_recipient(tx)?;
        if !tx.amount.is_positive() {
            return Err(ChainError::rejected(&tx.id, "lock amount must be positive"));
        }

        let lock = HtlcLock {
            amount: tx.amount.clone(),
            recipient: recipient.clone(),
            secret_hash: secret_hash.clone(),
            expiration,
        };
        let total = &tx.amount + &tx.fee;
        let sender = ledger.bind_public_key(&tx.sender_public_key)?;
        ledger
            .update(&sender, |account| {
                charge(ctx, account, &total)?;
                account.add_lock(tx.id.clone(), lock)
            })
            .map_err(|e| rejection(tx, e))
    }

    fn revert(&self, _ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let sender = sender_address(ledger, tx)?;
        ledger.update(&sender, |account| {
            let lock = account.remove_lock(&tx.id)?;
            account.credit(&(&lock.amount + &tx.fee));
            Ok(())
        })?;
        Ok(())
    }
}

/// Releases a lock to its recipient, who pays the fee out of the amount.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtlcClaimHandler;

impl TransactionHandler for HtlcClaimHandler {
    fn key(&self) -> TransactionKey {
        CoreTransactionType::HtlcClaim.key()
    }

    fn apply(&self, ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let lock_id = lock_reference(tx, "htlc claim")?;
        let (owner, lock) = active_lock(ledger, lock_id)?;

        let claimer = ledger.bind_public_key(&tx.sender_public_key)?;
        if claimer != lock.recipient {
            return Err(ChainError::rejected(
                &tx.id,
                format!("lock {} can only be claimed by {}", lock_id, lock.recipient),
            ));
        }
        if ctx.enforces_balance() {
            let available = ledger.find_by_address(&claimer)?.balance() + &lock.amount;
            if available < tx.fee {
                let error = StateError::InsufficientBalance {
                    address: claimer,
                    required: tx.fee.clone(),
                    available,
                };
                return Err(rejection(tx, error));
            }
        }

        ledger.update(&owner, |account| account.remove_lock(lock_id))?;
        ledger.update(&claimer, |account| {
            account.credit(&lock.amount);
            account.debit(&tx.fee);
            Ok(())
        })?;
        let settled = SettledLock {
            owner,
            lock,
            settled_at: ctx.height,
        };
        ledger.archive_settled_lock(lock_id.clone(), settled);
        Ok(())
    }

    fn revert(&self, _ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let lock_id = lock_reference(tx, "htlc claim")?;
        let claimer = sender_address(ledger, tx)?;
        let settled = settled_lock(ledger, lock_id)?;

        ledger.update(&settled.owner, |account| {
            account.add_lock(lock_id.clone(), settled.lock.clone())
        })?;
        ledger.update(&claimer, |account| {
            account.debit(&settled.lock.amount);
            account.credit(&tx.fee);
            Ok(())
        })?;
        ledger.take_settled_lock(lock_id)?;
        Ok(())
    }
}

/// Returns a lock to its owner, who pays the fee out of the amount.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtlcRefundHandler;

impl TransactionHandler for HtlcRefundHandler {
    fn key(&self) -> TransactionKey {
        CoreTransactionType::HtlcRefund.key()
    }

    fn apply(&self, ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let lock_id = lock_reference(tx, "htlc refund")?;
        let (owner, lock) = active_lock(ledger, lock_id)?;

        let sender = ledger.bind_public_key(&tx.sender_public_key)?;
        if sender != owner {
            return Err(ChainError::rejected(
                &tx.id,
                format!("lock {} can only be refunded by {}", lock_id, owner),
            ));
        }

        ledger
            .update(&owner, |account| {
                let removed = account.remove_lock(lock_id)?;
                account.credit(&removed.amount);
                charge(ctx, account, &tx.fee)
            })
            .map_err(|e| rejection(tx, e))?;
        let settled = SettledLock {
            owner,
            lock,
            settled_at: ctx.height,
        };
        ledger.archive_settled_lock(lock_id.clone(), settled);
        Ok(())
    }

    fn revert(&self, _ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let lock_id = lock_reference(tx, "htlc refund")?;
        sender_address(ledger, tx)?;
        let settled = settled_lock(ledger, lock_id)?;

        ledger.update(&settled.owner, |account| {
            account.credit(&tx.fee);
            account.debit(&settled.lock.amount);
            account.add_lock(lock_id.clone(), settled.lock.clone())
        })?;
        ledger.take_settled_lock(lock_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;
    use dpos_state::LockExpiration;
    use num_bigint::BigInt;

    fn lock_tx(recipient: &Address) -> Transaction {
        Transaction::htlc_lock(
            id("lock"),
            key(1),
            recipient.clone(),
            BigInt::from(400),
            BigInt::from(10),
            "ab".repeat(32),
            LockExpiration::BlockHeight(100),
        )
    }

    fn setup() -> (AccountLedger, Address, Address) {
        let mut ledger = ledger();
        let owner = funded(&mut ledger, key(1), 1_000);
        let claimer = funded(&mut ledger, key(2), 0);
        (ledger, owner, claimer)
    }

    #[test]
    fn test_lock_escrows_amount() {
        let (mut ledger, owner, claimer) = setup();
        HtlcLockHandler.apply(&ctx(), &lock_tx(&claimer), &mut ledger).unwrap();

        let account = ledger.find_by_address(&owner).unwrap();
        assert_eq!(account.balance(), &BigInt::from(590));
        assert_eq!(account.locked_balance(), &BigInt::from(400));
        assert_eq!(ledger.find_by_lock(&id("lock")).unwrap().address(), &owner);

        HtlcLockHandler.revert(&ctx(), &lock_tx(&claimer), &mut ledger).unwrap();
        let account = ledger.find_by_address(&owner).unwrap();
        assert_eq!(account.balance(), &BigInt::from(1_000));
        assert!(account.locks().is_empty());
    }

    #[test]
    fn test_claim_round_trip() {
        let (mut ledger, owner, claimer) = setup();
        HtlcLockHandler.apply(&ctx(), &lock_tx(&claimer), &mut ledger).unwrap();
        let before = ledger.snapshot();

        let claim = Transaction::htlc_claim(id("claim"), key(2), id("lock"), "secret", BigInt::from(5));
        HtlcClaimHandler.apply(&ctx(), &claim, &mut ledger).unwrap();
        assert_eq!(balance(&ledger, &claimer), BigInt::from(395));
        assert!(ledger.find_by_address(&owner).unwrap().locks().is_empty());
        assert_eq!(ledger.settled_lock(&id("lock")).unwrap().owner, owner);

        HtlcClaimHandler.revert(&ctx(), &claim, &mut ledger).unwrap();
        assert_eq!(ledger.snapshot(), before);
        assert!(ledger.settled_lock(&id("lock")).is_none());
    }

    #[test]
    fn test_claim_by_stranger_is_rejected() {
        let (mut ledger, _owner, claimer) = setup();
        funded(&mut ledger, key(3), 50);
        HtlcLockHandler.apply(&ctx(), &lock_tx(&claimer), &mut ledger).unwrap();
        let before = ledger.snapshot();

        let claim = Transaction::htlc_claim(id("claim"), key(3), id("lock"), "secret", BigInt::from(5));
        let err = HtlcClaimHandler.apply(&ctx(), &claim, &mut ledger).unwrap_err();
        assert!(matches!(err, ChainError::Rejected { .. }));
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_claim_of_unknown_lock_is_fatal() {
        let (mut ledger, _owner, _claimer) = setup();
        let claim = Transaction::htlc_claim(id("claim"), key(2), id("nope"), "secret", BigInt::from(5));
        let err = HtlcClaimHandler.apply(&ctx(), &claim, &mut ledger).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_refund_round_trip() {
        let (mut ledger, owner, claimer) = setup();
        HtlcLockHandler.apply(&ctx(), &lock_tx(&claimer), &mut ledger).unwrap();
        let before = ledger.snapshot();

        let refund = Transaction::htlc_refund(id("refund"), key(1), id("lock"), BigInt::from(5));
        HtlcRefundHandler.apply(&ctx(), &refund, &mut ledger).unwrap();
        let account = ledger.find_by_address(&owner).unwrap();
        assert_eq!(account.balance(), &BigInt::from(985));
        assert!(account.locked_balance() == &BigInt::from(0));

        HtlcRefundHandler.revert(&ctx(), &refund, &mut ledger).unwrap();
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_refund_by_recipient_is_rejected() {
        let (mut ledger, _owner, claimer) = setup();
        HtlcLockHandler.apply(&ctx(), &lock_tx(&claimer), &mut ledger).unwrap();

        let refund = Transaction::htlc_refund(id("refund"), key(2), id("lock"), BigInt::from(5));
        assert!(matches!(
            HtlcRefundHandler.apply(&ctx(), &refund, &mut ledger),
            Err(ChainError::Rejected { .. })
        ));
    }
}

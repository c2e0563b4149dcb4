use super::{asset_mismatch, charge, rejection, sender_address, HandlerContext, TransactionHandler};
use crate::error::{ChainError, ChainResult};
use crate::transaction::{
    CoreTransactionType, Transaction, TransactionAsset, TransactionKey, VoteChange, VoteDirection,
};
use dpos_state::AccountLedger;

/// Starts or stops the sender's backing of a delegate.
#[derive(Debug, Default, Clone, Copy)]
pub struct VoteHandler;

impl VoteHandler {
    fn change(tx: &Transaction) -> ChainResult<VoteChange> {
        match &tx.asset {
            TransactionAsset::Vote(change) => Ok(*change),
            _ => Err(asset_mismatch(tx, "vote")),
        }
    }

    /// A new vote must target an active delegate.
    fn check_target(tx: &Transaction, change: &VoteChange, ledger: &AccountLedger) -> ChainResult<()> {
        let delegate = ledger
            .find_by_public_key(&change.delegate)
            .ok()
            .and_then(|account| account.delegate())
            .ok_or_else(|| {
                ChainError::rejected(&tx.id, format!("{} is not a delegate", change.delegate))
            })?;
        if delegate.is_resigned() {
            return Err(ChainError::rejected(
                &tx.id,
                format!("delegate '{}' has resigned", delegate.username()),
            ));
        }
        Ok(())
    }
}

impl TransactionHandler for VoteHandler {
    fn key(&self) -> TransactionKey {
        CoreTransactionType::Vote.key()
    }

    fn apply(&self, ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let change = Self::change(tx)?;
        if change.direction == VoteDirection::Vote {
            Self::check_target(tx, &change, ledger)?;
        }

        let sender = ledger.bind_public_key(&tx.sender_public_key)?;
        ledger
            .update(&sender, |account| {
                charge(ctx, account, &tx.fee)?;
                match change.direction {
                    VoteDirection::Vote => account.cast_vote(change.delegate),
                    VoteDirection::Unvote => account.withdraw_vote(&change.delegate),
                }
            })
            .map_err(|e| rejection(tx, e))
    }

    fn revert(&self, _ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let change = Self::change(tx)?;
        let sender = sender_address(ledger, tx)?;
        ledger.update(&sender, |account| {
            match change.direction {
                VoteDirection::Vote => account.withdraw_vote(&change.delegate)?,
                VoteDirection::Unvote => account.cast_vote(change.delegate)?,
            }
            account.credit(&tx.fee);
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;
    use dpos_state::DelegateAttributes;
    use num_bigint::BigInt;

    fn with_delegate(resigned: bool) -> AccountLedger {
        let mut ledger = ledger();
        let delegate = funded(&mut ledger, key(9), 0);
        ledger
            .update(&delegate, |account| {
                account.register_delegate(DelegateAttributes::new("target"))?;
                if resigned {
                    account.set_resigned(true)?;
                }
                Ok(())
            })
            .unwrap();
        funded(&mut ledger, key(1), 100);
        ledger
    }

    fn vote(change: VoteChange) -> Transaction {
        Transaction::vote(id("vote"), key(1), change, BigInt::from(1))
    }

    #[test]
    fn test_vote_and_unvote() {
        let mut ledger = with_delegate(false);
        let tx = vote(VoteChange::vote(key(9)));

        VoteHandler.apply(&ctx(), &tx, &mut ledger).unwrap();
        let voter = ledger.find_by_public_key(&key(1)).unwrap();
        assert_eq!(voter.vote(), Some(&key(9)));
        assert_eq!(voter.balance(), &BigInt::from(99));
        assert_eq!(ledger.voters_of(&key(9)).count(), 1);

        let unvote = vote(VoteChange::unvote(key(9)));
        VoteHandler.apply(&ctx(), &unvote, &mut ledger).unwrap();
        assert!(ledger.find_by_public_key(&key(1)).unwrap().vote().is_none());

        VoteHandler.revert(&ctx(), &unvote, &mut ledger).unwrap();
        VoteHandler.revert(&ctx(), &tx, &mut ledger).unwrap();
        let voter = ledger.find_by_public_key(&key(1)).unwrap();
        assert!(voter.vote().is_none());
        assert_eq!(voter.balance(), &BigInt::from(100));
    }

    #[test]
    fn test_vote_for_non_delegate_is_rejected() {
        let mut ledger = with_delegate(false);
        funded(&mut ledger, key(5), 0);
        for target in [key(5), key(6)] {
            let err = VoteHandler
                .apply(&ctx(), &vote(VoteChange::vote(target)), &mut ledger)
                .unwrap_err();
            assert!(matches!(err, ChainError::Rejected { .. }));
        }
    }

    #[test]
    fn test_vote_for_resigned_delegate_is_rejected() {
        let mut ledger = with_delegate(true);
        let err = VoteHandler
            .apply(&ctx(), &vote(VoteChange::vote(key(9))), &mut ledger)
            .unwrap_err();
        assert!(err.to_string().contains("resigned"));
    }

    #[test]
    fn test_unvote_without_vote_is_rejected() {
        let mut ledger = with_delegate(false);
        let before = ledger.snapshot();
        assert!(VoteHandler
            .apply(&ctx(), &vote(VoteChange::unvote(key(9))), &mut ledger)
            .is_err());
        assert_eq!(ledger.snapshot(), before);
    }
}

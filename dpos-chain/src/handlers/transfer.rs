use super::{charge, rejection, required_recipient, sender_address, HandlerContext, TransactionHandler};
use crate::error::ChainResult;
use crate::transaction::{CoreTransactionType, Transaction, TransactionKey};
use dpos_state::AccountLedger;

/// Moves `amount` from the sender to the recipient.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransferHandler;

impl TransactionHandler for TransferHandler {
    fn key(&self) -> TransactionKey {
        CoreTransactionType::Transfer.key()
    }

    fn apply(&self, ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let recipient = required_recipient(tx)?;
        let total = &tx.amount + &tx.fee;

        let sender = ledger.bind_public_key(&tx.sender_public_key)?;
        ledger
            .update(&sender, |account| charge(ctx, account, &total))
            .map_err(|e| rejection(tx, e))?;

        ledger.get_or_create(recipient);
        ledger.update(recipient, |account| {
            account.credit(&tx.amount);
            Ok(())
        })?;
        Ok(())
    }

    fn revert(&self, _ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let recipient = required_recipient(tx)?;
        let sender = sender_address(ledger, tx)?;
        ledger.find_by_address(recipient)?;

        ledger.update(recipient, |account| {
            account.debit(&tx.amount);
            Ok(())
        })?;
        ledger.update(&sender, |account| {
            account.credit(&(&tx.amount + &tx.fee));
            Ok(())
        })?;
        Ok(())
    }
}

use super::{charge, rejection, sender_address, HandlerContext, TransactionHandler};
use crate::error::{ChainError, ChainResult};
use crate::transaction::{CoreTransactionType, Transaction, TransactionKey};
use dpos_state::AccountLedger;
use num_traits::Signed;

/// Pays several recipients out of one sender debit.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiPaymentHandler;

impl TransactionHandler for MultiPaymentHandler {
    fn key(&self) -> TransactionKey {
        CoreTransactionType::MultiPayment.key()
    }

    fn apply(&self, ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let payments = tx.payments();
        if payments.is_empty() {
            return Err(ChainError::rejected(&tx.id, "multi-payment without payments"));
        }
        if payments.iter().any(|p| !p.amount.is_positive()) {
            return Err(ChainError::rejected(&tx.id, "payment amounts must be positive"));
        }

        let total = tx.transferred_amount() + &tx.fee;
        let sender = ledger.bind_public_key(&tx.sender_public_key)?;
        ledger
            .update(&sender, |account| charge(ctx, account, &total))
            .map_err(|e| rejection(tx, e))?;

        for payment in payments {
            ledger.get_or_create(&payment.recipient);
            ledger.update(&payment.recipient, |account| {
                account.credit(&payment.amount);
                Ok(())
            })?;
        }
        Ok(())
    }

    fn revert(&self, _ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let sender = sender_address(ledger, tx)?;
        let payments = tx.payments();
        for payment in payments {
            ledger.find_by_address(&payment.recipient)?;
        }

        for payment in payments.iter().rev() {
            ledger.update(&payment.recipient, |account| {
                account.debit(&payment.amount);
                Ok(())
            })?;
        }
        let total = tx.transferred_amount() + &tx.fee;
        ledger.update(&sender, |account| {
            account.credit(&total);
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;
    use crate::transaction::Payment;
    use dpos_primitives::Address;
    use num_bigint::BigInt;

    fn payment(recipient: &str, amount: i64) -> Payment {
        Payment {
            recipient: Address::new(recipient).unwrap(),
            amount: BigInt::from(amount),
        }
    }

    #[test]
    fn test_pays_every_recipient() {
        let mut ledger = ledger();
        let sender = funded(&mut ledger, key(1), 1_000);
        let tx = Transaction::multi_payment(
            id("mp"),
            key(1),
            vec![payment("DA", 100), payment("DB", 50), payment("DA", 5)],
            BigInt::from(10),
        );

        MultiPaymentHandler.apply(&ctx(), &tx, &mut ledger).unwrap();
        assert_eq!(balance(&ledger, &sender), BigInt::from(835));
        assert_eq!(balance(&ledger, &Address::new("DA").unwrap()), BigInt::from(105));
        assert_eq!(balance(&ledger, &Address::new("DB").unwrap()), BigInt::from(50));

        MultiPaymentHandler.revert(&ctx(), &tx, &mut ledger).unwrap();
        assert_eq!(balance(&ledger, &sender), BigInt::from(1_000));
        assert_eq!(ledger.snapshot().accounts.len(), 1);
    }

    #[test]
    fn test_rejects_empty_and_non_positive_payments() {
        let mut ledger = ledger();
        funded(&mut ledger, key(1), 1_000);

        let empty = Transaction::multi_payment(id("e"), key(1), Vec::new(), BigInt::from(1));
        assert!(matches!(
            MultiPaymentHandler.apply(&ctx(), &empty, &mut ledger),
            Err(ChainError::Rejected { .. })
        ));

        let zero = Transaction::multi_payment(id("z"), key(1), vec![payment("DA", 0)], BigInt::from(1));
        assert!(matches!(
            MultiPaymentHandler.apply(&ctx(), &zero, &mut ledger),
            Err(ChainError::Rejected { .. })
        ));
    }
}

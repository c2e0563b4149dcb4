use super::{asset_mismatch, charge, rejection, sender_address, HandlerContext, TransactionHandler};
use crate::error::{ChainError, ChainResult};
use crate::transaction::{CoreTransactionType, Transaction, TransactionAsset, TransactionKey};
use dpos_state::{AccountLedger, DelegateAttributes, StateError};

const MAX_USERNAME_LENGTH: usize = 20;

fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() || username.len() > MAX_USERNAME_LENGTH {
        return Err(format!(
            "username must be 1 to {} characters long",
            MAX_USERNAME_LENGTH
        ));
    }
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || "!@$&_.".contains(c);
    if !username.chars().all(allowed) {
        return Err(format!("username '{}' contains invalid characters", username));
    }
    Ok(())
}

/// Turns the sender into a delegate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelegateRegistrationHandler;

impl DelegateRegistrationHandler {
    fn username(tx: &Transaction) -> ChainResult<&str> {
        match &tx.asset {
            TransactionAsset::DelegateRegistration { username } => Ok(username),
            _ => Err(asset_mismatch(tx, "delegate registration")),
        }
    }
}

impl TransactionHandler for DelegateRegistrationHandler {
    fn key(&self) -> TransactionKey {
        CoreTransactionType::DelegateRegistration.key()
    }

    fn apply(&self, ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let username = Self::username(tx)?;
        validate_username(username).map_err(|reason| ChainError::rejected(&tx.id, reason))?;
        if ledger.find_by_username(username).is_ok() {
            let taken = StateError::UsernameTaken {
                username: username.to_string(),
            };
            return Err(rejection(tx, taken));
        }

        let sender = ledger.bind_public_key(&tx.sender_public_key)?;
        ledger
            .update(&sender, |account| {
                charge(ctx, account, &tx.fee)?;
                account.register_delegate(DelegateAttributes::new(username))
            })
            .map_err(|e| rejection(tx, e))?;

        tracing::debug!("Registered delegate '{}' at {}", username, sender);
        Ok(())
    }

    fn revert(&self, _ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let username = Self::username(tx)?;
        let sender = sender_address(ledger, tx)?;
        let attributes = ledger.update(&sender, |account| {
            let attributes = account.unregister_delegate()?;
            account.credit(&tx.fee);
            Ok(attributes)
        })?;

        if attributes.username() != username {
            tracing::warn!(
                "Reverted registration of '{}' removed delegate '{}'",
                username,
                attributes.username()
            );
        }
        Ok(())
    }
}

/// Marks the sender's delegate as resigned.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelegateResignationHandler;

impl TransactionHandler for DelegateResignationHandler {
    fn key(&self) -> TransactionKey {
        CoreTransactionType::DelegateResignation.key()
    }

    fn apply(&self, ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let sender = ledger.bind_public_key(&tx.sender_public_key)?;
        ledger
            .update(&sender, |account| {
                charge(ctx, account, &tx.fee)?;
                account.set_resigned(true)
            })
            .map_err(|e| rejection(tx, e))
    }

    fn revert(&self, _ctx: &HandlerContext, tx: &Transaction, ledger: &mut AccountLedger) -> ChainResult<()> {
        let sender = sender_address(ledger, tx)?;
        ledger.update(&sender, |account| {
            account.set_resigned(false)?;
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
    use num_bigint::BigInt;

    fn registration(sender: u8, username: &str) -> Transaction {
        Transaction::delegate_registration(id(username), key(sender), username, BigInt::from(25))
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("genesis_1").is_ok());
        assert!(validate_username("a.b!c@d$e&f").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("UPPER").is_err());
        assert!(validate_username("with space").is_err());
        assert!(validate_username(&"x".repeat(21)).is_err());
    }

    #[test]
    fn test_registration_round_trip() {
        let mut ledger = ledger();
        let sender = funded(&mut ledger, key(1), 100);
        let before = ledger.snapshot();
        let tx = registration(1, "alpha");

        DelegateRegistrationHandler.apply(&ctx(), &tx, &mut ledger).unwrap();
        let account = ledger.find_by_username("alpha").unwrap();
        assert_eq!(account.address(), &sender);
        assert_eq!(account.balance(), &BigInt::from(75));

        DelegateRegistrationHandler.revert(&ctx(), &tx, &mut ledger).unwrap();
        assert_eq!(ledger.snapshot(), before);
        assert!(ledger.find_by_username("alpha").is_err());
    }

    #[test]
    fn test_duplicate_username_is_rejected() {
        let mut ledger = ledger();
        funded(&mut ledger, key(1), 100);
        funded(&mut ledger, key(2), 100);
        DelegateRegistrationHandler
            .apply(&ctx(), &registration(1, "alpha"), &mut ledger)
            .unwrap();

        let err = DelegateRegistrationHandler
            .apply(&ctx(), &registration(2, "alpha"), &mut ledger)
            .unwrap_err();
        assert!(matches!(err, ChainError::Rejected { .. }));
        assert!(err.to_string().contains("already taken"));
    }

    #[test]
    fn test_resignation_requires_active_delegate() {
        let mut ledger = ledger();
        funded(&mut ledger, key(1), 100);
        let resign = Transaction::delegate_resignation(id("resign"), key(1), BigInt::from(5));

        assert!(matches!(
            DelegateResignationHandler.apply(&ctx(), &resign, &mut ledger),
            Err(ChainError::Rejected { .. })
        ));

        DelegateRegistrationHandler
            .apply(&ctx(), &registration(1, "alpha"), &mut ledger)
            .unwrap();
        DelegateResignationHandler.apply(&ctx(), &resign, &mut ledger).unwrap();
        assert!(ledger
            .find_by_username("alpha")
            .unwrap()
            .delegate()
            .unwrap()
            .is_resigned());
        assert!(DelegateResignationHandler
            .apply(&ctx(), &resign, &mut ledger)
            .is_err());

        DelegateResignationHandler.revert(&ctx(), &resign, &mut ledger).unwrap();
        let account = ledger.find_by_username("alpha").unwrap();
        assert!(!account.delegate().unwrap().is_resigned());
        assert_eq!(account.balance(), &BigInt::from(75));
    }
}

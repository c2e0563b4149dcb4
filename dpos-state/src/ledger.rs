//! In-memory account ledger.

use crate::index::LedgerIndexes;
use crate::{Account, HtlcLock, StateError, StateResult};
use dpos_primitives::{Address, AddressDerivation, PublicKey, TransactionId};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Key for an account existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountLookup<'a> {
    Address(&'a Address),
    PublicKey(&'a PublicKey),
}

impl<'a> From<&'a Address> for AccountLookup<'a> {
    fn from(address: &'a Address) -> Self {
        AccountLookup::Address(address)
    }
}

impl<'a> From<&'a PublicKey> for AccountLookup<'a> {
    fn from(public_key: &'a PublicKey) -> Self {
        AccountLookup::PublicKey(public_key)
    }
}

/// A claimed or refunded lock, retained so the settlement can be reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledLock {
    /// Account that created the lock.
    pub owner: Address,
    /// The lock record as it was when settled.
    pub lock: HtlcLock,
    /// Height of the block that settled the lock.
    pub settled_at: u32,
}

/// Comparable copy of everything observable in the ledger.
///
/// Empty accounts are left out: accounts are never deleted, so an account
/// created lazily by a transaction survives that transaction's revert with
/// nothing in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub accounts: BTreeMap<Address, Account>,
    pub settled_locks: BTreeMap<TransactionId, SettledLock>,
}

impl LedgerSnapshot {
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }
}

/// Indexed collection of accounts.
///
/// The primary index is the address. Public key, delegate username, active
/// lock id and vote target are secondary indices kept consistent by
/// [`update`](Self::update) and [`reindex`](Self::reindex).
pub struct AccountLedger {
    accounts: HashMap<Address, Account>,
    indexes: LedgerIndexes,
    settled_locks: HashMap<TransactionId, SettledLock>,
    derivation: Arc<dyn AddressDerivation>,
}

impl AccountLedger {
    /// Creates an empty ledger using `derivation` to map public keys to addresses.
    pub fn new(derivation: Arc<dyn AddressDerivation>) -> Self {
        Self {
            accounts: HashMap::new(),
            indexes: LedgerIndexes::default(),
            settled_locks: HashMap::new(),
            derivation,
        }
    }

    /// Derives the address controlled by `public_key`.
    pub fn derive_address(&self, public_key: &PublicKey) -> Address {
        self.derivation.derive(public_key)
    }

    /// Number of accounts, empty ones included.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn has_address(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    pub fn has_public_key(&self, public_key: &PublicKey) -> bool {
        self.indexes.address_of_public_key(public_key).is_some()
    }

    pub fn has_account<'a>(&self, lookup: impl Into<AccountLookup<'a>>) -> bool {
        match lookup.into() {
            AccountLookup::Address(address) => self.has_address(address),
            AccountLookup::PublicKey(public_key) => self.has_public_key(public_key),
        }
    }

    /// Returns the account at `address`, creating an empty one if needed.
    pub fn get_or_create(&mut self, address: &Address) -> &Account {
        if !self.accounts.contains_key(address) {
            let account = Account::new(address.clone());
            // A bare account occupies no secondary keys, so this cannot conflict.
            if let Err(e) = self.indexes.reindex(&account) {
                tracing::error!("Indexing new account {} failed: {}", address, e);
            }
            tracing::trace!("Created account {}", address);
            self.accounts.insert(address.clone(), account);
        }
        &self.accounts[address]
    }

    pub fn find_by_address(&self, address: &Address) -> StateResult<&Account> {
        self.accounts
            .get(address)
            .ok_or_else(|| StateError::address_not_found(address))
    }

    pub fn find_by_public_key(&self, public_key: &PublicKey) -> StateResult<&Account> {
        let address = self.address_of(public_key)?;
        self.find_by_address(address)
    }

    pub fn find_by_username(&self, username: &str) -> StateResult<&Account> {
        let address = self
            .indexes
            .address_of_username(username)
            .ok_or_else(|| StateError::username_not_found(username))?;
        self.find_by_address(address)
    }

    /// Returns the account owning the active lock `id`.
    pub fn find_by_lock(&self, id: &TransactionId) -> StateResult<&Account> {
        let address = self
            .indexes
            .address_of_lock(id)
            .ok_or_else(|| StateError::LockNotFound { id: id.clone() })?;
        self.find_by_address(address)
    }

    /// Address bound to `public_key`.
    pub fn address_of(&self, public_key: &PublicKey) -> StateResult<&Address> {
        self.indexes
            .address_of_public_key(public_key)
            .ok_or_else(|| StateError::public_key_not_found(public_key))
    }

    /// Addresses of the accounts currently voting for `delegate`.
    pub fn voters_of(&self, delegate: &PublicKey) -> impl Iterator<Item = &Address> + '_ {
        self.indexes
            .voters_of(delegate)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    /// Accounts carrying validator attributes.
    pub fn delegates(&self) -> impl Iterator<Item = &Account> + '_ {
        self.accounts.values().filter(|a| a.is_delegate())
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> + '_ {
        self.accounts.values()
    }

    /// Returns the address bound to `public_key`, binding it first if needed.
    ///
    /// An unbound key is mapped to its derived address, the account there is
    /// created if missing, and the key is assigned and indexed.
    pub fn bind_public_key(&mut self, public_key: &PublicKey) -> StateResult<Address> {
        if let Some(address) = self.indexes.address_of_public_key(public_key) {
            return Ok(address.clone());
        }

        let address = self.derive_address(public_key);
        self.get_or_create(&address);
        self.update(&address, |account| account.set_public_key(*public_key))?;
        tracing::debug!("Bound public key {} to {}", public_key, address);
        Ok(address)
    }

    /// Mutates one account and reindexes it.
    ///
    /// The closure runs against a copy; the ledger is only changed when both
    /// the closure and the reindex succeed, so a failed update leaves no trace.
    pub fn update<R>(
        &mut self,
        address: &Address,
        f: impl FnOnce(&mut Account) -> StateResult<R>,
    ) -> StateResult<R> {
        let mut draft = self.find_by_address(address)?.clone();
        let result = f(&mut draft)?;
        self.indexes.reindex(&draft)?;
        self.accounts.insert(address.clone(), draft);
        Ok(result)
    }

    /// Re-derives every secondary index entry for the account at `address`.
    pub fn reindex(&mut self, address: &Address) -> StateResult<()> {
        let account = self
            .accounts
            .get(address)
            .ok_or_else(|| StateError::address_not_found(address))?;
        self.indexes.reindex(account)
    }

    /// Archives a lock removed by a claim or refund.
    ///
    /// Entries stay until the settling transaction is reverted or
    /// [`prune_settled_locks`](Self::prune_settled_locks) drops them.
    pub fn archive_settled_lock(&mut self, id: TransactionId, settled: SettledLock) {
        self.settled_locks.insert(id, settled);
    }

    pub fn settled_lock(&self, id: &TransactionId) -> Option<&SettledLock> {
        self.settled_locks.get(id)
    }

    /// Drops archived locks settled at or below `final_height`.
    ///
    /// Blocks at those heights can no longer be reverted afterwards. Returns
    /// the number of entries removed.
    pub fn prune_settled_locks(&mut self, final_height: u32) -> usize {
        let before = self.settled_locks.len();
        self.settled_locks
            .retain(|_, settled| settled.settled_at > final_height);
        let pruned = before - self.settled_locks.len();
        if pruned > 0 {
            tracing::debug!(
                "Pruned {} settled locks at or below height {}",
                pruned,
                final_height
            );
        }
        pruned
    }

    /// Removes a lock from the archive so it can be restored to its owner.
    pub fn take_settled_lock(&mut self, id: &TransactionId) -> StateResult<SettledLock> {
        self.settled_locks
            .remove(id)
            .ok_or_else(|| StateError::SettledLockNotFound { id: id.clone() })
    }

    /// Copies all non-empty accounts and the settled-lock archive.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            accounts: self
                .accounts
                .iter()
                .filter(|(_, account)| !account.is_empty())
                .map(|(address, account)| (address.clone(), account.clone()))
                .collect(),
            settled_locks: self
                .settled_locks
                .iter()
                .map(|(id, settled)| (id.clone(), settled.clone()))
                .collect(),
        }
    }
}

impl fmt::Debug for AccountLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountLedger")
            .field("accounts", &self.accounts.len())
            .field("settled_locks", &self.settled_locks.len())
            .finish()
    }
}

//! Secondary indices over the account ledger.
//!
//! Every indexed key is derived from account attributes. For each account the
//! keys it currently occupies are remembered, so a reindex can drop stale keys
//! before inserting the new ones.

use crate::{Account, StateError, StateResult};
use dpos_primitives::{Address, PublicKey, TransactionId};
use hashbrown::HashMap;
use std::collections::BTreeSet;

/// Index keys an account occupies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct IndexEntry {
    public_key: Option<PublicKey>,
    username: Option<String>,
    vote: Option<PublicKey>,
    locks: Vec<TransactionId>,
}

impl IndexEntry {
    fn of(account: &Account) -> Self {
        Self {
            public_key: account.public_key().copied(),
            username: account.delegate().map(|d| d.username().to_string()),
            vote: account.vote().copied(),
            locks: account.locks().keys().cloned().collect(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct LedgerIndexes {
    by_public_key: HashMap<PublicKey, Address>,
    by_username: HashMap<String, Address>,
    by_lock: HashMap<TransactionId, Address>,
    voters: HashMap<PublicKey, BTreeSet<Address>>,
    entries: HashMap<Address, IndexEntry>,
}

impl LedgerIndexes {
    pub(crate) fn address_of_public_key(&self, public_key: &PublicKey) -> Option<&Address> {
        self.by_public_key.get(public_key)
    }

    pub(crate) fn address_of_username(&self, username: &str) -> Option<&Address> {
        self.by_username.get(username)
    }

    pub(crate) fn address_of_lock(&self, id: &TransactionId) -> Option<&Address> {
        self.by_lock.get(id)
    }

    pub(crate) fn voters_of(&self, delegate: &PublicKey) -> Option<&BTreeSet<Address>> {
        self.voters.get(delegate)
    }

    /// Brings every index in line with `account`.
    ///
    /// Conflicts are detected before anything is touched, so a failed
    /// reindex leaves all indices unchanged.
    pub(crate) fn reindex(&mut self, account: &Account) -> StateResult<()> {
        let address = account.address();
        let next = IndexEntry::of(account);

        if let Some(key) = &next.public_key {
            check_owner(self.by_public_key.get(key), address, "public_key", || key.to_hex())?;
        }
        if let Some(username) = &next.username {
            check_owner(self.by_username.get(username), address, "username", || {
                username.clone()
            })?;
        }
        for id in &next.locks {
            check_owner(self.by_lock.get(id), address, "lock", || id.to_string())?;
        }

        if let Some(previous) = self.entries.remove(address) {
            self.remove_entry(address, &previous);
        }
        self.insert_entry(address, &next);
        self.entries.insert(address.clone(), next);
        Ok(())
    }

    fn remove_entry(&mut self, address: &Address, entry: &IndexEntry) {
        if let Some(key) = &entry.public_key {
            self.by_public_key.remove(key);
        }
        if let Some(username) = &entry.username {
            self.by_username.remove(username);
        }
        for id in &entry.locks {
            self.by_lock.remove(id);
        }
        if let Some(delegate) = &entry.vote {
            if let Some(set) = self.voters.get_mut(delegate) {
                set.remove(address);
                if set.is_empty() {
                    self.voters.remove(delegate);
                }
            }
        }
    }

    fn insert_entry(&mut self, address: &Address, entry: &IndexEntry) {
        if let Some(key) = entry.public_key {
            self.by_public_key.insert(key, address.clone());
        }
        if let Some(username) = &entry.username {
            self.by_username.insert(username.clone(), address.clone());
        }
        for id in &entry.locks {
            self.by_lock.insert(id.clone(), address.clone());
        }
        if let Some(delegate) = entry.vote {
            self.voters
                .entry(delegate)
                .or_default()
                .insert(address.clone());
        }
    }
}

fn check_owner(
    current: Option<&Address>,
    address: &Address,
    name: &'static str,
    describe: impl FnOnce() -> String,
) -> StateResult<()> {
    match current {
        Some(owner) if owner != address => Err(StateError::IndexConflict {
            index: name,
            key: describe(),
            owner: owner.clone(),
        }),
        _ => Ok(()),
    }
}

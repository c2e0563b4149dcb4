//! Transactions as consumed by the state engine.
//!
//! Transactions arrive already deserialized and validated; the engine only
//! needs their kind, the parties, the amounts and the kind-specific asset.

use dpos_primitives::{Address, PublicKey, TransactionId};
use dpos_state::LockExpiration;
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type group of the built-in transaction kinds.
pub const CORE_TYPE_GROUP: u32 = 1;

/// Handler registry key: transaction type within a type group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionKey {
    pub type_group: u32,
    pub transaction_type: u16,
}

impl TransactionKey {
    pub const fn new(type_group: u32, transaction_type: u16) -> Self {
        Self {
            type_group,
            transaction_type,
        }
    }

    pub const fn core(kind: CoreTransactionType) -> Self {
        Self::new(CORE_TYPE_GROUP, kind as u16)
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_group, self.transaction_type)
    }
}

/// Built-in transaction kinds of the core type group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CoreTransactionType {
    Transfer = 0,
    DelegateRegistration = 2,
    Vote = 3,
    MultiPayment = 6,
    DelegateResignation = 7,
    HtlcLock = 8,
    HtlcClaim = 9,
    HtlcRefund = 10,
}

impl CoreTransactionType {
    pub const ALL: [CoreTransactionType; 8] = [
        CoreTransactionType::Transfer,
        CoreTransactionType::DelegateRegistration,
        CoreTransactionType::Vote,
        CoreTransactionType::MultiPayment,
        CoreTransactionType::DelegateResignation,
        CoreTransactionType::HtlcLock,
        CoreTransactionType::HtlcClaim,
        CoreTransactionType::HtlcRefund,
    ];

    /// Maps a raw type value to a core kind.
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| *kind as u16 == value)
    }

    pub fn key(self) -> TransactionKey {
        TransactionKey::core(self)
    }
}

/// Whether a vote asset adds or removes backing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Vote,
    Unvote,
}

/// A single `+key` / `-key` vote entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteChange {
    pub direction: VoteDirection,
    pub delegate: PublicKey,
}

impl VoteChange {
    pub fn vote(delegate: PublicKey) -> Self {
        Self {
            direction: VoteDirection::Vote,
            delegate,
        }
    }

    pub fn unvote(delegate: PublicKey) -> Self {
        Self {
            direction: VoteDirection::Unvote,
            delegate,
        }
    }
}

impl fmt::Display for VoteChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.direction {
            VoteDirection::Vote => '+',
            VoteDirection::Unvote => '-',
        };
        write!(f, "{}{}", sign, self.delegate.to_hex())
    }
}

impl FromStr for VoteChange {
    type Err = dpos_primitives::PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (direction, key) = match s.as_bytes().first() {
            Some(b'+') => (VoteDirection::Vote, &s[1..]),
            Some(b'-') => (VoteDirection::Unvote, &s[1..]),
            _ => (VoteDirection::Vote, s),
        };
        Ok(Self {
            direction,
            delegate: PublicKey::from_hex(key)?,
        })
    }
}

/// One recipient of a multi-payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub recipient: Address,
    pub amount: BigInt,
}

/// Kind-specific transaction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionAsset {
    None,
    DelegateRegistration {
        username: String,
    },
    Vote(VoteChange),
    MultiPayment(Vec<Payment>),
    HtlcLock {
        secret_hash: String,
        expiration: LockExpiration,
    },
    HtlcClaim {
        lock_transaction_id: TransactionId,
        unlock_secret: String,
    },
    HtlcRefund {
        lock_transaction_id: TransactionId,
    },
}

/// A validated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub type_group: u32,
    pub transaction_type: u16,
    pub sender_public_key: PublicKey,
    pub recipient: Option<Address>,
    pub amount: BigInt,
    pub fee: BigInt,
    pub asset: TransactionAsset,
}

impl Transaction {
    fn core(
        id: TransactionId,
        kind: CoreTransactionType,
        sender_public_key: PublicKey,
        fee: BigInt,
        asset: TransactionAsset,
    ) -> Self {
        Self {
            id,
            type_group: CORE_TYPE_GROUP,
            transaction_type: kind as u16,
            sender_public_key,
            recipient: None,
            amount: BigInt::zero(),
            fee,
            asset,
        }
    }

    pub fn transfer(
        id: TransactionId,
        sender: PublicKey,
        recipient: Address,
        amount: BigInt,
        fee: BigInt,
    ) -> Self {
        Self {
            recipient: Some(recipient),
            amount,
            ..Self::core(id, CoreTransactionType::Transfer, sender, fee, TransactionAsset::None)
        }
    }

    pub fn delegate_registration(
        id: TransactionId,
        sender: PublicKey,
        username: impl Into<String>,
        fee: BigInt,
    ) -> Self {
        let asset = TransactionAsset::DelegateRegistration {
            username: username.into(),
        };
        Self::core(id, CoreTransactionType::DelegateRegistration, sender, fee, asset)
    }

    pub fn vote(id: TransactionId, sender: PublicKey, change: VoteChange, fee: BigInt) -> Self {
        Self::core(
            id,
            CoreTransactionType::Vote,
            sender,
            fee,
            TransactionAsset::Vote(change),
        )
    }

    pub fn multi_payment(
        id: TransactionId,
        sender: PublicKey,
        payments: Vec<Payment>,
        fee: BigInt,
    ) -> Self {
        Self::core(
            id,
            CoreTransactionType::MultiPayment,
            sender,
            fee,
            TransactionAsset::MultiPayment(payments),
        )
    }

    pub fn delegate_resignation(id: TransactionId, sender: PublicKey, fee: BigInt) -> Self {
        Self::core(
            id,
            CoreTransactionType::DelegateResignation,
            sender,
            fee,
            TransactionAsset::None,
        )
    }

    pub fn htlc_lock(
        id: TransactionId,
        sender: PublicKey,
        recipient: Address,
        amount: BigInt,
        fee: BigInt,
        secret_hash: impl Into<String>,
        expiration: LockExpiration,
    ) -> Self {
        let asset = TransactionAsset::HtlcLock {
            secret_hash: secret_hash.into(),
            expiration,
        };
        Self {
            recipient: Some(recipient),
            amount,
            ..Self::core(id, CoreTransactionType::HtlcLock, sender, fee, asset)
        }
    }

    pub fn htlc_claim(
        id: TransactionId,
        sender: PublicKey,
        lock_transaction_id: TransactionId,
        unlock_secret: impl Into<String>,
        fee: BigInt,
    ) -> Self {
        let asset = TransactionAsset::HtlcClaim {
            lock_transaction_id,
            unlock_secret: unlock_secret.into(),
        };
        Self::core(id, CoreTransactionType::HtlcClaim, sender, fee, asset)
    }

    pub fn htlc_refund(
        id: TransactionId,
        sender: PublicKey,
        lock_transaction_id: TransactionId,
        fee: BigInt,
    ) -> Self {
        let asset = TransactionAsset::HtlcRefund {
            lock_transaction_id,
        };
        Self::core(id, CoreTransactionType::HtlcRefund, sender, fee, asset)
    }

    /// Registry key of this transaction.
    pub fn key(&self) -> TransactionKey {
        TransactionKey::new(self.type_group, self.transaction_type)
    }

    /// The core kind, or `None` for other type groups and unknown types.
    pub fn core_type(&self) -> Option<CoreTransactionType> {
        if self.type_group != CORE_TYPE_GROUP {
            return None;
        }
        CoreTransactionType::from_u16(self.transaction_type)
    }

    pub fn is_core(&self, kind: CoreTransactionType) -> bool {
        self.core_type() == Some(kind)
    }

    /// Payments of a multi-payment; empty for every other kind.
    pub fn payments(&self) -> &[Payment] {
        match &self.asset {
            TransactionAsset::MultiPayment(payments) => payments,
            _ => &[],
        }
    }

    /// Value moved away from the sender, fee excluded.
    ///
    /// For multi-payments this is the sum of the payments; the top-level
    /// amount of such transactions is zero.
    pub fn transferred_amount(&self) -> BigInt {
        if self.is_core(CoreTransactionType::MultiPayment) {
            self.payments().iter().map(|p| &p.amount).sum()
        } else {
            self.amount.clone()
        }
    }

    /// Id of the lock a claim or refund settles.
    pub fn lock_reference(&self) -> Option<&TransactionId> {
        match &self.asset {
            TransactionAsset::HtlcClaim {
                lock_transaction_id,
                ..
            }
            | TransactionAsset::HtlcRefund {
                lock_transaction_id,
            } => Some(lock_transaction_id),
            _ => None,
        }
    }
}

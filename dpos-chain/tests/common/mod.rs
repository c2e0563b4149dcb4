//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use dpos_chain::{
    Block, BlockStateEngine, EngineConfig, RecordingFaultReporter, Transaction,
    TransactionHandlerRegistry, VoteChange,
};
use dpos_primitives::{
    Address, AddressDerivation, PublicKey, Ripemd160AddressDerivation, TransactionId,
};
use dpos_state::{AccountLedger, LockExpiration};
use num_bigint::BigInt;
use std::sync::Arc;

/// Key of the wallet the genesis distribution is paid from.
pub const GENESIS_WALLET: u8 = 0xf0;
/// Key of the genesis block producer.
pub const GENESIS_PRODUCER: u8 = 0xf1;

pub fn key(fill: u8) -> PublicKey {
    let mut bytes = [fill; 33];
    bytes[0] = 0x02;
    PublicKey::from_bytes(bytes).unwrap()
}

pub fn address(fill: u8) -> Address {
    Ripemd160AddressDerivation::default().derive(&key(fill))
}

pub fn id(value: &str) -> TransactionId {
    TransactionId::new(value).unwrap()
}

pub fn amount(value: i64) -> BigInt {
    BigInt::from(value)
}

/// Engine over a ledger in which the keys of `wallets` are already bound.
pub fn engine_with(wallets: &[u8]) -> (BlockStateEngine, Arc<RecordingFaultReporter>) {
    let mut ledger = AccountLedger::new(Arc::new(Ripemd160AddressDerivation::default()));
    for fill in wallets {
        ledger.bind_public_key(&key(*fill)).unwrap();
    }
    let faults = Arc::new(RecordingFaultReporter::new());
    let engine = BlockStateEngine::new(
        ledger,
        TransactionHandlerRegistry::with_core_handlers(),
        faults.clone(),
        EngineConfig::default(),
    );
    (engine, faults)
}

/// Block whose total fee is the sum of its transaction fees.
pub fn block(
    block_id: &str,
    height: u32,
    producer: u8,
    reward: i64,
    transactions: Vec<Transaction>,
) -> Block {
    let total_fee = transactions.iter().map(|tx| &tx.fee).sum();
    Block {
        id: block_id.to_string(),
        height,
        timestamp: 1_600_000_000 + u64::from(height) * 8,
        generator_public_key: key(producer),
        reward: amount(reward),
        total_fee,
        transactions,
    }
}

pub fn balance(engine: &BlockStateEngine, fill: u8) -> BigInt {
    engine
        .ledger()
        .find_by_address(&address(fill))
        .map(|account| account.balance().clone())
        .unwrap_or_default()
}

pub fn vote_balance(engine: &BlockStateEngine, fill: u8) -> BigInt {
    engine
        .ledger()
        .find_by_public_key(&key(fill))
        .unwrap()
        .delegate()
        .unwrap()
        .vote_balance()
        .clone()
}

pub fn transfer(tx: &str, from: u8, to: u8, value: i64, fee: i64) -> Transaction {
    Transaction::transfer(id(tx), key(from), address(to), amount(value), amount(fee))
}

pub fn vote(tx: &str, from: u8, delegate: u8, fee: i64) -> Transaction {
    Transaction::vote(id(tx), key(from), VoteChange::vote(key(delegate)), amount(fee))
}

pub fn unvote(tx: &str, from: u8, delegate: u8, fee: i64) -> Transaction {
    Transaction::vote(id(tx), key(from), VoteChange::unvote(key(delegate)), amount(fee))
}

pub fn register(tx: &str, from: u8, username: &str, fee: i64) -> Transaction {
    Transaction::delegate_registration(id(tx), key(from), username, amount(fee))
}

pub fn lock(tx: &str, from: u8, to: u8, value: i64, fee: i64) -> Transaction {
    Transaction::htlc_lock(
        id(tx),
        key(from),
        address(to),
        amount(value),
        amount(fee),
        "c3ab8ff13720e8ad9047dd39466b3c8974e592c2fa383d4a3960714caef0c4f2",
        LockExpiration::BlockHeight(1_000),
    )
}

pub fn claim(tx: &str, by: u8, lock_tx: &str, fee: i64) -> Transaction {
    Transaction::htlc_claim(id(tx), key(by), id(lock_tx), "foobar", amount(fee))
}

pub fn refund(tx: &str, by: u8, lock_tx: &str, fee: i64) -> Transaction {
    Transaction::htlc_refund(id(tx), key(by), id(lock_tx), amount(fee))
}

/// Builds the height-1 block distributing the initial state.
///
/// The genesis producer registers itself first; all fees are zero.
pub struct GenesisBuilder {
    transactions: Vec<Transaction>,
}

impl GenesisBuilder {
    pub fn new() -> Self {
        Self {
            transactions: vec![register("genesis-producer", GENESIS_PRODUCER, "genesis", 0)],
        }
    }

    fn next_id(&self, kind: &str) -> String {
        format!("genesis-{}-{}", kind, self.transactions.len())
    }

    pub fn fund(mut self, to: u8, value: i64) -> Self {
        let tx = transfer(&self.next_id("fund"), GENESIS_WALLET, to, value, 0);
        self.transactions.push(tx);
        self
    }

    pub fn delegate(mut self, who: u8, username: &str) -> Self {
        let tx = register(&self.next_id("delegate"), who, username, 0);
        self.transactions.push(tx);
        self
    }

    pub fn vote(mut self, voter: u8, delegate: u8) -> Self {
        let tx = vote(&self.next_id("vote"), voter, delegate, 0);
        self.transactions.push(tx);
        self
    }

    pub fn build(self) -> Block {
        block("genesis", 1, GENESIS_PRODUCER, 0, self.transactions)
    }
}

impl Default for GenesisBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Blocks as consumed by the state engine.

use crate::transaction::Transaction;
use dpos_primitives::PublicKey;
use dpos_state::ForgedBlock;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// A validated block.
///
/// Only the fields the engine acts on are carried; hashes and signatures
/// have been checked before the block gets here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub height: u32,
    pub timestamp: u64,
    pub generator_public_key: PublicKey,
    pub reward: BigInt,
    pub total_fee: BigInt,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// What the producer is credited on apply: reward plus fees.
    pub fn producer_income(&self) -> BigInt {
        &self.reward + &self.total_fee
    }

    /// Summary recorded as the producer's last block.
    pub fn forged_summary(&self) -> ForgedBlock {
        ForgedBlock {
            id: self.id.clone(),
            height: self.height,
            timestamp: self.timestamp,
            reward: self.reward.clone(),
            total_fee: self.total_fee.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forged_summary() {
        let mut bytes = [9u8; 33];
        bytes[0] = 0x02;
        let block = Block {
            id: "b-7".to_string(),
            height: 7,
            timestamp: 1_600_000_000,
            generator_public_key: PublicKey::from_bytes(bytes).unwrap(),
            reward: BigInt::from(200_000_000),
            total_fee: BigInt::from(35),
            transactions: Vec::new(),
        };

        let summary = block.forged_summary();
        assert_eq!(summary.id, "b-7");
        assert_eq!(summary.height, 7);
        assert_eq!(summary.total_fee, BigInt::from(35));
        assert_eq!(block.producer_income(), BigInt::from(200_000_035));
    }
}

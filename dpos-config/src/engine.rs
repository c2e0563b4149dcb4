//! Block state engine settings
//!
//! These parameters change how blocks are applied and must be identical on
//! every node replaying the same chain.

use serde::{Deserialize, Serialize};

/// Height of the genesis block
pub const DEFAULT_GENESIS_HEIGHT: u32 = 1;

/// Produced-block summaries kept per validator
pub const DEFAULT_FORGED_HISTORY_DEPTH: usize = 16;

/// Block state engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Height at which an unknown block producer is created instead of
    /// reported as an integrity fault. Sender balance checks are waived at
    /// or below this height.
    #[serde(default = "default_genesis_height")]
    pub genesis_height: u32,

    /// Number of previously produced blocks each validator remembers, so a
    /// block revert can restore the prior last-produced block
    #[serde(default = "default_forged_history_depth")]
    pub forged_history_depth: usize,
}

fn default_genesis_height() -> u32 {
    DEFAULT_GENESIS_HEIGHT
}

fn default_forged_history_depth() -> usize {
    DEFAULT_FORGED_HISTORY_DEPTH
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            genesis_height: DEFAULT_GENESIS_HEIGHT,
            forged_history_depth: DEFAULT_FORGED_HISTORY_DEPTH,
        }
    }
}

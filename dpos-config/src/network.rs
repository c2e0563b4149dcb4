//! Network identity settings

use dpos_primitives::DEFAULT_ADDRESS_VERSION;
use serde::{Deserialize, Serialize};

/// Network settings consumed by the state engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Human readable network name
    #[serde(default = "default_name")]
    pub name: String,

    /// Address version byte for address derivation
    #[serde(default = "default_address_version")]
    pub address_version: u8,
}

fn default_name() -> String {
    "devnet".to_string()
}

fn default_address_version() -> u8 {
    DEFAULT_ADDRESS_VERSION
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            address_version: DEFAULT_ADDRESS_VERSION,
        }
    }
}

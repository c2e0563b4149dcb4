//! # DPoS-RS: Reversible Block State Engine
//!
//! State-transition engine for delegated proof-of-stake ledgers: applies and
//! reverts blocks against an in-memory account ledger while keeping balances,
//! delegate vote weight and producer statistics exact and reversible.
//!
//! ## Architecture
//!
//! The workspace is organized into layered crates:
//!
//! - [`dpos_primitives`] - Addresses, public keys, transaction ids, address derivation
//! - [`dpos_config`] - TOML settings with serde defaults
//! - [`dpos_telemetry`] - `tracing` subscriber setup
//! - [`dpos_state`] - Accounts and the indexed account ledger
//! - [`dpos_chain`] - Transaction handlers, vote-balance updater, block state engine
//!
//! ## Quick Start
//!
//! ```rust
//! use dpos_rs::prelude::*;
//! use std::sync::Arc;
//!
//! let settings = Settings::default();
//! let engine = dpos_rs::build_engine(&settings, Arc::new(TracingFaultReporter));
//! assert_eq!(engine.height(), 0);
//! assert!(engine.ledger().is_empty());
//! ```

pub use dpos_chain;
pub use dpos_config;
pub use dpos_primitives;
pub use dpos_state;
pub use dpos_telemetry;

use dpos_chain::{
    BlockStateEngine, EngineConfig, FaultReporter, TracingFaultReporter,
    TransactionHandlerRegistry,
};
use dpos_config::{ConfigError, EngineSettings, Settings};
use dpos_primitives::Ripemd160AddressDerivation;
use dpos_state::AccountLedger;
use dpos_telemetry::TelemetryError;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Commonly used types
pub mod prelude {
    pub use dpos_chain::{
        Block, BlockStateEngine, ChainError, ChainResult, CoreTransactionType, EngineConfig,
        FaultReporter, IntegrityFault, Payment, Transaction, TransactionAsset,
        TransactionHandler, TransactionHandlerRegistry, TracingFaultReporter, VoteChange,
    };
    pub use dpos_config::Settings;
    pub use dpos_primitives::{Address, AddressDerivation, PublicKey, TransactionId};
    pub use dpos_state::{Account, AccountLedger, LedgerSnapshot, StateError};
}

/// Errors raised while bringing up an engine from a settings file
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be initialized
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Engine parameters from the `[engine]` settings section.
pub fn engine_config(settings: &EngineSettings) -> EngineConfig {
    EngineConfig {
        genesis_height: settings.genesis_height,
        forged_history_depth: settings.forged_history_depth,
    }
}

/// Builds an engine over an empty ledger with the core transaction handlers.
pub fn build_engine(settings: &Settings, fault_reporter: Arc<dyn FaultReporter>) -> BlockStateEngine {
    let derivation = Ripemd160AddressDerivation::new(settings.network.address_version);
    let ledger = AccountLedger::new(Arc::new(derivation));
    BlockStateEngine::new(
        ledger,
        TransactionHandlerRegistry::with_core_handlers(),
        fault_reporter,
        engine_config(&settings.engine),
    )
}

/// Loads settings from `path`, installs logging and builds an engine that
/// logs integrity faults.
pub fn bootstrap(path: impl AsRef<Path>) -> Result<BlockStateEngine, BootstrapError> {
    let settings = Settings::load(path)?;
    dpos_telemetry::init(&settings.logging)?;
    tracing::info!(
        "Starting block state engine on {} (genesis height {})",
        settings.network.name,
        settings.engine.genesis_height
    );
    Ok(build_engine(&settings, Arc::new(TracingFaultReporter)))
}

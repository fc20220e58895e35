//! Risk Engine Service
//!
//! Collateralized-lending risk engine for a multi-asset money market:
//! - market registry and tri-state pause controls
//! - risk-parameter bounds validation
//! - collateral ledger with per-asset caps
//! - multi-source price aggregation with divergence detection
//! - cross-asset health and liquidity computation
//! - liquidation decision and execution
//!
//! [`engine::RiskEngine`] is the entry point; the component modules are
//! public for callers that want to reuse the math or the in-memory
//! collaborators.

pub mod config;
pub mod engine;
pub mod events;
pub mod external;
pub mod health;
pub mod ledger;
pub mod liquidation;
pub mod memory;
pub mod oracle;
pub mod params;
pub mod registry;
pub mod security;

pub use config::{OracleConfig, RiskEngineConfig};
pub use engine::RiskEngine;
pub use external::{MarketAsset, PriceSource};

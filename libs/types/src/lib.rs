//! Types library for the collateralized-lending risk engine
//!
//! This library provides the core type definitions shared by the risk engine
//! and its callers (lending-pool assets, governance tooling, liquidators).
//!
//! # Version
//! v1.0.0 - Frozen
//!
//! # Modules
//! - `ids`: Identifiers (AccountId, AssetId, MarketId, Caller)
//! - `numeric`: Fixed-point helpers (WAD, checked multiply, rounding)
//! - `account`: Account portfolio and liquidation status
//! - `position`: Collateral position
//! - `risk`: Risk configuration, bounds, solvency, liquidation results
//! - `pause`: Tri-state pause flags
//! - `price`: Oracle price quotes
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod account;
pub mod position;
pub mod risk;
pub mod pause;
pub mod price;
pub mod errors;

pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::account::*;
    pub use crate::position::*;
    pub use crate::risk::*;
    pub use crate::pause::*;
    pub use crate::price::*;
    pub use crate::errors::*;
}

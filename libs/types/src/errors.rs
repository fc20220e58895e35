//! Error types for the risk engine
//!
//! Every failure is synchronous and local to the call that raised it.

use thiserror::Error;

use crate::pause::PauseAction;
use crate::price::PriceErrorCode;

/// Top-level risk engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Unauthorized caller")]
    Unauthorized,

    #[error("Token already listed: {asset}")]
    TokenAlreadyListed { asset: String },

    #[error("Token not listed: {asset}")]
    TokenNotListed { asset: String },

    #[error("Action paused: {action}")]
    Paused { action: PauseAction },

    #[error("Insufficient collateral: shortfall {shortfall}")]
    InsufficientCollateral { shortfall: String },

    #[error("Invariant error: {reason}")]
    InvariantError { reason: String },

    #[error("Price error for {asset}: {code:?}")]
    PriceError { asset: String, code: PriceErrorCode },

    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("No liquidation available")]
    NoLiquidationAvailable,

    #[error("Minimum hold period not elapsed: available at {available_at}")]
    MinHoldPeriod { available_at: i64 },

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Arithmetic overflow in valuation")]
    Overflow,

    #[error("External call failed: {0}")]
    External(#[from] ExternalError),
}

impl RiskError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        RiskError::InvalidParameter {
            reason: reason.into(),
        }
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        RiskError::InvariantError {
            reason: reason.into(),
        }
    }

    pub fn not_listed(asset: impl ToString) -> Self {
        RiskError::TokenNotListed {
            asset: asset.to_string(),
        }
    }
}

/// Failure reported by an external collaborator (lending-pool asset or
/// price source adapter)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExternalError {
    #[error("Asset {asset} call failed: {reason}")]
    Asset { asset: String, reason: String },

    #[error("Price source {source_name} failed: {reason}")]
    PriceSource { source_name: String, reason: String },
}

//! Risk parameter, solvency, and liquidation types
//!
//! All ratios are WAD-relative decimals (see `numeric::WAD`).

use crate::ids::{AccountId, AssetId};
use crate::numeric::WAD;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Parameter bounds ────────────────────────────────────────────────────

/// Maximum share of collateral value counted toward borrowing power (91%)
pub const MAX_COLLATERALIZATION_RATIO: Decimal = Decimal::from_parts(91, 0, 0, false, 2);
/// Maximum soft collateral requirement (234%)
pub const MAX_COLLATERAL_REQUIREMENT: Decimal = Decimal::from_parts(234, 0, 0, false, 2);
/// Minimum gap between the hard requirement and the hard incentive (1.5%)
pub const MIN_EXCESS_COLLATERAL_REQUIREMENT: Decimal = Decimal::from_parts(15, 0, 0, false, 3);
/// Minimum liquidation incentive on top of the liquidation fee (1%)
pub const MIN_LIQUIDATION_INCENTIVE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
/// Maximum liquidation incentive (30%)
pub const MAX_LIQUIDATION_INCENTIVE: Decimal = Decimal::from_parts(30, 0, 0, false, 2);
/// Maximum protocol liquidation fee (5%)
pub const MAX_LIQUIDATION_FEE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
/// Minimum base close factor (10%)
pub const MIN_BASE_CFACTOR: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
/// Maximum base close factor (50%)
pub const MAX_BASE_CFACTOR: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

// ── Risk configuration ──────────────────────────────────────────────────

/// Governance input for a collateral configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralParams {
    pub coll_ratio: Decimal,
    pub coll_req_soft: Decimal,
    pub coll_req_hard: Decimal,
    pub liq_inc_soft: Decimal,
    pub liq_inc_hard: Decimal,
    pub liq_fee: Decimal,
    pub base_cfactor: Decimal,
}

/// Stored per-asset risk configuration
///
/// A freshly listed asset has every field zeroed, which disables it as
/// collateral until governance configures it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenRiskConfig {
    pub coll_ratio: Decimal,
    pub coll_req_soft: Decimal,
    pub coll_req_hard: Decimal,
    pub liq_inc_soft: Decimal,
    pub liq_inc_hard: Decimal,
    pub liq_fee: Decimal,
    pub base_cfactor: Decimal,
    pub cfactor_curve: Decimal,
}

impl TokenRiskConfig {
    /// Build the stored form; the curve is whatever lifts the base factor to 100%
    pub fn from_params(params: &CollateralParams) -> Self {
        Self {
            coll_ratio: params.coll_ratio,
            coll_req_soft: params.coll_req_soft,
            coll_req_hard: params.coll_req_hard,
            liq_inc_soft: params.liq_inc_soft,
            liq_inc_hard: params.liq_inc_hard,
            liq_fee: params.liq_fee,
            base_cfactor: params.base_cfactor,
            cfactor_curve: WAD - params.base_cfactor,
        }
    }

    pub fn is_collateral_enabled(&self) -> bool {
        !self.coll_ratio.is_zero()
    }

    /// Close factor at a given liquidation factor
    ///
    /// `cFactor = baseCFactor + cFactorCurve × lFactor`
    pub fn cfactor_at(&self, l_factor: Decimal) -> Decimal {
        self.base_cfactor + self.cfactor_curve * l_factor
    }

    /// Liquidation incentive at a given liquidation factor
    ///
    /// `incentive = liqIncSoft + (liqIncHard − liqIncSoft) × lFactor`
    pub fn incentive_at(&self, l_factor: Decimal) -> Decimal {
        self.liq_inc_soft + (self.liq_inc_hard - self.liq_inc_soft) * l_factor
    }
}

// ── Solvency ────────────────────────────────────────────────────────────

/// Excess liquidity or shortfall of an account; at most one is non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Liquidity {
    pub excess: Decimal,
    pub shortfall: Decimal,
}

impl Liquidity {
    /// Net the two sides
    pub fn from_values(collateral_value: Decimal, debt_value: Decimal) -> Self {
        if collateral_value >= debt_value {
            Self {
                excess: collateral_value - debt_value,
                shortfall: Decimal::ZERO,
            }
        } else {
            Self {
                excess: Decimal::ZERO,
                shortfall: debt_value - collateral_value,
            }
        }
    }

    pub fn has_shortfall(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }
}

/// Aggregate solvency snapshot of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountHealth {
    /// Collateral value at lower prices, weighted by collateral ratio
    pub collateral_value: Decimal,
    /// Debt value at upper prices
    pub debt_value: Decimal,
    pub liquidity: Liquidity,
}

// ── Liquidation ─────────────────────────────────────────────────────────

/// Result of a liquidation feasibility check for one debt/collateral pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationQuote {
    pub account: AccountId,
    pub debt_asset: AssetId,
    pub collateral_asset: AssetId,
    /// Severity in [0, 1]
    pub l_factor: Decimal,
    pub c_factor: Decimal,
    pub incentive: Decimal,
    /// Debt (underlying units) the liquidator repays
    pub debt_to_repay: Decimal,
    /// Collateral shares taken from the account, protocol share included
    pub collateral_seized: Decimal,
    /// Part of `collateral_seized` routed to the protocol
    pub protocol_shares: Decimal,
}

impl LiquidationQuote {
    pub fn liquidator_shares(&self) -> Decimal {
        self.collateral_seized - self.protocol_shares
    }
}

/// Collateral leg of a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralSeizure {
    pub asset: AssetId,
    pub account: AccountId,
    pub liquidator: AccountId,
    pub liquidator_shares: Decimal,
    pub protocol_shares: Decimal,
}

/// Debt leg of a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSettlement {
    pub asset: AssetId,
    pub account: AccountId,
    pub liquidator: AccountId,
    /// Repaid by the liquidator
    pub repaid: Decimal,
    /// Written off as bad debt
    pub bad_debt: Decimal,
}

/// Full-account liquidation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLiquidation {
    pub account: AccountId,
    pub liquidator: AccountId,
    pub l_factor: Decimal,
    pub seizures: Vec<CollateralSeizure>,
    pub debts: Vec<DebtSettlement>,
    pub timestamp: i64,
}

impl AccountLiquidation {
    pub fn total_bad_debt(&self) -> Decimal {
        self.debts.iter().map(|d| d.bad_debt).sum()
    }
}

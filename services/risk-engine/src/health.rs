//! Health calculator
//!
//! Values an account's portfolio against the oracle band, resolving price
//! uncertainty against the account: collateral at the lower bound weighted by
//! its collateral ratio, debt at the upper bound.
//!
//! ```text
//! collateral_value = Σ posted × exchangeRate × lower × collRatio
//! debt_value       = Σ debt × upper
//! shortfall        = max(0, debt_value − collateral_value)
//! excess           = max(0, collateral_value − debt_value)
//! ```

use risk_types::errors::RiskError;
use risk_types::ids::{AccountId, AssetId};
use risk_types::numeric::{checked_mul, checked_mul3, WAD};
use risk_types::price::{PriceErrorCode, PriceQuote};
use risk_types::risk::{AccountHealth, Liquidity, TokenRiskConfig};
use rust_decimal::Decimal;

use crate::ledger::CollateralLedger;
use crate::oracle::OracleAggregator;
use crate::params::RiskParameterStore;
use crate::registry::MarketRegistry;

/// A hypothetical change applied to one asset before valuing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment<'a> {
    pub asset: &'a AssetId,
    /// Signed change in posted shares
    pub collateral_delta: Decimal,
    /// Signed change in debt (underlying units)
    pub debt_delta: Decimal,
}

/// Valuation of one portfolio entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetValuation {
    pub asset: AssetId,
    pub config: TokenRiskConfig,
    /// `None` when the entry carries no value and was not priced
    pub quote: Option<PriceQuote>,
    pub decimals: u8,
    pub exchange_rate: Decimal,
    /// Posted shares
    pub posted: Decimal,
    /// Outstanding debt, underlying units
    pub debt: Decimal,
    /// Posted collateral at the lower price, before the collateral ratio
    pub collateral_value: Decimal,
    /// `collateral_value × collRatio`
    pub weighted_value: Decimal,
    /// Debt at the upper price
    pub debt_value: Decimal,
}

impl AssetValuation {
    /// Whether the asset counts toward the liquidation thresholds
    pub fn is_collateral(&self) -> bool {
        self.config.is_collateral_enabled() && self.collateral_value > Decimal::ZERO
    }
}

/// Whole-portfolio valuation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountValuation {
    pub account: AccountId,
    pub assets: Vec<AssetValuation>,
}

impl AccountValuation {
    pub fn get(&self, asset: &AssetId) -> Option<&AssetValuation> {
        self.assets.iter().find(|v| &v.asset == asset)
    }

    pub fn collateral_value(&self) -> Result<Decimal, RiskError> {
        sum(self.assets.iter().map(|v| v.weighted_value))
    }

    pub fn debt_value(&self) -> Result<Decimal, RiskError> {
        sum(self.assets.iter().map(|v| v.debt_value))
    }

    pub fn health(&self) -> Result<AccountHealth, RiskError> {
        let collateral_value = self.collateral_value()?;
        let debt_value = self.debt_value()?;
        Ok(AccountHealth {
            collateral_value,
            debt_value,
            liquidity: Liquidity::from_values(collateral_value, debt_value),
        })
    }

    /// `Σ value / (1 + collReqSoft)` over enabled collateral
    pub fn soft_threshold(&self) -> Result<Decimal, RiskError> {
        self.threshold(|c| c.coll_req_soft)
    }

    /// `Σ value / (1 + collReqHard)` over enabled collateral
    pub fn hard_threshold(&self) -> Result<Decimal, RiskError> {
        self.threshold(|c| c.coll_req_hard)
    }

    fn threshold(&self, requirement: impl Fn(&TokenRiskConfig) -> Decimal) -> Result<Decimal, RiskError> {
        self.assets
            .iter()
            .filter(|v| v.is_collateral())
            .map(|v| {
                v.collateral_value
                    .checked_div(WAD + requirement(&v.config))
                    .ok_or(RiskError::Overflow)
            })
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v?).ok_or(RiskError::Overflow))
    }
}

fn sum(mut values: impl Iterator<Item = Decimal>) -> Result<Decimal, RiskError> {
    values.try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v).ok_or(RiskError::Overflow))
}

/// Read-only view over the engine state needed for valuation
pub struct HealthCalculator<'a> {
    pub registry: &'a MarketRegistry,
    pub params: &'a RiskParameterStore,
    pub ledger: &'a CollateralLedger,
    pub oracle: &'a OracleAggregator,
}

impl<'a> HealthCalculator<'a> {
    /// Value every portfolio entry, plus the adjusted asset if it is not held
    pub fn value_account(
        &self,
        account: &AccountId,
        adjustment: Option<&Adjustment<'_>>,
        now: i64,
    ) -> Result<AccountValuation, RiskError> {
        let mut assets = self.ledger.assets_of(account);
        if let Some(adj) = adjustment {
            if !assets.contains(adj.asset) {
                assets.push(adj.asset.clone());
            }
        }

        let assets = assets
            .into_iter()
            .map(|asset| {
                let adj = adjustment.filter(|a| *a.asset == asset);
                self.value_asset(account, asset, adj, now)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AccountValuation {
            account: *account,
            assets,
        })
    }

    fn value_asset(
        &self,
        account: &AccountId,
        asset: AssetId,
        adjustment: Option<&Adjustment<'_>>,
        now: i64,
    ) -> Result<AssetValuation, RiskError> {
        let market_asset = self.registry.asset(&asset)?;
        let config = self.params.get(&asset).copied().unwrap_or_default();

        let mut posted = self.ledger.posted(account, &asset);
        let mut debt = market_asset.debt_balance_of(account)?;
        if let Some(adj) = adjustment {
            posted = posted.checked_add(adj.collateral_delta).ok_or(RiskError::Overflow)?;
            debt = debt.checked_add(adj.debt_delta).ok_or(RiskError::Overflow)?;
        }
        if posted.is_sign_negative() || debt.is_sign_negative() {
            return Err(RiskError::invalid(format!(
                "adjustment leaves a negative position in {}",
                asset
            )));
        }

        let decimals = market_asset.decimals();
        let exchange_rate = market_asset.exchange_rate_cached();
        if posted.is_zero() && debt.is_zero() {
            return Ok(AssetValuation {
                asset,
                config,
                quote: None,
                decimals,
                exchange_rate,
                posted,
                debt,
                collateral_value: Decimal::ZERO,
                weighted_value: Decimal::ZERO,
                debt_value: Decimal::ZERO,
            });
        }

        let quote = self.oracle.get_price(&asset, true, debt.is_zero(), now);
        if quote.is_bad_source() {
            return Err(RiskError::PriceError {
                asset: asset.to_string(),
                code: PriceErrorCode::BadSource,
            });
        }

        let collateral_value = checked_mul3(posted, exchange_rate, quote.collateral_price())
            .ok_or(RiskError::Overflow)?;
        let weighted_value = checked_mul(collateral_value, config.coll_ratio).ok_or(RiskError::Overflow)?;
        let debt_value = checked_mul(debt, quote.debt_price()).ok_or(RiskError::Overflow)?;

        Ok(AssetValuation {
            asset,
            config,
            quote: Some(quote),
            decimals,
            exchange_rate,
            posted,
            debt,
            collateral_value,
            weighted_value,
            debt_value,
        })
    }

    pub fn status_of(&self, account: &AccountId, now: i64) -> Result<AccountHealth, RiskError> {
        self.value_account(account, None, now)?.health()
    }

    pub fn hypothetical_liquidity_of(
        &self,
        account: &AccountId,
        asset: &AssetId,
        collateral_delta: Decimal,
        debt_delta: Decimal,
        now: i64,
    ) -> Result<Liquidity, RiskError> {
        let adjustment = Adjustment {
            asset,
            collateral_delta,
            debt_delta,
        };
        Ok(self.value_account(account, Some(&adjustment), now)?.health()?.liquidity)
    }

    /// Fail with `InsufficientCollateral` if the adjustment leaves a shortfall
    pub fn ensure_solvent_after(
        &self,
        account: &AccountId,
        asset: &AssetId,
        collateral_delta: Decimal,
        debt_delta: Decimal,
        now: i64,
    ) -> Result<(), RiskError> {
        let liquidity = self.hypothetical_liquidity_of(account, asset, collateral_delta, debt_delta, now)?;
        if liquidity.has_shortfall() {
            return Err(RiskError::InsufficientCollateral {
                shortfall: liquidity.shortfall.to_string(),
            });
        }
        Ok(())
    }
}

//! Liquidation math
//!
//! Pure functions over an [`AccountValuation`]; the engine owns the state
//! transitions and settlement.
//!
//! Severity comes from requirement-adjusted collateral thresholds:
//!
//! ```text
//! soft = Σ value / (1 + collReqSoft)
//! hard = Σ value / (1 + collReqHard)        (hard > soft)
//!
//! lFactor = 0                               debt ≤ soft
//!         = (debt − soft) / (hard − soft)   soft < debt < hard
//!         = 1                               debt ≥ hard
//! ```
//!
//! Since `collRatio ≤ 1 / (1 + collReqSoft)`, a non-zero lFactor implies a
//! shortfall.

use risk_types::errors::RiskError;
use risk_types::ids::{AccountId, AssetId};
use risk_types::numeric::{round_down, WAD};
use risk_types::price::PriceQuote;
use risk_types::risk::{
    AccountLiquidation, CollateralSeizure, DebtSettlement, LiquidationQuote,
};
use rust_decimal::Decimal;

use crate::health::{AccountValuation, AssetValuation};

/// Fractional digits kept on the liquidation factor (WAD precision)
const FACTOR_DECIMALS: u32 = 18;

/// Severity in [0, 1] of a debt value against the two thresholds
pub fn liquidation_factor(debt_value: Decimal, soft: Decimal, hard: Decimal) -> Decimal {
    if debt_value <= soft {
        Decimal::ZERO
    } else if debt_value >= hard {
        WAD
    } else {
        ((debt_value - soft) / (hard - soft)).round_dp(FACTOR_DECIMALS)
    }
}

/// Liquidation factor of a valued account
pub fn account_liquidation_factor(valuation: &AccountValuation) -> Result<Decimal, RiskError> {
    Ok(liquidation_factor(
        valuation.debt_value()?,
        valuation.soft_threshold()?,
        valuation.hard_threshold()?,
    ))
}

fn mul(a: Decimal, b: Decimal) -> Result<Decimal, RiskError> {
    a.checked_mul(b).ok_or(RiskError::Overflow)
}

fn div(a: Decimal, b: Decimal) -> Result<Decimal, RiskError> {
    a.checked_div(b).ok_or(RiskError::Overflow)
}

fn priced(valuation: &AssetValuation) -> Result<PriceQuote, RiskError> {
    valuation
        .quote
        .ok_or_else(|| RiskError::invariant(format!("{} was not priced", valuation.asset)))
}

/// Value of one collateral share at the conservative price
fn share_value(valuation: &AssetValuation) -> Result<Decimal, RiskError> {
    let quote = priced(valuation)?;
    let value = mul(quote.collateral_price(), valuation.exchange_rate)?;
    if value <= Decimal::ZERO {
        return Err(RiskError::invalid(format!("{} shares have no value", valuation.asset)));
    }
    Ok(value)
}

/// Quote a partial liquidation of one debt/collateral pair.
///
/// With `exact` the liquidator asks to repay exactly `amount`, which must not
/// exceed `debt × cFactor`; otherwise the maximum is quoted. Seized shares are
/// capped at the posted amount, scaling the repayment down to match.
pub fn quote_liquidation(
    valuation: &AccountValuation,
    debt_asset: &AssetId,
    collateral_asset: &AssetId,
    amount: Decimal,
    exact: bool,
) -> Result<LiquidationQuote, RiskError> {
    let l_factor = account_liquidation_factor(valuation)?;
    if l_factor.is_zero() {
        return Err(RiskError::NoLiquidationAvailable);
    }

    let debt = valuation
        .get(debt_asset)
        .filter(|v| v.debt > Decimal::ZERO)
        .ok_or(RiskError::NoLiquidationAvailable)?;
    let collateral = valuation
        .get(collateral_asset)
        .filter(|v| v.posted > Decimal::ZERO)
        .ok_or(RiskError::NoLiquidationAvailable)?;

    let config = &collateral.config;
    let c_factor = config.cfactor_at(l_factor);
    let incentive = config.incentive_at(l_factor);

    let max_repay = round_down(mul(debt.debt, c_factor)?, debt.decimals);
    let mut debt_to_repay = if exact {
        if amount <= Decimal::ZERO || amount > max_repay {
            return Err(RiskError::invalid(format!(
                "repay amount {} outside (0, {}]",
                amount, max_repay
            )));
        }
        amount
    } else {
        max_repay
    };
    if debt_to_repay.is_zero() {
        return Err(RiskError::NoLiquidationAvailable);
    }

    let debt_price = priced(debt)?.debt_price();
    let unit_value = share_value(collateral)?;
    let premium = WAD + incentive;

    let repay_value = mul(debt_to_repay, debt_price)?;
    let mut collateral_seized = div(mul(repay_value, premium)?, unit_value)?;
    if collateral_seized > collateral.posted {
        collateral_seized = collateral.posted;
        debt_to_repay = round_down(
            div(mul(collateral.posted, unit_value)?, mul(premium, debt_price)?)?,
            debt.decimals,
        );
    }
    let collateral_seized = round_down(collateral_seized, collateral.decimals);
    let protocol_shares = round_down(
        div(mul(collateral_seized, config.liq_fee)?, premium)?,
        collateral.decimals,
    );

    Ok(LiquidationQuote {
        account: valuation.account,
        debt_asset: debt_asset.clone(),
        collateral_asset: collateral_asset.clone(),
        l_factor,
        c_factor,
        incentive,
        debt_to_repay,
        collateral_seized,
        protocol_shares,
    })
}

/// Plan a full-account liquidation.
///
/// Collateral is seized asset by asset, in portfolio order, until the account's
/// debt value times each asset's incentive is covered. Every debt is then
/// cleared: the covered share is repaid by the liquidator and the rest is
/// written off as bad debt.
pub fn plan_account_liquidation(
    valuation: &AccountValuation,
    liquidator: AccountId,
    now: i64,
) -> Result<AccountLiquidation, RiskError> {
    let l_factor = account_liquidation_factor(valuation)?;
    if l_factor.is_zero() {
        return Err(RiskError::NoLiquidationAvailable);
    }

    let total_debt = valuation.debt_value()?;
    let mut uncovered = total_debt;
    let mut seizures = Vec::new();

    for collateral in valuation.assets.iter().filter(|v| v.posted > Decimal::ZERO) {
        if uncovered.is_zero() {
            break;
        }
        let unit_value = share_value(collateral)?;
        let premium = WAD + collateral.config.incentive_at(l_factor);

        let needed = div(mul(uncovered, premium)?, unit_value)?;
        let shares = round_down(needed.min(collateral.posted), collateral.decimals);
        if shares.is_zero() {
            continue;
        }
        let covered = div(mul(shares, unit_value)?, premium)?.min(uncovered);
        uncovered -= covered;

        let protocol_shares = round_down(
            div(mul(shares, collateral.config.liq_fee)?, premium)?,
            collateral.decimals,
        );
        seizures.push(CollateralSeizure {
            asset: collateral.asset.clone(),
            account: valuation.account,
            liquidator,
            liquidator_shares: shares - protocol_shares,
            protocol_shares,
        });
    }

    let coverage = if total_debt.is_zero() {
        WAD
    } else {
        div(total_debt - uncovered, total_debt)?
    };
    let debts = valuation
        .assets
        .iter()
        .filter(|v| v.debt > Decimal::ZERO)
        .map(|v| {
            let repaid = round_down(mul(v.debt, coverage)?, v.decimals);
            Ok(DebtSettlement {
                asset: v.asset.clone(),
                account: valuation.account,
                liquidator,
                repaid,
                bad_debt: v.debt - repaid,
            })
        })
        .collect::<Result<Vec<_>, RiskError>>()?;

    Ok(AccountLiquidation {
        account: valuation.account,
        liquidator,
        l_factor,
        seizures,
        debts,
        timestamp: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_types::price::PriceErrorCode;
    use risk_types::risk::{CollateralParams, TokenRiskConfig};

    fn weth_config() -> TokenRiskConfig {
        TokenRiskConfig::from_params(&CollateralParams {
            coll_ratio: Decimal::new(50, 2),
            coll_req_soft: Decimal::new(50, 2),
            coll_req_hard: Decimal::new(30, 2),
            liq_inc_soft: Decimal::new(5, 2),
            liq_inc_hard: Decimal::new(10, 2),
            liq_fee: Decimal::new(1, 2),
            base_cfactor: Decimal::new(20, 2),
        })
    }

    fn collateral(posted: i64, price: Decimal) -> AssetValuation {
        let config = weth_config();
        let collateral_value = Decimal::from(posted) * price;
        AssetValuation {
            asset: AssetId::new("cWETH"),
            config,
            quote: Some(PriceQuote::single(price, PriceErrorCode::None)),
            decimals: 18,
            exchange_rate: Decimal::ONE,
            posted: Decimal::from(posted),
            debt: Decimal::ZERO,
            collateral_value,
            weighted_value: collateral_value * config.coll_ratio,
            debt_value: Decimal::ZERO,
        }
    }

    fn debt(amount: i64) -> AssetValuation {
        AssetValuation {
            asset: AssetId::new("cUSDC"),
            config: TokenRiskConfig::default(),
            quote: Some(PriceQuote::single(Decimal::ONE, PriceErrorCode::None)),
            decimals: 6,
            exchange_rate: Decimal::ONE,
            posted: Decimal::ZERO,
            debt: Decimal::from(amount),
            collateral_value: Decimal::ZERO,
            weighted_value: Decimal::ZERO,
            debt_value: Decimal::from(amount),
        }
    }

    fn account(assets: Vec<AssetValuation>) -> AccountValuation {
        AccountValuation {
            account: AccountId::new(),
            assets,
        }
    }

    #[test]
    fn test_factor_piecewise() {
        let soft = Decimal::from(100);
        let hard = Decimal::from(120);
        assert_eq!(liquidation_factor(Decimal::from(90), soft, hard), Decimal::ZERO);
        assert_eq!(liquidation_factor(soft, soft, hard), Decimal::ZERO);
        assert_eq!(liquidation_factor(Decimal::from(110), soft, hard), Decimal::new(5, 1));
        assert_eq!(liquidation_factor(hard, soft, hard), WAD);
        assert_eq!(liquidation_factor(Decimal::from(500), soft, hard), WAD);
    }

    #[test]
    fn test_debt_without_collateral_is_fully_severe() {
        let v = account(vec![debt(10)]);
        assert_eq!(account_liquidation_factor(&v).unwrap(), WAD);
    }

    #[test]
    fn test_healthy_account_has_no_liquidation() {
        let v = account(vec![collateral(200, Decimal::ONE), debt(100)]);
        let result = quote_liquidation(&v, &AssetId::new("cUSDC"), &AssetId::new("cWETH"), Decimal::ZERO, false);
        assert_eq!(result, Err(RiskError::NoLiquidationAvailable));
    }

    #[test]
    fn test_max_quote() {
        // soft 400/3, hard 2000/13 → lFactor 0.8125
        let v = account(vec![collateral(200, Decimal::ONE), debt(150)]);
        let quote = quote_liquidation(&v, &AssetId::new("cUSDC"), &AssetId::new("cWETH"), Decimal::ZERO, false)
            .unwrap();

        assert_eq!(quote.l_factor, Decimal::new(8125, 4));
        assert_eq!(quote.c_factor, Decimal::new(85, 2));
        assert_eq!(quote.incentive, Decimal::new(90625, 6));
        assert_eq!(quote.debt_to_repay, Decimal::new(1275, 1));
        assert_eq!(quote.collateral_seized, Decimal::new(1390546875, 7));
        assert_eq!(quote.protocol_shares, Decimal::new(1275, 3));
    }

    #[test]
    fn test_exact_amount_bounded_by_close_factor() {
        let v = account(vec![collateral(200, Decimal::ONE), debt(150)]);
        let usdc = AssetId::new("cUSDC");
        let weth = AssetId::new("cWETH");

        let quote = quote_liquidation(&v, &usdc, &weth, Decimal::from(100), true).unwrap();
        assert_eq!(quote.debt_to_repay, Decimal::from(100));
        assert_eq!(quote.collateral_seized, Decimal::new(1090625, 4));

        assert!(matches!(
            quote_liquidation(&v, &usdc, &weth, Decimal::from(128), true),
            Err(RiskError::InvalidParameter { .. })
        ));
        assert!(matches!(
            quote_liquidation(&v, &usdc, &weth, Decimal::ZERO, true),
            Err(RiskError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_seizure_capped_at_posted() {
        // collateral at 0.5: lFactor 1, full close factor, 150 × 1.1 / 0.5 = 330 > 200
        let v = account(vec![collateral(200, Decimal::new(5, 1)), debt(150)]);
        let quote = quote_liquidation(&v, &AssetId::new("cUSDC"), &AssetId::new("cWETH"), Decimal::ZERO, false)
            .unwrap();
        assert_eq!(quote.l_factor, WAD);
        assert_eq!(quote.collateral_seized, Decimal::from(200));
        // 200 × 0.5 / 1.1 rounded down to 6 decimals
        assert_eq!(quote.debt_to_repay, Decimal::new(90_909_090, 6));
    }

    #[test]
    fn test_unknown_pair_rejected() {
        let v = account(vec![collateral(200, Decimal::ONE), debt(150)]);
        let result = quote_liquidation(&v, &AssetId::new("cWETH"), &AssetId::new("cWETH"), Decimal::ZERO, false);
        assert_eq!(result, Err(RiskError::NoLiquidationAvailable));
    }

    #[test]
    fn test_full_liquidation_covers_debt() {
        let v = account(vec![collateral(200, Decimal::ONE), debt(150)]);
        let plan = plan_account_liquidation(&v, AccountId::new(), 42).unwrap();

        assert_eq!(plan.seizures.len(), 1);
        let seizure = &plan.seizures[0];
        assert_eq!(seizure.liquidator_shares + seizure.protocol_shares, Decimal::new(16359375, 5));
        assert_eq!(seizure.protocol_shares, Decimal::new(15, 1));

        assert_eq!(plan.debts.len(), 1);
        assert_eq!(plan.debts[0].repaid, Decimal::from(150));
        assert_eq!(plan.total_bad_debt(), Decimal::ZERO);
        assert_eq!(plan.timestamp, 42);
    }

    #[test]
    fn test_full_liquidation_reports_bad_debt() {
        let v = account(vec![collateral(200, Decimal::new(5, 1)), debt(150)]);
        let plan = plan_account_liquidation(&v, AccountId::new(), 0).unwrap();

        let seizure = &plan.seizures[0];
        assert_eq!(seizure.liquidator_shares + seizure.protocol_shares, Decimal::from(200));

        let settlement = &plan.debts[0];
        assert!(settlement.bad_debt > Decimal::ZERO);
        assert_eq!(settlement.repaid + settlement.bad_debt, Decimal::from(150));
        assert_eq!(settlement.repaid, Decimal::new(90_909_090, 6));
    }
}

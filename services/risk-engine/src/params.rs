//! Risk parameter store
//!
//! Holds the per-asset `TokenRiskConfig` and validates every change against
//! the strict ordering of bounds:
//!
//! ```text
//! liqFee ≤ MAX_LIQUIDATION_FEE
//! MIN_LIQUIDATION_INCENTIVE + liqFee ≤ liqIncSoft < liqIncHard ≤ MAX_LIQUIDATION_INCENTIVE
//! liqIncHard + MIN_EXCESS_COLLATERAL_REQUIREMENT ≤ collReqHard < collReqSoft ≤ MAX_COLLATERAL_REQUIREMENT
//! collRatio ≤ min(MAX_COLLATERALIZATION_RATIO, 1 / (1 + collReqSoft))
//! MIN_BASE_CFACTOR ≤ baseCFactor ≤ MAX_BASE_CFACTOR
//! ```
//!
//! A non-zero collateral ratio is never reset to zero through an update;
//! that takes the separate `disable` path.

use std::collections::HashMap;

use risk_types::errors::RiskError;
use risk_types::ids::AssetId;
use risk_types::numeric::WAD;
use risk_types::risk::{
    CollateralParams, TokenRiskConfig, MAX_BASE_CFACTOR, MAX_COLLATERALIZATION_RATIO,
    MAX_COLLATERAL_REQUIREMENT, MAX_LIQUIDATION_FEE, MAX_LIQUIDATION_INCENTIVE,
    MIN_BASE_CFACTOR, MIN_EXCESS_COLLATERAL_REQUIREMENT, MIN_LIQUIDATION_INCENTIVE,
};
use rust_decimal::Decimal;

/// Largest collateral ratio compatible with a soft requirement
///
/// `min(MAX_COLLATERALIZATION_RATIO, 1 / (1 + collReqSoft))`
pub fn max_coll_ratio(coll_req_soft: Decimal) -> Decimal {
    MAX_COLLATERALIZATION_RATIO.min(WAD / (WAD + coll_req_soft))
}

/// Check a proposed configuration against the current one.
///
/// Returns the configuration to store on success.
pub fn validate_collateral_params(
    current: &TokenRiskConfig,
    params: &CollateralParams,
) -> Result<TokenRiskConfig, RiskError> {
    let fields = [
        ("coll_ratio", params.coll_ratio),
        ("coll_req_soft", params.coll_req_soft),
        ("coll_req_hard", params.coll_req_hard),
        ("liq_inc_soft", params.liq_inc_soft),
        ("liq_inc_hard", params.liq_inc_hard),
        ("liq_fee", params.liq_fee),
        ("base_cfactor", params.base_cfactor),
    ];
    if let Some((name, value)) = fields.iter().find(|(_, v)| v.is_sign_negative()) {
        return Err(RiskError::invalid(format!("{} is negative: {}", name, value)));
    }

    if params.liq_fee > MAX_LIQUIDATION_FEE {
        return Err(RiskError::invalid(format!(
            "liq_fee {} above {}",
            params.liq_fee, MAX_LIQUIDATION_FEE
        )));
    }
    if MIN_LIQUIDATION_INCENTIVE + params.liq_fee > params.liq_inc_soft {
        return Err(RiskError::invalid(format!(
            "liq_inc_soft {} below minimum incentive plus fee",
            params.liq_inc_soft
        )));
    }
    if params.liq_inc_soft >= params.liq_inc_hard {
        return Err(RiskError::invalid("liq_inc_soft must be below liq_inc_hard"));
    }
    if params.liq_inc_hard > MAX_LIQUIDATION_INCENTIVE {
        return Err(RiskError::invalid(format!(
            "liq_inc_hard {} above {}",
            params.liq_inc_hard, MAX_LIQUIDATION_INCENTIVE
        )));
    }
    if params.liq_inc_hard + MIN_EXCESS_COLLATERAL_REQUIREMENT > params.coll_req_hard {
        return Err(RiskError::invalid(format!(
            "coll_req_hard {} does not cover liq_inc_hard plus minimum excess",
            params.coll_req_hard
        )));
    }
    if params.coll_req_hard >= params.coll_req_soft {
        return Err(RiskError::invalid("coll_req_hard must be below coll_req_soft"));
    }
    if params.coll_req_soft > MAX_COLLATERAL_REQUIREMENT {
        return Err(RiskError::invalid(format!(
            "coll_req_soft {} above {}",
            params.coll_req_soft, MAX_COLLATERAL_REQUIREMENT
        )));
    }
    let ratio_cap = max_coll_ratio(params.coll_req_soft);
    if params.coll_ratio > ratio_cap {
        return Err(RiskError::invalid(format!(
            "coll_ratio {} above {}",
            params.coll_ratio, ratio_cap
        )));
    }
    if params.base_cfactor < MIN_BASE_CFACTOR || params.base_cfactor > MAX_BASE_CFACTOR {
        return Err(RiskError::invalid(format!(
            "base_cfactor {} outside [{}, {}]",
            params.base_cfactor, MIN_BASE_CFACTOR, MAX_BASE_CFACTOR
        )));
    }
    if current.is_collateral_enabled() && params.coll_ratio.is_zero() {
        return Err(RiskError::invalid(
            "coll_ratio cannot be reset to zero once set",
        ));
    }

    Ok(TokenRiskConfig::from_params(params))
}

/// Per-asset risk configuration storage
#[derive(Debug, Clone, Default)]
pub struct RiskParameterStore {
    configs: HashMap<AssetId, TokenRiskConfig>,
}

impl RiskParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the zeroed entry for a newly listed asset
    pub fn init(&mut self, asset: AssetId) {
        self.configs.entry(asset).or_default();
    }

    pub fn get(&self, asset: &AssetId) -> Option<&TokenRiskConfig> {
        self.configs.get(asset)
    }

    /// Validate and overwrite the stored configuration
    pub fn update(
        &mut self,
        asset: &AssetId,
        params: &CollateralParams,
    ) -> Result<TokenRiskConfig, RiskError> {
        let current = self
            .configs
            .get(asset)
            .ok_or_else(|| RiskError::not_listed(asset))?;
        let next = validate_collateral_params(current, params)?;
        self.configs.insert(asset.clone(), next);
        Ok(next)
    }

    /// Zero the collateral ratio, leaving the liquidation terms in place
    pub fn disable(&mut self, asset: &AssetId) -> Result<(), RiskError> {
        let config = self
            .configs
            .get_mut(asset)
            .ok_or_else(|| RiskError::not_listed(asset))?;
        config.coll_ratio = Decimal::ZERO;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_params() -> CollateralParams {
        CollateralParams {
            coll_ratio: Decimal::new(60, 2),
            coll_req_soft: Decimal::new(50, 2),
            coll_req_hard: Decimal::new(30, 2),
            liq_inc_soft: Decimal::new(5, 2),
            liq_inc_hard: Decimal::new(10, 2),
            liq_fee: Decimal::new(1, 2),
            base_cfactor: Decimal::new(20, 2),
        }
    }

    fn assert_invalid(params: CollateralParams) {
        let result = validate_collateral_params(&TokenRiskConfig::default(), &params);
        assert!(
            matches!(result, Err(RiskError::InvalidParameter { .. })),
            "expected InvalidParameter for {:?}, got {:?}",
            params,
            result
        );
    }

    #[test]
    fn test_valid_params_accepted() {
        let cfg = validate_collateral_params(&TokenRiskConfig::default(), &valid_params()).unwrap();
        assert_eq!(cfg.coll_ratio, Decimal::new(60, 2));
        assert_eq!(cfg.cfactor_curve, Decimal::new(80, 2));
    }

    #[test]
    fn test_liq_fee_above_max() {
        assert_invalid(CollateralParams {
            liq_fee: Decimal::new(6, 2),
            liq_inc_soft: Decimal::new(8, 2),
            ..valid_params()
        });
    }

    #[test]
    fn test_soft_incentive_must_cover_fee() {
        // 0.01 + 0.05 > 0.05
        assert_invalid(CollateralParams {
            liq_fee: Decimal::new(5, 2),
            ..valid_params()
        });
    }

    #[test]
    fn test_incentives_must_be_strictly_ordered() {
        assert_invalid(CollateralParams {
            liq_inc_hard: Decimal::new(5, 2),
            ..valid_params()
        });
    }

    #[test]
    fn test_hard_incentive_capped() {
        assert_invalid(CollateralParams {
            liq_inc_hard: Decimal::new(31, 2),
            coll_req_hard: Decimal::new(40, 2),
            ..valid_params()
        });
    }

    #[test]
    fn test_hard_requirement_needs_excess() {
        // 0.10 + 0.015 > 0.11
        assert_invalid(CollateralParams {
            coll_req_hard: Decimal::new(11, 2),
            ..valid_params()
        });
    }

    #[test]
    fn test_requirements_strictly_ordered() {
        assert_invalid(CollateralParams {
            coll_req_soft: Decimal::new(30, 2),
            coll_ratio: Decimal::new(50, 2),
            ..valid_params()
        });
    }

    #[test]
    fn test_soft_requirement_capped() {
        assert_invalid(CollateralParams {
            coll_req_soft: Decimal::new(235, 2),
            coll_ratio: Decimal::new(10, 2),
            ..valid_params()
        });
    }

    #[test]
    fn test_coll_ratio_bounded_by_soft_requirement() {
        // 1 / 1.5 = 0.666..
        assert_invalid(CollateralParams {
            coll_ratio: Decimal::new(67, 2),
            ..valid_params()
        });
        assert!(validate_collateral_params(
            &TokenRiskConfig::default(),
            &CollateralParams {
                coll_ratio: Decimal::new(66, 2),
                ..valid_params()
            }
        )
        .is_ok());
    }

    #[test]
    fn test_coll_ratio_bounded_by_max() {
        assert_eq!(max_coll_ratio(Decimal::new(5, 2)), MAX_COLLATERALIZATION_RATIO);
        assert_invalid(CollateralParams {
            coll_ratio: Decimal::new(92, 2),
            coll_req_soft: Decimal::new(5, 2),
            coll_req_hard: Decimal::new(4, 2),
            liq_inc_soft: Decimal::new(1, 2),
            liq_inc_hard: Decimal::new(2, 2),
            liq_fee: Decimal::ZERO,
            base_cfactor: Decimal::new(20, 2),
        });
    }

    #[test]
    fn test_base_cfactor_bounds() {
        assert_invalid(CollateralParams {
            base_cfactor: Decimal::new(9, 2),
            ..valid_params()
        });
        assert_invalid(CollateralParams {
            base_cfactor: Decimal::new(51, 2),
            ..valid_params()
        });
    }

    #[test]
    fn test_negative_rejected() {
        assert_invalid(CollateralParams {
            coll_ratio: Decimal::new(-1, 2),
            ..valid_params()
        });
    }

    #[test]
    fn test_cannot_rezero_coll_ratio() {
        let mut store = RiskParameterStore::new();
        let asset = AssetId::new("cWETH");
        store.init(asset.clone());

        store
            .update(&asset, &CollateralParams { coll_ratio: Decimal::ZERO, ..valid_params() })
            .unwrap();
        store.update(&asset, &valid_params()).unwrap();

        let result = store.update(&asset, &CollateralParams { coll_ratio: Decimal::ZERO, ..valid_params() });
        assert!(matches!(result, Err(RiskError::InvalidParameter { .. })));
        assert_eq!(store.get(&asset).unwrap().coll_ratio, Decimal::new(60, 2));
    }

    #[test]
    fn test_failed_update_leaves_config() {
        let mut store = RiskParameterStore::new();
        let asset = AssetId::new("cWETH");
        store.init(asset.clone());
        store.update(&asset, &valid_params()).unwrap();

        let before = *store.get(&asset).unwrap();
        assert!(store
            .update(&asset, &CollateralParams { liq_fee: Decimal::ONE, ..valid_params() })
            .is_err());
        assert_eq!(*store.get(&asset).unwrap(), before);
    }

    #[test]
    fn test_update_unlisted() {
        let mut store = RiskParameterStore::new();
        assert!(matches!(
            store.update(&AssetId::new("cDAI"), &valid_params()),
            Err(RiskError::TokenNotListed { .. })
        ));
    }

    #[test]
    fn test_init_is_idempotent_and_zeroed() {
        let mut store = RiskParameterStore::new();
        let asset = AssetId::new("cWETH");
        store.init(asset.clone());
        store.update(&asset, &valid_params()).unwrap();
        store.init(asset.clone());
        assert!(store.get(&asset).unwrap().is_collateral_enabled());

        store.disable(&asset).unwrap();
        assert!(!store.get(&asset).unwrap().is_collateral_enabled());
    }

    proptest! {
        /// Every accepted configuration satisfies the full bound chain.
        #[test]
        fn fuzz_accepted_configs_respect_bounds(
            ratio in 0u32..10_000,
            soft in 0u32..25_000,
            hard in 0u32..25_000,
            inc_soft in 0u32..4_000,
            inc_hard in 0u32..4_000,
            fee in 0u32..700,
            base in 0u32..6_000,
        ) {
            let bps = |v: u32| Decimal::from(v) / Decimal::from(10_000);
            let params = CollateralParams {
                coll_ratio: bps(ratio),
                coll_req_soft: bps(soft),
                coll_req_hard: bps(hard),
                liq_inc_soft: bps(inc_soft),
                liq_inc_hard: bps(inc_hard),
                liq_fee: bps(fee),
                base_cfactor: bps(base),
            };
            if let Ok(cfg) = validate_collateral_params(&TokenRiskConfig::default(), &params) {
                prop_assert!(cfg.liq_fee <= MAX_LIQUIDATION_FEE);
                prop_assert!(MIN_LIQUIDATION_INCENTIVE + cfg.liq_fee <= cfg.liq_inc_soft);
                prop_assert!(cfg.liq_inc_soft < cfg.liq_inc_hard);
                prop_assert!(cfg.liq_inc_hard <= MAX_LIQUIDATION_INCENTIVE);
                prop_assert!(cfg.liq_inc_hard + MIN_EXCESS_COLLATERAL_REQUIREMENT <= cfg.coll_req_hard);
                prop_assert!(cfg.coll_req_hard < cfg.coll_req_soft);
                prop_assert!(cfg.coll_req_soft <= MAX_COLLATERAL_REQUIREMENT);
                prop_assert!(cfg.coll_ratio <= max_coll_ratio(cfg.coll_req_soft));
            }
        }
    }
}

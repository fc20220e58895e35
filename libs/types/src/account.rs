//! Account portfolio and liquidation status types

use crate::ids::AssetId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Liquidation state of an account
///
/// `Healthy → Flagged → Liquidated → Healthy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum AccountStatus {
    #[default]
    Healthy,
    /// Shortfall detected; eligible for full-account liquidation
    Flagged { l_factor: Decimal, flagged_at: i64 },
    /// Full-account liquidation executed
    Liquidated { liquidated_at: i64 },
}

impl AccountStatus {
    pub fn is_flagged(&self) -> bool {
        matches!(self, AccountStatus::Flagged { .. })
    }
}

/// Ordered set of assets an account holds a position in
///
/// Membership is added on first post or borrow and removed only when the
/// position is explicitly closed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountPortfolio {
    assets: Vec<AssetId>,
    /// Unix seconds of the most recent borrow
    pub cooldown_timestamp: i64,
    pub status: AccountStatus,
}

impl AccountPortfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.assets.contains(asset)
    }

    /// Insert preserving first-entry order. Returns `false` if already present.
    pub fn insert(&mut self, asset: AssetId) -> bool {
        if self.contains(&asset) {
            return false;
        }
        self.assets.push(asset);
        true
    }

    /// Remove an asset. Returns `false` if absent.
    pub fn remove(&mut self, asset: &AssetId) -> bool {
        match self.assets.iter().position(|a| a == asset) {
            Some(idx) => {
                self.assets.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portfolio_insert_is_ordered_set() {
        let mut portfolio = AccountPortfolio::new();
        assert!(portfolio.insert(AssetId::new("cWETH")));
        assert!(portfolio.insert(AssetId::new("cUSDC")));
        assert!(!portfolio.insert(AssetId::new("cWETH")));

        assert_eq!(portfolio.len(), 2);
        assert_eq!(portfolio.assets()[0].as_str(), "cWETH");
        assert_eq!(portfolio.assets()[1].as_str(), "cUSDC");
    }

    #[test]
    fn test_portfolio_remove() {
        let mut portfolio = AccountPortfolio::new();
        portfolio.insert(AssetId::new("cWETH"));
        portfolio.insert(AssetId::new("cUSDC"));

        assert!(portfolio.remove(&AssetId::new("cWETH")));
        assert!(!portfolio.remove(&AssetId::new("cWETH")));
        assert_eq!(portfolio.assets(), &[AssetId::new("cUSDC")]);
    }

    #[test]
    fn test_status_default_and_flag() {
        assert_eq!(AccountStatus::default(), AccountStatus::Healthy);
        let flagged = AccountStatus::Flagged {
            l_factor: Decimal::ONE,
            flagged_at: 10,
        };
        assert!(flagged.is_flagged());
        assert!(!AccountStatus::Liquidated { liquidated_at: 11 }.is_flagged());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&AccountStatus::Healthy).unwrap();
        assert_eq!(json, "{\"status\":\"HEALTHY\"}");
    }
}

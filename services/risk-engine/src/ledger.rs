//! Collateral ledger
//!
//! Per-account, per-asset posted-collateral bookkeeping, per-asset totals and
//! caps, and account portfolios. The ledger is the only writer of these
//! counters; solvency checks that need prices live in the engine, which calls
//! into the ledger only after they pass.
//!
//! Invariants kept here:
//! - `total_posted(a) == Σ posted(u, a)`
//! - `posted(u, a) > 0 ⇒ a ∈ portfolio(u)`
//! - `total_posted(a) + tokens ≤ cap(a)` at every post

use std::collections::HashMap;

use risk_types::account::{AccountPortfolio, AccountStatus};
use risk_types::errors::RiskError;
use risk_types::ids::{AccountId, AssetId};
use risk_types::position::CollateralPosition;
use rust_decimal::Decimal;
use tracing::debug;

/// Saved ledger state of one account, used to undo a failed settlement
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    account: AccountId,
    positions: Option<HashMap<AssetId, CollateralPosition>>,
    portfolio: Option<AccountPortfolio>,
    totals: HashMap<AssetId, Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct CollateralLedger {
    /// account -> (asset -> position)
    positions: HashMap<AccountId, HashMap<AssetId, CollateralPosition>>,
    /// asset -> Σ posted
    totals: HashMap<AssetId, Decimal>,
    /// asset -> cap on Σ posted
    caps: HashMap<AssetId, Decimal>,
    portfolios: HashMap<AccountId, AccountPortfolio>,
}

impl CollateralLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly listed asset with a zero cap
    pub fn init_asset(&mut self, asset: &AssetId) {
        self.totals.entry(asset.clone()).or_insert(Decimal::ZERO);
        self.caps.entry(asset.clone()).or_insert(Decimal::ZERO);
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn total_posted(&self, asset: &AssetId) -> Decimal {
        self.totals.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn cap(&self, asset: &AssetId) -> Decimal {
        self.caps.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn position(&self, account: &AccountId, asset: &AssetId) -> Option<&CollateralPosition> {
        self.positions.get(account).and_then(|p| p.get(asset))
    }

    pub fn posted(&self, account: &AccountId, asset: &AssetId) -> Decimal {
        self.position(account, asset)
            .map(|p| p.posted)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn portfolio(&self, account: &AccountId) -> Option<&AccountPortfolio> {
        self.portfolios.get(account)
    }

    pub fn has_position(&self, account: &AccountId, asset: &AssetId) -> bool {
        self.portfolio(account).map_or(false, |p| p.contains(asset))
    }

    pub fn assets_of(&self, account: &AccountId) -> Vec<AssetId> {
        self.portfolio(account)
            .map(|p| p.assets().to_vec())
            .unwrap_or_default()
    }

    pub fn status(&self, account: &AccountId) -> AccountStatus {
        self.portfolio(account)
            .map(|p| p.status)
            .unwrap_or_default()
    }

    pub fn cooldown_timestamp(&self, account: &AccountId) -> i64 {
        self.portfolio(account).map_or(0, |p| p.cooldown_timestamp)
    }

    // ───────────────────────── Caps ─────────────────────────

    /// Set a cap. A cap below the current total only blocks future posts.
    pub fn set_cap(&mut self, asset: &AssetId, cap: Decimal) -> Result<(), RiskError> {
        if cap.is_sign_negative() {
            return Err(RiskError::invalid(format!("negative cap for {}", asset)));
        }
        self.caps.insert(asset.clone(), cap);
        Ok(())
    }

    /// Zero a cap without validation (collateral disabling)
    pub fn clear_cap(&mut self, asset: &AssetId) {
        self.caps.insert(asset.clone(), Decimal::ZERO);
    }

    // ───────────────────────── Posting ─────────────────────────

    /// Validate a post against the account's share balance and the cap
    pub fn check_post(
        &self,
        account: &AccountId,
        asset: &AssetId,
        tokens: Decimal,
        balance: Decimal,
    ) -> Result<(), RiskError> {
        if tokens <= Decimal::ZERO {
            return Err(RiskError::invalid("collateral amount must be positive"));
        }
        let posted = self
            .posted(account, asset)
            .checked_add(tokens)
            .ok_or(RiskError::Overflow)?;
        if posted > balance {
            return Err(RiskError::invalid(format!(
                "posted {} would exceed balance {}",
                posted, balance
            )));
        }
        let total = self
            .total_posted(asset)
            .checked_add(tokens)
            .ok_or(RiskError::Overflow)?;
        if total > self.cap(asset) {
            return Err(RiskError::invalid(format!(
                "collateral cap {} exceeded for {}: {}",
                self.cap(asset),
                asset,
                total
            )));
        }
        Ok(())
    }

    /// Record a validated post. Returns the new posted amount.
    pub fn post(
        &mut self,
        account: AccountId,
        asset: &AssetId,
        tokens: Decimal,
        now: i64,
    ) -> Decimal {
        let position = self
            .positions
            .entry(account)
            .or_default()
            .entry(asset.clone())
            .or_default();
        position.posted += tokens;
        position.posted_at = now;
        let posted = position.posted;

        *self.totals.entry(asset.clone()).or_default() += tokens;

        let portfolio = self.portfolios.entry(account).or_default();
        portfolio.insert(asset.clone());
        if matches!(portfolio.status, AccountStatus::Liquidated { .. }) {
            portfolio.status = AccountStatus::Healthy;
        }

        debug!(account = %account, asset = %asset, tokens = %tokens, posted = %posted, "Collateral posted");
        posted
    }

    // ───────────────────────── Removal ─────────────────────────

    /// Decrease posted collateral by `tokens`. Returns the remaining amount.
    pub fn remove(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        tokens: Decimal,
    ) -> Result<Decimal, RiskError> {
        let position = self
            .positions
            .get_mut(account)
            .and_then(|p| p.get_mut(asset))
            .filter(|p| !p.is_empty())
            .ok_or_else(|| RiskError::invariant(format!("no collateral posted in {}", asset)))?;
        if tokens > position.posted {
            return Err(RiskError::invalid(format!(
                "cannot remove {} of {} posted",
                tokens, position.posted
            )));
        }
        position.posted -= tokens;
        let remaining = position.posted;

        if let Some(total) = self.totals.get_mut(asset) {
            *total -= tokens;
        }

        debug!(account = %account, asset = %asset, tokens = %tokens, remaining = %remaining, "Collateral removed");
        Ok(remaining)
    }

    /// Shrink posted collateral to at most `limit`. Returns the reduction.
    pub fn reduce_to(&mut self, account: &AccountId, asset: &AssetId, limit: Decimal) -> Result<Decimal, RiskError> {
        let posted = self.posted(account, asset);
        if posted <= limit {
            return Ok(Decimal::ZERO);
        }
        let reduction = posted - limit.max(Decimal::ZERO);
        self.remove(account, asset, reduction)?;
        Ok(reduction)
    }

    // ───────────────────────── Portfolio ─────────────────────────

    /// Add an asset (e.g. a new debt position). Returns `true` if new.
    pub fn enter(&mut self, account: AccountId, asset: &AssetId) -> bool {
        self.portfolios.entry(account).or_default().insert(asset.clone())
    }

    /// Drop an asset from the portfolio, clearing any empty position record
    pub fn exit(&mut self, account: &AccountId, asset: &AssetId) -> bool {
        if let Some(positions) = self.positions.get_mut(account) {
            if positions.get(asset).map_or(false, CollateralPosition::is_empty) {
                positions.remove(asset);
            }
        }
        self.portfolios
            .get_mut(account)
            .map_or(false, |p| p.remove(asset))
    }

    pub fn set_cooldown(&mut self, account: AccountId, now: i64) {
        self.portfolios.entry(account).or_default().cooldown_timestamp = now;
    }

    pub fn set_status(&mut self, account: AccountId, status: AccountStatus) {
        let portfolio = self.portfolios.entry(account).or_default();
        portfolio.status = status;
        if matches!(status, AccountStatus::Liquidated { .. }) && portfolio.is_empty() {
            // nothing else to keep for a fully liquidated, empty account
            portfolio.cooldown_timestamp = 0;
        }
    }

    // ───────────────────────── Rollback ─────────────────────────

    pub fn snapshot(&self, account: &AccountId) -> AccountSnapshot {
        let positions = self.positions.get(account).cloned();
        let totals = positions
            .iter()
            .flat_map(|p| p.keys())
            .map(|asset| (asset.clone(), self.total_posted(asset)))
            .collect();
        AccountSnapshot {
            account: *account,
            positions,
            portfolio: self.portfolios.get(account).cloned(),
            totals,
        }
    }

    pub fn restore(&mut self, snapshot: AccountSnapshot) {
        match snapshot.positions {
            Some(positions) => {
                self.positions.insert(snapshot.account, positions);
            }
            None => {
                self.positions.remove(&snapshot.account);
            }
        }
        match snapshot.portfolio {
            Some(portfolio) => {
                self.portfolios.insert(snapshot.account, portfolio);
            }
            None => {
                self.portfolios.remove(&snapshot.account);
            }
        }
        self.totals.extend(snapshot.totals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (CollateralLedger, AssetId) {
        let mut ledger = CollateralLedger::new();
        let asset = AssetId::new("cWETH");
        ledger.init_asset(&asset);
        ledger.set_cap(&asset, Decimal::from(1_000)).unwrap();
        (ledger, asset)
    }

    #[test]
    fn test_new_asset_has_zero_cap() {
        let mut ledger = CollateralLedger::new();
        let asset = AssetId::new("cDAI");
        ledger.init_asset(&asset);
        assert_eq!(ledger.cap(&asset), Decimal::ZERO);
        let result = ledger.check_post(&AccountId::new(), &asset, Decimal::ONE, Decimal::from(10));
        assert!(matches!(result, Err(RiskError::InvalidParameter { .. })));
    }

    #[test]
    fn test_post_updates_counters_and_portfolio() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.check_post(&acc, &asset, Decimal::from(500), Decimal::from(800)).unwrap();
        let posted = ledger.post(acc, &asset, Decimal::from(500), 100);

        assert_eq!(posted, Decimal::from(500));
        assert_eq!(ledger.total_posted(&asset), Decimal::from(500));
        assert!(ledger.has_position(&acc, &asset));
        assert_eq!(ledger.position(&acc, &asset).unwrap().posted_at, 100);
    }

    #[test]
    fn test_post_rejects_zero() {
        let (ledger, asset) = setup();
        let result = ledger.check_post(&AccountId::new(), &asset, Decimal::ZERO, Decimal::from(10));
        assert!(matches!(result, Err(RiskError::InvalidParameter { .. })));
    }

    #[test]
    fn test_post_rejects_above_balance() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.post(acc, &asset, Decimal::from(5), 0);
        let result = ledger.check_post(&acc, &asset, Decimal::from(6), Decimal::from(10));
        assert!(matches!(result, Err(RiskError::InvalidParameter { .. })));
    }

    #[test]
    fn test_post_rejects_above_cap() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.post(acc, &asset, Decimal::from(500), 0);
        let result = ledger.check_post(&acc, &asset, Decimal::from(600), Decimal::from(2_000));
        assert!(matches!(result, Err(RiskError::InvalidParameter { .. })));
        assert_eq!(ledger.total_posted(&asset), Decimal::from(500));
    }

    #[test]
    fn test_lowered_cap_keeps_positions() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.post(acc, &asset, Decimal::from(500), 0);
        ledger.set_cap(&asset, Decimal::from(100)).unwrap();
        assert_eq!(ledger.posted(&acc, &asset), Decimal::from(500));
        assert!(ledger
            .check_post(&acc, &asset, Decimal::ONE, Decimal::from(1_000))
            .is_err());
    }

    #[test]
    fn test_negative_cap_rejected() {
        let (mut ledger, asset) = setup();
        assert!(ledger.set_cap(&asset, Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_remove_without_position_is_invariant_error() {
        let (mut ledger, asset) = setup();
        let result = ledger.remove(&AccountId::new(), &asset, Decimal::ONE);
        assert!(matches!(result, Err(RiskError::InvariantError { .. })));
    }

    #[test]
    fn test_remove_more_than_posted() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.post(acc, &asset, Decimal::from(5), 0);
        let result = ledger.remove(&acc, &asset, Decimal::from(6));
        assert!(matches!(result, Err(RiskError::InvalidParameter { .. })));
    }

    #[test]
    fn test_post_remove_round_trip() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.post(acc, &asset, Decimal::from(40), 0);
        ledger.post(acc, &asset, Decimal::from(60), 0);
        let remaining = ledger.remove(&acc, &asset, Decimal::from(60)).unwrap();
        assert_eq!(remaining, Decimal::from(40));
        assert_eq!(ledger.total_posted(&asset), Decimal::from(40));
    }

    #[test]
    fn test_reduce_to() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.post(acc, &asset, Decimal::from(100), 0);

        assert_eq!(ledger.reduce_to(&acc, &asset, Decimal::from(150)), Ok(Decimal::ZERO));
        assert_eq!(ledger.reduce_to(&acc, &asset, Decimal::from(70)), Ok(Decimal::from(30)));
        assert_eq!(ledger.posted(&acc, &asset), Decimal::from(70));
        assert_eq!(ledger.total_posted(&asset), Decimal::from(70));

        assert_eq!(ledger.reduce_to(&acc, &asset, Decimal::from(-5)), Ok(Decimal::from(70)));
        assert_eq!(ledger.posted(&acc, &asset), Decimal::ZERO);
        assert_eq!(ledger.reduce_to(&acc, &asset, Decimal::ZERO), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_exit_clears_empty_position() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.post(acc, &asset, Decimal::from(10), 0);
        ledger.remove(&acc, &asset, Decimal::from(10)).unwrap();
        assert!(ledger.has_position(&acc, &asset));

        assert!(ledger.exit(&acc, &asset));
        assert!(!ledger.has_position(&acc, &asset));
        assert!(ledger.position(&acc, &asset).is_none());
    }

    #[test]
    fn test_post_resets_liquidated_status() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.set_status(acc, AccountStatus::Liquidated { liquidated_at: 5 });
        ledger.post(acc, &asset, Decimal::ONE, 10);
        assert_eq!(ledger.status(&acc), AccountStatus::Healthy);
    }

    #[test]
    fn test_snapshot_restore() {
        let (mut ledger, asset) = setup();
        let acc = AccountId::new();
        ledger.post(acc, &asset, Decimal::from(100), 0);
        let snapshot = ledger.snapshot(&acc);

        ledger.remove(&acc, &asset, Decimal::from(100)).unwrap();
        ledger.exit(&acc, &asset);
        ledger.restore(snapshot);

        assert_eq!(ledger.posted(&acc, &asset), Decimal::from(100));
        assert_eq!(ledger.total_posted(&asset), Decimal::from(100));
        assert!(ledger.has_position(&acc, &asset));
    }
}

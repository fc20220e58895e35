//! In-memory implementations of the external capabilities
//!
//! Used by tests and simulations. Handles are cheap clones sharing state, so
//! a caller can keep one handle while the engine owns another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use risk_types::errors::ExternalError;
use risk_types::ids::{AccountId, AssetId, MarketId};
use risk_types::price::PriceReading;
use risk_types::risk::{CollateralSeizure, DebtSettlement};
use rust_decimal::Decimal;

use crate::external::{MarketAsset, PriceSource};

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
struct AssetState {
    decimals: u8,
    collateral_capable: bool,
    underlying: String,
    exchange_rate: Decimal,
    balances: HashMap<AccountId, Decimal>,
    debts: HashMap<AccountId, Decimal>,
    protocol_shares: Decimal,
    bad_debt: Decimal,
    fail_settlement: bool,
}

/// Lending-pool asset with share balances and debt kept in memory
#[derive(Debug, Clone)]
pub struct InMemoryAsset {
    id: AssetId,
    market_id: MarketId,
    state: Arc<Mutex<AssetState>>,
}

impl InMemoryAsset {
    /// New collateral-capable asset with 18 decimals and a 1:1 exchange rate
    pub fn new(id: impl Into<String>, market_id: MarketId) -> Self {
        let id = AssetId::new(id);
        let underlying = id.as_str().trim_start_matches('c').to_string();
        Self {
            id,
            market_id,
            state: Arc::new(Mutex::new(AssetState {
                decimals: 18,
                collateral_capable: true,
                underlying,
                exchange_rate: Decimal::ONE,
                balances: HashMap::new(),
                debts: HashMap::new(),
                protocol_shares: Decimal::ZERO,
                bad_debt: Decimal::ZERO,
                fail_settlement: false,
            })),
        }
    }

    pub fn with_decimals(self, decimals: u8) -> Self {
        lock(&self.state).decimals = decimals;
        self
    }

    pub fn with_exchange_rate(self, rate: Decimal) -> Self {
        lock(&self.state).exchange_rate = rate;
        self
    }

    pub fn with_collateral_capable(self, capable: bool) -> Self {
        lock(&self.state).collateral_capable = capable;
        self
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.id
    }

    pub fn set_balance(&self, account: AccountId, shares: Decimal) {
        lock(&self.state).balances.insert(account, shares);
    }

    pub fn set_debt(&self, account: AccountId, debt: Decimal) {
        lock(&self.state).debts.insert(account, debt);
    }

    pub fn set_exchange_rate(&self, rate: Decimal) {
        lock(&self.state).exchange_rate = rate;
    }

    pub fn balance(&self, account: &AccountId) -> Decimal {
        lock(&self.state).balances.get(account).copied().unwrap_or_default()
    }

    pub fn debt(&self, account: &AccountId) -> Decimal {
        lock(&self.state).debts.get(account).copied().unwrap_or_default()
    }

    pub fn protocol_shares(&self) -> Decimal {
        lock(&self.state).protocol_shares
    }

    pub fn bad_debt(&self) -> Decimal {
        lock(&self.state).bad_debt
    }

    /// Make every settlement hook fail until reset
    pub fn fail_settlement(&self, fail: bool) {
        lock(&self.state).fail_settlement = fail;
    }

    fn validate_seize(&self, state: &AssetState, seizure: &CollateralSeizure) -> Result<(), ExternalError> {
        if state.fail_settlement {
            return Err(self.error("seize rejected"));
        }
        let total = seizure.liquidator_shares + seizure.protocol_shares;
        let held = state.balances.get(&seizure.account).copied().unwrap_or_default();
        if held < total {
            return Err(self.error(format!("cannot seize {} of {} shares", total, held)));
        }
        Ok(())
    }

    fn validate_settle(&self, state: &AssetState, settlement: &DebtSettlement) -> Result<(), ExternalError> {
        if state.fail_settlement {
            return Err(self.error("repay rejected"));
        }
        let owed = state.debts.get(&settlement.account).copied().unwrap_or_default();
        if settlement.repaid + settlement.bad_debt > owed {
            return Err(self.error(format!(
                "cannot clear {} of {} debt",
                settlement.repaid + settlement.bad_debt,
                owed
            )));
        }
        Ok(())
    }

    fn error(&self, reason: impl Into<String>) -> ExternalError {
        ExternalError::Asset {
            asset: self.id.to_string(),
            reason: reason.into(),
        }
    }
}

impl MarketAsset for InMemoryAsset {
    fn id(&self) -> AssetId {
        self.id.clone()
    }

    fn market_id(&self) -> MarketId {
        self.market_id
    }

    fn balance_of(&self, account: &AccountId) -> Result<Decimal, ExternalError> {
        Ok(self.balance(account))
    }

    fn debt_balance_of(&self, account: &AccountId) -> Result<Decimal, ExternalError> {
        Ok(self.debt(account))
    }

    fn decimals(&self) -> u8 {
        lock(&self.state).decimals
    }

    fn is_collateral_capable(&self) -> bool {
        lock(&self.state).collateral_capable
    }

    fn underlying(&self) -> String {
        lock(&self.state).underlying.clone()
    }

    fn exchange_rate_cached(&self) -> Decimal {
        lock(&self.state).exchange_rate
    }

    fn check_seize(&self, seizure: &CollateralSeizure) -> Result<(), ExternalError> {
        self.validate_seize(&lock(&self.state), seizure)
    }

    fn check_settle_debt(&self, settlement: &DebtSettlement) -> Result<(), ExternalError> {
        self.validate_settle(&lock(&self.state), settlement)
    }

    fn seize_collateral(&mut self, seizure: &CollateralSeizure) -> Result<(), ExternalError> {
        let mut state = lock(&self.state);
        self.validate_seize(&state, seizure)?;
        let total = seizure.liquidator_shares + seizure.protocol_shares;
        let held = state.balances.get(&seizure.account).copied().unwrap_or_default();
        state.balances.insert(seizure.account, held - total);
        *state.balances.entry(seizure.liquidator).or_default() += seizure.liquidator_shares;
        state.protocol_shares += seizure.protocol_shares;
        Ok(())
    }

    fn settle_debt(&mut self, settlement: &DebtSettlement) -> Result<(), ExternalError> {
        let mut state = lock(&self.state);
        self.validate_settle(&state, settlement)?;
        let owed = state.debts.get(&settlement.account).copied().unwrap_or_default();
        let cleared = settlement.repaid + settlement.bad_debt;
        state.debts.insert(settlement.account, owed - cleared);
        state.bad_debt += settlement.bad_debt;
        Ok(())
    }
}

/// Price source serving fixed readings per asset
#[derive(Debug, Clone)]
pub struct StaticPriceSource {
    name: String,
    readings: Arc<Mutex<HashMap<AssetId, PriceReading>>>,
}

impl StaticPriceSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            readings: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn set_price(&self, asset: &AssetId, price: Decimal, updated_at: i64) {
        lock(&self.readings).insert(asset.clone(), PriceReading::new(price, updated_at));
    }

    /// Raise or clear the source-side error flag for an asset
    pub fn set_error(&self, asset: &AssetId, error: bool) {
        if let Some(reading) = lock(&self.readings).get_mut(asset) {
            reading.error = error;
        }
    }

    pub fn clear(&self, asset: &AssetId) {
        lock(&self.readings).remove(asset);
    }
}

impl PriceSource for StaticPriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_price(
        &self,
        asset: &AssetId,
        _in_usd: bool,
        _prefer_lower: bool,
    ) -> Result<PriceReading, ExternalError> {
        lock(&self.readings)
            .get(asset)
            .copied()
            .ok_or_else(|| ExternalError::PriceSource {
                source_name: self.name.clone(),
                reason: format!("no feed for {}", asset),
            })
    }
}

//! Capabilities the engine consumes from external collaborators
//!
//! Lending-pool assets own share and debt accounting; price source adapters
//! own feed access. The engine only queries them, except for the settlement
//! hooks invoked by the liquidation path once local effects are committed.
//! Every settlement leg is dry-run through the `check_*` hooks before any
//! mutating hook runs.

use risk_types::errors::ExternalError;
use risk_types::ids::{AccountId, AssetId, MarketId};
use risk_types::price::PriceReading;
use risk_types::risk::{CollateralSeizure, DebtSettlement};
use rust_decimal::Decimal;

/// Lending-pool asset as seen by the risk engine
pub trait MarketAsset {
    fn id(&self) -> AssetId;

    /// Registry this asset belongs to
    fn market_id(&self) -> MarketId;

    /// Share balance of an account
    fn balance_of(&self, account: &AccountId) -> Result<Decimal, ExternalError>;

    /// Outstanding debt of an account, in underlying units (zero if none)
    fn debt_balance_of(&self, account: &AccountId) -> Result<Decimal, ExternalError>;

    fn decimals(&self) -> u8;

    fn is_collateral_capable(&self) -> bool;

    /// Underlying token symbol
    fn underlying(&self) -> String;

    /// Underlying units per share, as of the last accrual
    fn exchange_rate_cached(&self) -> Decimal;

    /// Dry run of `seize_collateral`: fails exactly when the seize would
    fn check_seize(&self, seizure: &CollateralSeizure) -> Result<(), ExternalError>;

    /// Dry run of `settle_debt`: fails exactly when the settlement would
    fn check_settle_debt(&self, settlement: &DebtSettlement) -> Result<(), ExternalError>;

    /// Move seized shares from the account to the liquidator and protocol
    fn seize_collateral(&mut self, seizure: &CollateralSeizure) -> Result<(), ExternalError>;

    /// Apply a liquidator repayment and write off any bad debt
    fn settle_debt(&mut self, settlement: &DebtSettlement) -> Result<(), ExternalError>;
}

/// Narrow price-query capability of a price source adapter
pub trait PriceSource {
    /// Human-readable adapter name, used in logs
    fn name(&self) -> &str;

    fn get_price(
        &self,
        asset: &AssetId,
        in_usd: bool,
        prefer_lower: bool,
    ) -> Result<PriceReading, ExternalError>;
}

//! Risk engine orchestrator
//!
//! Single entry point for asset callbacks, governance and liquidators. Every
//! mutating call runs under the reentrancy guard and validates everything it
//! needs (external queries included) before its first write, so a failed call
//! leaves no trace. Liquidations dry-run every settlement leg, commit ledger
//! effects, then invoke the asset settlement hooks, restoring the account's
//! ledger state if a leg fails.

use risk_types::account::AccountStatus;
use risk_types::errors::RiskError;
use risk_types::ids::{AccountId, AssetId, Caller, MarketId};
use risk_types::numeric::fits_decimals;
use risk_types::pause::{PauseAction, PauseScope, PauseState};
use risk_types::price::{PriceErrorCode, PriceQuote};
use risk_types::risk::{
    AccountHealth, AccountLiquidation, CollateralParams, CollateralSeizure, DebtSettlement,
    LiquidationQuote, Liquidity, TokenRiskConfig,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::RiskEngineConfig;
use crate::events::{EngineEvent, EventRecord};
use crate::external::{MarketAsset, PriceSource};
use crate::health::HealthCalculator;
use crate::ledger::{AccountSnapshot, CollateralLedger};
use crate::liquidation;
use crate::oracle::OracleAggregator;
use crate::params::RiskParameterStore;
use crate::registry::{authorize, pause_permission, MarketRegistry, Permission};
use crate::security::{PermissionAuthority, ReentrancyGuard};

fn rejected(operation: &'static str, account: &AccountId, err: RiskError) -> RiskError {
    warn!(operation, account = %account, error = %err, "Operation rejected");
    err
}

/// Collateralized-lending risk engine for one market
pub struct RiskEngine {
    config: RiskEngineConfig,
    authority: Box<dyn PermissionAuthority>,
    registry: MarketRegistry,
    params: RiskParameterStore,
    ledger: CollateralLedger,
    oracle: OracleAggregator,
    guard: ReentrancyGuard,
    events: Vec<EventRecord>,
}

impl RiskEngine {
    /// Create an engine with the default configuration
    pub fn new(market_id: MarketId, authority: Box<dyn PermissionAuthority>) -> Self {
        let config = RiskEngineConfig::default();
        Self {
            oracle: OracleAggregator::new(config.oracle.clone()),
            config,
            authority,
            registry: MarketRegistry::new(market_id),
            params: RiskParameterStore::new(),
            ledger: CollateralLedger::new(),
            guard: ReentrancyGuard::new(),
            events: Vec::new(),
        }
    }

    /// Create an engine with a custom, validated configuration
    pub fn with_config(
        market_id: MarketId,
        authority: Box<dyn PermissionAuthority>,
        config: RiskEngineConfig,
    ) -> Result<Self, RiskError> {
        config.validate()?;
        let mut engine = Self::new(market_id, authority);
        engine.oracle = OracleAggregator::new(config.oracle.clone());
        engine.config = config;
        Ok(engine)
    }

    pub fn config(&self) -> &RiskEngineConfig {
        &self.config
    }

    pub fn market_id(&self) -> MarketId {
        self.registry.market_id()
    }

    /// Emitted events
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Drain emitted events
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: EngineEvent) {
        self.events.push(EventRecord::new(event));
    }

    fn guarded<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, RiskError>,
    ) -> Result<T, RiskError> {
        self.guard.enter()?;
        let result = op(self);
        self.guard.release();
        result
    }

    fn authorize(&self, caller: &AccountId, permission: Permission) -> Result<(), RiskError> {
        authorize(self.authority.as_ref(), caller, permission)
    }

    fn health(&self) -> HealthCalculator<'_> {
        HealthCalculator {
            registry: &self.registry,
            params: &self.params,
            ledger: &self.ledger,
            oracle: &self.oracle,
        }
    }

    fn asset(&self, asset: &AssetId) -> Result<&dyn MarketAsset, RiskError> {
        self.registry.asset(asset)
    }

    fn ensure_unlocked(&self, account: &AccountId, asset: &AssetId, now: i64) -> Result<(), RiskError> {
        let hold = self.config.min_hold_period_secs;
        match self.ledger.position(account, asset) {
            Some(position) if !position.is_unlocked(now, hold) => Err(RiskError::MinHoldPeriod {
                available_at: position.unlocks_at(hold).saturating_add(1),
            }),
            _ => Ok(()),
        }
    }

    fn ensure_precision(&self, asset: &AssetId, amount: Decimal) -> Result<(), RiskError> {
        let decimals = self.asset(asset)?.decimals();
        if !fits_decimals(amount, decimals) {
            return Err(RiskError::invalid(format!(
                "{} exceeds the {} decimals of {}",
                amount, decimals, asset
            )));
        }
        Ok(())
    }

    // ───────────────────────── Market registry ─────────────────────────

    /// List a lending-pool asset. It starts with a zeroed risk config and a zero cap.
    pub fn list_token(
        &mut self,
        caller: &AccountId,
        asset: Box<dyn MarketAsset>,
    ) -> Result<AssetId, RiskError> {
        self.guarded(|engine| {
            engine.authorize(caller, Permission::Dao)?;
            let underlying = asset.underlying();
            let id = engine.registry.list(asset)?;
            engine.params.init(id.clone());
            engine.ledger.init_asset(&id);
            engine.emit(EngineEvent::TokenListed {
                asset: id.clone(),
                underlying,
            });
            Ok(id)
        })
    }

    pub fn is_listed(&self, asset: &AssetId) -> bool {
        self.registry.is_listed(asset)
    }

    /// Write a pause slot. Pausing needs DAO permission, unpausing elevated.
    pub fn set_paused(
        &mut self,
        caller: &AccountId,
        action: PauseAction,
        scope: PauseScope,
        paused: bool,
    ) -> Result<(), RiskError> {
        self.guarded(|engine| {
            let state = PauseState::from_paused(paused);
            engine.authorize(caller, pause_permission(state))?;
            engine.registry.set_pause(action, scope.clone(), state)?;
            engine.emit(EngineEvent::PauseUpdated { action, scope, state });
            Ok(())
        })
    }

    pub fn set_mint_paused(&mut self, caller: &AccountId, asset: &AssetId, paused: bool) -> Result<(), RiskError> {
        self.set_paused(caller, PauseAction::Mint, PauseScope::Asset(asset.clone()), paused)
    }

    pub fn set_borrow_paused(&mut self, caller: &AccountId, asset: &AssetId, paused: bool) -> Result<(), RiskError> {
        self.set_paused(caller, PauseAction::Borrow, PauseScope::Asset(asset.clone()), paused)
    }

    pub fn set_redeem_paused(&mut self, caller: &AccountId, scope: PauseScope, paused: bool) -> Result<(), RiskError> {
        self.set_paused(caller, PauseAction::Redeem, scope, paused)
    }

    pub fn set_transfer_paused(&mut self, caller: &AccountId, scope: PauseScope, paused: bool) -> Result<(), RiskError> {
        self.set_paused(caller, PauseAction::Transfer, scope, paused)
    }

    pub fn set_seize_paused(&mut self, caller: &AccountId, scope: PauseScope, paused: bool) -> Result<(), RiskError> {
        self.set_paused(caller, PauseAction::Seize, scope, paused)
    }

    pub fn pause_state(&self, action: PauseAction, scope: &PauseScope) -> PauseState {
        self.registry.pause_state(action, scope)
    }

    pub fn is_paused(&self, action: PauseAction, asset: &AssetId) -> bool {
        self.registry.is_paused(action, asset)
    }

    // ───────────────────────── Risk parameters ─────────────────────────

    /// Validate and store a collateral configuration.
    ///
    /// The asset's oracle quote must be clean (`NONE`) at `now`.
    pub fn update_collateral_token(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        collateral: &CollateralParams,
        now: i64,
    ) -> Result<TokenRiskConfig, RiskError> {
        self.guarded(|engine| {
            engine.authorize(caller, Permission::Dao)?;
            if !engine.asset(asset)?.is_collateral_capable() {
                return Err(RiskError::invalid(format!("{} cannot be used as collateral", asset)));
            }

            let quote = engine.oracle.get_price(asset, true, true, now);
            if quote.error != PriceErrorCode::None {
                warn!(asset = %asset, code = ?quote.error, "Collateral update rejected on price");
                return Err(RiskError::PriceError {
                    asset: asset.to_string(),
                    code: quote.error,
                });
            }

            let config = engine.params.update(asset, collateral)?;
            info!(
                asset = %asset,
                coll_ratio = %config.coll_ratio,
                coll_req_soft = %config.coll_req_soft,
                coll_req_hard = %config.coll_req_hard,
                liq_inc_soft = %config.liq_inc_soft,
                liq_inc_hard = %config.liq_inc_hard,
                liq_fee = %config.liq_fee,
                base_cfactor = %config.base_cfactor,
                "Collateral token updated"
            );
            engine.emit(EngineEvent::CollateralTokenUpdated {
                asset: asset.clone(),
                config,
            });
            Ok(config)
        })
    }

    /// Zero the collateral ratio and the cap of an asset. Existing positions stay.
    pub fn disable_collateral(&mut self, caller: &AccountId, asset: &AssetId) -> Result<(), RiskError> {
        self.guarded(|engine| {
            engine.authorize(caller, Permission::Elevated)?;
            engine.registry.ensure_listed(asset)?;
            engine.params.disable(asset)?;
            engine.ledger.clear_cap(asset);
            info!(asset = %asset, "Collateral disabled");
            engine.emit(EngineEvent::CollateralDisabled { asset: asset.clone() });
            Ok(())
        })
    }

    pub fn set_collateral_caps(
        &mut self,
        caller: &AccountId,
        assets: &[AssetId],
        caps: &[Decimal],
    ) -> Result<(), RiskError> {
        self.guarded(|engine| {
            engine.authorize(caller, Permission::Dao)?;
            if assets.is_empty() || assets.len() != caps.len() {
                return Err(RiskError::invalid(format!(
                    "{} assets for {} caps",
                    assets.len(),
                    caps.len()
                )));
            }
            for (asset, cap) in assets.iter().zip(caps) {
                let config = engine.params.get(asset).ok_or_else(|| RiskError::not_listed(asset))?;
                if !config.is_collateral_enabled() {
                    return Err(RiskError::invalid(format!("{} is not enabled as collateral", asset)));
                }
                if cap.is_sign_negative() {
                    return Err(RiskError::invalid(format!("negative cap for {}", asset)));
                }
            }

            for (asset, cap) in assets.iter().zip(caps) {
                engine.ledger.set_cap(asset, *cap)?;
                info!(asset = %asset, cap = %cap, posted = %engine.ledger.total_posted(asset), "Collateral cap updated");
                engine.emit(EngineEvent::CollateralCapUpdated {
                    asset: asset.clone(),
                    cap: *cap,
                });
            }
            Ok(())
        })
    }

    pub fn risk_config(&self, asset: &AssetId) -> Option<&TokenRiskConfig> {
        self.params.get(asset)
    }

    // ───────────────────────── Oracle ─────────────────────────

    pub fn set_price_sources(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        sources: Vec<Box<dyn PriceSource>>,
    ) -> Result<(), RiskError> {
        self.guarded(|engine| {
            engine.authorize(caller, Permission::Dao)?;
            engine.registry.ensure_listed(asset)?;
            let names = sources.iter().map(|s| s.name().to_string()).collect();
            engine.oracle.set_sources(asset, sources)?;
            engine.emit(EngineEvent::PriceSourcesUpdated {
                asset: asset.clone(),
                sources: names,
            });
            Ok(())
        })
    }

    pub fn set_divergence_flags(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        caution: Decimal,
        bad_source: Decimal,
    ) -> Result<(), RiskError> {
        self.guarded(|engine| {
            engine.authorize(caller, Permission::Dao)?;
            engine.registry.ensure_listed(asset)?;
            engine.oracle.set_divergence_flags(asset, caution, bad_source)?;
            engine.emit(EngineEvent::DivergenceFlagsUpdated {
                asset: asset.clone(),
                caution,
                bad_source,
            });
            Ok(())
        })
    }

    pub fn get_price(&self, asset: &AssetId, in_usd: bool, prefer_lower: bool, now: i64) -> PriceQuote {
        self.oracle.get_price(asset, in_usd, prefer_lower, now)
    }

    // ───────────────────────── Collateral ledger ─────────────────────────

    /// Post `tokens` shares of `asset` as collateral for `account`.
    ///
    /// Callable by the account itself or by the asset on its behalf.
    pub fn post_collateral(
        &mut self,
        caller: &Caller,
        account: AccountId,
        asset: &AssetId,
        tokens: Decimal,
        now: i64,
    ) -> Result<Decimal, RiskError> {
        self.guarded(|engine| {
            if caller.account() != Some(&account) && !caller.is_asset(asset) {
                return Err(RiskError::Unauthorized);
            }
            engine.registry.ensure_listed(asset)?;
            engine.registry.ensure_not_paused(PauseAction::Mint, asset)?;
            let market = engine.asset(asset)?;
            if !market.is_collateral_capable() {
                return Err(RiskError::invalid(format!("{} cannot be used as collateral", asset)));
            }
            engine.ensure_precision(asset, tokens)?;
            let balance = engine.asset(asset)?.balance_of(&account)?;
            engine.ledger.check_post(&account, asset, tokens, balance)?;

            let was_liquidated = matches!(engine.ledger.status(&account), AccountStatus::Liquidated { .. });
            let posted = engine.ledger.post(account, asset, tokens, now);
            engine.emit(EngineEvent::CollateralPosted {
                account,
                asset: asset.clone(),
                tokens,
                posted,
                timestamp: now,
            });
            if was_liquidated {
                engine.emit(EngineEvent::AccountStatusChanged {
                    account,
                    status: AccountStatus::Healthy,
                });
            }
            Ok(posted)
        })
    }

    /// Remove posted collateral. Returns the amount still posted.
    pub fn remove_collateral(
        &mut self,
        account: AccountId,
        asset: &AssetId,
        tokens: Decimal,
        close_if_possible: bool,
        now: i64,
    ) -> Result<Decimal, RiskError> {
        self.guarded(|engine| {
            engine.registry.ensure_listed(asset)?;
            if tokens <= Decimal::ZERO {
                return Err(RiskError::invalid("collateral amount must be positive"));
            }
            let posted = engine.ledger.posted(&account, asset);
            if posted.is_zero() {
                return Err(RiskError::invariant(format!("no collateral posted in {}", asset)));
            }
            if tokens > posted {
                return Err(RiskError::invalid(format!("cannot remove {} of {} posted", tokens, posted)));
            }
            engine.ensure_precision(asset, tokens)?;
            engine
                .ensure_unlocked(&account, asset, now)
                .map_err(|e| rejected("remove_collateral", &account, e))?;
            engine.registry.ensure_not_paused(PauseAction::Redeem, asset)?;
            engine
                .health()
                .ensure_solvent_after(&account, asset, -tokens, Decimal::ZERO, now)
                .map_err(|e| rejected("remove_collateral", &account, e))?;
            let debt = engine.asset(asset)?.debt_balance_of(&account)?;

            let remaining = engine.ledger.remove(&account, asset, tokens)?;
            if remaining.is_zero() && close_if_possible && debt.is_zero() {
                engine.ledger.exit(&account, asset);
            }
            engine.emit(EngineEvent::CollateralRemoved {
                account,
                asset: asset.clone(),
                tokens,
                remaining,
                timestamp: now,
            });
            Ok(remaining)
        })
    }

    /// Remove all posted collateral in `asset` and drop it from the portfolio
    pub fn close_position(&mut self, account: AccountId, asset: &AssetId, now: i64) -> Result<(), RiskError> {
        self.guarded(|engine| {
            engine.registry.ensure_listed(asset)?;
            if !engine.ledger.has_position(&account, asset) {
                return Err(RiskError::invariant(format!("no position in {}", asset)));
            }
            let debt = engine.asset(asset)?.debt_balance_of(&account)?;
            if debt > Decimal::ZERO {
                return Err(RiskError::invalid(format!("outstanding debt {} in {}", debt, asset)));
            }

            let posted = engine.ledger.posted(&account, asset);
            if posted > Decimal::ZERO {
                engine
                    .ensure_unlocked(&account, asset, now)
                    .map_err(|e| rejected("close_position", &account, e))?;
                engine
                    .health()
                    .ensure_solvent_after(&account, asset, -posted, Decimal::ZERO, now)
                    .map_err(|e| rejected("close_position", &account, e))?;
                engine.ledger.remove(&account, asset, posted)?;
            }
            engine.ledger.exit(&account, asset);
            debug!(account = %account, asset = %asset, released = %posted, "Position closed");
            engine.emit(EngineEvent::PositionClosed {
                account,
                asset: asset.clone(),
                timestamp: now,
            });
            Ok(())
        })
    }

    /// Asset callback: shrink posted collateral so it never exceeds the
    /// balance left after an outgoing transfer of `amount`. Returns the reduction.
    pub fn reduce_collateral_if_necessary(
        &mut self,
        caller: &Caller,
        account: AccountId,
        asset: &AssetId,
        balance: Decimal,
        amount: Decimal,
    ) -> Result<Decimal, RiskError> {
        self.guarded(|engine| {
            if !caller.is_asset(asset) {
                return Err(RiskError::Unauthorized);
            }
            engine.registry.ensure_listed(asset)?;
            if amount.is_sign_negative() || amount > balance {
                return Err(RiskError::invalid(format!(
                    "transfer of {} from a balance of {}",
                    amount, balance
                )));
            }
            let reduction = engine.ledger.reduce_to(&account, asset, balance - amount)?;
            if reduction > Decimal::ZERO {
                engine.emit(EngineEvent::CollateralReduced {
                    account,
                    asset: asset.clone(),
                    reduction,
                });
            }
            Ok(reduction)
        })
    }

    pub fn collateral_posted(&self, asset: &AssetId) -> Decimal {
        self.ledger.total_posted(asset)
    }

    pub fn collateral_posted_for(&self, account: &AccountId, asset: &AssetId) -> Decimal {
        self.ledger.posted(account, asset)
    }

    pub fn collateral_cap(&self, asset: &AssetId) -> Decimal {
        self.ledger.cap(asset)
    }

    pub fn has_position(&self, account: &AccountId, asset: &AssetId) -> bool {
        self.ledger.has_position(account, asset)
    }

    pub fn assets_of(&self, account: &AccountId) -> Vec<AssetId> {
        self.ledger.assets_of(account)
    }

    pub fn account_status(&self, account: &AccountId) -> AccountStatus {
        self.ledger.status(account)
    }

    // ───────────────────────── Action gates ─────────────────────────

    pub fn can_mint(&self, asset: &AssetId) -> Result<(), RiskError> {
        self.registry.ensure_listed(asset)?;
        self.registry.ensure_not_paused(PauseAction::Mint, asset)
    }

    pub fn can_redeem(&self, account: &AccountId, asset: &AssetId, shares: Decimal, now: i64) -> Result<(), RiskError> {
        self.registry.ensure_listed(asset)?;
        self.registry.ensure_not_paused(PauseAction::Redeem, asset)?;
        self.check_outflow(account, asset, shares, now)
    }

    pub fn can_transfer(&self, account: &AccountId, asset: &AssetId, shares: Decimal, now: i64) -> Result<(), RiskError> {
        self.registry.ensure_listed(asset)?;
        self.registry.ensure_not_paused(PauseAction::Transfer, asset)?;
        self.check_outflow(account, asset, shares, now)
    }

    /// Shares leaving an account may only dig into posted collateral if the
    /// hold period has passed and the account stays solvent without them
    fn check_outflow(&self, account: &AccountId, asset: &AssetId, shares: Decimal, now: i64) -> Result<(), RiskError> {
        if shares <= Decimal::ZERO {
            return Err(RiskError::invalid("share amount must be positive"));
        }
        let balance = self.asset(asset)?.balance_of(account)?;
        if shares > balance {
            return Err(RiskError::invalid(format!("{} shares exceed balance {}", shares, balance)));
        }
        let posted = self.ledger.posted(account, asset);
        let free = (balance - posted).max(Decimal::ZERO);
        if shares <= free {
            return Ok(());
        }
        self.ensure_unlocked(account, asset, now)?;
        self.health()
            .ensure_solvent_after(account, asset, -(shares - free), Decimal::ZERO, now)
            .map_err(|e| rejected("redeem", account, e))
    }

    /// Approve a borrow of `amount` and track the debt asset in the portfolio
    pub fn can_borrow(&mut self, account: AccountId, asset: &AssetId, amount: Decimal, now: i64) -> Result<(), RiskError> {
        self.guarded(|engine| {
            engine.registry.ensure_listed(asset)?;
            engine.registry.ensure_not_paused(PauseAction::Borrow, asset)?;
            if amount <= Decimal::ZERO {
                return Err(RiskError::invalid("borrow amount must be positive"));
            }
            engine.ensure_precision(asset, amount)?;
            engine
                .health()
                .ensure_solvent_after(&account, asset, Decimal::ZERO, amount, now)
                .map_err(|e| rejected("borrow", &account, e))?;

            engine.ledger.enter(account, asset);
            engine.ledger.set_cooldown(account, now);
            engine.emit(EngineEvent::BorrowApproved {
                account,
                asset: asset.clone(),
                amount,
                timestamp: now,
            });
            Ok(())
        })
    }

    /// Repayment must wait out the hold period since the account's last borrow
    pub fn can_repay(&self, account: &AccountId, asset: &AssetId, now: i64) -> Result<(), RiskError> {
        self.registry.ensure_listed(asset)?;
        let cooldown_ends = self
            .ledger
            .cooldown_timestamp(account)
            .saturating_add(self.config.min_hold_period_secs);
        if now <= cooldown_ends {
            return Err(RiskError::MinHoldPeriod {
                available_at: cooldown_ends.saturating_add(1),
            });
        }
        Ok(())
    }

    pub fn can_seize(&self, collateral_asset: &AssetId, debt_asset: &AssetId) -> Result<(), RiskError> {
        let collateral_market = self.asset(collateral_asset)?.market_id();
        let debt_market = self.asset(debt_asset)?.market_id();
        if collateral_market != debt_market {
            return Err(RiskError::invalid(format!(
                "{} and {} belong to different markets",
                collateral_asset, debt_asset
            )));
        }
        self.registry.ensure_not_paused(PauseAction::Seize, collateral_asset)
    }

    // ───────────────────────── Health ─────────────────────────

    pub fn status_of(&self, account: &AccountId, now: i64) -> Result<AccountHealth, RiskError> {
        self.health().status_of(account, now)
    }

    pub fn hypothetical_liquidity_of(
        &self,
        account: &AccountId,
        asset: &AssetId,
        collateral_delta: Decimal,
        debt_delta: Decimal,
        now: i64,
    ) -> Result<Liquidity, RiskError> {
        self.health()
            .hypothetical_liquidity_of(account, asset, collateral_delta, debt_delta, now)
    }

    // ───────────────────────── Liquidation ─────────────────────────

    /// Quote a partial liquidation of `account` by `caller`
    #[allow(clippy::too_many_arguments)]
    pub fn can_liquidate(
        &self,
        caller: &AccountId,
        debt_asset: &AssetId,
        collateral_asset: &AssetId,
        account: &AccountId,
        amount: Decimal,
        exact: bool,
        now: i64,
    ) -> Result<LiquidationQuote, RiskError> {
        if caller == account {
            return Err(RiskError::Unauthorized);
        }
        self.can_seize(collateral_asset, debt_asset)?;
        if self.ledger.total_posted(collateral_asset).is_zero() {
            return Err(RiskError::NoLiquidationAvailable);
        }
        let valuation = self.health().value_account(account, None, now)?;
        liquidation::quote_liquidation(&valuation, debt_asset, collateral_asset, amount, exact)
    }

    /// Execute a partial liquidation
    #[allow(clippy::too_many_arguments)]
    pub fn liquidate(
        &mut self,
        caller: &AccountId,
        debt_asset: &AssetId,
        collateral_asset: &AssetId,
        account: AccountId,
        amount: Decimal,
        exact: bool,
        now: i64,
    ) -> Result<LiquidationQuote, RiskError> {
        self.guarded(|engine| {
            let quote = engine.can_liquidate(caller, debt_asset, collateral_asset, &account, amount, exact, now)?;
            let collateral_debt = engine.asset(collateral_asset)?.debt_balance_of(&account)?;

            let snapshot = engine.ledger.snapshot(&account);
            let remaining = engine.ledger.remove(&account, collateral_asset, quote.collateral_seized)?;
            if remaining.is_zero() && collateral_debt.is_zero() {
                engine.ledger.exit(&account, collateral_asset);
            }

            let seizure = CollateralSeizure {
                asset: collateral_asset.clone(),
                account,
                liquidator: *caller,
                liquidator_shares: quote.liquidator_shares(),
                protocol_shares: quote.protocol_shares,
            };
            let settlement = DebtSettlement {
                asset: debt_asset.clone(),
                account,
                liquidator: *caller,
                repaid: quote.debt_to_repay,
                bad_debt: Decimal::ZERO,
            };
            engine.settle(snapshot, &[seizure], &[settlement])?;

            info!(
                account = %account,
                liquidator = %caller,
                debt_asset = %debt_asset,
                collateral_asset = %collateral_asset,
                l_factor = %quote.l_factor,
                repaid = %quote.debt_to_repay,
                seized = %quote.collateral_seized,
                protocol_shares = %quote.protocol_shares,
                "Account liquidated"
            );
            engine.emit(EngineEvent::Liquidated {
                liquidator: *caller,
                quote: quote.clone(),
                timestamp: now,
            });
            Ok(quote)
        })
    }

    /// HEALTHY → FLAGGED. Returns the liquidation factor.
    pub fn flag_account(&mut self, account: AccountId, now: i64) -> Result<Decimal, RiskError> {
        self.guarded(|engine| {
            let valuation = engine.health().value_account(&account, None, now)?;
            let l_factor = liquidation::account_liquidation_factor(&valuation)?;
            if l_factor.is_zero() {
                return Err(RiskError::NoLiquidationAvailable);
            }
            let status = AccountStatus::Flagged {
                l_factor,
                flagged_at: now,
            };
            engine.ledger.set_status(account, status);
            info!(account = %account, l_factor = %l_factor, "Account flagged for liquidation");
            engine.emit(EngineEvent::AccountStatusChanged { account, status });
            Ok(l_factor)
        })
    }

    /// FLAGGED → LIQUIDATED: seize collateral, clear every debt, report bad debt
    pub fn liquidate_account(
        &mut self,
        caller: &AccountId,
        account: AccountId,
        now: i64,
    ) -> Result<AccountLiquidation, RiskError> {
        self.guarded(|engine| {
            if *caller == account {
                return Err(RiskError::Unauthorized);
            }
            if !engine.ledger.status(&account).is_flagged() {
                return Err(RiskError::NoLiquidationAvailable);
            }
            let valuation = engine.health().value_account(&account, None, now)?;
            for collateral in valuation.assets.iter().filter(|v| v.posted > Decimal::ZERO) {
                engine.registry.ensure_not_paused(PauseAction::Seize, &collateral.asset)?;
            }
            let plan = liquidation::plan_account_liquidation(&valuation, *caller, now)?;

            let snapshot = engine.ledger.snapshot(&account);
            for entry in &valuation.assets {
                if entry.posted > Decimal::ZERO {
                    engine.ledger.remove(&account, &entry.asset, entry.posted)?;
                }
                engine.ledger.exit(&account, &entry.asset);
            }
            engine.ledger.set_status(account, AccountStatus::Liquidated { liquidated_at: now });
            engine.settle(snapshot, &plan.seizures, &plan.debts)?;

            info!(
                account = %account,
                liquidator = %caller,
                l_factor = %plan.l_factor,
                seizures = plan.seizures.len(),
                debts = plan.debts.len(),
                bad_debt = %plan.total_bad_debt(),
                "Account fully liquidated"
            );
            engine.emit(EngineEvent::AccountLiquidated {
                liquidation: plan.clone(),
            });
            Ok(plan)
        })
    }

    /// Dry-run then run the asset settlement hooks; restore the ledger if any fails
    fn settle(
        &mut self,
        snapshot: AccountSnapshot,
        seizures: &[CollateralSeizure],
        debts: &[DebtSettlement],
    ) -> Result<(), RiskError> {
        if let Err(err) = self.run_settlement(seizures, debts) {
            warn!(error = %err, "Settlement failed, restoring ledger");
            self.ledger.restore(snapshot);
            return Err(err);
        }
        Ok(())
    }

    fn run_settlement(&mut self, seizures: &[CollateralSeizure], debts: &[DebtSettlement]) -> Result<(), RiskError> {
        // every leg must pass its dry run before any hook mutates an asset
        for seizure in seizures {
            self.registry.asset(&seizure.asset)?.check_seize(seizure)?;
        }
        for debt in debts {
            self.registry.asset(&debt.asset)?.check_settle_debt(debt)?;
        }
        for seizure in seizures {
            self.registry.asset_mut(&seizure.asset)?.seize_collateral(seizure)?;
        }
        for debt in debts {
            self.registry.asset_mut(&debt.asset)?.settle_debt(debt)?;
        }
        Ok(())
    }
}

//! Shared market fixture for the integration tests

#![allow(dead_code)]

use risk_engine::memory::{InMemoryAsset, StaticPriceSource};
use risk_engine::security::{AccessControl, Role};
use risk_engine::{PriceSource, RiskEngine};
use risk_types::ids::{AccountId, AssetId, Caller, MarketId};
use risk_types::risk::CollateralParams;
use rust_decimal::Decimal;

pub const NOW: i64 = 1_700_000_000;
pub const HOLD: i64 = 1_200;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// 50% collateral ratio, 50%/30% requirements, 5%→10% incentive, 1% fee
pub fn weth_params() -> CollateralParams {
    CollateralParams {
        coll_ratio: Decimal::new(50, 2),
        coll_req_soft: Decimal::new(50, 2),
        coll_req_hard: Decimal::new(30, 2),
        liq_inc_soft: Decimal::new(5, 2),
        liq_inc_hard: Decimal::new(10, 2),
        liq_fee: Decimal::new(1, 2),
        base_cfactor: Decimal::new(20, 2),
    }
}

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

/// Two listed assets priced at 1.0 by a single feed: cWETH configured as
/// collateral with a 1M cap, cUSDC left unconfigured (debt only)
pub struct Market {
    pub engine: RiskEngine,
    pub admin: AccountId,
    pub dao: AccountId,
    pub feed: StaticPriceSource,
    pub weth: InMemoryAsset,
    pub usdc: InMemoryAsset,
}

impl Market {
    pub fn new() -> Self {
        init_tracing();
        let admin = AccountId::new();
        let dao = AccountId::new();
        let mut acl = AccessControl::new(admin);
        acl.grant_role(&admin, dao, Role::Dao).unwrap();

        let market_id = MarketId::new();
        let mut engine = RiskEngine::new(market_id, Box::new(acl));
        let weth = InMemoryAsset::new("cWETH", market_id);
        let usdc = InMemoryAsset::new("cUSDC", market_id);
        engine.list_token(&dao, Box::new(weth.clone())).unwrap();
        engine.list_token(&dao, Box::new(usdc.clone())).unwrap();

        let feed = StaticPriceSource::new("primary");
        for asset in [weth.asset_id(), usdc.asset_id()] {
            feed.set_price(asset, Decimal::ONE, NOW);
            engine
                .set_price_sources(&dao, asset, vec![Box::new(feed.clone()) as Box<dyn PriceSource>])
                .unwrap();
        }

        engine
            .update_collateral_token(&dao, weth.asset_id(), &weth_params(), NOW)
            .unwrap();
        engine
            .set_collateral_caps(&dao, &[weth.asset_id().clone()], &[dec(1_000_000)])
            .unwrap();
        engine.drain_events();

        Self {
            engine,
            admin,
            dao,
            feed,
            weth,
            usdc,
        }
    }

    pub fn weth_id(&self) -> AssetId {
        self.weth.asset_id().clone()
    }

    pub fn usdc_id(&self) -> AssetId {
        self.usdc.asset_id().clone()
    }

    /// Account holding and posting `shares` cWETH at `NOW`
    pub fn depositor(&mut self, shares: i64) -> AccountId {
        let account = AccountId::new();
        let weth = self.weth_id();
        self.weth.set_balance(account, dec(shares));
        self.engine
            .post_collateral(&Caller::Account(account), account, &weth, dec(shares), NOW)
            .unwrap();
        account
    }

    /// 200 cWETH posted (weighted value 100) with 90 cUSDC borrowed, then
    /// accrued to `debt`
    pub fn borrower(&mut self, debt: i64) -> AccountId {
        let account = self.depositor(200);
        let usdc = self.usdc_id();
        self.engine.can_borrow(account, &usdc, dec(90), NOW).unwrap();
        self.usdc.set_debt(account, dec(debt));
        account
    }
}

//! Engine event definitions
//!
//! Immutable records appended by every successful state change. Governance
//! events carry no timestamp of their own; the v7 event id is time-ordered.

use risk_types::account::AccountStatus;
use risk_types::ids::{AccountId, AssetId};
use risk_types::pause::{PauseAction, PauseScope, PauseState};
use risk_types::risk::{AccountLiquidation, LiquidationQuote, TokenRiskConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State change emitted by the risk engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    TokenListed {
        asset: AssetId,
        underlying: String,
    },
    CollateralTokenUpdated {
        asset: AssetId,
        config: TokenRiskConfig,
    },
    CollateralDisabled {
        asset: AssetId,
    },
    CollateralCapUpdated {
        asset: AssetId,
        cap: Decimal,
    },
    PauseUpdated {
        action: PauseAction,
        scope: PauseScope,
        state: PauseState,
    },
    PriceSourcesUpdated {
        asset: AssetId,
        sources: Vec<String>,
    },
    DivergenceFlagsUpdated {
        asset: AssetId,
        caution: Decimal,
        bad_source: Decimal,
    },
    CollateralPosted {
        account: AccountId,
        asset: AssetId,
        tokens: Decimal,
        posted: Decimal,
        timestamp: i64,
    },
    CollateralRemoved {
        account: AccountId,
        asset: AssetId,
        tokens: Decimal,
        remaining: Decimal,
        timestamp: i64,
    },
    /// Posted collateral shrunk to follow an outgoing transfer
    CollateralReduced {
        account: AccountId,
        asset: AssetId,
        reduction: Decimal,
    },
    PositionClosed {
        account: AccountId,
        asset: AssetId,
        timestamp: i64,
    },
    BorrowApproved {
        account: AccountId,
        asset: AssetId,
        amount: Decimal,
        timestamp: i64,
    },
    AccountStatusChanged {
        account: AccountId,
        status: AccountStatus,
    },
    Liquidated {
        liquidator: AccountId,
        quote: LiquidationQuote,
        timestamp: i64,
    },
    AccountLiquidated {
        liquidation: AccountLiquidation,
    },
}

/// Logged event with its unique id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: Uuid,
    pub event: EngineEvent,
}

impl EventRecord {
    pub fn new(event: EngineEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event,
        }
    }
}

impl EngineEvent {
    /// Account the event concerns, if any
    pub fn account(&self) -> Option<&AccountId> {
        match self {
            EngineEvent::CollateralPosted { account, .. }
            | EngineEvent::CollateralRemoved { account, .. }
            | EngineEvent::CollateralReduced { account, .. }
            | EngineEvent::PositionClosed { account, .. }
            | EngineEvent::BorrowApproved { account, .. }
            | EngineEvent::AccountStatusChanged { account, .. } => Some(account),
            EngineEvent::Liquidated { quote, .. } => Some(&quote.account),
            EngineEvent::AccountLiquidated { liquidation } => Some(&liquidation.account),
            _ => None,
        }
    }
}

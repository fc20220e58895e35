//! Price quote types produced by the oracle aggregator

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quality classification of an aggregated price.
///
/// Codes are ordered: `None < Caution < BadSource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PriceErrorCode {
    #[default]
    None = 0,
    Caution = 1,
    BadSource = 2,
}

/// Aggregated price band for one asset. Ephemeral; recomputed per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub lower: Decimal,
    pub upper: Decimal,
    pub error: PriceErrorCode,
}

impl PriceQuote {
    /// Quote returned when no source is usable
    pub fn bad_source() -> Self {
        Self {
            lower: Decimal::ZERO,
            upper: Decimal::ZERO,
            error: PriceErrorCode::BadSource,
        }
    }

    pub fn single(price: Decimal, error: PriceErrorCode) -> Self {
        Self {
            lower: price,
            upper: price,
            error,
        }
    }

    pub fn is_bad_source(&self) -> bool {
        self.error == PriceErrorCode::BadSource
    }

    /// Conservative price for valuing collateral
    pub fn collateral_price(&self) -> Decimal {
        self.lower
    }

    /// Conservative price for valuing debt
    pub fn debt_price(&self) -> Decimal {
        self.upper
    }
}

/// Reading reported by a single price source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReading {
    pub price: Decimal,
    /// Unix seconds of the source's last update
    pub updated_at: i64,
    /// Source-side error flag
    pub error: bool,
}

impl PriceReading {
    pub fn new(price: Decimal, updated_at: i64) -> Self {
        Self {
            price,
            updated_at,
            error: false,
        }
    }
}

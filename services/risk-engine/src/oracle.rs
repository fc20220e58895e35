//! Oracle aggregator
//!
//! Queries up to two independent price sources per asset, drops unusable
//! readings, and cross-checks the remainder into a bounded price band:
//!
//! - no usable source → `(0, 0, BAD_SOURCE)`
//! - one usable source → `(p, p, NONE)`, or `CAUTION` if a second source is
//!   configured but unusable
//! - two usable sources → `(min, max, code)` where the code escalates with the
//!   relative divergence `(max − min) / min`: above the caution threshold it is
//!   `CAUTION`, above the bad-source threshold it is `BAD_SOURCE`

use std::collections::HashMap;

use risk_types::errors::RiskError;
use risk_types::ids::AssetId;
use risk_types::price::{PriceErrorCode, PriceQuote, PriceReading};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::{validate_divergence, OracleConfig};
use crate::external::PriceSource;

/// Maximum number of independent sources per asset
pub const MAX_SOURCES_PER_ASSET: usize = 2;

/// Divergence thresholds for one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivergenceFlags {
    pub caution: Decimal,
    pub bad_source: Decimal,
}

struct AssetFeeds {
    sources: Vec<Box<dyn PriceSource>>,
    flags: Option<DivergenceFlags>,
}

/// Multi-source price aggregator
pub struct OracleAggregator {
    config: OracleConfig,
    feeds: HashMap<AssetId, AssetFeeds>,
}

impl OracleAggregator {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            feeds: HashMap::new(),
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Replace the sources configured for an asset (1 or 2 sources)
    pub fn set_sources(
        &mut self,
        asset: &AssetId,
        sources: Vec<Box<dyn PriceSource>>,
    ) -> Result<(), RiskError> {
        if sources.is_empty() || sources.len() > MAX_SOURCES_PER_ASSET {
            return Err(RiskError::invalid(format!(
                "an asset needs 1 to {} price sources, got {}",
                MAX_SOURCES_PER_ASSET,
                sources.len()
            )));
        }

        info!(
            asset = %asset,
            sources = ?sources.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
            "Price sources configured"
        );

        let flags = self.feeds.remove(asset).and_then(|f| f.flags);
        self.feeds.insert(asset.clone(), AssetFeeds { sources, flags });
        Ok(())
    }

    /// Override the divergence thresholds for one asset
    pub fn set_divergence_flags(
        &mut self,
        asset: &AssetId,
        caution: Decimal,
        bad_source: Decimal,
    ) -> Result<(), RiskError> {
        validate_divergence(caution, bad_source)?;
        let feeds = self
            .feeds
            .get_mut(asset)
            .ok_or_else(|| RiskError::invalid(format!("no price sources for {}", asset)))?;
        feeds.flags = Some(DivergenceFlags { caution, bad_source });
        info!(asset = %asset, %caution, %bad_source, "Divergence flags updated");
        Ok(())
    }

    pub fn divergence_flags(&self, asset: &AssetId) -> DivergenceFlags {
        self.feeds
            .get(asset)
            .and_then(|f| f.flags)
            .unwrap_or(DivergenceFlags {
                caution: self.config.caution_divergence,
                bad_source: self.config.bad_source_divergence,
            })
    }

    pub fn source_count(&self, asset: &AssetId) -> usize {
        self.feeds.get(asset).map_or(0, |f| f.sources.len())
    }

    /// Aggregate a price band for `asset` as of `now` (unix seconds)
    pub fn get_price(
        &self,
        asset: &AssetId,
        in_usd: bool,
        prefer_lower: bool,
        now: i64,
    ) -> PriceQuote {
        let feeds = match self.feeds.get(asset) {
            Some(feeds) => feeds,
            None => {
                debug!(asset = %asset, "No price sources configured");
                return PriceQuote::bad_source();
            }
        };

        let usable: Vec<Decimal> = feeds
            .sources
            .iter()
            .filter_map(|source| self.usable_price(source.as_ref(), asset, in_usd, prefer_lower, now))
            .collect();

        let quote = match usable.as_slice() {
            [] => PriceQuote::bad_source(),
            [price] => {
                let code = if feeds.sources.len() > 1 {
                    PriceErrorCode::Caution
                } else {
                    PriceErrorCode::None
                };
                PriceQuote::single(*price, code)
            }
            [a, b, ..] => {
                let lower = (*a).min(*b);
                let upper = (*a).max(*b);
                let code = classify_divergence(lower, upper, self.divergence_flags(asset));
                PriceQuote { lower, upper, error: code }
            }
        };

        if quote.error != PriceErrorCode::None {
            warn!(
                asset = %asset,
                lower = %quote.lower,
                upper = %quote.upper,
                code = ?quote.error,
                usable = usable.len(),
                configured = feeds.sources.len(),
                "Degraded price quote"
            );
        }
        quote
    }

    fn usable_price(
        &self,
        source: &dyn PriceSource,
        asset: &AssetId,
        in_usd: bool,
        prefer_lower: bool,
        now: i64,
    ) -> Option<Decimal> {
        let reading = match source.get_price(asset, in_usd, prefer_lower) {
            Ok(reading) => reading,
            Err(e) => {
                debug!(asset = %asset, source = source.name(), error = %e, "Price source failed");
                return None;
            }
        };
        if !self.is_usable(&reading, now) {
            debug!(
                asset = %asset,
                source = source.name(),
                price = %reading.price,
                updated_at = reading.updated_at,
                flagged = reading.error,
                "Excluding unusable price reading"
            );
            return None;
        }
        Some(reading.price)
    }

    fn is_usable(&self, reading: &PriceReading, now: i64) -> bool {
        if reading.error || reading.price <= Decimal::ZERO {
            return false;
        }
        if reading.updated_at > now {
            return false;
        }
        now - reading.updated_at <= self.config.max_price_age_secs
    }
}

/// Classify the disagreement between two usable prices
pub fn classify_divergence(lower: Decimal, upper: Decimal, flags: DivergenceFlags) -> PriceErrorCode {
    let Some(divergence) = (upper - lower).checked_div(lower) else {
        return PriceErrorCode::BadSource;
    };
    if divergence > flags.bad_source {
        PriceErrorCode::BadSource
    } else if divergence > flags.caution {
        PriceErrorCode::Caution
    } else {
        PriceErrorCode::None
    }
}

//! Risk engine configuration
//!
//! Loaded from JSON or built from defaults; always validated before use.

use risk_types::errors::RiskError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Oracle aggregation settings applied to assets without overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// A reading older than this is stale
    pub max_price_age_secs: i64,
    /// Relative divergence between sources above which a quote is CAUTION
    pub caution_divergence: Decimal,
    /// Relative divergence above which a quote is BAD_SOURCE
    pub bad_source_divergence: Decimal,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_price_age_secs: 86_400,
            caution_divergence: Decimal::new(5, 2),
            bad_source_divergence: Decimal::new(10, 2),
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<(), RiskError> {
        if self.max_price_age_secs <= 0 {
            return Err(RiskError::invalid("max_price_age_secs must be positive"));
        }
        validate_divergence(self.caution_divergence, self.bad_source_divergence)
    }
}

/// Divergence thresholds must satisfy `0 < caution < bad_source <= 1`
pub fn validate_divergence(caution: Decimal, bad_source: Decimal) -> Result<(), RiskError> {
    if caution <= Decimal::ZERO || caution >= bad_source || bad_source > Decimal::ONE {
        return Err(RiskError::invalid(format!(
            "divergence thresholds out of order: caution {}, bad_source {}",
            caution, bad_source
        )));
    }
    Ok(())
}

/// Risk engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskEngineConfig {
    /// Cooldown after posting collateral or borrowing (anti flash-loan)
    pub min_hold_period_secs: i64,
    pub oracle: OracleConfig,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            min_hold_period_secs: 1_200,
            oracle: OracleConfig::default(),
        }
    }
}

impl RiskEngineConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(raw: &str) -> Result<Self, RiskError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| RiskError::invalid(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        if self.min_hold_period_secs < 0 {
            return Err(RiskError::invalid("min_hold_period_secs must be non-negative"));
        }
        self.oracle.validate()
    }
}

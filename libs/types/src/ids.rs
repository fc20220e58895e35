//! Identifier types for risk engine entities
//!
//! Accounts and market registries use UUID v7 so that identifiers sort by
//! creation time. Listed assets are identified by their token symbol.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an account (borrower, liquidator, or governance actor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a market registry.
///
/// Every lending-pool asset reports the registry it belongs to; assets of
/// different registries can never be liquidated against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(Uuid);

impl MarketId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MarketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Listed asset identifier (lending-pool token symbol)
///
/// Format: non-empty, no whitespace (e.g., "cUSDC", "cWETH")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create a new AssetId from a symbol
    ///
    /// # Panics
    /// Panics if the symbol is empty or contains whitespace
    pub fn new(symbol: impl Into<String>) -> Self {
        let s = symbol.into();
        assert!(Self::is_valid(&s), "AssetId must be a non-empty symbol without whitespace");
        Self(s)
    }

    /// Try to create an AssetId, returning None if invalid
    pub fn try_new(symbol: impl Into<String>) -> Option<Self> {
        let s = symbol.into();
        if Self::is_valid(&s) {
            Some(Self(s))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(s: &str) -> bool {
        !s.is_empty() && !s.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identity of whoever invokes an engine operation.
///
/// Some operations accept both the account owner and the asset contract
/// itself (e.g. posting collateral on deposit); others only the asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Caller {
    Account(AccountId),
    Asset(AssetId),
}

impl Caller {
    /// The account behind this caller, if any
    pub fn account(&self) -> Option<&AccountId> {
        match self {
            Caller::Account(id) => Some(id),
            Caller::Asset(_) => None,
        }
    }

    /// True if this caller is the given asset contract
    pub fn is_asset(&self, asset: &AssetId) -> bool {
        matches!(self, Caller::Asset(id) if id == asset)
    }
}

impl From<AccountId> for Caller {
    fn from(id: AccountId) -> Self {
        Caller::Account(id)
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caller::Account(id) => write!(f, "account:{}", id),
            Caller::Asset(id) => write!(f, "asset:{}", id),
        }
    }
}

//! Market registry
//!
//! Owns the set of listed assets and the tri-state pause slots. Listing is
//! permanent. `mint` and `borrow` pause per asset only; `redeem`, `transfer`
//! and `seize` also have a global slot, and an action is paused if either
//! applicable slot reads `Paused`.

use std::collections::{BTreeMap, HashMap};

use risk_types::errors::RiskError;
use risk_types::ids::{AccountId, AssetId, MarketId};
use risk_types::pause::{PauseAction, PauseScope, PauseState};
use tracing::info;

use crate::external::MarketAsset;
use crate::security::PermissionAuthority;

/// Permission level required by a governance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Dao,
    Elevated,
}

/// Check `caller` against the authority; the single gate for privileged calls
pub fn authorize(
    authority: &dyn PermissionAuthority,
    caller: &AccountId,
    permission: Permission,
) -> Result<(), RiskError> {
    let allowed = match permission {
        Permission::Dao => authority.has_dao_permissions(caller),
        Permission::Elevated => authority.has_elevated_permissions(caller),
    };
    if allowed {
        Ok(())
    } else {
        Err(RiskError::Unauthorized)
    }
}

/// Permission needed to write `state` into a pause slot: pausing is routine
/// governance, unpausing is an elevated action
pub fn pause_permission(state: PauseState) -> Permission {
    if state.is_paused() {
        Permission::Dao
    } else {
        Permission::Elevated
    }
}

pub struct MarketRegistry {
    market_id: MarketId,
    assets: BTreeMap<AssetId, Box<dyn MarketAsset>>,
    global_pauses: HashMap<PauseAction, PauseState>,
    asset_pauses: HashMap<(AssetId, PauseAction), PauseState>,
}

impl MarketRegistry {
    pub fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            assets: BTreeMap::new(),
            global_pauses: HashMap::new(),
            asset_pauses: HashMap::new(),
        }
    }

    pub fn market_id(&self) -> MarketId {
        self.market_id
    }

    pub fn is_listed(&self, asset: &AssetId) -> bool {
        self.assets.contains_key(asset)
    }

    pub fn listed_assets(&self) -> impl Iterator<Item = &AssetId> {
        self.assets.keys()
    }

    pub fn asset(&self, asset: &AssetId) -> Result<&dyn MarketAsset, RiskError> {
        self.assets
            .get(asset)
            .map(|a| a.as_ref())
            .ok_or_else(|| RiskError::not_listed(asset))
    }

    pub fn asset_mut(&mut self, asset: &AssetId) -> Result<&mut (dyn MarketAsset + 'static), RiskError> {
        self.assets
            .get_mut(asset)
            .map(|a| a.as_mut())
            .ok_or_else(|| RiskError::not_listed(asset))
    }

    pub fn ensure_listed(&self, asset: &AssetId) -> Result<(), RiskError> {
        if self.is_listed(asset) {
            Ok(())
        } else {
            Err(RiskError::not_listed(asset))
        }
    }

    /// Register an asset. Fails if it is already listed or belongs to another market.
    pub fn list(&mut self, asset: Box<dyn MarketAsset>) -> Result<AssetId, RiskError> {
        let id = asset.id();
        if self.is_listed(&id) {
            return Err(RiskError::TokenAlreadyListed {
                asset: id.to_string(),
            });
        }
        if asset.market_id() != self.market_id {
            return Err(RiskError::invalid(format!(
                "{} belongs to market {}, not {}",
                id,
                asset.market_id(),
                self.market_id
            )));
        }
        info!(asset = %id, underlying = %asset.underlying(), decimals = asset.decimals(), "Token listed");
        self.assets.insert(id.clone(), asset);
        Ok(id)
    }

    // ───────────────────────── Pauses ─────────────────────────

    /// Raw slot value
    pub fn pause_state(&self, action: PauseAction, scope: &PauseScope) -> PauseState {
        match scope {
            PauseScope::Global => self.global_pauses.get(&action).copied(),
            PauseScope::Asset(asset) => self.asset_pauses.get(&(asset.clone(), action)).copied(),
        }
        .unwrap_or_default()
    }

    /// Write a slot. The caller has already been authorized.
    pub fn set_pause(
        &mut self,
        action: PauseAction,
        scope: PauseScope,
        state: PauseState,
    ) -> Result<(), RiskError> {
        if state == PauseState::Unset {
            return Err(RiskError::invalid("a pause slot can only be set to active or paused"));
        }
        match scope {
            PauseScope::Global => {
                if !action.supports_global() {
                    return Err(RiskError::invalid(format!("{} has no global pause", action)));
                }
                self.global_pauses.insert(action, state);
                info!(%action, scope = "global", state = ?state, "Pause state updated");
            }
            PauseScope::Asset(asset) => {
                self.ensure_listed(&asset)?;
                info!(%action, asset = %asset, state = ?state, "Pause state updated");
                self.asset_pauses.insert((asset, action), state);
            }
        }
        Ok(())
    }

    /// Effective pause of `action` on `asset`, global slot included
    pub fn is_paused(&self, action: PauseAction, asset: &AssetId) -> bool {
        let global = action.supports_global()
            && self.pause_state(action, &PauseScope::Global).is_paused();
        global
            || self
                .pause_state(action, &PauseScope::Asset(asset.clone()))
                .is_paused()
    }

    pub fn ensure_not_paused(&self, action: PauseAction, asset: &AssetId) -> Result<(), RiskError> {
        if self.is_paused(action, asset) {
            return Err(RiskError::Paused { action });
        }
        Ok(())
    }
}

//! Pause flags for market actions
//!
//! A pause slot is tri-state: a slot that was never configured is `Unset`,
//! which is distinct from an explicit `Active`. Only `Paused` blocks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::AssetId;

/// Tri-state pause slot value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PauseState {
    /// Never configured
    #[default]
    Unset = 0,
    /// Explicitly enabled
    Active = 1,
    /// Explicitly paused
    Paused = 2,
}

impl PauseState {
    pub fn is_paused(&self) -> bool {
        matches!(self, PauseState::Paused)
    }

    pub fn from_paused(paused: bool) -> Self {
        if paused {
            PauseState::Paused
        } else {
            PauseState::Active
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Market actions that can be paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseAction {
    Mint,
    Redeem,
    Transfer,
    Borrow,
    Seize,
}

impl PauseAction {
    /// Mint and borrow are paused per asset only
    pub fn supports_global(&self) -> bool {
        matches!(
            self,
            PauseAction::Redeem | PauseAction::Transfer | PauseAction::Seize
        )
    }
}

impl fmt::Display for PauseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PauseAction::Mint => "mint",
            PauseAction::Redeem => "redeem",
            PauseAction::Transfer => "transfer",
            PauseAction::Borrow => "borrow",
            PauseAction::Seize => "seize",
        };
        f.write_str(label)
    }
}

/// Which slot a pause change targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauseScope {
    Global,
    Asset(AssetId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_is_distinct_from_active() {
        let slot = PauseState::default();
        assert_eq!(slot, PauseState::Unset);
        assert_ne!(slot, PauseState::Active);
        assert!(!slot.is_paused());
    }

    #[test]
    fn test_discriminants() {
        assert_eq!(PauseState::Unset.as_u8(), 0);
        assert_eq!(PauseState::Active.as_u8(), 1);
        assert_eq!(PauseState::Paused.as_u8(), 2);
    }

    #[test]
    fn test_from_paused() {
        assert_eq!(PauseState::from_paused(true), PauseState::Paused);
        assert_eq!(PauseState::from_paused(false), PauseState::Active);
    }

    #[test]
    fn test_global_support() {
        assert!(!PauseAction::Mint.supports_global());
        assert!(!PauseAction::Borrow.supports_global());
        assert!(PauseAction::Redeem.supports_global());
        assert!(PauseAction::Transfer.supports_global());
        assert!(PauseAction::Seize.supports_global());
    }
}

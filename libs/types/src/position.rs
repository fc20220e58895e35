//! Collateral position types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Posted collateral of one account in one asset
///
/// `posted` is denominated in lending-pool shares, not underlying units.
/// Invariant: `posted <= balanceOf(account, asset)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollateralPosition {
    pub posted: Decimal,
    /// Unix seconds of the most recent post
    pub posted_at: i64,
}

impl CollateralPosition {
    pub fn new(posted: Decimal, posted_at: i64) -> Self {
        Self { posted, posted_at }
    }

    pub fn is_empty(&self) -> bool {
        self.posted.is_zero()
    }

    /// End of the hold period; reductions are allowed strictly after it
    pub fn unlocks_at(&self, min_hold_period: i64) -> i64 {
        self.posted_at.saturating_add(min_hold_period)
    }

    /// Cooldown check: `now > posted_at + min_hold_period`
    pub fn is_unlocked(&self, now: i64, min_hold_period: i64) -> bool {
        now > self.unlocks_at(min_hold_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_position() {
        assert!(CollateralPosition::default().is_empty());
        assert!(!CollateralPosition::new(Decimal::ONE, 0).is_empty());
    }

    #[test]
    fn test_cooldown_is_strict() {
        let pos = CollateralPosition::new(Decimal::from(10), 1_000);
        assert_eq!(pos.unlocks_at(1_200), 2_200);
        assert!(!pos.is_unlocked(2_200, 1_200));
        assert!(pos.is_unlocked(2_201, 1_200));
    }

    #[test]
    fn test_cooldown_saturates() {
        let pos = CollateralPosition::new(Decimal::ONE, i64::MAX - 5);
        assert_eq!(pos.unlocks_at(1_200), i64::MAX);
        assert!(!pos.is_unlocked(i64::MAX, 1_200));
    }
}

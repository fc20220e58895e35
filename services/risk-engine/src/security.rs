//! Security primitives shared by the engine components
//!
//! Reentrancy guard for mutating entry points and the permission authority
//! consulted before every governance mutation.

use risk_types::errors::RiskError;
use risk_types::ids::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reentrancy guard preventing nested calls into mutating operations.
///
/// A mutating operation acquires the guard before touching state and
/// releases it on completion, success or failure. Any nested call fails.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self { locked: false }
    }

    /// Acquire the guard. Returns `false` if already locked.
    pub fn acquire(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        true
    }

    /// Acquire or fail with `RiskError::Reentrancy`
    pub fn enter(&mut self) -> Result<(), RiskError> {
        if !self.acquire() {
            return Err(RiskError::Reentrancy);
        }
        Ok(())
    }

    pub fn release(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Boolean permission gates consulted before privileged mutations.
pub trait PermissionAuthority {
    /// Governance (DAO) level permission
    fn has_dao_permissions(&self, caller: &AccountId) -> bool;

    /// Emergency (elevated) permission; strictly stronger than DAO
    fn has_elevated_permissions(&self, caller: &AccountId) -> bool;
}

/// Access control roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Routine governance: listing, parameters, caps, pausing
    Dao,
    /// Emergency council: unpausing, collateral disabling
    Elevated,
}

/// Role-based permission authority.
///
/// The primary admin holds `Elevated`, which implies `Dao`.
#[derive(Debug, Clone)]
pub struct AccessControl {
    roles: HashMap<AccountId, Role>,
    admin: AccountId,
}

impl AccessControl {
    pub fn new(admin: AccountId) -> Self {
        let mut roles = HashMap::new();
        roles.insert(admin, Role::Elevated);
        Self { roles, admin }
    }

    pub fn role_of(&self, caller: &AccountId) -> Option<Role> {
        self.roles.get(caller).copied()
    }

    /// Assign a role. Only elevated callers can grant.
    pub fn grant_role(
        &mut self,
        caller: &AccountId,
        target: AccountId,
        role: Role,
    ) -> Result<(), RiskError> {
        if !self.has_elevated_permissions(caller) {
            return Err(RiskError::Unauthorized);
        }
        self.roles.insert(target, role);
        Ok(())
    }

    /// Remove a role. The primary admin cannot be revoked.
    pub fn revoke_role(&mut self, caller: &AccountId, target: &AccountId) -> Result<(), RiskError> {
        if !self.has_elevated_permissions(caller) || *target == self.admin {
            return Err(RiskError::Unauthorized);
        }
        self.roles.remove(target);
        Ok(())
    }

    pub fn admin(&self) -> &AccountId {
        &self.admin
    }
}

impl PermissionAuthority for AccessControl {
    fn has_dao_permissions(&self, caller: &AccountId) -> bool {
        self.role_of(caller).is_some()
    }

    fn has_elevated_permissions(&self, caller: &AccountId) -> bool {
        self.role_of(caller) == Some(Role::Elevated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentrancy_guard_acquire_release() {
        let mut guard = ReentrancyGuard::new();
        assert!(!guard.is_locked());
        assert!(guard.acquire());
        assert!(guard.is_locked());
        guard.release();
        assert!(!guard.is_locked());
    }

    #[test]
    fn test_reentrancy_guard_nested_enter_fails() {
        let mut guard = ReentrancyGuard::new();
        assert!(guard.enter().is_ok());
        assert_eq!(guard.enter(), Err(RiskError::Reentrancy));
        guard.release();
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_admin_is_elevated_and_dao() {
        let admin = AccountId::new();
        let ac = AccessControl::new(admin);
        assert!(ac.has_elevated_permissions(&admin));
        assert!(ac.has_dao_permissions(&admin));
        assert!(!ac.has_dao_permissions(&AccountId::new()));
    }

    #[test]
    fn test_dao_role_is_not_elevated() {
        let admin = AccountId::new();
        let dao = AccountId::new();
        let mut ac = AccessControl::new(admin);
        ac.grant_role(&admin, dao, Role::Dao).unwrap();
        assert!(ac.has_dao_permissions(&dao));
        assert!(!ac.has_elevated_permissions(&dao));
    }

    #[test]
    fn test_dao_cannot_grant() {
        let admin = AccountId::new();
        let dao = AccountId::new();
        let mut ac = AccessControl::new(admin);
        ac.grant_role(&admin, dao, Role::Dao).unwrap();
        let result = ac.grant_role(&dao, AccountId::new(), Role::Elevated);
        assert_eq!(result, Err(RiskError::Unauthorized));
    }

    #[test]
    fn test_cannot_revoke_primary_admin() {
        let admin = AccountId::new();
        let mut ac = AccessControl::new(admin);
        assert_eq!(ac.revoke_role(&admin, &admin), Err(RiskError::Unauthorized));
    }

    #[test]
    fn test_revoke_role() {
        let admin = AccountId::new();
        let dao = AccountId::new();
        let mut ac = AccessControl::new(admin);
        ac.grant_role(&admin, dao, Role::Dao).unwrap();
        ac.revoke_role(&admin, &dao).unwrap();
        assert!(!ac.has_dao_permissions(&dao));
    }
}

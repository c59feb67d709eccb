//! Tenant isolation
//!
//! Every read or write of tenant data carries a [`TenantScope`]. Stores turn
//! it into the SQL predicate `(?n IS NULL OR tenant_id = ?n)`, binding the
//! tenant id or `NULL` for system-wide access. Hotel-scoped rows have no
//! tenant column of their own and are filtered through their hotel.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// No tenant filter: system administrators, customers and public lookups
    System,
    Tenant(Uuid),
}

impl TenantScope {
    /// Scope for an authenticated user
    pub fn for_user(user: &User) -> Result<Self> {
        if user.is_system_admin() || !user.is_tenant_bound() {
            return Ok(TenantScope::System);
        }
        user.tenant_id.map(TenantScope::Tenant).ok_or_else(|| {
            Error::PermissionDenied(format!("User {} is not assigned to a tenant", user.email))
        })
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            TenantScope::System => None,
            TenantScope::Tenant(id) => Some(*id),
        }
    }

    /// SQL parameter for the scope predicate
    pub fn param(&self) -> Option<String> {
        self.tenant_id().map(|id| id.to_string())
    }

    pub fn allows(&self, tenant_id: Uuid) -> bool {
        match self {
            TenantScope::System => true,
            TenantScope::Tenant(id) => *id == tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn user(role: UserRole, tenant: Option<Uuid>) -> User {
        let mut u = User::new(
            format!("{}@scope.test", role.as_str().to_lowercase()),
            String::new(),
            "S".into(),
            "T".into(),
            role,
        );
        u.tenant_id = tenant;
        u
    }

    #[test]
    fn test_scope_for_roles() {
        let tenant = Uuid::new_v4();
        assert_eq!(
            TenantScope::for_user(&user(UserRole::Admin, None)).unwrap(),
            TenantScope::System
        );
        assert_eq!(
            TenantScope::for_user(&user(UserRole::Customer, None)).unwrap(),
            TenantScope::System
        );
        assert_eq!(
            TenantScope::for_user(&user(UserRole::Frontdesk, Some(tenant))).unwrap(),
            TenantScope::Tenant(tenant)
        );
        assert!(TenantScope::for_user(&user(UserRole::Frontdesk, None)).is_err());
    }

    #[test]
    fn test_allows() {
        let a = Uuid::new_v4();
        assert!(TenantScope::System.allows(a));
        assert!(TenantScope::Tenant(a).allows(a));
        assert!(!TenantScope::Tenant(a).allows(Uuid::new_v4()));
        assert_eq!(TenantScope::System.param(), None);
    }
}

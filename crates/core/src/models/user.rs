//! User accounts and platform roles

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    /// Platform roles. A user may hold several.
    pub enum UserRole {
        /// System administrator, sees every tenant
        Admin => "ADMIN",
        HotelAdmin => "HOTEL_ADMIN",
        HotelManager => "HOTEL_MANAGER",
        Frontdesk => "FRONTDESK",
        Housekeeping => "HOUSEKEEPING",
        Maintenance => "MAINTENANCE",
        OperationsSupervisor => "OPERATIONS_SUPERVISOR",
        Customer => "CUSTOMER",
        Guest => "GUEST",
    }
}

impl UserRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::Admin => "System Administrator",
            UserRole::HotelAdmin => "Hotel Administrator",
            UserRole::HotelManager => "Hotel Manager",
            UserRole::Frontdesk => "Front Desk",
            UserRole::Housekeeping => "Housekeeping",
            UserRole::Maintenance => "Maintenance",
            UserRole::OperationsSupervisor => "Operations Supervisor",
            UserRole::Customer => "Customer",
            UserRole::Guest => "Guest",
        }
    }

    /// Roles that only make sense inside a tenant
    pub fn is_tenant_bound(&self) -> bool {
        !matches!(self, UserRole::Admin | UserRole::Customer | UserRole::Guest)
    }

    /// Hotel staff roles
    pub fn is_staff(&self) -> bool {
        self.is_tenant_bound()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub hotel_id: Option<Uuid>,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub roles: BTreeSet<UserRole>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        email: String,
        password_hash: String,
        first_name: String,
        last_name: String,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            hotel_id: None,
            email: email.trim().to_lowercase(),
            password_hash,
            first_name,
            last_name,
            phone: None,
            roles: BTreeSet::from([role]),
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }

    pub fn is_system_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    /// True when any held role requires a tenant
    pub fn is_tenant_bound(&self) -> bool {
        self.roles.iter().any(UserRole::is_tenant_bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_bound_roles() {
        assert!(!UserRole::Admin.is_tenant_bound());
        assert!(!UserRole::Customer.is_tenant_bound());
        assert!(!UserRole::Guest.is_tenant_bound());
        assert!(UserRole::HotelAdmin.is_tenant_bound());
        assert!(UserRole::Frontdesk.is_tenant_bound());
        assert!(UserRole::Housekeeping.is_tenant_bound());
    }

    #[test]
    fn test_new_user_normalizes_email() {
        let user = User::new(
            "  Guest@Example.COM ".into(),
            String::new(),
            "Abebe".into(),
            "Kebede".into(),
            UserRole::Customer,
        );
        assert_eq!(user.email, "guest@example.com");
        assert_eq!(user.full_name(), "Abebe Kebede");
        assert!(!user.is_tenant_bound());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new(
            "a@b.c".into(),
            "secret-hash".into(),
            "A".into(),
            "B".into(),
            UserRole::Frontdesk,
        );
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("FRONTDESK"));
    }
}

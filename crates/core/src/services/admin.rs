//! Platform administration: tenants, hotels and user accounts
//!
//! Every operation here needs the system ADMIN role.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{normalize_email, optional, require, required};
use crate::credentials::{hash_password, temporary_password, validate_password};
use crate::error::{Error, Result};
use crate::models::{
    Hotel, HotelStatistics, Page, PageRequest, Room, Tenant, TenantStatistics, User, UserRole,
};
use crate::permissions::Action;
use crate::scope::TenantScope;
use crate::storage::{
    Database, HotelFilter, HotelStore, RoomFilter, TenantStore, UserFilter, UserStore,
};

#[derive(Debug, Clone, Deserialize)]
pub struct TenantInput {
    pub name: String,
    pub subdomain: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Lowercase letters, digits and inner hyphens, 3 to 63 characters
pub(crate) fn validate_subdomain(subdomain: &str) -> Result<String> {
    let subdomain = subdomain.trim().to_lowercase();
    let valid = (3..=63).contains(&subdomain.len())
        && subdomain.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !subdomain.starts_with('-')
        && !subdomain.ends_with('-');
    if !valid {
        return Err(Error::validation(format!("Invalid subdomain: {subdomain}")));
    }
    Ok(subdomain)
}

#[derive(Debug, Clone, Deserialize)]
pub struct HotelInput {
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl HotelInput {
    fn apply(&self, hotel: &mut Hotel) -> Result<()> {
        hotel.name = required(&self.name, "Hotel name")?;
        hotel.address = required(&self.address, "Address")?;
        hotel.city = required(&self.city, "City")?;
        hotel.country = required(&self.country, "Country")?;
        hotel.description = optional(self.description.clone());
        hotel.phone = optional(self.phone.clone());
        hotel.email = optional(self.email.clone()).map(|e| normalize_email(&e)).transpose()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    /// Generated and returned once when absent
    #[serde(default)]
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub roles: Vec<UserRole>,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub hotel_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub hotel_id: Option<Uuid>,
}

/// Platform dashboard counts
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlatformStatistics {
    pub tenants: TenantStatistics,
    pub hotels: HotelStatistics,
    pub hotel_admins: u64,
    pub customers: u64,
}

/// Tenant and hotel placement must agree with the roles held
fn check_placement(conn: &Connection, user: &User) -> Result<()> {
    if user.roles.is_empty() {
        return Err(Error::validation("A user needs at least one role"));
    }
    let bound = user.roles.iter().any(UserRole::is_tenant_bound);
    if user.is_system_admin() && user.tenant_id.is_some() {
        return Err(Error::validation("System administrators cannot belong to a tenant"));
    }
    if bound && user.tenant_id.is_none() {
        return Err(Error::validation("Hotel staff must belong to a tenant"));
    }
    if let Some(tenant_id) = user.tenant_id {
        TenantStore::new(conn)
            .find_by_id(tenant_id)?
            .ok_or_else(|| Error::not_found("Tenant", tenant_id))?;
    }
    if let Some(hotel_id) = user.hotel_id {
        let hotel = HotelStore::new(conn)
            .find_by_id(TenantScope::System, hotel_id)?
            .ok_or_else(|| Error::not_found("Hotel", hotel_id))?;
        if Some(hotel.tenant_id) != user.tenant_id {
            return Err(Error::validation("Hotel belongs to another tenant"));
        }
    }
    Ok(())
}

pub struct AdminService<'a> {
    db: &'a Database,
}

impl<'a> AdminService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // Tenants

    #[instrument(skip(self, actor, input), fields(subdomain = %input.subdomain))]
    pub fn create_tenant(&self, actor: &User, input: &TenantInput) -> Result<Tenant> {
        require(actor, Action::ManageTenants)?;
        let name = required(&input.name, "Tenant name")?;
        let subdomain = validate_subdomain(&input.subdomain)?;
        self.db.transaction(|conn| {
            let tenants = TenantStore::new(conn);
            if tenants.subdomain_taken(&subdomain, None)? {
                return Err(Error::Conflict(format!("Subdomain {subdomain} is taken")));
            }
            let mut tenant = Tenant::new(name, subdomain);
            tenant.description = optional(input.description.clone());
            tenant.is_active = input.is_active.unwrap_or(true);
            tenants.create(&tenant)?;
            info!(tenant_id = %tenant.id, "Tenant created");
            Ok(tenant)
        })
    }

    pub fn update_tenant(
        &self,
        actor: &User,
        tenant_id: Uuid,
        input: &TenantInput,
    ) -> Result<Tenant> {
        require(actor, Action::ManageTenants)?;
        let name = required(&input.name, "Tenant name")?;
        let subdomain = validate_subdomain(&input.subdomain)?;
        self.db.transaction(|conn| {
            let tenants = TenantStore::new(conn);
            let mut tenant = tenants
                .find_by_id(tenant_id)?
                .ok_or_else(|| Error::not_found("Tenant", tenant_id))?;
            if tenants.subdomain_taken(&subdomain, Some(tenant.id))? {
                return Err(Error::Conflict(format!("Subdomain {subdomain} is taken")));
            }
            tenant.name = name;
            tenant.subdomain = subdomain;
            tenant.description = optional(input.description.clone());
            tenant.is_active = input.is_active.unwrap_or(tenant.is_active);
            tenants.update(&tenant)?;
            Ok(tenant)
        })
    }

    /// Only tenants without hotels or users can be removed
    pub fn delete_tenant(&self, actor: &User, tenant_id: Uuid) -> Result<()> {
        require(actor, Action::ManageTenants)?;
        self.db.transaction(|conn| {
            let tenants = TenantStore::new(conn);
            let tenant = tenants
                .find_by_id(tenant_id)?
                .ok_or_else(|| Error::not_found("Tenant", tenant_id))?;
            if tenants.count_hotels(tenant.id)? > 0 {
                return Err(Error::Conflict(format!("{} still has hotels", tenant.name)));
            }
            let members = UserStore::new(conn).list(
                TenantScope::Tenant(tenant.id),
                &UserFilter::default(),
                PageRequest::new(0, 1),
            )?;
            if members.total_elements > 0 {
                return Err(Error::Conflict(format!("{} still has user accounts", tenant.name)));
            }
            tenants.delete(tenant.id)?;
            warn!(tenant_id = %tenant.id, name = %tenant.name, "Tenant deleted");
            Ok(())
        })
    }

    pub fn toggle_tenant(&self, actor: &User, tenant_id: Uuid) -> Result<Tenant> {
        require(actor, Action::ManageTenants)?;
        self.db.transaction(|conn| {
            let tenants = TenantStore::new(conn);
            let mut tenant = tenants
                .find_by_id(tenant_id)?
                .ok_or_else(|| Error::not_found("Tenant", tenant_id))?;
            tenant.is_active = !tenant.is_active;
            tenants.update(&tenant)?;
            Ok(tenant)
        })
    }

    pub fn tenant(&self, actor: &User, tenant_id: Uuid) -> Result<Tenant> {
        require(actor, Action::ManageTenants)?;
        self.db
            .tenants()
            .find_by_id(tenant_id)?
            .ok_or_else(|| Error::not_found("Tenant", tenant_id))
    }

    pub fn tenants(
        &self,
        actor: &User,
        page: PageRequest,
        active_only: bool,
    ) -> Result<Page<Tenant>> {
        require(actor, Action::ManageTenants)?;
        self.db.tenants().list(page, active_only)
    }

    pub fn tenant_hotels(&self, actor: &User, tenant_id: Uuid) -> Result<Vec<Hotel>> {
        self.tenant(actor, tenant_id)?;
        self.db.hotels().list_by_tenant(tenant_id)
    }

    pub fn tenant_statistics(&self, actor: &User) -> Result<TenantStatistics> {
        require(actor, Action::ManageTenants)?;
        self.db.tenants().statistics()
    }

    // Hotels

    #[instrument(skip(self, actor, input), fields(tenant_id = %input.tenant_id))]
    pub fn create_hotel(&self, actor: &User, input: &HotelInput) -> Result<Hotel> {
        require(actor, Action::ManageHotels)?;
        self.db.transaction(|conn| {
            let tenant = TenantStore::new(conn)
                .find_by_id(input.tenant_id)?
                .ok_or_else(|| Error::not_found("Tenant", input.tenant_id))?;
            let mut hotel = Hotel::new(
                tenant.id,
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            );
            input.apply(&mut hotel)?;
            HotelStore::new(conn).create(&hotel)?;
            info!(hotel_id = %hotel.id, tenant = %tenant.name, "Hotel created");
            Ok(hotel)
        })
    }

    /// Profile changes only; hotels never move between tenants
    pub fn update_hotel(&self, actor: &User, hotel_id: Uuid, input: &HotelInput) -> Result<Hotel> {
        require(actor, Action::ManageHotels)?;
        self.db.transaction(|conn| {
            let hotels = HotelStore::new(conn);
            let mut hotel = hotels
                .find_by_id(TenantScope::System, hotel_id)?
                .ok_or_else(|| Error::not_found("Hotel", hotel_id))?;
            if input.tenant_id != hotel.tenant_id {
                return Err(Error::validation("A hotel cannot move to another tenant"));
            }
            input.apply(&mut hotel)?;
            hotels.update(&hotel)?;
            Ok(hotel)
        })
    }

    /// Hotels keep their history; deleting deactivates
    pub fn delete_hotel(&self, actor: &User, hotel_id: Uuid) -> Result<Hotel> {
        self.set_hotel_active(actor, hotel_id, Some(false))
    }

    pub fn toggle_hotel(&self, actor: &User, hotel_id: Uuid) -> Result<Hotel> {
        self.set_hotel_active(actor, hotel_id, None)
    }

    fn set_hotel_active(
        &self,
        actor: &User,
        hotel_id: Uuid,
        active: Option<bool>,
    ) -> Result<Hotel> {
        require(actor, Action::ManageHotels)?;
        self.db.transaction(|conn| {
            let hotels = HotelStore::new(conn);
            let mut hotel = hotels
                .find_by_id(TenantScope::System, hotel_id)?
                .ok_or_else(|| Error::not_found("Hotel", hotel_id))?;
            hotel.is_active = active.unwrap_or(!hotel.is_active);
            hotels.set_active(hotel.id, hotel.is_active)?;
            info!(hotel_id = %hotel.id, active = hotel.is_active, "Hotel status changed");
            Ok(hotel)
        })
    }

    pub fn hotel(&self, actor: &User, hotel_id: Uuid) -> Result<Hotel> {
        require(actor, Action::ManageHotels)?;
        self.db
            .hotels()
            .find_by_id(TenantScope::System, hotel_id)?
            .ok_or_else(|| Error::not_found("Hotel", hotel_id))
    }

    pub fn hotels(
        &self,
        actor: &User,
        filter: &HotelFilter,
        page: PageRequest,
    ) -> Result<Page<Hotel>> {
        require(actor, Action::ManageHotels)?;
        self.db.hotels().list(TenantScope::System, filter, page)
    }

    pub fn hotel_rooms(&self, actor: &User, hotel_id: Uuid) -> Result<Vec<Room>> {
        let hotel = self.hotel(actor, hotel_id)?;
        self.db.rooms().list_by_hotel(hotel.id, RoomFilter::default())
    }

    /// Make `user_id` the administrator of a hotel, binding them to its tenant
    #[instrument(skip(self, actor))]
    pub fn assign_admin(&self, actor: &User, hotel_id: Uuid, user_id: Uuid) -> Result<User> {
        require(actor, Action::ManageHotels)?;
        self.db.transaction(|conn| {
            let hotel = HotelStore::new(conn)
                .find_by_id(TenantScope::System, hotel_id)?
                .ok_or_else(|| Error::not_found("Hotel", hotel_id))?;
            let users = UserStore::new(conn);
            let mut user = users
                .find_by_id(TenantScope::System, user_id)?
                .ok_or_else(|| Error::not_found("User", user_id))?;
            if user.is_system_admin() {
                return Err(Error::validation(
                    "System administrators cannot be hotel administrators",
                ));
            }
            if user.tenant_id.is_some_and(|id| id != hotel.tenant_id) {
                return Err(Error::validation(format!("{} belongs to another tenant", user.email)));
            }
            user.tenant_id = Some(hotel.tenant_id);
            user.hotel_id = Some(hotel.id);
            user.roles.remove(&UserRole::Customer);
            user.roles.remove(&UserRole::Guest);
            user.roles.insert(UserRole::HotelAdmin);
            users.update(&user)?;
            info!(user = %user.email, hotel = %hotel.name, "Hotel administrator assigned");
            Ok(user)
        })
    }

    pub fn hotel_statistics(&self, actor: &User) -> Result<HotelStatistics> {
        require(actor, Action::ManageHotels)?;
        self.db.hotels().statistics(TenantScope::System)
    }

    pub fn statistics(&self, actor: &User) -> Result<PlatformStatistics> {
        require(actor, Action::ManageTenants)?;
        let users = self.db.users();
        Ok(PlatformStatistics {
            tenants: self.db.tenants().statistics()?,
            hotels: self.db.hotels().statistics(TenantScope::System)?,
            hotel_admins: users.count_with_role(UserRole::HotelAdmin)?,
            customers: users.count_with_role(UserRole::Customer)?,
        })
    }

    // Users

    /// Create an account. The second value is the generated password when
    /// none was supplied.
    #[instrument(skip(self, actor, request), fields(email = %request.email))]
    pub fn create_user(&self, actor: &User, request: &NewUser) -> Result<(User, Option<String>)> {
        require(actor, Action::ManageUsers)?;
        let email = normalize_email(&request.email)?;
        let first_name = required(&request.first_name, "First name")?;
        let last_name = required(&request.last_name, "Last name")?;
        let (password, generated) = match &request.password {
            Some(password) => {
                validate_password(password)?;
                (password.clone(), None)
            }
            None => {
                let password = temporary_password();
                (password.clone(), Some(password))
            }
        };
        let password_hash = hash_password(&password)?;

        self.db.transaction(|conn| {
            let users = UserStore::new(conn);
            if users.email_taken(&email, None)? {
                return Err(Error::Conflict(format!("Email {email} is already registered")));
            }
            let mut user = User::new(
                email.clone(),
                password_hash.clone(),
                first_name.clone(),
                last_name.clone(),
                UserRole::Customer,
            );
            user.roles = request.roles.iter().copied().collect();
            user.phone = optional(request.phone.clone());
            user.tenant_id = request.tenant_id;
            user.hotel_id = request.hotel_id;
            check_placement(conn, &user)?;
            users.create(&user)?;
            info!(user_id = %user.id, roles = ?user.roles, "User created");
            Ok((user, generated.clone()))
        })
    }

    pub fn update_user(&self, actor: &User, user_id: Uuid, update: &UserUpdate) -> Result<User> {
        require(actor, Action::ManageUsers)?;
        let first_name = required(&update.first_name, "First name")?;
        let last_name = required(&update.last_name, "Last name")?;
        self.db.transaction(|conn| {
            let users = UserStore::new(conn);
            let mut user = users
                .find_by_id(TenantScope::System, user_id)?
                .ok_or_else(|| Error::not_found("User", user_id))?;
            user.first_name = first_name;
            user.last_name = last_name;
            user.phone = optional(update.phone.clone());
            user.tenant_id = update.tenant_id;
            user.hotel_id = update.hotel_id;
            check_placement(conn, &user)?;
            users.update(&user)?;
            Ok(user)
        })
    }

    pub fn delete_user(&self, actor: &User, user_id: Uuid) -> Result<()> {
        require(actor, Action::ManageUsers)?;
        if user_id == actor.id {
            return Err(Error::validation("You cannot delete your own account"));
        }
        self.db.transaction(|conn| {
            let users = UserStore::new(conn);
            let user = users
                .find_by_id(TenantScope::System, user_id)?
                .ok_or_else(|| Error::not_found("User", user_id))?;
            users.delete(user.id)?;
            warn!(user = %user.email, "User deleted");
            Ok(())
        })
    }

    pub fn toggle_user(&self, actor: &User, user_id: Uuid) -> Result<User> {
        require(actor, Action::ManageUsers)?;
        if user_id == actor.id {
            return Err(Error::validation("You cannot change your own account status"));
        }
        self.db.transaction(|conn| {
            let users = UserStore::new(conn);
            let mut user = users
                .find_by_id(TenantScope::System, user_id)?
                .ok_or_else(|| Error::not_found("User", user_id))?;
            user.is_active = !user.is_active;
            users.set_active(user.id, user.is_active)?;
            Ok(user)
        })
    }

    pub fn add_role(&self, actor: &User, user_id: Uuid, role: UserRole) -> Result<User> {
        self.change_roles(actor, user_id, |user| {
            user.roles.insert(role);
            Ok(())
        })
    }

    pub fn remove_role(&self, actor: &User, user_id: Uuid, role: UserRole) -> Result<User> {
        let own_admin = user_id == actor.id && role == UserRole::Admin;
        self.change_roles(actor, user_id, |user| {
            if own_admin {
                return Err(Error::validation("You cannot remove your own administrator role"));
            }
            if !user.roles.contains(&role) {
                return Err(Error::validation(format!("{} does not hold {role}", user.email)));
            }
            if user.roles.len() == 1 {
                return Err(Error::validation("A user needs at least one role"));
            }
            user.roles.remove(&role);
            Ok(())
        })
    }

    fn change_roles(
        &self,
        actor: &User,
        user_id: Uuid,
        change: impl FnOnce(&mut User) -> Result<()>,
    ) -> Result<User> {
        require(actor, Action::ManageUsers)?;
        self.db.transaction(|conn| {
            let users = UserStore::new(conn);
            let mut user = users
                .find_by_id(TenantScope::System, user_id)?
                .ok_or_else(|| Error::not_found("User", user_id))?;
            change(&mut user)?;
            check_placement(conn, &user)?;
            users.update(&user)?;
            info!(user = %user.email, roles = ?user.roles, "Roles changed");
            Ok(user)
        })
    }

    pub fn user(&self, actor: &User, user_id: Uuid) -> Result<User> {
        require(actor, Action::ManageUsers)?;
        self.db
            .users()
            .find_by_id(TenantScope::System, user_id)?
            .ok_or_else(|| Error::not_found("User", user_id))
    }

    pub fn users(
        &self,
        actor: &User,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>> {
        require(actor, Action::ManageUsers)?;
        self.db.users().list(TenantScope::System, filter, page)
    }
}

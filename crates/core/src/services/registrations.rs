//! Self-service hotel onboarding
//!
//! Prospective hotels submit a registration publicly; a system admin
//! approves it, which provisions a tenant, the hotel and its first
//! HOTEL_ADMIN account in one transaction.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::admin::validate_subdomain;
use super::{normalize_email, optional, require, required};
use crate::credentials::{hash_password, temporary_password};
use crate::error::{Error, Result};
use crate::models::{
    Hotel, HotelRegistration, Page, PageRequest, RegistrationStatistics, RegistrationStatus, Tenant,
    User, UserRole,
};
use crate::permissions::Action;
use crate::storage::{Database, HotelStore, RegistrationStore, TenantStore, UserStore};

#[derive(Debug, Clone, Deserialize)]
pub struct NewRegistration {
    pub hotel_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub country: String,
    pub contact_email: String,
    pub contact_person: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Everything provisioned by an approval. The password is shown once.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationApproval {
    pub registration: HotelRegistration,
    pub tenant: Tenant,
    pub hotel: Hotel,
    pub admin: User,
    pub temporary_password: String,
}

/// Subdomain derived from the hotel name, suffixed until unused
fn unique_subdomain(conn: &Connection, hotel_name: &str) -> Result<String> {
    let mut slug = String::new();
    for c in hotel_name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.truncate(50);
    let slug = slug.trim_end_matches('-');
    let base = if slug.len() < 3 { "hotel" } else { slug };

    let tenants = TenantStore::new(conn);
    let mut candidate = validate_subdomain(base)?;
    let mut n = 2;
    while tenants.subdomain_taken(&candidate, None)? {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    Ok(candidate)
}

/// "Almaz Tadesse Worku" becomes ("Almaz", "Tadesse Worku")
fn split_name(contact_person: &str) -> (String, String) {
    match contact_person.trim().split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (contact_person.trim().to_string(), "Admin".to_string()),
    }
}

pub struct RegistrationService<'a> {
    db: &'a Database,
}

impl<'a> RegistrationService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn load(&self, conn: &Connection, id: Uuid) -> Result<HotelRegistration> {
        RegistrationStore::new(conn)
            .find_by_id(id)?
            .ok_or_else(|| Error::not_found("Hotel registration", id))
    }

    /// Public submission; one open registration per contact email
    #[instrument(skip(self, request), fields(hotel = %request.hotel_name))]
    pub fn submit(
        &self,
        request: &NewRegistration,
        now: DateTime<Utc>,
    ) -> Result<HotelRegistration> {
        let registration = HotelRegistration {
            id: Uuid::new_v4(),
            hotel_name: required(&request.hotel_name, "Hotel name")?,
            description: optional(request.description.clone()),
            address: required(&request.address, "Address")?,
            city: required(&request.city, "City")?,
            country: required(&request.country, "Country")?,
            contact_email: normalize_email(&request.contact_email)?,
            contact_person: required(&request.contact_person, "Contact person")?,
            phone: optional(request.phone.clone()),
            status: RegistrationStatus::Pending,
            review_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            tenant_id: None,
            hotel_id: None,
            submitted_at: now,
        };
        self.db.transaction(|conn| {
            let store = RegistrationStore::new(conn);
            if store.has_open_for_email(&registration.contact_email)? {
                return Err(Error::Conflict(format!(
                    "A registration for {} is already awaiting review",
                    registration.contact_email
                )));
            }
            store.create(&registration)?;
            info!(registration_id = %registration.id, "Hotel registration submitted");
            Ok(registration)
        })
    }

    fn decide(
        &self,
        conn: &Connection,
        actor: &User,
        id: Uuid,
        next: RegistrationStatus,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<HotelRegistration> {
        let mut registration = self.load(conn, id)?;
        if !registration.status.can_transition_to(next) {
            return Err(Error::invalid_state(format!(
                "Registration cannot move from {} to {}",
                registration.status, next
            )));
        }
        registration.status = next;
        registration.review_notes = optional(notes).or(registration.review_notes);
        registration.reviewed_by = Some(actor.id);
        registration.reviewed_at = Some(now);
        Ok(registration)
    }

    pub fn mark_under_review(
        &self,
        actor: &User,
        id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<HotelRegistration> {
        require(actor, Action::ReviewRegistrations)?;
        self.db.transaction(|conn| {
            let registration =
                self.decide(conn, actor, id, RegistrationStatus::UnderReview, notes, now)?;
            RegistrationStore::new(conn).update(&registration)?;
            Ok(registration)
        })
    }

    #[instrument(skip(self, actor, notes))]
    pub fn approve(
        &self,
        actor: &User,
        id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RegistrationApproval> {
        require(actor, Action::ReviewRegistrations)?;
        let password = temporary_password();
        let password_hash = hash_password(&password)?;

        self.db.transaction(|conn| {
            let mut registration =
                self.decide(conn, actor, id, RegistrationStatus::Approved, notes, now)?;
            let users = UserStore::new(conn);
            if users.email_taken(&registration.contact_email, None)? {
                return Err(Error::Conflict(format!(
                    "{} already has an account",
                    registration.contact_email
                )));
            }

            let tenant = Tenant::new(
                registration.hotel_name.clone(),
                unique_subdomain(conn, &registration.hotel_name)?,
            );
            TenantStore::new(conn).create(&tenant)?;

            let mut hotel = Hotel::new(
                tenant.id,
                registration.hotel_name.clone(),
                registration.address.clone(),
                registration.city.clone(),
                registration.country.clone(),
            );
            hotel.description = registration.description.clone();
            hotel.phone = registration.phone.clone();
            hotel.email = Some(registration.contact_email.clone());
            HotelStore::new(conn).create(&hotel)?;

            let (first_name, last_name) = split_name(&registration.contact_person);
            let mut admin = User::new(
                registration.contact_email.clone(),
                password_hash.clone(),
                first_name,
                last_name,
                UserRole::HotelAdmin,
            );
            admin.tenant_id = Some(tenant.id);
            admin.hotel_id = Some(hotel.id);
            admin.phone = registration.phone.clone();
            users.create(&admin)?;

            registration.tenant_id = Some(tenant.id);
            registration.hotel_id = Some(hotel.id);
            RegistrationStore::new(conn).update(&registration)?;
            info!(
                registration_id = %registration.id,
                tenant = %tenant.subdomain,
                admin = %admin.email,
                "Hotel registration approved"
            );
            Ok(RegistrationApproval {
                registration,
                tenant,
                hotel,
                admin,
                temporary_password: password.clone(),
            })
        })
    }

    pub fn reject(
        &self,
        actor: &User,
        id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<HotelRegistration> {
        require(actor, Action::ReviewRegistrations)?;
        let reason = required(reason, "Rejection reason")?;
        self.db.transaction(|conn| {
            let registration =
                self.decide(conn, actor, id, RegistrationStatus::Rejected, Some(reason), now)?;
            RegistrationStore::new(conn).update(&registration)?;
            info!(registration_id = %registration.id, "Hotel registration rejected");
            Ok(registration)
        })
    }

    pub fn find(&self, actor: &User, id: Uuid) -> Result<HotelRegistration> {
        require(actor, Action::ReviewRegistrations)?;
        self.load(self.db.connection(), id)
    }

    pub fn list(
        &self,
        actor: &User,
        status: Option<RegistrationStatus>,
        page: PageRequest,
    ) -> Result<Page<HotelRegistration>> {
        require(actor, Action::ReviewRegistrations)?;
        self.db.registrations().list(status, page)
    }

    pub fn statistics(&self, actor: &User) -> Result<RegistrationStatistics> {
        require(actor, Action::ReviewRegistrations)?;
        self.db.registrations().statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::verify_password;
    use crate::scope::TenantScope;
    use crate::services::testing::World;

    fn request(email: &str) -> NewRegistration {
        NewRegistration {
            hotel_name: "Blue Nile Falls Lodge".into(),
            description: Some("Near the falls".into()),
            address: "Tis Abay".into(),
            city: "Bahir Dar".into(),
            country: "Ethiopia".into(),
            contact_email: email.into(),
            contact_person: "Almaz Tadesse Worku".into(),
            phone: None,
        }
    }

    #[test]
    fn test_helpers() {
        assert_eq!(split_name("Almaz Tadesse Worku"), ("Almaz".into(), "Tadesse Worku".into()));
        assert_eq!(split_name("Cher"), ("Cher".into(), "Admin".into()));

        let db = Database::open_in_memory().unwrap();
        db.transaction(|conn| {
            assert_eq!(unique_subdomain(conn, "Ras Hotel & Spa!")?, "ras-hotel-spa");
            assert_eq!(unique_subdomain(conn, "Ü")?, "hotel");
            TenantStore::new(conn).create(&Tenant::new("Ras".into(), "ras-hotel-spa".into()))?;
            assert_eq!(unique_subdomain(conn, "Ras Hotel & Spa")?, "ras-hotel-spa-2");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_approval_provisions_tenant_hotel_and_admin() {
        let world = World::new();
        let admin = world.admin();
        let service = RegistrationService::new(&world.db);
        let now = Utc::now();

        let registration = service.submit(&request("Almaz@Falls.test"), now).unwrap();
        assert_eq!(registration.contact_email, "almaz@falls.test");
        assert!(matches!(
            service.submit(&request("almaz@falls.test"), now),
            Err(Error::Conflict(_))
        ));

        service
            .mark_under_review(&admin, registration.id, Some("Checking licence".into()), now)
            .unwrap();
        let approval = service.approve(&admin, registration.id, None, now).unwrap();
        assert_eq!(approval.registration.status, RegistrationStatus::Approved);
        assert_eq!(approval.registration.review_notes.as_deref(), Some("Checking licence"));
        assert_eq!(approval.tenant.subdomain, "blue-nile-falls-lodge");
        assert_eq!(approval.hotel.tenant_id, approval.tenant.id);
        assert!(approval.admin.has_role(UserRole::HotelAdmin));
        assert_eq!(approval.admin.hotel_id, Some(approval.hotel.id));

        let stored = world.db.users().find_by_email("almaz@falls.test").unwrap().unwrap();
        assert!(verify_password(&approval.temporary_password, &stored.password_hash).unwrap());
        assert!(world
            .db
            .hotels()
            .find_by_id(TenantScope::Tenant(approval.tenant.id), approval.hotel.id)
            .unwrap()
            .is_some());

        assert!(matches!(
            service.reject(&admin, registration.id, "Too late", now),
            Err(Error::InvalidState(_))
        ));
        // a decided registration frees the email for a new submission
        service.submit(&request("almaz@falls.test"), now).unwrap();
    }

    #[test]
    fn test_rejection_and_permissions() {
        let world = World::new();
        let admin = world.admin();
        let owner = world.staff(UserRole::HotelAdmin);
        let service = RegistrationService::new(&world.db);
        let now = Utc::now();

        let registration = service.submit(&request("owner@rift.test"), now).unwrap();
        assert!(matches!(
            service.approve(&owner, registration.id, None, now),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            service.reject(&admin, registration.id, "  ", now),
            Err(Error::Validation(_))
        ));
        let rejected =
            service.reject(&admin, registration.id, "Incomplete documents", now).unwrap();
        assert_eq!(rejected.status, RegistrationStatus::Rejected);

        let stats = service.statistics(&admin).unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.rejected, 1);
        let pending = service
            .list(&admin, Some(RegistrationStatus::Pending), PageRequest::default())
            .unwrap();
        assert_eq!(pending.total_elements, 0);

        let mut bad = request("someone@rift.test");
        bad.hotel_name = " ".into();
        assert!(matches!(service.submit(&bad, now), Err(Error::Validation(_))));
    }
}

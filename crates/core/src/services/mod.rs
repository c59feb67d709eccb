//! Application services
//!
//! Each service borrows the [`Database`], checks the acting user against
//! the permission matrix and their tenant scope, and runs multi-step
//! changes inside a single transaction. Callers pass the current date or
//! time explicitly.

mod accounts;
mod admin;
mod booking;
mod charges;
mod front_desk;
mod hotel_admin;
mod housekeeping;
mod maintenance;
mod registrations;
mod shop;

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Hotel, User, UserRole};
use crate::permissions::{Action, PermissionMatrix};
use crate::scope::TenantScope;
use crate::storage::{HotelStore, ReservationStore, RoomStore};

pub use accounts::{AccountService, NewCustomer, RegisterRequest};
pub use admin::{AdminService, HotelInput, NewUser, PlatformStatistics, TenantInput, UserUpdate};
pub use booking::{
    room_type_availability, BookingModification, BookingRequest, BookingService, CancellationResult,
    GuestDetails, ModificationResult, RoomTypeBookingRequest,
};
pub use charges::{ChargeService, NewRoomCharge};
pub use front_desk::{CheckoutSummary, FrontDeskService, FrontDeskStats};
pub use hotel_admin::{
    HotelAdminService, NewStaff, ProductInput, PromoInput, RoomInput, SeasonInput, StrategyInput,
};
pub use housekeeping::{HousekeepingService, NewHousekeepingTask};
pub use maintenance::{MaintenanceService, NewMaintenanceTask};
pub use registrations::{NewRegistration, RegistrationApproval, RegistrationService};
pub use shop::{NewShopOrder, OrderLine, ShopService};

/// Fail with `PermissionDenied` unless one of the actor's roles grants `action`
pub(crate) fn require(actor: &User, action: Action) -> Result<()> {
    if PermissionMatrix::allows(actor, action) {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "{action:?} is not allowed for {}",
            actor.email
        )))
    }
}

/// Staff tied to one hotel only work there; tenant and system admins span hotels
pub(crate) fn works_at(actor: &User, hotel_id: Uuid) -> bool {
    actor.is_system_admin()
        || actor.has_role(UserRole::HotelAdmin)
        || actor.hotel_id.map_or(true, |id| id == hotel_id)
}

/// Load the hotel `actor` wants to act on. Hotels outside the actor's
/// tenant or assigned hotel read as missing.
pub(crate) fn staff_hotel(
    conn: &Connection,
    actor: &User,
    action: Action,
    hotel_id: Uuid,
) -> Result<Hotel> {
    require(actor, action)?;
    let scope = TenantScope::for_user(actor)?;
    HotelStore::new(conn)
        .find_by_id(scope, hotel_id)?
        .filter(|hotel| works_at(actor, hotel.id))
        .ok_or_else(|| Error::not_found("Hotel", hotel_id))
}

/// Share of the hotel's rooms held for the night of `date`
pub(crate) fn occupancy_rate(
    conn: &Connection,
    hotel_id: Uuid,
    date: NaiveDate,
) -> Result<Decimal> {
    let total = RoomStore::new(conn).count_by_hotel(hotel_id)?;
    if total == 0 {
        return Ok(Decimal::ZERO);
    }
    let held = ReservationStore::new(conn).rooms_held_on(hotel_id, date)?;
    Ok((Decimal::from(held) / Decimal::from(total)).round_dp(4))
}

/// Trimmed non-empty text
pub(crate) fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Blank optional text becomes `None`
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(Error::validation(format!("Invalid email address: {email}")));
    }
    Ok(email)
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::models::{Hotel, Room, RoomType, Tenant, User, UserRole};
    use crate::storage::Database;

    pub fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, m, d).unwrap()
    }

    /// The "current" day used by service tests
    pub fn today() -> NaiveDate {
        date(3, 1)
    }

    /// One tenant with one hotel holding a standard room and a suite
    pub struct World {
        pub db: Database,
        pub tenant: Tenant,
        pub hotel: Hotel,
        pub room: Room,
        pub suite: Room,
    }

    impl World {
        pub fn new() -> Self {
            let db = Database::open_in_memory().unwrap();
            let tenant = Tenant::new("Blue Nile Group".into(), "bluenile".into());
            db.tenants().create(&tenant).unwrap();
            let hotel = Hotel::new(
                tenant.id,
                "Lakeside Resort".into(),
                "1 Shore Rd".into(),
                "Bahir Dar".into(),
                "Ethiopia".into(),
            );
            db.hotels().create(&hotel).unwrap();
            let room =
                Room::new(tenant.id, hotel.id, "101".into(), RoomType::Standard, dec!(100), 2);
            db.rooms().create(&room).unwrap();
            let suite = Room::new(tenant.id, hotel.id, "301".into(), RoomType::Suite, dec!(250), 4);
            db.rooms().create(&suite).unwrap();
            Self {
                db,
                tenant,
                hotel,
                room,
                suite,
            }
        }

        /// Stored staff member of this hotel
        pub fn staff(&self, role: UserRole) -> User {
            let mut user = User::new(
                format!(
                    "{}-{}@lakeside.test",
                    role.as_str().to_lowercase(),
                    Uuid::new_v4().simple()
                ),
                "unused".into(),
                "Staff".into(),
                role.display_name().into(),
                role,
            );
            user.tenant_id = Some(self.tenant.id);
            user.hotel_id = Some(self.hotel.id);
            self.db.users().create(&user).unwrap();
            user
        }

        pub fn admin(&self) -> User {
            let user = User::new(
                format!("admin-{}@staybook.test", Uuid::new_v4().simple()),
                "unused".into(),
                "System".into(),
                "Admin".into(),
                UserRole::Admin,
            );
            self.db.users().create(&user).unwrap();
            user
        }

        pub fn customer(&self, email: &str) -> User {
            let user = User::new(
                email.into(),
                "unused".into(),
                "Liya".into(),
                "Haile".into(),
                UserRole::Customer,
            );
            self.db.users().create(&user).unwrap();
            user
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::World;
    use super::*;

    #[test]
    fn test_staff_hotel_hides_other_tenants_and_hotels() {
        let world = World::new();
        let desk = world.staff(UserRole::Frontdesk);
        let conn_result = world.db.transaction(|conn| {
            staff_hotel(conn, &desk, Action::ManageBookings, world.hotel.id)?;
            let missing = staff_hotel(conn, &desk, Action::ManageBookings, Uuid::new_v4());
            assert!(matches!(missing, Err(Error::NotFound(_))));
            let denied = staff_hotel(conn, &desk, Action::ManageRooms, world.hotel.id);
            assert!(matches!(denied, Err(Error::PermissionDenied(_))));
            Ok(())
        });
        conn_result.unwrap();

        let mut elsewhere = desk.clone();
        elsewhere.hotel_id = Some(Uuid::new_v4());
        assert!(!works_at(&elsewhere, world.hotel.id));
        elsewhere.roles.insert(UserRole::HotelAdmin);
        assert!(works_at(&elsewhere, world.hotel.id));
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(required("  Lakeside ", "Name").unwrap(), "Lakeside");
        assert!(matches!(required("   ", "Name"), Err(Error::Validation(_))));
        assert_eq!(optional(Some("  ".into())), None);
        assert_eq!(normalize_email(" Guest@Example.COM ").unwrap(), "guest@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("a@localhost").is_err());
    }
}

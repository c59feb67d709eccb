//! SQLite storage layer for Staybook

mod booking_history;
mod hotels;
mod housekeeping;
mod maintenance;
mod migrations;
mod parse;
mod pricing;
mod products;
mod registrations;
mod reservations;
mod room_charges;
mod rooms;
mod shop_orders;
mod tenants;
mod traits;
mod users;

use std::path::Path;

use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::availability::StayDates;
use crate::credentials;
use crate::error::Result;
use crate::models::{Reservation, Room, RoomType, User, UserRole};
use crate::scope::TenantScope;

pub use booking_history::BookingHistoryStore;
pub use hotels::{HotelFilter, HotelStore};
pub use housekeeping::HousekeepingStore;
pub use maintenance::MaintenanceStore;
pub use pricing::PricingStore;
pub use products::ProductStore;
pub use registrations::RegistrationStore;
pub use reservations::{ReservationFilter, ReservationStore};
pub use room_charges::RoomChargeStore;
pub use rooms::{RoomFilter, RoomStore};
pub use shop_orders::ShopOrderStore;
pub use tenants::TenantStore;
pub use traits::{InventoryRepository, ReservationRepository, Storage, UserRepository};
pub use users::{UserFilter, UserStore};

/// Run `f` inside a transaction, or inside the caller's if one is open
pub(crate) fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    if !conn.is_autocommit() {
        return f(conn);
    }
    let tx = conn.unchecked_transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Raw connection for one-off reads outside a store
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> Result<u32> {
        migrations::current_version(&self.conn)
    }

    /// Run `f` atomically; stores built from the passed connection share
    /// the transaction
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        in_transaction(&self.conn, f)
    }

    /// Create the first system administrator unless one exists.
    /// Returns whether an account was created.
    #[instrument(skip(self, password))]
    pub fn seed_admin(&self, email: &str, password: &str) -> Result<bool> {
        if self.users().count_with_role(UserRole::Admin)? > 0 {
            return Ok(false);
        }
        let hash = credentials::hash_password(password)?;
        let admin = User::new(
            email.to_string(),
            hash,
            "System".into(),
            "Administrator".into(),
            UserRole::Admin,
        );
        self.users().create(&admin)?;
        info!(email = %admin.email, "Seeded system administrator");
        Ok(true)
    }

    pub fn tenants(&self) -> TenantStore<'_> {
        TenantStore::new(&self.conn)
    }

    pub fn hotels(&self) -> HotelStore<'_> {
        HotelStore::new(&self.conn)
    }

    pub fn rooms(&self) -> RoomStore<'_> {
        RoomStore::new(&self.conn)
    }

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    pub fn reservations(&self) -> ReservationStore<'_> {
        ReservationStore::new(&self.conn)
    }

    pub fn products(&self) -> ProductStore<'_> {
        ProductStore::new(&self.conn)
    }

    pub fn shop_orders(&self) -> ShopOrderStore<'_> {
        ShopOrderStore::new(&self.conn)
    }

    pub fn housekeeping(&self) -> HousekeepingStore<'_> {
        HousekeepingStore::new(&self.conn)
    }

    pub fn maintenance(&self) -> MaintenanceStore<'_> {
        MaintenanceStore::new(&self.conn)
    }

    pub fn room_charges(&self) -> RoomChargeStore<'_> {
        RoomChargeStore::new(&self.conn)
    }

    pub fn pricing(&self) -> PricingStore<'_> {
        PricingStore::new(&self.conn)
    }

    pub fn registrations(&self) -> RegistrationStore<'_> {
        RegistrationStore::new(&self.conn)
    }

    pub fn booking_history(&self) -> BookingHistoryStore<'_> {
        BookingHistoryStore::new(&self.conn)
    }
}

impl UserRepository for Database {
    fn create_user(&self, user: &User) -> Result<()> {
        self.users().create(user)
    }

    fn find_user_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<User>> {
        self.users().find_by_id(scope, id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users().find_by_email(email)
    }

    fn record_login(&self, user_id: Uuid) -> Result<()> {
        self.users().update_last_login(user_id)
    }
}

impl InventoryRepository for Database {
    fn find_room(&self, scope: TenantScope, id: Uuid) -> Result<Option<Room>> {
        self.rooms().find_by_id(scope, id)
    }

    fn hotel_rooms(&self, hotel_id: Uuid, filter: RoomFilter) -> Result<Vec<Room>> {
        self.rooms().list_by_hotel(hotel_id, filter)
    }

    fn free_rooms(
        &self,
        hotel_id: Uuid,
        stay: &StayDates,
        guests: u32,
        room_type: Option<RoomType>,
    ) -> Result<Vec<Room>> {
        self.rooms().find_available(hotel_id, stay, guests, room_type)
    }
}

impl ReservationRepository for Database {
    fn find_reservation(&self, scope: TenantScope, id: Uuid) -> Result<Option<Reservation>> {
        self.reservations().find_by_id(scope, id)
    }

    fn find_reservation_by_confirmation(&self, number: &str) -> Result<Option<Reservation>> {
        self.reservations().find_by_confirmation(number)
    }

    fn room_has_overlap(
        &self,
        room_id: Uuid,
        stay: &StayDates,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        self.reservations().has_overlap(room_id, stay, exclude)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::Error;
    use crate::models::{Hotel, Page, PageRequest, ReservationStatus, RoomStatus, Tenant};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, m, d).unwrap()
    }

    struct Fixture {
        db: Database,
        tenant: Tenant,
        hotel: Hotel,
        room: Room,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let tenant = Tenant::new("Blue Nile Group".into(), "bluenile".into());
        db.tenants().create(&tenant).unwrap();
        let hotel = Hotel::new(
            tenant.id,
            "Lakeside".into(),
            "1 Shore Rd".into(),
            "Bahir Dar".into(),
            "Ethiopia".into(),
        );
        db.hotels().create(&hotel).unwrap();
        let room = Room::new(tenant.id, hotel.id, "101".into(), RoomType::Standard, dec!(80), 2);
        db.rooms().create(&room).unwrap();
        Fixture { db, tenant, hotel, room }
    }

    fn reservation(f: &Fixture, check_in: NaiveDate, check_out: NaiveDate) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: Uuid::new_v4(),
            tenant_id: f.tenant.id,
            hotel_id: f.hotel.id,
            room_id: f.room.id,
            guest_id: None,
            guest_name: "Sara Tesfaye".into(),
            guest_email: "sara@example.com".into(),
            guest_phone: None,
            confirmation_number: String::new(),
            check_in,
            check_out,
            guests: 2,
            total_amount: dec!(160),
            status: ReservationStatus::Confirmed,
            promo_code: None,
            special_requests: None,
            payment_method: None,
            cancellation_reason: None,
            cancelled_at: None,
            actual_check_in: None,
            actual_check_out: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staybook.db");
        {
            let db = Database::open(&path).unwrap();
            let tenant = Tenant::new("Disk".into(), "disk".into());
            db.tenants().create(&tenant).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.tenants().statistics().unwrap().total_tenants, 1);
        assert!(db.schema_version().unwrap() >= 4);
    }

    #[test]
    fn test_confirmation_numbers_follow_insert_order() {
        let f = fixture();
        let mut first = reservation(&f, date(3, 1), date(3, 3));
        let mut second = reservation(&f, date(3, 3), date(3, 5));
        f.db.reservations().create_if_free(&mut first).unwrap();
        f.db.reservations().create_if_free(&mut second).unwrap();

        assert_eq!(first.confirmation_number, "BK00000001");
        assert_eq!(second.confirmation_number, "BK00000002");
        let found = f.db.reservations().find_by_confirmation("bk00000002").unwrap().unwrap();
        assert_eq!(found.id, second.id);
    }

    #[test]
    fn test_overlapping_insert_is_refused() {
        let f = fixture();
        let mut first = reservation(&f, date(3, 1), date(3, 5));
        f.db.reservations().create_if_free(&mut first).unwrap();

        let mut clash = reservation(&f, date(3, 4), date(3, 6));
        let err = f.db.reservations().create_if_free(&mut clash).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Back-to-back is fine
        let mut next = reservation(&f, date(3, 5), date(3, 6));
        f.db.reservations().create_if_free(&mut next).unwrap();
    }

    #[test]
    fn test_cancelled_reservation_releases_room() {
        let f = fixture();
        let mut first = reservation(&f, date(4, 1), date(4, 4));
        f.db.reservations().create_if_free(&mut first).unwrap();
        let stay = first.stay();
        assert!(f.db.room_has_overlap(f.room.id, &stay, None).unwrap());
        assert!(!f.db.room_has_overlap(f.room.id, &stay, Some(first.id)).unwrap());

        first.transition_to(ReservationStatus::Cancelled).unwrap();
        first.cancelled_at = Some(Utc::now());
        f.db.reservations().update(&mut first).unwrap();
        assert_eq!(first.version, 1);
        assert!(!f.db.room_has_overlap(f.room.id, &stay, None).unwrap());

        let free = f.db.free_rooms(f.hotel.id, &stay, 2, None).unwrap();
        assert_eq!(free.len(), 1);
    }

    #[test]
    fn test_stale_update_conflicts() {
        let f = fixture();
        let mut res = reservation(&f, date(5, 1), date(5, 2));
        f.db.reservations().create_if_free(&mut res).unwrap();

        let mut stale = res.clone();
        res.special_requests = Some("Late arrival".into());
        f.db.reservations().update(&mut res).unwrap();

        stale.guests = 1;
        assert!(matches!(f.db.reservations().update(&mut stale), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_free_rooms_respect_capacity_and_status() {
        let f = fixture();
        let mut suite =
            Room::new(f.tenant.id, f.hotel.id, "201".into(), RoomType::Suite, dec!(200), 4);
        f.db.rooms().create(&suite).unwrap();
        let stay = StayDates::new(date(6, 1), date(6, 3)).unwrap();

        let free = f.db.free_rooms(f.hotel.id, &stay, 3, None).unwrap();
        assert_eq!(free.iter().map(|r| r.room_number.as_str()).collect::<Vec<_>>(), ["201"]);

        suite.status = RoomStatus::OutOfOrder;
        f.db.rooms().update(&suite).unwrap();
        assert!(f.db.free_rooms(f.hotel.id, &stay, 3, None).unwrap().is_empty());
        assert_eq!(f.db.rooms().status_counts(f.hotel.id).unwrap().out_of_order, 1);
    }

    #[test]
    fn test_tenant_scope_hides_other_tenants() {
        let f = fixture();
        let other = TenantScope::Tenant(Uuid::new_v4());
        assert!(f.db.hotels().find_by_id(other, f.hotel.id).unwrap().is_none());
        assert!(f.db.find_room(other, f.room.id).unwrap().is_none());
        assert!(f.db.find_room(TenantScope::Tenant(f.tenant.id), f.room.id).unwrap().is_some());

        let page: Page<Hotel> = f
            .db
            .hotels()
            .list(other, &HotelFilter::default(), PageRequest::default())
            .unwrap();
        assert_eq!(page.total_elements, 0);
    }

    #[test]
    fn test_user_roles_round_trip() {
        let f = fixture();
        let mut user = User::new(
            "desk@lakeside.et".into(),
            "hash".into(),
            "Desk".into(),
            "Clerk".into(),
            UserRole::Frontdesk,
        );
        user.tenant_id = Some(f.tenant.id);
        user.hotel_id = Some(f.hotel.id);
        f.db.create_user(&user).unwrap();

        user.roles.insert(UserRole::Housekeeping);
        f.db.users().update(&user).unwrap();

        let loaded = f.db.find_user_by_email("DESK@lakeside.et").unwrap().unwrap();
        assert!(loaded.has_role(UserRole::Frontdesk));
        assert!(loaded.has_role(UserRole::Housekeeping));
        assert_eq!(
            f.db.users().list_by_role(UserRole::Housekeeping, Some(f.hotel.id)).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_seed_admin_once() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.seed_admin("admin@staybook.local", "change-me-now").unwrap());
        assert!(!db.seed_admin("other@staybook.local", "change-me-now").unwrap());
        let admin = db.find_user_by_email("admin@staybook.local").unwrap().unwrap();
        assert!(admin.is_system_admin());
        assert!(credentials::verify_password("change-me-now", &admin.password_hash).unwrap());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let f = fixture();
        let result: Result<()> = f.db.transaction(|conn| {
            let mut res = reservation(&f, date(7, 1), date(7, 3));
            ReservationStore::new(conn).create_if_free(&mut res)?;
            Err(crate::Error::validation("abort"))
        });
        assert!(result.is_err());
        let stay = StayDates::new(date(7, 1), date(7, 3)).unwrap();
        assert!(!f.db.room_has_overlap(f.room.id, &stay, None).unwrap());
    }
}

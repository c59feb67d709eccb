//! Storage repository traits
//!
//! The read paths shared by authentication and availability lookups,
//! so they can run against SQLite or a test double.

use uuid::Uuid;

use crate::availability::StayDates;
use crate::error::Result;
use crate::models::{Reservation, Room, RoomType, User};
use crate::scope::TenantScope;
use crate::storage::RoomFilter;

/// User account lookups
pub trait UserRepository {
    fn create_user(&self, user: &User) -> Result<()>;

    fn find_user_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<User>>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn record_login(&self, user_id: Uuid) -> Result<()>;
}

/// Room inventory lookups
pub trait InventoryRepository {
    fn find_room(&self, scope: TenantScope, id: Uuid) -> Result<Option<Room>>;

    fn hotel_rooms(&self, hotel_id: Uuid, filter: RoomFilter) -> Result<Vec<Room>>;

    /// Bookable rooms free for every night of `stay`
    fn free_rooms(
        &self,
        hotel_id: Uuid,
        stay: &StayDates,
        guests: u32,
        room_type: Option<RoomType>,
    ) -> Result<Vec<Room>>;
}

/// Reservation lookups
pub trait ReservationRepository {
    fn find_reservation(&self, scope: TenantScope, id: Uuid) -> Result<Option<Reservation>>;

    fn find_reservation_by_confirmation(&self, number: &str) -> Result<Option<Reservation>>;

    fn room_has_overlap(
        &self,
        room_id: Uuid,
        stay: &StayDates,
        exclude: Option<Uuid>,
    ) -> Result<bool>;
}

/// Combined storage interface
pub trait Storage: UserRepository + InventoryRepository + ReservationRepository {}

impl<T> Storage for T where T: UserRepository + InventoryRepository + ReservationRepository {}

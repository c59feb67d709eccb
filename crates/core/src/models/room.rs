//! Room model and room state

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    /// Room categories offered by a hotel
    pub enum RoomType {
        Standard => "STANDARD",
        Deluxe => "DELUXE",
        Suite => "SUITE",
        Family => "FAMILY",
        Presidential => "PRESIDENTIAL",
    }
}

string_enum! {
    /// Physical state of a room
    pub enum RoomStatus {
        Available => "AVAILABLE",
        Occupied => "OCCUPIED",
        /// Needs cleaning or repair before the next guest
        Maintenance => "MAINTENANCE",
        OutOfOrder => "OUT_OF_ORDER",
    }
}

impl RoomStatus {
    /// States that take a room out of service
    pub fn is_out_of_service(&self) -> bool {
        matches!(self, RoomStatus::Maintenance | RoomStatus::OutOfOrder)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub hotel_id: Uuid,
    pub room_number: String,
    pub room_type: RoomType,
    pub status: RoomStatus,
    pub price_per_night: Decimal,
    pub capacity: u32,
    pub description: Option<String>,
    /// Manual bookable flag, independent of `status`
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(
        tenant_id: Uuid,
        hotel_id: Uuid,
        room_number: String,
        room_type: RoomType,
        price_per_night: Decimal,
        capacity: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            hotel_id,
            room_number,
            room_type,
            status: RoomStatus::Available,
            price_per_night,
            capacity,
            description: None,
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the room can take new bookings at all
    pub fn is_bookable(&self) -> bool {
        self.is_available && self.status == RoomStatus::Available
    }

    pub fn fits(&self, guests: u32) -> bool {
        self.capacity >= guests
    }
}

/// Free inventory for one room type over a stay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomTypeAvailability {
    pub room_type: RoomType,
    pub available_rooms: u32,
    pub total_rooms: u32,
    pub min_price: Option<Decimal>,
    pub max_capacity: u32,
}

/// Room counts per status for one hotel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStatusCounts {
    pub available: u64,
    pub occupied: u64,
    pub maintenance: u64,
    pub out_of_order: u64,
}

impl RoomStatusCounts {
    pub fn total(&self) -> u64 {
        self.available + self.occupied + self.maintenance + self.out_of_order
    }

    pub fn add(&mut self, status: RoomStatus, count: u64) {
        match status {
            RoomStatus::Available => self.available += count,
            RoomStatus::Occupied => self.occupied += count,
            RoomStatus::Maintenance => self.maintenance += count,
            RoomStatus::OutOfOrder => self.out_of_order += count,
        }
    }
}

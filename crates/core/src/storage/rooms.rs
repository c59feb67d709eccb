//! Room storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{date_param, parse_datetime, parse_decimal, parse_enum, parse_uuid, OptionalExt};
use super::reservations::BLOCKING_STATUSES;
use crate::availability::StayDates;
use crate::error::Result;
use crate::models::{Room, RoomStatus, RoomStatusCounts, RoomType};
use crate::scope::TenantScope;

const COLUMNS: &str = "r.id, r.tenant_id, r.hotel_id, r.room_number, r.room_type, r.status, \
                       r.price_per_night, r.capacity, r.description, r.is_available, r.created_at, \
                       r.updated_at";

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(&row.get::<_, String>(1)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(2)?)?,
        room_number: row.get(3)?,
        room_type: parse_enum(&row.get::<_, String>(4)?, "room type", RoomType::from_str)?,
        status: parse_enum(&row.get::<_, String>(5)?, "room status", RoomStatus::from_str)?,
        price_per_night: parse_decimal(&row.get::<_, String>(6)?)?,
        capacity: row.get(7)?,
        description: row.get(8)?,
        is_available: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(11)?)?,
    })
}

/// Optional filters for a hotel's room list
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomFilter {
    pub status: Option<RoomStatus>,
    pub room_type: Option<RoomType>,
}

pub struct RoomStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoomStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(
        skip(self, room),
        fields(hotel_id = %room.hotel_id, room_number = %room.room_number)
    )]
    pub fn create(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rooms (id, tenant_id, hotel_id, room_number, room_type, status,
                price_per_night, capacity, description, is_available, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                room.id.to_string(),
                room.tenant_id.to_string(),
                room.hotel_id.to_string(),
                room.room_number,
                room.room_type.as_str(),
                room.status.as_str(),
                room.price_per_night.to_string(),
                room.capacity,
                room.description,
                room.is_available,
                room.created_at.to_rfc3339(),
                room.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<Room>> {
        let room = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM rooms r
                     WHERE r.id = ?1 AND (?2 IS NULL OR r.tenant_id = ?2)"
                ),
                params![id.to_string(), scope.param()],
                room_from_row,
            )
            .optional()?;
        Ok(room)
    }

    pub fn number_taken(
        &self,
        hotel_id: Uuid,
        room_number: &str,
        except: Option<Uuid>,
    ) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM rooms
             WHERE hotel_id = ?1 AND room_number = ?2 AND (?3 IS NULL OR id != ?3)",
            params![hotel_id.to_string(), room_number, except.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self, room), fields(room_id = %room.id))]
    pub fn update(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "UPDATE rooms SET room_number = ?1, room_type = ?2, status = ?3, price_per_night = ?4,
                capacity = ?5, description = ?6, is_available = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                room.room_number,
                room.room_type.as_str(),
                room.status.as_str(),
                room.price_per_night.to_string(),
                room.capacity,
                room.description,
                room.is_available,
                Utc::now().to_rfc3339(),
                room.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn set_status(&self, id: Uuid, status: RoomStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE rooms SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn set_available(&self, id: Uuid, available: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE rooms SET is_available = ?1, updated_at = ?2 WHERE id = ?3",
            params![available, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.conn
            .execute("DELETE FROM rooms WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    pub fn list_by_hotel(&self, hotel_id: Uuid, filter: RoomFilter) -> Result<Vec<Room>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM rooms r
             WHERE r.hotel_id = ?1
               AND (?2 IS NULL OR r.status = ?2)
               AND (?3 IS NULL OR r.room_type = ?3)
             ORDER BY r.room_number"
        ))?;
        let rooms = stmt
            .query_map(
                params![
                    hotel_id.to_string(),
                    filter.status.map(|s| s.as_str()),
                    filter.room_type.map(|t| t.as_str()),
                ],
                room_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rooms)
    }

    /// Bookable rooms with no blocking reservation over `stay`, by room number
    #[instrument(skip(self))]
    pub fn find_available(
        &self,
        hotel_id: Uuid,
        stay: &StayDates,
        guests: u32,
        room_type: Option<RoomType>,
    ) -> Result<Vec<Room>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM rooms r
             WHERE r.hotel_id = ?1
               AND r.is_available = 1
               AND r.status = 'AVAILABLE'
               AND r.capacity >= ?4
               AND (?5 IS NULL OR r.room_type = ?5)
               AND NOT EXISTS (
                   SELECT 1 FROM reservations res
                   WHERE res.room_id = r.id
                     AND res.status IN {BLOCKING_STATUSES}
                     AND res.check_in < ?3
                     AND res.check_out > ?2
               )
             ORDER BY r.room_number"
        ))?;
        let rooms = stmt
            .query_map(
                params![
                    hotel_id.to_string(),
                    date_param(stay.check_in()),
                    date_param(stay.check_out()),
                    guests,
                    room_type.map(|t| t.as_str()),
                ],
                room_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rooms)
    }

    pub fn status_counts(&self, hotel_id: Uuid) -> Result<RoomStatusCounts> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM rooms WHERE hotel_id = ?1 GROUP BY status")?;
        let rows = stmt
            .query_map(params![hotel_id.to_string()], |row| {
                let status =
                    parse_enum(&row.get::<_, String>(0)?, "room status", RoomStatus::from_str)?;
                Ok((status, row.get::<_, u64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut counts = RoomStatusCounts::default();
        for (status, count) in rows {
            counts.add(status, count);
        }
        Ok(counts)
    }

    pub fn count_by_hotel(&self, hotel_id: Uuid) -> Result<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM rooms WHERE hotel_id = ?1",
            params![hotel_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

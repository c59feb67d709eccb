//! Hotel storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{Hotel, HotelStatistics, Page, PageRequest};
use crate::scope::TenantScope;

const COLUMNS: &str = "id, tenant_id, name, description, address, city, country, phone, email, \
                       is_active, created_at, updated_at";

fn hotel_from_row(row: &Row<'_>) -> rusqlite::Result<Hotel> {
    Ok(Hotel {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(&row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        description: row.get(3)?,
        address: row.get(4)?,
        city: row.get(5)?,
        country: row.get(6)?,
        phone: row.get(7)?,
        email: row.get(8)?,
        is_active: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(11)?)?,
    })
}

/// Filters for hotel listings
#[derive(Debug, Clone, Default)]
pub struct HotelFilter {
    /// Matched against name, city and country
    pub query: Option<String>,
    pub city: Option<String>,
    pub active_only: bool,
}

pub struct HotelStore<'a> {
    conn: &'a Connection,
}

impl<'a> HotelStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, hotel), fields(hotel = %hotel.name))]
    pub fn create(&self, hotel: &Hotel) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO hotels ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                hotel.id.to_string(),
                hotel.tenant_id.to_string(),
                hotel.name,
                hotel.description,
                hotel.address,
                hotel.city,
                hotel.country,
                hotel.phone,
                hotel.email,
                hotel.is_active,
                hotel.created_at.to_rfc3339(),
                hotel.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find a hotel visible in `scope`
    #[instrument(skip(self))]
    pub fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<Hotel>> {
        let hotel = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM hotels WHERE id = ?1 AND (?2 IS NULL OR tenant_id = ?2)"
                ),
                params![id.to_string(), scope.param()],
                hotel_from_row,
            )
            .optional()?;
        Ok(hotel)
    }

    #[instrument(skip(self, hotel), fields(hotel_id = %hotel.id))]
    pub fn update(&self, hotel: &Hotel) -> Result<()> {
        self.conn.execute(
            "UPDATE hotels SET name = ?1, description = ?2, address = ?3, city = ?4, country = ?5,
                phone = ?6, email = ?7, is_active = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                hotel.name,
                hotel.description,
                hotel.address,
                hotel.city,
                hotel.country,
                hotel.phone,
                hotel.email,
                hotel.is_active,
                Utc::now().to_rfc3339(),
                hotel.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE hotels SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn list(
        &self,
        scope: TenantScope,
        filter: &HotelFilter,
        page: PageRequest,
    ) -> Result<Page<Hotel>> {
        let pattern = filter.query.as_ref().map(|q| format!("%{}%", q.trim()));
        let city = filter.city.as_ref().map(|c| c.trim().to_string());
        let predicate = "(?1 IS NULL OR tenant_id = ?1)
              AND (?2 IS NULL OR name LIKE ?2 OR city LIKE ?2 OR country LIKE ?2)
              AND (?3 IS NULL OR city = ?3 COLLATE NOCASE)
              AND (?4 = 0 OR is_active = 1)";

        let total: u64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM hotels WHERE {predicate}"),
            params![scope.param(), pattern, city, filter.active_only],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM hotels WHERE {predicate} ORDER BY name LIMIT ?5 OFFSET ?6"
        ))?;
        let hotels = stmt
            .query_map(
                params![
                    scope.param(),
                    pattern,
                    city,
                    filter.active_only,
                    page.limit(),
                    page.offset()
                ],
                hotel_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(hotels, page, total))
    }

    pub fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Hotel>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM hotels WHERE tenant_id = ?1 ORDER BY name"
        ))?;
        let hotels = stmt
            .query_map(params![tenant_id.to_string()], hotel_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hotels)
    }

    pub fn statistics(&self, scope: TenantScope) -> Result<HotelStatistics> {
        let (total, active): (u64, u64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM hotels
             WHERE (?1 IS NULL OR tenant_id = ?1)",
            params![scope.param()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let rooms: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM rooms WHERE (?1 IS NULL OR tenant_id = ?1)",
            params![scope.param()],
            |row| row.get(0),
        )?;
        Ok(HotelStatistics {
            total_hotels: total,
            active_hotels: active,
            inactive_hotels: total - active,
            total_rooms: rooms,
        })
    }
}

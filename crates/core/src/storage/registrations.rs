//! Hotel registration storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_datetime_opt, parse_enum, parse_uuid, parse_uuid_opt, OptionalExt,
};
use crate::error::Result;
use crate::models::{
    HotelRegistration, Page, PageRequest, RegistrationStatistics, RegistrationStatus,
};

const COLUMNS: &str = "id, hotel_name, description, address, city, country, contact_email, \
                       contact_person, phone, status, review_notes, reviewed_by, reviewed_at, \
                       tenant_id, hotel_id, submitted_at";

fn registration_from_row(row: &Row<'_>) -> rusqlite::Result<HotelRegistration> {
    Ok(HotelRegistration {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        hotel_name: row.get(1)?,
        description: row.get(2)?,
        address: row.get(3)?,
        city: row.get(4)?,
        country: row.get(5)?,
        contact_email: row.get(6)?,
        contact_person: row.get(7)?,
        phone: row.get(8)?,
        status: parse_enum(
            &row.get::<_, String>(9)?,
            "registration status",
            RegistrationStatus::from_str,
        )?,
        review_notes: row.get(10)?,
        reviewed_by: parse_uuid_opt(row.get(11)?)?,
        reviewed_at: parse_datetime_opt(row.get(12)?)?,
        tenant_id: parse_uuid_opt(row.get(13)?)?,
        hotel_id: parse_uuid_opt(row.get(14)?)?,
        submitted_at: parse_datetime(&row.get::<_, String>(15)?)?,
    })
}

pub struct RegistrationStore<'a> {
    conn: &'a Connection,
}

impl<'a> RegistrationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, registration), fields(hotel_name = %registration.hotel_name))]
    pub fn create(&self, registration: &HotelRegistration) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO hotel_registrations ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            params![
                registration.id.to_string(),
                registration.hotel_name,
                registration.description,
                registration.address,
                registration.city,
                registration.country,
                registration.contact_email,
                registration.contact_person,
                registration.phone,
                registration.status.as_str(),
                registration.review_notes,
                registration.reviewed_by.map(|id| id.to_string()),
                registration.reviewed_at.map(|t| t.to_rfc3339()),
                registration.tenant_id.map(|id| id.to_string()),
                registration.hotel_id.map(|id| id.to_string()),
                registration.submitted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<HotelRegistration>> {
        let registration = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM hotel_registrations WHERE id = ?1"),
                params![id.to_string()],
                registration_from_row,
            )
            .optional()?;
        Ok(registration)
    }

    /// Whether an undecided registration already uses this contact email
    pub fn has_open_for_email(&self, email: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM hotel_registrations
             WHERE contact_email = ?1 COLLATE NOCASE AND status IN ('PENDING', 'UNDER_REVIEW')",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(
        skip(self, registration),
        fields(registration_id = %registration.id, status = %registration.status)
    )]
    pub fn update(&self, registration: &HotelRegistration) -> Result<()> {
        self.conn.execute(
            "UPDATE hotel_registrations SET status = ?1, review_notes = ?2, reviewed_by = ?3,
                reviewed_at = ?4, tenant_id = ?5, hotel_id = ?6
             WHERE id = ?7",
            params![
                registration.status.as_str(),
                registration.review_notes,
                registration.reviewed_by.map(|id| id.to_string()),
                registration.reviewed_at.map(|t| t.to_rfc3339()),
                registration.tenant_id.map(|id| id.to_string()),
                registration.hotel_id.map(|id| id.to_string()),
                registration.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn list(
        &self,
        status: Option<RegistrationStatus>,
        page: PageRequest,
    ) -> Result<Page<HotelRegistration>> {
        let status = status.map(|s| s.as_str());
        let total: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM hotel_registrations WHERE (?1 IS NULL OR status = ?1)",
            params![status],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM hotel_registrations WHERE (?1 IS NULL OR status = ?1)
             ORDER BY submitted_at DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let registrations = stmt
            .query_map(params![status, page.limit(), page.offset()], registration_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(registrations, page, total))
    }

    pub fn statistics(&self) -> Result<RegistrationStatistics> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM hotel_registrations GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| {
                let status = parse_enum(
                    &row.get::<_, String>(0)?,
                    "registration status",
                    RegistrationStatus::from_str,
                )?;
                Ok((status, row.get::<_, u64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stats = RegistrationStatistics::default();
        for (status, count) in rows {
            stats.add(status, count);
        }
        Ok(stats)
    }
}

//! Booking history storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_enum, parse_json_opt, parse_uuid};
use crate::error::Result;
use crate::models::{BookingAction, BookingHistoryEntry};
use crate::scope::TenantScope;

const COLUMNS: &str = "bh.id, bh.reservation_id, bh.hotel_id, bh.action, bh.changed_by, bh.reason, \
                       bh.old_values, bh.new_values, bh.created_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<BookingHistoryEntry> {
    Ok(BookingHistoryEntry {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        reservation_id: parse_uuid(&row.get::<_, String>(1)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(2)?)?,
        action: parse_enum(&row.get::<_, String>(3)?, "booking action", BookingAction::from_str)?,
        changed_by: row.get(4)?,
        reason: row.get(5)?,
        old_values: parse_json_opt(row.get(6)?)?,
        new_values: parse_json_opt(row.get(7)?)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?)?,
    })
}

pub struct BookingHistoryStore<'a> {
    conn: &'a Connection,
}

impl<'a> BookingHistoryStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(
        skip(self, entry),
        fields(reservation_id = %entry.reservation_id, action = %entry.action)
    )]
    pub fn record(&self, entry: &BookingHistoryEntry) -> Result<()> {
        let old_values = entry.old_values.as_ref().map(serde_json::to_string).transpose()?;
        let new_values = entry.new_values.as_ref().map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "INSERT INTO booking_history (id, reservation_id, hotel_id, action, changed_by, reason,
                old_values, new_values, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.id.to_string(),
                entry.reservation_id.to_string(),
                entry.hotel_id.to_string(),
                entry.action.as_str(),
                entry.changed_by,
                entry.reason,
                old_values,
                new_values,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Entries for one reservation in the order they were recorded
    pub fn list_by_reservation(&self, reservation_id: Uuid) -> Result<Vec<BookingHistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM booking_history bh
             WHERE bh.reservation_id = ?1
             ORDER BY bh.rowid"
        ))?;
        let entries = stmt
            .query_map(params![reservation_id.to_string()], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn list_by_confirmation(
        &self,
        scope: TenantScope,
        number: &str,
    ) -> Result<Vec<BookingHistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM booking_history bh
             JOIN reservations res ON res.id = bh.reservation_id
             WHERE res.confirmation_number = ?1 AND (?2 IS NULL OR res.tenant_id = ?2)
             ORDER BY bh.rowid"
        ))?;
        let entries = stmt
            .query_map(params![number.trim().to_uppercase(), scope.param()], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

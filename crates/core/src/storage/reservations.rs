//! Reservation storage operations
//!
//! The overlap predicate lives here: a reservation blocks its room for
//! `[check_in, check_out)` unless it was cancelled or marked no-show.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::in_transaction;
use super::parse::{
    date_param, parse_date, parse_datetime, parse_datetime_opt, parse_decimal, parse_enum,
    parse_uuid, parse_uuid_opt, OptionalExt,
};
use crate::availability::StayDates;
use crate::error::{Error, Result};
use crate::invariants::assert_reservation_invariants;
use crate::models::{confirmation_number, Page, PageRequest, Reservation, ReservationStatus};
use crate::scope::TenantScope;

/// Statuses that hold a room, as an SQL list
pub(crate) const BLOCKING_STATUSES: &str = "('PENDING', 'CONFIRMED', 'CHECKED_IN', 'CHECKED_OUT')";

const COLUMNS: &str = "res.id, res.tenant_id, res.hotel_id, res.room_id, res.guest_id, \
                       res.guest_name, res.guest_email, res.guest_phone, res.confirmation_number, \
                       res.check_in, res.check_out, res.guests, res.total_amount, res.status, \
                       res.promo_code, res.special_requests, res.payment_method, \
                       res.cancellation_reason, res.cancelled_at, res.actual_check_in, \
                       res.actual_check_out, res.version, res.created_at, res.updated_at";

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(&row.get::<_, String>(1)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(2)?)?,
        room_id: parse_uuid(&row.get::<_, String>(3)?)?,
        guest_id: parse_uuid_opt(row.get(4)?)?,
        guest_name: row.get(5)?,
        guest_email: row.get(6)?,
        guest_phone: row.get(7)?,
        confirmation_number: row.get(8)?,
        check_in: parse_date(&row.get::<_, String>(9)?)?,
        check_out: parse_date(&row.get::<_, String>(10)?)?,
        guests: row.get(11)?,
        total_amount: parse_decimal(&row.get::<_, String>(12)?)?,
        status: parse_enum(
            &row.get::<_, String>(13)?,
            "reservation status",
            ReservationStatus::from_str,
        )?,
        promo_code: row.get(14)?,
        special_requests: row.get(15)?,
        payment_method: row.get(16)?,
        cancellation_reason: row.get(17)?,
        cancelled_at: parse_datetime_opt(row.get(18)?)?,
        actual_check_in: parse_datetime_opt(row.get(19)?)?,
        actual_check_out: parse_datetime_opt(row.get(20)?)?,
        version: row.get(21)?,
        created_at: parse_datetime(&row.get::<_, String>(22)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(23)?)?,
    })
}

/// Staff-side reservation search
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub hotel_id: Option<Uuid>,
    /// Matched against guest name, confirmation number and room number
    pub query: Option<String>,
    pub status: Option<ReservationStatus>,
}

pub struct ReservationStore<'a> {
    conn: &'a Connection,
}

impl<'a> ReservationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert `reservation` unless its room is already held for an
    /// overlapping range. The check and the insert share one transaction,
    /// joining the caller's if one is open. Fills in the confirmation
    /// number on success.
    #[instrument(skip(self, reservation), fields(room_id = %reservation.room_id))]
    pub fn create_if_free(&self, reservation: &mut Reservation) -> Result<()> {
        assert_reservation_invariants(reservation);
        let number = in_transaction(self.conn, |conn| {
            let store = ReservationStore::new(conn);
            if store.has_overlap(reservation.room_id, &reservation.stay(), None)? {
                return Err(Error::Conflict(format!(
                    "Room is already booked between {} and {}",
                    reservation.check_in, reservation.check_out
                )));
            }

            // The confirmation number column is unique, so the id stands in
            // until the row number is known.
            conn.execute(
                "INSERT INTO reservations (id, tenant_id, hotel_id, room_id, guest_id, guest_name,
                    guest_email, guest_phone, confirmation_number, check_in, check_out, guests,
                    total_amount, status, promo_code, special_requests, payment_method, version,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?1, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    0, ?17, ?18)",
                params![
                    reservation.id.to_string(),
                    reservation.tenant_id.to_string(),
                    reservation.hotel_id.to_string(),
                    reservation.room_id.to_string(),
                    reservation.guest_id.map(|id| id.to_string()),
                    reservation.guest_name,
                    reservation.guest_email,
                    reservation.guest_phone,
                    date_param(reservation.check_in),
                    date_param(reservation.check_out),
                    reservation.guests,
                    reservation.total_amount.to_string(),
                    reservation.status.as_str(),
                    reservation.promo_code,
                    reservation.special_requests,
                    reservation.payment_method,
                    reservation.created_at.to_rfc3339(),
                    reservation.updated_at.to_rfc3339(),
                ],
            )?;
            let seq = conn.last_insert_rowid();
            let number = confirmation_number(seq);
            conn.execute(
                "UPDATE reservations SET confirmation_number = ?1 WHERE seq = ?2",
                params![number, seq],
            )?;
            Ok(number)
        })?;

        debug!(confirmation = %number, "Reservation stored");
        reservation.confirmation_number = number;
        reservation.version = 0;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<Reservation>> {
        let reservation = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM reservations res
                     WHERE res.id = ?1 AND (?2 IS NULL OR res.tenant_id = ?2)"
                ),
                params![id.to_string(), scope.param()],
                reservation_from_row,
            )
            .optional()?;
        Ok(reservation)
    }

    #[instrument(skip(self))]
    pub fn find_by_confirmation(&self, number: &str) -> Result<Option<Reservation>> {
        let reservation = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM reservations res WHERE res.confirmation_number = ?1"
                ),
                params![number.trim().to_uppercase()],
                reservation_from_row,
            )
            .optional()?;
        Ok(reservation)
    }

    /// Reservations made by a registered guest or under their email
    pub fn list_by_guest(&self, guest_id: Uuid, email: &str) -> Result<Vec<Reservation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM reservations res
             WHERE res.guest_id = ?1
                OR (res.guest_id IS NULL AND res.guest_email = ?2 COLLATE NOCASE)
             ORDER BY res.check_in DESC"
        ))?;
        let reservations = stmt
            .query_map(params![guest_id.to_string(), email], reservation_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reservations)
    }

    pub fn search(
        &self,
        scope: TenantScope,
        filter: &ReservationFilter,
        page: PageRequest,
    ) -> Result<Page<Reservation>> {
        let pattern = filter.query.as_ref().map(|q| format!("%{}%", q.trim()));
        let from = "FROM reservations res JOIN rooms r ON r.id = res.room_id
             WHERE (?1 IS NULL OR res.tenant_id = ?1)
               AND (?2 IS NULL OR res.hotel_id = ?2)
               AND (?3 IS NULL OR res.guest_name LIKE ?3 OR res.confirmation_number LIKE ?3
                    OR r.room_number LIKE ?3)
               AND (?4 IS NULL OR res.status = ?4)";
        let hotel = filter.hotel_id.map(|id| id.to_string());
        let status = filter.status.map(|s| s.as_str());

        let total: u64 = self.conn.query_row(
            &format!("SELECT COUNT(*) {from}"),
            params![scope.param(), hotel, pattern, status],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} {from} ORDER BY res.check_in DESC, res.seq DESC LIMIT ?5 OFFSET ?6"
        ))?;
        let reservations = stmt
            .query_map(
                params![scope.param(), hotel, pattern, status, page.limit(), page.offset()],
                reservation_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(reservations, page, total))
    }

    /// Persist a modified reservation. Fails with `Conflict` when the row
    /// changed since it was read; bumps `version` on success.
    #[instrument(
        skip(self, reservation),
        fields(reservation_id = %reservation.id, status = %reservation.status)
    )]
    pub fn update(&self, reservation: &mut Reservation) -> Result<()> {
        assert_reservation_invariants(reservation);
        let now = Utc::now();
        let changed = self.conn.execute(
            "UPDATE reservations SET room_id = ?1, guest_name = ?2, guest_email = ?3,
                guest_phone = ?4, check_in = ?5, check_out = ?6, guests = ?7, total_amount = ?8,
                status = ?9, special_requests = ?10, payment_method = ?11,
                cancellation_reason = ?12, cancelled_at = ?13, actual_check_in = ?14,
                actual_check_out = ?15,
                version = version + 1, updated_at = ?16
             WHERE id = ?17 AND version = ?18",
            params![
                reservation.room_id.to_string(),
                reservation.guest_name,
                reservation.guest_email,
                reservation.guest_phone,
                date_param(reservation.check_in),
                date_param(reservation.check_out),
                reservation.guests,
                reservation.total_amount.to_string(),
                reservation.status.as_str(),
                reservation.special_requests,
                reservation.payment_method,
                reservation.cancellation_reason,
                reservation.cancelled_at.map(|t| t.to_rfc3339()),
                reservation.actual_check_in.map(|t| t.to_rfc3339()),
                reservation.actual_check_out.map(|t| t.to_rfc3339()),
                now.to_rfc3339(),
                reservation.id.to_string(),
                reservation.version,
            ],
        )?;
        if changed == 0 {
            return Err(Error::Conflict(format!(
                "Reservation {} was modified concurrently",
                reservation.confirmation_number
            )));
        }
        reservation.version += 1;
        reservation.updated_at = now;
        Ok(())
    }

    /// Whether any blocking reservation of `room_id` overlaps `stay`
    pub fn has_overlap(
        &self,
        room_id: Uuid,
        stay: &StayDates,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM reservations
                 WHERE room_id = ?1
                   AND status IN {BLOCKING_STATUSES}
                   AND check_in < ?3
                   AND check_out > ?2
                   AND (?4 IS NULL OR id != ?4)"
            ),
            params![
                room_id.to_string(),
                date_param(stay.check_in()),
                date_param(stay.check_out()),
                exclude.map(|id| id.to_string()),
            ],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether a confirmed or in-house stay of `room_id` spans `date`
    pub fn has_active_on(&self, room_id: Uuid, date: NaiveDate) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reservations
             WHERE room_id = ?1
               AND status IN ('CONFIRMED', 'CHECKED_IN')
               AND check_in <= ?2
               AND check_out >= ?2",
            params![room_id.to_string(), date_param(date)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether a guest is currently checked in to `room_id`
    pub fn room_in_house(&self, room_id: Uuid) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reservations WHERE room_id = ?1 AND status = 'CHECKED_IN'",
            params![room_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_for_room(&self, room_id: Uuid) -> Result<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM reservations WHERE room_id = ?1",
            params![room_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Confirmed reservations arriving on `date`
    pub fn arrivals(&self, hotel_id: Uuid, date: NaiveDate) -> Result<Vec<Reservation>> {
        self.list_where(
            "res.hotel_id = ?1 AND res.status = 'CONFIRMED' AND res.check_in = ?2",
            hotel_id,
            Some(date),
        )
    }

    /// In-house reservations due out on `date`
    pub fn departures(&self, hotel_id: Uuid, date: NaiveDate) -> Result<Vec<Reservation>> {
        self.list_where(
            "res.hotel_id = ?1 AND res.status = 'CHECKED_IN' AND res.check_out = ?2",
            hotel_id,
            Some(date),
        )
    }

    pub fn in_house(&self, hotel_id: Uuid) -> Result<Vec<Reservation>> {
        self.list_where("res.hotel_id = ?1 AND res.status = 'CHECKED_IN'", hotel_id, None)
    }

    /// In-house reservations whose check-out date is before `date`
    pub fn overdue_departures(&self, hotel_id: Uuid, date: NaiveDate) -> Result<Vec<Reservation>> {
        self.list_where(
            "res.hotel_id = ?1 AND res.status = 'CHECKED_IN' AND res.check_out < ?2",
            hotel_id,
            Some(date),
        )
    }

    fn list_where(
        &self,
        predicate: &str,
        hotel_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Reservation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM reservations res JOIN rooms r ON r.id = res.room_id
             WHERE {predicate} ORDER BY r.room_number"
        ))?;
        let rows = match date {
            Some(date) => stmt.query_map(
                params![hotel_id.to_string(), date_param(date)],
                reservation_from_row,
            )?,
            None => stmt.query_map(params![hotel_id.to_string()], reservation_from_row)?,
        };
        let reservations = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reservations)
    }

    /// Rooms of the hotel held for the night of `date`
    pub fn rooms_held_on(&self, hotel_id: Uuid, date: NaiveDate) -> Result<u64> {
        let count = self.conn.query_row(
            &format!(
                "SELECT COUNT(DISTINCT room_id) FROM reservations
                 WHERE hotel_id = ?1
                   AND status IN {BLOCKING_STATUSES}
                   AND check_in <= ?2
                   AND check_out > ?2"
            ),
            params![hotel_id.to_string(), date_param(date)],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_list_matches_status_rules() {
        for status in ReservationStatus::ALL {
            let quoted = format!("'{}'", status.as_str());
            assert_eq!(
                BLOCKING_STATUSES.contains(&quoted),
                status.blocks_inventory(),
                "{status}"
            );
        }
    }
}

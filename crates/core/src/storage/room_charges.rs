//! Room charge storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_datetime_opt, parse_decimal, parse_enum, parse_uuid, parse_uuid_opt,
    OptionalExt,
};
use crate::error::Result;
use crate::models::{RoomCharge, RoomChargeType};
use crate::scope::TenantScope;

const COLUMNS: &str = "c.id, c.hotel_id, c.reservation_id, c.shop_order_id, c.description, \
                       c.amount, c.charge_type, c.is_paid, c.paid_at, c.payment_reference, \
                       c.created_by, c.created_at";

fn charge_from_row(row: &Row<'_>) -> rusqlite::Result<RoomCharge> {
    Ok(RoomCharge {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(1)?)?,
        reservation_id: parse_uuid(&row.get::<_, String>(2)?)?,
        shop_order_id: parse_uuid_opt(row.get(3)?)?,
        description: row.get(4)?,
        amount: parse_decimal(&row.get::<_, String>(5)?)?,
        charge_type: parse_enum(
            &row.get::<_, String>(6)?,
            "charge type",
            RoomChargeType::from_str,
        )?,
        is_paid: row.get(7)?,
        paid_at: parse_datetime_opt(row.get(8)?)?,
        payment_reference: row.get(9)?,
        created_by: parse_uuid_opt(row.get(10)?)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?)?,
    })
}

pub struct RoomChargeStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoomChargeStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(
        skip(self, charge),
        fields(reservation_id = %charge.reservation_id, amount = %charge.amount)
    )]
    pub fn create(&self, charge: &RoomCharge) -> Result<()> {
        self.conn.execute(
            "INSERT INTO room_charges (id, hotel_id, reservation_id, shop_order_id, description,
                amount, charge_type, is_paid, paid_at, payment_reference, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                charge.id.to_string(),
                charge.hotel_id.to_string(),
                charge.reservation_id.to_string(),
                charge.shop_order_id.map(|id| id.to_string()),
                charge.description,
                charge.amount.to_string(),
                charge.charge_type.as_str(),
                charge.is_paid,
                charge.paid_at.map(|t| t.to_rfc3339()),
                charge.payment_reference,
                charge.created_by.map(|id| id.to_string()),
                charge.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<RoomCharge>> {
        let charge = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM room_charges c JOIN hotels h ON h.id = c.hotel_id
                     WHERE c.id = ?1 AND (?2 IS NULL OR h.tenant_id = ?2)"
                ),
                params![id.to_string(), scope.param()],
                charge_from_row,
            )
            .optional()?;
        Ok(charge)
    }

    pub fn list_by_reservation(&self, reservation_id: Uuid) -> Result<Vec<RoomCharge>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM room_charges c WHERE c.reservation_id = ?1 ORDER BY c.created_at"
        ))?;
        let charges = stmt
            .query_map(params![reservation_id.to_string()], charge_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(charges)
    }

    pub fn list_unpaid_by_hotel(&self, hotel_id: Uuid) -> Result<Vec<RoomCharge>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM room_charges c
             WHERE c.hotel_id = ?1 AND c.is_paid = 0 ORDER BY c.created_at"
        ))?;
        let charges = stmt
            .query_map(params![hotel_id.to_string()], charge_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(charges)
    }

    /// Sum of unpaid charges on a reservation
    pub fn unpaid_total(&self, reservation_id: Uuid) -> Result<Decimal> {
        // Amounts are decimal text, so sum them here rather than in SQL.
        let charges = self.list_by_reservation(reservation_id)?;
        Ok(charges.iter().filter(|c| !c.is_paid).map(|c| c.amount).sum())
    }

    pub fn set_paid(
        &self,
        id: Uuid,
        paid_at: Option<DateTime<Utc>>,
        payment_reference: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE room_charges SET is_paid = ?1, paid_at = ?2, payment_reference = ?3
             WHERE id = ?4",
            params![
                paid_at.is_some(),
                paid_at.map(|t| t.to_rfc3339()),
                payment_reference,
                id.to_string()
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.conn
            .execute("DELETE FROM room_charges WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }
}

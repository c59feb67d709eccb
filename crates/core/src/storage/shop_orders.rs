//! Shop order storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_datetime_opt, parse_decimal, parse_enum, parse_enum_opt, parse_uuid,
    parse_uuid_opt, OptionalExt,
};
use crate::error::Result;
use crate::invariants::assert_order_invariants;
use crate::models::{OrderStatus, Page, PageRequest, PaymentMethod, ShopOrder, ShopOrderItem};
use crate::scope::TenantScope;

const COLUMNS: &str = "id, tenant_id, hotel_id, order_number, reservation_id, customer_name, \
                       customer_email, room_number, status, total_amount, tax_amount, \
                       payment_method, is_delivery, delivery_address, is_paid, paid_at, \
                       payment_reference, notes, completed_at, created_at, updated_at";

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<ShopOrder> {
    Ok(ShopOrder {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(&row.get::<_, String>(1)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(2)?)?,
        order_number: row.get(3)?,
        reservation_id: parse_uuid_opt(row.get(4)?)?,
        customer_name: row.get(5)?,
        customer_email: row.get(6)?,
        room_number: row.get(7)?,
        status: parse_enum(&row.get::<_, String>(8)?, "order status", OrderStatus::from_str)?,
        total_amount: parse_decimal(&row.get::<_, String>(9)?)?,
        tax_amount: parse_decimal(&row.get::<_, String>(10)?)?,
        payment_method: parse_enum_opt(row.get(11)?, "payment method", PaymentMethod::from_str)?,
        is_delivery: row.get(12)?,
        delivery_address: row.get(13)?,
        is_paid: row.get(14)?,
        paid_at: parse_datetime_opt(row.get(15)?)?,
        payment_reference: row.get(16)?,
        notes: row.get(17)?,
        completed_at: parse_datetime_opt(row.get(18)?)?,
        created_at: parse_datetime(&row.get::<_, String>(19)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(20)?)?,
        items: Vec::new(),
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ShopOrderItem> {
    Ok(ShopOrderItem {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        order_id: parse_uuid(&row.get::<_, String>(1)?)?,
        product_id: parse_uuid(&row.get::<_, String>(2)?)?,
        product_name: row.get(3)?,
        product_sku: row.get(4)?,
        quantity: row.get(5)?,
        unit_price: parse_decimal(&row.get::<_, String>(6)?)?,
    })
}

pub struct ShopOrderStore<'a> {
    conn: &'a Connection,
}

impl<'a> ShopOrderStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert an order and its line items. Callers that also move stock
    /// wrap this in their own transaction.
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    pub fn create(&self, order: &ShopOrder) -> Result<()> {
        assert_order_invariants(order);
        self.conn.execute(
            &format!(
                "INSERT INTO shop_orders ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21)"
            ),
            params![
                order.id.to_string(),
                order.tenant_id.to_string(),
                order.hotel_id.to_string(),
                order.order_number,
                order.reservation_id.map(|id| id.to_string()),
                order.customer_name,
                order.customer_email,
                order.room_number,
                order.status.as_str(),
                order.total_amount.to_string(),
                order.tax_amount.to_string(),
                order.payment_method.map(|m| m.as_str()),
                order.is_delivery,
                order.delivery_address,
                order.is_paid,
                order.paid_at.map(|t| t.to_rfc3339()),
                order.payment_reference,
                order.notes,
                order.completed_at.map(|t| t.to_rfc3339()),
                order.created_at.to_rfc3339(),
                order.updated_at.to_rfc3339(),
            ],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO shop_order_items (id, order_id, product_id, product_name, product_sku,
                quantity, unit_price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for item in &order.items {
            stmt.execute(params![
                item.id.to_string(),
                order.id.to_string(),
                item.product_id.to_string(),
                item.product_name,
                item.product_sku,
                item.quantity,
                item.unit_price.to_string(),
            ])?;
        }
        Ok(())
    }

    pub fn order_number_taken(&self, order_number: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM shop_orders WHERE order_number = ?1",
            params![order_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<ShopOrder>> {
        let order = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM shop_orders
                     WHERE id = ?1 AND (?2 IS NULL OR tenant_id = ?2)"
                ),
                params![id.to_string(), scope.param()],
                order_from_row,
            )
            .optional()?;
        order.map(|o| self.with_items(o)).transpose()
    }

    pub fn find_by_number(
        &self,
        scope: TenantScope,
        order_number: &str,
    ) -> Result<Option<ShopOrder>> {
        let order = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM shop_orders
                     WHERE order_number = ?1 AND (?2 IS NULL OR tenant_id = ?2)"
                ),
                params![order_number.trim().to_uppercase(), scope.param()],
                order_from_row,
            )
            .optional()?;
        order.map(|o| self.with_items(o)).transpose()
    }

    fn with_items(&self, mut order: ShopOrder) -> Result<ShopOrder> {
        let mut stmt = self.conn.prepare(
            "SELECT id, order_id, product_id, product_name, product_sku, quantity, unit_price
             FROM shop_order_items WHERE order_id = ?1 ORDER BY product_name",
        )?;
        order.items = stmt
            .query_map(params![order.id.to_string()], item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(order)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, status = %order.status))]
    pub fn update(&self, order: &ShopOrder) -> Result<()> {
        self.conn.execute(
            "UPDATE shop_orders SET status = ?1, is_paid = ?2, paid_at = ?3, payment_reference = ?4,
                notes = ?5, completed_at = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                order.status.as_str(),
                order.is_paid,
                order.paid_at.map(|t| t.to_rfc3339()),
                order.payment_reference,
                order.notes,
                order.completed_at.map(|t| t.to_rfc3339()),
                Utc::now().to_rfc3339(),
                order.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// A hotel's orders, newest first. Line items are not loaded.
    pub fn list_by_hotel(
        &self,
        hotel_id: Uuid,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<ShopOrder>> {
        let status = status.map(|s| s.as_str());
        let total: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM shop_orders WHERE hotel_id = ?1 AND (?2 IS NULL OR status = ?2)",
            params![hotel_id.to_string(), status],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM shop_orders
             WHERE hotel_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
        ))?;
        let orders = stmt
            .query_map(
                params![hotel_id.to_string(), status, page.limit(), page.offset()],
                order_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(orders, page, total))
    }

    pub fn list_by_reservation(&self, reservation_id: Uuid) -> Result<Vec<ShopOrder>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM shop_orders WHERE reservation_id = ?1 ORDER BY created_at"
        ))?;
        let orders = stmt
            .query_map(params![reservation_id.to_string()], order_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        orders.into_iter().map(|o| self.with_items(o)).collect()
    }
}

//! Shop product storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_decimal, parse_enum, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{Product, ProductCategory};
use crate::scope::TenantScope;

const COLUMNS: &str = "id, tenant_id, hotel_id, name, description, category, price, \
                       stock_quantity, sku, is_active, created_at, updated_at";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(&row.get::<_, String>(1)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(2)?)?,
        name: row.get(3)?,
        description: row.get(4)?,
        category: parse_enum(
            &row.get::<_, String>(5)?,
            "product category",
            ProductCategory::from_str,
        )?,
        price: parse_decimal(&row.get::<_, String>(6)?)?,
        stock_quantity: row.get(7)?,
        sku: row.get(8)?,
        is_active: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(11)?)?,
    })
}

pub struct ProductStore<'a> {
    conn: &'a Connection,
}

impl<'a> ProductStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self, product), fields(hotel_id = %product.hotel_id, name = %product.name))]
    pub fn create(&self, product: &Product) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO products ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                product.id.to_string(),
                product.tenant_id.to_string(),
                product.hotel_id.to_string(),
                product.name,
                product.description,
                product.category.as_str(),
                product.price.to_string(),
                product.stock_quantity,
                product.sku,
                product.is_active,
                product.created_at.to_rfc3339(),
                product.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<Product>> {
        let product = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM products
                     WHERE id = ?1 AND (?2 IS NULL OR tenant_id = ?2)"
                ),
                params![id.to_string(), scope.param()],
                product_from_row,
            )
            .optional()?;
        Ok(product)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn update(&self, product: &Product) -> Result<()> {
        self.conn.execute(
            "UPDATE products SET name = ?1, description = ?2, category = ?3, price = ?4,
                stock_quantity = ?5, sku = ?6, is_active = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                product.name,
                product.description,
                product.category.as_str(),
                product.price.to_string(),
                product.stock_quantity,
                product.sku,
                product.is_active,
                Utc::now().to_rfc3339(),
                product.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn set_stock(&self, id: Uuid, stock_quantity: u32) -> Result<()> {
        self.conn.execute(
            "UPDATE products SET stock_quantity = ?1, updated_at = ?2 WHERE id = ?3",
            params![stock_quantity, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.conn
            .execute("DELETE FROM products WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    /// A hotel's catalogue; `active_only` hides retired and out-of-stock items
    pub fn list_by_hotel(
        &self,
        hotel_id: Uuid,
        category: Option<ProductCategory>,
        active_only: bool,
    ) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM products
             WHERE hotel_id = ?1
               AND (?2 IS NULL OR category = ?2)
               AND (?3 = 0 OR (is_active = 1 AND stock_quantity > 0))
             ORDER BY category, name"
        ))?;
        let products = stmt
            .query_map(
                params![hotel_id.to_string(), category.map(|c| c.as_str()), active_only],
                product_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    pub fn is_ordered(&self, id: Uuid) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM shop_order_items WHERE product_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

//! Hotel shop products

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

string_enum! {
    pub enum ProductCategory {
        Souvenirs => "SOUVENIRS",
        CulturalClothing => "CULTURAL_CLOTHING",
        Beverages => "BEVERAGES",
        Snacks => "SNACKS",
        Toiletries => "TOILETRIES",
        Other => "OTHER",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub hotel_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub price: Decimal,
    pub stock_quantity: u32,
    pub sku: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        tenant_id: Uuid,
        hotel_id: Uuid,
        name: String,
        category: ProductCategory,
        price: Decimal,
        stock_quantity: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            hotel_id,
            name,
            description: None,
            category,
            price,
            stock_quantity,
            sku: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        self.is_active && self.stock_quantity > 0
    }

    pub fn reduce_stock(&mut self, quantity: u32) -> Result<()> {
        if quantity > self.stock_quantity {
            return Err(Error::Validation(format!(
                "Insufficient stock for product {}: requested {}, available {}",
                self.name, quantity, self.stock_quantity
            )));
        }
        self.stock_quantity -= quantity;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn increase_stock(&mut self, quantity: u32) {
        self.stock_quantity = self.stock_quantity.saturating_add(quantity);
        self.updated_at = Utc::now();
    }
}

//! Shop orders and their line items

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    pub enum OrderStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Preparing => "PREPARING",
        ReadyForPickup => "READY_FOR_PICKUP",
        OutForDelivery => "OUT_FOR_DELIVERY",
        Delivered => "DELIVERED",
        Cancelled => "CANCELLED",
    }
}

impl OrderStatus {
    pub fn valid_next(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Preparing, Cancelled],
            Preparing => &[ReadyForPickup, OutForDelivery, Cancelled],
            ReadyForPickup => &[Delivered, Cancelled],
            OutForDelivery => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.valid_next().contains(&next)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

string_enum! {
    pub enum PaymentMethod {
        RoomCharge => "ROOM_CHARGE",
        Cash => "CASH",
        Card => "CARD",
        MobileMoney => "MOBILE_MONEY",
        PayAtFrontdesk => "PAY_AT_FRONTDESK",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl ShopOrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopOrder {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub hotel_id: Uuid,
    pub order_number: String,
    pub reservation_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub room_number: Option<String>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub is_delivery: bool,
    pub delivery_address: Option<String>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<ShopOrderItem>,
}

impl ShopOrder {
    pub fn grand_total(&self) -> Decimal {
        self.total_amount + self.tax_amount
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

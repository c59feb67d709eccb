//! Incidental charges posted to a guest's folio

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Reservation;

string_enum! {
    pub enum RoomChargeType {
        RoomService => "ROOM_SERVICE",
        Minibar => "MINIBAR",
        Laundry => "LAUNDRY",
        Restaurant => "RESTAURANT",
        Spa => "SPA",
        ShopPurchase => "SHOP_PURCHASE",
        DamageFee => "DAMAGE_FEE",
        Other => "OTHER",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCharge {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub reservation_id: Uuid,
    pub shop_order_id: Option<Uuid>,
    pub description: String,
    pub amount: Decimal,
    pub charge_type: RoomChargeType,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RoomCharge {
    pub fn new(
        hotel_id: Uuid,
        reservation_id: Uuid,
        description: String,
        amount: Decimal,
        charge_type: RoomChargeType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            reservation_id,
            shop_order_id: None,
            description,
            amount,
            charge_type,
            is_paid: false,
            paid_at: None,
            payment_reference: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }
}

/// Guest folio at check-out: the stay plus every incidental
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedReceipt {
    pub reservation_id: Uuid,
    pub confirmation_number: String,
    pub guest_name: String,
    pub room_number: String,
    pub nights: i64,
    pub room_total: Decimal,
    pub charges: Vec<RoomCharge>,
    pub charges_total: Decimal,
    pub paid_charges_total: Decimal,
    pub unpaid_charges_total: Decimal,
    pub grand_total: Decimal,
    pub generated_at: DateTime<Utc>,
}

impl ConsolidatedReceipt {
    pub fn build(reservation: &Reservation, room_number: String, charges: Vec<RoomCharge>) -> Self {
        let charges_total: Decimal = charges.iter().map(|c| c.amount).sum();
        let paid_charges_total: Decimal = charges
            .iter()
            .filter(|c| c.is_paid)
            .map(|c| c.amount)
            .sum();

        let receipt = Self {
            reservation_id: reservation.id,
            confirmation_number: reservation.confirmation_number.clone(),
            guest_name: reservation.guest_name.clone(),
            room_number,
            nights: reservation.nights(),
            room_total: reservation.total_amount,
            charges_total,
            paid_charges_total,
            unpaid_charges_total: charges_total - paid_charges_total,
            grand_total: reservation.total_amount + charges_total,
            charges,
            generated_at: Utc::now(),
        };
        crate::invariants::assert_receipt_invariants(&receipt);
        receipt
    }
}

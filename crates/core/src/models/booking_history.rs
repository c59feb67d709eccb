//! Audit trail of changes made to a reservation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::Reservation;

string_enum! {
    pub enum BookingAction {
        Created => "CREATED",
        Modified => "MODIFIED",
        Cancelled => "CANCELLED",
        CheckedIn => "CHECKED_IN",
        CheckedOut => "CHECKED_OUT",
        NoShow => "NO_SHOW",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingHistoryEntry {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub hotel_id: Uuid,
    pub action: BookingAction,
    /// Email of the acting user, or `system` / the guest's email
    pub changed_by: String,
    pub reason: Option<String>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl BookingHistoryEntry {
    pub fn new(
        reservation: &Reservation,
        action: BookingAction,
        changed_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reservation_id: reservation.id,
            hotel_id: reservation.hotel_id,
            action,
            changed_by: changed_by.into(),
            reason: None,
            old_values: None,
            new_values: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// The fields a guest can change, as recorded before and after a change
    pub fn snapshot(reservation: &Reservation) -> Value {
        json!({
            "status": reservation.status,
            "room_id": reservation.room_id,
            "check_in": reservation.check_in,
            "check_out": reservation.check_out,
            "guests": reservation.guests,
            "total_amount": reservation.total_amount,
        })
    }

    pub fn with_changes(mut self, old_values: Option<Value>, new_values: Value) -> Self {
        self.old_values = old_values;
        self.new_values = Some(new_values);
        self
    }
}

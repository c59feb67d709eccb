//! Reservation model and its status machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::availability::StayDates;

string_enum! {
    pub enum ReservationStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        CheckedIn => "CHECKED_IN",
        CheckedOut => "CHECKED_OUT",
        Cancelled => "CANCELLED",
        NoShow => "NO_SHOW",
    }
}

impl ReservationStatus {
    /// Statuses reachable from this one
    pub fn valid_next(&self) -> &'static [ReservationStatus] {
        use ReservationStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[CheckedIn, Cancelled, NoShow],
            CheckedIn => &[CheckedOut],
            CheckedOut | Cancelled | NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        self.valid_next().contains(&next)
    }

    pub fn is_final(&self) -> bool {
        self.valid_next().is_empty()
    }

    /// Whether a reservation in this status holds its room for its dates.
    ///
    /// Only cancelled and no-show reservations release inventory; a
    /// checked-out stay keeps its historical range.
    pub fn blocks_inventory(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled | ReservationStatus::NoShow)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub hotel_id: Uuid,
    pub room_id: Uuid,
    /// Registered guest, `None` for anonymous bookings
    pub guest_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub confirmation_number: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub total_amount: Decimal,
    pub status: ReservationStatus,
    pub promo_code: Option<String>,
    pub special_requests: Option<String>,
    pub payment_method: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub actual_check_in: Option<DateTime<Utc>>,
    pub actual_check_out: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn stay(&self) -> StayDates {
        StayDates::from_stored(self.check_in, self.check_out)
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Move to `next`, enforcing the status table
    pub fn transition_to(&mut self, next: ReservationStatus) -> crate::Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(crate::Error::InvalidState(format!(
                "Reservation {} cannot move from {} to {}",
                self.confirmation_number, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Active in-house or upcoming stay covering `date` (inclusive of the departure day)
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        matches!(
            self.status,
            ReservationStatus::Confirmed | ReservationStatus::CheckedIn
        ) && self.check_in <= date
            && date <= self.check_out
    }
}

/// Refund owed when a guest cancels `days_before_check_in` days ahead: the
/// full amount beyond a week, half from 3 to 7 days, a quarter at 1 or 2
/// days and nothing on the day of arrival
pub fn cancellation_refund(total: Decimal, days_before_check_in: i64) -> Decimal {
    let share = match days_before_check_in {
        days if days > 7 => Decimal::ONE,
        3..=7 => Decimal::new(50, 2),
        1..=2 => Decimal::new(25, 2),
        _ => Decimal::ZERO,
    };
    (total * share).round_dp(2)
}

/// Formats the public booking reference from the insert sequence number
pub fn confirmation_number(sequence: i64) -> String {
    format!("BK{sequence:08}")
}

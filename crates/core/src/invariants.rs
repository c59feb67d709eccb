//! Runtime invariant checks for debug builds
//!
//! These assertions catch bookkeeping bugs before rows reach storage.
//! They compile to nothing in release builds.

use rust_decimal::Decimal;

use crate::models::{ConsolidatedReceipt, Reservation, ReservationStatus, ShopOrder};

/// Validate reservation dates, money and lifecycle timestamps
pub fn assert_reservation_invariants(reservation: &Reservation) {
    debug_assert!(
        reservation.check_out > reservation.check_in,
        "Reservation {} departs on or before arrival ({} -> {})",
        reservation.id,
        reservation.check_in,
        reservation.check_out
    );

    debug_assert!(reservation.guests >= 1, "Reservation {} has no guests", reservation.id);

    debug_assert!(
        !reservation.total_amount.is_sign_negative(),
        "Reservation {} has negative total {}",
        reservation.id,
        reservation.total_amount
    );

    debug_assert!(reservation.version >= 0, "Reservation {} has negative version", reservation.id);

    // Cancellation always records when it happened
    debug_assert!(
        reservation.status != ReservationStatus::Cancelled || reservation.cancelled_at.is_some(),
        "Reservation {} is cancelled without a timestamp",
        reservation.id
    );

    // In-house and departed guests have an arrival time
    let arrived = matches!(
        reservation.status,
        ReservationStatus::CheckedIn | ReservationStatus::CheckedOut
    );
    debug_assert!(
        !arrived || reservation.actual_check_in.is_some(),
        "Reservation {} is {} without an actual check-in",
        reservation.id,
        reservation.status
    );
}

/// Validate that order totals match their lines
pub fn assert_order_invariants(order: &ShopOrder) {
    debug_assert!(!order.items.is_empty(), "Order {} has no items", order.order_number);

    let lines: Decimal = order.items.iter().map(|item| item.line_total()).sum();
    debug_assert!(
        lines.round_dp(2) == order.total_amount,
        "Order {} total {} does not match its lines {}",
        order.order_number,
        order.total_amount,
        lines
    );

    debug_assert!(
        !order.tax_amount.is_sign_negative(),
        "Order {} has negative tax",
        order.order_number
    );

    debug_assert!(
        !order.is_paid || order.paid_at.is_some(),
        "Order {} is paid without a payment time",
        order.order_number
    );
}

/// Validate that a receipt adds up
pub fn assert_receipt_invariants(receipt: &ConsolidatedReceipt) {
    debug_assert!(
        receipt.paid_charges_total + receipt.unpaid_charges_total == receipt.charges_total,
        "Receipt {} splits charges {} into {} paid and {} unpaid",
        receipt.confirmation_number,
        receipt.charges_total,
        receipt.paid_charges_total,
        receipt.unpaid_charges_total
    );

    debug_assert!(
        receipt.grand_total == receipt.room_total + receipt.charges_total,
        "Receipt {} grand total {} is not room plus charges",
        receipt.confirmation_number,
        receipt.grand_total
    );
}

//! Stay date ranges and room conflict detection
//!
//! A stay occupies the half-open range `[check_in, check_out)`: the room
//! is needed for the night of `check_in` and released on the morning of
//! `check_out`. Two stays for the same room conflict when their ranges
//! intersect and both reservations still hold inventory.
//!
//! The SQL in `storage::reservations` expresses the same predicate as
//! `check_in < :check_out AND check_out > :check_in` over stored
//! `YYYY-MM-DD` text, which orders the same way as the dates.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::ReservationStatus;

/// A validated `[check_in, check_out)` range of at least one night
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StayDates {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayDates {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self> {
        if check_in >= check_out {
            return Err(Error::Validation(
                "Check-in date must be before check-out date".to_string(),
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Wrap dates already validated on insert
    pub(crate) fn from_stored(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self {
            check_in,
            check_out,
        }
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn overlaps(&self, other: &StayDates) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    /// Whether the night of `date` is part of the stay
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    /// Each night of the stay, starting with `check_in`
    pub fn each_night(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.check_in.iter_days().take_while(move |d| *d < self.check_out)
    }
}

/// Whether `wanted` is free given the room's existing bookings
pub fn room_is_free<'a, I>(existing: I, wanted: &StayDates) -> bool
where
    I: IntoIterator<Item = (ReservationStatus, &'a StayDates)>,
{
    !existing
        .into_iter()
        .any(|(status, dates)| status.blocks_inventory() && dates.overlaps(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, day).unwrap()
    }

    fn stay(a: u32, b: u32) -> StayDates {
        StayDates::new(d(a), d(b)).unwrap()
    }

    #[test]
    fn test_rejects_empty_or_inverted_range() {
        assert!(matches!(StayDates::new(d(5), d(5)), Err(Error::Validation(_))));
        assert!(StayDates::new(d(6), d(5)).is_err());
        assert_eq!(stay(5, 8).nights(), 3);
    }

    #[test]
    fn test_back_to_back_stays_do_not_overlap() {
        assert!(!stay(1, 3).overlaps(&stay(3, 5)));
        assert!(!stay(3, 5).overlaps(&stay(1, 3)));
    }

    #[test]
    fn test_overlap_cases() {
        let base = stay(10, 15);
        assert!(base.overlaps(&stay(12, 13)));
        assert!(base.overlaps(&stay(8, 11)));
        assert!(base.overlaps(&stay(14, 20)));
        assert!(base.overlaps(&stay(1, 28)));
        assert!(base.overlaps(&stay(10, 15)));
        assert!(!base.overlaps(&stay(15, 16)));
        assert!(!base.overlaps(&stay(5, 10)));
    }

    #[test]
    fn test_cancelled_and_no_show_release_room() {
        let booked = stay(10, 12);
        let wanted = stay(11, 13);
        assert!(!room_is_free([(ReservationStatus::Confirmed, &booked)], &wanted));
        assert!(!room_is_free([(ReservationStatus::CheckedOut, &booked)], &wanted));
        assert!(room_is_free([(ReservationStatus::Cancelled, &booked)], &wanted));
        assert!(room_is_free([(ReservationStatus::NoShow, &booked)], &wanted));
        assert!(room_is_free(std::iter::empty(), &wanted));
    }

    #[test]
    fn test_each_night() {
        let nights: Vec<_> = stay(1, 4).each_night().collect();
        assert_eq!(nights, vec![d(1), d(2), d(3)]);
        assert!(stay(1, 4).contains(d(3)));
        assert!(!stay(1, 4).contains(d(4)));
    }
}

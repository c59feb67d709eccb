//! Front desk operations: arrivals, departures and room state

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{occupancy_rate, require, staff_hotel};
use crate::error::{Error, Result};
use crate::models::{
    BookingAction, BookingHistoryEntry, ConsolidatedReceipt, HousekeepingTask, HousekeepingTaskType,
    Reservation, ReservationStatus, Room, RoomStatus, RoomStatusCounts, User,
};
use crate::permissions::Action;
use crate::scope::TenantScope;
use crate::storage::{
    BookingHistoryStore, Database, HousekeepingStore, ReservationStore, RoomChargeStore, RoomFilter,
    RoomStore,
};

/// Recorded as the author of changes nobody made by hand
const SYSTEM_ACTOR: &str = "system";

/// Result of a check-out
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub reservation: Reservation,
    pub receipt: ConsolidatedReceipt,
    /// Cleaning queued for the vacated room
    pub cleaning_task: HousekeepingTask,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrontDeskStats {
    pub hotel_id: Uuid,
    pub date: NaiveDate,
    pub arrivals: u64,
    pub departures: u64,
    pub in_house: u64,
    pub rooms: RoomStatusCounts,
    pub occupancy_rate: Decimal,
}

/// Put an occupied room back in service once nobody is checked in to it
pub(crate) fn release_room(conn: &Connection, room_id: Uuid) -> Result<()> {
    let rooms = RoomStore::new(conn);
    let Some(room) = rooms.find_by_id(TenantScope::System, room_id)? else {
        return Ok(());
    };
    if room.status == RoomStatus::Occupied && !ReservationStore::new(conn).room_in_house(room_id)? {
        rooms.set_status(room_id, RoomStatus::Available)?;
    }
    Ok(())
}

/// Append a status change to the booking's history
fn record_status_change(
    conn: &Connection,
    before: &Reservation,
    after: &Reservation,
    action: BookingAction,
    changed_by: &str,
) -> Result<()> {
    let entry = BookingHistoryEntry::new(after, action, changed_by)
        .with_reason(
            after
                .cancellation_reason
                .clone()
                .filter(|_| action == BookingAction::Cancelled),
        )
        .with_changes(
            Some(BookingHistoryEntry::snapshot(before)),
            BookingHistoryEntry::snapshot(after),
        );
    BookingHistoryStore::new(conn).record(&entry)
}

/// Mark `reservation` checked out, queue its room for cleaning and build
/// the folio. Shared by the desk and the overnight sweep.
fn complete_check_out(
    conn: &Connection,
    mut reservation: Reservation,
    now: DateTime<Utc>,
    changed_by: &str,
) -> Result<CheckoutSummary> {
    let before = reservation.clone();
    reservation.transition_to(ReservationStatus::CheckedOut)?;
    reservation.actual_check_out = Some(now);
    ReservationStore::new(conn).update(&mut reservation)?;
    record_status_change(conn, &before, &reservation, BookingAction::CheckedOut, changed_by)?;

    let rooms = RoomStore::new(conn);
    rooms.set_status(reservation.room_id, RoomStatus::Maintenance)?;
    let room = rooms
        .find_by_id(TenantScope::System, reservation.room_id)?
        .ok_or_else(|| Error::not_found("Room", reservation.room_id))?;

    let mut cleaning_task = HousekeepingTask::new(
        reservation.hotel_id,
        room.id,
        HousekeepingTaskType::CheckoutCleaning,
    );
    cleaning_task.description = Some(format!(
        "Checkout cleaning after {}",
        reservation.confirmation_number
    ));
    HousekeepingStore::new(conn).create(&cleaning_task)?;

    let charges = RoomChargeStore::new(conn).list_by_reservation(reservation.id)?;
    let receipt = ConsolidatedReceipt::build(&reservation, room.room_number.clone(), charges);
    if receipt.unpaid_charges_total > Decimal::ZERO {
        warn!(
            confirmation = %reservation.confirmation_number,
            unpaid = %receipt.unpaid_charges_total,
            "Checked out with unpaid charges"
        );
    }

    info!(
        confirmation = %reservation.confirmation_number,
        room = %room.room_number,
        by = changed_by,
        "Guest checked out"
    );
    Ok(CheckoutSummary {
        reservation,
        receipt,
        cleaning_task,
    })
}

/// Reservation in the actor's tenant and hotel
pub(crate) fn load_reservation(
    conn: &Connection,
    actor: &User,
    action: Action,
    id: Uuid,
) -> Result<Reservation> {
    require(actor, action)?;
    let scope = TenantScope::for_user(actor)?;
    let reservation = ReservationStore::new(conn)
        .find_by_id(scope, id)?
        .ok_or_else(|| Error::not_found("Booking", id))?;
    staff_hotel(conn, actor, action, reservation.hotel_id)
        .map_err(|_| Error::not_found("Booking", id))?;
    Ok(reservation)
}

fn load_room(conn: &Connection, actor: &User, action: Action, id: Uuid) -> Result<Room> {
    require(actor, action)?;
    let scope = TenantScope::for_user(actor)?;
    let room = RoomStore::new(conn)
        .find_by_id(scope, id)?
        .ok_or_else(|| Error::not_found("Room", id))?;
    staff_hotel(conn, actor, action, room.hotel_id).map_err(|_| Error::not_found("Room", id))?;
    Ok(room)
}

pub struct FrontDeskService<'a> {
    db: &'a Database,
}

impl<'a> FrontDeskService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Check a confirmed guest in, optionally moving them to another free room
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub fn check_in(
        &self,
        actor: &User,
        reservation_id: Uuid,
        new_room_id: Option<Uuid>,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        self.db.transaction(|conn| {
            let mut reservation =
                load_reservation(conn, actor, Action::ManageBookings, reservation_id)?;
            let before = reservation.clone();
            reservation.transition_to(ReservationStatus::CheckedIn)?;
            if reservation.check_in > today + Duration::days(1) {
                return Err(Error::invalid_state("Cannot check in more than 1 day early"));
            }

            let rooms = RoomStore::new(conn);
            match new_room_id.filter(|id| *id != reservation.room_id) {
                Some(room_id) => {
                    let room = load_room(conn, actor, Action::ManageBookings, room_id)?;
                    if room.hotel_id != reservation.hotel_id {
                        return Err(Error::validation("Room belongs to a different hotel"));
                    }
                    if !room.is_bookable() {
                        return Err(Error::Conflict(format!(
                            "Room {} is not available",
                            room.room_number
                        )));
                    }
                    if !room.fits(reservation.guests) {
                        return Err(Error::validation(format!(
                            "Room {} holds at most {} guests",
                            room.room_number, room.capacity
                        )));
                    }
                    let stay = reservation.stay();
                    let reservations = ReservationStore::new(conn);
                    if reservations.has_overlap(room.id, &stay, Some(reservation.id))? {
                        return Err(Error::Conflict(format!(
                            "Room {} is booked for part of this stay",
                            room.room_number
                        )));
                    }
                    info!(
                        from = %reservation.room_id,
                        to = %room.id,
                        "Room reassigned at check-in"
                    );
                    reservation.room_id = room.id;
                }
                None => {
                    let room = rooms
                        .find_by_id(TenantScope::System, reservation.room_id)?
                        .ok_or_else(|| Error::not_found("Room", reservation.room_id))?;
                    if room.status == RoomStatus::OutOfOrder {
                        return Err(Error::Conflict(format!(
                            "Room {} is out of order; assign another room",
                            room.room_number
                        )));
                    }
                }
            }

            reservation.actual_check_in = Some(now);
            ReservationStore::new(conn).update(&mut reservation)?;
            rooms.set_status(reservation.room_id, RoomStatus::Occupied)?;
            record_status_change(
                conn,
                &before,
                &reservation,
                BookingAction::CheckedIn,
                &actor.email,
            )?;

            info!(confirmation = %reservation.confirmation_number, "Guest checked in");
            Ok(reservation)
        })
    }

    /// Check a guest out, queue the room for cleaning and produce the folio
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub fn check_out(
        &self,
        actor: &User,
        reservation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CheckoutSummary> {
        self.db.transaction(|conn| {
            let reservation =
                load_reservation(conn, actor, Action::ManageBookings, reservation_id)?;
            complete_check_out(conn, reservation, now, &actor.email)
        })
    }

    /// Check out every guest still in house after their departure date.
    /// Returns how many stays were closed.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub fn auto_check_out(
        &self,
        actor: &User,
        hotel_id: Uuid,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        self.db.transaction(|conn| {
            staff_hotel(conn, actor, Action::ManageBookings, hotel_id)?;
            let overdue = ReservationStore::new(conn).overdue_departures(hotel_id, today)?;
            let count = overdue.len();
            for reservation in overdue {
                complete_check_out(conn, reservation, now, SYSTEM_ACTOR)?;
            }
            if count > 0 {
                info!(%hotel_id, count, "Overdue stays checked out");
            }
            Ok(count)
        })
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub fn mark_no_show(
        &self,
        actor: &User,
        reservation_id: Uuid,
        today: NaiveDate,
    ) -> Result<Reservation> {
        self.db.transaction(|conn| {
            let mut reservation =
                load_reservation(conn, actor, Action::ManageBookings, reservation_id)?;
            let before = reservation.clone();
            reservation.transition_to(ReservationStatus::NoShow)?;
            if today < reservation.check_in {
                return Err(Error::invalid_state(
                    "Cannot mark as no-show before the check-in date",
                ));
            }
            ReservationStore::new(conn).update(&mut reservation)?;
            release_room(conn, reservation.room_id)?;
            record_status_change(conn, &before, &reservation, BookingAction::NoShow, &actor.email)?;
            info!(confirmation = %reservation.confirmation_number, "Marked no-show");
            Ok(reservation)
        })
    }

    /// Staff cancellation. No notice period applies, but guests already in
    /// house must be checked out instead.
    #[instrument(skip(self, actor, reason), fields(user_id = %actor.id))]
    pub fn cancel(
        &self,
        actor: &User,
        reservation_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        self.db.transaction(|conn| {
            let mut reservation =
                load_reservation(conn, actor, Action::ManageBookings, reservation_id)?;
            let before = reservation.clone();
            reservation.transition_to(ReservationStatus::Cancelled)?;
            reservation.cancellation_reason =
                super::optional(reason).or_else(|| Some("Cancelled by front desk".into()));
            reservation.cancelled_at = Some(now);
            ReservationStore::new(conn).update(&mut reservation)?;
            release_room(conn, reservation.room_id)?;
            record_status_change(
                conn,
                &before,
                &reservation,
                BookingAction::Cancelled,
                &actor.email,
            )?;
            info!(confirmation = %reservation.confirmation_number, "Booking cancelled by staff");
            Ok(reservation)
        })
    }

    pub fn booking(&self, actor: &User, reservation_id: Uuid) -> Result<Reservation> {
        load_reservation(self.db.connection(), actor, Action::ViewBookings, reservation_id)
    }

    /// Every recorded change to a booking, oldest first
    pub fn history(&self, actor: &User, reservation_id: Uuid) -> Result<Vec<BookingHistoryEntry>> {
        load_reservation(self.db.connection(), actor, Action::ViewBookings, reservation_id)?;
        self.db.booking_history().list_by_reservation(reservation_id)
    }

    pub fn arrivals(
        &self,
        actor: &User,
        hotel_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<Reservation>> {
        staff_hotel(self.db.connection(), actor, Action::ViewBookings, hotel_id)?;
        self.db.reservations().arrivals(hotel_id, today)
    }

    pub fn departures(
        &self,
        actor: &User,
        hotel_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<Reservation>> {
        staff_hotel(self.db.connection(), actor, Action::ViewBookings, hotel_id)?;
        self.db.reservations().departures(hotel_id, today)
    }

    pub fn in_house(&self, actor: &User, hotel_id: Uuid) -> Result<Vec<Reservation>> {
        staff_hotel(self.db.connection(), actor, Action::ViewBookings, hotel_id)?;
        self.db.reservations().in_house(hotel_id)
    }

    pub fn rooms(&self, actor: &User, hotel_id: Uuid, filter: RoomFilter) -> Result<Vec<Room>> {
        staff_hotel(self.db.connection(), actor, Action::ViewBookings, hotel_id)?;
        self.db.rooms().list_by_hotel(hotel_id, filter)
    }

    /// Change a room's physical state. Rooms with a guest due or in house
    /// today cannot be taken out of service.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub fn update_room_status(
        &self,
        actor: &User,
        room_id: Uuid,
        status: RoomStatus,
        today: NaiveDate,
    ) -> Result<Room> {
        self.db.transaction(|conn| {
            let mut room = load_room(conn, actor, Action::UpdateRoomStatus, room_id)?;
            if status.is_out_of_service()
                && ReservationStore::new(conn).has_active_on(room.id, today)?
            {
                return Err(Error::Conflict(format!(
                    "Room {} has an active booking today",
                    room.room_number
                )));
            }
            RoomStore::new(conn).set_status(room.id, status)?;
            info!(
                room = %room.room_number,
                from = %room.status,
                to = %status,
                "Room status changed"
            );
            room.status = status;
            Ok(room)
        })
    }

    /// Open or close a room for new bookings
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub fn set_room_availability(
        &self,
        actor: &User,
        room_id: Uuid,
        available: bool,
        today: NaiveDate,
    ) -> Result<Room> {
        self.db.transaction(|conn| {
            let mut room = load_room(conn, actor, Action::UpdateRoomStatus, room_id)?;
            if !available && ReservationStore::new(conn).has_active_on(room.id, today)? {
                return Err(Error::Conflict(format!(
                    "Room {} has an active booking today",
                    room.room_number
                )));
            }
            RoomStore::new(conn).set_available(room.id, available)?;
            room.is_available = available;
            Ok(room)
        })
    }

    pub fn stats(&self, actor: &User, hotel_id: Uuid, today: NaiveDate) -> Result<FrontDeskStats> {
        let conn = self.db.connection();
        staff_hotel(conn, actor, Action::ViewBookings, hotel_id)?;
        let reservations = self.db.reservations();
        Ok(FrontDeskStats {
            hotel_id,
            date: today,
            arrivals: reservations.arrivals(hotel_id, today)?.len() as u64,
            departures: reservations.departures(hotel_id, today)?.len() as u64,
            in_house: reservations.in_house(hotel_id)?.len() as u64,
            rooms: self.db.rooms().status_counts(hotel_id)?,
            occupancy_rate: occupancy_rate(conn, hotel_id, today)?,
        })
    }
}

//! Reservations made by guests, customers and staff

use chrono::{Duration, NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{occupancy_rate, optional, require, works_at};
use crate::availability::StayDates;
use crate::error::{Error, Result};
use crate::models::{
    cancellation_refund, BookingAction, BookingHistoryEntry, Hotel, Page, PageRequest, PriceQuote,
    PromotionalCode, Reservation, ReservationStatus, Room, RoomType, RoomTypeAvailability, User,
    UserRole,
};
use crate::permissions::{Action, PermissionMatrix};
use crate::pricing::{PriceCalculator, PricingPolicy, QuoteInput};
use crate::scope::TenantScope;
use crate::storage::{
    BookingHistoryStore, Database, HotelFilter, HotelStore, InventoryRepository, PricingStore,
    ReservationFilter, ReservationRepository, ReservationStore, RoomFilter, RoomStore,
};

/// Who the stay is for and how they pay. Signed-in callers may leave the
/// name and email out.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuestDetails {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub special_requests: Option<String>,
    pub payment_method: Option<String>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    #[serde(flatten)]
    pub guest: GuestDetails,
}

/// Book any free room of a type
#[derive(Debug, Clone, Deserialize)]
pub struct RoomTypeBookingRequest {
    pub hotel_id: Uuid,
    pub room_type: RoomType,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    #[serde(flatten)]
    pub guest: GuestDetails,
}

/// Changes to an upcoming stay. Fields left out keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookingModification {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub room_id: Option<Uuid>,
    /// Move to the first free room of this type; ignored when `room_id` is set
    pub room_type: Option<RoomType>,
    pub guests: Option<u32>,
    pub special_requests: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModificationResult {
    pub reservation: Reservation,
    pub previous_total: Decimal,
    /// Owed by the guest when the new price is higher
    pub additional_charges: Decimal,
    /// Owed to the guest when the new price is lower
    pub refund_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationResult {
    pub reservation: Reservation,
    pub refund_amount: Decimal,
}

struct Guest {
    id: Option<Uuid>,
    name: String,
    email: String,
    phone: Option<String>,
}

fn resolve_guest(actor: Option<&User>, details: &GuestDetails) -> Result<Guest> {
    let name = optional(details.guest_name.clone());
    let email = match optional(details.guest_email.clone()) {
        Some(email) => Some(super::normalize_email(&email)?),
        None => None,
    };
    let phone = optional(details.guest_phone.clone());

    match actor {
        Some(user) => {
            let email = email.unwrap_or_else(|| user.email.clone());
            Ok(Guest {
                id: (email == user.email).then_some(user.id),
                name: name.unwrap_or_else(|| user.full_name()),
                email,
                phone: phone.or_else(|| user.phone.clone()),
            })
        }
        None => Ok(Guest {
            id: None,
            name: name.ok_or_else(|| Error::validation("Guest name is required"))?,
            email: email.ok_or_else(|| Error::validation("Guest email is required"))?,
            phone,
        }),
    }
}

fn validate_stay(
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: u32,
    today: NaiveDate,
) -> Result<StayDates> {
    let stay = StayDates::new(check_in, check_out)?;
    if check_in < today {
        return Err(Error::validation("Check-in date cannot be in the past"));
    }
    if guests == 0 {
        return Err(Error::validation("Number of guests must be at least 1"));
    }
    Ok(stay)
}

/// Whether `actor` is the guest on `reservation`
fn owns(actor: &User, reservation: &Reservation) -> bool {
    reservation.guest_id == Some(actor.id)
        || reservation.guest_email.eq_ignore_ascii_case(&actor.email)
}

/// Guest-initiated changes must leave a full day before arrival
fn outside_notice_window(check_in: NaiveDate, today: NaiveDate) -> bool {
    check_in >= today + Duration::days(1)
}

fn record_created(
    conn: &Connection,
    actor: Option<&User>,
    reservation: &Reservation,
) -> Result<()> {
    let changed_by = actor.map_or(reservation.guest_email.as_str(), |user| user.email.as_str());
    let entry = BookingHistoryEntry::new(reservation, BookingAction::Created, changed_by)
        .with_changes(None, BookingHistoryEntry::snapshot(reservation));
    BookingHistoryStore::new(conn).record(&entry)
}

fn active_hotel(conn: &Connection, hotel_id: Uuid) -> Result<Hotel> {
    HotelStore::new(conn)
        .find_by_id(TenantScope::System, hotel_id)?
        .filter(|hotel| hotel.is_active)
        .ok_or_else(|| Error::not_found("Hotel", hotel_id))
}

/// Free versus total rooms per type for a stay, with the cheapest free rate
pub fn room_type_availability<S: InventoryRepository>(
    store: &S,
    hotel_id: Uuid,
    stay: &StayDates,
    guests: u32,
) -> Result<Vec<RoomTypeAvailability>> {
    let rooms = store.hotel_rooms(hotel_id, RoomFilter::default())?;
    let free = store.free_rooms(hotel_id, stay, guests, None)?;

    let mut summary = Vec::new();
    for room_type in RoomType::ALL {
        let of_type: Vec<&Room> = rooms.iter().filter(|r| r.room_type == *room_type).collect();
        if of_type.is_empty() {
            continue;
        }
        let free_of_type: Vec<&Room> = free.iter().filter(|r| r.room_type == *room_type).collect();
        summary.push(RoomTypeAvailability {
            room_type: *room_type,
            available_rooms: free_of_type.len() as u32,
            total_rooms: of_type.len() as u32,
            min_price: free_of_type.iter().map(|r| r.price_per_night).min(),
            max_capacity: of_type.iter().map(|r| r.capacity).max().unwrap_or_default(),
        });
    }
    Ok(summary)
}

pub struct BookingService<'a> {
    db: &'a Database,
    policy: PricingPolicy,
}

impl<'a> BookingService<'a> {
    pub fn new(db: &'a Database, policy: PricingPolicy) -> Self {
        Self { db, policy }
    }

    /// Book a specific room. `actor` is `None` for anonymous guests.
    #[instrument(skip(self, actor, request), fields(room_id = %request.room_id))]
    pub fn create_booking(
        &self,
        actor: Option<&User>,
        request: &BookingRequest,
        today: NaiveDate,
    ) -> Result<Reservation> {
        if let Some(actor) = actor {
            require(actor, Action::MakeBookings)?;
        }
        let stay = validate_stay(request.check_in, request.check_out, request.guests, today)?;
        let guest = resolve_guest(actor, &request.guest)?;
        let scope = match actor {
            Some(actor) => TenantScope::for_user(actor)?,
            None => TenantScope::System,
        };

        self.db.transaction(|conn| {
            let room = RoomStore::new(conn)
                .find_by_id(scope, request.room_id)?
                .ok_or_else(|| Error::not_found("Room", request.room_id))?;
            let reservation =
                self.book_room(conn, &room, stay, request.guests, guest, &request.guest, today)?;
            record_created(conn, actor, &reservation)?;
            Ok(reservation)
        })
    }

    /// Book the first free room of the requested type, by room number
    #[instrument(
        skip(self, actor, request),
        fields(hotel_id = %request.hotel_id, room_type = %request.room_type)
    )]
    pub fn create_booking_by_room_type(
        &self,
        actor: Option<&User>,
        request: &RoomTypeBookingRequest,
        today: NaiveDate,
    ) -> Result<Reservation> {
        if let Some(actor) = actor {
            require(actor, Action::MakeBookings)?;
        }
        let stay = validate_stay(request.check_in, request.check_out, request.guests, today)?;
        let guest = resolve_guest(actor, &request.guest)?;
        let scope = match actor {
            Some(actor) => TenantScope::for_user(actor)?,
            None => TenantScope::System,
        };

        self.db.transaction(|conn| {
            HotelStore::new(conn)
                .find_by_id(scope, request.hotel_id)?
                .ok_or_else(|| Error::not_found("Hotel", request.hotel_id))?;
            let room = RoomStore::new(conn)
                .find_available(request.hotel_id, &stay, request.guests, Some(request.room_type))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    Error::Conflict(format!(
                        "No {} rooms available from {} to {}",
                        request.room_type, request.check_in, request.check_out
                    ))
                })?;
            let reservation =
                self.book_room(conn, &room, stay, request.guests, guest, &request.guest, today)?;
            record_created(conn, actor, &reservation)?;
            Ok(reservation)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn book_room(
        &self,
        conn: &Connection,
        room: &Room,
        stay: StayDates,
        guests: u32,
        guest: Guest,
        details: &GuestDetails,
        today: NaiveDate,
    ) -> Result<Reservation> {
        let hotel = active_hotel(conn, room.hotel_id)?;
        if !room.is_bookable() {
            return Err(Error::validation(format!(
                "Room {} is not available for booking",
                room.room_number
            )));
        }
        if !room.fits(guests) {
            return Err(Error::validation(format!(
                "Room {} holds at most {} guests",
                room.room_number, room.capacity
            )));
        }

        let (quote, promotion) = self.quote_stay(
            conn,
            hotel.id,
            room.room_type,
            room.price_per_night,
            stay,
            today,
            details.promo_code.as_deref(),
        )?;
        if let Some(reason) = quote.promo_error {
            return Err(Error::Validation(reason));
        }

        let now = Utc::now();
        let mut reservation = Reservation {
            id: Uuid::new_v4(),
            tenant_id: room.tenant_id,
            hotel_id: hotel.id,
            room_id: room.id,
            guest_id: guest.id,
            guest_name: guest.name,
            guest_email: guest.email,
            guest_phone: guest.phone,
            confirmation_number: String::new(),
            check_in: stay.check_in(),
            check_out: stay.check_out(),
            guests,
            total_amount: quote.final_total,
            status: ReservationStatus::Confirmed,
            promo_code: quote.promo_code.clone(),
            special_requests: optional(details.special_requests.clone()),
            payment_method: optional(details.payment_method.clone()),
            cancellation_reason: None,
            cancelled_at: None,
            actual_check_in: None,
            actual_check_out: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        ReservationStore::new(conn).create_if_free(&mut reservation)?;

        if let (Some(promo), Some(_)) = (promotion, quote.promo_code) {
            PricingStore::new(conn).record_promo_use(promo.id)?;
        }

        info!(
            confirmation = %reservation.confirmation_number,
            hotel_id = %hotel.id,
            room = %room.room_number,
            total = %reservation.total_amount,
            "Booking confirmed"
        );
        Ok(reservation)
    }

    #[allow(clippy::too_many_arguments)]
    fn quote_stay(
        &self,
        conn: &Connection,
        hotel_id: Uuid,
        room_type: RoomType,
        base_rate: Decimal,
        stay: StayDates,
        today: NaiveDate,
        promo_code: Option<&str>,
    ) -> Result<(PriceQuote, Option<PromotionalCode>)> {
        let promo_code = promo_code.map(str::trim).filter(|c| !c.is_empty());
        let promotion = match promo_code {
            Some(code) => PricingStore::new(conn).find_promo_by_code(hotel_id, code)?,
            None => None,
        };
        let quote = self.price(
            conn,
            hotel_id,
            room_type,
            base_rate,
            stay,
            today,
            promo_code,
            promotion.as_ref(),
        )?;
        Ok((quote, promotion))
    }

    #[allow(clippy::too_many_arguments)]
    fn price(
        &self,
        conn: &Connection,
        hotel_id: Uuid,
        room_type: RoomType,
        base_rate: Decimal,
        stay: StayDates,
        today: NaiveDate,
        promo_code: Option<&str>,
        promotion: Option<&PromotionalCode>,
    ) -> Result<PriceQuote> {
        let pricing = PricingStore::new(conn);
        let strategies = pricing.list_strategies(hotel_id)?;
        let seasons = pricing.list_seasons(hotel_id)?;
        let input = QuoteInput {
            room_type,
            base_rate_per_night: base_rate,
            stay,
            booking_date: today,
            occupancy_rate: occupancy_rate(conn, hotel_id, stay.check_in())?,
            promo_code,
            promotion,
        };
        Ok(PriceCalculator::new(self.policy).quote(&input, &strategies, &seasons))
    }

    /// Price a stay for a room type at the type's lowest nightly rate
    #[instrument(skip(self))]
    pub fn quote(
        &self,
        hotel_id: Uuid,
        room_type: RoomType,
        check_in: NaiveDate,
        check_out: NaiveDate,
        promo_code: Option<&str>,
        today: NaiveDate,
    ) -> Result<PriceQuote> {
        let stay = StayDates::new(check_in, check_out)?;
        self.db.transaction(|conn| {
            active_hotel(conn, hotel_id)?;
            let filter = RoomFilter {
                room_type: Some(room_type),
                ..RoomFilter::default()
            };
            let base_rate = RoomStore::new(conn)
                .list_by_hotel(hotel_id, filter)?
                .iter()
                .map(|r| r.price_per_night)
                .min()
                .ok_or_else(|| Error::NotFound(format!("Hotel has no {room_type} rooms")))?;
            let (quote, _) =
                self.quote_stay(conn, hotel_id, room_type, base_rate, stay, today, promo_code)?;
            Ok(quote)
        })
    }

    /// Rooms of an active hotel free for the whole stay
    pub fn available_rooms(
        &self,
        hotel_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
        room_type: Option<RoomType>,
    ) -> Result<Vec<Room>> {
        let stay = StayDates::new(check_in, check_out)?;
        active_hotel(self.db.connection(), hotel_id)?;
        self.db.free_rooms(hotel_id, &stay, guests.max(1), room_type)
    }

    pub fn room_types(
        &self,
        hotel_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
    ) -> Result<Vec<RoomTypeAvailability>> {
        let stay = StayDates::new(check_in, check_out)?;
        active_hotel(self.db.connection(), hotel_id)?;
        room_type_availability(self.db, hotel_id, &stay, guests.max(1))
    }

    /// Active hotels matching a free-text query and optional city
    pub fn search_hotels(
        &self,
        query: Option<String>,
        city: Option<String>,
        page: PageRequest,
    ) -> Result<Page<Hotel>> {
        let filter = HotelFilter {
            query: optional(query),
            city: optional(city),
            active_only: true,
        };
        self.db.hotels().list(TenantScope::System, &filter, page)
    }

    pub fn hotel(&self, hotel_id: Uuid) -> Result<Hotel> {
        active_hotel(self.db.connection(), hotel_id)
    }

    /// A booking visible to its guest or to staff of its hotel
    pub fn find_booking(&self, actor: &User, id: Uuid) -> Result<Reservation> {
        let scope = TenantScope::for_user(actor)?;
        self.db
            .find_reservation(scope, id)?
            .filter(|r| {
                owns(actor, r)
                    || (PermissionMatrix::allows(actor, Action::ViewBookings)
                        && works_at(actor, r.hotel_id))
            })
            .ok_or_else(|| Error::not_found("Booking", id))
    }

    /// Public lookup; the email must match the booking
    pub fn lookup(&self, confirmation_number: &str, email: &str) -> Result<Reservation> {
        self.db
            .find_reservation_by_confirmation(confirmation_number)?
            .filter(|r| r.guest_email.eq_ignore_ascii_case(email.trim()))
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Booking not found with confirmation number: {}",
                    confirmation_number.trim()
                ))
            })
    }

    pub fn my_bookings(&self, actor: &User) -> Result<Vec<Reservation>> {
        self.db.reservations().list_by_guest(actor.id, &actor.email)
    }

    /// Staff search by guest name, room number or confirmation number
    pub fn search(
        &self,
        actor: &User,
        mut filter: ReservationFilter,
        page: PageRequest,
    ) -> Result<Page<Reservation>> {
        require(actor, Action::ViewBookings)?;
        let scope = TenantScope::for_user(actor)?;
        if !actor.is_system_admin() && !actor.has_role(UserRole::HotelAdmin) {
            if let Some(own) = actor.hotel_id {
                filter.hotel_id = Some(own);
            }
        }
        self.db.reservations().search(scope, &filter, page)
    }

    /// Change the dates, room or party size of an upcoming booking. The
    /// stay is re-validated and re-priced; the room must be free for the new
    /// dates apart from this booking itself.
    #[instrument(skip(self, actor, changes), fields(user_id = %actor.id))]
    pub fn modify_booking(
        &self,
        actor: &User,
        id: Uuid,
        changes: &BookingModification,
        today: NaiveDate,
    ) -> Result<ModificationResult> {
        self.db.transaction(|conn| {
            let store = ReservationStore::new(conn);
            let mut reservation = store
                .find_by_id(TenantScope::System, id)?
                .filter(|r| owns(actor, r))
                .ok_or_else(|| Error::not_found("Booking", id))?;

            if !matches!(
                reservation.status,
                ReservationStatus::Pending | ReservationStatus::Confirmed
            ) {
                return Err(Error::invalid_state(format!(
                    "Cannot modify a booking with status {}",
                    reservation.status
                )));
            }
            if !outside_notice_window(reservation.check_in, today) {
                return Err(Error::validation(
                    "Bookings cannot be modified less than 24 hours before check-in",
                ));
            }

            let check_in = changes.check_in.unwrap_or(reservation.check_in);
            let check_out = changes.check_out.unwrap_or(reservation.check_out);
            let guests = changes.guests.unwrap_or(reservation.guests);
            let stay = validate_stay(check_in, check_out, guests, today)?;
            if !outside_notice_window(check_in, today) {
                return Err(Error::validation("New check-in date must be at least 24 hours away"));
            }

            let rooms = RoomStore::new(conn);
            let current = rooms
                .find_by_id(TenantScope::System, reservation.room_id)?
                .ok_or_else(|| Error::not_found("Room", reservation.room_id))?;
            let room = match (changes.room_id, changes.room_type) {
                (Some(room_id), _) => rooms
                    .find_by_id(TenantScope::System, room_id)?
                    .filter(|room| room.hotel_id == reservation.hotel_id)
                    .ok_or_else(|| Error::not_found("Room", room_id))?,
                (None, Some(room_type)) if room_type != current.room_type => rooms
                    .find_available(reservation.hotel_id, &stay, guests, Some(room_type))?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        Error::Conflict(format!(
                            "No {room_type} rooms available from {check_in} to {check_out}"
                        ))
                    })?,
                _ => current,
            };

            if room.id != reservation.room_id && !room.is_bookable() {
                return Err(Error::validation(format!(
                    "Room {} is not available for booking",
                    room.room_number
                )));
            }
            if !room.fits(guests) {
                return Err(Error::validation(format!(
                    "Room {} holds at most {} guests",
                    room.room_number, room.capacity
                )));
            }
            if store.has_overlap(room.id, &stay, Some(reservation.id))? {
                return Err(Error::Conflict(format!(
                    "Room {} is already booked between {} and {}",
                    room.room_number, check_in, check_out
                )));
            }

            // The booking already holds one use of its promotion
            let promotion = match reservation.promo_code.as_deref() {
                Some(code) => PricingStore::new(conn)
                    .find_promo_by_code(reservation.hotel_id, code)?
                    .map(|mut promo| {
                        promo.usage_count = promo.usage_count.saturating_sub(1);
                        promo
                    }),
                None => None,
            };
            let quote = self.price(
                conn,
                reservation.hotel_id,
                room.room_type,
                room.price_per_night,
                stay,
                today,
                promotion.as_ref().map(|promo| promo.code.as_str()),
                promotion.as_ref(),
            )?;
            if let Some(reason) = quote.promo_error {
                return Err(Error::Validation(reason));
            }

            let before = BookingHistoryEntry::snapshot(&reservation);
            let previous_total = reservation.total_amount;
            reservation.room_id = room.id;
            reservation.check_in = check_in;
            reservation.check_out = check_out;
            reservation.guests = guests;
            reservation.total_amount = quote.final_total;
            if changes.special_requests.is_some() {
                reservation.special_requests = optional(changes.special_requests.clone());
            }
            store.update(&mut reservation)?;

            let changed_by = actor.email.as_str();
            let entry = BookingHistoryEntry::new(&reservation, BookingAction::Modified, changed_by)
                .with_reason(optional(changes.reason.clone()))
                .with_changes(Some(before), BookingHistoryEntry::snapshot(&reservation));
            BookingHistoryStore::new(conn).record(&entry)?;

            let difference = reservation.total_amount - previous_total;
            info!(
                confirmation = %reservation.confirmation_number,
                room = %room.room_number,
                difference = %difference,
                "Booking modified by guest"
            );
            Ok(ModificationResult {
                reservation,
                previous_total,
                additional_charges: difference.max(Decimal::ZERO),
                refund_amount: (-difference).max(Decimal::ZERO),
            })
        })
    }

    /// Guest cancellation, refused within 24 hours of check-in. The refund
    /// shrinks as arrival gets closer.
    #[instrument(skip(self, actor, reason), fields(user_id = %actor.id))]
    pub fn cancel_booking(
        &self,
        actor: &User,
        id: Uuid,
        reason: Option<String>,
        today: NaiveDate,
    ) -> Result<CancellationResult> {
        self.db.transaction(|conn| {
            let store = ReservationStore::new(conn);
            let mut reservation = store
                .find_by_id(TenantScope::System, id)?
                .filter(|r| owns(actor, r))
                .ok_or_else(|| Error::not_found("Booking", id))?;

            reservation.transition_to(ReservationStatus::Cancelled)?;
            if !outside_notice_window(reservation.check_in, today) {
                return Err(Error::validation(
                    "Bookings cannot be cancelled less than 24 hours before check-in",
                ));
            }
            let notice_days = (reservation.check_in - today).num_days();
            let refund_amount = cancellation_refund(reservation.total_amount, notice_days);
            let before = BookingHistoryEntry::snapshot(&reservation);
            reservation.cancellation_reason =
                optional(reason).or_else(|| Some("Cancelled by guest".into()));
            reservation.cancelled_at = Some(Utc::now());
            store.update(&mut reservation)?;
            super::front_desk::release_room(conn, reservation.room_id)?;

            let mut after = BookingHistoryEntry::snapshot(&reservation);
            after["refund_amount"] = serde_json::json!(refund_amount);
            let changed_by = actor.email.as_str();
            let entry = BookingHistoryEntry::new(&reservation, BookingAction::Cancelled, changed_by)
                .with_reason(reservation.cancellation_reason.clone())
                .with_changes(Some(before), after);
            BookingHistoryStore::new(conn).record(&entry)?;

            info!(
                confirmation = %reservation.confirmation_number,
                refund = %refund_amount,
                "Booking cancelled by guest"
            );
            Ok(CancellationResult {
                reservation,
                refund_amount,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::DiscountType;
    use crate::services::testing::{date, today, World};

    fn request(world: &World, check_in: NaiveDate, check_out: NaiveDate) -> BookingRequest {
        BookingRequest {
            room_id: world.room.id,
            check_in,
            check_out,
            guests: 2,
            guest: GuestDetails {
                guest_name: Some("Sara Tesfaye".into()),
                guest_email: Some("Sara@Example.com".into()),
                ..GuestDetails::default()
            },
        }
    }

    fn service(world: &World) -> BookingService<'_> {
        BookingService::new(&world.db, PricingPolicy::default())
    }

    #[test]
    fn test_anonymous_booking_is_confirmed_and_priced() {
        let world = World::new();
        let booking = service(&world)
            .create_booking(None, &request(&world, date(3, 10), date(3, 12)), today())
            .unwrap();

        assert_eq!(booking.status, ReservationStatus::Confirmed);
        assert_eq!(booking.confirmation_number, "BK00000001");
        assert_eq!(booking.guest_email, "sara@example.com");
        assert_eq!(booking.guest_id, None);
        // 2 nights at 100 plus 15% tax
        assert_eq!(booking.total_amount, dec!(230));
    }

    #[test]
    fn test_public_hotel_search_skips_inactive_hotels() {
        let world = World::new();
        let bookings = service(&world);

        let found = bookings
            .search_hotels(Some("lakeside".into()), None, PageRequest::default())
            .unwrap();
        assert_eq!(found.total_elements, 1);
        assert_eq!(bookings.hotel(world.hotel.id).unwrap().name, "Lakeside Resort");

        world.db.hotels().set_active(world.hotel.id, false).unwrap();
        let found =
            bookings.search_hotels(None, Some("Bahir Dar".into()), PageRequest::default()).unwrap();
        assert!(found.content.is_empty());
        assert!(matches!(bookings.hotel(world.hotel.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_double_booking_conflicts() {
        let world = World::new();
        let bookings = service(&world);
        bookings
            .create_booking(None, &request(&world, date(3, 10), date(3, 14)), today())
            .unwrap();

        let clash =
            bookings.create_booking(None, &request(&world, date(3, 13), date(3, 15)), today());
        assert!(matches!(clash, Err(Error::Conflict(_))));

        bookings
            .create_booking(None, &request(&world, date(3, 14), date(3, 15)), today())
            .unwrap();
    }

    #[test]
    fn test_request_validation() {
        let world = World::new();
        let bookings = service(&world);

        let past = request(&world, date(2, 20), date(2, 22));
        assert!(matches!(bookings.create_booking(None, &past, today()), Err(Error::Validation(_))));

        let inverted = request(&world, date(3, 12), date(3, 12));
        assert!(matches!(
            bookings.create_booking(None, &inverted, today()),
            Err(Error::Validation(_))
        ));

        let mut crowded = request(&world, date(3, 10), date(3, 11));
        crowded.guests = 3;
        assert!(matches!(
            bookings.create_booking(None, &crowded, today()),
            Err(Error::Validation(_))
        ));

        let mut nameless = request(&world, date(3, 10), date(3, 11));
        nameless.guest.guest_name = None;
        assert!(matches!(
            bookings.create_booking(None, &nameless, today()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_customer_defaults_and_my_bookings() {
        let world = World::new();
        let customer = world.customer("liya@example.com");
        let mut req = request(&world, date(4, 1), date(4, 3));
        req.guest = GuestDetails::default();

        let booking = service(&world).create_booking(Some(&customer), &req, today()).unwrap();
        assert_eq!(booking.guest_id, Some(customer.id));
        assert_eq!(booking.guest_name, "Liya Haile");

        let mine = service(&world).my_bookings(&customer).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(service(&world).find_booking(&customer, booking.id).unwrap().id, booking.id);

        let stranger = world.customer("other@example.com");
        assert!(matches!(
            service(&world).find_booking(&stranger, booking.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_book_by_room_type_takes_first_free_room() {
        let world = World::new();
        let second = Room::new(
            world.tenant.id,
            world.hotel.id,
            "102".into(),
            RoomType::Standard,
            dec!(90),
            2,
        );
        world.db.rooms().create(&second).unwrap();

        let req = RoomTypeBookingRequest {
            hotel_id: world.hotel.id,
            room_type: RoomType::Standard,
            check_in: date(5, 1),
            check_out: date(5, 2),
            guests: 1,
            guest: request(&world, date(5, 1), date(5, 2)).guest,
        };
        let bookings = service(&world);
        let first = bookings.create_booking_by_room_type(None, &req, today()).unwrap();
        let next = bookings.create_booking_by_room_type(None, &req, today()).unwrap();
        assert_eq!(first.room_id, world.room.id);
        assert_eq!(next.room_id, second.id);
        assert!(matches!(
            bookings.create_booking_by_room_type(None, &req, today()),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_promo_code_is_applied_and_counted() {
        let world = World::new();
        let mut promo = PromotionalCode::new(
            world.hotel.id,
            "welcome",
            "Welcome".into(),
            DiscountType::Percentage,
            dec!(10),
            date(1, 1),
            date(12, 31),
        );
        promo.usage_limit = Some(1);
        world.db.pricing().create_promo(&promo).unwrap();

        let mut req = request(&world, date(6, 1), date(6, 3));
        req.guest.promo_code = Some("WELCOME".into());
        let booking = service(&world).create_booking(None, &req, today()).unwrap();
        // (200 - 20) * 1.15
        assert_eq!(booking.total_amount, dec!(207));
        assert_eq!(booking.promo_code.as_deref(), Some("WELCOME"));

        let mut again = request(&world, date(7, 1), date(7, 3));
        again.guest.promo_code = Some("welcome".into());
        assert!(matches!(
            service(&world).create_booking(None, &again, today()),
            Err(Error::Validation(_))
        ));

        again.guest.promo_code = Some("NOPE".into());
        assert!(service(&world).create_booking(None, &again, today()).is_err());
    }

    #[test]
    fn test_guest_cancellation_window() {
        let world = World::new();
        let customer = world.customer("liya@example.com");
        let bookings = service(&world);
        let mut req = request(&world, date(3, 2), date(3, 4));
        req.guest = GuestDetails::default();
        let tomorrow = bookings.create_booking(Some(&customer), &req, today()).unwrap();

        // check-in tomorrow is fine, today is not
        let cancelled = bookings.cancel_booking(&customer, tomorrow.id, None, today()).unwrap();
        assert_eq!(cancelled.reservation.status, ReservationStatus::Cancelled);
        assert!(cancelled.reservation.cancelled_at.is_some());
        assert_eq!(cancelled.refund_amount, (tomorrow.total_amount * dec!(0.25)).round_dp(2));

        let again = bookings.create_booking(Some(&customer), &req, today()).unwrap();
        assert!(matches!(
            bookings.cancel_booking(&customer, again.id, None, date(3, 2)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_cancellation_refund_by_notice() {
        let world = World::new();
        let customer = world.customer("liya@example.com");
        let bookings = service(&world);
        let mut req = request(&world, date(3, 20), date(3, 22));
        req.guest = GuestDetails::default();

        for (cancelled_on, share) in [
            (date(3, 12), dec!(1)),
            (date(3, 13), dec!(0.5)),
            (date(3, 17), dec!(0.5)),
            (date(3, 18), dec!(0.25)),
            (date(3, 19), dec!(0.25)),
        ] {
            let booking = bookings.create_booking(Some(&customer), &req, today()).unwrap();
            let result =
                bookings.cancel_booking(&customer, booking.id, None, cancelled_on).unwrap();
            assert_eq!(
                result.refund_amount,
                (booking.total_amount * share).round_dp(2),
                "cancelled on {cancelled_on}"
            );
        }
    }

    #[test]
    fn test_modify_dates_may_overlap_own_stay() {
        let world = World::new();
        let customer = world.customer("liya@example.com");
        let bookings = service(&world);
        let mut req = request(&world, date(3, 10), date(3, 12));
        req.guest = GuestDetails::default();
        let booking = bookings.create_booking(Some(&customer), &req, today()).unwrap();

        let shift = BookingModification {
            check_in: Some(date(3, 11)),
            check_out: Some(date(3, 14)),
            reason: Some("Flight moved".into()),
            ..BookingModification::default()
        };
        let result = bookings.modify_booking(&customer, booking.id, &shift, today()).unwrap();
        assert_eq!(result.reservation.check_in, date(3, 11));
        assert_eq!(result.reservation.nights(), 3);
        assert_eq!(result.reservation.version, booking.version + 1);
        assert_eq!(result.previous_total, booking.total_amount);
        assert!(result.additional_charges > Decimal::ZERO);
        assert_eq!(result.refund_amount, Decimal::ZERO);

        let history = world.db.booking_history().list_by_reservation(booking.id).unwrap();
        let actions: Vec<_> = history.iter().map(|e| e.action).collect();
        assert_eq!(actions, [BookingAction::Created, BookingAction::Modified]);
        assert_eq!(history[1].reason.as_deref(), Some("Flight moved"));
        let old = history[1].old_values.as_ref().unwrap();
        assert_eq!(old["check_in"], "2030-03-10");
    }

    #[test]
    fn test_modify_into_taken_dates_conflicts() {
        let world = World::new();
        let customer = world.customer("liya@example.com");
        let bookings = service(&world);
        let mut req = request(&world, date(3, 10), date(3, 12));
        req.guest = GuestDetails::default();
        let booking = bookings.create_booking(Some(&customer), &req, today()).unwrap();
        bookings
            .create_booking(None, &request(&world, date(3, 12), date(3, 14)), today())
            .unwrap();

        let longer = BookingModification {
            check_out: Some(date(3, 13)),
            ..BookingModification::default()
        };
        assert!(matches!(
            bookings.modify_booking(&customer, booking.id, &longer, today()),
            Err(Error::Conflict(_))
        ));
        let unchanged =
            world.db.reservations().find_by_id(TenantScope::System, booking.id).unwrap().unwrap();
        assert_eq!(unchanged.check_out, date(3, 12));
        assert_eq!(unchanged.version, booking.version);

        // the suite is free, so a change of room type goes through
        let upgrade = BookingModification {
            room_type: Some(RoomType::Suite),
            ..longer
        };
        let result = bookings.modify_booking(&customer, booking.id, &upgrade, today()).unwrap();
        assert_eq!(result.reservation.room_id, world.suite.id);
        assert!(result.reservation.total_amount > booking.total_amount);
    }

    #[test]
    fn test_modify_refused_close_to_arrival_or_after_check_in() {
        let world = World::new();
        let customer = world.customer("liya@example.com");
        let bookings = service(&world);
        let mut req = request(&world, date(3, 2), date(3, 4));
        req.guest = GuestDetails::default();
        let booking = bookings.create_booking(Some(&customer), &req, today()).unwrap();

        let later = BookingModification {
            check_out: Some(date(3, 5)),
            ..BookingModification::default()
        };
        assert!(matches!(
            bookings.modify_booking(&customer, booking.id, &later, date(3, 2)),
            Err(Error::Validation(_))
        ));
        let earlier = BookingModification {
            check_in: Some(date(3, 1)),
            ..BookingModification::default()
        };
        assert!(matches!(
            bookings.modify_booking(&customer, booking.id, &earlier, today()),
            Err(Error::Validation(_))
        ));

        let stranger = world.customer("other@example.com");
        assert!(matches!(
            bookings.modify_booking(&stranger, booking.id, &later, today()),
            Err(Error::NotFound(_))
        ));

        let desk = world.staff(UserRole::Frontdesk);
        crate::services::FrontDeskService::new(&world.db)
            .check_in(&desk, booking.id, None, today(), Utc::now())
            .unwrap();
        assert!(matches!(
            bookings.modify_booking(&customer, booking.id, &later, today()),
            Err(Error::InvalidState(_))
        ));

        let mut req = request(&world, date(4, 2), date(4, 4));
        req.guest = GuestDetails::default();
        let cancelled = bookings.create_booking(Some(&customer), &req, today()).unwrap();
        bookings.cancel_booking(&customer, cancelled.id, None, today()).unwrap();
        assert!(matches!(
            bookings.modify_booking(&customer, cancelled.id, &later, today()),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_lookup_requires_matching_email() {
        let world = World::new();
        let booking = service(&world)
            .create_booking(None, &request(&world, date(3, 10), date(3, 11)), today())
            .unwrap();

        let found = service(&world).lookup("bk00000001", "SARA@example.com").unwrap();
        assert_eq!(found.id, booking.id);
        assert!(service(&world).lookup("BK00000001", "someone@else.com").is_err());
    }

    #[test]
    fn test_staff_search_is_limited_to_own_hotel() {
        let world = World::new();
        service(&world)
            .create_booking(None, &request(&world, date(3, 10), date(3, 11)), today())
            .unwrap();

        let desk = world.staff(UserRole::Frontdesk);
        let filter = ReservationFilter {
            query: Some("Sara".into()),
            ..ReservationFilter::default()
        };
        let page = service(&world).search(&desk, filter.clone(), PageRequest::default()).unwrap();
        assert_eq!(page.total_elements, 1);

        let customer = world.customer("liya@example.com");
        assert!(matches!(
            service(&world).search(&customer, filter, PageRequest::default()),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_room_type_summary_and_quote() {
        let world = World::new();
        let bookings = service(&world);
        bookings
            .create_booking(None, &request(&world, date(3, 10), date(3, 12)), today())
            .unwrap();

        let summary = bookings.room_types(world.hotel.id, date(3, 11), date(3, 13), 1).unwrap();
        let standard = summary.iter().find(|s| s.room_type == RoomType::Standard).unwrap();
        assert_eq!((standard.available_rooms, standard.total_rooms), (0, 1));
        assert_eq!(standard.min_price, None);
        let suite = summary.iter().find(|s| s.room_type == RoomType::Suite).unwrap();
        assert_eq!(suite.min_price, Some(dec!(250)));

        let free = bookings
            .available_rooms(world.hotel.id, date(3, 11), date(3, 13), 1, None)
            .unwrap();
        assert_eq!(free.len(), 1);

        let quote = bookings
            .quote(world.hotel.id, RoomType::Suite, date(4, 1), date(4, 2), None, today())
            .unwrap();
        assert_eq!(quote.final_total, dec!(287.5));
        assert!(bookings
            .quote(world.hotel.id, RoomType::Presidential, date(4, 1), date(4, 2), None, today())
            .is_err());
    }
}

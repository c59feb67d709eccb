//! Guest folio charges

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::front_desk::load_reservation;
use super::{optional, required, staff_hotel};
use crate::error::{Error, Result};
use crate::models::{ConsolidatedReceipt, ReservationStatus, RoomCharge, RoomChargeType, User};
use crate::permissions::Action;
use crate::scope::TenantScope;
use crate::storage::{Database, RoomChargeStore, RoomStore};

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoomCharge {
    pub reservation_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    #[serde(default = "default_charge_type")]
    pub charge_type: RoomChargeType,
}

fn default_charge_type() -> RoomChargeType {
    RoomChargeType::Other
}

pub struct ChargeService<'a> {
    db: &'a Database,
}

impl<'a> ChargeService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn load(&self, conn: &Connection, actor: &User, charge_id: Uuid) -> Result<RoomCharge> {
        let scope = TenantScope::for_user(actor)?;
        let charge = RoomChargeStore::new(conn)
            .find_by_id(scope, charge_id)?
            .ok_or_else(|| Error::not_found("Room charge", charge_id))?;
        staff_hotel(conn, actor, Action::ManageRoomCharges, charge.hotel_id)
            .map_err(|_| Error::not_found("Room charge", charge_id))?;
        Ok(charge)
    }

    #[instrument(skip(self, actor, request), fields(reservation_id = %request.reservation_id))]
    pub fn create(
        &self,
        actor: &User,
        hotel_id: Uuid,
        request: NewRoomCharge,
    ) -> Result<RoomCharge> {
        let description = required(&request.description, "Description")?;
        if request.amount <= Decimal::ZERO {
            return Err(Error::validation("Charge amount must be positive"));
        }
        self.db.transaction(|conn| {
            staff_hotel(conn, actor, Action::ManageRoomCharges, hotel_id)?;
            let reservation =
                load_reservation(conn, actor, Action::ManageRoomCharges, request.reservation_id)?;
            if reservation.hotel_id != hotel_id {
                return Err(Error::validation("Booking belongs to another hotel"));
            }
            if matches!(
                reservation.status,
                ReservationStatus::Cancelled | ReservationStatus::NoShow
            ) {
                return Err(Error::invalid_state(format!(
                    "Cannot charge a {} booking",
                    reservation.status
                )));
            }

            let mut charge = RoomCharge::new(
                hotel_id,
                reservation.id,
                description,
                request.amount.round_dp(2),
                request.charge_type,
            );
            charge.created_by = Some(actor.id);
            RoomChargeStore::new(conn).create(&charge)?;
            info!(
                charge_id = %charge.id,
                amount = %charge.amount,
                booking = %reservation.confirmation_number,
                "Room charge posted"
            );
            Ok(charge)
        })
    }

    pub fn list_for_reservation(
        &self,
        actor: &User,
        reservation_id: Uuid,
    ) -> Result<Vec<RoomCharge>> {
        let conn = self.db.connection();
        load_reservation(conn, actor, Action::ManageRoomCharges, reservation_id)?;
        RoomChargeStore::new(conn).list_by_reservation(reservation_id)
    }

    pub fn unpaid_total(&self, actor: &User, reservation_id: Uuid) -> Result<Decimal> {
        let conn = self.db.connection();
        load_reservation(conn, actor, Action::ManageRoomCharges, reservation_id)?;
        RoomChargeStore::new(conn).unpaid_total(reservation_id)
    }

    pub fn unpaid_for_hotel(&self, actor: &User, hotel_id: Uuid) -> Result<Vec<RoomCharge>> {
        staff_hotel(self.db.connection(), actor, Action::ManageRoomCharges, hotel_id)?;
        self.db.room_charges().list_unpaid_by_hotel(hotel_id)
    }

    /// Mark a charge paid or reopen it
    #[instrument(skip(self, actor, reference))]
    pub fn set_paid(
        &self,
        actor: &User,
        charge_id: Uuid,
        paid: bool,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RoomCharge> {
        self.db.transaction(|conn| {
            let mut charge = self.load(conn, actor, charge_id)?;
            charge.is_paid = paid;
            charge.paid_at = paid.then_some(now);
            charge.payment_reference = if paid { optional(reference) } else { None };
            RoomChargeStore::new(conn).set_paid(
                charge.id,
                charge.paid_at,
                charge.payment_reference.as_deref(),
            )?;
            Ok(charge)
        })
    }

    pub fn delete(&self, actor: &User, charge_id: Uuid) -> Result<()> {
        self.db.transaction(|conn| {
            let charge = self.load(conn, actor, charge_id)?;
            if charge.is_paid {
                return Err(Error::invalid_state("Paid charges cannot be deleted"));
            }
            RoomChargeStore::new(conn).delete(charge.id)
        })
    }

    /// Folio for a booking: the stay plus every posted charge
    pub fn receipt(&self, actor: &User, reservation_id: Uuid) -> Result<ConsolidatedReceipt> {
        let conn = self.db.connection();
        let reservation = load_reservation(conn, actor, Action::ManageRoomCharges, reservation_id)?;
        let room_number = RoomStore::new(conn)
            .find_by_id(TenantScope::System, reservation.room_id)?
            .map(|room| room.room_number)
            .unwrap_or_default();
        let charges = RoomChargeStore::new(conn).list_by_reservation(reservation.id)?;
        Ok(ConsolidatedReceipt::build(&reservation, room_number, charges))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{Reservation, UserRole};
    use crate::pricing::PricingPolicy;
    use crate::services::testing::{date, today, World};
    use crate::services::{BookingRequest, BookingService, FrontDeskService, GuestDetails};

    fn book(world: &World, check_in: NaiveDate, check_out: NaiveDate) -> Reservation {
        let request = BookingRequest {
            room_id: world.room.id,
            check_in,
            check_out,
            guests: 2,
            guest: GuestDetails {
                guest_name: Some("Hana Tesfaye".into()),
                guest_email: Some("hana@example.com".into()),
                ..GuestDetails::default()
            },
        };
        BookingService::new(&world.db, PricingPolicy::default())
            .create_booking(None, &request, today())
            .unwrap()
    }

    fn charge(reservation: &Reservation, amount: Decimal) -> NewRoomCharge {
        NewRoomCharge {
            reservation_id: reservation.id,
            description: "Minibar".into(),
            amount,
            charge_type: RoomChargeType::Minibar,
        }
    }

    #[test]
    fn test_folio_totals() {
        let world = World::new();
        let desk = world.staff(UserRole::Frontdesk);
        let service = ChargeService::new(&world.db);
        let booking = book(&world, date(3, 10), date(3, 12));

        let minibar = service.create(&desk, world.hotel.id, charge(&booking, dec!(18.40))).unwrap();
        let spa = service
            .create(
                &desk,
                world.hotel.id,
                NewRoomCharge {
                    reservation_id: booking.id,
                    description: "Massage".into(),
                    amount: dec!(60),
                    charge_type: RoomChargeType::Spa,
                },
            )
            .unwrap();
        assert_eq!(service.unpaid_total(&desk, booking.id).unwrap(), dec!(78.40));

        let paid = service
            .set_paid(&desk, spa.id, true, Some("POS-991".into()), Utc::now())
            .unwrap();
        assert!(paid.is_paid);
        assert_eq!(service.unpaid_total(&desk, booking.id).unwrap(), dec!(18.40));
        assert_eq!(service.unpaid_for_hotel(&desk, world.hotel.id).unwrap().len(), 1);

        let receipt = service.receipt(&desk, booking.id).unwrap();
        assert_eq!(receipt.room_number, "101");
        assert_eq!(receipt.charges_total, dec!(78.40));
        assert_eq!(receipt.paid_charges_total, dec!(60));
        assert_eq!(receipt.grand_total, booking.total_amount + dec!(78.40));

        assert!(matches!(service.delete(&desk, spa.id), Err(Error::InvalidState(_))));
        service.set_paid(&desk, spa.id, false, None, Utc::now()).unwrap();
        service.delete(&desk, spa.id).unwrap();
        service.delete(&desk, minibar.id).unwrap();
        assert!(service.list_for_reservation(&desk, booking.id).unwrap().is_empty());
    }

    #[test]
    fn test_charge_rules() {
        let world = World::new();
        let desk = world.staff(UserRole::Frontdesk);
        let service = ChargeService::new(&world.db);
        let booking = book(&world, date(3, 10), date(3, 12));

        assert!(matches!(
            service.create(&desk, world.hotel.id, charge(&booking, dec!(0))),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.create(&desk, Uuid::new_v4(), charge(&booking, dec!(5))),
            Err(Error::NotFound(_))
        ));
        let cleaner = world.staff(UserRole::Housekeeping);
        assert!(matches!(
            service.create(&cleaner, world.hotel.id, charge(&booking, dec!(5))),
            Err(Error::PermissionDenied(_))
        ));

        FrontDeskService::new(&world.db)
            .cancel(&desk, booking.id, Some("Guest called".into()), Utc::now())
            .unwrap();
        assert!(matches!(
            service.create(&desk, world.hotel.id, charge(&booking, dec!(5))),
            Err(Error::InvalidState(_))
        ));
    }
}

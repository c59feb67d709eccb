//! Hotel shop orders
//!
//! Creating an order moves stock and, for orders billed to the room,
//! posts a folio charge in the same transaction. Cancelling reverses both.

use chrono::{DateTime, Utc};
use rand::Rng;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::front_desk::load_reservation;
use super::{optional, staff_hotel};
use crate::error::{Error, Result};
use crate::models::{
    Hotel, OrderStatus, Page, PageRequest, PaymentMethod, Product, ProductCategory, RoomCharge,
    RoomChargeType, ShopOrder, ShopOrderItem, User,
};
use crate::permissions::Action;
use crate::scope::TenantScope;
use crate::storage::{Database, ProductStore, RoomChargeStore, RoomStore, ShopOrderStore};

/// Attempts at drawing an unused order number before giving up
const ORDER_NUMBER_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewShopOrder {
    pub items: Vec<OrderLine>,
    pub reservation_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub room_number: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub is_delivery: bool,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

fn next_order_number(conn: &Connection, hotel: &Hotel, now: DateTime<Utc>) -> Result<String> {
    let store = ShopOrderStore::new(conn);
    let mut rng = rand::thread_rng();
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = format!(
            "{}-{}-{:04}",
            hotel.order_prefix(),
            now.format("%Y%m%d"),
            rng.gen_range(0..10_000)
        );
        if !store.order_number_taken(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(Error::Conflict(format!(
        "Could not allocate an order number for {}",
        hotel.name
    )))
}

/// Put every line's quantity back on the shelf
fn restock(conn: &Connection, order: &ShopOrder) -> Result<()> {
    let products = ProductStore::new(conn);
    for item in &order.items {
        if let Some(mut product) = products.find_by_id(TenantScope::System, item.product_id)? {
            product.increase_stock(item.quantity);
            products.set_stock(product.id, product.stock_quantity)?;
        }
    }
    Ok(())
}

pub struct ShopService<'a> {
    db: &'a Database,
    tax_rate: Decimal,
}

impl<'a> ShopService<'a> {
    pub fn new(db: &'a Database, tax_rate: Decimal) -> Self {
        Self { db, tax_rate }
    }

    fn load(&self, conn: &Connection, actor: &User, order_id: Uuid) -> Result<ShopOrder> {
        let scope = TenantScope::for_user(actor)?;
        let order = ShopOrderStore::new(conn)
            .find_by_id(scope, order_id)?
            .ok_or_else(|| Error::not_found("Shop order", order_id))?;
        staff_hotel(conn, actor, Action::ManageShopOrders, order.hotel_id)
            .map_err(|_| Error::not_found("Shop order", order_id))?;
        Ok(order)
    }

    /// Products a hotel currently sells
    pub fn catalogue(
        &self,
        hotel_id: Uuid,
        category: Option<ProductCategory>,
    ) -> Result<Vec<Product>> {
        let hotel = self
            .db
            .hotels()
            .find_by_id(TenantScope::System, hotel_id)?
            .filter(|hotel| hotel.is_active)
            .ok_or_else(|| Error::not_found("Hotel", hotel_id))?;
        self.db.products().list_by_hotel(hotel.id, category, true)
    }

    #[instrument(
        skip(self, actor, request),
        fields(hotel_id = %hotel_id, lines = request.items.len())
    )]
    pub fn create_order(
        &self,
        actor: &User,
        hotel_id: Uuid,
        request: NewShopOrder,
        now: DateTime<Utc>,
    ) -> Result<ShopOrder> {
        if request.items.is_empty() {
            return Err(Error::validation("An order needs at least one item"));
        }
        if request.items.iter().any(|line| line.quantity == 0) {
            return Err(Error::validation("Item quantities must be positive"));
        }
        let billed_to_room = request.payment_method == Some(PaymentMethod::RoomCharge);
        if billed_to_room && request.reservation_id.is_none() {
            return Err(Error::validation("Room charge orders must be linked to a booking"));
        }

        self.db.transaction(|conn| {
            let hotel = staff_hotel(conn, actor, Action::ManageShopOrders, hotel_id)?;
            let scope = TenantScope::for_user(actor)?;

            let reservation = match request.reservation_id {
                Some(id) => {
                    let reservation = load_reservation(conn, actor, Action::ManageShopOrders, id)?;
                    if reservation.hotel_id != hotel.id {
                        return Err(Error::validation("Booking belongs to another hotel"));
                    }
                    if reservation.status.is_final() {
                        return Err(Error::invalid_state(format!(
                            "Cannot order against a {} booking",
                            reservation.status
                        )));
                    }
                    Some(reservation)
                }
                None => None,
            };

            let customer_name = optional(request.customer_name.clone())
                .or_else(|| reservation.as_ref().map(|r| r.guest_name.clone()))
                .ok_or_else(|| Error::validation("Customer name is required"))?;
            let room_number = match (&reservation, optional(request.room_number.clone())) {
                (_, Some(number)) => Some(number),
                (Some(r), None) => RoomStore::new(conn)
                    .find_by_id(TenantScope::System, r.room_id)?
                    .map(|room| room.room_number),
                (None, None) => None,
            };
            let delivery_address = optional(request.delivery_address.clone());
            if request.is_delivery && delivery_address.is_none() && room_number.is_none() {
                return Err(Error::validation("Delivery orders need an address or room"));
            }

            let order_id = Uuid::new_v4();
            let products = ProductStore::new(conn);
            let mut items = Vec::with_capacity(request.items.len());
            for line in &request.items {
                let mut product = products
                    .find_by_id(scope, line.product_id)?
                    .filter(|product| product.hotel_id == hotel.id)
                    .ok_or_else(|| Error::not_found("Product", line.product_id))?;
                if !product.is_active {
                    return Err(Error::validation(format!("{} is no longer sold", product.name)));
                }
                product.reduce_stock(line.quantity)?;
                products.set_stock(product.id, product.stock_quantity)?;
                items.push(ShopOrderItem {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: product.id,
                    product_name: product.name,
                    product_sku: product.sku,
                    quantity: line.quantity,
                    unit_price: product.price,
                });
            }

            let total_amount: Decimal = items.iter().map(ShopOrderItem::line_total).sum();
            let tax_amount = (total_amount * self.tax_rate).round_dp(2);
            let order = ShopOrder {
                id: order_id,
                tenant_id: hotel.tenant_id,
                hotel_id: hotel.id,
                order_number: next_order_number(conn, &hotel, now)?,
                reservation_id: reservation.as_ref().map(|r| r.id),
                customer_name,
                customer_email: optional(request.customer_email.clone())
                    .or_else(|| reservation.as_ref().map(|r| r.guest_email.clone())),
                room_number,
                status: OrderStatus::Pending,
                total_amount: total_amount.round_dp(2),
                tax_amount,
                payment_method: request.payment_method,
                is_delivery: request.is_delivery,
                delivery_address,
                is_paid: false,
                paid_at: None,
                payment_reference: None,
                notes: optional(request.notes.clone()),
                completed_at: None,
                created_at: now,
                updated_at: now,
                items,
            };
            ShopOrderStore::new(conn).create(&order)?;

            if let (true, Some(reservation)) = (billed_to_room, &reservation) {
                let mut charge = RoomCharge::new(
                    hotel.id,
                    reservation.id,
                    format!("Shop order {}", order.order_number),
                    order.grand_total(),
                    RoomChargeType::ShopPurchase,
                );
                charge.shop_order_id = Some(order.id);
                charge.created_by = Some(actor.id);
                charge.created_at = now;
                RoomChargeStore::new(conn).create(&charge)?;
            }

            info!(
                order_number = %order.order_number,
                total = %order.grand_total(),
                items = order.item_count(),
                "Shop order created"
            );
            Ok(order)
        })
    }

    #[instrument(skip(self, actor))]
    pub fn update_status(
        &self,
        actor: &User,
        order_id: Uuid,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<ShopOrder> {
        self.db.transaction(|conn| {
            let mut order = self.load(conn, actor, order_id)?;
            if !order.status.can_transition_to(status) {
                return Err(Error::invalid_state(format!(
                    "Shop order cannot move from {} to {}",
                    order.status, status
                )));
            }
            match status {
                OrderStatus::Cancelled => {
                    restock(conn, &order)?;
                    if let Some(reservation_id) = order.reservation_id {
                        let charges = RoomChargeStore::new(conn);
                        for charge in charges.list_by_reservation(reservation_id)? {
                            if charge.shop_order_id != Some(order.id) {
                                continue;
                            }
                            if charge.is_paid {
                                warn!(
                                    order_number = %order.order_number,
                                    "Cancelled order was already paid on the folio"
                                );
                            } else {
                                charges.delete(charge.id)?;
                            }
                        }
                    }
                }
                OrderStatus::Delivered => order.completed_at = Some(now),
                _ => {}
            }
            order.status = status;
            order.updated_at = now;
            ShopOrderStore::new(conn).update(&order)?;
            info!(order_number = %order.order_number, status = %order.status, "Shop order updated");
            Ok(order)
        })
    }

    /// Settle an order; folio charges it posted are settled with it
    pub fn mark_paid(
        &self,
        actor: &User,
        order_id: Uuid,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ShopOrder> {
        self.db.transaction(|conn| {
            let mut order = self.load(conn, actor, order_id)?;
            if order.is_paid {
                return Err(Error::invalid_state(format!(
                    "Order {} is already paid",
                    order.order_number
                )));
            }
            if order.status == OrderStatus::Cancelled {
                return Err(Error::invalid_state("Cancelled orders cannot be paid"));
            }
            order.is_paid = true;
            order.paid_at = Some(now);
            order.payment_reference = optional(reference);
            order.updated_at = now;
            ShopOrderStore::new(conn).update(&order)?;

            if let Some(reservation_id) = order.reservation_id {
                let charges = RoomChargeStore::new(conn);
                for charge in charges.list_by_reservation(reservation_id)? {
                    if charge.shop_order_id == Some(order.id) && !charge.is_paid {
                        charges.set_paid(charge.id, Some(now), order.payment_reference.as_deref())?;
                    }
                }
            }
            Ok(order)
        })
    }

    pub fn find(&self, actor: &User, order_id: Uuid) -> Result<ShopOrder> {
        self.load(self.db.connection(), actor, order_id)
    }

    pub fn find_by_number(&self, actor: &User, order_number: &str) -> Result<ShopOrder> {
        let conn = self.db.connection();
        let scope = TenantScope::for_user(actor)?;
        let order = ShopOrderStore::new(conn)
            .find_by_number(scope, order_number)?
            .ok_or_else(|| Error::NotFound(format!("Shop order not found: {order_number}")))?;
        staff_hotel(conn, actor, Action::ManageShopOrders, order.hotel_id)
            .map_err(|_| Error::NotFound(format!("Shop order not found: {order_number}")))?;
        Ok(order)
    }

    pub fn list(
        &self,
        actor: &User,
        hotel_id: Uuid,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<ShopOrder>> {
        staff_hotel(self.db.connection(), actor, Action::ManageShopOrders, hotel_id)?;
        self.db.shop_orders().list_by_hotel(hotel_id, status, page)
    }

    pub fn for_reservation(&self, actor: &User, reservation_id: Uuid) -> Result<Vec<ShopOrder>> {
        let conn = self.db.connection();
        load_reservation(conn, actor, Action::ManageShopOrders, reservation_id)?;
        ShopOrderStore::new(conn).list_by_reservation(reservation_id)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{Reservation, UserRole};
    use crate::pricing::PricingPolicy;
    use crate::services::testing::{date, today, World};
    use crate::services::{BookingRequest, BookingService, GuestDetails};

    fn product(world: &World, name: &str, price: Decimal, stock: u32) -> Product {
        let product = Product::new(
            world.tenant.id,
            world.hotel.id,
            name.into(),
            ProductCategory::Souvenirs,
            price,
            stock,
        );
        world.db.products().create(&product).unwrap();
        product
    }

    fn book(world: &World) -> Reservation {
        let request = BookingRequest {
            room_id: world.suite.id,
            check_in: date(3, 5),
            check_out: date(3, 7),
            guests: 2,
            guest: GuestDetails {
                guest_name: Some("Selam Bekele".into()),
                guest_email: Some("selam@example.com".into()),
                ..GuestDetails::default()
            },
        };
        BookingService::new(&world.db, PricingPolicy::default())
            .create_booking(None, &request, today())
            .unwrap()
    }

    fn stock(world: &World, id: Uuid) -> u32 {
        world.db.products().find_by_id(TenantScope::System, id).unwrap().unwrap().stock_quantity
    }

    #[test]
    fn test_order_moves_stock_and_totals() {
        let world = World::new();
        let desk = world.staff(UserRole::Frontdesk);
        let shop = ShopService::new(&world.db, dec!(0.15));
        let coffee = product(&world, "Coffee beans", dec!(12.50), 10);
        let scarf = product(&world, "Netela scarf", dec!(30), 2);

        let order = shop
            .create_order(
                &desk,
                world.hotel.id,
                NewShopOrder {
                    items: vec![
                        OrderLine { product_id: coffee.id, quantity: 2 },
                        OrderLine { product_id: scarf.id, quantity: 1 },
                    ],
                    customer_name: Some("Walk-in".into()),
                    payment_method: Some(PaymentMethod::Cash),
                    ..NewShopOrder::default()
                },
                Utc::now(),
            )
            .unwrap();

        assert_eq!(order.total_amount, dec!(55));
        assert_eq!(order.tax_amount, dec!(8.25));
        assert_eq!(order.grand_total(), dec!(63.25));
        assert_eq!(order.item_count(), 3);
        assert_eq!(stock(&world, coffee.id), 8);
        assert_eq!(stock(&world, scarf.id), 1);

        let parts: Vec<&str> = order.order_number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "LAK");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 4);

        let found = shop.find_by_number(&desk, &order.order_number.to_lowercase()).unwrap();
        assert_eq!(found.items.len(), 2);

        let paid = shop.mark_paid(&desk, order.id, None, Utc::now()).unwrap();
        assert!(paid.is_paid);
        assert!(matches!(
            shop.mark_paid(&desk, order.id, None, Utc::now()),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_room_charge_order_posts_and_cancel_reverses() {
        let world = World::new();
        let desk = world.staff(UserRole::Frontdesk);
        let shop = ShopService::new(&world.db, dec!(0.15));
        let water = product(&world, "Water", dec!(2), 20);
        let booking = book(&world);

        let order = shop
            .create_order(
                &desk,
                world.hotel.id,
                NewShopOrder {
                    items: vec![OrderLine { product_id: water.id, quantity: 4 }],
                    reservation_id: Some(booking.id),
                    payment_method: Some(PaymentMethod::RoomCharge),
                    is_delivery: true,
                    ..NewShopOrder::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(order.customer_name, "Selam Bekele");
        assert_eq!(order.room_number.as_deref(), Some("301"));

        let charges = world.db.room_charges().list_by_reservation(booking.id).unwrap();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].charge_type, RoomChargeType::ShopPurchase);
        assert_eq!(charges[0].amount, dec!(9.20));
        assert_eq!(charges[0].shop_order_id, Some(order.id));
        assert_eq!(shop.for_reservation(&desk, booking.id).unwrap().len(), 1);

        assert!(matches!(
            shop.update_status(&desk, order.id, OrderStatus::Delivered, Utc::now()),
            Err(Error::InvalidState(_))
        ));
        shop.update_status(&desk, order.id, OrderStatus::Confirmed, Utc::now()).unwrap();
        let cancelled = shop
            .update_status(&desk, order.id, OrderStatus::Cancelled, Utc::now())
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock(&world, water.id), 20);
        assert!(world.db.room_charges().list_by_reservation(booking.id).unwrap().is_empty());
    }

    #[test]
    fn test_order_validation() {
        let world = World::new();
        let desk = world.staff(UserRole::Frontdesk);
        let shop = ShopService::new(&world.db, dec!(0.15));
        let soap = product(&world, "Soap", dec!(3), 1);
        let line = |quantity| NewShopOrder {
            items: vec![OrderLine { product_id: soap.id, quantity }],
            customer_name: Some("Guest".into()),
            ..NewShopOrder::default()
        };
        let now = Utc::now();

        let empty = NewShopOrder { customer_name: Some("Guest".into()), ..NewShopOrder::default() };
        assert!(matches!(
            shop.create_order(&desk, world.hotel.id, empty, now),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            shop.create_order(&desk, world.hotel.id, line(0), now),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            shop.create_order(&desk, world.hotel.id, line(2), now),
            Err(Error::Validation(_))
        ));
        // failed orders leave stock untouched
        assert_eq!(stock(&world, soap.id), 1);

        let mut on_room = line(1);
        on_room.payment_method = Some(PaymentMethod::RoomCharge);
        assert!(matches!(
            shop.create_order(&desk, world.hotel.id, on_room, now),
            Err(Error::Validation(_))
        ));

        let mut nameless = line(1);
        nameless.customer_name = None;
        assert!(matches!(
            shop.create_order(&desk, world.hotel.id, nameless, now),
            Err(Error::Validation(_))
        ));

        let mut retired = soap.clone();
        retired.is_active = false;
        world.db.products().update(&retired).unwrap();
        assert!(matches!(
            shop.create_order(&desk, world.hotel.id, line(1), now),
            Err(Error::Validation(_))
        ));
        assert!(shop.catalogue(world.hotel.id, None).unwrap().is_empty());

        let cleaner = world.staff(UserRole::Housekeeping);
        assert!(matches!(
            shop.create_order(&cleaner, world.hotel.id, line(1), now),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_products_of_other_hotels_are_rejected() {
        let world = World::new();
        let desk = world.staff(UserRole::Frontdesk);
        let shop = ShopService::new(&world.db, dec!(0.15));
        let other = Hotel::new(
            world.tenant.id,
            "Gondar Castle Inn".into(),
            "Piazza".into(),
            "Gondar".into(),
            "Ethiopia".into(),
        );
        world.db.hotels().create(&other).unwrap();
        let foreign = Product::new(
            world.tenant.id,
            other.id,
            "Postcard".into(),
            ProductCategory::Souvenirs,
            dec!(1),
            50,
        );
        world.db.products().create(&foreign).unwrap();

        let request = NewShopOrder {
            items: vec![OrderLine { product_id: foreign.id, quantity: 1 }],
            customer_name: Some("Guest".into()),
            ..NewShopOrder::default()
        };
        assert!(matches!(
            shop.create_order(&desk, world.hotel.id, request, Utc::now()),
            Err(Error::NotFound(_))
        ));
        assert_eq!(shop.catalogue(other.id, None).unwrap().len(), 1);
    }
}

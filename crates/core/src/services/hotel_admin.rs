//! Hotel configuration: rooms, shop catalogue, pricing rules and staff

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{normalize_email, optional, require, required, staff_hotel};
use crate::credentials::{hash_password, temporary_password};
use crate::error::{Error, Result};
use crate::models::{
    normalize_code, DiscountType, Page, PageRequest, PricingStrategy, PricingStrategyType, Product,
    ProductCategory, PromotionalCode, RateAdjustmentType, Room, RoomType, SeasonalRate, User,
    UserRole,
};
use crate::permissions::Action;
use crate::scope::TenantScope;
use crate::storage::{
    Database, PricingStore, ProductStore, ReservationStore, RoomFilter, RoomStore, UserFilter,
    UserStore,
};

/// Largest party a single room may be configured for
const MAX_ROOM_CAPACITY: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct RoomInput {
    pub room_number: String,
    pub room_type: RoomType,
    pub price_per_night: Decimal,
    pub capacity: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl RoomInput {
    fn validate(&self) -> Result<String> {
        let number = required(&self.room_number, "Room number")?;
        if self.price_per_night <= Decimal::ZERO {
            return Err(Error::validation("Price per night must be positive"));
        }
        if !(1..=MAX_ROOM_CAPACITY).contains(&self.capacity) {
            return Err(Error::validation(format!(
                "Capacity must be between 1 and {MAX_ROOM_CAPACITY}"
            )));
        }
        Ok(number)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: ProductCategory,
    pub price: Decimal,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ProductInput {
    fn validate(&self) -> Result<String> {
        let name = required(&self.name, "Product name")?;
        if self.price.is_sign_negative() {
            return Err(Error::validation("Price cannot be negative"));
        }
        Ok(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyInput {
    pub strategy_type: PricingStrategyType,
    pub name: String,
    pub base_rate_multiplier: Decimal,
    #[serde(default)]
    pub min_occupancy_threshold: Option<Decimal>,
    #[serde(default)]
    pub max_occupancy_threshold: Option<Decimal>,
    #[serde(default)]
    pub advance_booking_days: Option<i64>,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    #[serde(default)]
    pub room_type: Option<RoomType>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn fraction(value: Option<Decimal>, field: &str) -> Result<()> {
    match value {
        Some(v) if v < Decimal::ZERO || v > Decimal::ONE => {
            Err(Error::validation(format!("{field} must be between 0 and 1")))
        }
        _ => Ok(()),
    }
}

impl StrategyInput {
    fn apply(&self, strategy: &mut PricingStrategy) -> Result<()> {
        strategy.name = required(&self.name, "Strategy name")?;
        if self.base_rate_multiplier <= Decimal::ZERO {
            return Err(Error::validation("Rate multiplier must be positive"));
        }
        fraction(self.min_occupancy_threshold, "Minimum occupancy")?;
        fraction(self.max_occupancy_threshold, "Maximum occupancy")?;
        let thresholds = (self.min_occupancy_threshold, self.max_occupancy_threshold);
        if let (Some(min), Some(max)) = thresholds {
            if min > max {
                return Err(Error::validation("Minimum occupancy exceeds maximum"));
            }
        }
        if self.advance_booking_days.is_some_and(|days| days < 0) {
            return Err(Error::validation("Advance booking days cannot be negative"));
        }
        if self.effective_to.is_some_and(|to| to < self.effective_from) {
            return Err(Error::validation("Strategy ends before it starts"));
        }
        strategy.strategy_type = self.strategy_type;
        strategy.base_rate_multiplier = self.base_rate_multiplier;
        strategy.min_occupancy_threshold = self.min_occupancy_threshold;
        strategy.max_occupancy_threshold = self.max_occupancy_threshold;
        strategy.advance_booking_days = self.advance_booking_days;
        strategy.effective_from = self.effective_from;
        strategy.effective_to = self.effective_to;
        strategy.room_type = self.room_type;
        strategy.priority = self.priority;
        strategy.is_active = self.is_active.unwrap_or(strategy.is_active);
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonInput {
    pub season_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub room_type: Option<RoomType>,
    #[serde(default = "default_adjustment")]
    pub adjustment_type: RateAdjustmentType,
    #[serde(default = "default_multiplier")]
    pub rate_multiplier: Decimal,
    #[serde(default)]
    pub fixed_adjustment: Option<Decimal>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn default_adjustment() -> RateAdjustmentType {
    RateAdjustmentType::Multiplier
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

impl SeasonInput {
    fn apply(&self, season: &mut SeasonalRate) -> Result<()> {
        season.season_name = required(&self.season_name, "Season name")?;
        if self.end_date < self.start_date {
            return Err(Error::validation("Season ends before it starts"));
        }
        match self.adjustment_type {
            RateAdjustmentType::Multiplier if self.rate_multiplier <= Decimal::ZERO => {
                return Err(Error::validation("Rate multiplier must be positive"));
            }
            RateAdjustmentType::FixedAdjustment if self.fixed_adjustment.is_none() => {
                return Err(Error::validation("Fixed adjustment amount is required"));
            }
            _ => {}
        }
        season.start_date = self.start_date;
        season.end_date = self.end_date;
        season.room_type = self.room_type;
        season.adjustment_type = self.adjustment_type;
        season.rate_multiplier = self.rate_multiplier;
        season.fixed_adjustment = self.fixed_adjustment;
        season.priority = self.priority;
        season.is_active = self.is_active.unwrap_or(season.is_active);
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromoInput {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub max_discount_amount: Option<Decimal>,
    #[serde(default)]
    pub min_booking_amount: Option<Decimal>,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub min_nights: Option<u32>,
    #[serde(default)]
    pub room_type: Option<RoomType>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl PromoInput {
    fn apply(&self, promo: &mut PromotionalCode) -> Result<()> {
        let code = normalize_code(&self.code);
        let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
        if code.is_empty() || !code.chars().all(allowed) {
            return Err(Error::validation("Promo codes use letters, digits, '-' and '_'"));
        }
        promo.name = required(&self.name, "Promotion name")?;
        let value_ok = match self.discount_type {
            DiscountType::Percentage => {
                self.discount_value > Decimal::ZERO && self.discount_value <= Decimal::ONE_HUNDRED
            }
            DiscountType::FixedAmount => self.discount_value > Decimal::ZERO,
        };
        if !value_ok {
            return Err(Error::validation(format!(
                "Invalid {} discount value {}",
                self.discount_type, self.discount_value
            )));
        }
        if self.valid_to < self.valid_from {
            return Err(Error::validation("Promotion ends before it starts"));
        }
        if self.usage_limit == Some(0) {
            return Err(Error::validation("Usage limit must be positive"));
        }
        promo.code = code;
        promo.description = optional(self.description.clone());
        promo.discount_type = self.discount_type;
        promo.discount_value = self.discount_value;
        promo.max_discount_amount = self.max_discount_amount;
        promo.min_booking_amount = self.min_booking_amount;
        promo.valid_from = self.valid_from;
        promo.valid_to = self.valid_to;
        promo.usage_limit = self.usage_limit;
        promo.min_nights = self.min_nights;
        promo.room_type = self.room_type;
        promo.is_active = self.is_active.unwrap_or(promo.is_active);
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: UserRole,
}

/// Roles a hotel administrator hands out
fn assignable(role: UserRole) -> bool {
    role.is_staff() && role != UserRole::HotelAdmin
}

pub struct HotelAdminService<'a> {
    db: &'a Database,
}

impl<'a> HotelAdminService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn load_room(&self, conn: &Connection, actor: &User, room_id: Uuid) -> Result<Room> {
        require(actor, Action::ManageRooms)?;
        let room = RoomStore::new(conn)
            .find_by_id(TenantScope::for_user(actor)?, room_id)?
            .ok_or_else(|| Error::not_found("Room", room_id))?;
        staff_hotel(conn, actor, Action::ManageRooms, room.hotel_id)
            .map_err(|_| Error::not_found("Room", room_id))?;
        Ok(room)
    }

    fn load_product(&self, conn: &Connection, actor: &User, product_id: Uuid) -> Result<Product> {
        require(actor, Action::ManageProducts)?;
        let product = ProductStore::new(conn)
            .find_by_id(TenantScope::for_user(actor)?, product_id)?
            .ok_or_else(|| Error::not_found("Product", product_id))?;
        staff_hotel(conn, actor, Action::ManageProducts, product.hotel_id)
            .map_err(|_| Error::not_found("Product", product_id))?;
        Ok(product)
    }

    // Rooms

    #[instrument(skip(self, actor, input), fields(room_number = %input.room_number))]
    pub fn create_room(&self, actor: &User, hotel_id: Uuid, input: &RoomInput) -> Result<Room> {
        let number = input.validate()?;
        self.db.transaction(|conn| {
            let hotel = staff_hotel(conn, actor, Action::ManageRooms, hotel_id)?;
            let rooms = RoomStore::new(conn);
            if rooms.number_taken(hotel.id, &number, None)? {
                return Err(Error::Conflict(format!(
                    "Room {number} already exists in {}",
                    hotel.name
                )));
            }
            let mut room = Room::new(
                hotel.tenant_id,
                hotel.id,
                number,
                input.room_type,
                input.price_per_night,
                input.capacity,
            );
            room.description = optional(input.description.clone());
            room.is_available = input.is_available.unwrap_or(true);
            rooms.create(&room)?;
            info!(room_id = %room.id, hotel = %hotel.name, "Room created");
            Ok(room)
        })
    }

    pub fn update_room(&self, actor: &User, room_id: Uuid, input: &RoomInput) -> Result<Room> {
        let number = input.validate()?;
        self.db.transaction(|conn| {
            let mut room = self.load_room(conn, actor, room_id)?;
            let rooms = RoomStore::new(conn);
            if rooms.number_taken(room.hotel_id, &number, Some(room.id))? {
                return Err(Error::Conflict(format!("Room {number} already exists")));
            }
            room.room_number = number;
            room.room_type = input.room_type;
            room.price_per_night = input.price_per_night;
            room.capacity = input.capacity;
            room.description = optional(input.description.clone());
            room.is_available = input.is_available.unwrap_or(room.is_available);
            rooms.update(&room)?;
            Ok(room)
        })
    }

    /// Rooms with booking history are kept; mark them not bookable instead
    pub fn delete_room(&self, actor: &User, room_id: Uuid) -> Result<()> {
        self.db.transaction(|conn| {
            let room = self.load_room(conn, actor, room_id)?;
            if ReservationStore::new(conn).count_for_room(room.id)? > 0 {
                return Err(Error::Conflict(format!(
                    "Room {} has bookings and cannot be deleted",
                    room.room_number
                )));
            }
            RoomStore::new(conn).delete(room.id)?;
            info!(room_id = %room.id, "Room deleted");
            Ok(())
        })
    }

    pub fn room(&self, actor: &User, room_id: Uuid) -> Result<Room> {
        self.load_room(self.db.connection(), actor, room_id)
    }

    pub fn rooms(&self, actor: &User, hotel_id: Uuid, filter: RoomFilter) -> Result<Vec<Room>> {
        staff_hotel(self.db.connection(), actor, Action::ManageRooms, hotel_id)?;
        self.db.rooms().list_by_hotel(hotel_id, filter)
    }

    // Products

    #[instrument(skip(self, actor, input), fields(name = %input.name))]
    pub fn create_product(
        &self,
        actor: &User,
        hotel_id: Uuid,
        input: &ProductInput,
    ) -> Result<Product> {
        let name = input.validate()?;
        self.db.transaction(|conn| {
            let hotel = staff_hotel(conn, actor, Action::ManageProducts, hotel_id)?;
            let mut product = Product::new(
                hotel.tenant_id,
                hotel.id,
                name,
                input.category,
                input.price,
                input.stock_quantity,
            );
            product.description = optional(input.description.clone());
            product.sku = optional(input.sku.clone());
            product.is_active = input.is_active.unwrap_or(true);
            ProductStore::new(conn).create(&product)?;
            Ok(product)
        })
    }

    pub fn update_product(
        &self,
        actor: &User,
        product_id: Uuid,
        input: &ProductInput,
    ) -> Result<Product> {
        let name = input.validate()?;
        self.db.transaction(|conn| {
            let mut product = self.load_product(conn, actor, product_id)?;
            product.name = name;
            product.description = optional(input.description.clone());
            product.category = input.category;
            product.price = input.price;
            product.stock_quantity = input.stock_quantity;
            product.sku = optional(input.sku.clone());
            product.is_active = input.is_active.unwrap_or(product.is_active);
            ProductStore::new(conn).update(&product)?;
            Ok(product)
        })
    }

    /// Ordered products stay for order history; retire them instead
    pub fn delete_product(&self, actor: &User, product_id: Uuid) -> Result<()> {
        self.db.transaction(|conn| {
            let product = self.load_product(conn, actor, product_id)?;
            let products = ProductStore::new(conn);
            if products.is_ordered(product.id)? {
                return Err(Error::Conflict(format!(
                    "{} appears on orders and cannot be deleted",
                    product.name
                )));
            }
            products.delete(product.id)
        })
    }

    pub fn products(
        &self,
        actor: &User,
        hotel_id: Uuid,
        category: Option<ProductCategory>,
    ) -> Result<Vec<Product>> {
        staff_hotel(self.db.connection(), actor, Action::ManageProducts, hotel_id)?;
        self.db.products().list_by_hotel(hotel_id, category, false)
    }

    // Pricing

    pub fn create_strategy(
        &self,
        actor: &User,
        hotel_id: Uuid,
        input: &StrategyInput,
    ) -> Result<PricingStrategy> {
        self.db.transaction(|conn| {
            let hotel = staff_hotel(conn, actor, Action::ManagePricing, hotel_id)?;
            let mut strategy = PricingStrategy::new(
                hotel.id,
                input.strategy_type,
                input.name.clone(),
                input.base_rate_multiplier,
                input.effective_from,
            );
            input.apply(&mut strategy)?;
            PricingStore::new(conn).create_strategy(&strategy)?;
            Ok(strategy)
        })
    }

    pub fn update_strategy(
        &self,
        actor: &User,
        hotel_id: Uuid,
        strategy_id: Uuid,
        input: &StrategyInput,
    ) -> Result<PricingStrategy> {
        self.db.transaction(|conn| {
            staff_hotel(conn, actor, Action::ManagePricing, hotel_id)?;
            let store = PricingStore::new(conn);
            let mut strategy = store
                .find_strategy(hotel_id, strategy_id)?
                .ok_or_else(|| Error::not_found("Pricing strategy", strategy_id))?;
            input.apply(&mut strategy)?;
            store.update_strategy(&strategy)?;
            Ok(strategy)
        })
    }

    pub fn delete_strategy(&self, actor: &User, hotel_id: Uuid, strategy_id: Uuid) -> Result<()> {
        self.db.transaction(|conn| {
            staff_hotel(conn, actor, Action::ManagePricing, hotel_id)?;
            let store = PricingStore::new(conn);
            store
                .find_strategy(hotel_id, strategy_id)?
                .ok_or_else(|| Error::not_found("Pricing strategy", strategy_id))?;
            store.delete_strategy(hotel_id, strategy_id)
        })
    }

    pub fn strategies(&self, actor: &User, hotel_id: Uuid) -> Result<Vec<PricingStrategy>> {
        staff_hotel(self.db.connection(), actor, Action::ManagePricing, hotel_id)?;
        self.db.pricing().list_strategies(hotel_id)
    }

    pub fn create_season(
        &self,
        actor: &User,
        hotel_id: Uuid,
        input: &SeasonInput,
    ) -> Result<SeasonalRate> {
        self.db.transaction(|conn| {
            let hotel = staff_hotel(conn, actor, Action::ManagePricing, hotel_id)?;
            let mut season = SeasonalRate::new(
                hotel.id,
                input.season_name.clone(),
                input.start_date,
                input.end_date,
                input.rate_multiplier,
            );
            input.apply(&mut season)?;
            PricingStore::new(conn).create_season(&season)?;
            Ok(season)
        })
    }

    pub fn update_season(
        &self,
        actor: &User,
        hotel_id: Uuid,
        season_id: Uuid,
        input: &SeasonInput,
    ) -> Result<SeasonalRate> {
        self.db.transaction(|conn| {
            staff_hotel(conn, actor, Action::ManagePricing, hotel_id)?;
            let store = PricingStore::new(conn);
            let mut season = store
                .find_season(hotel_id, season_id)?
                .ok_or_else(|| Error::not_found("Seasonal rate", season_id))?;
            input.apply(&mut season)?;
            store.update_season(&season)?;
            Ok(season)
        })
    }

    pub fn delete_season(&self, actor: &User, hotel_id: Uuid, season_id: Uuid) -> Result<()> {
        self.db.transaction(|conn| {
            staff_hotel(conn, actor, Action::ManagePricing, hotel_id)?;
            let store = PricingStore::new(conn);
            store
                .find_season(hotel_id, season_id)?
                .ok_or_else(|| Error::not_found("Seasonal rate", season_id))?;
            store.delete_season(hotel_id, season_id)
        })
    }

    pub fn seasons(&self, actor: &User, hotel_id: Uuid) -> Result<Vec<SeasonalRate>> {
        staff_hotel(self.db.connection(), actor, Action::ManagePricing, hotel_id)?;
        self.db.pricing().list_seasons(hotel_id)
    }

    #[instrument(skip(self, actor, input), fields(code = %input.code))]
    pub fn create_promo(
        &self,
        actor: &User,
        hotel_id: Uuid,
        input: &PromoInput,
    ) -> Result<PromotionalCode> {
        self.db.transaction(|conn| {
            let hotel = staff_hotel(conn, actor, Action::ManagePricing, hotel_id)?;
            let mut promo = PromotionalCode::new(
                hotel.id,
                &input.code,
                input.name.clone(),
                input.discount_type,
                input.discount_value,
                input.valid_from,
                input.valid_to,
            );
            input.apply(&mut promo)?;
            let store = PricingStore::new(conn);
            if store.code_taken(hotel.id, &promo.code, None)? {
                return Err(Error::Conflict(format!("Promo code {} already exists", promo.code)));
            }
            store.create_promo(&promo)?;
            Ok(promo)
        })
    }

    pub fn update_promo(
        &self,
        actor: &User,
        hotel_id: Uuid,
        promo_id: Uuid,
        input: &PromoInput,
    ) -> Result<PromotionalCode> {
        self.db.transaction(|conn| {
            staff_hotel(conn, actor, Action::ManagePricing, hotel_id)?;
            let store = PricingStore::new(conn);
            let mut promo = store
                .find_promo(hotel_id, promo_id)?
                .ok_or_else(|| Error::not_found("Promotional code", promo_id))?;
            input.apply(&mut promo)?;
            if store.code_taken(hotel_id, &promo.code, Some(promo.id))? {
                return Err(Error::Conflict(format!("Promo code {} already exists", promo.code)));
            }
            store.update_promo(&promo)?;
            Ok(promo)
        })
    }

    pub fn delete_promo(&self, actor: &User, hotel_id: Uuid, promo_id: Uuid) -> Result<()> {
        self.db.transaction(|conn| {
            staff_hotel(conn, actor, Action::ManagePricing, hotel_id)?;
            let store = PricingStore::new(conn);
            store
                .find_promo(hotel_id, promo_id)?
                .ok_or_else(|| Error::not_found("Promotional code", promo_id))?;
            store.delete_promo(hotel_id, promo_id)
        })
    }

    pub fn promos(&self, actor: &User, hotel_id: Uuid) -> Result<Vec<PromotionalCode>> {
        staff_hotel(self.db.connection(), actor, Action::ManagePricing, hotel_id)?;
        self.db.pricing().list_promos(hotel_id)
    }

    // Staff

    pub fn list_staff(
        &self,
        actor: &User,
        hotel_id: Uuid,
        role: Option<UserRole>,
        page: PageRequest,
    ) -> Result<Page<User>> {
        staff_hotel(self.db.connection(), actor, Action::ViewStaff, hotel_id)?;
        let filter = UserFilter {
            hotel_id: Some(hotel_id),
            role,
            query: None,
        };
        self.db.users().list(TenantScope::for_user(actor)?, &filter, page)
    }

    /// Create a staff account; the returned one-time password is shown once
    #[instrument(skip(self, actor, staff), fields(role = %staff.role))]
    pub fn create_staff(
        &self,
        actor: &User,
        hotel_id: Uuid,
        staff: &NewStaff,
    ) -> Result<(User, String)> {
        if !assignable(staff.role) {
            return Err(Error::validation(format!(
                "{} cannot be assigned to hotel staff",
                staff.role
            )));
        }
        let email = normalize_email(&staff.email)?;
        let first_name = required(&staff.first_name, "First name")?;
        let last_name = required(&staff.last_name, "Last name")?;
        let password = temporary_password();
        let password_hash = hash_password(&password)?;

        self.db.transaction(|conn| {
            let hotel = staff_hotel(conn, actor, Action::ManageStaff, hotel_id)?;
            let users = UserStore::new(conn);
            if users.email_taken(&email, None)? {
                return Err(Error::Conflict(format!("Email {email} is already registered")));
            }
            let mut user = User::new(
                email.clone(),
                password_hash.clone(),
                first_name.clone(),
                last_name.clone(),
                staff.role,
            );
            user.tenant_id = Some(hotel.tenant_id);
            user.hotel_id = Some(hotel.id);
            user.phone = optional(staff.phone.clone());
            users.create(&user)?;
            info!(user_id = %user.id, hotel = %hotel.name, "Staff account created");
            Ok((user, password.clone()))
        })
    }

    pub fn set_staff_active(&self, actor: &User, user_id: Uuid, active: bool) -> Result<User> {
        require(actor, Action::ManageStaff)?;
        if user_id == actor.id {
            return Err(Error::validation("You cannot change your own account status"));
        }
        self.db.transaction(|conn| {
            let users = UserStore::new(conn);
            let mut user = users
                .find_by_id(TenantScope::for_user(actor)?, user_id)?
                .filter(|user| user.roles.iter().all(|role| assignable(*role)))
                .ok_or_else(|| Error::not_found("User", user_id))?;
            if let Some(hotel_id) = user.hotel_id {
                staff_hotel(conn, actor, Action::ManageStaff, hotel_id)
                    .map_err(|_| Error::not_found("User", user_id))?;
            }
            users.set_active(user.id, active)?;
            user.is_active = active;
            Ok(user)
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::credentials::verify_password;
    use crate::models::RoomStatus;
    use crate::pricing::PricingPolicy;
    use crate::services::testing::{date, today, World};
    use crate::services::{BookingRequest, BookingService, GuestDetails};

    fn room_input(number: &str) -> RoomInput {
        RoomInput {
            room_number: number.into(),
            room_type: RoomType::Deluxe,
            price_per_night: dec!(180),
            capacity: 3,
            description: Some("Lake view".into()),
            is_available: None,
        }
    }

    fn promo_input(code: &str) -> PromoInput {
        PromoInput {
            code: code.into(),
            name: "Spring".into(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: dec!(10),
            max_discount_amount: None,
            min_booking_amount: None,
            valid_from: date(3, 1),
            valid_to: date(5, 31),
            usage_limit: Some(50),
            min_nights: None,
            room_type: None,
            is_active: None,
        }
    }

    #[test]
    fn test_room_crud() {
        let world = World::new();
        let manager = world.staff(UserRole::HotelManager);
        let service = HotelAdminService::new(&world.db);

        let room = service.create_room(&manager, world.hotel.id, &room_input("201")).unwrap();
        assert_eq!(room.status, RoomStatus::Available);
        assert!(matches!(
            service.create_room(&manager, world.hotel.id, &room_input("201")),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            service.update_room(&manager, room.id, &room_input("101")),
            Err(Error::Conflict(_))
        ));
        let mut bad = room_input("202");
        bad.capacity = 0;
        assert!(matches!(
            service.create_room(&manager, world.hotel.id, &bad),
            Err(Error::Validation(_))
        ));

        let mut changed = room_input("201A");
        changed.is_available = Some(false);
        let updated = service.update_room(&manager, room.id, &changed).unwrap();
        assert_eq!(updated.room_number, "201A");
        assert!(!updated.is_available);

        service.delete_room(&manager, room.id).unwrap();
        assert_eq!(
            service.rooms(&manager, world.hotel.id, RoomFilter::default()).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_booked_room_cannot_be_deleted() {
        let world = World::new();
        let manager = world.staff(UserRole::HotelManager);
        let request = BookingRequest {
            room_id: world.room.id,
            check_in: date(3, 4),
            check_out: date(3, 6),
            guests: 1,
            guest: GuestDetails {
                guest_name: Some("Meron Girma".into()),
                guest_email: Some("meron@example.com".into()),
                ..GuestDetails::default()
            },
        };
        BookingService::new(&world.db, PricingPolicy::default())
            .create_booking(None, &request, today())
            .unwrap();

        let service = HotelAdminService::new(&world.db);
        assert!(matches!(service.delete_room(&manager, world.room.id), Err(Error::Conflict(_))));
        let desk = world.staff(UserRole::Frontdesk);
        assert!(matches!(
            service.delete_room(&desk, world.suite.id),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_product_catalogue() {
        let world = World::new();
        let manager = world.staff(UserRole::HotelManager);
        let service = HotelAdminService::new(&world.db);
        let input = ProductInput {
            name: "Coffee ceremony set".into(),
            description: None,
            category: ProductCategory::Souvenirs,
            price: dec!(45),
            stock_quantity: 5,
            sku: Some("CER-01".into()),
            is_active: None,
        };
        let product = service.create_product(&manager, world.hotel.id, &input).unwrap();
        assert!(product.is_active);

        let retired = ProductInput { is_active: Some(false), ..input.clone() };
        service.update_product(&manager, product.id, &retired).unwrap();
        assert_eq!(service.products(&manager, world.hotel.id, None).unwrap().len(), 1);
        assert!(world.db.products().list_by_hotel(world.hotel.id, None, true).unwrap().is_empty());

        let negative = ProductInput { price: dec!(-1), ..input };
        assert!(matches!(
            service.create_product(&manager, world.hotel.id, &negative),
            Err(Error::Validation(_))
        ));
        service.delete_product(&manager, product.id).unwrap();
        assert!(matches!(service.delete_product(&manager, product.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_pricing_rules_validation() {
        let world = World::new();
        let owner = world.staff(UserRole::HotelAdmin);
        let manager = world.staff(UserRole::HotelManager);
        let service = HotelAdminService::new(&world.db);

        let promo =
            service.create_promo(&owner, world.hotel.id, &promo_input(" spring10 ")).unwrap();
        assert_eq!(promo.code, "SPRING10");
        assert!(matches!(
            service.create_promo(&owner, world.hotel.id, &promo_input("SPRING10")),
            Err(Error::Conflict(_))
        ));
        let mut too_much = promo_input("HALF");
        too_much.discount_value = dec!(150);
        assert!(matches!(
            service.create_promo(&owner, world.hotel.id, &too_much),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.create_promo(&manager, world.hotel.id, &promo_input("MGR")),
            Err(Error::PermissionDenied(_))
        ));

        let season = SeasonInput {
            season_name: "Timkat".into(),
            start_date: date(1, 18),
            end_date: date(1, 21),
            room_type: None,
            adjustment_type: RateAdjustmentType::FixedAdjustment,
            rate_multiplier: Decimal::ONE,
            fixed_adjustment: None,
            priority: 1,
            is_active: None,
        };
        assert!(matches!(
            service.create_season(&owner, world.hotel.id, &season),
            Err(Error::Validation(_))
        ));
        let season = SeasonInput { fixed_adjustment: Some(dec!(25)), ..season };
        let created = service.create_season(&owner, world.hotel.id, &season).unwrap();
        assert_eq!(created.fixed_adjustment, Some(dec!(25)));

        let strategy = StrategyInput {
            strategy_type: PricingStrategyType::DemandBased,
            name: "High demand".into(),
            base_rate_multiplier: dec!(1.2),
            min_occupancy_threshold: Some(dec!(0.9)),
            max_occupancy_threshold: Some(dec!(0.5)),
            advance_booking_days: None,
            effective_from: date(1, 1),
            effective_to: None,
            room_type: None,
            priority: 5,
            is_active: None,
        };
        assert!(matches!(
            service.create_strategy(&owner, world.hotel.id, &strategy),
            Err(Error::Validation(_))
        ));
        let strategy = StrategyInput { max_occupancy_threshold: Some(dec!(1)), ..strategy };
        let created = service.create_strategy(&owner, world.hotel.id, &strategy).unwrap();
        let paused = StrategyInput { is_active: Some(false), ..strategy };
        let updated = service.update_strategy(&owner, world.hotel.id, created.id, &paused).unwrap();
        assert!(!updated.is_active);
        assert_eq!(service.strategies(&owner, world.hotel.id).unwrap().len(), 1);
        service.delete_strategy(&owner, world.hotel.id, created.id).unwrap();
        assert!(service.strategies(&owner, world.hotel.id).unwrap().is_empty());
    }

    #[test]
    fn test_staff_accounts() {
        let world = World::new();
        let owner = world.staff(UserRole::HotelAdmin);
        let service = HotelAdminService::new(&world.db);
        let request = NewStaff {
            email: "Abebe@Lakeside.test".into(),
            first_name: "Abebe".into(),
            last_name: "Kebede".into(),
            phone: None,
            role: UserRole::Frontdesk,
        };

        let (user, password) = service.create_staff(&owner, world.hotel.id, &request).unwrap();
        assert_eq!(user.email, "abebe@lakeside.test");
        assert_eq!(user.hotel_id, Some(world.hotel.id));
        let stored = world.db.users().find_by_email("abebe@lakeside.test").unwrap().unwrap();
        assert!(verify_password(&password, &stored.password_hash).unwrap());

        assert!(matches!(
            service.create_staff(&owner, world.hotel.id, &request),
            Err(Error::Conflict(_))
        ));
        let promote = NewStaff { role: UserRole::HotelAdmin, ..request };
        assert!(matches!(
            service.create_staff(&owner, world.hotel.id, &promote),
            Err(Error::Validation(_))
        ));

        let disabled = service.set_staff_active(&owner, user.id, false).unwrap();
        assert!(!disabled.is_active);
        let page = service
            .list_staff(&owner, world.hotel.id, Some(UserRole::Frontdesk), PageRequest::new(0, 20))
            .unwrap();
        assert_eq!(page.total_elements, 1);
    }
}

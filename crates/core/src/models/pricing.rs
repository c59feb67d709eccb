//! Pricing configuration: strategies, seasonal rates and promotional codes

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RoomType;

string_enum! {
    pub enum PricingStrategyType {
        Standard => "STANDARD",
        DemandBased => "DEMAND_BASED",
        EarlyBird => "EARLY_BIRD",
        LastMinute => "LAST_MINUTE",
        LengthOfStay => "LENGTH_OF_STAY",
    }
}

/// A rule scaling the base stay total by `base_rate_multiplier`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingStrategy {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub strategy_type: PricingStrategyType,
    pub name: String,
    pub base_rate_multiplier: Decimal,
    /// Occupancy bounds as fractions in `[0, 1]`
    pub min_occupancy_threshold: Option<Decimal>,
    pub max_occupancy_threshold: Option<Decimal>,
    pub advance_booking_days: Option<i64>,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    /// `None` applies to every room type
    pub room_type: Option<RoomType>,
    pub is_active: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

impl PricingStrategy {
    pub fn new(
        hotel_id: Uuid,
        strategy_type: PricingStrategyType,
        name: String,
        base_rate_multiplier: Decimal,
        effective_from: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            strategy_type,
            name,
            base_rate_multiplier,
            min_occupancy_threshold: None,
            max_occupancy_threshold: None,
            advance_booking_days: None,
            effective_from,
            effective_to: None,
            room_type: None,
            is_active: true,
            priority: 0,
            created_at: Utc::now(),
        }
    }

    /// Active and in effect on `date` for `room_type`
    pub fn is_effective(&self, date: NaiveDate, room_type: RoomType) -> bool {
        self.is_active
            && self.effective_from <= date
            && self.effective_to.map_or(true, |to| date <= to)
            && self.room_type.map_or(true, |rt| rt == room_type)
    }
}

string_enum! {
    pub enum RateAdjustmentType {
        Multiplier => "MULTIPLIER",
        FixedAdjustment => "FIXED_ADJUSTMENT",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalRate {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub season_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_type: Option<RoomType>,
    pub adjustment_type: RateAdjustmentType,
    pub rate_multiplier: Decimal,
    pub fixed_adjustment: Option<Decimal>,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl SeasonalRate {
    pub fn new(
        hotel_id: Uuid,
        season_name: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        rate_multiplier: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            season_name,
            start_date,
            end_date,
            room_type: None,
            adjustment_type: RateAdjustmentType::Multiplier,
            rate_multiplier,
            fixed_adjustment: None,
            priority: 0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Inclusive on both ends
    pub fn applies_on(&self, date: NaiveDate, room_type: RoomType) -> bool {
        self.is_active
            && self.start_date <= date
            && date <= self.end_date
            && self.room_type.map_or(true, |rt| rt == room_type)
    }

    pub fn adjust(&self, amount: Decimal) -> Decimal {
        match (self.adjustment_type, self.fixed_adjustment) {
            (RateAdjustmentType::Multiplier, _) => amount * self.rate_multiplier,
            (RateAdjustmentType::FixedAdjustment, Some(fixed)) => amount + fixed,
            (RateAdjustmentType::FixedAdjustment, None) => amount,
        }
    }
}

string_enum! {
    pub enum DiscountType {
        Percentage => "PERCENTAGE",
        FixedAmount => "FIXED_AMOUNT",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionalCode {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub min_booking_amount: Option<Decimal>,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub usage_limit: Option<u32>,
    pub usage_count: u32,
    pub min_nights: Option<u32>,
    pub room_type: Option<RoomType>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PromotionalCode {
    pub fn new(
        hotel_id: Uuid,
        code: &str,
        name: String,
        discount_type: DiscountType,
        discount_value: Decimal,
        valid_from: NaiveDate,
        valid_to: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            code: normalize_code(code),
            name,
            description: None,
            discount_type,
            discount_value,
            max_discount_amount: None,
            min_booking_amount: None,
            valid_from,
            valid_to,
            usage_limit: None,
            usage_count: 0,
            min_nights: None,
            room_type: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_valid_for_date(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.valid_from <= date
            && date <= self.valid_to
            && self.usage_limit.map_or(true, |limit| self.usage_count < limit)
    }

    pub fn is_valid_for_amount(&self, amount: Decimal) -> bool {
        self.min_booking_amount.map_or(true, |min| amount >= min)
    }

    /// Discount on `amount`, capped by `max_discount_amount` and never above `amount`
    pub fn discount_for(&self, amount: Decimal) -> Decimal {
        let raw = match self.discount_type {
            DiscountType::Percentage => amount * self.discount_value / Decimal::ONE_HUNDRED,
            DiscountType::FixedAmount => self.discount_value,
        };
        let capped = match self.max_discount_amount {
            Some(max) if raw > max => max,
            _ => raw,
        };
        capped.min(amount).max(Decimal::ZERO)
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// One named line in a price breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub room_type: RoomType,
    pub nights: i64,
    pub base_rate_per_night: Decimal,
    pub base_total: Decimal,
    pub strategy_adjustments: Vec<PriceAdjustment>,
    pub seasonal_adjustments: Vec<PriceAdjustment>,
    pub weekend_adjustments: Vec<PriceAdjustment>,
    pub promo_code: Option<String>,
    pub promo_discount: Decimal,
    /// Reason a supplied code was not applied
    pub promo_error: Option<String>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub final_total: Decimal,
    pub total_savings: Decimal,
    pub savings_percentage: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_percentage_discount_is_capped() {
        let mut promo = PromotionalCode::new(
            Uuid::new_v4(),
            " summer10 ",
            "Summer".into(),
            DiscountType::Percentage,
            dec!(10),
            date(2026, 6, 1),
            date(2026, 8, 31),
        );
        assert_eq!(promo.code, "SUMMER10");
        assert_eq!(promo.discount_for(dec!(500)), dec!(50));

        promo.max_discount_amount = Some(dec!(30));
        assert_eq!(promo.discount_for(dec!(500)), dec!(30));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_amount() {
        let promo = PromotionalCode::new(
            Uuid::new_v4(),
            "FLAT100",
            "Flat".into(),
            DiscountType::FixedAmount,
            dec!(100),
            date(2026, 1, 1),
            date(2026, 12, 31),
        );
        assert_eq!(promo.discount_for(dec!(80)), dec!(80));
    }

    #[test]
    fn test_promo_validity() {
        let mut promo = PromotionalCode::new(
            Uuid::new_v4(),
            "X",
            "X".into(),
            DiscountType::Percentage,
            dec!(5),
            date(2026, 1, 1),
            date(2026, 1, 31),
        );
        assert!(promo.is_valid_for_date(date(2026, 1, 31)));
        assert!(!promo.is_valid_for_date(date(2026, 2, 1)));

        promo.usage_limit = Some(2);
        promo.usage_count = 2;
        assert!(!promo.is_valid_for_date(date(2026, 1, 15)));

        promo.min_booking_amount = Some(dec!(200));
        assert!(!promo.is_valid_for_amount(dec!(199.99)));
        assert!(promo.is_valid_for_amount(dec!(200)));
    }

    #[test]
    fn test_seasonal_rate_window_and_room_type() {
        let mut rate = SeasonalRate::new(
            Uuid::new_v4(),
            "Timkat".into(),
            date(2027, 1, 18),
            date(2027, 1, 20),
            dec!(1.5),
        );
        rate.room_type = Some(RoomType::Suite);
        assert!(rate.applies_on(date(2027, 1, 20), RoomType::Suite));
        assert!(!rate.applies_on(date(2027, 1, 21), RoomType::Suite));
        assert!(!rate.applies_on(date(2027, 1, 19), RoomType::Standard));
        assert_eq!(rate.adjust(dec!(100)), dec!(150.0));

        rate.adjustment_type = RateAdjustmentType::FixedAdjustment;
        rate.fixed_adjustment = Some(dec!(-20));
        assert_eq!(rate.adjust(dec!(100)), dec!(80));
    }
}

//! Stay price calculation
//!
//! Order of application: pricing strategies on the base total, seasonal
//! rates active on the check-in date, the optional weekend premium, the
//! promotional code, then tax on what remains.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::availability::StayDates;
use crate::models::{
    PriceAdjustment, PriceQuote, PricingStrategy, PricingStrategyType, PromotionalCode, RoomType,
    SeasonalRate,
};

/// Stays of at least this many nights qualify for length-of-stay pricing
pub const LENGTH_OF_STAY_NIGHTS: i64 = 7;

/// Hotel-wide pricing knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Fraction applied to the discounted subtotal
    pub tax_rate: Decimal,
    /// Fraction of the nightly rate added for Friday and Saturday nights
    pub weekend_premium: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(15, 2),
            weekend_premium: Decimal::ZERO,
        }
    }
}

/// Everything a quote depends on besides the hotel's configured rules
#[derive(Debug, Clone)]
pub struct QuoteInput<'a> {
    pub room_type: RoomType,
    pub base_rate_per_night: Decimal,
    pub stay: StayDates,
    /// Day the booking is made, for advance-booking rules
    pub booking_date: NaiveDate,
    /// Booked share of the hotel's rooms over the stay
    pub occupancy_rate: Decimal,
    /// Code as typed by the guest
    pub promo_code: Option<&'a str>,
    /// The hotel's promotion matching `promo_code`, if any
    pub promotion: Option<&'a PromotionalCode>,
}

pub struct PriceCalculator {
    policy: PricingPolicy,
}

impl PriceCalculator {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn quote(
        &self,
        input: &QuoteInput<'_>,
        strategies: &[PricingStrategy],
        seasonal_rates: &[SeasonalRate],
    ) -> PriceQuote {
        let nights = input.stay.nights();
        let base_total = input.base_rate_per_night * Decimal::from(nights);
        let check_in = input.stay.check_in();

        let mut total = base_total;

        let mut strategy_adjustments = Vec::new();
        for strategy in by_priority(strategies, |s| s.priority)
            .filter(|s| s.is_effective(check_in, input.room_type))
        {
            if !strategy_applies(strategy, input) {
                continue;
            }
            let amount = base_total * (strategy.base_rate_multiplier - Decimal::ONE);
            if !amount.is_zero() {
                total += amount;
                strategy_adjustments.push(PriceAdjustment {
                    name: strategy.name.clone(),
                    amount: amount.round_dp(2),
                });
            }
        }

        let mut seasonal_adjustments = Vec::new();
        for rate in by_priority(seasonal_rates, |r| r.priority)
            .filter(|r| r.applies_on(check_in, input.room_type))
        {
            let adjusted = rate.adjust(total);
            if adjusted != total {
                seasonal_adjustments.push(PriceAdjustment {
                    name: rate.season_name.clone(),
                    amount: (adjusted - total).round_dp(2),
                });
                total = adjusted;
            }
        }

        let mut weekend_adjustments = Vec::new();
        if self.policy.weekend_premium > Decimal::ZERO && nights > 0 {
            let nightly = total / Decimal::from(nights);
            let mut premium_total = Decimal::ZERO;
            for night in input.stay.each_night() {
                if matches!(night.weekday(), Weekday::Fri | Weekday::Sat) {
                    let premium = (nightly * self.policy.weekend_premium).round_dp(2);
                    premium_total += premium;
                    weekend_adjustments.push(PriceAdjustment {
                        name: format!("{night} (Weekend)"),
                        amount: premium,
                    });
                }
            }
            total += premium_total;
        }

        total = total.max(Decimal::ZERO);

        let (promo_code, promo_discount, promo_error) = match input.promo_code {
            Some(code) if !code.trim().is_empty() => match promotion_check(input, total) {
                Ok(promo) => (Some(promo.code.clone()), promo.discount_for(total), None),
                Err(reason) => (None, Decimal::ZERO, Some(reason.to_string())),
            },
            _ => (None, Decimal::ZERO, None),
        };

        let subtotal = (total - promo_discount).max(Decimal::ZERO).round_dp(2);
        let tax_amount = (subtotal * self.policy.tax_rate).round_dp(2);
        let final_total = subtotal + tax_amount;

        let total_savings = (base_total - subtotal).max(Decimal::ZERO).round_dp(2);
        let savings_percentage = if base_total.is_zero() {
            Decimal::ZERO
        } else {
            (total_savings / base_total * Decimal::ONE_HUNDRED).round_dp(2)
        };

        PriceQuote {
            room_type: input.room_type,
            nights,
            base_rate_per_night: input.base_rate_per_night,
            base_total: base_total.round_dp(2),
            strategy_adjustments,
            seasonal_adjustments,
            weekend_adjustments,
            promo_code,
            promo_discount: promo_discount.round_dp(2),
            promo_error,
            subtotal,
            tax_amount,
            final_total,
            total_savings,
            savings_percentage,
        }
    }
}

/// Highest priority first; ties keep their input order
fn by_priority<T>(items: &[T], priority: impl Fn(&T) -> i32) -> impl Iterator<Item = &T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by_key(|item| std::cmp::Reverse(priority(item)));
    sorted.into_iter()
}

fn strategy_applies(strategy: &PricingStrategy, input: &QuoteInput<'_>) -> bool {
    let days_in_advance = (input.stay.check_in() - input.booking_date).num_days();
    match strategy.strategy_type {
        PricingStrategyType::Standard => true,
        PricingStrategyType::DemandBased => {
            strategy
                .min_occupancy_threshold
                .map_or(true, |min| input.occupancy_rate >= min)
                && strategy
                    .max_occupancy_threshold
                    .map_or(true, |max| input.occupancy_rate <= max)
        }
        PricingStrategyType::EarlyBird => strategy
            .advance_booking_days
            .is_some_and(|days| days_in_advance >= days),
        PricingStrategyType::LastMinute => days_in_advance <= 1,
        PricingStrategyType::LengthOfStay => input.stay.nights() >= LENGTH_OF_STAY_NIGHTS,
    }
}

fn promotion_check<'a>(
    input: &QuoteInput<'a>,
    amount: Decimal,
) -> Result<&'a PromotionalCode, &'static str> {
    let promo = input
        .promotion
        .ok_or("Invalid or expired promotional code")?;
    if !promo.is_valid_for_date(input.stay.check_in()) {
        return Err("Promotional code is not valid for the selected dates");
    }
    if !promo.is_valid_for_amount(amount) {
        return Err("Booking amount does not meet minimum requirement");
    }
    if promo
        .min_nights
        .is_some_and(|min| input.stay.nights() < i64::from(min))
    {
        return Err("Stay is too short for this promotional code");
    }
    if promo.room_type.is_some_and(|rt| rt != input.room_type) {
        return Err("Promotional code does not apply to this room type");
    }
    Ok(promo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscountType, RateAdjustmentType};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, m, d).unwrap()
    }

    fn input<'a>(stay: StayDates, booking_date: NaiveDate) -> QuoteInput<'a> {
        QuoteInput {
            room_type: RoomType::Standard,
            base_rate_per_night: dec!(100),
            stay,
            booking_date,
            occupancy_rate: Decimal::ZERO,
            promo_code: None,
            promotion: None,
        }
    }

    fn calculator() -> PriceCalculator {
        PriceCalculator::new(PricingPolicy::default())
    }

    #[test]
    fn test_plain_quote_adds_tax() {
        let stay = StayDates::new(date(3, 1), date(3, 4)).unwrap();
        let quote = calculator().quote(&input(stay, date(1, 1)), &[], &[]);
        assert_eq!(quote.nights, 3);
        assert_eq!(quote.base_total, dec!(300));
        assert_eq!(quote.subtotal, dec!(300));
        assert_eq!(quote.tax_amount, dec!(45));
        assert_eq!(quote.final_total, dec!(345));
        assert_eq!(quote.total_savings, Decimal::ZERO);
    }

    #[test]
    fn test_length_of_stay_and_early_bird() {
        let hotel = Uuid::new_v4();
        let stay = StayDates::new(date(3, 1), date(3, 8)).unwrap();
        let mut los = PricingStrategy::new(
            hotel,
            PricingStrategyType::LengthOfStay,
            "Week stay".into(),
            dec!(0.90),
            date(1, 1),
        );
        los.priority = 1;
        let mut early = PricingStrategy::new(
            hotel,
            PricingStrategyType::EarlyBird,
            "Early bird".into(),
            dec!(0.95),
            date(1, 1),
        );
        early.advance_booking_days = Some(30);

        let quote =
            calculator().quote(&input(stay, date(1, 1)), &[early.clone(), los.clone()], &[]);
        // 700 - 70 - 35
        assert_eq!(quote.subtotal, dec!(595));
        assert_eq!(quote.strategy_adjustments[0].name, "Week stay");
        assert_eq!(quote.total_savings, dec!(105));
        assert_eq!(quote.savings_percentage, dec!(15));

        // booked too late for early bird
        let quote = calculator().quote(&input(stay, date(2, 20)), &[early, los], &[]);
        assert_eq!(quote.subtotal, dec!(630));
    }

    #[test]
    fn test_last_minute_and_demand() {
        let hotel = Uuid::new_v4();
        let stay = StayDates::new(date(3, 1), date(3, 2)).unwrap();
        let last_minute = PricingStrategy::new(
            hotel,
            PricingStrategyType::LastMinute,
            "Tonight".into(),
            dec!(0.8),
            date(1, 1),
        );
        let mut demand = PricingStrategy::new(
            hotel,
            PricingStrategyType::DemandBased,
            "High demand".into(),
            dec!(1.25),
            date(1, 1),
        );
        demand.min_occupancy_threshold = Some(dec!(0.8));

        let mut req = input(stay, date(3, 1));
        req.occupancy_rate = dec!(0.5);
        let quote = calculator().quote(&req, &[last_minute.clone(), demand.clone()], &[]);
        assert_eq!(quote.subtotal, dec!(80));

        req.occupancy_rate = dec!(0.9);
        let quote = calculator().quote(&req, &[last_minute, demand], &[]);
        assert_eq!(quote.subtotal, dec!(105));
    }

    #[test]
    fn test_seasonal_rate_on_check_in() {
        let hotel = Uuid::new_v4();
        let stay = StayDates::new(date(9, 10), date(9, 12)).unwrap();
        let peak = SeasonalRate::new(hotel, "Meskel".into(), date(9, 10), date(9, 30), dec!(1.2));
        let mut flat = SeasonalRate::new(hotel, "Rainy".into(), date(7, 1), date(8, 31), dec!(1));
        flat.adjustment_type = RateAdjustmentType::FixedAdjustment;
        flat.fixed_adjustment = Some(dec!(-50));

        let quote = calculator().quote(&input(stay, date(1, 1)), &[], &[peak, flat]);
        assert_eq!(quote.subtotal, dec!(240));
        assert_eq!(quote.seasonal_adjustments.len(), 1);
        assert_eq!(quote.seasonal_adjustments[0].amount, dec!(40));
    }

    #[test]
    fn test_weekend_premium() {
        let policy = PricingPolicy {
            tax_rate: Decimal::ZERO,
            weekend_premium: dec!(0.20),
        };
        // 2027-03-05 is a Friday
        let stay = StayDates::new(date(3, 4), date(3, 7)).unwrap();
        let quote = PriceCalculator::new(policy).quote(&input(stay, date(1, 1)), &[], &[]);
        assert_eq!(quote.weekend_adjustments.len(), 2);
        assert_eq!(quote.final_total, dec!(340));
    }

    #[test]
    fn test_promo_code_applied_and_rejected() {
        let hotel = Uuid::new_v4();
        let stay = StayDates::new(date(3, 1), date(3, 3)).unwrap();
        let promo = PromotionalCode::new(
            hotel,
            "WELCOME",
            "Welcome".into(),
            DiscountType::Percentage,
            dec!(10),
            date(1, 1),
            date(12, 31),
        );

        let mut req = input(stay, date(1, 1));
        req.promo_code = Some("welcome");
        req.promotion = Some(&promo);
        let quote = calculator().quote(&req, &[], &[]);
        assert_eq!(quote.promo_code.as_deref(), Some("WELCOME"));
        assert_eq!(quote.promo_discount, dec!(20));
        assert_eq!(quote.subtotal, dec!(180));
        assert_eq!(quote.final_total, dec!(207));

        req.promotion = None;
        let quote = calculator().quote(&req, &[], &[]);
        assert!(quote.promo_code.is_none());
        assert_eq!(quote.promo_error.as_deref(), Some("Invalid or expired promotional code"));
        assert_eq!(quote.subtotal, dec!(200));
    }
}

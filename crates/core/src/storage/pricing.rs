//! Pricing configuration storage: strategies, seasonal rates, promo codes
//!
//! All three are hotel-scoped. Callers resolve the hotel in the caller's
//! tenant scope first and then address rows by `(hotel_id, id)`.

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    date_param, parse_date, parse_date_opt, parse_datetime, parse_decimal, parse_decimal_opt,
    parse_enum, parse_enum_opt, parse_uuid, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{
    normalize_code, DiscountType, PricingStrategy, PricingStrategyType, PromotionalCode,
    RateAdjustmentType, RoomType, SeasonalRate,
};

const STRATEGY_COLUMNS: &str = "id, hotel_id, strategy_type, name, base_rate_multiplier, \
                                min_occupancy_threshold, max_occupancy_threshold, \
                                advance_booking_days, effective_from, effective_to, room_type, \
                                is_active, priority, created_at";

const SEASON_COLUMNS: &str = "id, hotel_id, season_name, start_date, end_date, room_type, \
                              adjustment_type, rate_multiplier, fixed_adjustment, priority, \
                              is_active, created_at";

const PROMO_COLUMNS: &str = "id, hotel_id, code, name, description, discount_type, discount_value, \
                             max_discount_amount, min_booking_amount, valid_from, valid_to, \
                             usage_limit, usage_count, min_nights, room_type, is_active, \
                             created_at";

fn strategy_from_row(row: &Row<'_>) -> rusqlite::Result<PricingStrategy> {
    Ok(PricingStrategy {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(1)?)?,
        strategy_type: parse_enum(
            &row.get::<_, String>(2)?,
            "strategy type",
            PricingStrategyType::from_str,
        )?,
        name: row.get(3)?,
        base_rate_multiplier: parse_decimal(&row.get::<_, String>(4)?)?,
        min_occupancy_threshold: parse_decimal_opt(row.get(5)?)?,
        max_occupancy_threshold: parse_decimal_opt(row.get(6)?)?,
        advance_booking_days: row.get(7)?,
        effective_from: parse_date(&row.get::<_, String>(8)?)?,
        effective_to: parse_date_opt(row.get(9)?)?,
        room_type: parse_enum_opt(row.get(10)?, "room type", RoomType::from_str)?,
        is_active: row.get(11)?,
        priority: row.get(12)?,
        created_at: parse_datetime(&row.get::<_, String>(13)?)?,
    })
}

fn season_from_row(row: &Row<'_>) -> rusqlite::Result<SeasonalRate> {
    Ok(SeasonalRate {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(1)?)?,
        season_name: row.get(2)?,
        start_date: parse_date(&row.get::<_, String>(3)?)?,
        end_date: parse_date(&row.get::<_, String>(4)?)?,
        room_type: parse_enum_opt(row.get(5)?, "room type", RoomType::from_str)?,
        adjustment_type: parse_enum(
            &row.get::<_, String>(6)?,
            "adjustment type",
            RateAdjustmentType::from_str,
        )?,
        rate_multiplier: parse_decimal(&row.get::<_, String>(7)?)?,
        fixed_adjustment: parse_decimal_opt(row.get(8)?)?,
        priority: row.get(9)?,
        is_active: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?)?,
    })
}

fn promo_from_row(row: &Row<'_>) -> rusqlite::Result<PromotionalCode> {
    Ok(PromotionalCode {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        hotel_id: parse_uuid(&row.get::<_, String>(1)?)?,
        code: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        discount_type: parse_enum(
            &row.get::<_, String>(5)?,
            "discount type",
            DiscountType::from_str,
        )?,
        discount_value: parse_decimal(&row.get::<_, String>(6)?)?,
        max_discount_amount: parse_decimal_opt(row.get(7)?)?,
        min_booking_amount: parse_decimal_opt(row.get(8)?)?,
        valid_from: parse_date(&row.get::<_, String>(9)?)?,
        valid_to: parse_date(&row.get::<_, String>(10)?)?,
        usage_limit: row.get(11)?,
        usage_count: row.get(12)?,
        min_nights: row.get(13)?,
        room_type: parse_enum_opt(row.get(14)?, "room type", RoomType::from_str)?,
        is_active: row.get(15)?,
        created_at: parse_datetime(&row.get::<_, String>(16)?)?,
    })
}

pub struct PricingStore<'a> {
    conn: &'a Connection,
}

impl<'a> PricingStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // Strategies

    #[instrument(
        skip(self, strategy),
        fields(hotel_id = %strategy.hotel_id, name = %strategy.name)
    )]
    pub fn create_strategy(&self, strategy: &PricingStrategy) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO pricing_strategies ({STRATEGY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                strategy.id.to_string(),
                strategy.hotel_id.to_string(),
                strategy.strategy_type.as_str(),
                strategy.name,
                strategy.base_rate_multiplier.to_string(),
                strategy.min_occupancy_threshold.map(|d| d.to_string()),
                strategy.max_occupancy_threshold.map(|d| d.to_string()),
                strategy.advance_booking_days,
                date_param(strategy.effective_from),
                strategy.effective_to.map(date_param),
                strategy.room_type.map(|t| t.as_str()),
                strategy.is_active,
                strategy.priority,
                strategy.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_strategy(&self, hotel_id: Uuid, id: Uuid) -> Result<Option<PricingStrategy>> {
        let strategy = self
            .conn
            .query_row(
                &format!(
                    "SELECT {STRATEGY_COLUMNS} FROM pricing_strategies
                     WHERE id = ?1 AND hotel_id = ?2"
                ),
                params![id.to_string(), hotel_id.to_string()],
                strategy_from_row,
            )
            .optional()?;
        Ok(strategy)
    }

    pub fn update_strategy(&self, strategy: &PricingStrategy) -> Result<()> {
        self.conn.execute(
            "UPDATE pricing_strategies SET strategy_type = ?1, name = ?2, base_rate_multiplier = ?3,
                min_occupancy_threshold = ?4, max_occupancy_threshold = ?5,
                advance_booking_days = ?6, effective_from = ?7, effective_to = ?8, room_type = ?9,
                is_active = ?10, priority = ?11
             WHERE id = ?12",
            params![
                strategy.strategy_type.as_str(),
                strategy.name,
                strategy.base_rate_multiplier.to_string(),
                strategy.min_occupancy_threshold.map(|d| d.to_string()),
                strategy.max_occupancy_threshold.map(|d| d.to_string()),
                strategy.advance_booking_days,
                date_param(strategy.effective_from),
                strategy.effective_to.map(date_param),
                strategy.room_type.map(|t| t.as_str()),
                strategy.is_active,
                strategy.priority,
                strategy.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_strategy(&self, hotel_id: Uuid, id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM pricing_strategies WHERE id = ?1 AND hotel_id = ?2",
            params![id.to_string(), hotel_id.to_string()],
        )?;
        Ok(())
    }

    /// All strategies of a hotel, highest priority first
    pub fn list_strategies(&self, hotel_id: Uuid) -> Result<Vec<PricingStrategy>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {STRATEGY_COLUMNS} FROM pricing_strategies WHERE hotel_id = ?1
             ORDER BY priority DESC, name"
        ))?;
        let strategies = stmt
            .query_map(params![hotel_id.to_string()], strategy_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(strategies)
    }

    // Seasonal rates

    #[instrument(
        skip(self, season),
        fields(hotel_id = %season.hotel_id, season = %season.season_name)
    )]
    pub fn create_season(&self, season: &SeasonalRate) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO seasonal_rates ({SEASON_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                season.id.to_string(),
                season.hotel_id.to_string(),
                season.season_name,
                date_param(season.start_date),
                date_param(season.end_date),
                season.room_type.map(|t| t.as_str()),
                season.adjustment_type.as_str(),
                season.rate_multiplier.to_string(),
                season.fixed_adjustment.map(|d| d.to_string()),
                season.priority,
                season.is_active,
                season.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_season(&self, hotel_id: Uuid, id: Uuid) -> Result<Option<SeasonalRate>> {
        let season = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SEASON_COLUMNS} FROM seasonal_rates WHERE id = ?1 AND hotel_id = ?2"
                ),
                params![id.to_string(), hotel_id.to_string()],
                season_from_row,
            )
            .optional()?;
        Ok(season)
    }

    pub fn update_season(&self, season: &SeasonalRate) -> Result<()> {
        self.conn.execute(
            "UPDATE seasonal_rates SET season_name = ?1, start_date = ?2, end_date = ?3,
                room_type = ?4, adjustment_type = ?5, rate_multiplier = ?6, fixed_adjustment = ?7,
                priority = ?8, is_active = ?9
             WHERE id = ?10",
            params![
                season.season_name,
                date_param(season.start_date),
                date_param(season.end_date),
                season.room_type.map(|t| t.as_str()),
                season.adjustment_type.as_str(),
                season.rate_multiplier.to_string(),
                season.fixed_adjustment.map(|d| d.to_string()),
                season.priority,
                season.is_active,
                season.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_season(&self, hotel_id: Uuid, id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM seasonal_rates WHERE id = ?1 AND hotel_id = ?2",
            params![id.to_string(), hotel_id.to_string()],
        )?;
        Ok(())
    }

    pub fn list_seasons(&self, hotel_id: Uuid) -> Result<Vec<SeasonalRate>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SEASON_COLUMNS} FROM seasonal_rates WHERE hotel_id = ?1
             ORDER BY start_date, priority DESC"
        ))?;
        let seasons = stmt
            .query_map(params![hotel_id.to_string()], season_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(seasons)
    }

    // Promotional codes

    #[instrument(skip(self, promo), fields(hotel_id = %promo.hotel_id, code = %promo.code))]
    pub fn create_promo(&self, promo: &PromotionalCode) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO promotional_codes ({PROMO_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17)"
            ),
            params![
                promo.id.to_string(),
                promo.hotel_id.to_string(),
                promo.code,
                promo.name,
                promo.description,
                promo.discount_type.as_str(),
                promo.discount_value.to_string(),
                promo.max_discount_amount.map(|d| d.to_string()),
                promo.min_booking_amount.map(|d| d.to_string()),
                date_param(promo.valid_from),
                date_param(promo.valid_to),
                promo.usage_limit,
                promo.usage_count,
                promo.min_nights,
                promo.room_type.map(|t| t.as_str()),
                promo.is_active,
                promo.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_promo(&self, hotel_id: Uuid, id: Uuid) -> Result<Option<PromotionalCode>> {
        let promo = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PROMO_COLUMNS} FROM promotional_codes WHERE id = ?1 AND hotel_id = ?2"
                ),
                params![id.to_string(), hotel_id.to_string()],
                promo_from_row,
            )
            .optional()?;
        Ok(promo)
    }

    pub fn find_promo_by_code(
        &self,
        hotel_id: Uuid,
        code: &str,
    ) -> Result<Option<PromotionalCode>> {
        let promo = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PROMO_COLUMNS} FROM promotional_codes
                     WHERE hotel_id = ?1 AND code = ?2"
                ),
                params![hotel_id.to_string(), normalize_code(code)],
                promo_from_row,
            )
            .optional()?;
        Ok(promo)
    }

    pub fn code_taken(&self, hotel_id: Uuid, code: &str, except: Option<Uuid>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM promotional_codes
             WHERE hotel_id = ?1 AND code = ?2 AND (?3 IS NULL OR id != ?3)",
            params![hotel_id.to_string(), normalize_code(code), except.map(|id| id.to_string())],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn update_promo(&self, promo: &PromotionalCode) -> Result<()> {
        self.conn.execute(
            "UPDATE promotional_codes SET code = ?1, name = ?2, description = ?3,
                discount_type = ?4, discount_value = ?5, max_discount_amount = ?6,
                min_booking_amount = ?7, valid_from = ?8, valid_to = ?9, usage_limit = ?10,
                min_nights = ?11, room_type = ?12, is_active = ?13
             WHERE id = ?14",
            params![
                promo.code,
                promo.name,
                promo.description,
                promo.discount_type.as_str(),
                promo.discount_value.to_string(),
                promo.max_discount_amount.map(|d| d.to_string()),
                promo.min_booking_amount.map(|d| d.to_string()),
                date_param(promo.valid_from),
                date_param(promo.valid_to),
                promo.usage_limit,
                promo.min_nights,
                promo.room_type.map(|t| t.as_str()),
                promo.is_active,
                promo.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Count one redemption, refusing once the usage limit is reached
    #[instrument(skip(self))]
    pub fn record_promo_use(&self, id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE promotional_codes SET usage_count = usage_count + 1
             WHERE id = ?1 AND (usage_limit IS NULL OR usage_count < usage_limit)",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::Conflict("Promotional code usage limit reached".into()));
        }
        Ok(())
    }

    pub fn delete_promo(&self, hotel_id: Uuid, id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM promotional_codes WHERE id = ?1 AND hotel_id = ?2",
            params![id.to_string(), hotel_id.to_string()],
        )?;
        Ok(())
    }

    pub fn list_promos(&self, hotel_id: Uuid) -> Result<Vec<PromotionalCode>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROMO_COLUMNS} FROM promotional_codes WHERE hotel_id = ?1
             ORDER BY valid_from DESC, code"
        ))?;
        let promos = stmt
            .query_map(params![hotel_id.to_string()], promo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(promos)
    }
}

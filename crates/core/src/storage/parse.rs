//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A stored value that does not decode into its domain type
#[derive(Debug, thiserror::Error)]
#[error("invalid stored {kind}: {value}")]
struct InvalidStoredValue {
    kind: &'static str,
    value: String,
}

fn conversion_error(kind: &'static str, value: &str) -> SqlError {
    SqlError::FromSqlConversionFailure(
        0,
        Type::Text,
        Box::new(InvalidStoredValue {
            kind,
            value: value.to_string(),
        }),
    )
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Parse an optional UUID from a database string column
pub fn parse_uuid_opt(s: Option<String>) -> Result<Option<Uuid>, SqlError> {
    s.map(|s| parse_uuid(&s)).transpose()
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Parse a calendar date stored as `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

pub fn parse_date_opt(s: Option<String>) -> Result<Option<NaiveDate>, SqlError> {
    s.map(|s| parse_date(&s)).transpose()
}

/// Parse a money amount stored as decimal text
pub fn parse_decimal(s: &str) -> Result<Decimal, SqlError> {
    Decimal::from_str(s).map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

pub fn parse_decimal_opt(s: Option<String>) -> Result<Option<Decimal>, SqlError> {
    s.map(|s| parse_decimal(&s)).transpose()
}

/// Parse a string-backed enum through its `from_str`
pub fn parse_enum<T>(
    s: &str,
    kind: &'static str,
    from_str: fn(&str) -> Option<T>,
) -> Result<T, SqlError> {
    from_str(s).ok_or_else(|| conversion_error(kind, s))
}

pub fn parse_enum_opt<T>(
    s: Option<String>,
    kind: &'static str,
    from_str: fn(&str) -> Option<T>,
) -> Result<Option<T>, SqlError> {
    s.map(|s| parse_enum(&s, kind, from_str)).transpose()
}

/// Parse an optional JSON document column
pub fn parse_json_opt(s: Option<String>) -> Result<Option<serde_json::Value>, SqlError> {
    s.map(|s| {
        serde_json::from_str(&s)
            .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Format a date the way it is stored
pub fn date_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoomStatus;

    #[test]
    fn test_date_round_trip_keeps_sort_order() {
        let a = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        assert!(date_param(a) < date_param(b));
        assert_eq!(parse_date(&date_param(a)).unwrap(), a);
    }

    #[test]
    fn test_bad_values_are_conversion_failures() {
        assert!(matches!(
            parse_enum("SOMEWHERE", "room status", RoomStatus::from_str),
            Err(SqlError::FromSqlConversionFailure(..))
        ));
        assert!(parse_decimal("12.x").is_err());
        assert!(parse_json_opt(Some("{\"status\":".into())).is_err());
        assert_eq!(parse_json_opt(None).unwrap(), None);
        assert_eq!(
            parse_enum("OCCUPIED", "room status", RoomStatus::from_str).unwrap(),
            RoomStatus::Occupied
        );
    }
}

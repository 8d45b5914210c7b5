//! Lossless decoding of `NUMERIC`, `DATE`, and timestamp columns.
//!
//! Numeric and date columns are selected with `::text` casts and parsed
//! here, so `NUMERIC(10,8)` coordinates round-trip exactly instead of
//! passing through a float.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::DbError;

/// Parses a required `NUMERIC` column read back as text.
pub fn decimal(column: &str, value: Option<String>) -> Result<Decimal, DbError> {
    opt_decimal(column, value)?.ok_or_else(|| DbError::Conversion {
        message: format!("Missing value for numeric column {column}"),
    })
}

/// Parses a nullable `NUMERIC` column read back as text.
pub fn opt_decimal(column: &str, value: Option<String>) -> Result<Option<Decimal>, DbError> {
    value
        .map(|text| {
            Decimal::from_str(&text).map_err(|e| DbError::Conversion {
                message: format!("Failed to parse numeric column {column}={text:?}: {e}"),
            })
        })
        .transpose()
}

/// Parses a required `DATE` column read back as text.
pub fn date(column: &str, value: Option<String>) -> Result<NaiveDate, DbError> {
    opt_date(column, value)?.ok_or_else(|| DbError::Conversion {
        message: format!("Missing value for date column {column}"),
    })
}

/// Parses a nullable `DATE` column read back as text.
pub fn opt_date(column: &str, value: Option<String>) -> Result<Option<NaiveDate>, DbError> {
    value
        .map(|text| {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| DbError::Conversion {
                message: format!("Failed to parse date column {column}={text:?}: {e}"),
            })
        })
        .transpose()
}

/// Converts a naive timestamp column value (stored in UTC) into a
/// [`DateTime<Utc>`].
pub fn datetime_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_roundtrip_exactly() {
        let lat = decimal("latitude", Some("23.12345678".to_string())).unwrap();
        let lon = decimal("longitude", Some("113.87654321".to_string())).unwrap();

        assert_eq!(lat.to_string(), "23.12345678");
        assert_eq!(lon.to_string(), "113.87654321");
    }

    #[test]
    fn trailing_zeros_are_preserved() {
        let area = decimal("land_area", Some("120.00".to_string())).unwrap();
        assert_eq!(area.to_string(), "120.00");
    }

    #[test]
    fn null_numeric_maps_to_none() {
        assert_eq!(opt_decimal("land_area", None).unwrap(), None);
        assert!(decimal("land_area", None).is_err());
    }

    #[test]
    fn garbage_numeric_is_a_conversion_error() {
        let err = decimal("latitude", Some("north-ish".to_string())).unwrap_err();
        assert!(matches!(err, DbError::Conversion { .. }));
    }

    #[test]
    fn dates_parse_iso_format() {
        let parsed = date("start_date", Some("2024-01-10".to_string())).unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(opt_date("start_date", None).unwrap(), None);
        assert!(date("start_date", Some("01/10/2024".to_string())).is_err());
    }
}

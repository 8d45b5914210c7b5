//! Write-boundary precondition checks.
//!
//! The legacy schema accepted negative areas, violation areas larger than
//! the building, and discovery dates before the construction start date.
//! These checks run before every insert/update and surface as
//! [`DbError::ConstraintViolation`] so invalid writes are rejected instead
//! of silently stored.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::DbError;

/// Column precision of `latitude NUMERIC(10,8)`.
pub const LATITUDE_PRECISION: u32 = 10;
/// Column precision of `longitude NUMERIC(11,8)`.
pub const LONGITUDE_PRECISION: u32 = 11;
/// Fractional digits of both coordinate columns.
pub const COORDINATE_SCALE: u32 = 8;

/// Checks that a required text field is non-empty after trimming.
pub fn require_text(field: &str, value: &str) -> Result<(), DbError> {
    if value.trim().is_empty() {
        return Err(DbError::ConstraintViolation {
            message: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

/// Checks that an area value, when present, is non-negative.
pub fn non_negative(field: &str, value: Option<Decimal>) -> Result<(), DbError> {
    if let Some(v) = value
        && v.is_sign_negative()
        && !v.is_zero()
    {
        return Err(DbError::ConstraintViolation {
            message: format!("{field} must not be negative (got {v})"),
        });
    }
    Ok(())
}

/// Checks that a coordinate fits its `NUMERIC(precision, 8)` column without
/// rounding: at most 8 fractional digits and an integer part small enough
/// for the declared precision.
pub fn coordinate(field: &str, value: Decimal, precision: u32) -> Result<(), DbError> {
    if value.scale() > COORDINATE_SCALE {
        return Err(DbError::ConstraintViolation {
            message: format!(
                "{field} has {} fractional digits, column allows {COORDINATE_SCALE}",
                value.scale()
            ),
        });
    }

    let integer_digits = precision - COORDINATE_SCALE;
    let bound = Decimal::from(10_i64.pow(integer_digits));
    if value.abs() >= bound {
        return Err(DbError::ConstraintViolation {
            message: format!("{field} {value} does not fit NUMERIC({precision},{COORDINATE_SCALE})"),
        });
    }

    Ok(())
}

/// Cross-field case invariants, applied to the effective values of a write
/// (for updates, the merged view of stored and incoming fields).
pub fn case_fields(
    land_area: Option<Decimal>,
    building_area: Option<Decimal>,
    violation_area: Option<Decimal>,
    start_date: Option<NaiveDate>,
    discovery_date: Option<NaiveDate>,
) -> Result<(), DbError> {
    non_negative("land_area", land_area)?;
    non_negative("building_area", building_area)?;
    non_negative("violation_area", violation_area)?;

    if let (Some(violation), Some(building)) = (violation_area, building_area)
        && violation > building
    {
        return Err(DbError::ConstraintViolation {
            message: format!(
                "violation_area {violation} exceeds building_area {building}"
            ),
        });
    }

    if let (Some(start), Some(discovery)) = (start_date, discovery_date)
        && discovery < start
    {
        return Err(DbError::ConstraintViolation {
            message: format!(
                "discovery_date {discovery} is before start_date {start}"
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn empty_required_text_rejected() {
        assert!(require_text("violation_reason", "unpermitted floor").is_ok());
        assert!(require_text("violation_reason", "").is_err());
        assert!(require_text("violation_reason", "   ").is_err());
    }

    #[test]
    fn negative_areas_rejected() {
        assert!(non_negative("land_area", None).is_ok());
        assert!(non_negative("land_area", Some(dec("0.00"))).is_ok());
        assert!(non_negative("land_area", Some(dec("120.50"))).is_ok());
        assert!(non_negative("land_area", Some(dec("-0.01"))).is_err());
    }

    #[test]
    fn coordinates_must_fit_column() {
        assert!(coordinate("latitude", dec("23.12345678"), LATITUDE_PRECISION).is_ok());
        assert!(coordinate("latitude", dec("-89.99999999"), LATITUDE_PRECISION).is_ok());
        assert!(coordinate("longitude", dec("113.87654321"), LONGITUDE_PRECISION).is_ok());

        // Too many fractional digits would be silently rounded by the cast.
        assert!(coordinate("latitude", dec("23.123456789"), LATITUDE_PRECISION).is_err());
        // Integer part too wide for NUMERIC(10,8).
        assert!(coordinate("latitude", dec("113.8765432"), LATITUDE_PRECISION).is_err());
        assert!(coordinate("longitude", dec("1000.0"), LONGITUDE_PRECISION).is_err());
    }

    #[test]
    fn violation_area_bounded_by_building_area() {
        assert!(case_fields(None, Some(dec("150.00")), Some(dec("30.00")), None, None).is_ok());
        assert!(case_fields(None, Some(dec("150.00")), Some(dec("150.00")), None, None).is_ok());
        assert!(case_fields(None, Some(dec("150.00")), Some(dec("150.01")), None, None).is_err());
        // Unbounded when either side is unknown.
        assert!(case_fields(None, None, Some(dec("999.00")), None, None).is_ok());
    }

    #[test]
    fn discovery_date_not_before_start_date() {
        assert!(case_fields(
            None,
            None,
            None,
            Some(day("2024-01-10")),
            Some(day("2024-02-01"))
        )
        .is_ok());
        assert!(case_fields(
            None,
            None,
            None,
            Some(day("2024-01-10")),
            Some(day("2024-01-10"))
        )
        .is_ok());
        assert!(case_fields(
            None,
            None,
            None,
            Some(day("2024-02-01")),
            Some(day("2024-01-10"))
        )
        .is_err());
    }
}

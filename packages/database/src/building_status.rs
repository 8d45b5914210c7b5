//! Building status tracker queries.
//!
//! Timestamped observations of the violating structure's physical state,
//! recorded by inspectors on site. Unlike demolition entries, the
//! observation date is mandatory: a state was seen on a day, not planned
//! for one. Entries are immutable once written except for correcting the
//! description text.

use chrono::NaiveDate;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use violation_map_database_models::BuildingProgressRow;

use crate::{DbError, decode, integrity, validate};

const BUILDING_COLUMNS: &str = "id, case_id, status_description,
        status_date::text AS status_date, inspector, photo_path, created_at, updated_at";

fn building_from_row(row: &switchy_database::Row) -> Result<BuildingProgressRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse building status id: {e}"),
    })?;

    let case_id: i32 = row.to_value("case_id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse building status case_id: {e}"),
    })?;

    let created_at: chrono::NaiveDateTime =
        row.to_value("created_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse building status created_at: {e}"),
        })?;
    let updated_at: chrono::NaiveDateTime =
        row.to_value("updated_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse building status updated_at: {e}"),
        })?;

    Ok(BuildingProgressRow {
        id,
        case_id,
        status_description: row.to_value("status_description").unwrap_or_default(),
        status_date: decode::date("status_date", row.to_value("status_date").unwrap_or(None))?,
        inspector: row.to_value("inspector").unwrap_or(None),
        photo_path: row.to_value("photo_path").unwrap_or(None),
        created_at: decode::datetime_utc(created_at),
        updated_at: decode::datetime_utc(updated_at),
    })
}

/// Appends a physical-state observation to a case.
///
/// # Errors
///
/// Returns [`DbError::ReferentialViolation`] if `case_id` does not resolve,
/// [`DbError::ConstraintViolation`] if the description is empty, or
/// [`DbError`] if the database operation fails.
pub async fn append_building_status(
    db: &dyn Database,
    case_id: i32,
    status_description: &str,
    status_date: NaiveDate,
    inspector: Option<&str>,
    photo_path: Option<&str>,
) -> Result<BuildingProgressRow, DbError> {
    validate::require_text("status_description", status_description)?;

    let case = db
        .query_raw_params(
            "SELECT id FROM violation_case WHERE id = $1",
            &[DatabaseValue::Int32(case_id)],
        )
        .await?;

    integrity::require_parent(
        case.first().is_some(),
        "building_violation_progress",
        "violation_case",
        i64::from(case_id),
    )?;

    let rows = db
        .query_raw_params(
            &format!(
                "INSERT INTO building_violation_progress (
                    case_id, status_description, status_date, inspector, photo_path
                ) VALUES ($1, $2, CAST($3 AS DATE), $4, $5)
                RETURNING {BUILDING_COLUMNS}"
            ),
            &[
                DatabaseValue::Int32(case_id),
                DatabaseValue::String(status_description.to_string()),
                DatabaseValue::String(status_date.to_string()),
                inspector.map_or(DatabaseValue::Null, |i| DatabaseValue::String(i.to_string())),
                photo_path.map_or(DatabaseValue::Null, |p| DatabaseValue::String(p.to_string())),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to read building status entry from insert".to_string(),
    })?;

    building_from_row(row)
}

/// Corrects the description of an existing observation.
///
/// The observation date and case link never change; a wrong date means a
/// new observation, not an edit.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such entry exists,
/// [`DbError::ConstraintViolation`] if the replacement text is empty, or
/// [`DbError`] if the database operation fails.
pub async fn correct_building_status(
    db: &dyn Database,
    id: i32,
    status_description: &str,
) -> Result<BuildingProgressRow, DbError> {
    validate::require_text("status_description", status_description)?;

    let rows = db
        .query_raw_params(
            &format!(
                "UPDATE building_violation_progress
                 SET status_description = $1, updated_at = NOW()
                 WHERE id = $2
                 RETURNING {BUILDING_COLUMNS}"
            ),
            &[
                DatabaseValue::String(status_description.to_string()),
                DatabaseValue::Int32(id),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::NotFound {
        entity: "building_violation_progress",
        key: id.to_string(),
    })?;

    building_from_row(row)
}

/// Lists a case's observations in the order the states were seen.
///
/// Ordered by observation date, breaking ties by creation time. Paged by
/// `limit`/`offset`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_building_status_for_case(
    db: &dyn Database,
    case_id: i32,
    limit: u32,
    offset: u32,
) -> Result<Vec<BuildingProgressRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {BUILDING_COLUMNS}
                 FROM building_violation_progress
                 WHERE case_id = $1
                 ORDER BY status_date ASC, created_at ASC, id ASC
                 LIMIT $2 OFFSET $3"
            ),
            &[
                DatabaseValue::Int32(case_id),
                DatabaseValue::Int64(i64::from(limit)),
                DatabaseValue::Int64(i64::from(offset)),
            ],
        )
        .await?;

    rows.iter().map(building_from_row).collect()
}

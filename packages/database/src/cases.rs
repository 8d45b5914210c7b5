//! Violation case registry queries.
//!
//! Cases anchor to exactly one location and are never hard-deleted in
//! normal operation; closure is a status transition. Updates carry an
//! optimistic-lock version token so concurrent edits from multiple
//! enforcement actors surface as [`DbError::ConcurrentModification`]
//! instead of silently overwriting each other.

use std::fmt::Write as _;

use chrono::{Datelike as _, NaiveDate};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use violation_map_case_models::CaseStatus;
use violation_map_database_models::{CaseQuery, CaseRow, CaseUpdate, NewCase};

use crate::{DbError, decode, integrity, validate};

const CASE_COLUMNS: &str = "id, case_number, geolocation_id, building_type, construction_unit,
        land_area::text AS land_area, building_area::text AS building_area,
        violation_area::text AS violation_area,
        start_date::text AS start_date, permit_status,
        discovery_date::text AS discovery_date, land_type, violation_reason,
        case_source, engineering_category, status, version, created_at, updated_at";

fn case_from_row(row: &switchy_database::Row) -> Result<CaseRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse case id: {e}"),
    })?;

    let geolocation_id: i32 = row
        .to_value("geolocation_id")
        .map_err(|e| DbError::Conversion {
            message: format!("Failed to parse case geolocation_id: {e}"),
        })?;

    let version: i64 = row.to_value("version").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse case version: {e}"),
    })?;

    let created_at: chrono::NaiveDateTime =
        row.to_value("created_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse case created_at: {e}"),
        })?;
    let updated_at: chrono::NaiveDateTime =
        row.to_value("updated_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse case updated_at: {e}"),
        })?;

    Ok(CaseRow {
        id,
        case_number: row.to_value("case_number").unwrap_or_default(),
        geolocation_id,
        building_type: row.to_value("building_type").unwrap_or(None),
        construction_unit: row.to_value("construction_unit").unwrap_or(None),
        land_area: decode::opt_decimal("land_area", row.to_value("land_area").unwrap_or(None))?,
        building_area: decode::opt_decimal(
            "building_area",
            row.to_value("building_area").unwrap_or(None),
        )?,
        violation_area: decode::opt_decimal(
            "violation_area",
            row.to_value("violation_area").unwrap_or(None),
        )?,
        start_date: decode::opt_date("start_date", row.to_value("start_date").unwrap_or(None))?,
        permit_status: row.to_value("permit_status").unwrap_or(None),
        discovery_date: decode::opt_date(
            "discovery_date",
            row.to_value("discovery_date").unwrap_or(None),
        )?,
        land_type: row.to_value("land_type").unwrap_or(None),
        violation_reason: row.to_value("violation_reason").unwrap_or_default(),
        case_source: row.to_value("case_source").unwrap_or(None),
        engineering_category: row.to_value("engineering_category").unwrap_or(None),
        status: row.to_value("status").unwrap_or_default(),
        version,
        created_at: decode::datetime_utc(created_at),
        updated_at: decode::datetime_utc(updated_at),
    })
}

/// Computes the next business case number for a year, given the highest
/// existing number with that year prefix.
///
/// Numbers are the four-digit year followed by a zero-padded sequence
/// starting at `0001`; the sequence resets each year.
fn next_case_number(year: i32, last: Option<&str>) -> String {
    let next_seq = last
        .and_then(|number| number.get(4..))
        .and_then(|seq| seq.parse::<u32>().ok())
        .map_or(1, |seq| seq + 1);

    format!("{year}{next_seq:04}")
}

fn opt_string(value: Option<&String>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |s| DatabaseValue::String(s.clone()))
}

fn opt_decimal_param(value: Option<rust_decimal::Decimal>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |d| DatabaseValue::String(d.to_string()))
}

fn opt_date_param(value: Option<NaiveDate>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |d| DatabaseValue::String(d.to_string()))
}

/// Creates a new violation case anchored to an existing location.
///
/// Generates the business case number (year prefix plus per-year sequence)
/// and starts the case in progress at version 1. Nothing is persisted when
/// any check fails.
///
/// # Errors
///
/// Returns [`DbError::ReferentialViolation`] if `geolocation_id` does not
/// resolve, [`DbError::ConstraintViolation`] if a field violates the write
/// preconditions, or [`DbError`] if the database operation fails.
pub async fn create_case(db: &dyn Database, case: &NewCase) -> Result<CaseRow, DbError> {
    validate::require_text("violation_reason", &case.violation_reason)?;
    validate::case_fields(
        case.land_area,
        case.building_area,
        case.violation_area,
        case.start_date,
        case.discovery_date,
    )?;

    let location = db
        .query_raw_params(
            "SELECT id FROM geographical_location WHERE id = $1",
            &[DatabaseValue::Int32(case.geolocation_id)],
        )
        .await?;

    integrity::require_parent(
        location.first().is_some(),
        "violation_case",
        "geographical_location",
        i64::from(case.geolocation_id),
    )?;

    // Length-first ordering keeps the lookup numeric: once the per-year
    // sequence widens past four digits, plain lexicographic order would
    // rank 20259999 above 202510000 and wedge the generator on an
    // already-issued number.
    let year = chrono::Utc::now().year();
    let last = db
        .query_raw_params(
            "SELECT case_number FROM violation_case
             WHERE case_number LIKE $1
             ORDER BY LENGTH(case_number) DESC, case_number DESC
             LIMIT 1",
            &[DatabaseValue::String(format!("{year}%"))],
        )
        .await?;

    let last_number: Option<String> = last
        .first()
        .and_then(|r| r.to_value("case_number").unwrap_or(None));
    let case_number = next_case_number(year, last_number.as_deref());

    let rows = db
        .query_raw_params(
            &format!(
                "INSERT INTO violation_case (
                    case_number, geolocation_id, building_type, construction_unit,
                    land_area, building_area, violation_area,
                    start_date, permit_status, discovery_date,
                    land_type, violation_reason, case_source, engineering_category,
                    status
                ) VALUES (
                    $1, $2, $3, $4,
                    CAST($5 AS NUMERIC(10,2)), CAST($6 AS NUMERIC(10,2)), CAST($7 AS NUMERIC(10,2)),
                    CAST($8 AS DATE), $9, CAST($10 AS DATE),
                    $11, $12, $13, $14,
                    $15
                )
                RETURNING {CASE_COLUMNS}"
            ),
            &[
                DatabaseValue::String(case_number.clone()),
                DatabaseValue::Int32(case.geolocation_id),
                opt_string(case.building_type.as_ref()),
                opt_string(case.construction_unit.as_ref()),
                opt_decimal_param(case.land_area),
                opt_decimal_param(case.building_area),
                opt_decimal_param(case.violation_area),
                opt_date_param(case.start_date),
                opt_string(case.permit_status.as_ref()),
                opt_date_param(case.discovery_date),
                opt_string(case.land_type.as_ref()),
                DatabaseValue::String(case.violation_reason.clone()),
                opt_string(case.case_source.as_ref()),
                opt_string(case.engineering_category.as_ref()),
                DatabaseValue::String(CaseStatus::InProgress.as_ref().to_string()),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to read case row from insert".to_string(),
    })?;

    log::info!("Created case {case_number} at location {}", case.geolocation_id);
    case_from_row(row)
}

/// Fetches a case by ID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such row exists, or [`DbError`] if
/// the database operation fails.
pub async fn get_case(db: &dyn Database, id: i32) -> Result<CaseRow, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {CASE_COLUMNS} FROM violation_case WHERE id = $1"),
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::NotFound {
        entity: "violation_case",
        key: id.to_string(),
    })?;

    case_from_row(row)
}

/// Fetches a case by its business case number.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such row exists, or [`DbError`] if
/// the database operation fails.
pub async fn get_case_by_number(db: &dyn Database, case_number: &str) -> Result<CaseRow, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {CASE_COLUMNS} FROM violation_case WHERE case_number = $1"),
            &[DatabaseValue::String(case_number.to_string())],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::NotFound {
        entity: "violation_case",
        key: case_number.to_string(),
    })?;

    case_from_row(row)
}

/// Applies a partial update to a case, checking and incrementing its
/// version in the same statement.
///
/// Cross-field invariants are validated against the merged view of stored
/// and incoming values, so an update cannot push `violation_area` past the
/// stored `building_area` or move `discovery_date` before the stored
/// `start_date`. An empty update reads and returns the current row without
/// writing or bumping the version.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such row exists,
/// [`DbError::ConcurrentModification`] if `expected_version` is stale,
/// [`DbError::ConstraintViolation`] if the effective values violate a write
/// precondition, or [`DbError`] if the database operation fails.
#[allow(clippy::too_many_lines)]
pub async fn update_case(
    db: &dyn Database,
    id: i32,
    expected_version: i64,
    update: &CaseUpdate,
) -> Result<CaseRow, DbError> {
    if update.is_empty() {
        return get_case(db, id).await;
    }

    if let Some(reason) = &update.violation_reason {
        validate::require_text("violation_reason", reason)?;
    }

    let current = get_case(db, id).await?;
    validate::case_fields(
        update.land_area.or(current.land_area),
        update.building_area.or(current.building_area),
        update.violation_area.or(current.violation_area),
        update.start_date.or(current.start_date),
        update.discovery_date.or(current.discovery_date),
    )?;

    let mut sql =
        String::from("UPDATE violation_case SET updated_at = NOW(), version = version + 1");
    let mut params: Vec<DatabaseValue> = Vec::new();
    let mut param_idx = 1u32;

    let mut set_param = |sql: &mut String, column: &str, cast: Option<&str>, value: DatabaseValue| {
        match cast {
            Some(ty) => write!(sql, ", {column} = CAST(${param_idx} AS {ty})").unwrap(),
            None => write!(sql, ", {column} = ${param_idx}").unwrap(),
        }
        params.push(value);
        param_idx += 1;
    };

    if let Some(v) = &update.building_type {
        set_param(&mut sql, "building_type", None, DatabaseValue::String(v.clone()));
    }
    if let Some(v) = &update.construction_unit {
        set_param(
            &mut sql,
            "construction_unit",
            None,
            DatabaseValue::String(v.clone()),
        );
    }
    if let Some(v) = update.land_area {
        set_param(
            &mut sql,
            "land_area",
            Some("NUMERIC(10,2)"),
            DatabaseValue::String(v.to_string()),
        );
    }
    if let Some(v) = update.building_area {
        set_param(
            &mut sql,
            "building_area",
            Some("NUMERIC(10,2)"),
            DatabaseValue::String(v.to_string()),
        );
    }
    if let Some(v) = update.violation_area {
        set_param(
            &mut sql,
            "violation_area",
            Some("NUMERIC(10,2)"),
            DatabaseValue::String(v.to_string()),
        );
    }
    if let Some(v) = update.start_date {
        set_param(
            &mut sql,
            "start_date",
            Some("DATE"),
            DatabaseValue::String(v.to_string()),
        );
    }
    if let Some(v) = &update.permit_status {
        set_param(&mut sql, "permit_status", None, DatabaseValue::String(v.clone()));
    }
    if let Some(v) = update.discovery_date {
        set_param(
            &mut sql,
            "discovery_date",
            Some("DATE"),
            DatabaseValue::String(v.to_string()),
        );
    }
    if let Some(v) = &update.land_type {
        set_param(&mut sql, "land_type", None, DatabaseValue::String(v.clone()));
    }
    if let Some(v) = &update.violation_reason {
        set_param(
            &mut sql,
            "violation_reason",
            None,
            DatabaseValue::String(v.clone()),
        );
    }
    if let Some(v) = &update.case_source {
        set_param(&mut sql, "case_source", None, DatabaseValue::String(v.clone()));
    }
    if let Some(v) = &update.engineering_category {
        set_param(
            &mut sql,
            "engineering_category",
            None,
            DatabaseValue::String(v.clone()),
        );
    }
    if let Some(status) = update.status {
        set_param(
            &mut sql,
            "status",
            None,
            DatabaseValue::String(status.as_ref().to_string()),
        );
    }

    write!(
        sql,
        " WHERE id = ${param_idx} AND version = ${}
          RETURNING {CASE_COLUMNS}",
        param_idx + 1
    )
    .unwrap();
    params.push(DatabaseValue::Int32(id));
    params.push(DatabaseValue::Int64(expected_version));

    let rows = db.query_raw_params(&sql, &params).await?;

    if let Some(row) = rows.first() {
        return case_from_row(row);
    }

    // No row matched: either the version moved underneath the caller or the
    // row vanished since the merge read above.
    let still_there = db
        .query_raw_params(
            "SELECT version FROM violation_case WHERE id = $1",
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    Err(integrity::stale_update(
        still_there.first().is_some(),
        "violation_case",
        i64::from(id),
        expected_version,
    ))
}

/// Deletes a case.
///
/// Not part of normal operation (cases close, they don't disappear), but
/// exposed for correcting mistaken filings. Fails while any progress entry
/// or archived document still references the case.
///
/// # Errors
///
/// Returns [`DbError::ReferentialConflict`] if dependent rows exist,
/// [`DbError::NotFound`] if no such row exists, or [`DbError`] if the
/// database operation fails.
pub async fn delete_case(db: &dyn Database, id: i32) -> Result<(), DbError> {
    let rows = db
        .query_raw_params(
            "SELECT (SELECT COUNT(*) FROM demolition_progress WHERE case_id = $1)
                  + (SELECT COUNT(*) FROM building_violation_progress WHERE case_id = $1)
                  + (SELECT COUNT(*) FROM file_archive WHERE case_id = $1)
                    AS dependents",
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    let dependents: i64 = rows
        .first()
        .map_or(0, |r| r.to_value("dependents").unwrap_or(0));

    integrity::reject_dependents("violation_case", i64::from(id), dependents)?;

    let deleted = db
        .query_raw_params(
            "DELETE FROM violation_case WHERE id = $1 RETURNING id",
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    if deleted.first().is_none() {
        return Err(DbError::NotFound {
            entity: "violation_case",
            key: id.to_string(),
        });
    }

    log::info!("Deleted case {id}");
    Ok(())
}

/// Queries cases with optional status, location, and discovery-date
/// filters.
///
/// Ordered by ID so `limit`/`offset` pages are stable and restartable.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_cases(db: &dyn Database, query: &CaseQuery) -> Result<Vec<CaseRow>, DbError> {
    let mut sql = format!("SELECT {CASE_COLUMNS} FROM violation_case WHERE 1=1");

    let mut params: Vec<DatabaseValue> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(status) = query.status {
        write!(sql, " AND status = ${param_idx}").unwrap();
        params.push(DatabaseValue::String(status.as_ref().to_string()));
        param_idx += 1;
    }

    if let Some(geolocation_id) = query.geolocation_id {
        write!(sql, " AND geolocation_id = ${param_idx}").unwrap();
        params.push(DatabaseValue::Int32(geolocation_id));
        param_idx += 1;
    }

    if let Some(from) = query.discovered_from {
        write!(sql, " AND discovery_date >= CAST(${param_idx} AS DATE)").unwrap();
        params.push(DatabaseValue::String(from.to_string()));
        param_idx += 1;
    }

    if let Some(to) = query.discovered_to {
        write!(sql, " AND discovery_date <= CAST(${param_idx} AS DATE)").unwrap();
        params.push(DatabaseValue::String(to.to_string()));
        param_idx += 1;
    }

    sql.push_str(" ORDER BY id");

    write!(sql, " LIMIT ${param_idx}").unwrap();
    params.push(DatabaseValue::Int64(i64::from(query.limit)));
    param_idx += 1;

    write!(sql, " OFFSET ${param_idx}").unwrap();
    params.push(DatabaseValue::Int64(i64::from(query.offset)));

    let rows = db.query_raw_params(&sql, &params).await?;

    rows.iter().map(case_from_row).collect()
}

/// Lists cases discovered within an inclusive date range.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_by_discovery_date_range(
    db: &dyn Database,
    from: NaiveDate,
    to: NaiveDate,
    limit: u32,
    offset: u32,
) -> Result<Vec<CaseRow>, DbError> {
    list_cases(
        db,
        &CaseQuery {
            discovered_from: Some(from),
            discovered_to: Some(to),
            limit,
            offset,
            ..CaseQuery::default()
        },
    )
    .await
}

/// Lists cases anchored to a location (its violation history).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_by_location(
    db: &dyn Database,
    geolocation_id: i32,
    limit: u32,
    offset: u32,
) -> Result<Vec<CaseRow>, DbError> {
    list_cases(
        db,
        &CaseQuery {
            geolocation_id: Some(geolocation_id),
            limit,
            offset,
            ..CaseQuery::default()
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_case_of_the_year() {
        assert_eq!(next_case_number(2025, None), "20250001");
    }

    #[test]
    fn sequence_increments_within_a_year() {
        assert_eq!(next_case_number(2025, Some("20250001")), "20250002");
        assert_eq!(next_case_number(2025, Some("20250012")), "20250013");
        assert_eq!(next_case_number(2025, Some("20259999")), "202510000");
    }

    #[test]
    fn widened_sequence_keeps_counting() {
        assert_eq!(next_case_number(2025, Some("202510000")), "202510001");
        assert_eq!(next_case_number(2025, Some("202512345")), "202512346");
    }

    #[test]
    fn widened_sequence_never_reissues() {
        // The max lookup orders by length before text, so the widened
        // number wins over the lexicographically larger four-digit one.
        let issued = ["20259999", "202510000"];
        let max = issued.iter().max_by_key(|n| (n.len(), *n)).unwrap();
        assert_eq!(*max, "202510000");

        let next = next_case_number(2025, Some(max));
        assert!(!issued.contains(&next.as_str()), "{next} was already issued");
    }

    #[test]
    fn sequence_resets_across_years() {
        // The lookup is prefix-filtered by year, so a new year sees no
        // previous number.
        assert_eq!(next_case_number(2026, None), "20260001");
    }

    #[test]
    fn malformed_legacy_numbers_restart_the_sequence() {
        assert_eq!(next_case_number(2025, Some("CASE_A")), "20250001");
        assert_eq!(next_case_number(2025, Some("2025")), "20250001");
    }
}

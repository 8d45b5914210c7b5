//! Location registry queries.
//!
//! Locations are canonical rows: they may pre-exist before any case
//! references them and survive case closure, so repeat violations at the
//! same address share one row. Coordinates are `NUMERIC` columns bound and
//! read as text so exact-match area queries never see float drift.

use std::fmt::Write as _;

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use violation_map_database_models::{LocationRow, LocationUpdate, NewLocation};

use crate::{DbError, decode, integrity, validate};

fn location_from_row(row: &switchy_database::Row) -> Result<LocationRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse location id: {e}"),
    })?;

    let created_at: chrono::NaiveDateTime =
        row.to_value("created_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse location created_at: {e}"),
        })?;
    let updated_at: chrono::NaiveDateTime =
        row.to_value("updated_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse location updated_at: {e}"),
        })?;

    Ok(LocationRow {
        id,
        community: row.to_value("community").unwrap_or_default(),
        address_number: row.to_value("address_number").unwrap_or_default(),
        latitude: decode::decimal("latitude", row.to_value("latitude").unwrap_or(None))?,
        longitude: decode::decimal("longitude", row.to_value("longitude").unwrap_or(None))?,
        created_at: decode::datetime_utc(created_at),
        updated_at: decode::datetime_utc(updated_at),
    })
}

/// Creates a new geographic location.
///
/// No coordinate range checking beyond column precision is performed here;
/// plausibility validation belongs to the caller.
///
/// # Errors
///
/// Returns [`DbError::ConstraintViolation`] if a required field is empty or
/// a coordinate does not fit its column, or [`DbError`] if the database
/// operation fails.
pub async fn create_location(
    db: &dyn Database,
    location: &NewLocation,
) -> Result<LocationRow, DbError> {
    validate::require_text("community", &location.community)?;
    validate::require_text("address_number", &location.address_number)?;
    validate::coordinate("latitude", location.latitude, validate::LATITUDE_PRECISION)?;
    validate::coordinate("longitude", location.longitude, validate::LONGITUDE_PRECISION)?;

    let rows = db
        .query_raw_params(
            "INSERT INTO geographical_location (community, address_number, latitude, longitude)
             VALUES ($1, $2, CAST($3 AS NUMERIC(10,8)), CAST($4 AS NUMERIC(11,8)))
             RETURNING id, community, address_number,
                       latitude::text AS latitude, longitude::text AS longitude,
                       created_at, updated_at",
            &[
                DatabaseValue::String(location.community.clone()),
                DatabaseValue::String(location.address_number.clone()),
                DatabaseValue::String(location.latitude.to_string()),
                DatabaseValue::String(location.longitude.to_string()),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to read location row from insert".to_string(),
    })?;

    location_from_row(row)
}

/// Fetches a location by ID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such row exists, or [`DbError`] if
/// the database operation fails.
pub async fn get_location(db: &dyn Database, id: i32) -> Result<LocationRow, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, community, address_number,
                    latitude::text AS latitude, longitude::text AS longitude,
                    created_at, updated_at
             FROM geographical_location
             WHERE id = $1",
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::NotFound {
        entity: "geographical_location",
        key: id.to_string(),
    })?;

    location_from_row(row)
}

/// Applies a partial update to a location, refreshing its modification
/// timestamp.
///
/// An empty update reads and returns the current row without writing.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such row exists,
/// [`DbError::ConstraintViolation`] if an updated field is invalid, or
/// [`DbError`] if the database operation fails.
pub async fn update_location(
    db: &dyn Database,
    id: i32,
    update: &LocationUpdate,
) -> Result<LocationRow, DbError> {
    if update.is_empty() {
        return get_location(db, id).await;
    }

    if let Some(community) = &update.community {
        validate::require_text("community", community)?;
    }
    if let Some(address_number) = &update.address_number {
        validate::require_text("address_number", address_number)?;
    }
    if let Some(latitude) = update.latitude {
        validate::coordinate("latitude", latitude, validate::LATITUDE_PRECISION)?;
    }
    if let Some(longitude) = update.longitude {
        validate::coordinate("longitude", longitude, validate::LONGITUDE_PRECISION)?;
    }

    let mut sql = String::from("UPDATE geographical_location SET updated_at = NOW()");
    let mut params: Vec<DatabaseValue> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(community) = &update.community {
        write!(sql, ", community = ${param_idx}").unwrap();
        params.push(DatabaseValue::String(community.clone()));
        param_idx += 1;
    }

    if let Some(address_number) = &update.address_number {
        write!(sql, ", address_number = ${param_idx}").unwrap();
        params.push(DatabaseValue::String(address_number.clone()));
        param_idx += 1;
    }

    if let Some(latitude) = update.latitude {
        write!(sql, ", latitude = CAST(${param_idx} AS NUMERIC(10,8))").unwrap();
        params.push(DatabaseValue::String(latitude.to_string()));
        param_idx += 1;
    }

    if let Some(longitude) = update.longitude {
        write!(sql, ", longitude = CAST(${param_idx} AS NUMERIC(11,8))").unwrap();
        params.push(DatabaseValue::String(longitude.to_string()));
        param_idx += 1;
    }

    write!(
        sql,
        " WHERE id = ${param_idx}
          RETURNING id, community, address_number,
                    latitude::text AS latitude, longitude::text AS longitude,
                    created_at, updated_at"
    )
    .unwrap();
    params.push(DatabaseValue::Int32(id));

    let rows = db.query_raw_params(&sql, &params).await?;

    let row = rows.first().ok_or_else(|| DbError::NotFound {
        entity: "geographical_location",
        key: id.to_string(),
    })?;

    location_from_row(row)
}

/// Deletes a location.
///
/// Fails while any case still references the row; the FK `ON DELETE
/// RESTRICT` enforces the same rule inside the database for writes that
/// race past this check.
///
/// # Errors
///
/// Returns [`DbError::ReferentialConflict`] if dependent cases exist,
/// [`DbError::NotFound`] if no such row exists, or [`DbError`] if the
/// database operation fails.
pub async fn delete_location(db: &dyn Database, id: i32) -> Result<(), DbError> {
    let rows = db
        .query_raw_params(
            "SELECT COUNT(*) AS dependents FROM violation_case WHERE geolocation_id = $1",
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    let dependents: i64 = rows
        .first()
        .map_or(0, |r| r.to_value("dependents").unwrap_or(0));

    integrity::reject_dependents("geographical_location", i64::from(id), dependents)?;

    let deleted = db
        .query_raw_params(
            "DELETE FROM geographical_location WHERE id = $1 RETURNING id",
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    if deleted.first().is_none() {
        return Err(DbError::NotFound {
            entity: "geographical_location",
            key: id.to_string(),
        });
    }

    log::info!("Deleted location {id}");
    Ok(())
}

/// Lists locations within a community, paged by `limit`/`offset`.
///
/// Ordered by ID so pages are stable and the scan is restartable.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_by_community(
    db: &dyn Database,
    community: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<LocationRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, community, address_number,
                    latitude::text AS latitude, longitude::text AS longitude,
                    created_at, updated_at
             FROM geographical_location
             WHERE community = $1
             ORDER BY id
             LIMIT $2 OFFSET $3",
            &[
                DatabaseValue::String(community.to_string()),
                DatabaseValue::Int64(i64::from(limit)),
                DatabaseValue::Int64(i64::from(offset)),
            ],
        )
        .await?;

    rows.iter().map(location_from_row).collect()
}

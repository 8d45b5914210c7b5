//! Demolition progress tracker queries.
//!
//! An append-only audit log of enforcement actions per case. Stage labels
//! stay free text so the pipeline is extensible; labels in the known
//! [`DemolitionStage`] vocabulary get a denormalized `stage_rank` so
//! listings follow true pipeline order rather than insertion order. The
//! only in-place mutation is backfilling the execution date of a planned
//! stage.

use chrono::NaiveDate;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use violation_map_case_models::DemolitionStage;
use violation_map_database_models::DemolitionProgressRow;

use crate::{DbError, decode, integrity, validate};

const DEMOLITION_COLUMNS: &str = "id, case_id, demolition_stage, stage_rank, executor,
        demolition_date::text AS demolition_date, created_at, updated_at";

fn demolition_from_row(row: &switchy_database::Row) -> Result<DemolitionProgressRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse demolition entry id: {e}"),
    })?;

    let case_id: i32 = row.to_value("case_id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse demolition entry case_id: {e}"),
    })?;

    let created_at: chrono::NaiveDateTime =
        row.to_value("created_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse demolition entry created_at: {e}"),
        })?;
    let updated_at: chrono::NaiveDateTime =
        row.to_value("updated_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse demolition entry updated_at: {e}"),
        })?;

    let stage_rank: Option<i32> = row.to_value("stage_rank").unwrap_or(None);

    Ok(DemolitionProgressRow {
        id,
        case_id,
        demolition_stage: row.to_value("demolition_stage").unwrap_or_default(),
        stage_rank: stage_rank.and_then(|rank| i16::try_from(rank).ok()),
        executor: row.to_value("executor").unwrap_or(None),
        demolition_date: decode::opt_date(
            "demolition_date",
            row.to_value("demolition_date").unwrap_or(None),
        )?,
        created_at: decode::datetime_utc(created_at),
        updated_at: decode::datetime_utc(updated_at),
    })
}

/// Appends an enforcement action to a case's demolition log.
///
/// The date may be `None` for a stage that is planned but not yet
/// executed; backfill it with [`update_demolition_date`] once it happens.
///
/// # Errors
///
/// Returns [`DbError::ReferentialViolation`] if `case_id` does not resolve,
/// [`DbError::ConstraintViolation`] if the stage label is empty, or
/// [`DbError`] if the database operation fails.
pub async fn append_demolition_stage(
    db: &dyn Database,
    case_id: i32,
    stage: &str,
    executor: Option<&str>,
    demolition_date: Option<NaiveDate>,
) -> Result<DemolitionProgressRow, DbError> {
    validate::require_text("demolition_stage", stage)?;

    let case = db
        .query_raw_params(
            "SELECT id FROM violation_case WHERE id = $1",
            &[DatabaseValue::Int32(case_id)],
        )
        .await?;

    integrity::require_parent(
        case.first().is_some(),
        "demolition_progress",
        "violation_case",
        i64::from(case_id),
    )?;

    let stage_rank = DemolitionStage::rank_of(stage);
    if stage_rank.is_none() {
        log::warn!("Appending demolition stage {stage:?} outside the known pipeline");
    }

    let rows = db
        .query_raw_params(
            &format!(
                "INSERT INTO demolition_progress (
                    case_id, demolition_stage, stage_rank, executor, demolition_date
                ) VALUES ($1, $2, CAST($3 AS SMALLINT), $4, CAST($5 AS DATE))
                RETURNING {DEMOLITION_COLUMNS}"
            ),
            &[
                DatabaseValue::Int32(case_id),
                DatabaseValue::String(stage.to_string()),
                stage_rank.map_or(DatabaseValue::Null, |rank| {
                    DatabaseValue::Int32(i32::from(rank))
                }),
                executor.map_or(DatabaseValue::Null, |e| DatabaseValue::String(e.to_string())),
                demolition_date.map_or(DatabaseValue::Null, |d| {
                    DatabaseValue::String(d.to_string())
                }),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to read demolition entry from insert".to_string(),
    })?;

    demolition_from_row(row)
}

/// Backfills the execution date of a recorded stage.
///
/// This is the only permitted mutation of a demolition entry; everything
/// else is append-only audit history.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such entry exists, or [`DbError`] if
/// the database operation fails.
pub async fn update_demolition_date(
    db: &dyn Database,
    id: i32,
    demolition_date: NaiveDate,
) -> Result<DemolitionProgressRow, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "UPDATE demolition_progress
                 SET demolition_date = CAST($1 AS DATE), updated_at = NOW()
                 WHERE id = $2
                 RETURNING {DEMOLITION_COLUMNS}"
            ),
            &[
                DatabaseValue::String(demolition_date.to_string()),
                DatabaseValue::Int32(id),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::NotFound {
        entity: "demolition_progress",
        key: id.to_string(),
    })?;

    demolition_from_row(row)
}

/// Lists a case's demolition log in pipeline order.
///
/// Known stages sort by rank; unknown stages sort after them by creation
/// time. Paged by `limit`/`offset`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_demolition_for_case(
    db: &dyn Database,
    case_id: i32,
    limit: u32,
    offset: u32,
) -> Result<Vec<DemolitionProgressRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {DEMOLITION_COLUMNS}
                 FROM demolition_progress
                 WHERE case_id = $1
                 ORDER BY stage_rank ASC NULLS LAST, created_at ASC, id ASC
                 LIMIT $2 OFFSET $3"
            ),
            &[
                DatabaseValue::Int32(case_id),
                DatabaseValue::Int64(i64::from(limit)),
                DatabaseValue::Int64(i64::from(offset)),
            ],
        )
        .await?;

    rows.iter().map(demolition_from_row).collect()
}

//! Case file archive queries.
//!
//! Documents attached to a case: site photos, formal notices, scanned
//! paperwork. A document may additionally point at the demolition entry
//! that produced it (e.g. the PDF of a forced-demolition notice).

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use violation_map_database_models::{ArchiveRow, NewArchive};

use crate::{DbError, decode, integrity, validate};

const ARCHIVE_COLUMNS: &str =
    "id, case_id, demolition_id, file_name, file_path, file_type, document_code, uploaded_at";

fn archive_from_row(row: &switchy_database::Row) -> Result<ArchiveRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse archive id: {e}"),
    })?;

    let case_id: i32 = row.to_value("case_id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse archive case_id: {e}"),
    })?;

    let uploaded_at: chrono::NaiveDateTime =
        row.to_value("uploaded_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse archive uploaded_at: {e}"),
        })?;

    Ok(ArchiveRow {
        id,
        case_id,
        demolition_id: row.to_value("demolition_id").unwrap_or(None),
        file_name: row.to_value("file_name").unwrap_or_default(),
        file_path: row.to_value("file_path").unwrap_or_default(),
        file_type: row.to_value("file_type").unwrap_or_default(),
        document_code: row.to_value("document_code").unwrap_or(None),
        uploaded_at: decode::datetime_utc(uploaded_at),
    })
}

/// Attaches a document to a case.
///
/// # Errors
///
/// Returns [`DbError::ReferentialViolation`] if the case or the referenced
/// demolition entry does not resolve, [`DbError::ConstraintViolation`] if a
/// required field is empty, or [`DbError`] if the database operation fails.
pub async fn create_archive(db: &dyn Database, archive: &NewArchive) -> Result<ArchiveRow, DbError> {
    validate::require_text("file_name", &archive.file_name)?;
    validate::require_text("file_path", &archive.file_path)?;
    validate::require_text("file_type", &archive.file_type)?;

    let case = db
        .query_raw_params(
            "SELECT id FROM violation_case WHERE id = $1",
            &[DatabaseValue::Int32(archive.case_id)],
        )
        .await?;

    integrity::require_parent(
        case.first().is_some(),
        "file_archive",
        "violation_case",
        i64::from(archive.case_id),
    )?;

    if let Some(demolition_id) = archive.demolition_id {
        let entry = db
            .query_raw_params(
                "SELECT id FROM demolition_progress WHERE id = $1",
                &[DatabaseValue::Int32(demolition_id)],
            )
            .await?;

        integrity::require_parent(
            entry.first().is_some(),
            "file_archive",
            "demolition_progress",
            i64::from(demolition_id),
        )?;
    }

    let rows = db
        .query_raw_params(
            &format!(
                "INSERT INTO file_archive (
                    case_id, demolition_id, file_name, file_path, file_type, document_code
                ) VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {ARCHIVE_COLUMNS}"
            ),
            &[
                DatabaseValue::Int32(archive.case_id),
                archive
                    .demolition_id
                    .map_or(DatabaseValue::Null, DatabaseValue::Int32),
                DatabaseValue::String(archive.file_name.clone()),
                DatabaseValue::String(archive.file_path.clone()),
                DatabaseValue::String(archive.file_type.clone()),
                archive
                    .document_code
                    .as_ref()
                    .map_or(DatabaseValue::Null, |c| DatabaseValue::String(c.clone())),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to read archive row from insert".to_string(),
    })?;

    archive_from_row(row)
}

/// Lists the documents attached to a case, oldest upload first.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_archives_for_case(
    db: &dyn Database,
    case_id: i32,
) -> Result<Vec<ArchiveRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {ARCHIVE_COLUMNS}
                 FROM file_archive
                 WHERE case_id = $1
                 ORDER BY uploaded_at ASC, id ASC"
            ),
            &[DatabaseValue::Int32(case_id)],
        )
        .await?;

    rows.iter().map(archive_from_row).collect()
}

//! Typed classification of referential-integrity check outcomes.
//!
//! Every registry write pre-checks the rows it depends on before touching
//! the database; these helpers turn the raw check results into the matching
//! [`DbError`] variant so all modules classify violations identically. The
//! FK constraints in the migrations back the same rules for writes that
//! race past the checks.

use crate::DbError;

/// Requires that a referenced parent row exists before a child write.
pub fn require_parent(
    exists: bool,
    entity: &'static str,
    referenced: &'static str,
    referenced_id: i64,
) -> Result<(), DbError> {
    if exists {
        Ok(())
    } else {
        Err(DbError::ReferentialViolation {
            entity,
            referenced,
            referenced_id,
        })
    }
}

/// Rejects a delete while dependent rows still reference the target.
pub fn reject_dependents(entity: &'static str, id: i64, dependents: i64) -> Result<(), DbError> {
    if dependents > 0 {
        #[allow(clippy::cast_sign_loss)]
        Err(DbError::ReferentialConflict {
            entity,
            id,
            dependents: dependents as u64,
        })
    } else {
        Ok(())
    }
}

/// Classifies a versioned update that matched no row: the row either moved
/// underneath the caller or vanished entirely.
pub fn stale_update(
    exists: bool,
    entity: &'static str,
    id: i64,
    expected_version: i64,
) -> DbError {
    if exists {
        DbError::ConcurrentModification {
            entity,
            id,
            expected_version,
        }
    } else {
        DbError::NotFound {
            entity,
            key: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parent_is_a_referential_violation() {
        assert!(require_parent(true, "violation_case", "geographical_location", 7).is_ok());

        let err =
            require_parent(false, "violation_case", "geographical_location", 7).unwrap_err();
        assert!(matches!(
            err,
            DbError::ReferentialViolation {
                entity: "violation_case",
                referenced: "geographical_location",
                referenced_id: 7,
            }
        ));
    }

    #[test]
    fn dependents_block_deletion() {
        assert!(reject_dependents("geographical_location", 3, 0).is_ok());

        let err = reject_dependents("geographical_location", 3, 2).unwrap_err();
        assert!(matches!(
            err,
            DbError::ReferentialConflict {
                entity: "geographical_location",
                id: 3,
                dependents: 2,
            }
        ));
    }

    #[test]
    fn case_delete_blocked_by_any_dependent_table() {
        // delete_case sums dependents across the progress and archive
        // tables; one row in any of them is enough to block.
        let err = reject_dependents("violation_case", 9, 1).unwrap_err();
        assert!(matches!(
            err,
            DbError::ReferentialConflict {
                entity: "violation_case",
                id: 9,
                dependents: 1,
            }
        ));
    }

    #[test]
    fn stale_version_distinguished_from_missing_row() {
        assert!(matches!(
            stale_update(true, "violation_case", 5, 4),
            DbError::ConcurrentModification {
                entity: "violation_case",
                id: 5,
                expected_version: 4,
            }
        ));
        assert!(matches!(
            stale_update(false, "violation_case", 5, 4),
            DbError::NotFound { .. }
        ));
    }
}

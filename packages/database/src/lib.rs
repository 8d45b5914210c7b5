#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database connection, registries, and migrations for the violation map.
//!
//! This crate is the storage core for illegal-construction enforcement
//! records: the location registry, the case registry, and the two per-case
//! progress trackers (demolition actions and building-status observations),
//! plus the case file archive. Uses `switchy_database` for parameterized SQL
//! and `switchy_schema` for embedded migrations.
//!
//! Every operation is a single atomic row write (or read); referential
//! integrity between the tables is declared in the migrations and mirrored
//! here as explicit pre-checks so violations surface as typed errors instead
//! of raw database failures.

pub mod archives;
pub mod building_status;
pub mod cases;
pub mod db;
pub mod demolition;
pub mod locations;

mod decode;
mod integrity;
mod validate;

use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
///
/// The first five variants are the contract with callers: they are raised
/// synchronously at the offending operation and never swallowed, corrected,
/// or retried by this layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A lookup by identifier matched no row.
    #[error("{entity} {key} not found")]
    NotFound {
        /// Table the lookup ran against.
        entity: &'static str,
        /// Identifier that failed to resolve.
        key: String,
    },

    /// A write supplied a foreign key that does not resolve.
    #[error("{entity} references {referenced} {referenced_id}, which does not exist")]
    ReferentialViolation {
        /// Table being written.
        entity: &'static str,
        /// Table the dangling reference points at.
        referenced: &'static str,
        /// The foreign key value that failed to resolve.
        referenced_id: i64,
    },

    /// A delete was attempted on a row that dependent rows still reference.
    #[error("{entity} {id} still has {dependents} dependent rows and cannot be deleted")]
    ReferentialConflict {
        /// Table the delete ran against.
        entity: &'static str,
        /// Identifier of the row that could not be deleted.
        id: i64,
        /// Number of rows still referencing it.
        dependents: u64,
    },

    /// A required field was empty or a value violated a column constraint.
    #[error("Constraint violation: {message}")]
    ConstraintViolation {
        /// Description of the violated constraint.
        message: String,
    },

    /// An update carried a stale version token; the row changed underneath
    /// the caller.
    #[error("{entity} {id} was modified concurrently (expected version {expected_version})")]
    ConcurrentModification {
        /// Table the update ran against.
        entity: &'static str,
        /// Identifier of the contested row.
        id: i64,
        /// The version the caller based its update on.
        expected_version: i64,
    },

    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}

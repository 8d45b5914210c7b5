#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types and query parameter definitions.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the relational store. Coordinates and areas use [`rust_decimal::Decimal`]
//! rather than floats: both are `NUMERIC` columns used for exact-match area
//! queries, so they must round-trip without drift.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use violation_map_case_models::{CaseStatus, DemolitionStage};

/// A geographic location row from the `geographical_location` table.
///
/// Locations are created independently of cases and may be referenced by
/// many cases over time (repeat violations at the same address).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    /// Primary key.
    pub id: i32,
    /// Community / district the address belongs to.
    pub community: String,
    /// Street address and unit number.
    pub address_number: String,
    /// Latitude, `NUMERIC(10,8)`.
    pub latitude: Decimal,
    /// Longitude, `NUMERIC(11,8)`.
    pub longitude: Decimal,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    /// Community / district the address belongs to.
    pub community: String,
    /// Street address and unit number.
    pub address_number: String,
    /// Latitude, `NUMERIC(10,8)`.
    pub latitude: Decimal,
    /// Longitude, `NUMERIC(11,8)`.
    pub longitude: Decimal,
}

/// Partial update of a location. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationUpdate {
    /// New community name.
    pub community: Option<String>,
    /// New street address / unit.
    pub address_number: Option<String>,
    /// Corrected latitude.
    pub latitude: Option<Decimal>,
    /// Corrected longitude.
    pub longitude: Option<Decimal>,
}

impl LocationUpdate {
    /// Returns whether this update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.community.is_none()
            && self.address_number.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }
}

/// A violation case row from the `violation_case` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRow {
    /// Primary key.
    pub id: i32,
    /// Business case number, `YYYY` + 4-digit sequence (e.g. `20250001`).
    pub case_number: String,
    /// Location this case is anchored to.
    pub geolocation_id: i32,
    /// Building type category (e.g. pre-existing vs. newly built).
    pub building_type: Option<String>,
    /// Responsible party or construction unit.
    pub construction_unit: Option<String>,
    /// Land area in square meters, `NUMERIC(10,2)`.
    pub land_area: Option<Decimal>,
    /// Building area in square meters, `NUMERIC(10,2)`.
    pub building_area: Option<Decimal>,
    /// Violating area in square meters, `NUMERIC(10,2)`.
    pub violation_area: Option<Decimal>,
    /// Date construction started.
    pub start_date: Option<NaiveDate>,
    /// Permit status (e.g. `filed` / `not filed`).
    pub permit_status: Option<String>,
    /// Date the violation was discovered.
    pub discovery_date: Option<NaiveDate>,
    /// Land-use type.
    pub land_type: Option<String>,
    /// Reason the construction is classified as a violation.
    pub violation_reason: String,
    /// How the case entered the system (patrol, report, satellite imagery).
    pub case_source: Option<String>,
    /// Engineering category (masonry, steel frame, mixed).
    pub engineering_category: Option<String>,
    /// Raw status code as stored. Rows written by this layer hold canonical
    /// [`CaseStatus`] codes; rows migrated from the legacy schema may hold
    /// free text. Use [`Self::status_code`] for the typed view.
    pub status: String,
    /// Optimistic-lock counter, incremented on every update.
    pub version: i64,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl CaseRow {
    /// Parses the stored status into the closed vocabulary.
    ///
    /// Returns `None` for migrated legacy text outside the vocabulary; the
    /// raw value stays available in [`Self::status`].
    #[must_use]
    pub fn status_code(&self) -> Option<CaseStatus> {
        CaseStatus::from_legacy(&self.status)
    }

    /// Returns whether this case is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status_code().is_some_and(CaseStatus::is_terminal)
    }
}

/// Fields for creating a new violation case.
///
/// New cases always start in progress; the case number is generated by the
/// registry, not supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCase {
    /// Location this case is anchored to. Must resolve to an existing row.
    pub geolocation_id: i32,
    /// Building type category.
    pub building_type: Option<String>,
    /// Responsible party or construction unit.
    pub construction_unit: Option<String>,
    /// Land area in square meters.
    pub land_area: Option<Decimal>,
    /// Building area in square meters.
    pub building_area: Option<Decimal>,
    /// Violating area in square meters.
    pub violation_area: Option<Decimal>,
    /// Date construction started.
    pub start_date: Option<NaiveDate>,
    /// Permit status.
    pub permit_status: Option<String>,
    /// Date the violation was discovered.
    pub discovery_date: Option<NaiveDate>,
    /// Land-use type.
    pub land_type: Option<String>,
    /// Reason the construction is classified as a violation. Required,
    /// non-empty.
    pub violation_reason: String,
    /// How the case entered the system.
    pub case_source: Option<String>,
    /// Engineering category.
    pub engineering_category: Option<String>,
}

/// Partial update of a case. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseUpdate {
    /// New building type.
    pub building_type: Option<String>,
    /// New responsible party.
    pub construction_unit: Option<String>,
    /// New land area.
    pub land_area: Option<Decimal>,
    /// New building area.
    pub building_area: Option<Decimal>,
    /// New violation area.
    pub violation_area: Option<Decimal>,
    /// New construction start date.
    pub start_date: Option<NaiveDate>,
    /// New permit status.
    pub permit_status: Option<String>,
    /// New discovery date.
    pub discovery_date: Option<NaiveDate>,
    /// New land-use type.
    pub land_type: Option<String>,
    /// New violation reason.
    pub violation_reason: Option<String>,
    /// New case source.
    pub case_source: Option<String>,
    /// New engineering category.
    pub engineering_category: Option<String>,
    /// Status transition. Setting [`CaseStatus::Closed`] closes the case.
    pub status: Option<CaseStatus>,
}

impl CaseUpdate {
    /// Returns whether this update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.building_type.is_none()
            && self.construction_unit.is_none()
            && self.land_area.is_none()
            && self.building_area.is_none()
            && self.violation_area.is_none()
            && self.start_date.is_none()
            && self.permit_status.is_none()
            && self.discovery_date.is_none()
            && self.land_type.is_none()
            && self.violation_reason.is_none()
            && self.case_source.is_none()
            && self.engineering_category.is_none()
            && self.status.is_none()
    }
}

/// Parameters for querying violation cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseQuery {
    /// Filter by status code.
    pub status: Option<CaseStatus>,
    /// Filter by anchored location.
    pub geolocation_id: Option<i32>,
    /// Minimum discovery date (inclusive).
    pub discovered_from: Option<NaiveDate>,
    /// Maximum discovery date (inclusive).
    pub discovered_to: Option<NaiveDate>,
    /// Maximum number of results to return.
    pub limit: u32,
    /// Number of results to skip.
    pub offset: u32,
}

impl Default for CaseQuery {
    fn default() -> Self {
        Self {
            status: None,
            geolocation_id: None,
            discovered_from: None,
            discovered_to: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// An enforcement-action row from the `demolition_progress` table.
///
/// Entries are append-only; the only in-place mutation is backfilling
/// `demolition_date` once a planned stage executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemolitionProgressRow {
    /// Primary key.
    pub id: i32,
    /// Case this action belongs to.
    pub case_id: i32,
    /// Stage label. Free text; known pipeline stages also carry a rank.
    pub demolition_stage: String,
    /// Pipeline position when the stage label is in the known vocabulary.
    pub stage_rank: Option<i16>,
    /// Person or team that carried out the action.
    pub executor: Option<String>,
    /// Execution date. `None` while the stage is planned but not executed.
    pub demolition_date: Option<NaiveDate>,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl DemolitionProgressRow {
    /// Parses the stage label into the known pipeline vocabulary.
    #[must_use]
    pub fn stage(&self) -> Option<DemolitionStage> {
        self.demolition_stage.trim().parse().ok()
    }
}

/// A physical-state observation row from the `building_violation_progress`
/// table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingProgressRow {
    /// Primary key.
    pub id: i32,
    /// Case this observation belongs to.
    pub case_id: i32,
    /// Free-text description of the structure's physical state.
    pub status_description: String,
    /// Date the state was observed. Mandatory, unlike the demolition date.
    pub status_date: NaiveDate,
    /// Inspector who recorded the observation.
    pub inspector: Option<String>,
    /// Path to a site photo, if one was taken.
    pub photo_path: Option<String>,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A case document row from the `file_archive` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRow {
    /// Primary key.
    pub id: i32,
    /// Case this document belongs to.
    pub case_id: i32,
    /// Demolition-progress entry that produced the document, if any.
    pub demolition_id: Option<i32>,
    /// Original file name.
    pub file_name: String,
    /// Storage path or URL.
    pub file_path: String,
    /// File type (image, pdf, ...).
    pub file_type: String,
    /// Official document number, if the file is a formal notice.
    pub document_code: Option<String>,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

/// Fields for attaching a new document to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArchive {
    /// Case the document belongs to. Must resolve to an existing row.
    pub case_id: i32,
    /// Demolition-progress entry that produced the document, if any.
    pub demolition_id: Option<i32>,
    /// Original file name.
    pub file_name: String,
    /// Storage path or URL.
    pub file_path: String,
    /// File type.
    pub file_type: String,
    /// Official document number.
    pub document_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_row(status: &str) -> CaseRow {
        CaseRow {
            id: 1,
            case_number: "20250001".to_string(),
            geolocation_id: 1,
            building_type: None,
            construction_unit: None,
            land_area: None,
            building_area: None,
            violation_area: None,
            start_date: None,
            permit_status: None,
            discovery_date: None,
            land_type: None,
            violation_reason: "unpermitted extension".to_string(),
            case_source: None,
            engineering_category: None,
            status: status.to_string(),
            version: 1,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn status_code_parses_canonical_and_legacy() {
        assert_eq!(
            case_row("active").status_code(),
            Some(CaseStatus::InProgress)
        );
        assert_eq!(
            case_row("in progress").status_code(),
            Some(CaseStatus::InProgress)
        );
        assert_eq!(case_row("closed").status_code(), Some(CaseStatus::Closed));
        assert_eq!(case_row("under appeal").status_code(), None);
    }

    #[test]
    fn is_closed_requires_terminal_status() {
        assert!(case_row("closed").is_closed());
        assert!(!case_row("active").is_closed());
        assert!(!case_row("under appeal").is_closed());
    }

    #[test]
    fn empty_updates_detected() {
        assert!(CaseUpdate::default().is_empty());
        assert!(LocationUpdate::default().is_empty());

        let update = CaseUpdate {
            status: Some(CaseStatus::Closed),
            ..CaseUpdate::default()
        };
        assert!(!update.is_empty());
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Controlled vocabularies for violation case lifecycle state and the
//! forced-demolition enforcement pipeline.
//!
//! The legacy schema stored both of these as unconstrained free text. These
//! types are the closed replacements: canonical storage codes going forward,
//! plus lenient parsing of the free-text values observed in migrated data.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lifecycle state of a violation case.
///
/// Stored in the `status VARCHAR(10)` column as the canonical code
/// (`active` / `closed`). Closure is inferred from this field; there is no
/// separate closed flag.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum CaseStatus {
    /// Investigation or enforcement is ongoing.
    #[strum(
        to_string = "active",
        serialize = "in progress",
        serialize = "in_progress",
        serialize = "open",
        serialize = "pending"
    )]
    InProgress,
    /// Terminal state: the case has been concluded and archived.
    #[strum(to_string = "closed", serialize = "resolved", serialize = "done")]
    Closed,
}

impl CaseStatus {
    /// Returns whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Parses a status value from migrated legacy data.
    ///
    /// Accepts the canonical codes plus the free-text synonyms observed in
    /// the original schema (`in progress`, `open`, `resolved`, ...),
    /// case-insensitively and ignoring surrounding whitespace. Returns
    /// `None` for text outside the known vocabulary.
    #[must_use]
    pub fn from_legacy(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::InProgress, Self::Closed]
    }
}

/// One discrete enforcement action in the forced-demolition pipeline.
///
/// The `demolition_stage` column stays free text so field offices can record
/// stages outside this set; entries whose text parses into this vocabulary
/// get a denormalized `stage_rank` for pipeline ordering.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum DemolitionStage {
    /// Stop-work notice delivered to the responsible party.
    NoticeToStop,
    /// Water and power to the structure cut off.
    UtilitiesCut,
    /// Forced-demolition notice issued.
    ForcedDemolitionNotice,
    /// Forced demolition carried out.
    ForcedDemolitionExecuted,
}

impl DemolitionStage {
    /// Returns this stage's position in the enforcement pipeline, 1-based.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::NoticeToStop => 1,
            Self::UtilitiesCut => 2,
            Self::ForcedDemolitionNotice => 3,
            Self::ForcedDemolitionExecuted => 4,
        }
    }

    /// Returns the rank for a free-text stage label, or `None` if the label
    /// is outside the known pipeline.
    #[must_use]
    pub fn rank_of(label: &str) -> Option<u8> {
        label.trim().parse::<Self>().ok().map(Self::rank)
    }

    /// Returns all variants of this enum, in pipeline order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::NoticeToStop,
            Self::UtilitiesCut,
            Self::ForcedDemolitionNotice,
            Self::ForcedDemolitionExecuted,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_fit_varchar_10() {
        for status in CaseStatus::all() {
            assert!(
                status.as_ref().len() <= 10,
                "{status:?} code {:?} exceeds the status column width",
                status.as_ref()
            );
        }
    }

    #[test]
    fn status_legacy_synonyms_parse() {
        assert_eq!(
            CaseStatus::from_legacy("in progress"),
            Some(CaseStatus::InProgress)
        );
        assert_eq!(CaseStatus::from_legacy("OPEN"), Some(CaseStatus::InProgress));
        assert_eq!(
            CaseStatus::from_legacy("  pending "),
            Some(CaseStatus::InProgress)
        );
        assert_eq!(CaseStatus::from_legacy("Resolved"), Some(CaseStatus::Closed));
        assert_eq!(CaseStatus::from_legacy("closed"), Some(CaseStatus::Closed));
        assert_eq!(CaseStatus::from_legacy("demolished?"), None);
        assert_eq!(CaseStatus::from_legacy(""), None);
    }

    #[test]
    fn status_canonical_roundtrip() {
        for status in CaseStatus::all() {
            assert_eq!(CaseStatus::from_legacy(status.as_ref()), Some(*status));
        }
    }

    #[test]
    fn only_closed_is_terminal() {
        assert!(CaseStatus::Closed.is_terminal());
        assert!(!CaseStatus::InProgress.is_terminal());
    }

    #[test]
    fn stage_ranks_are_strictly_increasing() {
        let ranks: Vec<u8> = DemolitionStage::all()
            .iter()
            .map(|stage| stage.rank())
            .collect();
        assert!(ranks.windows(2).all(|pair| pair[0] < pair[1]), "{ranks:?}");
    }

    #[test]
    fn stage_labels_roundtrip_kebab_case() {
        assert_eq!(DemolitionStage::NoticeToStop.to_string(), "notice-to-stop");
        assert_eq!(
            DemolitionStage::ForcedDemolitionExecuted.to_string(),
            "forced-demolition-executed"
        );
        for stage in DemolitionStage::all() {
            assert_eq!(
                stage.to_string().parse::<DemolitionStage>().ok(),
                Some(*stage)
            );
        }
    }

    #[test]
    fn unknown_stage_has_no_rank() {
        assert_eq!(DemolitionStage::rank_of("notice-to-stop"), Some(1));
        assert_eq!(DemolitionStage::rank_of("Utilities-Cut"), Some(2));
        assert_eq!(DemolitionStage::rank_of("court-injunction"), None);
        assert_eq!(DemolitionStage::rank_of(""), None);
    }
}

//! Enrichment stages and their status transitions

use crate::error::EnrichmentError;
use plu_core::ConversationBranch;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One async sub-fetch of the enrichment process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStage {
    Enrichment,
    Zones,
    Municipality,
    City,
    Zoning,
    Zone,
    Document,
    Map,
}

impl EnrichmentStage {
    pub const ALL: [Self; 8] = [
        Self::Enrichment,
        Self::Zones,
        Self::Municipality,
        Self::City,
        Self::Zoning,
        Self::Zone,
        Self::Document,
        Self::Map,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrichment => "enrichment",
            Self::Zones => "zones",
            Self::Municipality => "municipality",
            Self::City => "city",
            Self::Zoning => "zoning",
            Self::Zone => "zone",
            Self::Document => "document",
            Self::Map => "map",
        }
    }
}

impl std::fmt::Display for EnrichmentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrichmentStage {
    type Err = EnrichmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| EnrichmentError::UnknownStage(s.to_string()))
    }
}

/// Status of a single stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Loading,
    Success,
    Error,
}

/// Statuses reachable from `from` (`None` means not started)
///
/// `Error -> Loading` is only taken by a retry.
#[must_use]
pub fn allowed_transitions(from: Option<StageStatus>) -> Vec<StageStatus> {
    use StageStatus::{Error, Loading, Success};
    match from {
        None => vec![Loading],
        Some(Loading) => vec![Success, Error],
        Some(Success) => vec![],
        Some(Error) => vec![Loading],
    }
}

/// Validate a stage status change
///
/// # Errors
/// Returns `IllegalTransition` when `to` is not reachable from `from`
pub fn validate_transition(
    stage: EnrichmentStage,
    from: Option<StageStatus>,
    to: StageStatus,
) -> Result<(), EnrichmentError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(EnrichmentError::IllegalTransition { stage, from, to })
    }
}

const RNU_STAGES: [EnrichmentStage; 6] = [
    EnrichmentStage::Enrichment,
    EnrichmentStage::Zones,
    EnrichmentStage::Municipality,
    EnrichmentStage::City,
    EnrichmentStage::Document,
    EnrichmentStage::Map,
];

/// Stages that must succeed for `branch` to complete
///
/// RNU municipalities have no local zoning, so `zoning` and `zone` are
/// not required there.
#[must_use]
pub fn required_stages(branch: ConversationBranch) -> &'static [EnrichmentStage] {
    match branch {
        ConversationBranch::Rnu => &RNU_STAGES,
        ConversationBranch::NonRnuAnalysis | ConversationBranch::NonRnuSource => {
            &EnrichmentStage::ALL
        }
    }
}

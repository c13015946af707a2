//! Per-stage progress and the overall status fold

use crate::error::EnrichmentError;
use crate::stage::{required_stages, validate_transition, EnrichmentStage, StageStatus};
use plu_core::ConversationBranch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall enrichment status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentStatus {
    #[default]
    Pending,
    Enriching,
    Complete,
    Error,
}

impl EnrichmentStatus {
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Stage name to stage status
///
/// Stages absent from the map have not started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentProgress {
    stages: BTreeMap<EnrichmentStage, StageStatus>,
}

impl EnrichmentProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, stage: EnrichmentStage) -> Option<StageStatus> {
        self.stages.get(&stage).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EnrichmentStage, StageStatus)> + '_ {
        self.stages.iter().map(|(stage, status)| (*stage, *status))
    }

    /// Mark `stage` as loading
    ///
    /// # Errors
    /// Returns `IllegalTransition` if the stage already started
    pub fn start(&mut self, stage: EnrichmentStage) -> Result<(), EnrichmentError> {
        self.transition(stage, StageStatus::Loading)
    }

    /// # Errors
    /// Returns `IllegalTransition` unless the stage is loading
    pub fn succeed(&mut self, stage: EnrichmentStage) -> Result<(), EnrichmentError> {
        self.transition(stage, StageStatus::Success)
    }

    /// # Errors
    /// Returns `IllegalTransition` unless the stage is loading
    pub fn fail(&mut self, stage: EnrichmentStage) -> Result<(), EnrichmentError> {
        self.transition(stage, StageStatus::Error)
    }

    /// Put every failed stage back to loading and return them
    pub fn reset_failed(&mut self) -> Vec<EnrichmentStage> {
        let failed = self.failed_stages();
        for stage in &failed {
            self.stages.insert(*stage, StageStatus::Loading);
        }
        failed
    }

    #[must_use]
    pub fn failed_stages(&self) -> Vec<EnrichmentStage> {
        self.iter()
            .filter(|(_, status)| *status == StageStatus::Error)
            .map(|(stage, _)| stage)
            .collect()
    }

    /// Fold stage statuses into the overall status.
    ///
    /// An error on a required stage wins over stages still loading, so a
    /// failure is surfaced as soon as it happens. Until the branch is known
    /// every started stage counts as required, and completion is never
    /// reported.
    #[must_use]
    pub fn status(&self, branch: Option<ConversationBranch>) -> EnrichmentStatus {
        if self.stages.is_empty() {
            return EnrichmentStatus::Pending;
        }

        let required = |stage: EnrichmentStage| {
            branch.map_or(true, |branch| required_stages(branch).contains(&stage))
        };

        if self
            .iter()
            .any(|(stage, status)| status == StageStatus::Error && required(stage))
        {
            return EnrichmentStatus::Error;
        }

        if self.iter().any(|(_, status)| status == StageStatus::Loading) {
            return EnrichmentStatus::Enriching;
        }

        match branch {
            Some(branch)
                if required_stages(branch)
                    .iter()
                    .all(|stage| self.get(*stage) == Some(StageStatus::Success)) =>
            {
                EnrichmentStatus::Complete
            }
            _ => EnrichmentStatus::Enriching,
        }
    }

    fn transition(&mut self, stage: EnrichmentStage, to: StageStatus) -> Result<(), EnrichmentError> {
        validate_transition(stage, self.get(stage), to)?;
        self.stages.insert(stage, to);
        Ok(())
    }
}

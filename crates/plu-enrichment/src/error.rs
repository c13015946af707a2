//! Enrichment error types

use crate::stage::{EnrichmentStage, StageStatus};
use thiserror::Error;

/// Errors raised while tracking enrichment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    /// Stage status change not in the transition table
    #[error("illegal transition for stage {stage}: {from:?} -> {to:?}")]
    IllegalTransition {
        stage: EnrichmentStage,
        from: Option<StageStatus>,
        to: StageStatus,
    },

    #[error("stage {stage} failed: {message}")]
    FetchFailed {
        stage: EnrichmentStage,
        message: String,
    },

    #[error("unknown enrichment stage: {0}")]
    UnknownStage(String),

    /// Owning view was torn down
    #[error("view scope cancelled")]
    Cancelled,
}

impl EnrichmentError {
    /// Whether a manual retry may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}

/// Rejection reported by a stage fetcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

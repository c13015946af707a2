//! Session error types

use plu_cache::CacheError;
use plu_core::ConversationId;
use plu_enrichment::EnrichmentError;
use thiserror::Error;

/// Errors surfaced by the session layer
#[derive(Debug, Error)]
pub enum SessionError {
    /// Backend rejected a read or write
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl SessionError {
    /// Whether the caller may retry the failed operation
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence(_) => true,
            Self::Cache(e) => e.is_retryable(),
            Self::Enrichment(e) => e.is_retryable(),
            Self::NotFound(_) => false,
        }
    }
}

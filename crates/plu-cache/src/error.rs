//! Error types for cache operations

/// Errors during cache writes
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backing store rejected the operation
    #[error("store error: {0}")]
    Store(String),

    /// Entry could not be encoded
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Check if the operation may succeed when repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

//! Artifact state and its merge rule
//!
//! # Invariants
//! - `data` is `Some` only while `status` is `Ready`
//! - `error` is `Some` only while `status` is `Error`
//! - `timestamp` moves only when status or data actually changes

use crate::kind::ArtifactStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of one artifact slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactState<T> {
    status: ArtifactStatus,
    data: Option<T>,
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

impl<T> ArtifactState<T> {
    /// Fresh slot awaiting enrichment
    #[inline]
    #[must_use]
    pub fn loading(now: DateTime<Utc>) -> Self {
        Self {
            status: ArtifactStatus::Loading,
            data: None,
            error: None,
            timestamp: now,
        }
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> ArtifactStatus {
        self.status
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Time of the last effective change
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == ArtifactStatus::Ready
    }
}

impl<T: Clone + PartialEq> ArtifactState<T> {
    /// Merge a partial update.
    ///
    /// Every field follows new-value-wins, keep-if-absent; the invariants are
    /// then re-established from the merged status. Returns `false`, leaving
    /// the state untouched, when neither status nor data would change.
    pub(crate) fn merge(&mut self, update: ArtifactUpdate<T>, now: DateTime<Utc>) -> bool {
        let status = update.status.unwrap_or(self.status);
        let data = match status {
            ArtifactStatus::Ready => update.data.or_else(|| self.data.clone()),
            ArtifactStatus::Loading | ArtifactStatus::Error => None,
        };
        let error = match status {
            ArtifactStatus::Error => update.error.or_else(|| self.error.clone()),
            ArtifactStatus::Loading | ArtifactStatus::Ready => None,
        };

        if status == self.status && data == self.data {
            return false;
        }

        self.status = status;
        self.data = data;
        self.error = error;
        self.timestamp = now;
        true
    }
}

/// Partial update of one artifact
///
/// `None` fields keep their current value.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactUpdate<T> {
    pub status: Option<ArtifactStatus>,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Default for ArtifactUpdate<T> {
    fn default() -> Self {
        Self {
            status: None,
            data: None,
            error: None,
        }
    }
}

impl<T> ArtifactUpdate<T> {
    /// Back to loading (drops any payload)
    #[inline]
    #[must_use]
    pub fn loading() -> Self {
        Self {
            status: Some(ArtifactStatus::Loading),
            ..Self::default()
        }
    }

    /// Ready with payload
    #[inline]
    #[must_use]
    pub fn ready(data: T) -> Self {
        Self {
            status: Some(ArtifactStatus::Ready),
            data: Some(data),
            error: None,
        }
    }

    /// Failed with message
    #[inline]
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ArtifactStatus::Error),
            data: None,
            error: Some(message.into()),
        }
    }

    /// Replace only the payload
    #[inline]
    #[must_use]
    pub fn data(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }
}

//! Enrichment progress tracker
//!
//! Launches one fetch per stage through a [`StageFetcher`], folds their
//! outcomes into an [`EnrichmentSnapshot`] and publishes every change on a
//! watch channel. Fetches run inside the owning [`ViewScope`]; results that
//! arrive after teardown are dropped.

use crate::data::EnrichmentData;
use crate::error::{EnrichmentError, FetchError};
use crate::progress::{EnrichmentProgress, EnrichmentStatus};
use crate::scope::ViewScope;
use crate::stage::EnrichmentStage;
use async_trait::async_trait;
use plu_core::{ConversationBranch, ConversationId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// What is being enriched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub conversation_id: ConversationId,
    pub address: String,
}

/// Producer of one stage's payload
///
/// Resolves with the fields the stage contributes or rejects. No retry is
/// expected from implementors.
#[async_trait]
pub trait StageFetcher: Send + Sync + 'static {
    async fn fetch(
        &self,
        stage: EnrichmentStage,
        request: &EnrichmentRequest,
    ) -> Result<EnrichmentData, FetchError>;
}

/// Published tracker state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentSnapshot {
    pub status: EnrichmentStatus,
    pub progress: EnrichmentProgress,
    pub data: EnrichmentData,
    /// Last rejection per failed stage
    pub errors: BTreeMap<EnrichmentStage, FetchError>,
}

impl EnrichmentSnapshot {
    #[inline]
    #[must_use]
    pub fn branch(&self) -> Option<ConversationBranch> {
        self.data.branch()
    }

    /// Failures as errors, in stage order
    #[must_use]
    pub fn failures(&self) -> Vec<EnrichmentError> {
        self.errors
            .iter()
            .map(|(stage, err)| EnrichmentError::FetchFailed {
                stage: *stage,
                message: err.message.clone(),
            })
            .collect()
    }

    fn refresh_status(&mut self) {
        self.status = self.progress.status(self.data.branch());
    }
}

/// Aggregates stage fetches into an overall status
#[derive(Clone)]
pub struct EnrichmentTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    request: EnrichmentRequest,
    fetcher: Arc<dyn StageFetcher>,
    scope: ViewScope,
    state: watch::Sender<EnrichmentSnapshot>,
}

impl std::fmt::Debug for EnrichmentTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentTracker")
            .field("request", &self.inner.request)
            .field("status", &self.inner.state.borrow().status)
            .finish_non_exhaustive()
    }
}

impl EnrichmentTracker {
    #[must_use]
    pub fn new(request: EnrichmentRequest, fetcher: Arc<dyn StageFetcher>, scope: ViewScope) -> Self {
        let (state, _) = watch::channel(EnrichmentSnapshot::default());
        Self {
            inner: Arc::new(TrackerInner {
                request,
                fetcher,
                scope,
                state,
            }),
        }
    }

    /// Launch every stage not started yet.
    ///
    /// # Errors
    /// Returns `Cancelled` once the owning scope is torn down
    pub fn start(&self) -> Result<(), EnrichmentError> {
        if !self.inner.scope.is_live() {
            return Err(EnrichmentError::Cancelled);
        }

        let mut launched = Vec::new();
        self.inner.state.send_if_modified(|snapshot| {
            for stage in EnrichmentStage::ALL {
                if snapshot.progress.start(stage).is_ok() {
                    launched.push(stage);
                }
            }
            snapshot.refresh_status();
            !launched.is_empty()
        });

        tracing::info!(
            conversation = %self.inner.request.conversation_id,
            stages = launched.len(),
            "enrichment started"
        );
        for stage in launched {
            self.launch(stage);
        }
        Ok(())
    }

    /// Restart failed stages.
    ///
    /// No-op unless the overall status is `Error`; returns whether anything
    /// was restarted.
    pub fn retry(&self) -> bool {
        if !self.inner.scope.is_live() {
            return false;
        }

        let mut restarted = Vec::new();
        self.inner.state.send_if_modified(|snapshot| {
            if !snapshot.status.is_error() {
                return false;
            }
            restarted = snapshot.progress.reset_failed();
            for stage in &restarted {
                snapshot.errors.remove(stage);
            }
            snapshot.refresh_status();
            true
        });

        if restarted.is_empty() {
            return false;
        }
        tracing::info!(
            conversation = %self.inner.request.conversation_id,
            stages = ?restarted,
            "enrichment retried"
        );
        for stage in restarted {
            self.launch(stage);
        }
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> EnrichmentSnapshot {
        self.inner.state.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> EnrichmentStatus {
        self.inner.state.borrow().status
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<EnrichmentSnapshot> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn request(&self) -> &EnrichmentRequest {
        &self.inner.request
    }

    fn launch(&self, stage: EnrichmentStage) {
        let inner = Arc::clone(&self.inner);
        self.inner.scope.spawn(async move {
            let outcome = inner.fetcher.fetch(stage, &inner.request).await;
            if !inner.scope.is_live() {
                return;
            }
            inner.commit(stage, outcome);
        });
    }
}

impl TrackerInner {
    fn commit(&self, stage: EnrichmentStage, outcome: Result<EnrichmentData, FetchError>) {
        let conversation = self.request.conversation_id;
        self.state.send_if_modified(|snapshot| {
            let applied = match outcome {
                Ok(patch) => snapshot.progress.succeed(stage).map(|()| {
                    snapshot.data.merge(patch);
                    tracing::debug!(%conversation, %stage, "stage succeeded");
                }),
                Err(err) => snapshot.progress.fail(stage).map(|()| {
                    tracing::warn!(%conversation, %stage, error = %err, "stage failed");
                    snapshot.errors.insert(stage, err);
                }),
            };
            if let Err(e) = applied {
                tracing::warn!(%conversation, error = %e, "stage result dropped");
                return false;
            }
            snapshot.refresh_status();
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Fetcher resolving each stage after a fixed delay
    #[derive(Default)]
    struct FixedFetcher {
        failing: Mutex<Vec<EnrichmentStage>>,
        calls: Mutex<HashMap<EnrichmentStage, u32>>,
    }

    #[async_trait]
    impl StageFetcher for FixedFetcher {
        async fn fetch(
            &self,
            stage: EnrichmentStage,
            _request: &EnrichmentRequest,
        ) -> Result<EnrichmentData, FetchError> {
            *self.calls.lock().entry(stage).or_default() += 1;
            tokio::time::sleep(Duration::from_millis(100)).await;
            if self.failing.lock().contains(&stage) {
                return Err(FetchError::new("service unavailable"));
            }
            Ok(match stage {
                EnrichmentStage::Enrichment => EnrichmentData {
                    is_rnu: Some(false),
                    ..EnrichmentData::default()
                },
                EnrichmentStage::Document => EnrichmentData {
                    has_analysis: Some(true),
                    document_id: Some("doc-1".to_string()),
                    ..EnrichmentData::default()
                },
                _ => EnrichmentData::default(),
            })
        }
    }

    fn tracker(fetcher: Arc<FixedFetcher>, scope: ViewScope) -> EnrichmentTracker {
        EnrichmentTracker::new(
            EnrichmentRequest {
                conversation_id: ConversationId::new(),
                address: "1 place Bellecour, Lyon".to_string(),
            },
            fetcher,
            scope,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn completes_when_all_required_succeed() {
        let tracker = tracker(Arc::new(FixedFetcher::default()), ViewScope::new());
        assert_eq!(tracker.status(), EnrichmentStatus::Pending);

        tracker.start().unwrap();
        assert_eq!(tracker.status(), EnrichmentStatus::Enriching);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, EnrichmentStatus::Complete);
        assert_eq!(snapshot.branch(), Some(ConversationBranch::NonRnuAnalysis));
        assert_eq!(snapshot.data.document_id.as_deref(), Some("doc-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_is_noop_unless_failed() {
        let fetcher = Arc::new(FixedFetcher::default());
        fetcher.failing.lock().push(EnrichmentStage::Map);
        let tracker = tracker(Arc::clone(&fetcher), ViewScope::new());

        tracker.start().unwrap();
        assert!(!tracker.retry());

        tokio::time::sleep(Duration::from_millis(150)).await;
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, EnrichmentStatus::Error);
        assert!(snapshot.failures().iter().all(EnrichmentError::is_retryable));

        fetcher.failing.lock().clear();
        assert!(tracker.retry());
        assert_eq!(tracker.status(), EnrichmentStatus::Enriching);
        assert!(!tracker.retry());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(tracker.status(), EnrichmentStatus::Complete);
        assert_eq!(fetcher.calls.lock()[&EnrichmentStage::Map], 2);
        assert_eq!(fetcher.calls.lock()[&EnrichmentStage::City], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn results_after_teardown_are_dropped() {
        let scope = ViewScope::new();
        let tracker = tracker(Arc::new(FixedFetcher::default()), scope.clone());
        tracker.start().unwrap();

        scope.cancel();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(tracker.status(), EnrichmentStatus::Enriching);
        assert_eq!(tracker.start().unwrap_err(), EnrichmentError::Cancelled);
        assert!(!tracker.retry());
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_does_not_refetch() {
        let fetcher = Arc::new(FixedFetcher::default());
        let tracker = tracker(Arc::clone(&fetcher), ViewScope::new());

        tracker.start().unwrap();
        tracker.start().unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(fetcher.calls.lock().values().all(|calls| *calls == 1));
    }
}

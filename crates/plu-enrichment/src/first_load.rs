//! First-load artifact preparation
//!
//! Used when opening a conversation that already has documents. Two
//! independent timers flip the document and map flags once each; chat input
//! stays disabled until both are set, and the panel callback runs exactly
//! once at that moment.

use crate::scope::ViewScope;
use parking_lot::Mutex;
use plu_core::FirstLoadTimings;
use std::sync::Arc;
use tokio::sync::watch;

/// Readiness flags of the side-panel artifacts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactReadiness {
    pub document_ready: bool,
    pub map_ready: bool,
}

impl ArtifactReadiness {
    /// Both flags already set
    #[must_use]
    pub fn ready() -> Self {
        Self {
            document_ready: true,
            map_ready: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn artifacts_ready(&self) -> bool {
        self.document_ready && self.map_ready
    }

    #[inline]
    #[must_use]
    pub fn chat_input_enabled(&self) -> bool {
        self.artifacts_ready()
    }
}

#[derive(Debug, Clone, Copy)]
enum Part {
    Document,
    Map,
}

type ReadyCallback = Box<dyn FnOnce() + Send>;

struct Gate {
    readiness: watch::Sender<ArtifactReadiness>,
    on_ready: Mutex<Option<ReadyCallback>>,
}

impl Gate {
    fn mark(&self, part: Part) {
        let flipped = self.readiness.send_if_modified(|readiness| {
            let flag = match part {
                Part::Document => &mut readiness.document_ready,
                Part::Map => &mut readiness.map_ready,
            };
            !std::mem::replace(flag, true)
        });
        if !flipped {
            return;
        }
        tracing::debug!(?part, "artifact ready");

        if self.readiness.borrow().artifacts_ready() {
            if let Some(on_ready) = self.on_ready.lock().take() {
                on_ready();
            }
        }
    }
}

/// Start the first-load timers for a conversation with `document_count`
/// documents.
///
/// With no documents there is nothing to prepare: readiness is reported at
/// once and `on_ready` is not called.
pub fn spawn_first_load<F>(
    scope: &ViewScope,
    timings: FirstLoadTimings,
    document_count: u32,
    on_ready: F,
) -> watch::Receiver<ArtifactReadiness>
where
    F: FnOnce() + Send + 'static,
{
    if document_count == 0 {
        let (_, rx) = watch::channel(ArtifactReadiness::ready());
        return rx;
    }

    let (readiness, rx) = watch::channel(ArtifactReadiness::default());
    let gate = Arc::new(Gate {
        readiness,
        on_ready: Mutex::new(Some(Box::new(on_ready))),
    });

    for (part, delay) in [
        (Part::Document, timings.document_ready()),
        (Part::Map, timings.map_ready()),
    ] {
        let gate = Arc::clone(&gate);
        scope.schedule_after(delay, move || gate.mark(part));
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn ready_after_both_timers() {
        let scope = ViewScope::new();
        let opened = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&opened);

        let rx = spawn_first_load(&scope, FirstLoadTimings::default(), 3, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!rx.borrow().chat_input_enabled());

        sleep(Duration::from_millis(1600)).await;
        assert_eq!(
            *rx.borrow(),
            ArtifactReadiness {
                document_ready: true,
                map_ready: false
            }
        );
        assert_eq!(opened.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(1500)).await;
        assert!(rx.borrow().artifacts_ready());
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        sleep(Duration::from_millis(10_000)).await;
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_preparation() {
        let scope = ViewScope::new();
        let opened = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&opened);

        let rx = spawn_first_load(&scope, FirstLoadTimings::default(), 1, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sleep(Duration::from_millis(2000)).await;
        scope.cancel();
        sleep(Duration::from_millis(5000)).await;

        assert!(rx.borrow().document_ready);
        assert!(!rx.borrow().map_ready);
        assert_eq!(opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_documents_is_ready_without_panel() {
        let scope = ViewScope::new();
        let rx = spawn_first_load(&scope, FirstLoadTimings::default(), 0, || {
            panic!("panel must not open");
        });
        assert!(rx.borrow().chat_input_enabled());
    }
}

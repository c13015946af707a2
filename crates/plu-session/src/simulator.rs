//! Scripted end-to-end runs
//!
//! [`ScriptedFetcher`] resolves every stage after a fixed delay with canned
//! data for a chosen branch. [`run_simulation`] starts a conversation over
//! an in-memory environment, records each view transition, retries once per
//! failure, and compares the captions seen with the branch's sequence.

use crate::error::SessionError;
use crate::session::{ConversationOrchestrator, SessionEnvironment, SessionEvent, SessionView};
use async_trait::async_trait;
use dashmap::DashMap;
use plu_core::{AssistantConfig, ConversationBranch, LatLon};
use plu_enrichment::{EnrichmentData, EnrichmentRequest, EnrichmentStage, FetchError, LoadingStep, StageFetcher};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Canned outcome of one stage
#[derive(Debug, Clone)]
pub struct StageScript {
    pub delay: Duration,
    pub patch: EnrichmentData,
}

#[derive(Debug)]
struct Failure {
    message: String,
    remaining: u32,
}

/// Fetcher replaying canned stage results
#[derive(Debug)]
pub struct ScriptedFetcher {
    scripts: HashMap<EnrichmentStage, StageScript>,
    failures: DashMap<EnrichmentStage, Failure>,
    calls: DashMap<EnrichmentStage, u32>,
}

impl ScriptedFetcher {
    /// Script for an address in Lyon classified as `branch`.
    ///
    /// Classification flags arrive within the first second; the document
    /// is the slowest stage at 4.5 s.
    #[must_use]
    pub fn for_branch(branch: ConversationBranch) -> Self {
        let is_rnu = branch.is_rnu();
        let has_analysis = branch == ConversationBranch::NonRnuAnalysis;

        let script = |millis: u64, patch: EnrichmentData| StageScript {
            delay: Duration::from_millis(millis),
            patch,
        };
        let scripts = HashMap::from([
            (
                EnrichmentStage::Enrichment,
                script(
                    400,
                    EnrichmentData {
                        center: Some(LatLon::new(45.757_8, 4.832_0)),
                        is_rnu: Some(is_rnu),
                        ..EnrichmentData::default()
                    },
                ),
            ),
            (
                EnrichmentStage::Municipality,
                script(
                    500,
                    EnrichmentData {
                        municipality: Some("Lyon".to_string()),
                        insee_code: Some("69123".to_string()),
                        ..EnrichmentData::default()
                    },
                ),
            ),
            (
                EnrichmentStage::Zones,
                script(
                    600,
                    EnrichmentData {
                        zone_code: Some("UA1".to_string()),
                        ..EnrichmentData::default()
                    },
                ),
            ),
            (
                EnrichmentStage::City,
                script(
                    700,
                    EnrichmentData {
                        city_name: Some("Lyon".to_string()),
                        ..EnrichmentData::default()
                    },
                ),
            ),
            (
                EnrichmentStage::Zoning,
                script(
                    900,
                    EnrichmentData {
                        zoning_id: Some("plu-69123".to_string()),
                        has_analysis: Some(has_analysis),
                        ..EnrichmentData::default()
                    },
                ),
            ),
            (
                EnrichmentStage::Zone,
                script(
                    1200,
                    EnrichmentData {
                        zone_name: Some("Zone urbaine mixte".to_string()),
                        ..EnrichmentData::default()
                    },
                ),
            ),
            (
                EnrichmentStage::Map,
                script(
                    3500,
                    EnrichmentData {
                        map_geometry: Some(json!({
                            "type": "Polygon",
                            "coordinates": [[
                                [4.830, 45.756], [4.834, 45.756],
                                [4.834, 45.759], [4.830, 45.759],
                                [4.830, 45.756]
                            ]]
                        })),
                        ..EnrichmentData::default()
                    },
                ),
            ),
            (
                EnrichmentStage::Document,
                script(
                    4500,
                    EnrichmentData {
                        document_id: Some("doc-69123-ua1".to_string()),
                        source_plu_url: Some("https://www.geoportail-urbanisme.gouv.fr/document/69123".to_string()),
                        document_data: Some(json!({
                            "title": "PLU-H Métropole de Lyon, zone UA1",
                            "summary": "Hauteur maximale 16 m, emprise au sol 60 %",
                        })),
                        ..EnrichmentData::default()
                    },
                ),
            ),
        ]);

        Self {
            scripts,
            failures: DashMap::new(),
            calls: DashMap::new(),
        }
    }

    /// Make the first attempt at `stage` reject with `message`
    #[must_use]
    pub fn with_failure(self, stage: EnrichmentStage, message: impl Into<String>) -> Self {
        self.failures.insert(
            stage,
            Failure {
                message: message.into(),
                remaining: 1,
            },
        );
        self
    }

    #[must_use]
    pub fn with_delay(mut self, stage: EnrichmentStage, delay: Duration) -> Self {
        if let Some(script) = self.scripts.get_mut(&stage) {
            script.delay = delay;
        }
        self
    }

    /// Number of fetches issued for `stage`
    #[must_use]
    pub fn calls(&self, stage: EnrichmentStage) -> u32 {
        self.calls.get(&stage).map_or(0, |calls| *calls)
    }
}

#[async_trait]
impl StageFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        stage: EnrichmentStage,
        _request: &EnrichmentRequest,
    ) -> Result<EnrichmentData, FetchError> {
        *self.calls.entry(stage).or_insert(0) += 1;
        let Some(script) = self.scripts.get(&stage) else {
            return Ok(EnrichmentData::default());
        };
        tokio::time::sleep(script.delay).await;

        if let Some(mut failure) = self.failures.get_mut(&stage) {
            if failure.remaining > 0 {
                failure.remaining -= 1;
                return Err(FetchError::new(failure.message.clone()));
            }
        }
        Ok(script.patch.clone())
    }
}

/// One observed view change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub at_ms: u64,
    pub view: SessionView,
}

/// Outcome of [`run_simulation`]
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub branch: ConversationBranch,
    pub transitions: Vec<Transition>,
    pub expected_captions: Vec<&'static str>,
    pub observed_captions: Vec<&'static str>,
    pub retries: u32,
    pub persistence_failures: u32,
    pub completed: bool,
}

impl SimulationReport {
    /// Completed on the expected branch after showing exactly its captions
    #[must_use]
    pub fn matches_expected(&self) -> bool {
        let final_branch = self.transitions.last().and_then(|t| match t.view {
            SessionView::Ready { branch, .. } => Some(branch),
            SessionView::Loading { .. } => None,
        });
        self.completed
            && final_branch == Some(self.branch)
            && self.observed_captions == self.expected_captions
    }
}

/// Run one scripted conversation until it completes or `horizon` elapses.
///
/// # Errors
/// Returns the backend error if the conversation cannot be created
pub async fn run_simulation(
    config: AssistantConfig,
    branch: ConversationBranch,
    fetcher: Arc<ScriptedFetcher>,
    horizon: Duration,
) -> Result<SimulationReport, SessionError> {
    let env = SessionEnvironment::in_memory(config, fetcher);
    let orchestrator = ConversationOrchestrator::new(env);
    let session = orchestrator.start_conversation("1 place Bellecour, 69002 Lyon").await?;
    let mut views = session.subscribe_view();
    let mut events = session.subscribe();
    let started = Instant::now();
    let deadline = started + horizon;

    let mut report = SimulationReport {
        branch,
        transitions: Vec::new(),
        expected_captions: LoadingStep::sequence_for(branch)
            .iter()
            .map(LoadingStep::copy)
            .collect(),
        observed_captions: Vec::new(),
        retries: 0,
        persistence_failures: 0,
        completed: false,
    };

    let record = |report: &mut SimulationReport, view: SessionView| {
        let at_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(at_ms, ?view, "view");
        report.transitions.push(Transition { at_ms, view });
        if let Some(caption) = view.caption() {
            if report.observed_captions.last() != Some(&caption) {
                report.observed_captions.push(caption);
            }
        }
    };
    record(&mut report, *views.borrow_and_update());

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = *views.borrow_and_update();
                record(&mut report, view);
                match view {
                    SessionView::Ready { .. } => {
                        report.completed = true;
                        break;
                    }
                    SessionView::Loading { retry_available: true, .. } => {
                        if session.retry() {
                            report.retries += 1;
                        }
                    }
                    SessionView::Loading { .. } => {}
                }
            }
            Ok(event) = events.recv() => {
                if let SessionEvent::PersistenceFailed { .. } = event {
                    report.persistence_failures += 1;
                }
            }
            () = tokio::time::sleep_until(deadline) => break,
        }
    }

    session.unmount();
    Ok(report)
}

//! Conversation sessions
//!
//! Mounting a conversation takes one of two paths:
//!
//! - **bypass**: the row is marked completed, or a valid cache entry exists,
//!   and the branch is resolved. The terminal view is shown at once with the
//!   persisted panel tab; no loading step is ever published.
//! - **enrich**: stage fetches start, the loading sequencer drives the
//!   caption, and a coordinator task mirrors stage results into the
//!   artifact store, persists the branch once it is certain and, on
//!   completion, writes document metadata and the cache snapshot.
//!
//! Everything a session spawns lives in its [`ViewScope`]; dropping the
//! [`SessionHandle`] cancels it and, unless a newer mount of the same
//! conversation took over, resets the conversation's artifacts.

use crate::error::SessionError;
use crate::persistence::{
    BranchResolution, ConversationBackend, ConversationRecord, InMemoryBackend, PanelState,
    PersistedEnrichmentStatus,
};
use chrono::Utc;
use dashmap::DashMap;
use plu_artifact::{
    ArtifactKind, ArtifactPayload, ArtifactStore, ArtifactUpdate, ConversationArtifacts,
    DocumentData, MapData, PanelTab, ZoneData,
};
use plu_cache::{ConversationCache, ConversationCacheData, KeyValueStore, MemoryStore};
use plu_core::{
    build_document_metadata_payload, AssistantConfig, ConversationBranch, ConversationId,
    DocumentMetadataInput,
};
use plu_enrichment::{
    spawn_first_load, spawn_sequencer, ArtifactReadiness, EnrichmentData, EnrichmentError,
    EnrichmentRequest, EnrichmentSnapshot, EnrichmentStage, EnrichmentStatus, EnrichmentTracker,
    LoadingStep, StageFetcher, StageStatus, ViewScope,
};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

const EVENT_CAPACITY: usize = 64;

/// Collaborators shared by every session
#[derive(Clone)]
pub struct SessionEnvironment {
    pub config: AssistantConfig,
    pub artifacts: Arc<ArtifactStore>,
    pub cache: ConversationCache,
    pub backend: Arc<dyn ConversationBackend>,
    pub fetcher: Arc<dyn StageFetcher>,
    mounts: Arc<MountRegistry>,
}

impl SessionEnvironment {
    #[must_use]
    pub fn new(
        config: AssistantConfig,
        backend: Arc<dyn ConversationBackend>,
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn StageFetcher>,
    ) -> Self {
        let cache = ConversationCache::new(store, &config.cache);
        Self {
            config,
            artifacts: Arc::new(ArtifactStore::new()),
            cache,
            backend,
            fetcher,
            mounts: Arc::default(),
        }
    }

    /// Environment with in-memory backend and storage
    #[must_use]
    pub fn in_memory(config: AssistantConfig, fetcher: Arc<dyn StageFetcher>) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryBackend::new()),
            Arc::new(MemoryStore::new()),
            fetcher,
        )
    }
}

/// Latest mount of each conversation
///
/// Every mount claims a fresh epoch; only the handle holding the current
/// epoch may reset the shared artifact record.
#[derive(Debug, Default)]
struct MountRegistry {
    owners: DashMap<ConversationId, u64>,
    next_epoch: AtomicU64,
}

impl MountRegistry {
    fn claim(&self, id: &ConversationId) -> u64 {
        let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst);
        self.owners.insert(*id, epoch);
        epoch
    }

    fn owns(&self, id: &ConversationId, epoch: u64) -> bool {
        self.owners.get(id).is_some_and(|owner| *owner == epoch)
    }

    /// Drop ownership; false when a newer mount holds the id
    fn release(&self, id: &ConversationId, epoch: u64) -> bool {
        self.owners.remove_if(id, |_, owner| *owner == epoch).is_some()
    }
}

/// What the conversation view renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum SessionView {
    /// Branch-specific loading screen
    Loading {
        step: LoadingStep,
        retry_available: bool,
    },
    /// Terminal branch UI
    Ready {
        branch: ConversationBranch,
        active_tab: PanelTab,
    },
}

impl SessionView {
    const INITIAL: Self = Self::Loading {
        step: LoadingStep::CheckingZone,
        retry_available: false,
    };

    /// Loading caption, if loading
    #[must_use]
    pub fn caption(&self) -> Option<&'static str> {
        match self {
            Self::Loading { step, .. } => Some(step.copy()),
            Self::Ready { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Notifications published by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    BranchResolved { branch: ConversationBranch },
    EnrichmentFailed { errors: Vec<EnrichmentError> },
    Completed { branch: ConversationBranch },
    /// A write was rejected; it is not retried
    PersistenceFailed {
        operation: &'static str,
        message: String,
    },
    PanelOpened { tab: PanelTab },
}

/// Entry point for opening conversations
#[derive(Clone)]
pub struct ConversationOrchestrator {
    env: SessionEnvironment,
}

impl ConversationOrchestrator {
    #[must_use]
    pub fn new(env: SessionEnvironment) -> Self {
        Self { env }
    }

    #[must_use]
    pub fn environment(&self) -> &SessionEnvironment {
        &self.env
    }

    /// Create a lightweight conversation for `address` and start enriching.
    ///
    /// # Errors
    /// Returns the backend error if the row cannot be created
    pub async fn start_conversation(&self, address: &str) -> Result<SessionHandle, SessionError> {
        let id = ConversationId::new();
        let record = self.env.backend.create_lightweight(&id, address).await?;
        tracing::info!(conversation = %id, "conversation created");
        Ok(self.enrich(&record))
    }

    /// Open an existing conversation.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown ids, or the backend read error
    pub async fn mount(&self, id: &ConversationId) -> Result<SessionHandle, SessionError> {
        let record = self
            .env
            .backend
            .load(id)
            .await?
            .ok_or(SessionError::NotFound(*id))?;
        let cached = self.env.cache.get_cached_conversation_data(id).await;

        match bypass_branch(&record, cached.as_ref()) {
            Some(branch) => Ok(self.restore(&record, branch, cached.as_ref())),
            None => Ok(self.enrich(&record)),
        }
    }

    fn restore(
        &self,
        record: &ConversationRecord,
        branch: ConversationBranch,
        cached: Option<&ConversationCacheData>,
    ) -> SessionHandle {
        let id = record.id;
        let epoch = self.env.mounts.claim(&id);
        let artifacts = Arc::clone(&self.env.artifacts);
        artifacts.initialize_conversation(&id);
        seed_artifacts(&artifacts, record, cached);

        let active_tab = record.stored_active_tab().unwrap_or_default();
        let _ = artifacts.set_active_tab(&id, active_tab);

        let shared = SharedState::new(SessionView::Ready { branch, active_tab });
        let scope = ViewScope::new();
        let readiness = {
            let shared = shared.clone();
            let artifacts = Arc::clone(&artifacts);
            spawn_first_load(
                &scope,
                self.env.config.first_load,
                record.context_metadata.document_count,
                move || {
                    let tab = current_tab(&artifacts, &id);
                    shared.open_panel(tab);
                },
            )
        };

        tracing::info!(conversation = %id, %branch, ?active_tab, "conversation restored");
        SessionHandle {
            id,
            scope,
            artifacts,
            backend: Arc::clone(&self.env.backend),
            tracker: None,
            shared,
            readiness,
            mounts: Arc::clone(&self.env.mounts),
            epoch,
        }
    }

    fn enrich(&self, record: &ConversationRecord) -> SessionHandle {
        let id = record.id;
        let epoch = self.env.mounts.claim(&id);
        let scope = ViewScope::new();
        self.env.artifacts.initialize_conversation(&id);

        let request = EnrichmentRequest {
            conversation_id: id,
            address: record.context_metadata.address.clone().unwrap_or_default(),
        };
        let tracker = EnrichmentTracker::new(request, Arc::clone(&self.env.fetcher), scope.clone());

        let sequencer_scope = scope.child();
        let steps = spawn_sequencer(&sequencer_scope, self.env.config.sequencer, tracker.subscribe());

        let shared = SharedState::new(SessionView::INITIAL);
        let (readiness_tx, readiness) = watch::channel(ArtifactReadiness::default());
        let coordinator = Coordinator {
            id,
            epoch,
            env: self.env.clone(),
            scope: scope.clone(),
            sequencer_scope,
            shared: shared.clone(),
            readiness: readiness_tx,
            branch_persisted: false,
            failure_reported: false,
        };
        scope.spawn(coordinator.run(steps, tracker.subscribe()));

        if let Err(e) = tracker.start() {
            tracing::warn!(conversation = %id, error = %e, "enrichment not started");
        }
        tracing::info!(conversation = %id, "conversation mounted");

        SessionHandle {
            id,
            scope,
            artifacts: Arc::clone(&self.env.artifacts),
            backend: Arc::clone(&self.env.backend),
            tracker: Some(tracker),
            shared,
            readiness,
            mounts: Arc::clone(&self.env.mounts),
            epoch,
        }
    }
}

/// Branch to render immediately, when loading can be skipped
fn bypass_branch(
    record: &ConversationRecord,
    cached: Option<&ConversationCacheData>,
) -> Option<ConversationBranch> {
    let branch = record.branch()?;
    (record.is_completed() || cached.is_some()).then_some(branch)
}

fn seed_artifacts(
    artifacts: &ArtifactStore,
    record: &ConversationRecord,
    cached: Option<&ConversationCacheData>,
) {
    let id = &record.id;
    let metadata = record.document_metadata.as_ref();

    let zone = ZoneData {
        zone_code: metadata.and_then(|m| m.zone_code.clone()),
        zone_name: cached
            .and_then(|c| c.zone_name.clone())
            .or_else(|| metadata.and_then(|m| m.zone_name.clone())),
        city_name: cached
            .and_then(|c| c.city_name.clone())
            .or_else(|| metadata.and_then(|m| m.city_name.clone())),
        insee_code: cached.and_then(|c| c.insee_code.clone()),
    };
    let _ = artifacts.update_artifact(id, ArtifactUpdate::ready(zone));

    // Without a cached outline the map stays loading for the panel to fetch
    if let Some(geometry) = cached.and_then(|c| c.zone_geometry.clone()) {
        let _ = artifacts.update_artifact(id, ArtifactUpdate::ready(MapData { geometry, center: None }));
    }

    let document = DocumentData {
        document_id: record
            .primary_document_id
            .clone()
            .or_else(|| metadata.and_then(|m| m.document_id.clone())),
        title: None,
        source_plu_url: metadata.and_then(|m| m.source_plu_url.clone()),
        content: cached.and_then(|c| c.document_summary.clone()),
        has_analysis: cached.map_or(record.has_analysis, |c| c.has_analysis),
    };
    let _ = artifacts.update_artifact(id, ArtifactUpdate::ready(document));
}

fn current_tab(artifacts: &ArtifactStore, id: &ConversationId) -> PanelTab {
    artifacts
        .get_conversation_state(id)
        .map_or_else(PanelTab::default, |state| state.active_tab())
}

/// View state shared by the handle and background tasks
#[derive(Clone)]
struct SharedState {
    view: Arc<watch::Sender<SessionView>>,
    events: broadcast::Sender<SessionEvent>,
    panel_open: Arc<AtomicBool>,
}

impl SharedState {
    fn new(initial: SessionView) -> Self {
        let (view, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            view: Arc::new(view),
            events,
            panel_open: Arc::new(AtomicBool::new(false)),
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Open the panel; only the first call has an effect
    fn open_panel(&self, tab: PanelTab) {
        if !self.panel_open.swap(true, Ordering::SeqCst) {
            self.emit(SessionEvent::PanelOpened { tab });
        }
    }

    fn sync_tab(&self, tab: PanelTab) {
        self.view.send_if_modified(|view| match view {
            SessionView::Ready { active_tab, .. } if *active_tab != tab => {
                *active_tab = tab;
                true
            }
            _ => false,
        });
    }
}

/// Background task of an enriching session
struct Coordinator {
    id: ConversationId,
    epoch: u64,
    env: SessionEnvironment,
    scope: ViewScope,
    sequencer_scope: ViewScope,
    shared: SharedState,
    readiness: watch::Sender<ArtifactReadiness>,
    branch_persisted: bool,
    failure_reported: bool,
}

impl Coordinator {
    async fn run(
        mut self,
        mut steps: watch::Receiver<LoadingStep>,
        mut snapshots: watch::Receiver<EnrichmentSnapshot>,
    ) {
        self.persist(
            "enrichment_status",
            self.env
                .backend
                .save_enrichment_status(&self.id, PersistedEnrichmentStatus::InProgress),
        )
        .await;

        let mut steps_open = true;
        loop {
            tokio::select! {
                changed = steps.changed(), if steps_open => {
                    if changed.is_err() {
                        steps_open = false;
                        continue;
                    }
                    let step = *steps.borrow_and_update();
                    self.show_step(step);
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    if self.on_snapshot(&snapshot).await {
                        break;
                    }
                }
            }
        }
    }

    fn show_step(&self, step: LoadingStep) {
        if !self.scope.is_live() {
            return;
        }
        self.shared.view.send_if_modified(|view| match view {
            SessionView::Loading { step: shown, .. } if *shown != step => {
                *shown = step;
                true
            }
            _ => false,
        });
    }

    fn set_retry_available(&self, available: bool) {
        self.shared.view.send_if_modified(|view| match view {
            SessionView::Loading { retry_available, .. } if *retry_available != available => {
                *retry_available = available;
                true
            }
            _ => false,
        });
    }

    /// Returns true once the session reached its terminal state
    async fn on_snapshot(&mut self, snapshot: &EnrichmentSnapshot) -> bool {
        if !self.scope.is_live() {
            return true;
        }
        let branch = snapshot.branch();
        self.sync_artifacts(snapshot, branch);

        if let Some(branch) = branch {
            if !self.branch_persisted {
                self.branch_persisted = true;
                tracing::info!(conversation = %self.id, %branch, "branch resolved");
                self.shared.emit(SessionEvent::BranchResolved { branch });
                let resolution = BranchResolution {
                    branch,
                    is_rnu: branch.is_rnu(),
                    has_analysis: snapshot.data.has_analysis.unwrap_or(false),
                };
                self.persist(
                    "branch_resolution",
                    self.env.backend.save_branch_resolution(&self.id, resolution),
                )
                .await;
            }
        }

        match (snapshot.status, branch) {
            (EnrichmentStatus::Complete, Some(branch)) => {
                self.complete(snapshot, branch).await;
                return true;
            }
            (EnrichmentStatus::Error, _) if !self.failure_reported => {
                self.failure_reported = true;
                let errors = snapshot.failures();
                tracing::warn!(conversation = %self.id, failed = errors.len(), "enrichment failed");
                self.set_retry_available(true);
                self.shared.emit(SessionEvent::EnrichmentFailed { errors });
                self.persist(
                    "enrichment_status",
                    self.env
                        .backend
                        .save_enrichment_status(&self.id, PersistedEnrichmentStatus::Failed),
                )
                .await;
            }
            (EnrichmentStatus::Enriching, _) if self.failure_reported => {
                self.failure_reported = false;
                self.set_retry_available(false);
                self.persist(
                    "enrichment_status",
                    self.env
                        .backend
                        .save_enrichment_status(&self.id, PersistedEnrichmentStatus::InProgress),
                )
                .await;
            }
            _ => {}
        }
        false
    }

    async fn complete(&self, snapshot: &EnrichmentSnapshot, branch: ConversationBranch) {
        let data = &snapshot.data;
        let metadata = build_document_metadata_payload(&DocumentMetadataInput {
            branch,
            document_id: data.document_id.as_deref(),
            zone_code: data.zone_code.as_deref(),
            zone_name: data.zone_name.as_deref(),
            city_name: data.city_name.as_deref(),
            source_plu_url: data.source_plu_url.as_deref(),
            map_geometry: data.map_geometry.as_ref(),
            enriched_at: Utc::now(),
        });
        self.persist(
            "completion",
            self.env
                .backend
                .save_completion(&self.id, &metadata, data.document_id.as_deref()),
        )
        .await;

        let cache_data = ConversationCacheData {
            zone_geometry: data.map_geometry.clone(),
            zone_name: data.zone_name.clone(),
            city_name: data.city_name.clone(),
            insee_code: data.insee_code.clone(),
            has_analysis: data.has_analysis.unwrap_or(false),
            document_summary: document_summary(data),
            ..ConversationCacheData::new(false)
        };
        if let Err(e) = self.env.cache.set_cached_conversation_data(&self.id, cache_data).await {
            self.report_failure("cache", &SessionError::from(e));
        }

        if !self.scope.is_live() {
            return;
        }
        self.sequencer_scope.cancel();

        let active_tab = current_tab(&self.env.artifacts, &self.id);
        self.shared.view.send_replace(SessionView::Ready { branch, active_tab });
        self.readiness.send_replace(ArtifactReadiness::ready());
        self.shared.emit(SessionEvent::Completed { branch });
        self.shared.open_panel(active_tab);
        tracing::info!(conversation = %self.id, %branch, "enrichment completed");
    }

    fn sync_artifacts(&self, snapshot: &EnrichmentSnapshot, branch: Option<ConversationBranch>) {
        // A newer mount of the same conversation owns the shared record
        if !self.env.mounts.owns(&self.id, self.epoch) {
            return;
        }
        let data = &snapshot.data;

        // RNU has no zoning stages; its zone card comes from the city lookup
        let zone_stage = branch.map(|branch| {
            if branch.is_rnu() {
                EnrichmentStage::City
            } else {
                EnrichmentStage::Zone
            }
        });
        if let Some(stage) = zone_stage {
            self.apply(snapshot, stage, || {
                Some(ZoneData {
                    zone_code: data.zone_code.clone(),
                    zone_name: data.zone_name.clone(),
                    city_name: data.city_name.clone(),
                    insee_code: data.insee_code.clone(),
                })
            });
        }

        self.apply(snapshot, EnrichmentStage::Map, || {
            data.map_geometry.clone().map(|geometry| MapData {
                geometry,
                center: data.center,
            })
        });

        self.apply(snapshot, EnrichmentStage::Document, || {
            Some(DocumentData {
                document_id: data.document_id.clone(),
                title: document_field(data, "title"),
                source_plu_url: data.source_plu_url.clone(),
                content: document_summary(data),
                has_analysis: data.has_analysis.unwrap_or(false),
            })
        });
    }

    fn apply<T: ArtifactPayload>(
        &self,
        snapshot: &EnrichmentSnapshot,
        stage: EnrichmentStage,
        payload: impl FnOnce() -> Option<T>,
    ) {
        let update = match snapshot.progress.get(stage) {
            None => return,
            Some(StageStatus::Loading) => ArtifactUpdate::loading(),
            Some(StageStatus::Success) => payload().map_or_else(
                || ArtifactUpdate::failed(format!("{stage} returned no {} data", T::KIND)),
                ArtifactUpdate::ready,
            ),
            Some(StageStatus::Error) => ArtifactUpdate::failed(
                snapshot
                    .errors
                    .get(&stage)
                    .map_or_else(|| format!("{stage} failed"), |e| e.message.clone()),
            ),
        };
        let _ = self.env.artifacts.update_artifact(&self.id, update);
    }

    async fn persist(
        &self,
        operation: &'static str,
        write: impl Future<Output = Result<(), SessionError>>,
    ) {
        if let Err(e) = write.await {
            self.report_failure(operation, &e);
        }
    }

    fn report_failure(&self, operation: &'static str, error: &SessionError) {
        tracing::error!(conversation = %self.id, operation, error = %error, "persistence write failed");
        self.shared.emit(SessionEvent::PersistenceFailed {
            operation,
            message: error.to_string(),
        });
    }
}

fn document_field(data: &EnrichmentData, field: &str) -> Option<String> {
    data.document_data
        .as_ref()
        .and_then(|doc| doc.get(field))
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
}

fn document_summary(data: &EnrichmentData) -> Option<String> {
    document_field(data, "summary")
}

/// Live conversation view
///
/// Dropping the handle tears the view down: timers stop, late results are
/// discarded and the conversation's artifacts are removed from the store.
pub struct SessionHandle {
    id: ConversationId,
    scope: ViewScope,
    artifacts: Arc<ArtifactStore>,
    backend: Arc<dyn ConversationBackend>,
    tracker: Option<EnrichmentTracker>,
    shared: SharedState,
    readiness: watch::Receiver<ArtifactReadiness>,
    mounts: Arc<MountRegistry>,
    epoch: u64,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("view", &self.view())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConversationId {
        self.id
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        *self.shared.view.borrow()
    }

    #[must_use]
    pub fn subscribe_view(&self) -> watch::Receiver<SessionView> {
        self.shared.view.subscribe()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Restart failed stages; no-op unless enrichment is in error
    pub fn retry(&self) -> bool {
        self.tracker.as_ref().is_some_and(EnrichmentTracker::retry)
    }

    /// Current enrichment state, absent for restored sessions
    #[must_use]
    pub fn enrichment(&self) -> Option<EnrichmentSnapshot> {
        self.tracker.as_ref().map(EnrichmentTracker::snapshot)
    }

    #[must_use]
    pub fn artifacts(&self) -> Option<ConversationArtifacts> {
        self.artifacts.get_conversation_state(&self.id)
    }

    #[must_use]
    pub fn active_tab(&self) -> PanelTab {
        current_tab(&self.artifacts, &self.id)
    }

    /// Select a panel tab and persist it when it changed.
    ///
    /// # Errors
    /// Returns the backend error; the selection itself is kept
    pub async fn set_active_tab(&self, tab: PanelTab) -> Result<(), SessionError> {
        let outcome = self.artifacts.set_active_tab(&self.id, tab);
        self.shared.sync_tab(tab);
        if outcome.is_applied() {
            self.backend
                .save_panel_state(&self.id, PanelState { active_tab: tab })
                .await?;
        }
        Ok(())
    }

    /// Show `kind` in the panel, opening it if needed.
    ///
    /// # Errors
    /// Returns the backend error from persisting the tab
    pub async fn open_artifact(&self, kind: ArtifactKind) -> Result<PanelTab, SessionError> {
        let before = self.active_tab();
        let tab = self.artifacts.open_artifact_in_panel(&self.id, kind);
        self.shared.sync_tab(tab);
        self.shared.open_panel(tab);
        if tab != before {
            self.backend
                .save_panel_state(&self.id, PanelState { active_tab: tab })
                .await?;
        }
        Ok(tab)
    }

    #[must_use]
    pub fn readiness(&self) -> ArtifactReadiness {
        *self.readiness.borrow()
    }

    /// Chat input unlocks once the terminal view is shown and artifacts are ready
    #[must_use]
    pub fn chat_input_enabled(&self) -> bool {
        self.view().is_ready() && self.readiness.borrow().chat_input_enabled()
    }

    #[must_use]
    pub fn is_panel_open(&self) -> bool {
        self.shared.panel_open.load(Ordering::SeqCst)
    }

    /// Whether this is the latest mount of its conversation
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.mounts.owns(&self.id, self.epoch)
    }

    /// Navigate away
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.scope.cancel();
        if self.mounts.release(&self.id, self.epoch) {
            self.artifacts.reset_conversation(&self.id);
            tracing::debug!(conversation = %self.id, "session unmounted");
        } else {
            tracing::debug!(conversation = %self.id, epoch = self.epoch, "superseded session unmounted");
        }
    }
}

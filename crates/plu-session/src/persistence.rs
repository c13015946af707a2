//! Conversation persistence contract
//!
//! Only the columns the session reads and writes are modelled. Backends
//! report failures; the session never retries a write on its own.

use crate::error::SessionError;
use async_trait::async_trait;
use dashmap::DashMap;
use plu_artifact::PanelTab;
use plu_core::{ConversationBranch, ConversationId, DocumentMetadataPayload, StoredBranch};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Persisted `enrichment_status` column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistedEnrichmentStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// `context_metadata.panel`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelState {
    pub active_tab: PanelTab,
}

/// `context_metadata` column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel: Option<PanelState>,
    pub document_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Conversation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub branch_type: StoredBranch,
    pub has_analysis: bool,
    pub is_rnu: bool,
    pub primary_document_id: Option<String>,
    pub document_metadata: Option<DocumentMetadataPayload>,
    pub enrichment_status: PersistedEnrichmentStatus,
    #[serde(default)]
    pub context_metadata: ContextMetadata,
}

impl ConversationRecord {
    /// Row for a conversation not enriched yet
    #[must_use]
    pub fn lightweight(id: ConversationId, address: impl Into<String>) -> Self {
        Self {
            id,
            branch_type: StoredBranch::Pending,
            has_analysis: false,
            is_rnu: false,
            primary_document_id: None,
            document_metadata: None,
            enrichment_status: PersistedEnrichmentStatus::Pending,
            context_metadata: ContextMetadata {
                address: Some(address.into()),
                ..ContextMetadata::default()
            },
        }
    }

    /// Terminal branch, `None` while pending
    #[inline]
    #[must_use]
    pub fn branch(&self) -> Option<ConversationBranch> {
        self.branch_type.resolved()
    }

    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.enrichment_status == PersistedEnrichmentStatus::Completed
    }

    /// Tab restored from persisted panel state
    #[must_use]
    pub fn stored_active_tab(&self) -> Option<PanelTab> {
        self.context_metadata.panel.map(|panel| panel.active_tab)
    }
}

/// Branch fields written once classification is certain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchResolution {
    pub branch: ConversationBranch,
    pub is_rnu: bool,
    pub has_analysis: bool,
}

/// Row store for conversations
#[async_trait]
pub trait ConversationBackend: Send + Sync + std::fmt::Debug {
    async fn load(&self, id: &ConversationId) -> Result<Option<ConversationRecord>, SessionError>;

    /// Insert [`ConversationRecord::lightweight`]
    async fn create_lightweight(
        &self,
        id: &ConversationId,
        address: &str,
    ) -> Result<ConversationRecord, SessionError>;

    async fn save_branch_resolution(
        &self,
        id: &ConversationId,
        resolution: BranchResolution,
    ) -> Result<(), SessionError>;

    /// Replace `document_metadata` as a whole and mark enrichment completed
    async fn save_completion(
        &self,
        id: &ConversationId,
        metadata: &DocumentMetadataPayload,
        primary_document_id: Option<&str>,
    ) -> Result<(), SessionError>;

    async fn save_enrichment_status(
        &self,
        id: &ConversationId,
        status: PersistedEnrichmentStatus,
    ) -> Result<(), SessionError>;

    async fn save_panel_state(&self, id: &ConversationId, panel: PanelState) -> Result<(), SessionError>;
}

/// In-process backend
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: DashMap<ConversationId, ConversationRecord>,
    fail_writes: AtomicBool,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row directly
    pub fn insert(&self, record: ConversationRecord) {
        self.records.insert(record.id, record);
    }

    #[must_use]
    pub fn get(&self, id: &ConversationId) -> Option<ConversationRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn update(
        &self,
        id: &ConversationId,
        apply: impl FnOnce(&mut ConversationRecord),
    ) -> Result<(), SessionError> {
        self.check_writable()?;
        let mut record = self.records.get_mut(id).ok_or(SessionError::NotFound(*id))?;
        apply(record.value_mut());
        Ok(())
    }

    fn check_writable(&self) -> Result<(), SessionError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SessionError::Persistence("backend rejected write".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationBackend for InMemoryBackend {
    async fn load(&self, id: &ConversationId) -> Result<Option<ConversationRecord>, SessionError> {
        Ok(self.get(id))
    }

    async fn create_lightweight(
        &self,
        id: &ConversationId,
        address: &str,
    ) -> Result<ConversationRecord, SessionError> {
        self.check_writable()?;
        let record = ConversationRecord::lightweight(*id, address);
        self.records.insert(*id, record.clone());
        Ok(record)
    }

    async fn save_branch_resolution(
        &self,
        id: &ConversationId,
        resolution: BranchResolution,
    ) -> Result<(), SessionError> {
        self.update(id, |record| {
            record.branch_type = resolution.branch.into();
            record.is_rnu = resolution.is_rnu;
            record.has_analysis = resolution.has_analysis;
        })
    }

    async fn save_completion(
        &self,
        id: &ConversationId,
        metadata: &DocumentMetadataPayload,
        primary_document_id: Option<&str>,
    ) -> Result<(), SessionError> {
        self.update(id, |record| {
            record.document_metadata = Some(metadata.clone());
            record.primary_document_id = primary_document_id.map(ToString::to_string);
            record.branch_type = metadata.branch_type.into();
            record.enrichment_status = PersistedEnrichmentStatus::Completed;
        })
    }

    async fn save_enrichment_status(
        &self,
        id: &ConversationId,
        status: PersistedEnrichmentStatus,
    ) -> Result<(), SessionError> {
        self.update(id, |record| record.enrichment_status = status)
    }

    async fn save_panel_state(&self, id: &ConversationId, panel: PanelState) -> Result<(), SessionError> {
        self.update(id, |record| record.context_metadata.panel = Some(panel))
    }
}

//! Testing utilities for the PLU assistant workspace
//!
//! Shared fixtures: sample geometries, conversation rows, cache snapshots and
//! an in-memory session environment.

#![allow(missing_docs)]

use chrono::{Duration, Utc};
use plu_artifact::PanelTab;
use plu_cache::{ConversationCacheData, MemoryStore};
use plu_core::{AssistantConfig, ConversationBranch, ConversationId, DocumentMetadataPayload, StoredBranch};
use plu_session::{
    ContextMetadata, ConversationOrchestrator, ConversationRecord, InMemoryBackend, PanelState,
    PersistedEnrichmentStatus, ScriptedFetcher, SessionEnvironment,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Square around Paris, ring in `[lon, lat]` order
pub fn paris_polygon() -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[2.0, 48.0], [2.1, 48.0], [2.1, 48.1], [2.0, 48.1], [2.0, 48.0]]]
    })
}

/// Two disjoint squares
pub fn two_part_multipolygon() -> Value {
    json!({
        "type": "MultiPolygon",
        "coordinates": [
            [[[4.80, 45.70], [4.81, 45.70], [4.81, 45.71], [4.80, 45.70]]],
            [[[4.90, 45.80], [4.91, 45.80], [4.91, 45.81], [4.90, 45.80]]]
        ]
    })
}

pub fn document_metadata(branch: ConversationBranch) -> DocumentMetadataPayload {
    DocumentMetadataPayload {
        branch_type: branch,
        document_id: Some("doc-75056-ug".to_string()),
        zone_code: Some("UG".to_string()),
        zone_name: Some("Zone urbaine générale".to_string()),
        city_name: Some("Paris".to_string()),
        source_plu_url: Some("https://www.geoportail-urbanisme.gouv.fr/document/75056".to_string()),
        map_geometry_available: true,
        enriched_at: Utc::now() - Duration::days(3),
    }
}

/// Row of a conversation enriched earlier, with `document_count` documents
pub fn completed_record(branch: ConversationBranch, document_count: u32) -> ConversationRecord {
    ConversationRecord {
        id: ConversationId::new(),
        branch_type: StoredBranch::from(branch),
        has_analysis: branch == ConversationBranch::NonRnuAnalysis,
        is_rnu: branch.is_rnu(),
        primary_document_id: Some("doc-75056-ug".to_string()),
        document_metadata: Some(document_metadata(branch)),
        enrichment_status: PersistedEnrichmentStatus::Completed,
        context_metadata: ContextMetadata {
            panel: None,
            document_count,
            address: Some("8 rue de Rivoli, 75004 Paris".to_string()),
        },
    }
}

/// [`completed_record`] with a persisted panel tab
pub fn completed_record_with_tab(
    branch: ConversationBranch,
    document_count: u32,
    tab: PanelTab,
) -> ConversationRecord {
    let mut record = completed_record(branch, document_count);
    record.context_metadata.panel = Some(PanelState { active_tab: tab });
    record
}

pub fn cache_data(has_analysis: bool) -> ConversationCacheData {
    ConversationCacheData {
        zone_geometry: Some(paris_polygon()),
        zone_name: Some("Zone urbaine générale".to_string()),
        city_name: Some("Paris".to_string()),
        insee_code: Some("75056".to_string()),
        document_summary: Some("Hauteur plafond 31 m".to_string()),
        ..ConversationCacheData::new(has_analysis)
    }
}

/// In-memory environment keeping typed handles on its collaborators
pub struct TestEnvironment {
    pub env: SessionEnvironment,
    pub backend: Arc<InMemoryBackend>,
    pub store: Arc<MemoryStore>,
    pub fetcher: Arc<ScriptedFetcher>,
}

impl TestEnvironment {
    /// Environment whose fetcher scripts `branch`
    pub fn new(branch: ConversationBranch) -> Self {
        Self::with_fetcher(ScriptedFetcher::for_branch(branch))
    }

    pub fn with_fetcher(fetcher: ScriptedFetcher) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(fetcher);
        let env = SessionEnvironment::new(
            AssistantConfig::default(),
            backend.clone(),
            store.clone(),
            fetcher.clone(),
        );
        Self {
            env,
            backend,
            store,
            fetcher,
        }
    }

    pub fn orchestrator(&self) -> ConversationOrchestrator {
        ConversationOrchestrator::new(self.env.clone())
    }
}

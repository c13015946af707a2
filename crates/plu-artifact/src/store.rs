//! Process-wide artifact repository
//!
//! One [`ConversationArtifacts`] record per conversation id. All mutation is
//! by key; records of different conversations never interact.

use crate::kind::{ArtifactKind, ArtifactStatus, PanelTab};
use crate::payload::{ArtifactPayload, DocumentData, MapData, ZoneData};
use crate::state::{ArtifactState, ArtifactUpdate};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use plu_core::ConversationId;
use serde::Serialize;
use tokio::sync::broadcast;

/// Artifacts of one conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationArtifacts {
    pub(crate) zone: ArtifactState<ZoneData>,
    pub(crate) map: ArtifactState<MapData>,
    pub(crate) document: ArtifactState<DocumentData>,
    pub(crate) active_tab: PanelTab,
}

impl ConversationArtifacts {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            zone: ArtifactState::loading(now),
            map: ArtifactState::loading(now),
            document: ArtifactState::loading(now),
            active_tab: PanelTab::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn zone(&self) -> &ArtifactState<ZoneData> {
        &self.zone
    }

    #[inline]
    #[must_use]
    pub fn map(&self) -> &ArtifactState<MapData> {
        &self.map
    }

    #[inline]
    #[must_use]
    pub fn document(&self) -> &ArtifactState<DocumentData> {
        &self.document
    }

    /// Slot for payload type `T`
    #[inline]
    #[must_use]
    pub fn artifact<T: ArtifactPayload>(&self) -> &ArtifactState<T> {
        T::slot(self)
    }

    #[inline]
    #[must_use]
    pub fn active_tab(&self) -> PanelTab {
        self.active_tab
    }

    /// Status by kind
    #[must_use]
    pub fn status_of(&self, kind: ArtifactKind) -> ArtifactStatus {
        match kind {
            ArtifactKind::Zone => self.zone.status(),
            ArtifactKind::Map => self.map.status(),
            ArtifactKind::Document => self.document.status(),
        }
    }
}

/// Change notifications, emitted only for effective changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactEvent {
    Initialized {
        conversation_id: ConversationId,
    },
    Updated {
        conversation_id: ConversationId,
        kind: ArtifactKind,
        status: ArtifactStatus,
    },
    TabChanged {
        conversation_id: ConversationId,
        tab: PanelTab,
    },
    Reset {
        conversation_id: ConversationId,
    },
}

/// Result of a mutating call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum UpdateOutcome {
    Applied,
    Unchanged,
}

impl UpdateOutcome {
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Keyed artifact repository
#[derive(Debug)]
pub struct ArtifactStore {
    conversations: DashMap<ConversationId, ConversationArtifacts>,
    events: broadcast::Sender<ArtifactEvent>,
}

impl ArtifactStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_event_capacity(256)
    }

    /// Create empty store with a bounded event backlog
    #[must_use]
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            conversations: DashMap::new(),
            events,
        }
    }

    /// Subscribe to change notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ArtifactEvent> {
        self.events.subscribe()
    }

    /// Create the record for `id` if absent.
    ///
    /// Returns whether a record was created.
    pub fn initialize_conversation(&self, id: &ConversationId) -> bool {
        let (_, created) = self.entry(id);
        created
    }

    /// Merge `update` into the `T` artifact of `id`, creating the record if
    /// needed.
    pub fn update_artifact<T: ArtifactPayload>(
        &self,
        id: &ConversationId,
        update: ArtifactUpdate<T>,
    ) -> UpdateOutcome {
        let (mut record, _) = self.entry(id);
        let slot = T::slot_mut(&mut *record);
        if !slot.merge(update, Utc::now()) {
            return UpdateOutcome::Unchanged;
        }
        let status = slot.status();
        drop(record);

        tracing::debug!(conversation = %id, kind = %T::KIND, ?status, "artifact updated");
        self.emit(ArtifactEvent::Updated {
            conversation_id: *id,
            kind: T::KIND,
            status,
        });
        UpdateOutcome::Applied
    }

    /// Select the panel tab of `id`, creating the record if needed.
    pub fn set_active_tab(&self, id: &ConversationId, tab: PanelTab) -> UpdateOutcome {
        let (mut record, _) = self.entry(id);
        if record.active_tab == tab {
            return UpdateOutcome::Unchanged;
        }
        record.active_tab = tab;
        drop(record);

        self.emit(ArtifactEvent::TabChanged {
            conversation_id: *id,
            tab,
        });
        UpdateOutcome::Applied
    }

    /// Show `kind` in the panel and return the tab that displays it.
    pub fn open_artifact_in_panel(&self, id: &ConversationId, kind: ArtifactKind) -> PanelTab {
        let tab = kind.panel_tab();
        let _ = self.set_active_tab(id, tab);
        tab
    }

    /// Remove the record of `id` entirely.
    ///
    /// Returns whether a record existed.
    pub fn reset_conversation(&self, id: &ConversationId) -> bool {
        let removed = self.conversations.remove(id).is_some();
        if removed {
            tracing::debug!(conversation = %id, "artifacts reset");
            self.emit(ArtifactEvent::Reset {
                conversation_id: *id,
            });
        }
        removed
    }

    /// Snapshot of the record of `id`
    #[must_use]
    pub fn get_conversation_state(&self, id: &ConversationId) -> Option<ConversationArtifacts> {
        self.conversations.get(id).map(|r| r.value().clone())
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ConversationId) -> bool {
        self.conversations.contains_key(id)
    }

    /// Number of conversations tracked
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    fn entry(&self, id: &ConversationId) -> (RefMut<'_, ConversationId, ConversationArtifacts>, bool) {
        match self.conversations.entry(*id) {
            Entry::Occupied(occupied) => (occupied.into_ref(), false),
            Entry::Vacant(vacant) => {
                let record = vacant.insert(ConversationArtifacts::new(Utc::now()));
                self.emit(ArtifactEvent::Initialized {
                    conversation_id: *id,
                });
                (record, true)
            }
        }
    }

    fn emit(&self, event: ArtifactEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_conversation_reads_none() {
        let store = ArtifactStore::new();
        assert!(store.get_conversation_state(&ConversationId::new()).is_none());
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = ArtifactStore::new();
        let id = ConversationId::new();

        assert!(store.initialize_conversation(&id));
        let _ = store.set_active_tab(&id, PanelTab::Document);
        assert!(!store.initialize_conversation(&id));

        let state = store.get_conversation_state(&id).unwrap();
        assert_eq!(state.active_tab(), PanelTab::Document);
    }

    #[test]
    fn update_auto_initializes_with_map_tab() {
        let store = ArtifactStore::new();
        let id = ConversationId::new();

        let outcome = store.update_artifact::<DocumentData>(&id, ArtifactUpdate::failed("boom"));
        assert!(outcome.is_applied());

        let state = store.get_conversation_state(&id).unwrap();
        assert_eq!(state.active_tab(), PanelTab::Map);
        assert_eq!(state.status_of(ArtifactKind::Document), ArtifactStatus::Error);
        assert_eq!(state.status_of(ArtifactKind::Zone), ArtifactStatus::Loading);
    }

    #[test]
    fn reset_removes_record() {
        let store = ArtifactStore::new();
        let id = ConversationId::new();
        let _ = store.set_active_tab(&id, PanelTab::Document);

        assert!(store.reset_conversation(&id));
        assert!(store.get_conversation_state(&id).is_none());
        assert!(!store.reset_conversation(&id));

        // Re-created records start from defaults
        store.initialize_conversation(&id);
        assert_eq!(store.get_conversation_state(&id).unwrap().active_tab(), PanelTab::Map);
    }

    #[test]
    fn open_zone_selects_map() {
        let store = ArtifactStore::new();
        let id = ConversationId::new();

        assert_eq!(store.open_artifact_in_panel(&id, ArtifactKind::Document), PanelTab::Document);
        assert_eq!(store.open_artifact_in_panel(&id, ArtifactKind::Zone), PanelTab::Map);
        assert_eq!(store.get_conversation_state(&id).unwrap().active_tab(), PanelTab::Map);
    }
}

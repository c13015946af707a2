//! Artifact store behaviour across conversations and subscribers.

use plu_artifact::{
    ArtifactEvent, ArtifactKind, ArtifactStatus, ArtifactStore, ArtifactUpdate, DocumentData,
    MapData, PanelTab, ZoneData,
};
use plu_core::ConversationId;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

fn zone() -> ZoneData {
    ZoneData {
        zone_code: Some("UA".to_string()),
        zone_name: Some("Zone urbaine centrale".to_string()),
        city_name: Some("Lyon".to_string()),
        insee_code: Some("69123".to_string()),
    }
}

#[test]
fn repeated_ready_update_is_a_noop() {
    let store = ArtifactStore::new();
    let id = ConversationId::new();

    let first = store.update_artifact(&id, ArtifactUpdate::ready(zone()));
    let snapshot = store.get_conversation_state(&id).unwrap();
    let second = store.update_artifact(&id, ArtifactUpdate::ready(zone()));

    assert!(first.is_applied());
    assert!(!second.is_applied());
    assert_eq!(store.get_conversation_state(&id).unwrap(), snapshot);
}

#[test]
fn noop_updates_publish_nothing() {
    let store = ArtifactStore::new();
    let id = ConversationId::new();
    store.initialize_conversation(&id);
    let mut events = store.subscribe();

    let _ = store.update_artifact(&id, ArtifactUpdate::ready(zone()));
    let _ = store.update_artifact(&id, ArtifactUpdate::ready(zone()));
    let _ = store.set_active_tab(&id, PanelTab::Map);

    assert_eq!(
        events.try_recv().unwrap(),
        ArtifactEvent::Updated {
            conversation_id: id,
            kind: ArtifactKind::Zone,
            status: ArtifactStatus::Ready,
        }
    );
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[test]
fn conversations_are_isolated() {
    let store = ArtifactStore::new();
    let a = ConversationId::new();
    let b = ConversationId::new();

    let _ = store.update_artifact(
        &a,
        ArtifactUpdate::ready(MapData {
            geometry: json!({ "type": "Polygon", "coordinates": [] }),
            center: None,
        }),
    );
    let _ = store.set_active_tab(&b, PanelTab::Document);

    let state_a = store.get_conversation_state(&a).unwrap();
    let state_b = store.get_conversation_state(&b).unwrap();
    assert_eq!(state_a.status_of(ArtifactKind::Map), ArtifactStatus::Ready);
    assert_eq!(state_a.active_tab(), PanelTab::Map);
    assert_eq!(state_b.status_of(ArtifactKind::Map), ArtifactStatus::Loading);
    assert_eq!(state_b.active_tab(), PanelTab::Document);

    store.reset_conversation(&a);
    assert!(store.contains(&b));
    assert_eq!(store.len(), 1);
}

#[test]
fn typed_slot_access() {
    let store = ArtifactStore::new();
    let id = ConversationId::new();
    let document = DocumentData {
        document_id: Some("doc-1".to_string()),
        has_analysis: true,
        ..DocumentData::default()
    };

    let _ = store.update_artifact(&id, ArtifactUpdate::ready(document.clone()));

    let state = store.get_conversation_state(&id).unwrap();
    assert_eq!(state.artifact::<DocumentData>().data(), Some(&document));
    assert!(state.artifact::<ZoneData>().data().is_none());
}

#[test]
fn reset_publishes_event_once() {
    let store = ArtifactStore::new();
    let id = ConversationId::new();
    store.initialize_conversation(&id);
    let mut events = store.subscribe();

    store.reset_conversation(&id);
    store.reset_conversation(&id);

    assert_eq!(events.try_recv().unwrap(), ArtifactEvent::Reset { conversation_id: id });
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
}

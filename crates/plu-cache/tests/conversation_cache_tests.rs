//! Conversation cache validity rules and failure handling.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use plu_cache::{CacheError, ConversationCache, ConversationCacheData, KeyValueStore, MemoryStore};
use plu_core::{CacheSettings, ConversationId};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

/// Store whose every operation fails.
#[derive(Debug)]
struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Store("storage unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
        Err(CacheError::Store("quota exceeded".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Store("storage unavailable".to_string()))
    }
}

fn snapshot() -> ConversationCacheData {
    ConversationCacheData {
        zone_geometry: Some(json!({
            "type": "Polygon",
            "coordinates": [[[4.83, 45.76], [4.84, 45.76], [4.84, 45.77], [4.83, 45.76]]]
        })),
        zone_name: Some("UA1".to_string()),
        city_name: Some("Lyon".to_string()),
        insee_code: Some("69123".to_string()),
        has_analysis: true,
        document_summary: Some("Hauteur maximale 18 m".to_string()),
        cache_version: 0,
        cached_at: None,
    }
}

#[tokio::test]
async fn entry_written_under_old_version_is_a_miss() {
    let store = Arc::new(MemoryStore::new());
    let id = ConversationId::new();

    let old = ConversationCache::new(
        store.clone(),
        &CacheSettings {
            cache_version: 1,
            ..CacheSettings::default()
        },
    );
    old.set_cached_conversation_data(&id, snapshot()).await.unwrap();

    let current = ConversationCache::new(
        store,
        &CacheSettings {
            cache_version: 2,
            ..CacheSettings::default()
        },
    );
    assert_eq!(current.get_cached_conversation_data(&id).await, None);
}

#[tokio::test]
async fn caller_supplied_timestamp_is_kept_and_checked_for_expiry() {
    let store = Arc::new(MemoryStore::new());
    let id = ConversationId::new();
    let writer = ConversationCache::new(store.clone(), &CacheSettings::default());

    let mut data = snapshot();
    data.cached_at = Some(Utc::now() - Duration::hours(30));
    let written = writer.set_cached_conversation_data(&id, data).await.unwrap();
    assert!(written.cached_at.unwrap() < Utc::now() - Duration::hours(29));

    // A fresh reader over the same store sees only the persisted entry
    let reader = ConversationCache::new(store, &CacheSettings::default());
    assert_eq!(reader.get_cached_conversation_data(&id).await, None);
    // The in-memory front applies the same rule
    assert_eq!(writer.get_cached_conversation_data(&id).await, None);
}

#[tokio::test]
async fn write_fully_replaces_previous_snapshot() {
    let cache = ConversationCache::new(Arc::new(MemoryStore::new()), &CacheSettings::default());
    let id = ConversationId::new();
    cache.set_cached_conversation_data(&id, snapshot()).await.unwrap();

    let replacement = ConversationCacheData::new(false);
    cache.set_cached_conversation_data(&id, replacement).await.unwrap();

    let read = cache.get_cached_conversation_data(&id).await.unwrap();
    assert_eq!(read.zone_name, None);
    assert_eq!(read.document_summary, None);
    assert!(!read.has_analysis);
}

#[tokio::test]
async fn read_failure_degrades_to_miss() {
    let cache = ConversationCache::new(Arc::new(UnavailableStore), &CacheSettings::default());
    assert_eq!(cache.get_cached_conversation_data(&ConversationId::new()).await, None);
}

#[tokio::test]
async fn write_failure_is_propagated() {
    let cache = ConversationCache::new(Arc::new(UnavailableStore), &CacheSettings::default());
    let id = ConversationId::new();

    let err = cache.set_cached_conversation_data(&id, snapshot()).await.unwrap_err();

    assert!(matches!(err, CacheError::Store(_)));
    assert!(err.is_retryable());
    assert_eq!(cache.get_cached_conversation_data(&id).await, None);
}

#[tokio::test]
async fn summary_is_omitted_when_absent() {
    let store = Arc::new(MemoryStore::new());
    let cache = ConversationCache::new(store.clone(), &CacheSettings::default());
    let id = ConversationId::new();

    cache
        .set_cached_conversation_data(&id, ConversationCacheData::new(false))
        .await
        .unwrap();

    let raw = store.raw(&format!("conversation-cache:{id}")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value.get("document_summary").is_none());
    assert_eq!(value["cache_version"], json!(1));
}

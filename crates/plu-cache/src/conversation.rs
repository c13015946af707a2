//! Conversation snapshot cache
//!
//! Presence of a valid entry at mount time is enough to skip the loading
//! sequence. An entry is valid when it parses, carries the configured
//! `cache_version` and is younger than the configured TTL.

use crate::error::CacheError;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use plu_core::{CacheSettings, ConversationId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Persisted snapshot of a completed conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationCacheData {
    pub zone_geometry: Option<Value>,
    pub zone_name: Option<String>,
    pub city_name: Option<String>,
    pub insee_code: Option<String>,
    pub has_analysis: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_summary: Option<String>,
    /// Stamped by the cache on write
    pub cache_version: u32,
    /// Stamped by the cache on write when absent
    pub cached_at: Option<DateTime<Utc>>,
}

impl ConversationCacheData {
    /// Snapshot with no optional parts filled in
    #[must_use]
    pub fn new(has_analysis: bool) -> Self {
        Self {
            zone_geometry: None,
            zone_name: None,
            city_name: None,
            insee_code: None,
            has_analysis,
            document_summary: None,
            cache_version: 0,
            cached_at: None,
        }
    }
}

/// Conversation cache over a persisted store with an in-memory front
#[derive(Debug, Clone)]
pub struct ConversationCache {
    store: Arc<dyn KeyValueStore>,
    memory: Cache<ConversationId, ConversationCacheData>,
    version: u32,
    ttl: chrono::Duration,
}

impl ConversationCache {
    /// Create cache with the given settings
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, settings: &CacheSettings) -> Self {
        let ttl = settings.conversation_ttl();
        Self {
            store,
            memory: Cache::builder()
                .max_capacity(settings.max_capacity)
                .time_to_live(ttl)
                .build(),
            version: settings.cache_version,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Valid snapshot for `id`, or `None`.
    ///
    /// Never fails: store errors, unparsable entries, version mismatches and
    /// expired entries all read as a miss.
    pub async fn get_cached_conversation_data(
        &self,
        id: &ConversationId,
    ) -> Option<ConversationCacheData> {
        let now = Utc::now();

        if let Some(hit) = self.memory.get(id).await {
            if self.is_valid(&hit, now) {
                return Some(hit);
            }
            self.memory.invalidate(id).await;
        }

        let raw = match self.store.get(&cache_key(id)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(conversation = %id, error = %e, "conversation cache read failed");
                return None;
            }
        };

        let data: ConversationCacheData = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(conversation = %id, error = %e, "conversation cache entry unreadable");
                return None;
            }
        };

        if !self.is_valid(&data, now) {
            tracing::debug!(
                conversation = %id,
                version = data.cache_version,
                "conversation cache entry stale"
            );
            return None;
        }

        self.memory.insert(*id, data.clone()).await;
        Some(data)
    }

    /// Store the snapshot for `id`, replacing any previous one.
    ///
    /// Stamps `cache_version`, and `cached_at` when absent. Returns what was
    /// written.
    ///
    /// # Errors
    /// Returns the store or encoding error; the in-memory front is left
    /// unchanged in that case.
    pub async fn set_cached_conversation_data(
        &self,
        id: &ConversationId,
        mut data: ConversationCacheData,
    ) -> Result<ConversationCacheData, CacheError> {
        data.cache_version = self.version;
        data.cached_at.get_or_insert_with(Utc::now);

        let raw = serde_json::to_string(&data)?;
        self.store.set(&cache_key(id), raw).await?;
        self.memory.insert(*id, data.clone()).await;

        tracing::debug!(conversation = %id, "conversation cache written");
        Ok(data)
    }

    /// Drop the snapshot for `id`
    ///
    /// # Errors
    /// Returns the store error
    pub async fn invalidate(&self, id: &ConversationId) -> Result<(), CacheError> {
        self.memory.invalidate(id).await;
        self.store.remove(&cache_key(id)).await
    }

    fn is_valid(&self, data: &ConversationCacheData, now: DateTime<Utc>) -> bool {
        data.cache_version == self.version
            && data
                .cached_at
                .is_some_and(|cached_at| now.signed_duration_since(cached_at) < self.ttl)
    }
}

fn cache_key(id: &ConversationId) -> String {
    format!("conversation-cache:{id}")
}

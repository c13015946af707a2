//! Key-value storage seam
//!
//! Stands in for browser storage: string keys, string values, no expiry of
//! its own. Readers decide whether an entry is still fresh.

use crate::error::CacheError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt::Debug;

/// Persisted key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Read raw value
    ///
    /// # Errors
    /// Returns `CacheError::Store` if the backend is unavailable
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write raw value, replacing any previous one
    ///
    /// # Errors
    /// Returns `CacheError::Store` if the backend rejects the write
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Delete value; deleting a missing key succeeds
    ///
    /// # Errors
    /// Returns `CacheError::Store` if the backend rejects the delete
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw value, bypassing the async interface
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    /// Write a raw value, bypassing the async interface
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.is_empty());
    }
}

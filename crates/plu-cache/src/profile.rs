//! Per-user profile cache
//!
//! Avatar URL, display name and profile are stored as separate entries
//! wrapped in an envelope carrying the write time. The reader checks expiry
//! and drops stale entries it comes across.

use crate::error::CacheError;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use plu_core::{CacheSettings, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cached user profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

/// One cached entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    AvatarUrl,
    DisplayName,
    Profile,
}

impl ProfileField {
    pub const ALL: [Self; 3] = [Self::AvatarUrl, Self::DisplayName, Self::Profile];

    fn key(self, user: &UserId) -> String {
        let field = match self {
            Self::AvatarUrl => "avatar-url",
            Self::DisplayName => "display-name",
            Self::Profile => "profile",
        };
        format!("profile-cache:{user}:{field}")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    value: T,
    stored_at: DateTime<Utc>,
}

/// Profile cache with reader-side expiry
#[derive(Debug, Clone)]
pub struct ProfileCache {
    store: Arc<dyn KeyValueStore>,
    ttl: chrono::Duration,
}

impl ProfileCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, settings: &CacheSettings) -> Self {
        Self {
            store,
            ttl: chrono::Duration::from_std(settings.profile_ttl())
                .unwrap_or_else(|_| chrono::Duration::days(1)),
        }
    }

    pub async fn get_avatar_url(&self, user: &UserId) -> Option<String> {
        self.read(ProfileField::AvatarUrl, user, Utc::now()).await
    }

    /// # Errors
    /// Returns the store or encoding error
    pub async fn set_avatar_url(&self, user: &UserId, url: &str) -> Result<(), CacheError> {
        self.write(ProfileField::AvatarUrl, user, &url, Utc::now()).await
    }

    pub async fn get_display_name(&self, user: &UserId) -> Option<String> {
        self.read(ProfileField::DisplayName, user, Utc::now()).await
    }

    /// # Errors
    /// Returns the store or encoding error
    pub async fn set_display_name(&self, user: &UserId, name: &str) -> Result<(), CacheError> {
        self.write(ProfileField::DisplayName, user, &name, Utc::now()).await
    }

    pub async fn get_profile(&self, user: &UserId) -> Option<UserProfile> {
        self.read(ProfileField::Profile, user, Utc::now()).await
    }

    /// # Errors
    /// Returns the store or encoding error
    pub async fn set_profile(&self, user: &UserId, profile: &UserProfile) -> Result<(), CacheError> {
        self.write(ProfileField::Profile, user, profile, Utc::now()).await
    }

    /// Remove every entry of `user`
    ///
    /// # Errors
    /// Returns the first store error; remaining entries are still attempted
    pub async fn clear(&self, user: &UserId) -> Result<(), CacheError> {
        let mut first_error = None;
        for field in ProfileField::ALL {
            if let Err(e) = self.store.remove(&field.key(user)).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn read<T: DeserializeOwned>(
        &self,
        field: ProfileField,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let key = field.key(user);
        let raw = match self.store.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(user = %user, ?field, error = %e, "profile cache read failed");
                return None;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(user = %user, ?field, error = %e, "profile cache entry unreadable");
                return None;
            }
        };

        if now.signed_duration_since(envelope.stored_at) >= self.ttl {
            if let Err(e) = self.store.remove(&key).await {
                tracing::debug!(user = %user, ?field, error = %e, "stale profile entry not removed");
            }
            return None;
        }
        Some(envelope.value)
    }

    async fn write<T: Serialize + ?Sized>(
        &self,
        field: ProfileField,
        user: &UserId,
        value: &T,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(&Envelope {
            value,
            stored_at: now,
        })?;
        self.store.set(&field.key(user), raw).await
    }
}

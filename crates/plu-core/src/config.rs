//! Assistant configuration
//!
//! Every field has a default; a TOML file only needs the keys it overrides.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssistantConfig {
    /// Stepwise loading dwell times
    pub sequencer: SequencerTimings,
    /// First-load artifact preparation timers
    pub first_load: FirstLoadTimings,
    /// Cache settings
    pub cache: CacheSettings,
}

impl AssistantConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `CoreError::Config` on malformed input or unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns `CoreError::Io` if the file cannot be read
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::io_error(path, e))?;
        Self::from_toml_str(&text)
    }

    /// With sequencer timings
    #[inline]
    #[must_use]
    pub fn with_sequencer(mut self, sequencer: SequencerTimings) -> Self {
        self.sequencer = sequencer;
        self
    }

    /// With first-load timings
    #[inline]
    #[must_use]
    pub fn with_first_load(mut self, first_load: FirstLoadTimings) -> Self {
        self.first_load = first_load;
        self
    }

    /// With cache settings
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }
}

/// Minimum dwell per loading step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequencerTimings {
    /// Dwell on the zone check before the branch-specific step
    pub zone_check_dwell_ms: u64,
    /// Dwell on the analysis check before fetching the analysis
    pub analysis_check_dwell_ms: u64,
}

impl SequencerTimings {
    #[inline]
    #[must_use]
    pub fn zone_check_dwell(&self) -> Duration {
        Duration::from_millis(self.zone_check_dwell_ms)
    }

    #[inline]
    #[must_use]
    pub fn analysis_check_dwell(&self) -> Duration {
        Duration::from_millis(self.analysis_check_dwell_ms)
    }
}

impl Default for SequencerTimings {
    fn default() -> Self {
        Self {
            zone_check_dwell_ms: 2_000,
            analysis_check_dwell_ms: 2_000,
        }
    }
}

/// Timers used when reopening a conversation that already has documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FirstLoadTimings {
    pub document_ready_ms: u64,
    pub map_ready_ms: u64,
}

impl FirstLoadTimings {
    #[inline]
    #[must_use]
    pub fn document_ready(&self) -> Duration {
        Duration::from_millis(self.document_ready_ms)
    }

    #[inline]
    #[must_use]
    pub fn map_ready(&self) -> Duration {
        Duration::from_millis(self.map_ready_ms)
    }
}

impl Default for FirstLoadTimings {
    fn default() -> Self {
        Self {
            document_ready_ms: 1_500,
            map_ready_ms: 3_000,
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Schema tag; entries with another version are misses
    pub cache_version: u32,
    pub conversation_ttl_secs: u64,
    pub profile_ttl_secs: u64,
    /// In-memory entry limit
    pub max_capacity: u64,
}

impl CacheSettings {
    #[inline]
    #[must_use]
    pub fn conversation_ttl(&self) -> Duration {
        Duration::from_secs(self.conversation_ttl_secs)
    }

    #[inline]
    #[must_use]
    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_version: 1,
            conversation_ttl_secs: 24 * 60 * 60,
            profile_ttl_secs: 24 * 60 * 60,
            max_capacity: 10_000,
        }
    }
}

//! PLU Assistant Caches
//!
//! Client-side snapshots that let a revisited conversation skip the loading
//! sequence, and short-lived profile entries keyed by user.
//!
//! # Architecture
//!
//! ```text
//! ConversationCache ──┬── moka (in-memory, TTL)
//!                     └── KeyValueStore (persisted JSON)
//! ProfileCache ────────── KeyValueStore (persisted JSON envelopes)
//! ```
//!
//! Reads never fail: any store or parse problem is logged and reported as a
//! miss. Writes surface their errors.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod conversation;
pub mod error;
pub mod profile;
pub mod store;

pub use conversation::{ConversationCache, ConversationCacheData};
pub use error::CacheError;
pub use profile::{ProfileCache, ProfileField, UserProfile};
pub use store::{KeyValueStore, MemoryStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

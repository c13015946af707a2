//! PLU Assistant Artifact Store
//!
//! Keeps the three side-panel artifacts (zone, map, document) of every open
//! conversation, plus the selected panel tab.
//!
//! # Core Concepts
//!
//! - [`ArtifactStore`]: process-wide repository keyed by conversation id
//! - [`ArtifactState<T>`]: status, payload and timestamp of one artifact
//! - [`ArtifactUpdate<T>`]: partial update merged field by field
//! - [`ArtifactPayload`]: sealed trait tying a payload type to its slot
//!
//! # Example
//!
//! ```rust,ignore
//! use plu_artifact::{ArtifactStore, ArtifactUpdate, ZoneData};
//!
//! let store = ArtifactStore::new();
//! let outcome = store.update_artifact::<ZoneData>(&id, ArtifactUpdate::ready(zone));
//! assert!(outcome.is_applied());
//!
//! // Same status, same data: nothing happens
//! let outcome = store.update_artifact::<ZoneData>(&id, ArtifactUpdate::ready(zone));
//! assert!(!outcome.is_applied());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod kind;
mod payload;
mod state;
mod store;

pub use kind::{ArtifactKind, ArtifactStatus, PanelTab};
pub use payload::{ArtifactPayload, DocumentData, MapData, ZoneData};
pub use state::{ArtifactState, ArtifactUpdate};
pub use store::{ArtifactEvent, ArtifactStore, ConversationArtifacts, UpdateOutcome};

/// Sealed trait support
#[doc(hidden)]
pub mod __private {
    pub use super::payload::private::Sealed;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

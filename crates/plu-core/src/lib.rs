//! PLU Assistant Core
//!
//! Pure building blocks shared by every other crate of the workspace.
//!
//! # Core Concepts
//!
//! - [`ConversationBranch`]: the three terminal classifications of a conversation
//! - [`StoredBranch`]: the persisted column, which also carries the transient `pending` value
//! - [`BranchInputs`]: tri-state flags gating classification until it is certain
//! - [`geometry`]: GeoJSON `[lon, lat]` to display `[lat, lon]` conversion
//! - [`metadata`]: persisted document metadata, branch badges and duplicate hints
//! - [`AssistantConfig`]: timings and cache settings
//!
//! # Example
//!
//! ```rust,ignore
//! use plu_core::{BranchInputs, ConversationBranch};
//!
//! let inputs = BranchInputs::unknown().with_is_rnu(false);
//! assert_eq!(inputs.resolve(), None);
//!
//! let inputs = inputs.with_has_analysis(true);
//! assert_eq!(inputs.resolve(), Some(ConversationBranch::NonRnuAnalysis));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod branch;
pub mod config;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod metadata;

pub use branch::{determine_conversation_branch, BranchInputs, ConversationBranch, StoredBranch};
pub use config::{AssistantConfig, CacheSettings, FirstLoadTimings, SequencerTimings};
pub use error::CoreError;
pub use geometry::{build_bounds_from_polygons, geometry_to_display_polygons, LatLon, Ring};
pub use ids::{ConversationId, UserId};
pub use metadata::{
    build_document_metadata_payload, build_duplicate_hint_message, format_branch_badge,
    format_relative_fr, DocumentMetadataInput, DocumentMetadataPayload, DuplicateHint,
    DuplicateHintInput,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! PLU Assistant Enrichment
//!
//! Tracks the async sub-fetches that enrich an address and chooses the
//! loading caption shown while they run.
//!
//! # Core Concepts
//!
//! - [`EnrichmentProgress`]: per-stage status with a monotonic transition table
//! - [`EnrichmentTracker`]: launches stage fetches, folds results, exposes retry
//! - [`LoadingSequencer`]: dwell- and branch-gated loading steps
//! - [`ViewScope`]: cancellation scope owning every timer and task of a view
//! - [`spawn_first_load`]: document/map readiness timers for reopened conversations
//!
//! # Example
//!
//! ```rust,ignore
//! use plu_enrichment::{spawn_sequencer, EnrichmentTracker, ViewScope};
//!
//! let scope = ViewScope::new();
//! let tracker = EnrichmentTracker::new(request, fetcher, scope.clone());
//! tracker.start()?;
//!
//! let mut steps = spawn_sequencer(&scope, timings, tracker.subscribe());
//! while steps.changed().await.is_ok() {
//!     println!("{}", *steps.borrow());
//! }
//!
//! // Navigation away
//! scope.cancel();
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod data;
pub mod error;
pub mod first_load;
pub mod progress;
pub mod scope;
pub mod sequencer;
pub mod stage;
pub mod tracker;

pub use data::EnrichmentData;
pub use error::{EnrichmentError, FetchError};
pub use first_load::{spawn_first_load, ArtifactReadiness};
pub use progress::{EnrichmentProgress, EnrichmentStatus};
pub use scope::{TimerHandle, ViewScope};
pub use sequencer::{spawn_sequencer, LoadingSequencer, LoadingStep};
pub use stage::{allowed_transitions, required_stages, validate_transition, EnrichmentStage, StageStatus};
pub use tracker::{EnrichmentRequest, EnrichmentSnapshot, EnrichmentTracker, StageFetcher};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

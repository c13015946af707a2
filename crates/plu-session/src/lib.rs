//! PLU Assistant Session
//!
//! Ties enrichment, artifacts, caching and persistence together for one
//! open conversation.
//!
//! # Core Concepts
//!
//! - [`ConversationOrchestrator`]: opens new or existing conversations
//! - [`SessionHandle`]: the mounted view; dropping it tears everything down
//! - [`SessionView`]: loading caption or terminal branch UI
//! - [`ConversationBackend`]: row store the session reads and writes
//! - [`run_simulation`]: scripted end-to-end run used by the CLI
//!
//! # Example
//!
//! ```rust,ignore
//! use plu_session::{ConversationOrchestrator, SessionEnvironment};
//!
//! let orchestrator = ConversationOrchestrator::new(SessionEnvironment::in_memory(config, fetcher));
//! let session = orchestrator.start_conversation("1 place Bellecour, Lyon").await?;
//!
//! let mut views = session.subscribe_view();
//! while views.changed().await.is_ok() {
//!     if let Some(caption) = views.borrow().caption() {
//!         println!("{caption}");
//!     }
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod persistence;
pub mod session;
pub mod simulator;

pub use error::SessionError;
pub use persistence::{
    BranchResolution, ContextMetadata, ConversationBackend, ConversationRecord, InMemoryBackend,
    PanelState, PersistedEnrichmentStatus,
};
pub use session::{
    ConversationOrchestrator, SessionEnvironment, SessionEvent, SessionHandle, SessionView,
};
pub use simulator::{run_simulation, ScriptedFetcher, SimulationReport, StageScript, Transition};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

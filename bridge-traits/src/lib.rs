//! # Host Bridge Traits
//!
//! Capability contracts the playback core requires from its host.
//!
//! ## Overview
//!
//! The core never decodes audio or scrapes remote pages itself. Both jobs are
//! delegated to host-provided implementations of the traits below, which keeps
//! the orchestration logic testable with in-memory fakes.
//!
//! ## Traits
//!
//! ### Playback
//! - [`PlaybackEngine`](engine::PlaybackEngine) - Queue, transport and timeline
//!   of the platform media player
//! - [`EngineListener`](engine::EngineListener) - Batched engine event callback
//!
//! ### Content
//! - [`ContentResolver`](content::ContentResolver) - Turns page URIs and search
//!   queries into stream metadata
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! let resolver = config.content_resolver
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "ContentResolver".to_string(),
//!         message: "No content resolver provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind an `Arc`.

pub mod content;
pub mod engine;
pub mod error;
pub mod time;

pub use error::BridgeError;

pub use content::{
    AudioStream, ContentResolver, InfoType, ResolverOptions, SearchResult, StreamInfo,
};
pub use engine::{
    EngineEvent, EngineEvents, EngineListener, EngineState, MediaItem, MediaMetadata,
    PlaybackEngine,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};

//! # Event Bus System
//!
//! Typed notifications between the playback session, the library cache and
//! whoever hosts them, carried over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────┐  emit   ┌──────────┐  subscribe  ┌────────────┐
//! │ PlaybackSession ├────────>│          ├────────────>│ Host / UI  │
//! └─────────────────┘         │ EventBus │             └────────────┘
//! ┌─────────────────┐  emit   │          │  subscribe  ┌────────────┐
//! │ CachingRepo     ├────────>│          ├────────────>│ Tests      │
//! └─────────────────┘         └──────────┘             └────────────┘
//! ```
//!
//! Events are notifications, not state. The authoritative playback state
//! lives in the playback state store; events describe what the core did
//! (commands accepted, resolutions that failed, songs cached).
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::SeekRequested { position_ms: 1_000 }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Seek requested");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal; keep receiving.
//! - **`RecvError::Closed`**: every sender was dropped. Treat as shutdown.
//!
//! Emitting with no subscribers returns an error that emitters ignore.

use serde::{Deserialize, Serialize};
use std::fmt;

use core_async::sync::broadcast;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::EngineError { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::ResolutionFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::CommandIgnored { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::QueueReplaced { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::ItemsEnqueued { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A custom command passed validation and was dispatched.
    CommandAccepted {
        /// Protocol action name (e.g., "load_stream_uri").
        command: String,
    },
    /// A command was valid but had nothing to do.
    CommandIgnored {
        command: String,
        reason: String,
    },
    /// The engine queue was replaced by a load command.
    QueueReplaced {
        /// Reference the load command was issued for.
        source_uri: String,
        /// Items handed to the engine.
        item_count: usize,
        /// Items skipped because they failed to resolve.
        failed_count: usize,
    },
    /// Items were inserted into the engine queue.
    ItemsEnqueued {
        source_uri: String,
        item_count: usize,
        failed_count: usize,
        /// Insert position, `None` when appended.
        index: Option<usize>,
    },
    /// A reference could not be turned into a playable item.
    ResolutionFailed {
        uri: String,
        message: String,
    },
    /// A load finished after a newer load was accepted and was dropped.
    LoadSuperseded {
        uri: String,
    },
    /// A seek was forwarded to the engine.
    SeekRequested {
        position_ms: u64,
    },
    /// The engine reported a fatal error.
    EngineError {
        message: String,
    },
    /// The session stopped and released the engine.
    SessionReleased,
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::CommandAccepted { .. } => "Command accepted",
            PlaybackEvent::CommandIgnored { .. } => "Command ignored",
            PlaybackEvent::QueueReplaced { .. } => "Queue replaced",
            PlaybackEvent::ItemsEnqueued { .. } => "Items enqueued",
            PlaybackEvent::ResolutionFailed { .. } => "Resolution failed",
            PlaybackEvent::LoadSuperseded { .. } => "Load superseded by a newer load",
            PlaybackEvent::SeekRequested { .. } => "Seek requested",
            PlaybackEvent::EngineError { .. } => "Playback engine error",
            PlaybackEvent::SessionReleased => "Playback session released",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events emitted by the local cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A resolved item was written to the song table.
    SongCached {
        song_id: String,
        title: String,
    },
    /// A song was associated with a playlist for the first time.
    SongLinked {
        playlist_id: String,
        song_id: String,
    },
    /// A local playlist was created.
    PlaylistCreated {
        playlist_id: String,
        name: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::SongCached { .. } => "Song cached",
            LibraryEvent::SongLinked { .. } => "Song added to playlist",
            LibraryEvent::PlaylistCreated { .. } => "Playlist created",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// subscriber starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

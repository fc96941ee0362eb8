//! Playback engine contract.
//!
//! The engine is the host's media player: it owns decoding, rendering, the
//! media-item queue and the timeline. The core drives it through
//! [`PlaybackEngine`] and observes it through a single [`EngineListener`]
//! that receives batched [`EngineEvents`].
//!
//! All mutating calls are issued from one control context owned by the
//! playback session. Read accessors may be called from any thread and must
//! return the engine's live values.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Coarse engine state, mirroring the lifecycle of common media players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// No media prepared, or playback was stopped.
    Idle,
    /// Waiting for data before playback can make progress.
    Buffering,
    /// Able to play immediately from the current position.
    Ready,
    /// Reached the end of the queue.
    Ended,
}

impl EngineState {
    /// Idle and ended are terminal: nothing will advance the position.
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Idle | EngineState::Ended)
    }
}

/// Display metadata attached to a queued media item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artwork_uri: Option<String>,
    pub duration_ms: Option<u64>,
}

/// Engine-native media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable identifier, usually the page URI the item was resolved from.
    pub media_id: String,
    /// Playable location handed to the decoder.
    pub uri: Option<String>,
    pub metadata: MediaMetadata,
}

impl MediaItem {
    pub fn new(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            uri: None,
            metadata: MediaMetadata::default(),
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Kinds of change an engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineEvent {
    PlaybackStateChanged,
    IsPlayingChanged,
    PlayWhenReadyChanged,
    MediaItemTransition,
    TimelineChanged,
    PositionDiscontinuity,
    PlayerError,
}

/// A batch of engine events that happened together.
///
/// Order inside the batch carries no meaning; consumers re-read the engine's
/// current state rather than interpreting individual events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvents {
    events: Vec<EngineEvent>,
}

impl EngineEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event kind, ignoring duplicates.
    pub fn with(mut self, event: EngineEvent) -> Self {
        self.insert(event);
        self
    }

    pub fn insert(&mut self, event: EngineEvent) {
        if !self.events.contains(&event) {
            self.events.push(event);
        }
    }

    pub fn contains(&self, event: EngineEvent) -> bool {
        self.events.contains(&event)
    }

    pub fn contains_any(&self, events: &[EngineEvent]) -> bool {
        events.iter().any(|event| self.contains(*event))
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EngineEvent> + '_ {
        self.events.iter().copied()
    }
}

impl FromIterator<EngineEvent> for EngineEvents {
    fn from_iter<I: IntoIterator<Item = EngineEvent>>(iter: I) -> Self {
        let mut events = EngineEvents::new();
        for event in iter {
            events.insert(event);
        }
        events
    }
}

/// Receiver of engine event batches.
///
/// Called on whatever thread the engine reports from. Implementations must
/// return quickly and must not call back into mutating engine methods.
pub trait EngineListener: Send + Sync {
    fn on_events(&self, events: EngineEvents);
}

/// Host media player driven by the playback session.
pub trait PlaybackEngine: Send + Sync {
    /// Install (or clear) the single listener receiving event batches.
    fn set_listener(&self, listener: Option<Arc<dyn EngineListener>>);

    // ------------------------------------------------------------------
    // Queue mutation
    // ------------------------------------------------------------------

    /// Replace the whole queue and reset the position to the first item.
    fn set_media_items(&self, items: Vec<MediaItem>);

    /// Insert items at `index`, or append when `index` is `None`.
    fn add_media_items(&self, index: Option<usize>, items: Vec<MediaItem>);

    fn clear_media_items(&self);

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    fn prepare(&self);
    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    fn seek_to(&self, position_ms: u64);
    fn seek_to_next(&self);
    fn seek_to_previous(&self);

    /// Jump to the start of the queue item at `index`. Callers guarantee the
    /// index is in range.
    fn seek_to_item(&self, index: usize);

    /// Free native resources. The engine is unusable afterwards.
    fn release(&self);

    // ------------------------------------------------------------------
    // Live state
    // ------------------------------------------------------------------

    fn media_items(&self) -> Vec<MediaItem>;

    fn media_item_count(&self) -> usize {
        self.media_items().len()
    }

    /// Index of the current item, `None` when the queue is empty.
    fn current_index(&self) -> Option<usize>;

    fn current_media_item(&self) -> Option<MediaItem> {
        let index = self.current_index()?;
        self.media_items().into_iter().nth(index)
    }

    fn position_ms(&self) -> u64;

    /// Duration of the current item, `None` while unknown.
    fn duration_ms(&self) -> Option<u64>;

    fn playback_state(&self) -> EngineState;
    fn play_when_ready(&self) -> bool;
    fn is_playing(&self) -> bool;

    /// Message of the last fatal engine error, cleared by a new prepare.
    fn player_error(&self) -> Option<String>;
}

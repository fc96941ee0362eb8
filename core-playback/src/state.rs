//! # Playback State Store
//!
//! The single UI-facing view of playback. The bridge is its only writer;
//! every update replaces the whole [`PlaybackSnapshot`], so a reader never
//! sees fields from two different engine states.

use crate::controller::PlayerView;
use crate::item::PlayableItem;
use bridge_traits::engine::EngineState;
use core_async::sync::watch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackPhase {
    #[default]
    Initial,
    Loading,
    Playing,
    Paused,
    Stopped,
    Error,
}

/// Project the engine's condition onto a UI phase. An error wins over any
/// engine state.
pub fn project_phase(
    state: EngineState,
    play_when_ready: bool,
    has_error: bool,
    queue_is_empty: bool,
) -> PlaybackPhase {
    if has_error {
        return PlaybackPhase::Error;
    }
    match state {
        EngineState::Buffering => PlaybackPhase::Loading,
        EngineState::Ended => PlaybackPhase::Stopped,
        EngineState::Idle if queue_is_empty => PlaybackPhase::Initial,
        EngineState::Idle => PlaybackPhase::Stopped,
        EngineState::Ready if play_when_ready => PlaybackPhase::Playing,
        EngineState::Ready => PlaybackPhase::Paused,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    pub current_item: Option<PlayableItem>,
    /// Index into `queue`; `None` when the queue is empty.
    pub current_index: Option<usize>,
    pub queue: Vec<PlayableItem>,
    pub position_ms: u64,
    /// Zero while the engine does not know the duration.
    pub duration_ms: u64,
    pub error_message: Option<String>,
}

impl PlaybackSnapshot {
    /// Full projection of the engine's current observable state.
    pub fn from_player(player: &PlayerView) -> Self {
        let queue: Vec<PlayableItem> = player
            .media_items()
            .iter()
            .map(PlayableItem::from_media_item)
            .collect();
        let current_index = player.current_index().filter(|index| *index < queue.len());
        let current_item = current_index.and_then(|index| queue.get(index).cloned());
        let error_message = player.player_error();
        let phase = project_phase(
            player.playback_state(),
            player.play_when_ready(),
            error_message.is_some(),
            queue.is_empty(),
        );

        Self {
            phase,
            current_item,
            current_index,
            queue,
            position_ms: player.position_ms(),
            duration_ms: player.duration_ms().unwrap_or(0),
            error_message,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }
}

/// Single-writer, multi-reader holder of the current [`PlaybackSnapshot`].
#[derive(Clone)]
pub struct PlaybackStateStore {
    sender: Arc<watch::Sender<PlaybackSnapshot>>,
}

impl PlaybackStateStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(PlaybackSnapshot::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Current snapshot (cloned).
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.sender.borrow().clone()
    }

    /// Receiver that observes every replacement.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.sender.subscribe()
    }

    pub fn replace(&self, snapshot: PlaybackSnapshot) {
        self.sender.send_replace(snapshot);
    }

    /// Refresh the timeline fields only. Observers are not woken when
    /// nothing changed.
    pub fn update_position(&self, position_ms: u64, duration_ms: u64) {
        self.sender.send_if_modified(|snapshot| {
            if snapshot.position_ms == position_ms && snapshot.duration_ms == duration_ms {
                return false;
            }
            snapshot.position_ms = position_ms;
            snapshot.duration_ms = duration_ms;
            true
        });
    }
}

impl Default for PlaybackStateStore {
    fn default() -> Self {
        Self::new()
    }
}

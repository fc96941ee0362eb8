//! Controller side of a playback session.
//!
//! A [`SessionController`] is what a connected client holds: the capability
//! set it was admitted with, a read-only [`PlayerView`] of the engine, and
//! the command surface. It never mutates the engine directly.

use crate::command::{
    CustomCommand, PlayerCmd, ResultCode, SessionCommand, SessionCommands, SessionResult,
    TransportCommand,
};
use crate::session::ControlMessage;
use bridge_traits::engine::{EngineEvent, EngineEvents, EngineState, MediaItem, PlaybackEngine};
use core_async::sync::broadcast::error::RecvError;
use core_async::sync::{broadcast, mpsc, oneshot, CancellationToken};
use core_async::task::JoinHandle;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Read-only access to the engine's live state.
///
/// Every call reads the engine at that moment; nothing is cached.
#[derive(Clone)]
pub struct PlayerView {
    engine: Arc<dyn PlaybackEngine>,
}

impl PlayerView {
    pub(crate) fn new(engine: Arc<dyn PlaybackEngine>) -> Self {
        Self { engine }
    }

    pub fn media_items(&self) -> Vec<MediaItem> {
        self.engine.media_items()
    }

    pub fn media_item_count(&self) -> usize {
        self.engine.media_item_count()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.engine.current_index()
    }

    pub fn current_media_item(&self) -> Option<MediaItem> {
        self.engine.current_media_item()
    }

    pub fn position_ms(&self) -> u64 {
        self.engine.position_ms()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.engine.duration_ms()
    }

    pub fn playback_state(&self) -> EngineState {
        self.engine.playback_state()
    }

    pub fn play_when_ready(&self) -> bool {
        self.engine.play_when_ready()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn player_error(&self) -> Option<String> {
        self.engine.player_error()
    }
}

/// Observer of engine event batches, registered through
/// [`SessionController::add_listener`].
///
/// A panic inside `on_events` is caught and logged; it never reaches the
/// session.
pub trait PlayerListener: Send + Sync {
    fn on_events(&self, player: &PlayerView, events: &EngineEvents);
}

/// Batch standing in for events lost while a listener lagged behind.
fn resync_batch() -> EngineEvents {
    [
        EngineEvent::PlaybackStateChanged,
        EngineEvent::IsPlayingChanged,
        EngineEvent::PlayWhenReadyChanged,
        EngineEvent::MediaItemTransition,
        EngineEvent::TimelineChanged,
    ]
    .into_iter()
    .collect()
}

pub struct SessionController {
    commands: SessionCommands,
    player: PlayerView,
    control: mpsc::UnboundedSender<ControlMessage>,
    engine_events: broadcast::Sender<EngineEvents>,
    token: CancellationToken,
}

impl SessionController {
    pub(crate) fn new(
        commands: SessionCommands,
        player: PlayerView,
        control: mpsc::UnboundedSender<ControlMessage>,
        engine_events: broadcast::Sender<EngineEvents>,
        token: CancellationToken,
    ) -> Self {
        Self {
            commands,
            player,
            control,
            engine_events,
            token,
        }
    }

    pub fn available_commands(&self) -> &SessionCommands {
        &self.commands
    }

    pub fn player(&self) -> &PlayerView {
        &self.player
    }

    pub fn is_released(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Send a custom command and wait for the session to accept or reject
    /// it. Acceptance does not wait for content resolution.
    pub async fn send_custom(&self, command: CustomCommand) -> SessionResult {
        if self.is_released() {
            return SessionResult::Error(ResultCode::Disconnected);
        }
        if !self.commands.supports_custom(&command.action) {
            warn!(action = %command.action, "Command not in capability set");
            return SessionResult::Error(ResultCode::UnknownCommand);
        }

        let (reply, response) = oneshot::channel();
        let message = ControlMessage::Custom {
            command,
            origin: self.token.clone(),
            reply,
        };
        if self.control.send(message).is_err() {
            return SessionResult::Error(ResultCode::Disconnected);
        }
        response
            .await
            .unwrap_or(SessionResult::Error(ResultCode::Disconnected))
    }

    pub async fn send_command(&self, command: SessionCommand) -> SessionResult {
        self.send_custom(command.into()).await
    }

    pub fn transport(&self, command: TransportCommand) -> SessionResult {
        if self.is_released() {
            return SessionResult::Error(ResultCode::Disconnected);
        }
        if !self.commands.supports_transport(command) {
            return SessionResult::Error(ResultCode::NotSupported);
        }
        if let TransportCommand::SkipTo(index) = command {
            let count = self.player.media_item_count();
            if index >= count {
                warn!(index, count, "Queue index out of range");
                return SessionResult::Error(ResultCode::BadValue);
            }
        }
        match self.control.send(ControlMessage::Transport(command)) {
            Ok(()) => SessionResult::Success,
            Err(_) => SessionResult::Error(ResultCode::Disconnected),
        }
    }

    /// Run a numeric player command. `position_ms` is only read by
    /// [`PlayerCmd::SeekTo`]; `Unset` succeeds without doing anything.
    pub fn player_command(&self, command: PlayerCmd, position_ms: Option<i64>) -> SessionResult {
        match command.to_transport(position_ms) {
            Ok(Some(transport)) => self.transport(transport),
            Ok(None) => {
                debug!("Unset player command");
                SessionResult::Success
            }
            Err(e) => {
                warn!(%command, error = %e, "Rejecting player command");
                SessionResult::from(&e)
            }
        }
    }

    pub async fn load_stream(&self, uri: &str, play_when_ready: bool) -> SessionResult {
        self.send_command(SessionCommand::LoadStream {
            uri: uri.to_string(),
            play_when_ready,
        })
        .await
    }

    pub async fn load_playlist(&self, uri: &str, play_when_ready: bool) -> SessionResult {
        self.send_command(SessionCommand::LoadPlaylist {
            uri: uri.to_string(),
            play_when_ready,
        })
        .await
    }

    pub async fn enqueue(&self, uri: &str) -> SessionResult {
        self.send_command(SessionCommand::Enqueue {
            uri: uri.to_string(),
        })
        .await
    }

    pub async fn enqueue_next(&self, uri: &str) -> SessionResult {
        self.send_command(SessionCommand::EnqueueNext {
            uri: uri.to_string(),
        })
        .await
    }

    pub async fn enqueue_playlist(&self, uri: &str) -> SessionResult {
        self.send_command(SessionCommand::EnqueuePlaylist {
            uri: uri.to_string(),
        })
        .await
    }

    pub async fn start_radio(&self, seed_uri: &str) -> SessionResult {
        self.send_command(SessionCommand::StartRadio {
            seed_uri: seed_uri.to_string(),
        })
        .await
    }

    pub async fn seek_to_percentage(&self, value: f64) -> SessionResult {
        self.send_command(SessionCommand::SeekToPercentage { value })
            .await
    }

    /// Deliver every engine event batch to `listener` until this controller
    /// is released.
    pub fn add_listener(&self, listener: Arc<dyn PlayerListener>) -> JoinHandle<()> {
        let mut receiver = self.engine_events.subscribe();
        let player = self.player.clone();
        let token = self.token.clone();

        core_async::spawn(async move {
            loop {
                let events = core_async::select! {
                    biased;
                    _ = token.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(events) => events,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Player listener lagged, resynchronising");
                            resync_batch()
                        }
                        Err(RecvError::Closed) => break,
                    },
                };

                let delivered = catch_unwind(AssertUnwindSafe(|| {
                    listener.on_events(&player, &events);
                }));
                if delivered.is_err() {
                    error!("Player listener panicked");
                }
            }
            debug!("Player listener detached");
        })
    }

    /// Disconnect. Resolutions issued through this controller that have not
    /// been applied yet are discarded.
    pub fn release(&self) {
        if !self.token.is_cancelled() {
            debug!("Controller released");
            self.token.cancel();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.release();
    }
}

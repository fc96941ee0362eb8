//! # Playback Session
//!
//! The session is the only component that mutates the [`PlaybackEngine`].
//! All mutation happens on one control task:
//!
//! ```text
//!  controllers ──custom/transport──┐
//!                                  v
//!  engine listener ──events──> [control task] ──mutations──> engine
//!                                  ^      │
//!          resolution tasks ──apply┘      └──spawn──> resolution tasks
//! ```
//!
//! Accepting a command never waits on I/O: loads and enqueues spawn a
//! resolution task and reply at once. The task posts its outcome back to the
//! control task, which applies it unless the issuing controller (or the
//! session) was released in the meantime.
//!
//! Load commands are ordered by a generation counter. A load result is only
//! applied if no newer load was accepted after it; otherwise it is dropped
//! and a `LoadSuperseded` event is emitted. Enqueue results are applied in
//! completion order.

use crate::command::{
    CustomCommand, ResultCode, SessionCommand, SessionCommands, SessionResult, StartupIntent,
    TransportCommand,
};
use crate::config::SessionConfig;
use crate::controller::{PlayerView, SessionController};
use crate::error::{PlaybackError, Result};
use crate::item::ItemResult;
use crate::repository::{radio_seed_id, MusicRepository};
use bridge_traits::engine::{
    EngineEvent, EngineEvents, EngineListener, EngineState, MediaItem, PlaybackEngine,
};
use core_async::sync::{broadcast, mpsc, oneshot, CancellationToken};
use core_async::task::JoinHandle;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::redact_stream_url;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Capacity of the engine event fan-out to controllers.
const ENGINE_EVENT_CAPACITY: usize = 64;

pub(crate) enum ControlMessage {
    Custom {
        command: CustomCommand,
        origin: CancellationToken,
        reply: oneshot::Sender<SessionResult>,
    },
    Transport(TransportCommand),
    Apply(Mutation),
    Engine(EngineEvents),
}

pub(crate) struct Mutation {
    /// Cancelled when the issuer went away; the mutation is then dropped.
    origin: CancellationToken,
    source_uri: String,
    kind: MutationKind,
}

enum MutationKind {
    Replace {
        generation: u64,
        results: Vec<ItemResult>,
        play_when_ready: bool,
        /// A single-stream load leaves the engine untouched on failure; a
        /// playlist load clears the queue.
        single: bool,
    },
    Enqueue {
        placement: Placement,
        results: Vec<ItemResult>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    End,
    AfterCurrent,
}

/// Handle on a running playback session. Cheap to clone.
#[derive(Clone)]
pub struct PlaybackSession {
    shared: Arc<SessionShared>,
}

struct SessionShared {
    engine: Arc<dyn PlaybackEngine>,
    control: mpsc::UnboundedSender<ControlMessage>,
    engine_events: broadcast::Sender<EngineEvents>,
    commands: SessionCommands,
    config: SessionConfig,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackSession {
    /// Take ownership of `engine` and spawn the control task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        engine: Arc<dyn PlaybackEngine>,
        repository: Arc<dyn MusicRepository>,
        events: EventBus,
        config: SessionConfig,
    ) -> Self {
        let (control, receiver) = mpsc::unbounded_channel();
        let (engine_events, _) = broadcast::channel(ENGINE_EVENT_CAPACITY);
        let token = CancellationToken::new();
        let commands = SessionCommands::session_defaults();

        engine.set_listener(Some(Arc::new(SessionEngineListener {
            control: control.clone(),
        })));

        let control_loop = ControlLoop {
            engine: engine.clone(),
            repository,
            events,
            control: control.clone(),
            engine_events: engine_events.clone(),
            commands: commands.clone(),
            token: token.clone(),
            load_generation: 0,
        };
        let task = core_async::spawn(control_loop.run(receiver));

        info!("Playback session started");

        Self {
            shared: Arc::new(SessionShared {
                engine,
                control,
                engine_events,
                commands,
                config,
                token,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    /// Admit a controller.
    ///
    /// # Errors
    /// `SessionReleased` once [`PlaybackSession::release`] was called.
    pub fn connect(&self) -> Result<SessionController> {
        if self.is_released() {
            return Err(PlaybackError::SessionReleased);
        }
        debug!("Controller connected");
        Ok(SessionController::new(
            self.shared.commands.clone(),
            self.player(),
            self.shared.control.clone(),
            self.shared.engine_events.clone(),
            self.shared.token.child_token(),
        ))
    }

    /// Issue a command on behalf of the session host itself.
    pub async fn dispatch(&self, command: SessionCommand) -> SessionResult {
        let (reply, response) = oneshot::channel();
        let message = ControlMessage::Custom {
            command: command.into(),
            origin: self.shared.token.clone(),
            reply,
        };
        if self.shared.control.send(message).is_err() {
            return SessionResult::Error(ResultCode::Disconnected);
        }
        response
            .await
            .unwrap_or(SessionResult::Error(ResultCode::Disconnected))
    }

    /// Translate a launch intent into its initial load, if any.
    pub async fn handle_startup_intent(&self, intent: &StartupIntent) -> Option<SessionResult> {
        let command = intent.to_command()?;
        info!(action = command.action(), "Handling startup intent");
        Some(self.dispatch(command).await)
    }

    pub fn player(&self) -> PlayerView {
        PlayerView::new(self.shared.engine.clone())
    }

    pub fn commands(&self) -> &SessionCommands {
        &self.shared.commands
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn is_released(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// Cancel every outstanding resolution, disconnect all controllers and
    /// release the engine. Waits for the control task to finish.
    pub async fn release(&self) {
        self.shared.token.cancel();
        let task = self.shared.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Control task ended abnormally");
            }
        }
    }
}

/// Engine callback. Forwards batches to the control task and never blocks.
struct SessionEngineListener {
    control: mpsc::UnboundedSender<ControlMessage>,
}

impl EngineListener for SessionEngineListener {
    fn on_events(&self, events: EngineEvents) {
        let _ = self.control.send(ControlMessage::Engine(events));
    }
}

struct ControlLoop {
    engine: Arc<dyn PlaybackEngine>,
    repository: Arc<dyn MusicRepository>,
    events: EventBus,
    control: mpsc::UnboundedSender<ControlMessage>,
    engine_events: broadcast::Sender<EngineEvents>,
    commands: SessionCommands,
    token: CancellationToken,
    load_generation: u64,
}

impl ControlLoop {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<ControlMessage>) {
        loop {
            core_async::select! {
                biased;
                _ = self.token.cancelled() => break,
                message = receiver.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
            }
        }
        self.shutdown();
    }

    fn handle(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Custom {
                command,
                origin,
                reply,
            } => {
                let result = self.accept(&command, &origin);
                let _ = reply.send(result);
            }
            ControlMessage::Transport(command) => self.transport(command),
            ControlMessage::Apply(mutation) => self.apply(mutation),
            ControlMessage::Engine(events) => self.on_engine_events(events),
        }
    }

    fn accept(&mut self, command: &CustomCommand, origin: &CancellationToken) -> SessionResult {
        if !self.commands.supports_custom(&command.action) {
            warn!(action = %command.action, "Rejecting unknown command");
            return SessionResult::Error(ResultCode::UnknownCommand);
        }

        let parsed = match SessionCommand::try_from(command) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(action = %command.action, error = %e, "Rejecting malformed command");
                return SessionResult::from(&e);
            }
        };

        let result = self.dispatch(parsed, origin);
        if result.is_success() {
            self.emit(PlaybackEvent::CommandAccepted {
                command: command.action.clone(),
            });
        }
        result
    }

    fn dispatch(&mut self, command: SessionCommand, origin: &CancellationToken) -> SessionResult {
        let repository = self.repository.clone();
        match command {
            SessionCommand::LoadStream {
                uri,
                play_when_ready,
            } => {
                let generation = self.next_generation();
                let target = uri.clone();
                self.spawn_resolution(origin, uri, async move {
                    vec![repository.load_media_uri(&target).await]
                }, move |results| MutationKind::Replace {
                    generation,
                    results,
                    play_when_ready,
                    single: true,
                });
            }
            SessionCommand::LoadPlaylist {
                uri,
                play_when_ready,
            } => {
                let generation = self.next_generation();
                let target = uri.clone();
                self.spawn_resolution(origin, uri, async move {
                    repository.load_playlist_uri(&target).await
                }, move |results| MutationKind::Replace {
                    generation,
                    results,
                    play_when_ready,
                    single: false,
                });
            }
            SessionCommand::Enqueue { uri } => {
                let target = uri.clone();
                self.spawn_resolution(origin, uri, async move {
                    vec![repository.load_media_uri(&target).await]
                }, |results| MutationKind::Enqueue {
                    placement: Placement::End,
                    results,
                });
            }
            SessionCommand::EnqueueNext { uri } => {
                let target = uri.clone();
                self.spawn_resolution(origin, uri, async move {
                    vec![repository.load_media_uri(&target).await]
                }, |results| MutationKind::Enqueue {
                    placement: Placement::AfterCurrent,
                    results,
                });
            }
            SessionCommand::EnqueuePlaylist { uri } => {
                let target = uri.clone();
                self.spawn_resolution(origin, uri, async move {
                    repository.load_playlist_uri(&target).await
                }, |results| MutationKind::Enqueue {
                    placement: Placement::End,
                    results,
                });
            }
            SessionCommand::StartRadio { seed_uri } => {
                if radio_seed_id(&seed_uri).is_none() {
                    info!(uri = %seed_uri, "Radio seed has no video id");
                    self.emit(PlaybackEvent::CommandIgnored {
                        command: "start_radio".to_string(),
                        reason: "seed has no video id".to_string(),
                    });
                    return SessionResult::Success;
                }
                let target = seed_uri.clone();
                self.spawn_resolution(origin, seed_uri, async move {
                    repository.load_auto_playlist_uri(&target).await
                }, |results| MutationKind::Enqueue {
                    placement: Placement::End,
                    results,
                });
            }
            SessionCommand::SeekToPercentage { value } => return self.seek_to_percentage(value),
        }
        SessionResult::Success
    }

    fn next_generation(&mut self) -> u64 {
        self.load_generation += 1;
        self.load_generation
    }

    /// Run `resolve` off the control task and post its outcome back.
    fn spawn_resolution<F, K>(
        &self,
        origin: &CancellationToken,
        source_uri: String,
        resolve: F,
        into_mutation: K,
    ) where
        F: Future<Output = Vec<ItemResult>> + Send + 'static,
        K: FnOnce(Vec<ItemResult>) -> MutationKind + Send + 'static,
    {
        let token = origin.child_token();
        let control = self.control.clone();

        core_async::spawn(async move {
            let results = core_async::select! {
                _ = token.cancelled() => {
                    debug!(uri = %source_uri, "Resolution cancelled");
                    return;
                }
                results = resolve => results,
            };

            let mutation = Mutation {
                origin: token,
                source_uri,
                kind: into_mutation(results),
            };
            let _ = control.send(ControlMessage::Apply(mutation));
        });
    }

    fn apply(&mut self, mutation: Mutation) {
        let Mutation {
            origin,
            source_uri,
            kind,
        } = mutation;

        if origin.is_cancelled() {
            debug!(uri = %source_uri, "Dropping result of a cancelled resolution");
            return;
        }

        match kind {
            MutationKind::Replace {
                generation,
                results,
                play_when_ready,
                single,
            } => {
                if generation != self.load_generation {
                    info!(uri = %source_uri, generation, latest = self.load_generation, "Load superseded");
                    self.emit(PlaybackEvent::LoadSuperseded { uri: source_uri });
                    return;
                }

                let (items, failed_count) = self.playable(&source_uri, results);
                if items.is_empty() {
                    if single {
                        warn!(uri = %source_uri, "Stream could not be loaded, keeping current queue");
                        return;
                    }
                    warn!(uri = %source_uri, failed_count, "Playlist has no playable items");
                    self.engine.clear_media_items();
                    self.emit(PlaybackEvent::QueueReplaced {
                        source_uri,
                        item_count: 0,
                        failed_count,
                    });
                    return;
                }

                let item_count = items.len();
                self.engine.set_media_items(items);
                self.engine.prepare();
                if play_when_ready {
                    self.engine.play();
                }
                info!(uri = %source_uri, item_count, failed_count, play_when_ready, "Queue replaced");
                self.emit(PlaybackEvent::QueueReplaced {
                    source_uri,
                    item_count,
                    failed_count,
                });
            }
            MutationKind::Enqueue { placement, results } => {
                let (items, failed_count) = self.playable(&source_uri, results);
                if items.is_empty() {
                    debug!(uri = %source_uri, "Nothing to enqueue");
                    return;
                }

                let index = match placement {
                    Placement::End => None,
                    Placement::AfterCurrent => self
                        .engine
                        .current_index()
                        .map(|current| (current + 1).min(self.engine.media_item_count())),
                };
                let item_count = items.len();
                self.engine.add_media_items(index, items);
                info!(uri = %source_uri, item_count, ?index, "Items enqueued");
                self.emit(PlaybackEvent::ItemsEnqueued {
                    source_uri,
                    item_count,
                    failed_count,
                    index,
                });
            }
        }
    }

    /// Engine items of the successful results; failures are logged and
    /// counted.
    fn playable(&self, source_uri: &str, results: Vec<ItemResult>) -> (Vec<MediaItem>, usize) {
        let mut items = Vec::with_capacity(results.len());
        let mut failed = 0;

        for result in results {
            match result.map(|item| item.to_media_item()) {
                Ok(Some(media)) => {
                    if let Some(uri) = &media.uri {
                        debug!(media_id = %media.media_id, stream = %redact_stream_url(uri), "Resolved");
                    }
                    items.push(media);
                }
                Ok(None) => {
                    failed += 1;
                    warn!(uri = %source_uri, "Resolved item has no media uri");
                }
                Err(e) => {
                    failed += 1;
                    warn!(uri = %source_uri, error = %e, "Resolution failed");
                    self.emit(PlaybackEvent::ResolutionFailed {
                        uri: source_uri.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        (items, failed)
    }

    fn seek_to_percentage(&self, value: f64) -> SessionResult {
        if !(0.0..=1.0).contains(&value) {
            warn!(value, "Seek percentage out of range");
            return SessionResult::Error(ResultCode::BadValue);
        }

        match self.engine.duration_ms() {
            Some(duration) if duration > 0 => {
                let position_ms = (value * duration as f64) as u64;
                self.engine.seek_to(position_ms);
                self.emit(PlaybackEvent::SeekRequested { position_ms });
            }
            _ => {
                info!(value, "Ignoring seek, duration unknown");
                self.emit(PlaybackEvent::CommandIgnored {
                    command: "seek_to_percentage".to_string(),
                    reason: "duration unknown".to_string(),
                });
            }
        }
        SessionResult::Success
    }

    fn transport(&self, command: TransportCommand) {
        debug!(?command, "Transport command");
        match command {
            TransportCommand::Play => self.play(),
            TransportCommand::Pause => self.engine.pause(),
            TransportCommand::PlayPause => {
                if self.engine.is_playing() {
                    self.engine.pause();
                } else {
                    self.play();
                }
            }
            TransportCommand::Stop => self.engine.stop(),
            TransportCommand::SkipNext => self.engine.seek_to_next(),
            TransportCommand::SkipPrevious => self.engine.seek_to_previous(),
            TransportCommand::SeekTo(position_ms) => {
                self.engine.seek_to(position_ms);
                self.emit(PlaybackEvent::SeekRequested { position_ms });
            }
            TransportCommand::SkipTo(index) => {
                // The queue may have shrunk since the controller checked.
                let count = self.engine.media_item_count();
                if index >= count {
                    info!(index, count, "Ignoring skip, queue index out of range");
                    self.emit(PlaybackEvent::CommandIgnored {
                        command: "skip_to".to_string(),
                        reason: format!("index {index} out of range"),
                    });
                    return;
                }
                self.engine.seek_to_item(index);
                self.play();
            }
        }
    }

    fn play(&self) {
        if self.engine.playback_state() == EngineState::Idle && self.engine.media_item_count() > 0
        {
            self.engine.prepare();
        }
        self.engine.play();
    }

    fn on_engine_events(&self, events: EngineEvents) {
        if events.contains(EngineEvent::PlayerError) {
            if let Some(message) = self.engine.player_error() {
                warn!(%message, "Playback engine reported an error");
                self.emit(PlaybackEvent::EngineError { message });
            }
        }
        let _ = self.engine_events.send(events);
    }

    fn shutdown(&self) {
        self.engine.set_listener(None);
        self.engine.release();
        self.emit(PlaybackEvent::SessionReleased);
        info!("Playback session released");
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.emit(CoreEvent::Playback(event));
    }
}

//! # Session Bridge
//!
//! Connects the UI side to a [`PlaybackSession`] through a
//! [`SessionController`] and keeps the [`PlaybackStateStore`] in step with the
//! engine.
//!
//! ## Lifecycle
//!
//! - `initialize()` starts connecting. Calling it again while a connection is
//!   pending or established does nothing.
//! - Once connected, the bridge registers a listener for event batches, then
//!   pulls the full engine state into the store. The status turns
//!   `Connected` only after that first snapshot is stored.
//! - `release()` tears the connection down: the controller is released (which
//!   discards its pending resolutions), the position poller stops, and a
//!   connect that finishes late is released on arrival.

use crate::command::{PlayerCmd, ResultCode, SessionResult, TransportCommand};
use crate::config::SessionConfig;
use crate::controller::{PlayerListener, PlayerView, SessionController};
use crate::error::Result;
use crate::poller::PositionPoller;
use crate::session::PlaybackSession;
use crate::state::{PlaybackSnapshot, PlaybackStateStore};
use async_trait::async_trait;
use bridge_traits::engine::{EngineEvent, EngineEvents};
use core_async::sync::{watch, CancellationToken};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Establishes a controller connection to a playback session.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self) -> Result<SessionController>;
}

/// Connector for a session running in the same process.
pub struct LocalSessionConnector {
    session: PlaybackSession,
}

impl LocalSessionConnector {
    pub fn new(session: PlaybackSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SessionConnector for LocalSessionConnector {
    async fn connect(&self) -> Result<SessionController> {
        self.session.connect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

enum Connection {
    Idle,
    Pending {
        token: CancellationToken,
    },
    Connected {
        controller: Arc<SessionController>,
        token: CancellationToken,
    },
}

#[derive(Clone)]
pub struct SessionBridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    connector: Arc<dyn SessionConnector>,
    store: PlaybackStateStore,
    poller: PositionPoller,
    connection: Mutex<Connection>,
    status: watch::Sender<ConnectionStatus>,
    /// Held while a snapshot is derived and stored, so a slow initial pull
    /// cannot overwrite a newer projection made by the listener.
    projection: Mutex<()>,
}

impl SessionBridge {
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        store: PlaybackStateStore,
        config: &SessionConfig,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            inner: Arc::new(BridgeInner {
                connector,
                store,
                poller: PositionPoller::new(config.position_poll_interval),
                connection: Mutex::new(Connection::Idle),
                status,
                projection: Mutex::new(()),
            }),
        }
    }

    /// Start connecting to the session. A no-op while a connection is
    /// pending or established.
    pub fn initialize(&self) {
        let token = {
            let mut connection = self.inner.connection.lock();
            if !matches!(*connection, Connection::Idle) {
                debug!("Bridge already initialized");
                return;
            }
            let token = CancellationToken::new();
            *connection = Connection::Pending {
                token: token.clone(),
            };
            token
        };
        self.inner.status.send_replace(ConnectionStatus::Connecting);

        let inner = self.inner.clone();
        core_async::spawn(async move {
            let connected = core_async::select! {
                biased;
                _ = token.cancelled() => return,
                connected = inner.connector.connect() => connected,
            };

            match connected {
                Ok(controller) => BridgeInner::on_connected(&inner, controller, token),
                Err(e) => {
                    warn!(error = %e, "Failed to connect to playback session");
                    let mut connection = inner.connection.lock();
                    if !token.is_cancelled() {
                        *connection = Connection::Idle;
                        inner.status.send_replace(ConnectionStatus::Disconnected);
                    }
                }
            }
        });
    }

    /// Disconnect and stop all background work derived from the connection.
    pub fn release(&self) {
        let previous = {
            let mut connection = self.inner.connection.lock();
            let previous = std::mem::replace(&mut *connection, Connection::Idle);
            match &previous {
                Connection::Pending { token } | Connection::Connected { token, .. } => {
                    token.cancel()
                }
                Connection::Idle => {}
            }
            previous
        };

        if let Connection::Connected { controller, .. } = previous {
            controller.release();
        }
        self.inner.poller.stop();
        self.inner.status.send_replace(ConnectionStatus::Disconnected);
        info!("Session bridge released");
    }

    /// The connected controller, or `None` before the connection completes.
    pub fn controller(&self) -> Option<Arc<SessionController>> {
        match &*self.inner.connection.lock() {
            Connection::Connected { controller, .. } => Some(controller.clone()),
            _ => None,
        }
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    /// Wait for a pending connection attempt to settle and return the
    /// controller it produced.
    pub async fn wait_until_connected(&self) -> Option<Arc<SessionController>> {
        let mut status = self.inner.status.subscribe();
        let _ = status
            .wait_for(|status| *status != ConnectionStatus::Connecting)
            .await;
        self.controller()
    }

    pub fn store(&self) -> &PlaybackStateStore {
        &self.inner.store
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_running()
    }

    pub async fn load_stream(&self, uri: &str, play_when_ready: bool) -> SessionResult {
        match self.controller() {
            Some(controller) => controller.load_stream(uri, play_when_ready).await,
            None => SessionResult::Error(ResultCode::Disconnected),
        }
    }

    pub async fn load_playlist(&self, uri: &str, play_when_ready: bool) -> SessionResult {
        match self.controller() {
            Some(controller) => controller.load_playlist(uri, play_when_ready).await,
            None => SessionResult::Error(ResultCode::Disconnected),
        }
    }

    pub async fn enqueue(&self, uri: &str) -> SessionResult {
        match self.controller() {
            Some(controller) => controller.enqueue(uri).await,
            None => SessionResult::Error(ResultCode::Disconnected),
        }
    }

    pub async fn enqueue_next(&self, uri: &str) -> SessionResult {
        match self.controller() {
            Some(controller) => controller.enqueue_next(uri).await,
            None => SessionResult::Error(ResultCode::Disconnected),
        }
    }

    pub async fn enqueue_playlist(&self, uri: &str) -> SessionResult {
        match self.controller() {
            Some(controller) => controller.enqueue_playlist(uri).await,
            None => SessionResult::Error(ResultCode::Disconnected),
        }
    }

    pub async fn start_radio(&self, seed_uri: &str) -> SessionResult {
        match self.controller() {
            Some(controller) => controller.start_radio(seed_uri).await,
            None => SessionResult::Error(ResultCode::Disconnected),
        }
    }

    pub async fn seek_to_percentage(&self, value: f64) -> SessionResult {
        match self.controller() {
            Some(controller) => controller.seek_to_percentage(value).await,
            None => SessionResult::Error(ResultCode::Disconnected),
        }
    }

    pub fn transport(&self, command: TransportCommand) -> SessionResult {
        match self.controller() {
            Some(controller) => controller.transport(command),
            None => SessionResult::Error(ResultCode::Disconnected),
        }
    }

    pub fn player_command(&self, command: PlayerCmd, position_ms: Option<i64>) -> SessionResult {
        match self.controller() {
            Some(controller) => controller.player_command(command, position_ms),
            None => SessionResult::Error(ResultCode::Disconnected),
        }
    }
}

impl BridgeInner {
    fn on_connected(inner: &Arc<Self>, controller: SessionController, token: CancellationToken) {
        let controller = Arc::new(controller);
        {
            let mut connection = inner.connection.lock();
            // Released while connecting: the connection belongs to nobody.
            if token.is_cancelled() {
                drop(connection);
                debug!("Connection completed after release, discarding");
                controller.release();
                return;
            }
            *connection = Connection::Connected {
                controller: controller.clone(),
                token: token.clone(),
            };
        }

        // Subscribe before the pull: a batch emitted during the pull is then
        // delivered to the listener instead of being lost.
        controller.add_listener(Arc::new(BridgeListener {
            inner: Arc::downgrade(inner),
            controller: Arc::downgrade(&controller),
            token: token.clone(),
        }));

        let player = controller.player().clone();
        {
            let _projection = inner.projection.lock();
            inner.store.replace(PlaybackSnapshot::from_player(&player));
        }
        if player.is_playing() {
            inner.poller.start(player, inner.store.clone(), &token);
        }

        let _connection = inner.connection.lock();
        if !token.is_cancelled() {
            inner.status.send_replace(ConnectionStatus::Connected);
            info!("Session bridge connected");
        }
    }
}

/// Projects engine event batches onto the state store.
struct BridgeListener {
    inner: Weak<BridgeInner>,
    controller: Weak<SessionController>,
    token: CancellationToken,
}

impl PlayerListener for BridgeListener {
    fn on_events(&self, player: &PlayerView, events: &EngineEvents) {
        if self.token.is_cancelled() {
            return;
        }
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        // Always the whole snapshot, read from the engine as it is now.
        let failed = {
            let _projection = inner.projection.lock();
            let snapshot = PlaybackSnapshot::from_player(player);
            let failed =
                events.contains(EngineEvent::PlayerError) && snapshot.error_message.is_some();
            inner.store.replace(snapshot);
            failed
        };

        if failed {
            warn!("Engine reported an error, stopping playback");
            inner.poller.stop();
            if let Some(controller) = self.controller.upgrade() {
                controller.transport(TransportCommand::Stop);
            }
            return;
        }

        if events.contains(EngineEvent::IsPlayingChanged) {
            if player.is_playing() {
                inner
                    .poller
                    .start(player.clone(), inner.store.clone(), &self.token);
            } else {
                inner.poller.stop();
            }
        }

        if events.contains(EngineEvent::PlaybackStateChanged)
            && player.playback_state().is_terminal()
        {
            inner.poller.stop();
        }
    }
}

//! # Playback Module
//!
//! Playback orchestration for the music core.
//!
//! ## Overview
//!
//! - [`PlaybackSession`] owns the [`PlaybackEngine`](bridge_traits::engine::PlaybackEngine)
//!   and serves the command protocol defined in [`command`].
//! - [`SessionController`] is the client handle a connection yields.
//! - [`SessionBridge`] connects the UI to a session and mirrors engine state
//!   into the [`PlaybackStateStore`], sampling position with a
//!   [`PositionPoller`] while playing.
//! - [`MusicRepository`] turns content references into [`PlayableItem`]s. The
//!   remote implementation resolves through the host's content resolver; the
//!   caching decorator writes results through to the local library.
//! - [`SearchStateStore`] drives search over a repository.

pub mod bridge;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod item;
pub mod poller;
pub mod repository;
pub mod search;
pub mod session;
pub mod state;

pub use bridge::{ConnectionStatus, LocalSessionConnector, SessionBridge, SessionConnector};
pub use command::{
    ArgValue, CustomCommand, PlayerCmd, ResultCode, SessionCommand, SessionCommands,
    SessionResult, StartupIntent, TransportCommand,
};
pub use config::SessionConfig;
pub use controller::{PlayerListener, PlayerView, SessionController};
pub use error::{PlaybackError, Result};
pub use item::{ItemResult, PlayableItem};
pub use poller::PositionPoller;
pub use repository::{
    CachingMusicRepository, LibraryCache, MusicRepository, OfflineMusicRepository,
    ResolverHandle, ResolverMusicRepository,
};
pub use search::{SearchPhase, SearchState, SearchStateStore};
pub use session::PlaybackSession;
pub use state::{PlaybackPhase, PlaybackSnapshot, PlaybackStateStore};

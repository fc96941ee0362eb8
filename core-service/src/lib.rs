//! Core service façade and bootstrap.
//!
//! [`CoreService::bootstrap`] wires a validated [`CoreConfig`] into the
//! running core:
//!
//! 1. open the library database (file or in-memory) and apply migrations
//! 2. create the event bus
//! 3. wrap the host resolver in a [`ResolverHandle`] and warm it up
//! 4. pick the music repository: offline, caching, or plain remote
//! 5. start the [`PlaybackSession`] over the host engine
//! 6. connect a [`SessionBridge`] feeding the [`PlaybackStateStore`]
//! 7. create the [`SearchStateStore`]
//!
//! Hosts translate their launch arguments into a [`StartupIntent`] and hand
//! it to [`CoreService::handle_start_intent`].

pub mod error;

pub use error::{CoreError, Result};

use core_async::sync::broadcast;
use core_library::db::{create_pool, DatabaseConfig, SqlitePool};
use core_library::models::InternalPlaylist;
use core_playback::{
    CachingMusicRepository, LibraryCache, LocalSessionConnector, MusicRepository,
    OfflineMusicRepository, PlayableItem, PlaybackSession, PlaybackStateStore, ResolverHandle,
    ResolverMusicRepository, SearchStateStore, SessionBridge, SessionConfig, SessionResult,
    StartupIntent,
};
use core_runtime::config::{CoreConfig, DatabaseLocation};
use core_runtime::events::{CoreEvent, EventBus};
use std::sync::Arc;
use tracing::{info, warn};

pub use core_playback;
pub use core_runtime;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    pool: SqlitePool,
    events: EventBus,
    resolver: ResolverHandle,
    repository: Arc<dyn MusicRepository>,
    cache: LibraryCache,
    session: PlaybackSession,
    store: PlaybackStateStore,
    bridge: SessionBridge,
    search: SearchStateStore,
}

impl CoreService {
    /// Build and start every component described by `config`.
    ///
    /// Must be called from within a tokio runtime. A resolver that fails its
    /// warm-up does not fail the bootstrap; initialization is retried on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened and migrated.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        info!(?config, "Bootstrapping core service");

        let database = match &config.database {
            DatabaseLocation::File(path) => DatabaseConfig::new(path.clone()),
            DatabaseLocation::InMemory => DatabaseConfig::in_memory(),
        };
        let pool = create_pool(database).await?;

        let events = EventBus::new(config.event_buffer_size);
        let cache = LibraryCache::from_pool(pool.clone()).with_events(events.clone());

        let resolver = ResolverHandle::new(
            config.content_resolver.clone(),
            config.resolver_options.clone(),
        );
        if !config.features.offline_mode {
            if let Err(e) = resolver.ensure_initialized().await {
                warn!(error = %e, "Content resolver warm-up failed, retrying on first use");
            }
        }

        let session_config =
            SessionConfig::default().with_position_poll_interval(config.position_poll_interval);
        let remote: Arc<dyn MusicRepository> = Arc::new(ResolverMusicRepository::with_config(
            resolver.clone(),
            session_config.clone(),
        ));

        let repository: Arc<dyn MusicRepository> = if config.features.offline_mode {
            info!("Offline mode: serving the library only");
            Arc::new(OfflineMusicRepository::new(cache.clone()))
        } else if config.features.enable_cache {
            Arc::new(CachingMusicRepository::new(remote, cache.clone()))
        } else {
            remote
        };

        let session = PlaybackSession::start(
            config.playback_engine.clone(),
            repository.clone(),
            events.clone(),
            session_config.clone(),
        );

        let store = PlaybackStateStore::new();
        let bridge = SessionBridge::new(
            Arc::new(LocalSessionConnector::new(session.clone())),
            store.clone(),
            &session_config,
        );
        bridge.initialize();

        let search = SearchStateStore::new(repository.clone())
            .with_min_query_length(config.min_search_query_length);

        info!("Core service ready");

        Ok(Self {
            inner: Arc::new(ServiceInner {
                pool,
                events,
                resolver,
                repository,
                cache,
                session,
                store,
                bridge,
                search,
            }),
        })
    }

    /// Dispatch the initial load requested at launch, if any.
    pub async fn handle_start_intent(&self, intent: &StartupIntent) -> Option<SessionResult> {
        self.inner.session.handle_startup_intent(intent).await
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.inner.session
    }

    pub fn bridge(&self) -> &SessionBridge {
        &self.inner.bridge
    }

    pub fn playback_state(&self) -> &PlaybackStateStore {
        &self.inner.store
    }

    pub fn search(&self) -> &SearchStateStore {
        &self.inner.search
    }

    pub fn repository(&self) -> Arc<dyn MusicRepository> {
        self.inner.repository.clone()
    }

    pub fn resolver(&self) -> &ResolverHandle {
        &self.inner.resolver
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Songs of the "recent" playlist, most recent first.
    pub async fn recent_songs(&self) -> Result<Vec<PlayableItem>> {
        Ok(self.inner.cache.songs_of(InternalPlaylist::Recent).await?)
    }

    pub async fn liked_songs(&self) -> Result<Vec<PlayableItem>> {
        Ok(self.inner.cache.songs_of(InternalPlaylist::Liked).await?)
    }

    /// Store `item` in the library and add it to the "liked" playlist.
    pub async fn like(&self, item: &PlayableItem) -> Result<()> {
        self.inner.cache.remember(item, InternalPlaylist::Liked).await?;
        Ok(())
    }

    /// Release the bridge and the session, then close the database.
    pub async fn shutdown(&self) {
        info!("Shutting down core service");
        self.inner.bridge.release();
        self.inner.session.release().await;
        self.inner.pool.close().await;
    }
}

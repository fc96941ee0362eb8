//! # Core Configuration Module
//!
//! Builder-based configuration for the player core.
//!
//! ## Required Capabilities
//!
//! - `ContentResolver` - turns page URIs and queries into stream metadata
//! - `PlaybackEngine` - the host media player
//!
//! Both must be injected by the host; there is no default implementation.
//! `build()` fails fast with [`Error::CapabilityMissing`] naming the missing
//! capability.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/player/music.db")
//!     .content_resolver(Arc::new(MyResolver::new()))
//!     .playback_engine(Arc::new(MyEngine::new()))
//!     .position_poll_interval(Duration::from_millis(250))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{ContentResolver, PlaybackEngine, ResolverOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between position polls while playing.
pub const DEFAULT_POSITION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Queries shorter than this never reach the resolver.
pub const DEFAULT_MIN_SEARCH_QUERY_LENGTH: usize = 2;

/// Where the library database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

/// Feature flags control optional behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Serve searches from liked songs and refuse remote loads
    pub offline_mode: bool,

    /// Write resolved search results through to the local cache
    pub enable_cache: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            offline_mode: false,
            enable_cache: true,
        }
    }
}

/// Core configuration for the player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub database: DatabaseLocation,

    /// Content resolution capability (required)
    pub content_resolver: Arc<dyn ContentResolver>,

    /// Media player capability (required)
    pub playback_engine: Arc<dyn PlaybackEngine>,

    /// Options passed to the resolver's one-time initialization
    pub resolver_options: ResolverOptions,

    pub position_poll_interval: Duration,

    /// Buffer size of the event bus
    pub event_buffer_size: usize,

    pub min_search_query_length: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database", &self.database)
            .field("content_resolver", &"ContentResolver { ... }")
            .field("playback_engine", &"PlaybackEngine { ... }")
            .field("resolver_options", &self.resolver_options)
            .field("position_poll_interval", &self.position_poll_interval)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("min_search_query_length", &self.min_search_query_length)
            .field("features", &self.features)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration values.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Poll interval is between 1 ms and 60 s
    /// - Event buffer holds at least one event
    /// - Minimum query length is at least one character
    pub fn validate(&self) -> Result<()> {
        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.position_poll_interval.is_zero() {
            return Err(Error::Config(
                "Position poll interval must be greater than zero".to_string(),
            ));
        }

        if self.position_poll_interval > Duration::from_secs(60) {
            return Err(Error::Config(
                "Position poll interval exceeds maximum of 60 seconds".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.min_search_query_length == 0 {
            return Err(Error::Config(
                "Minimum search query length must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    database: Option<DatabaseLocation>,
    content_resolver: Option<Arc<dyn ContentResolver>>,
    playback_engine: Option<Arc<dyn PlaybackEngine>>,
    resolver_options: Option<ResolverOptions>,
    position_poll_interval: Option<Duration>,
    event_buffer_size: Option<usize>,
    min_search_query_length: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the SQLite database file.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/data/music.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database = Some(DatabaseLocation::File(path.into()));
        self
    }

    /// Keep the library in memory; nothing survives a restart.
    pub fn in_memory_database(mut self) -> Self {
        self.database = Some(DatabaseLocation::InMemory);
        self
    }

    pub fn content_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.content_resolver = Some(resolver);
        self
    }

    pub fn playback_engine(mut self, engine: Arc<dyn PlaybackEngine>) -> Self {
        self.playback_engine = Some(engine);
        self
    }

    pub fn resolver_options(mut self, options: ResolverOptions) -> Self {
        self.resolver_options = Some(options);
        self
    }

    /// Default: 500 ms
    pub fn position_poll_interval(mut self, interval: Duration) -> Self {
        self.position_poll_interval = Some(interval);
        self
    }

    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Default: 2 characters
    pub fn min_search_query_length(mut self, length: usize) -> Self {
        self.min_search_query_length = Some(length);
        self
    }

    pub fn offline_mode(mut self, enabled: bool) -> Self {
        self.features.offline_mode = enabled;
        self
    }

    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.features.enable_cache = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when no database location was chosen or a value
    ///   is out of range
    /// - [`Error::CapabilityMissing`] when the resolver or engine is absent
    pub fn build(self) -> Result<CoreConfig> {
        let database = self.database.ok_or_else(|| {
            Error::Config(
                "Database location is required. Use .database_path() or .in_memory_database()."
                    .to_string(),
            )
        })?;

        let content_resolver = self.content_resolver.ok_or_else(|| {
            capability_missing(
                "ContentResolver",
                "A ContentResolver implementation is required to resolve stream and \
                 playlist references. Inject the host's extraction backend.",
            )
        })?;

        let playback_engine = self.playback_engine.ok_or_else(|| {
            capability_missing(
                "PlaybackEngine",
                "A PlaybackEngine implementation is required to play audio. \
                 Inject the platform media player adapter.",
            )
        })?;

        let config = CoreConfig {
            database,
            content_resolver,
            playback_engine,
            resolver_options: self.resolver_options.unwrap_or_default(),
            position_poll_interval: self
                .position_poll_interval
                .unwrap_or(DEFAULT_POSITION_POLL_INTERVAL),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            min_search_query_length: self
                .min_search_query_length
                .unwrap_or(DEFAULT_MIN_SEARCH_QUERY_LENGTH),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

//! Repository backed by the host content resolver.

use super::{radio_seed_id, MusicRepository};
use crate::config::SessionConfig;
use crate::error::{PlaybackError, Result};
use crate::item::{ItemResult, PlayableItem};
use async_trait::async_trait;
use bridge_traits::content::{ContentResolver, ResolverOptions, StreamInfo};
use core_async::sync::OnceCell;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Process-wide handle on the content resolver.
///
/// The resolver needs one-time setup before its first use. The handle runs
/// [`ContentResolver::initialize`] at most once successfully, however many
/// clones call [`ResolverHandle::ensure_initialized`] concurrently; a failed
/// attempt leaves the latch open and the next caller retries.
#[derive(Clone)]
pub struct ResolverHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    resolver: Arc<dyn ContentResolver>,
    options: ResolverOptions,
    initialized: OnceCell<()>,
}

impl ResolverHandle {
    pub fn new(resolver: Arc<dyn ContentResolver>, options: ResolverOptions) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                resolver,
                options,
                initialized: OnceCell::new(),
            }),
        }
    }

    pub async fn ensure_initialized(&self) -> Result<()> {
        self.inner
            .initialized
            .get_or_try_init(|| async {
                info!(
                    consent_accepted = self.inner.options.consent_accepted,
                    "Initializing content resolver"
                );
                self.inner.resolver.initialize(&self.inner.options).await
            })
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.initialized()
    }

    /// The resolver, initialized on first use.
    pub async fn resolver(&self) -> Result<&dyn ContentResolver> {
        self.ensure_initialized().await?;
        Ok(self.inner.resolver.as_ref())
    }
}

/// Remote [`MusicRepository`] over a [`ResolverHandle`].
pub struct ResolverMusicRepository {
    resolver: ResolverHandle,
    config: SessionConfig,
}

impl ResolverMusicRepository {
    pub fn new(resolver: ResolverHandle) -> Self {
        Self::with_config(resolver, SessionConfig::default())
    }

    pub fn with_config(resolver: ResolverHandle, config: SessionConfig) -> Self {
        Self { resolver, config }
    }

    async fn resolve_one(&self, uri: &str) -> ItemResult {
        let resolver = self.resolver.resolver().await?;
        let info = resolver
            .resolve_stream(uri)
            .await
            .map_err(|e| PlaybackError::resolution(uri, e))?;
        PlayableItem::from_stream_info(&info)
    }

    /// Resolve the entries of a listing concurrently, keeping their order.
    async fn resolve_entries(&self, entries: Vec<StreamInfo>) -> Vec<ItemResult> {
        let results = join_all(entries.iter().map(|entry| self.resolve_one(&entry.url))).await;

        for (entry, result) in entries.iter().zip(&results) {
            if let Err(e) = result {
                warn!(uri = %entry.url, error = %e, "Skipping unresolvable entry");
            }
        }
        results
    }
}

#[async_trait]
impl MusicRepository for ResolverMusicRepository {
    #[instrument(skip(self))]
    async fn load_media_uri(&self, uri: &str) -> ItemResult {
        self.resolve_one(uri).await
    }

    #[instrument(skip(self))]
    async fn load_playlist_uri(&self, uri: &str) -> Vec<ItemResult> {
        let resolver = match self.resolver.resolver().await {
            Ok(resolver) => resolver,
            Err(e) => return vec![Err(e)],
        };

        match resolver.resolve_playlist(uri).await {
            Ok(entries) => {
                debug!(entries = entries.len(), "Playlist listed");
                self.resolve_entries(entries).await
            }
            Err(e) => vec![Err(PlaybackError::resolution(uri, e))],
        }
    }

    #[instrument(skip(self))]
    async fn load_auto_playlist_uri(&self, uri: &str) -> Vec<ItemResult> {
        let Some(seed_id) = radio_seed_id(uri) else {
            debug!("Radio seed has no video id");
            return Vec::new();
        };

        let resolver = match self.resolver.resolver().await {
            Ok(resolver) => resolver,
            Err(e) => return vec![Err(e)],
        };

        let mix_url = self.config.radio_mix_url(&seed_id);
        match resolver.resolve_related(&mix_url).await {
            Ok(entries) => self.resolve_entries(entries).await,
            Err(e) => vec![Err(PlaybackError::resolution(&mix_url, e))],
        }
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Vec<ItemResult> {
        let resolver = match self.resolver.resolver().await {
            Ok(resolver) => resolver,
            Err(e) => return vec![Err(e)],
        };

        match resolver.search(query).await {
            Ok(hits) => hits
                .iter()
                .map(|hit| Ok(PlayableItem::from_search_result(hit)))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Search failed");
                vec![Err(PlaybackError::resolution(query, e))]
            }
        }
    }
}

//! Caching decorator over a remote [`MusicRepository`].

use super::cache::LibraryCache;
use super::MusicRepository;
use crate::error::Result;
use crate::item::{ItemResult, PlayableItem};
use async_trait::async_trait;
use core_library::models::InternalPlaylist;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Decorates a remote repository with the local library.
///
/// Only `search` changes behaviour: every successful remote hit is written
/// through to the "recent" playlist, and previously cached recent songs are
/// appended after the remote results. Cache failures are logged and never
/// fail the search. Every other operation is forwarded as is.
pub struct CachingMusicRepository {
    remote: Arc<dyn MusicRepository>,
    cache: LibraryCache,
}

impl CachingMusicRepository {
    pub fn new(remote: Arc<dyn MusicRepository>, cache: LibraryCache) -> Self {
        Self { remote, cache }
    }

    pub async fn get_recent_songs(&self) -> Result<Vec<PlayableItem>> {
        self.cache.songs_of(InternalPlaylist::Recent).await
    }

    pub async fn get_liked_songs(&self) -> Result<Vec<PlayableItem>> {
        self.cache.songs_of(InternalPlaylist::Liked).await
    }

    pub async fn like(&self, item: &PlayableItem) -> Result<()> {
        self.cache.remember(item, InternalPlaylist::Liked).await?;
        Ok(())
    }

    async fn write_through(&self, results: &[ItemResult]) {
        for item in results.iter().filter_map(|r| r.as_ref().ok()) {
            if let Err(e) = self.cache.remember(item, InternalPlaylist::Recent).await {
                debug!(title = %item.title, error = %e, "Cache write-through skipped");
            }
        }
    }
}

#[async_trait]
impl MusicRepository for CachingMusicRepository {
    async fn load_media_uri(&self, uri: &str) -> ItemResult {
        self.remote.load_media_uri(uri).await
    }

    async fn load_playlist_uri(&self, uri: &str) -> Vec<ItemResult> {
        self.remote.load_playlist_uri(uri).await
    }

    async fn load_auto_playlist_uri(&self, uri: &str) -> Vec<ItemResult> {
        self.remote.load_auto_playlist_uri(uri).await
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Vec<ItemResult> {
        // The cached snapshot is taken before this search writes anything.
        let (cached, remote) = futures::join!(
            self.cache.songs_of(InternalPlaylist::Recent),
            self.remote.search(query)
        );

        self.write_through(&remote).await;

        let cached = cached.unwrap_or_else(|e| {
            warn!(error = %e, "Reading recent songs failed");
            Vec::new()
        });

        let seen: HashSet<String> = remote
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .filter_map(|item| item.media_uri.clone())
            .collect();

        let mut results = remote;
        results.extend(
            cached
                .into_iter()
                .filter(|item| match &item.media_uri {
                    Some(uri) => !seen.contains(uri),
                    None => true,
                })
                .map(Ok),
        );
        results
    }
}

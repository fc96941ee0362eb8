//! Library-only repository used when remote resolution is disabled.

use super::cache::LibraryCache;
use super::MusicRepository;
use crate::error::PlaybackError;
use crate::item::ItemResult;
use async_trait::async_trait;
use core_library::models::InternalPlaylist;
use tracing::debug;

/// Loads fail with [`PlaybackError::Offline`]; search lists the liked songs.
pub struct OfflineMusicRepository {
    cache: LibraryCache,
}

impl OfflineMusicRepository {
    pub fn new(cache: LibraryCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl MusicRepository for OfflineMusicRepository {
    async fn load_media_uri(&self, uri: &str) -> ItemResult {
        debug!(uri, "Offline: not resolving");
        Err(PlaybackError::Offline)
    }

    async fn load_playlist_uri(&self, _uri: &str) -> Vec<ItemResult> {
        vec![Err(PlaybackError::Offline)]
    }

    async fn load_auto_playlist_uri(&self, _uri: &str) -> Vec<ItemResult> {
        vec![Err(PlaybackError::Offline)]
    }

    async fn search(&self, _query: &str) -> Vec<ItemResult> {
        match self.cache.songs_of(InternalPlaylist::Liked).await {
            Ok(items) => items.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        }
    }
}

//! # Music Repositories
//!
//! [`MusicRepository`] turns page URIs and queries into [`PlayableItem`]s.
//!
//! - [`ResolverMusicRepository`] resolves through the host content resolver
//! - [`CachingMusicRepository`] decorates another repository with the local
//!   library: search results are written through to the "recent" playlist
//!   and recent songs are appended to fresh results
//! - [`OfflineMusicRepository`] serves the library only
//!
//! Batch operations return one [`ItemResult`] per entry. A failing entry never
//! aborts the batch; callers filter.

mod cache;
mod caching;
mod offline;
mod remote;

pub use cache::LibraryCache;
pub use caching::CachingMusicRepository;
pub use offline::OfflineMusicRepository;
pub use remote::{ResolverHandle, ResolverMusicRepository};

use crate::item::{ItemResult, PlayableItem};
use async_trait::async_trait;
use url::Url;

#[async_trait]
pub trait MusicRepository: Send + Sync {
    /// Resolve a single page URI.
    async fn load_media_uri(&self, uri: &str) -> ItemResult;

    /// Resolve every entry of a playlist page, in playlist order.
    async fn load_playlist_uri(&self, uri: &str) -> Vec<ItemResult>;

    /// Resolve the auto-generated mix seeded by `uri`. A seed without a
    /// video id yields an empty batch.
    async fn load_auto_playlist_uri(&self, uri: &str) -> Vec<ItemResult>;

    async fn search(&self, query: &str) -> Vec<ItemResult>;
}

/// Video id of a radio seed: the non-empty `v` query parameter.
pub fn radio_seed_id(uri: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Successful items of a batch, in order.
pub fn successes(results: Vec<ItemResult>) -> Vec<PlayableItem> {
    results.into_iter().filter_map(Result::ok).collect()
}

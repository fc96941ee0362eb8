//! Write-through access to the local library for the repository decorators.

use crate::error::{PlaybackError, Result};
use crate::item::PlayableItem;
use bridge_traits::content::InfoType;
use core_library::models::{InternalPlaylist, Song, SongWithArtists};
use core_library::repositories::{
    ArtistRepository, PlaylistRepository, SongRepository, SqliteArtistRepository,
    SqlitePlaylistRepository, SqliteSongRepository,
};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use core_library::db::SqlitePool;
use std::sync::Arc;
use tracing::debug;

/// Separator used when several artists are shown as one string.
const ARTIST_SEPARATOR: &str = ", ";

#[derive(Clone)]
pub struct LibraryCache {
    playlists: Arc<dyn PlaylistRepository>,
    songs: Arc<dyn SongRepository>,
    artists: Arc<dyn ArtistRepository>,
    events: Option<EventBus>,
}

impl LibraryCache {
    pub fn new(
        playlists: Arc<dyn PlaylistRepository>,
        songs: Arc<dyn SongRepository>,
        artists: Arc<dyn ArtistRepository>,
    ) -> Self {
        Self {
            playlists,
            songs,
            artists,
            events: None,
        }
    }

    /// Cache over the SQLite repositories of `pool`.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self::new(
            Arc::new(SqlitePlaylistRepository::new(pool.clone())),
            Arc::new(SqliteSongRepository::new(pool.clone())),
            Arc::new(SqliteArtistRepository::new(pool)),
        )
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Songs of an internal playlist, most recently added first.
    pub async fn songs_of(&self, which: InternalPlaylist) -> Result<Vec<PlayableItem>> {
        let playlist = self.playlists.find_internal(which).await?;
        let songs = self.songs.songs_with_artists(&playlist.id).await?;
        Ok(songs.iter().map(item_from_cached).collect())
    }

    /// Persist `item` and add it to an internal playlist.
    ///
    /// The song is stored once per media URI, artists once per name, and the
    /// playlist association at most once.
    pub async fn remember(&self, item: &PlayableItem, which: InternalPlaylist) -> Result<Song> {
        let uri = item
            .media_uri
            .as_deref()
            .ok_or_else(|| PlaybackError::InvalidArgument {
                argument: "media_uri".to_string(),
                message: format!("'{}' has no media uri to cache", item.title),
            })?;

        let candidate = Song::new(item.title.clone(), uri.to_string())
            .with_artwork_uri(item.thumbnail_uri.clone())
            .with_duration_ms(item.duration_ms.unwrap_or(0) as i64);
        let song = self.songs.upsert_by_uri(&candidate).await?;

        if song.id == candidate.id {
            self.emit(LibraryEvent::SongCached {
                song_id: song.id.clone(),
                title: song.title.clone(),
            });
        }

        // An earlier call may have stored the song and failed before every
        // artist was linked. Links are insert-or-ignore, so relinking the
        // full list completes it without duplicates.
        let names: Vec<&str> = item
            .artist
            .split(ARTIST_SEPARATOR)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        if self.songs.artists_for(&song.id).await?.len() < names.len() {
            for (position, name) in names.into_iter().enumerate() {
                let artist = self.artists.find_or_create(name).await?;
                self.songs
                    .link_artist(&song.id, &artist.id, position as i64)
                    .await?;
            }
        }

        let playlist = self.playlists.find_internal(which).await?;
        if self.playlists.add_song(&playlist.id, &song.id).await? {
            self.emit(LibraryEvent::SongLinked {
                playlist_id: playlist.id,
                song_id: song.id.clone(),
            });
        } else {
            debug!(song_id = %song.id, playlist = which.name(), "Song already in playlist");
        }

        Ok(song)
    }

    fn emit(&self, event: LibraryEvent) {
        if let Some(events) = &self.events {
            let _ = events.emit(CoreEvent::Library(event));
        }
    }
}

/// Map a cached song back to a playable item. Cached songs are always
/// streams whose media URI is their page URL.
pub(crate) fn item_from_cached(cached: &SongWithArtists) -> PlayableItem {
    let song = &cached.song;
    let duration = u64::try_from(song.duration_ms).ok().filter(|d| *d > 0);

    PlayableItem::new(song.title.clone(), InfoType::Stream)
        .with_artist(cached.artist_names())
        .with_thumbnail_uri(song.artwork_uri.clone())
        .with_media_uri(song.uri.clone())
        .with_source_uri(song.uri.clone())
        .with_duration_ms(duration)
}

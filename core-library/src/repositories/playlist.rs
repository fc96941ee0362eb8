//! Playlist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{InternalPlaylist, Playlist, PlaylistType};
use async_trait::async_trait;
use bridge_traits::time::{Clock, SystemClock};
use sqlx::{query, query_as, SqlitePool};
use std::sync::Arc;
use tracing::debug;

/// Playlist repository interface for data access operations
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Playlist>>;

    /// Fetch one of the internal playlists seeded at bootstrap.
    ///
    /// # Errors
    /// `NotFound` if the database was not migrated.
    async fn find_internal(&self, which: InternalPlaylist) -> Result<Playlist>;

    async fn recent_playlist_id(&self) -> Result<String> {
        Ok(self.find_internal(InternalPlaylist::Recent).await?.id)
    }

    async fn liked_playlist_id(&self) -> Result<String> {
        Ok(self.find_internal(InternalPlaylist::Liked).await?.id)
    }

    /// User-created playlists whose name contains `name`
    async fn find_local_by_name(&self, name: &str) -> Result<Vec<Playlist>>;

    /// Insert a new playlist.
    ///
    /// # Errors
    /// Returns error if validation fails, or on a second internal playlist
    /// with an existing name.
    async fn insert(&self, playlist: &Playlist) -> Result<()>;

    /// Create and store a user playlist.
    async fn create_local(&self, name: &str, source_uri: Option<&str>) -> Result<Playlist> {
        let mut playlist = Playlist::new(name.trim().to_string(), PlaylistType::Local);
        playlist.source_uri = source_uri.map(str::to_string);
        self.insert(&playlist).await?;
        Ok(playlist)
    }

    /// Add a song to a playlist, stamped with the current time.
    ///
    /// # Returns
    /// - `Ok(true)` if the song was added
    /// - `Ok(false)` if it was already a member (its timestamp is kept)
    async fn add_song(&self, playlist_id: &str, song_id: &str) -> Result<bool>;

    async fn remove_song(&self, playlist_id: &str, song_id: &str) -> Result<bool>;

    /// Member song ids, most recently added first
    async fn songs_in(&self, playlist_id: &str) -> Result<Vec<String>>;

    async fn contains_song(&self, playlist_id: &str, song_id: &str) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of PlaylistRepository
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqlitePlaylistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Playlist>> {
        let playlist = query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(playlist)
    }

    async fn find_internal(&self, which: InternalPlaylist) -> Result<Playlist> {
        query_as::<_, Playlist>("SELECT * FROM playlists WHERE type = ? AND name = ?")
            .bind(PlaylistType::Internal)
            .bind(which.name())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Playlist".to_string(),
                id: which.name().to_string(),
            })
    }

    async fn find_local_by_name(&self, name: &str) -> Result<Vec<Playlist>> {
        let pattern = format!("%{}%", name.trim());
        let playlists = query_as::<_, Playlist>(
            "SELECT * FROM playlists WHERE type = ? AND name LIKE ? ORDER BY name ASC",
        )
        .bind(PlaylistType::Local)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(playlists)
    }

    async fn insert(&self, playlist: &Playlist) -> Result<()> {
        playlist
            .validate()
            .map_err(|e| LibraryError::invalid("Playlist", e))?;

        query(
            r#"
            INSERT INTO playlists (id, name, source_uri, type, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&playlist.id)
        .bind(&playlist.name)
        .bind(&playlist.source_uri)
        .bind(playlist.playlist_type)
        .bind(playlist.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_song(&self, playlist_id: &str, song_id: &str) -> Result<bool> {
        let result = query(
            "INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id, added_at) VALUES (?, ?, ?)",
        )
        .bind(playlist_id)
        .bind(song_id)
        .bind(self.clock.unix_timestamp_millis())
        .execute(&self.pool)
        .await?;

        let added = result.rows_affected() > 0;
        debug!(playlist_id, song_id, added, "playlist membership written");
        Ok(added)
    }

    async fn remove_song(&self, playlist_id: &str, song_id: &str) -> Result<bool> {
        let result = query("DELETE FROM playlist_songs WHERE playlist_id = ? AND song_id = ?")
            .bind(playlist_id)
            .bind(song_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn songs_in(&self, playlist_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = query_as(
            r#"
            SELECT song_id FROM playlist_songs
            WHERE playlist_id = ?
            ORDER BY added_at DESC, rowid DESC
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn contains_song(&self, playlist_id: &str, song_id: &str) -> Result<bool> {
        let (count,): (i64,) =
            query_as("SELECT COUNT(*) FROM playlist_songs WHERE playlist_id = ? AND song_id = ?")
                .bind(playlist_id)
                .bind(song_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM playlists")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::Song;
    use crate::repositories::{SongRepository, SqliteSongRepository};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock that advances one second per reading.
    struct SteppingClock(AtomicI64);

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let secs = self.0.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
        }
    }

    async fn setup() -> (SqlitePlaylistRepository, SqliteSongRepository) {
        let pool = create_test_pool().await.unwrap();
        let clock = Arc::new(SteppingClock(AtomicI64::new(1_700_000_000)));
        (
            SqlitePlaylistRepository::with_clock(pool.clone(), clock),
            SqliteSongRepository::new(pool),
        )
    }

    async fn cached_song(songs: &SqliteSongRepository, uri: &str) -> Song {
        songs
            .upsert_by_uri(&Song::new(uri.to_string(), uri.to_string()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_internal_playlists_exist() {
        let (playlists, _) = setup().await;

        let liked = playlists.find_internal(InternalPlaylist::Liked).await.unwrap();
        let recent = playlists.find_internal(InternalPlaylist::Recent).await.unwrap();

        assert!(liked.is_internal());
        assert_eq!(recent.name, "recent");
        assert_ne!(liked.id, recent.id);
    }

    #[tokio::test]
    async fn test_second_internal_playlist_with_same_name_rejected() {
        let (playlists, _) = setup().await;

        let duplicate = Playlist::new("liked".to_string(), PlaylistType::Internal);
        let result = playlists.insert(&duplicate).await;
        assert!(matches!(result, Err(LibraryError::Database(_))));

        // A local playlist may reuse the name.
        let local = Playlist::new("liked".to_string(), PlaylistType::Local);
        playlists.insert(&local).await.unwrap();
        assert_eq!(playlists.find_local_by_name("lik").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_membership_is_unique_and_newest_first() {
        let (playlists, songs) = setup().await;
        let recent = playlists.find_internal(InternalPlaylist::Recent).await.unwrap();

        let a = cached_song(&songs, "https://example.com/watch?v=a").await;
        let b = cached_song(&songs, "https://example.com/watch?v=b").await;

        assert!(playlists.add_song(&recent.id, &a.id).await.unwrap());
        assert!(playlists.add_song(&recent.id, &b.id).await.unwrap());
        assert!(!playlists.add_song(&recent.id, &a.id).await.unwrap());

        let ids = playlists.songs_in(&recent.id).await.unwrap();
        assert_eq!(ids, vec![b.id.clone(), a.id.clone()]);

        let joined = songs.songs_with_artists(&recent.id).await.unwrap();
        assert_eq!(joined[0].song.id, b.id);
    }

    #[tokio::test]
    async fn test_remove_song() {
        let (playlists, songs) = setup().await;
        let liked = playlists.find_internal(InternalPlaylist::Liked).await.unwrap();
        let song = cached_song(&songs, "https://example.com/watch?v=r").await;

        playlists.add_song(&liked.id, &song.id).await.unwrap();
        assert!(playlists.contains_song(&liked.id, &song.id).await.unwrap());

        assert!(playlists.remove_song(&liked.id, &song.id).await.unwrap());
        assert!(!playlists.remove_song(&liked.id, &song.id).await.unwrap());
        assert!(playlists.songs_in(&liked.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_local_and_well_known_ids() {
        let (playlists, _) = setup().await;
        let before = playlists.count().await.unwrap();

        let created = playlists
            .create_local(" Focus ", Some("https://example.com/playlist?list=PL1"))
            .await
            .unwrap();
        assert_eq!(created.name, "Focus");
        assert_eq!(created.playlist_type, PlaylistType::Local);
        assert_eq!(playlists.count().await.unwrap(), before + 1);

        let recent = playlists.recent_playlist_id().await.unwrap();
        let liked = playlists.liked_playlist_id().await.unwrap();
        assert_eq!(
            playlists.find_by_id(&recent).await.unwrap().map(|p| p.name),
            Some("recent".to_string())
        );
        assert_ne!(recent, liked);
    }

    #[tokio::test]
    async fn test_find_by_id_roundtrips_type_and_source() {
        let (playlists, _) = setup().await;
        let album = Playlist::new("Discovery".to_string(), PlaylistType::Album)
            .with_source_uri("https://example.com/playlist?list=OLAK");
        playlists.insert(&album).await.unwrap();

        let found = playlists.find_by_id(&album.id).await.unwrap().unwrap();
        assert_eq!(found, album);
    }
}

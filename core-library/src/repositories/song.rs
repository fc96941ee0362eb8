//! Song repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Artist, Song, SongWithArtists};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

#[async_trait]
pub trait SongRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Song>>;

    async fn find_by_uri(&self, uri: &str) -> Result<Option<Song>>;

    /// Insert `song` unless a song with the same URI exists.
    ///
    /// # Returns
    /// The stored row: the existing one when the URI was already cached,
    /// otherwise `song` itself.
    async fn upsert_by_uri(&self, song: &Song) -> Result<Song>;

    /// Credit `artist_id` on `song_id` at `position`.
    ///
    /// # Returns
    /// `Ok(false)` when the credit already existed.
    async fn link_artist(&self, song_id: &str, artist_id: &str, position: i64) -> Result<bool>;

    /// Artists credited on a song, in credit order
    async fn artists_for(&self, song_id: &str) -> Result<Vec<Artist>>;

    /// Songs of a playlist with their artists, most recently added first
    async fn songs_with_artists(&self, playlist_id: &str) -> Result<Vec<SongWithArtists>>;

    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of SongRepository
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Song>> {
        let song = query_as::<_, Song>("SELECT * FROM songs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(song)
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Option<Song>> {
        let song = query_as::<_, Song>("SELECT * FROM songs WHERE uri = ?")
            .bind(uri)
            .fetch_optional(&self.pool)
            .await?;

        Ok(song)
    }

    async fn upsert_by_uri(&self, song: &Song) -> Result<Song> {
        song.validate()
            .map_err(|e| LibraryError::invalid("Song", e))?;

        query(
            r#"
            INSERT INTO songs (id, title, uri, artwork_uri, duration_ms, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(uri) DO NOTHING
            "#,
        )
        .bind(&song.id)
        .bind(&song.title)
        .bind(&song.uri)
        .bind(&song.artwork_uri)
        .bind(song.duration_ms)
        .bind(song.created_at)
        .execute(&self.pool)
        .await?;

        self.find_by_uri(&song.uri)
            .await?
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Song".to_string(),
                id: song.uri.clone(),
            })
    }

    async fn link_artist(&self, song_id: &str, artist_id: &str, position: i64) -> Result<bool> {
        let result = query(
            "INSERT OR IGNORE INTO song_artists (song_id, artist_id, position) VALUES (?, ?, ?)",
        )
        .bind(song_id)
        .bind(artist_id)
        .bind(position)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn artists_for(&self, song_id: &str) -> Result<Vec<Artist>> {
        let artists = query_as::<_, Artist>(
            r#"
            SELECT a.* FROM artists a
            INNER JOIN song_artists sa ON sa.artist_id = a.id
            WHERE sa.song_id = ?
            ORDER BY sa.position ASC, a.name ASC
            "#,
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(artists)
    }

    async fn songs_with_artists(&self, playlist_id: &str) -> Result<Vec<SongWithArtists>> {
        let songs = query_as::<_, Song>(
            r#"
            SELECT s.* FROM songs s
            INNER JOIN playlist_songs ps ON ps.song_id = s.id
            WHERE ps.playlist_id = ?
            ORDER BY ps.added_at DESC, ps.rowid DESC
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        let mut joined = Vec::with_capacity(songs.len());
        for song in songs {
            let artists = self.artists_for(&song.id).await?;
            joined.push(SongWithArtists { song, artists });
        }

        Ok(joined)
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

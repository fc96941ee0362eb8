//! Artist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Artist;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

#[async_trait]
pub trait ArtistRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>>;

    /// Find an artist by exact name
    async fn find_by_name(&self, name: &str) -> Result<Option<Artist>>;

    /// Return the artist with this name, inserting it first when missing.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a blank name.
    async fn find_or_create(&self, name: &str) -> Result<Artist>;

    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of ArtistRepository
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn find_or_create(&self, name: &str) -> Result<Artist> {
        let candidate = Artist::new(name.trim().to_string());
        candidate
            .validate()
            .map_err(|e| LibraryError::invalid("Artist", e))?;

        // The unique name constraint makes a concurrent insert of the same
        // artist fall through to the select below.
        query("INSERT INTO artists (id, name, created_at) VALUES (?, ?, ?) ON CONFLICT(name) DO NOTHING")
            .bind(&candidate.id)
            .bind(&candidate.name)
            .bind(candidate.created_at)
            .execute(&self.pool)
            .await?;

        self.find_by_name(&candidate.name)
            .await?
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Artist".to_string(),
                id: candidate.name.clone(),
            })
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM artists")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteArtistRepository::new(pool);

        let first = repo.find_or_create("Daft Punk").await.unwrap();
        let second = repo.find_or_create("Daft Punk").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_or_create_trims_name() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteArtistRepository::new(pool);

        let artist = repo.find_or_create("  Air ").await.unwrap();
        assert_eq!(artist.name, "Air");
        assert!(repo.find_by_name("Air").await.unwrap().is_some());
        assert_eq!(
            repo.find_by_id(&artist.id).await.unwrap().map(|a| a.name),
            Some("Air".to_string())
        );
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteArtistRepository::new(pool);

        let result = repo.find_or_create("   ").await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}

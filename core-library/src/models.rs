//! Domain models for the local library
//!
//! Rows are keyed by UUID strings. Timestamps are Unix seconds.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

// =============================================================================
// Playlists
// =============================================================================

/// Origin of a playlist row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlaylistType {
    /// Album imported from a remote source
    Album,
    /// Public remote playlist
    Public,
    /// Created by the user on this device
    Local,
    /// Maintained by the application itself ("liked", "recent")
    Internal,
}

impl PlaylistType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistType::Album => "album",
            PlaylistType::Public => "public",
            PlaylistType::Local => "local",
            PlaylistType::Internal => "internal",
        }
    }
}

impl fmt::Display for PlaylistType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The well-known internal playlists seeded by the migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalPlaylist {
    Liked,
    Recent,
}

impl InternalPlaylist {
    pub fn name(&self) -> &'static str {
        match self {
            InternalPlaylist::Liked => "liked",
            InternalPlaylist::Recent => "recent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    /// Remote page this playlist was imported from, if any
    pub source_uri: Option<String>,
    #[sqlx(rename = "type")]
    pub playlist_type: PlaylistType,
    pub created_at: i64,
}

impl Playlist {
    pub fn new(name: String, playlist_type: PlaylistType) -> Self {
        Self {
            id: new_id(),
            name,
            source_uri: None,
            playlist_type,
            created_at: now_secs(),
        }
    }

    pub fn with_source_uri(mut self, source_uri: impl Into<String>) -> Self {
        self.source_uri = Some(source_uri.into());
        self
    }

    pub fn is_internal(&self) -> bool {
        self.playlist_type == PlaylistType::Internal
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }

        if self.playlist_type == PlaylistType::Internal && self.source_uri.is_some() {
            return Err("Internal playlists have no source".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Songs and artists
// =============================================================================

/// A cached song. `uri` is the source page address and is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub uri: String,
    pub artwork_uri: Option<String>,
    pub duration_ms: i64,
    pub created_at: i64,
}

impl Song {
    pub fn new(title: String, uri: String) -> Self {
        Self {
            id: new_id(),
            title,
            uri,
            artwork_uri: None,
            duration_ms: 0,
            created_at: now_secs(),
        }
    }

    pub fn with_artwork_uri(mut self, artwork_uri: Option<String>) -> Self {
        self.artwork_uri = artwork_uri;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.uri.trim().is_empty() {
            return Err("Song uri cannot be empty".to_string());
        }

        if self.duration_ms < 0 {
            return Err("Song duration cannot be negative".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

impl Artist {
    pub fn new(name: String) -> Self {
        Self {
            id: new_id(),
            name,
            created_at: now_secs(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Artist name cannot be empty".to_string());
        }
        Ok(())
    }
}

/// A song joined with its credited artists, in credit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongWithArtists {
    pub song: Song,
    pub artists: Vec<Artist>,
}

impl SongWithArtists {
    /// Artist names joined for display, e.g. `"A, B"`.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! - `PlaylistRepository` - playlists and their song membership
//! - `SongRepository` - songs, upserted by source URI, and their artist credits
//! - `ArtistRepository` - artists, unique by name
//!
//! Songs, artists and playlists are never updated in place; writes either
//! insert a new row or return the one already stored.

pub mod artist;
pub mod playlist;
pub mod song;

pub use artist::{ArtistRepository, SqliteArtistRepository};
pub use playlist::{PlaylistRepository, SqlitePlaylistRepository};
pub use song::{SongRepository, SqliteSongRepository};

//! # Library Module
//!
//! Local persistence for the player: cached songs, their artists, and the
//! playlists that reference them.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite schema and migrations, including the internal "liked" and
//!   "recent" playlists created at bootstrap
//! - Repository traits with `sqlx` implementations
//!
//! Rows are only ever inserted. A song is identified by its source URI, so
//! writing the same item twice returns the existing row instead of creating
//! a duplicate.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{Artist, InternalPlaylist, Playlist, PlaylistType, Song, SongWithArtists};
pub use repositories::{
    ArtistRepository, PlaylistRepository, SongRepository, SqliteArtistRepository,
    SqlitePlaylistRepository, SqliteSongRepository,
};

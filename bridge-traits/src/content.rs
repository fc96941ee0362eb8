//! Content resolution contract.
//!
//! A [`ContentResolver`] turns opaque page URIs and free-text queries into
//! stream metadata. It is typically backed by a scraping/extraction library
//! that needs one-time global setup, exposed here as
//! [`ContentResolver::initialize`].

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content a resolved entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfoType {
    Stream,
    Playlist,
    Channel,
    Comment,
}

impl InfoType {
    /// Label shown next to search results.
    pub fn label(self) -> &'static str {
        match self {
            InfoType::Stream => "Song",
            InfoType::Playlist => "Album",
            InfoType::Channel => "Artist",
            InfoType::Comment => "Comment",
        }
    }
}

impl fmt::Display for InfoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One playable audio rendition of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStream {
    pub content_url: String,
    pub mime_type: Option<String>,
    pub bitrate_kbps: Option<u32>,
}

impl AudioStream {
    pub fn new(content_url: impl Into<String>) -> Self {
        Self {
            content_url: content_url.into(),
            mime_type: None,
            bitrate_kbps: None,
        }
    }
}

/// Metadata of a resolved stream or playlist entry.
///
/// Playlist entries come back without audio streams; they must be resolved
/// individually through [`ContentResolver::resolve_stream`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Page URI of the entry
    pub url: String,
    pub name: String,
    pub uploader_name: Option<String>,
    pub info_type: InfoType,
    /// Thumbnail URLs ordered by ascending resolution
    pub thumbnails: Vec<String>,
    pub duration_ms: Option<u64>,
    pub audio_streams: Vec<AudioStream>,
}

impl StreamInfo {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            uploader_name: None,
            info_type: InfoType::Stream,
            thumbnails: Vec::new(),
            duration_ms: None,
            audio_streams: Vec::new(),
        }
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader_name = Some(uploader.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnails.push(thumbnail.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_audio_stream(mut self, stream: AudioStream) -> Self {
        self.audio_streams.push(stream);
        self
    }

    /// Highest resolution thumbnail.
    pub fn best_thumbnail(&self) -> Option<&str> {
        self.thumbnails.last().map(String::as_str)
    }
}

/// Entry returned by a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub name: String,
    pub uploader_name: Option<String>,
    pub info_type: InfoType,
    pub thumbnails: Vec<String>,
    pub duration_ms: Option<u64>,
}

impl SearchResult {
    pub fn best_thumbnail(&self) -> Option<&str> {
        self.thumbnails.last().map(String::as_str)
    }
}

/// One-time setup options for the resolver backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Whether the user accepted the content provider's consent prompt.
    pub consent_accepted: bool,
    /// BCP-47 language tag for localized results.
    pub localization: Option<String>,
    /// ISO country code for region-specific results.
    pub content_country: Option<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            consent_accepted: true,
            localization: None,
            content_country: None,
        }
    }
}

/// Turns content references into stream metadata.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Perform global backend setup. Callers guarantee a single successful
    /// invocation per resolver.
    async fn initialize(&self, options: &ResolverOptions) -> Result<()>;

    /// Resolve a single stream page, including its audio streams.
    async fn resolve_stream(&self, uri: &str) -> Result<StreamInfo>;

    /// List the entries of a playlist page.
    async fn resolve_playlist(&self, uri: &str) -> Result<Vec<StreamInfo>>;

    /// List the entries of an automatically generated related/mix playlist.
    async fn resolve_related(&self, uri: &str) -> Result<Vec<StreamInfo>>;

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_type_labels() {
        assert_eq!(InfoType::Stream.label(), "Song");
        assert_eq!(InfoType::Playlist.label(), "Album");
        assert_eq!(InfoType::Channel.label(), "Artist");
        assert_eq!(InfoType::Comment.to_string(), "Comment");
    }

    #[test]
    fn best_thumbnail_is_last() {
        let info = StreamInfo::new("https://example.com/watch?v=a", "A")
            .with_thumbnail("small.jpg")
            .with_thumbnail("large.jpg");
        assert_eq!(info.best_thumbnail(), Some("large.jpg"));

        let bare = StreamInfo::new("https://example.com/watch?v=b", "B");
        assert_eq!(bare.best_thumbnail(), None);
    }

    #[test]
    fn info_type_serializes_as_variant_name() {
        let json = serde_json::to_string(&InfoType::Playlist).unwrap();
        assert_eq!(json, "\"Playlist\"");
    }
}

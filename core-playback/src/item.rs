//! Playable items and their mapping to engine media items.

use crate::error::{PlaybackError, Result};
use bridge_traits::content::{InfoType, SearchResult, StreamInfo};
use bridge_traits::engine::{MediaItem, MediaMetadata};
use serde::{Deserialize, Serialize};

/// A resolved piece of content as the UI and the session see it.
///
/// `media_uri` is what the engine plays: the audio stream URL after
/// resolution, or the page URL for search results and cached songs that
/// still need resolving. `source_uri` is always the page URL when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableItem {
    pub title: String,
    pub artist: String,
    pub info_type: InfoType,
    pub thumbnail_uri: Option<String>,
    pub media_uri: Option<String>,
    pub duration_ms: Option<u64>,
    pub source_uri: Option<String>,
}

/// Outcome of resolving one item within a batch.
pub type ItemResult = std::result::Result<PlayableItem, PlaybackError>;

/// Display artist from an uploader name such as `"Artist - Topic"`.
pub fn artist_from_uploader(uploader: Option<&str>) -> String {
    let uploader = uploader.unwrap_or_default();
    uploader
        .split(" - ")
        .next()
        .unwrap_or(uploader)
        .trim()
        .to_string()
}

impl PlayableItem {
    pub fn new(title: impl Into<String>, info_type: InfoType) -> Self {
        Self {
            title: title.into(),
            artist: String::new(),
            info_type,
            thumbnail_uri: None,
            media_uri: None,
            duration_ms: None,
            source_uri: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_media_uri(mut self, uri: impl Into<String>) -> Self {
        self.media_uri = Some(uri.into());
        self
    }

    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }

    pub fn with_thumbnail_uri(mut self, uri: Option<String>) -> Self {
        self.thumbnail_uri = uri;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: Option<u64>) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Build a playable item from a resolved stream.
    ///
    /// # Errors
    /// `NoAudioStream` when the stream offers no audio.
    pub fn from_stream_info(info: &StreamInfo) -> Result<Self> {
        let audio = info
            .audio_streams
            .first()
            .ok_or_else(|| PlaybackError::NoAudioStream(info.url.clone()))?;

        Ok(Self::new(info.name.clone(), info.info_type)
            .with_artist(artist_from_uploader(info.uploader_name.as_deref()))
            .with_thumbnail_uri(info.best_thumbnail().map(str::to_string))
            .with_media_uri(audio.content_url.clone())
            .with_source_uri(info.url.clone())
            .with_duration_ms(info.duration_ms))
    }

    /// Build an unresolved item from a search hit. Its `media_uri` is the
    /// page URL.
    pub fn from_search_result(result: &SearchResult) -> Self {
        Self::new(result.name.clone(), result.info_type)
            .with_artist(artist_from_uploader(result.uploader_name.as_deref()))
            .with_thumbnail_uri(result.best_thumbnail().map(str::to_string))
            .with_media_uri(result.url.clone())
            .with_source_uri(result.url.clone())
            .with_duration_ms(result.duration_ms)
    }

    /// Engine representation. The media id is the page URL so that the
    /// item can be resolved again; the item URI is what the engine plays.
    ///
    /// Returns `None` when there is nothing to play.
    pub fn to_media_item(&self) -> Option<MediaItem> {
        let uri = self.media_uri.clone()?;
        let media_id = self.source_uri.clone().unwrap_or_else(|| uri.clone());

        Some(MediaItem::new(media_id).with_uri(uri).with_metadata(MediaMetadata {
            title: Some(self.title.clone()),
            artist: Some(self.artist.clone()),
            artwork_uri: self.thumbnail_uri.clone(),
            duration_ms: self.duration_ms,
        }))
    }

    /// Inverse of [`PlayableItem::to_media_item`].
    pub fn from_media_item(item: &MediaItem) -> Self {
        let metadata = &item.metadata;
        Self {
            title: metadata.title.clone().unwrap_or_default(),
            artist: metadata.artist.clone().unwrap_or_default(),
            info_type: InfoType::Stream,
            thumbnail_uri: metadata.artwork_uri.clone(),
            media_uri: item.uri.clone().or_else(|| Some(item.media_id.clone())),
            duration_ms: metadata.duration_ms,
            source_uri: Some(item.media_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::content::AudioStream;

    fn stream() -> StreamInfo {
        StreamInfo::new("https://music.example.com/watch?v=abc", "Song A")
            .with_uploader("Band - Topic")
            .with_thumbnail("small.jpg")
            .with_thumbnail("large.jpg")
            .with_duration_ms(200_000)
            .with_audio_stream(AudioStream::new("https://cdn.example.com/a.webm?sig=1"))
            .with_audio_stream(AudioStream::new("https://cdn.example.com/a.m4a"))
    }

    #[test]
    fn test_from_stream_info_picks_first_audio_and_largest_thumbnail() {
        let item = PlayableItem::from_stream_info(&stream()).unwrap();

        assert_eq!(item.title, "Song A");
        assert_eq!(item.artist, "Band");
        assert_eq!(item.thumbnail_uri.as_deref(), Some("large.jpg"));
        assert_eq!(item.media_uri.as_deref(), Some("https://cdn.example.com/a.webm?sig=1"));
        assert_eq!(item.source_uri.as_deref(), Some("https://music.example.com/watch?v=abc"));
        assert_eq!(item.duration_ms, Some(200_000));
    }

    #[test]
    fn test_stream_without_audio_is_an_error() {
        let info = StreamInfo::new("https://music.example.com/watch?v=x", "Video only");
        let result = PlayableItem::from_stream_info(&info);
        assert!(matches!(result, Err(PlaybackError::NoAudioStream(uri)) if uri.ends_with("v=x")));
    }

    #[test]
    fn test_artist_from_uploader() {
        assert_eq!(artist_from_uploader(Some("Solo")), "Solo");
        assert_eq!(artist_from_uploader(Some("A - B - C")), "A");
        assert_eq!(artist_from_uploader(None), "");
    }

    #[test]
    fn test_media_item_keeps_page_and_stream_urls() {
        let item = PlayableItem::from_stream_info(&stream()).unwrap();
        let media = item.to_media_item().unwrap();

        assert_eq!(media.media_id, "https://music.example.com/watch?v=abc");
        assert_eq!(media.uri.as_deref(), Some("https://cdn.example.com/a.webm?sig=1"));

        let back = PlayableItem::from_media_item(&media);
        assert_eq!(back, item);
    }

    #[test]
    fn test_item_without_media_uri_is_not_playable() {
        let item = PlayableItem::new("Channel", InfoType::Channel);
        assert!(item.to_media_item().is_none());
    }

    #[test]
    fn test_search_result_uses_page_url() {
        let hit = SearchResult {
            url: "https://music.example.com/playlist?list=PL".into(),
            name: "Album".into(),
            uploader_name: Some("Band".into()),
            info_type: InfoType::Playlist,
            thumbnails: vec!["t.jpg".into()],
            duration_ms: None,
        };
        let item = PlayableItem::from_search_result(&hit);
        assert_eq!(item.media_uri.as_deref(), Some("https://music.example.com/playlist?list=PL"));
        assert_eq!(item.info_type, InfoType::Playlist);
    }
}

//! # Playback Error Types
//!
//! Errors raised while resolving content, parsing session commands, and
//! talking to a playback session.

use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

/// Errors that can occur during playback orchestration.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// Content reference could not be turned into a playable item.
    #[error("Failed to resolve {uri}: {message}")]
    Resolution { uri: String, message: String },

    /// The resolved stream carries no audio stream to play.
    #[error("No audio stream available for {0}")]
    NoAudioStream(String),

    /// Remote resolution is disabled.
    #[error("Content resolution is unavailable in offline mode")]
    Offline,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument '{argument}' for {action}")]
    MissingArgument { action: String, argument: String },

    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    // ========================================================================
    // Session Errors
    // ========================================================================
    #[error("Playback session released")]
    SessionReleased,

    #[error("Not connected to a playback session")]
    NotConnected,

    #[error("Failed to connect to playback session: {0}")]
    ConnectionFailed(String),

    // ========================================================================
    // Wrapped Errors
    // ========================================================================
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

impl PlaybackError {
    pub(crate) fn resolution(uri: &str, source: impl std::fmt::Display) -> Self {
        PlaybackError::Resolution {
            uri: uri.to_string(),
            message: source.to_string(),
        }
    }

    /// Returns `true` if the failed operation may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::Resolution { .. }
                | PlaybackError::ConnectionFailed(_)
                | PlaybackError::Bridge(BridgeError::NotAvailable(_))
        )
    }

    /// Returns `true` if the error came from a malformed command.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::UnknownCommand(_)
                | PlaybackError::MissingArgument { .. }
                | PlaybackError::InvalidArgument { .. }
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(PlaybackError::resolution("u", "timeout").is_transient());
        assert!(PlaybackError::Bridge(BridgeError::NotAvailable("net".into())).is_transient());
        assert!(!PlaybackError::Offline.is_transient());
        assert!(!PlaybackError::UnknownCommand("x".into()).is_transient());
    }

    #[test]
    fn test_protocol_classification() {
        let missing = PlaybackError::MissingArgument {
            action: "enqueue_uri".into(),
            argument: "uri".into(),
        };
        assert!(missing.is_protocol_error());
        assert_eq!(missing.to_string(), "Missing argument 'uri' for enqueue_uri");
        assert!(!PlaybackError::NotConnected.is_protocol_error());
    }
}

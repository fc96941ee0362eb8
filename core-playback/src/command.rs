//! # Session Command Protocol
//!
//! Controllers talk to a playback session with two kinds of commands:
//!
//! - [`TransportCommand`]s, which map one to one onto engine primitives
//! - [`CustomCommand`]s, an action name plus string-keyed arguments, parsed
//!   into a typed [`SessionCommand`] by the session
//!
//! Every command yields a [`SessionResult`]. An unrecognised custom action is
//! always answered with [`ResultCode::UnknownCommand`].

use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Custom action names.
pub mod actions {
    pub const LOAD_STREAM_URI: &str = "load_stream_uri";
    pub const LOAD_PLAYLIST_URI: &str = "load_playlist_uri";
    pub const ENQUEUE_URI: &str = "enqueue_uri";
    pub const ENQUEUE_NEXT_URI: &str = "enqueue_next_uri";
    pub const ENQUEUE_PLAYLIST_URI: &str = "enqueue_playlist_uri";
    pub const START_RADIO: &str = "start_radio";
    pub const SEEK_TO_PERCENTAGE: &str = "seek_to_percentage";

    pub const ALL: [&str; 7] = [
        LOAD_STREAM_URI,
        LOAD_PLAYLIST_URI,
        ENQUEUE_URI,
        ENQUEUE_NEXT_URI,
        ENQUEUE_PLAYLIST_URI,
        START_RADIO,
        SEEK_TO_PERCENTAGE,
    ];
}

/// Argument keys.
pub mod keys {
    pub const URI: &str = "uri";
    pub const PLAY_WHEN_READY: &str = "play_when_ready";
    pub const VALUE: &str = "value";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Str(String),
    Bool(bool),
    Float(f64),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCommand {
    pub action: String,
    #[serde(default)]
    pub args: HashMap<String, ArgValue>,
}

impl CustomCommand {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            args: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<ArgValue>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    fn required_uri(&self) -> Result<String, PlaybackError> {
        match self.args.get(keys::URI) {
            Some(ArgValue::Str(uri)) if !uri.trim().is_empty() => Ok(uri.clone()),
            Some(ArgValue::Str(_)) | None => Err(PlaybackError::MissingArgument {
                action: self.action.clone(),
                argument: keys::URI.to_string(),
            }),
            Some(other) => Err(PlaybackError::InvalidArgument {
                argument: keys::URI.to_string(),
                message: format!("expected a string, got {other:?}"),
            }),
        }
    }

    fn play_when_ready(&self) -> Result<bool, PlaybackError> {
        match self.args.get(keys::PLAY_WHEN_READY) {
            None => Ok(false),
            Some(ArgValue::Bool(flag)) => Ok(*flag),
            Some(ArgValue::Str(s)) => s.parse().map_err(|_| PlaybackError::InvalidArgument {
                argument: keys::PLAY_WHEN_READY.to_string(),
                message: format!("'{s}' is not a boolean"),
            }),
            Some(other) => Err(PlaybackError::InvalidArgument {
                argument: keys::PLAY_WHEN_READY.to_string(),
                message: format!("expected a boolean, got {other:?}"),
            }),
        }
    }

    fn value(&self) -> Result<f64, PlaybackError> {
        let invalid = |message: String| PlaybackError::InvalidArgument {
            argument: keys::VALUE.to_string(),
            message,
        };
        match self.args.get(keys::VALUE) {
            Some(ArgValue::Float(value)) => Ok(*value),
            Some(ArgValue::Str(s)) => s
                .trim()
                .parse()
                .map_err(|_| invalid(format!("'{s}' is not a number"))),
            Some(ArgValue::Bool(b)) => Err(invalid(format!("expected a number, got {b}"))),
            None => Err(PlaybackError::MissingArgument {
                action: self.action.clone(),
                argument: keys::VALUE.to_string(),
            }),
        }
    }
}

/// A parsed custom command.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    LoadStream { uri: String, play_when_ready: bool },
    LoadPlaylist { uri: String, play_when_ready: bool },
    Enqueue { uri: String },
    EnqueueNext { uri: String },
    EnqueuePlaylist { uri: String },
    StartRadio { seed_uri: String },
    /// Fraction of the current item's duration. Range checking happens at
    /// dispatch so the caller gets `BadValue`.
    SeekToPercentage { value: f64 },
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            SessionCommand::LoadStream { .. } => actions::LOAD_STREAM_URI,
            SessionCommand::LoadPlaylist { .. } => actions::LOAD_PLAYLIST_URI,
            SessionCommand::Enqueue { .. } => actions::ENQUEUE_URI,
            SessionCommand::EnqueueNext { .. } => actions::ENQUEUE_NEXT_URI,
            SessionCommand::EnqueuePlaylist { .. } => actions::ENQUEUE_PLAYLIST_URI,
            SessionCommand::StartRadio { .. } => actions::START_RADIO,
            SessionCommand::SeekToPercentage { .. } => actions::SEEK_TO_PERCENTAGE,
        }
    }

    pub fn uri(&self) -> Option<&str> {
        match self {
            SessionCommand::LoadStream { uri, .. }
            | SessionCommand::LoadPlaylist { uri, .. }
            | SessionCommand::Enqueue { uri }
            | SessionCommand::EnqueueNext { uri }
            | SessionCommand::EnqueuePlaylist { uri } => Some(uri),
            SessionCommand::StartRadio { seed_uri } => Some(seed_uri),
            SessionCommand::SeekToPercentage { .. } => None,
        }
    }
}

impl TryFrom<&CustomCommand> for SessionCommand {
    type Error = PlaybackError;

    fn try_from(command: &CustomCommand) -> Result<Self, Self::Error> {
        let parsed = match command.action.as_str() {
            actions::LOAD_STREAM_URI => SessionCommand::LoadStream {
                uri: command.required_uri()?,
                play_when_ready: command.play_when_ready()?,
            },
            actions::LOAD_PLAYLIST_URI => SessionCommand::LoadPlaylist {
                uri: command.required_uri()?,
                play_when_ready: command.play_when_ready()?,
            },
            actions::ENQUEUE_URI => SessionCommand::Enqueue {
                uri: command.required_uri()?,
            },
            actions::ENQUEUE_NEXT_URI => SessionCommand::EnqueueNext {
                uri: command.required_uri()?,
            },
            actions::ENQUEUE_PLAYLIST_URI => SessionCommand::EnqueuePlaylist {
                uri: command.required_uri()?,
            },
            actions::START_RADIO => SessionCommand::StartRadio {
                seed_uri: command.required_uri()?,
            },
            actions::SEEK_TO_PERCENTAGE => SessionCommand::SeekToPercentage {
                value: command.value()?,
            },
            other => return Err(PlaybackError::UnknownCommand(other.to_string())),
        };
        Ok(parsed)
    }
}

impl From<SessionCommand> for CustomCommand {
    fn from(command: SessionCommand) -> Self {
        let custom = CustomCommand::new(command.action());
        match command {
            SessionCommand::LoadStream {
                uri,
                play_when_ready,
            }
            | SessionCommand::LoadPlaylist {
                uri,
                play_when_ready,
            } => custom
                .with_arg(keys::URI, uri)
                .with_arg(keys::PLAY_WHEN_READY, play_when_ready),
            SessionCommand::Enqueue { uri }
            | SessionCommand::EnqueueNext { uri }
            | SessionCommand::EnqueuePlaylist { uri }
            | SessionCommand::StartRadio { seed_uri: uri } => custom.with_arg(keys::URI, uri),
            SessionCommand::SeekToPercentage { value } => custom.with_arg(keys::VALUE, value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportCommand {
    Play,
    Pause,
    /// Pause while playing, play otherwise.
    PlayPause,
    Stop,
    SkipNext,
    SkipPrevious,
    /// Absolute position in the current item, in milliseconds.
    SeekTo(u64),
    /// Start the queue item at this index from its beginning.
    SkipTo(usize),
}

impl TransportCommand {
    /// One command of every kind. Arguments are placeholders.
    pub const ALL: [TransportCommand; 8] = [
        TransportCommand::Play,
        TransportCommand::Pause,
        TransportCommand::PlayPause,
        TransportCommand::Stop,
        TransportCommand::SkipNext,
        TransportCommand::SkipPrevious,
        TransportCommand::SeekTo(0),
        TransportCommand::SkipTo(0),
    ];

    /// Whether both commands are of the same kind, ignoring arguments.
    pub fn same_kind(&self, other: &TransportCommand) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    UnknownCommand,
    BadValue,
    NotSupported,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionResult {
    Success,
    Error(ResultCode),
}

impl SessionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionResult::Success)
    }
}

impl From<&PlaybackError> for ResultCode {
    fn from(error: &PlaybackError) -> Self {
        match error {
            PlaybackError::UnknownCommand(_) => ResultCode::UnknownCommand,
            PlaybackError::MissingArgument { .. } | PlaybackError::InvalidArgument { .. } => {
                ResultCode::BadValue
            }
            PlaybackError::SessionReleased | PlaybackError::NotConnected => {
                ResultCode::Disconnected
            }
            _ => ResultCode::NotSupported,
        }
    }
}

impl From<&PlaybackError> for SessionResult {
    fn from(error: &PlaybackError) -> Self {
        SessionResult::Error(ResultCode::from(error))
    }
}

/// Capability set granted to a connected controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCommands {
    transport: Vec<TransportCommand>,
    custom: Vec<String>,
}

impl SessionCommands {
    /// All transport commands plus every custom action this crate handles.
    pub fn session_defaults() -> Self {
        Self {
            transport: TransportCommand::ALL.to_vec(),
            custom: actions::ALL.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn supports_transport(&self, command: TransportCommand) -> bool {
        self.transport.iter().any(|granted| granted.same_kind(&command))
    }

    pub fn supports_custom(&self, action: &str) -> bool {
        self.custom.iter().any(|a| a == action)
    }

    pub fn custom_actions(&self) -> impl Iterator<Item = &str> {
        self.custom.iter().map(String::as_str)
    }
}

impl Default for SessionCommands {
    fn default() -> Self {
        Self::session_defaults()
    }
}

/// Numeric transport codes used by notification actions and older launch
/// intents. Codes outside the table read as [`PlayerCmd::Unset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCmd {
    PlayPause = 0,
    Next = 1,
    Prev = 2,
    Stop = 3,
    SeekTo = 4,
    Unset = 5,
}

impl From<i32> for PlayerCmd {
    fn from(value: i32) -> Self {
        match value {
            0 => PlayerCmd::PlayPause,
            1 => PlayerCmd::Next,
            2 => PlayerCmd::Prev,
            3 => PlayerCmd::Stop,
            4 => PlayerCmd::SeekTo,
            _ => PlayerCmd::Unset,
        }
    }
}

impl PlayerCmd {
    /// The transport command this code stands for. `Unset` maps to nothing.
    ///
    /// # Errors
    /// `SeekTo` without a position is a `MissingArgument`; a negative
    /// position is an `InvalidArgument`.
    pub fn to_transport(
        self,
        position_ms: Option<i64>,
    ) -> Result<Option<TransportCommand>, PlaybackError> {
        let command = match self {
            PlayerCmd::PlayPause => TransportCommand::PlayPause,
            PlayerCmd::Next => TransportCommand::SkipNext,
            PlayerCmd::Prev => TransportCommand::SkipPrevious,
            PlayerCmd::Stop => TransportCommand::Stop,
            PlayerCmd::SeekTo => {
                let position = position_ms.ok_or_else(|| PlaybackError::MissingArgument {
                    action: self.to_string(),
                    argument: "position".to_string(),
                })?;
                let position = u64::try_from(position).map_err(|_| {
                    PlaybackError::InvalidArgument {
                        argument: "position".to_string(),
                        message: format!("{position} is negative"),
                    }
                })?;
                TransportCommand::SeekTo(position)
            }
            PlayerCmd::Unset => return Ok(None),
        };
        Ok(Some(command))
    }
}

impl fmt::Display for PlayerCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerCmd::PlayPause => "play-pause",
            PlayerCmd::Next => "next",
            PlayerCmd::Prev => "prev",
            PlayerCmd::Stop => "stop",
            PlayerCmd::SeekTo => "seek-to",
            PlayerCmd::Unset => "unset",
        };
        f.write_str(name)
    }
}

/// Initial load requested when the session host starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupIntent {
    pub stream_uri: Option<String>,
    pub playlist_uri: Option<String>,
    /// Start playing once loaded. Off unless the host asks for it.
    #[serde(default)]
    pub auto_play: bool,
}

impl StartupIntent {
    pub fn stream(uri: impl Into<String>) -> Self {
        Self {
            stream_uri: Some(uri.into()),
            ..Default::default()
        }
    }

    pub fn playlist(uri: impl Into<String>) -> Self {
        Self {
            playlist_uri: Some(uri.into()),
            ..Default::default()
        }
    }

    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    /// The load this intent asks for. A stream wins over a playlist; blank
    /// references are ignored.
    pub fn to_command(&self) -> Option<SessionCommand> {
        let non_blank = |uri: &Option<String>| uri.clone().filter(|u| !u.trim().is_empty());

        if let Some(uri) = non_blank(&self.stream_uri) {
            return Some(SessionCommand::LoadStream {
                uri,
                play_when_ready: self.auto_play,
            });
        }
        non_blank(&self.playlist_uri).map(|uri| SessionCommand::LoadPlaylist {
            uri,
            play_when_ready: self.auto_play,
        })
    }
}

//! # Session Configuration
//!
//! Playback-side knobs shared by the session, the bridge and the remote
//! repository.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder replaced by the seed's video id in [`SessionConfig::radio_mix_template`].
pub const MIX_ID_PLACEHOLDER: &str = "{id}";

/// Playback session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How often the bridge samples position and duration while playing.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_position_poll_interval")]
    pub position_poll_interval: Duration,

    /// URL of the auto-generated mix for a seed. Every `{id}` is replaced by
    /// the seed's `v` query parameter.
    #[serde(default = "default_radio_mix_template")]
    pub radio_mix_template: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            position_poll_interval: default_position_poll_interval(),
            radio_mix_template: default_radio_mix_template(),
        }
    }
}

impl SessionConfig {
    pub fn with_position_poll_interval(mut self, interval: Duration) -> Self {
        self.position_poll_interval = interval;
        self
    }

    pub fn with_radio_mix_template(mut self, template: impl Into<String>) -> Self {
        self.radio_mix_template = template.into();
        self
    }

    /// Build the mix URL for a seed id.
    pub fn radio_mix_url(&self, seed_id: &str) -> String {
        self.radio_mix_template.replace(MIX_ID_PLACEHOLDER, seed_id)
    }
}

fn default_position_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_radio_mix_template() -> String {
    "https://music.youtube.com/watch?v={id}&list=RD{id}".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.position_poll_interval, Duration::from_millis(500));
        assert_eq!(
            config.radio_mix_url("abc"),
            "https://music.youtube.com/watch?v=abc&list=RDabc"
        );
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_custom_template() {
        let config = SessionConfig::default().with_radio_mix_template("mix://{id}");
        assert_eq!(config.radio_mix_url("42"), "mix://42");
    }
}

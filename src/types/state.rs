use crate::protocol::plist::PlistValue;

/// Playback state derived from `/playback-info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
    /// Nothing loaded
    #[default]
    Stopped,
    /// Media playing
    Playing,
    /// Media loaded, rate zero
    Paused,
}

impl PlaybackState {
    /// Lower-case name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed playback snapshot, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    /// Current state
    pub state: PlaybackState,
    /// Position in seconds
    pub position: u64,
    /// Duration in seconds
    pub duration: u64,
}

impl PlaybackStatus {
    /// The status reported when nothing is playing or polling failed
    #[must_use]
    pub fn stopped() -> Self {
        Self::default()
    }

    /// Interpret a decoded `/playback-info` body
    ///
    /// An empty dictionary means stopped; otherwise a truthy `rate` means
    /// playing and anything else paused. Position and duration are truncated
    /// to whole seconds and default to 0.
    #[must_use]
    pub fn from_playback_info(info: &PlistValue) -> Self {
        let Some(dict) = info.as_dict() else {
            return Self::stopped();
        };
        if dict.is_empty() {
            return Self::stopped();
        }

        let state = if dict.get("rate").is_some_and(PlistValue::is_truthy) {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
        let seconds = |key: &str| {
            dict.get(key)
                .and_then(PlistValue::as_whole_u64)
                .unwrap_or(0)
        };

        Self {
            state,
            position: seconds("position"),
            duration: seconds("duration"),
        }
    }
}

//! Event protocol shared by the cast player components.
//!
//! This module defines the listener-facing player events, the application
//! notifications posted to the surrounding app, and the small enums the
//! facade reports through its query API.

use crate::timeline::Timeline;
use crate::tracks::{TrackGroup, TrackSelections};

/// Custom message namespace used for progress/finish signaling.
pub const DEFAULT_CUSTOM_NAMESPACE: &str = "urn:x-cast:com.sambatech.player";
/// Receiver application launched when no custom receiver is configured.
pub const DEFAULT_RECEIVER_APP_ID: &str = "CC1AD845";
/// Sampling period requested from the remote progress listener.
pub const PROGRESS_REPORT_PERIOD_MS: u64 = 1000;

/// Coarse playback status. Buffering is not distinguished from ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Ready,
}

/// Repeat behavior applied when navigating beyond the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    #[default]
    Off, // Stop after the last window
    One, // Repeat current window
    All, // Wrap around the queue
}

/// Why the playback position jumped other than by normal progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscontinuityReason {
    Seek,
    PeriodTransition,
}

/// Notifications delivered to registered player listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StateChanged {
        play_when_ready: bool,
        playback_state: PlaybackState,
    },
    RepeatModeChanged(RepeatMode),
    PositionDiscontinuity(DiscontinuityReason),
    TracksChanged {
        groups: Vec<TrackGroup>,
        selections: TrackSelections,
    },
    TimelineChanged(Timeline),
    SeekProcessed,
}

/// Domain events posted to the surrounding application.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Progress { position_ms: u64, duration_ms: u64 },
    CastPlay,
    CastPause,
    CastFinish,
    SessionAvailable,
    SessionUnavailable,
}

//! Player events consumed by the bridge

use crate::types::VideoQuality;
use serde::{Deserialize, Serialize};

/// Event kinds emitted by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Ready,
    SourceLoaded,
    SourceUnloaded,
    Play,
    Playing,
    Paused,
    StallStarted,
    StallEnded,
    Seek,
    Seeked,
    TimeShift,
    TimeShifted,
    AdBreakStarted,
    AdBreakFinished,
    AdStarted,
    AdFinished,
    AdSkipped,
    TimeChanged,
    VideoPlaybackQualityChanged,
    PlaybackFinished,
    Error,
    AdError,
    Destroy,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::SourceLoaded => "source_loaded",
            EventKind::SourceUnloaded => "source_unloaded",
            EventKind::Play => "play",
            EventKind::Playing => "playing",
            EventKind::Paused => "paused",
            EventKind::StallStarted => "stall_started",
            EventKind::StallEnded => "stall_ended",
            EventKind::Seek => "seek",
            EventKind::Seeked => "seeked",
            EventKind::TimeShift => "time_shift",
            EventKind::TimeShifted => "time_shifted",
            EventKind::AdBreakStarted => "ad_break_started",
            EventKind::AdBreakFinished => "ad_break_finished",
            EventKind::AdStarted => "ad_started",
            EventKind::AdFinished => "ad_finished",
            EventKind::AdSkipped => "ad_skipped",
            EventKind::TimeChanged => "time_changed",
            EventKind::VideoPlaybackQualityChanged => "video_playback_quality_changed",
            EventKind::PlaybackFinished => "playback_finished",
            EventKind::Error => "error",
            EventKind::AdError => "ad_error",
            EventKind::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduled ad break attached to ad break events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdBreakInfo {
    pub id: String,
    /// Scheduled playhead offset in seconds
    pub schedule_time: Option<f64>,
}

/// Ad attached to ad events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdInfo {
    pub id: Option<String>,
    pub click_through_url: Option<String>,
    /// Ad duration in seconds
    pub duration: Option<f64>,
}

/// Rendition switch reported by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityChange {
    pub source: Option<VideoQuality>,
    pub target: VideoQuality,
}

/// Error reported by the player or the ad module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerError {
    pub code: u32,
    pub name: String,
    pub message: Option<String>,
}

impl PlayerError {
    pub fn new(code: u32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            message: None,
        }
    }
}

impl std::fmt::Display for PlayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} ({}): {}", self.name, self.code, message),
            None => write!(f, "{} ({})", self.name, self.code),
        }
    }
}

/// Event-specific data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    #[default]
    None,
    Playback {
        time: f64,
    },
    AdBreak(AdBreakInfo),
    Ad(AdInfo),
    Quality(QualityChange),
    Error(PlayerError),
}

/// A single player event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub kind: EventKind,
    #[serde(default)]
    pub payload: EventPayload,
}

impl PlayerEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            payload: EventPayload::None,
        }
    }

    pub fn time_changed(time: f64) -> Self {
        Self {
            kind: EventKind::TimeChanged,
            payload: EventPayload::Playback { time },
        }
    }

    pub fn ad_break(kind: EventKind, info: AdBreakInfo) -> Self {
        Self {
            kind,
            payload: EventPayload::AdBreak(info),
        }
    }

    pub fn ad(kind: EventKind, info: AdInfo) -> Self {
        Self {
            kind,
            payload: EventPayload::Ad(info),
        }
    }

    pub fn quality_changed(target: VideoQuality) -> Self {
        Self {
            kind: EventKind::VideoPlaybackQualityChanged,
            payload: EventPayload::Quality(QualityChange {
                source: None,
                target,
            }),
        }
    }

    pub fn error(kind: EventKind, error: PlayerError) -> Self {
        Self {
            kind,
            payload: EventPayload::Error(error),
        }
    }

    /// Playhead carried by the event, if any
    pub fn time(&self) -> Option<f64> {
        match self.payload {
            EventPayload::Playback { time } => Some(time),
            _ => None,
        }
    }

    pub fn ad_break_info(&self) -> Option<&AdBreakInfo> {
        match &self.payload {
            EventPayload::AdBreak(info) => Some(info),
            _ => None,
        }
    }

    pub fn ad_info(&self) -> Option<&AdInfo> {
        match &self.payload {
            EventPayload::Ad(info) => Some(info),
            _ => None,
        }
    }

    pub fn quality_change(&self) -> Option<&QualityChange> {
        match &self.payload {
            EventPayload::Quality(change) => Some(change),
            _ => None,
        }
    }

    pub fn player_error(&self) -> Option<&PlayerError> {
        match &self.payload {
            EventPayload::Error(error) => Some(error),
            _ => None,
        }
    }
}

impl From<EventKind> for PlayerEvent {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

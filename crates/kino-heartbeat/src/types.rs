//! Core types for Kino Heartbeat

use crate::event::EventKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

/// Unique identifier for a tracking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Free-form key/value context attached to a session start
pub type CustomMetadata = BTreeMap<String, String>;

/// Delivery format of the loaded source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Hls,
    Dash,
    Progressive,
    Smooth,
    #[default]
    Unknown,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Hls => write!(f, "hls"),
            StreamType::Dash => write!(f, "dash"),
            StreamType::Progressive => write!(f, "progressive"),
            StreamType::Smooth => write!(f, "smooth"),
            StreamType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Stream type as reported to the analytics collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaStreamType {
    Vod,
    Live,
    Linear,
}

impl std::fmt::Display for MediaStreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaStreamType::Vod => write!(f, "VOD"),
            MediaStreamType::Live => write!(f, "LIVE"),
            MediaStreamType::Linear => write!(f, "LINEAR"),
        }
    }
}

/// Playback mode, resolved once per source load.
///
/// Live and on-demand streams report position changes under different
/// event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    #[default]
    OnDemand,
    Live,
}

/// Event kinds opening and closing a seek bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeekEvents {
    pub start: EventKind,
    pub end: EventKind,
}

const SEEK_EVENTS: [(StreamMode, SeekEvents); 2] = [
    (
        StreamMode::OnDemand,
        SeekEvents {
            start: EventKind::Seek,
            end: EventKind::Seeked,
        },
    ),
    (
        StreamMode::Live,
        SeekEvents {
            start: EventKind::TimeShift,
            end: EventKind::TimeShifted,
        },
    ),
];

impl StreamMode {
    pub fn from_live(is_live: bool) -> Self {
        if is_live {
            StreamMode::Live
        } else {
            StreamMode::OnDemand
        }
    }

    /// Seek event pair for this mode
    pub fn seek_events(self) -> SeekEvents {
        SEEK_EVENTS
            .iter()
            .find(|(mode, _)| *mode == self)
            .map(|(_, events)| *events)
            .unwrap_or(SEEK_EVENTS[0].1)
    }

    pub fn media_stream_type(self) -> MediaStreamType {
        match self {
            StreamMode::OnDemand => MediaStreamType::Vod,
            StreamMode::Live => MediaStreamType::Live,
        }
    }
}

impl std::fmt::Display for StreamMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamMode::OnDemand => write!(f, "on-demand"),
            StreamMode::Live => write!(f, "live"),
        }
    }
}

/// Currently selected video rendition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoQuality {
    pub id: String,
    /// Bitrate in bits per second
    pub bitrate: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl VideoQuality {
    pub fn new(id: impl Into<String>, bitrate: u64) -> Self {
        Self {
            id: id.into(),
            bitrate,
            width: None,
            height: None,
        }
    }
}

/// Source configuration of the loaded content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub title: Option<String>,
    pub hls: Option<Url>,
    pub dash: Option<Url>,
    pub progressive: Option<Url>,
}

impl SourceDescriptor {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// URL used for the given delivery format
    pub fn url_for(&self, stream_type: StreamType) -> Option<&Url> {
        match stream_type {
            StreamType::Hls => self.hls.as_ref(),
            StreamType::Dash => self.dash.as_ref(),
            StreamType::Progressive => self.progressive.as_ref(),
            StreamType::Smooth | StreamType::Unknown => None,
        }
    }
}

/// Chapter marker from the player's timeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineMarker {
    /// Marker start in seconds
    pub time: f64,
    pub title: String,
    pub duration: Option<f64>,
}

impl TimelineMarker {
    pub fn new(time: f64, title: impl Into<String>) -> Self {
        Self {
            time,
            title: title.into(),
            duration: None,
        }
    }
}

/// Playback technology in use by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackTechnology {
    /// Source handed directly to the platform's media element
    Native,
    /// Media Source Extensions
    #[default]
    Html5,
}

/// Browser family hosting the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFamily {
    Safari,
    #[default]
    Other,
}

/// Capabilities of the runtime hosting the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub browser: BrowserFamily,
    /// Whether media elements expose playback quality metrics
    pub playback_quality_api: bool,
}

impl RuntimeInfo {
    pub fn is_safari(&self) -> bool {
        self.browser == BrowserFamily::Safari
    }
}

/// Playback quality metrics reported by the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NativePlaybackQuality {
    pub dropped_video_frames: u64,
    pub total_video_frames: u64,
}

/// Ad slot classification within the content timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdSlot {
    Pre,
    Mid,
    Post,
}

impl AdSlot {
    /// Classify a break from the playhead position
    pub fn classify(playhead: f64, start_offset: f64, duration: f64) -> Self {
        if playhead == start_offset {
            AdSlot::Pre
        } else if playhead == duration {
            AdSlot::Post
        } else {
            AdSlot::Mid
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AdSlot::Pre => "pre",
            AdSlot::Mid => "mid",
            AdSlot::Post => "post",
        }
    }
}

impl std::fmt::Display for AdSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Main content description sent with a session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub name: String,
    pub media_id: String,
    /// Content length in seconds
    pub length: f64,
    pub stream_type: MediaStreamType,
}

/// Ad break description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdBreakDescriptor {
    pub name: String,
    /// 1-based position of the break
    pub position: u32,
    /// Playhead offset of the break in seconds
    pub start_time: f64,
}

/// Individual ad description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdDescriptor {
    pub name: String,
    pub ad_id: String,
    /// 1-based position within the break
    pub position: u32,
    /// Ad length in seconds
    pub length: f64,
}

/// Chapter description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    pub name: String,
    pub position: u32,
    pub length: f64,
    pub start_time: f64,
}

/// Quality of service snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QosDescriptor {
    /// Bitrate in bits per second
    pub bitrate: u64,
    /// Milliseconds from source load to first rendered playback
    pub startup_time: Option<f64>,
    pub fps: Option<f64>,
    pub dropped_frames: u64,
}

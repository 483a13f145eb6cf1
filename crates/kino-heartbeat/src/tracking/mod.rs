//! Tracking session facade
//!
//! [`TrackingSession`] is the analytics collector's session API. The bridge
//! only ever talks to it through [`TrackingCall`] values so that every call
//! can be logged, recorded and replayed uniformly.

mod passthrough;
pub mod recorder;

pub use passthrough::LoggingTracker;
pub use recorder::{RecordingTracker, TrackingRecord};

use crate::error::Error;
use crate::event::PlayerError;
use crate::types::*;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Analytics collector session API. Calls are fire-and-forget.
pub trait TrackingSession {
    fn track_session_start(&self, media: &MediaDescriptor, metadata: &CustomMetadata);

    fn track_session_end(&self);

    fn track_play(&self);

    fn track_pause(&self);

    fn track_complete(&self);

    fn track_event(
        &self,
        event: TrackingEvent,
        payload: Option<&TrackingPayload>,
        metadata: Option<&CustomMetadata>,
    );

    fn track_error(&self, error: &PlayerError);
}

/// Timed events understood by the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingEvent {
    AdBreakStart,
    AdBreakComplete,
    AdStart,
    AdComplete,
    AdSkip,
    SeekStart,
    SeekComplete,
    BufferStart,
    BufferComplete,
    BitrateChange,
    ChapterStart,
    ChapterComplete,
    ChapterSkip,
}

impl TrackingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingEvent::AdBreakStart => "adBreakStart",
            TrackingEvent::AdBreakComplete => "adBreakComplete",
            TrackingEvent::AdStart => "adStart",
            TrackingEvent::AdComplete => "adComplete",
            TrackingEvent::AdSkip => "adSkip",
            TrackingEvent::SeekStart => "seekStart",
            TrackingEvent::SeekComplete => "seekComplete",
            TrackingEvent::BufferStart => "bufferStart",
            TrackingEvent::BufferComplete => "bufferComplete",
            TrackingEvent::BitrateChange => "bitrateChange",
            TrackingEvent::ChapterStart => "chapterStart",
            TrackingEvent::ChapterComplete => "chapterComplete",
            TrackingEvent::ChapterSkip => "chapterSkip",
        }
    }
}

impl std::fmt::Display for TrackingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor attached to a timed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingPayload {
    AdBreak(AdBreakDescriptor),
    Ad(AdDescriptor),
    Chapter(ChapterDescriptor),
    Qos(QosDescriptor),
}

/// One call on the tracking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum TrackingCall {
    SessionStart {
        media: MediaDescriptor,
        metadata: CustomMetadata,
    },
    SessionEnd,
    Play,
    Pause,
    Complete,
    Event {
        event: TrackingEvent,
        payload: Option<TrackingPayload>,
        metadata: Option<CustomMetadata>,
    },
    Error(PlayerError),
}

impl TrackingCall {
    /// Timed event without payload
    pub fn event(event: TrackingEvent) -> Self {
        TrackingCall::Event {
            event,
            payload: None,
            metadata: None,
        }
    }

    pub fn event_with(event: TrackingEvent, payload: TrackingPayload) -> Self {
        TrackingCall::Event {
            event,
            payload: Some(payload),
            metadata: None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            TrackingCall::SessionStart { .. } => "sessionStart",
            TrackingCall::SessionEnd => "sessionEnd",
            TrackingCall::Play => "play",
            TrackingCall::Pause => "pause",
            TrackingCall::Complete => "complete",
            TrackingCall::Event { event, .. } => event.as_str(),
            TrackingCall::Error(_) => "error",
        }
    }

    /// Timed event carried by this call, if any
    pub fn tracking_event(&self) -> Option<TrackingEvent> {
        match self {
            TrackingCall::Event { event, .. } => Some(*event),
            _ => None,
        }
    }

    /// Forward this call to `tracker`
    pub fn dispatch(&self, tracker: &dyn TrackingSession) {
        match self {
            TrackingCall::SessionStart { media, metadata } => {
                tracker.track_session_start(media, metadata)
            }
            TrackingCall::SessionEnd => tracker.track_session_end(),
            TrackingCall::Play => tracker.track_play(),
            TrackingCall::Pause => tracker.track_pause(),
            TrackingCall::Complete => tracker.track_complete(),
            TrackingCall::Event {
                event,
                payload,
                metadata,
            } => tracker.track_event(*event, payload.as_ref(), metadata.as_ref()),
            TrackingCall::Error(error) => tracker.track_error(error),
        }
    }
}

impl std::fmt::Display for TrackingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Collector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Collector host
    pub tracking_server: String,
    /// Reporting channel
    pub channel: String,
    /// Online video provider name
    pub ovp: String,
    pub app_version: String,
    pub player_name: String,
    /// Report over HTTPS
    pub ssl: bool,
    /// Log every tracking call
    pub debug_logging: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_server: String::new(),
            channel: String::new(),
            ovp: "kino".to_string(),
            app_version: crate::VERSION.to_string(),
            player_name: "kino-player".to_string(),
            ssl: true,
            debug_logging: false,
        }
    }
}

impl TrackingConfig {
    pub fn new(tracking_server: impl Into<String>) -> Self {
        Self {
            tracking_server: tracking_server.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracking_server.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "tracking_server must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

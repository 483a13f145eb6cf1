//! Player interface consumed by the bridge
//!
//! The bridge never drives the player. It subscribes to events through
//! [`EventSource`] and samples state through the synchronous getters on
//! [`Player`].

use crate::event::{EventKind, PlayerEvent};
use crate::types::*;
use std::rc::Rc;

/// Callback registered with the player. Identity is `Rc` pointer identity.
pub type PlayerCallback = Rc<dyn Fn(&PlayerEvent)>;

/// Subscribe/unsubscribe primitives of the player
pub trait EventSource {
    /// Register `callback` for `kind`
    fn on(&self, kind: EventKind, callback: PlayerCallback);

    /// Remove a previously registered callback.
    ///
    /// Unknown callbacks must be ignored.
    fn off(&self, kind: EventKind, callback: &PlayerCallback);
}

/// Synchronous view of the player's current state
pub trait Player: EventSource {
    /// Playhead in seconds; may be NaN before the source is ready
    fn current_time(&self) -> f64;

    /// Content duration in seconds; infinite for live streams
    fn duration(&self) -> f64;

    fn is_live(&self) -> bool;

    /// Playhead of the earliest seekable position
    fn stream_start(&self) -> f64 {
        0.0
    }

    /// Loaded source, `None` when nothing is loaded
    fn source(&self) -> Option<SourceDescriptor>;

    fn video_quality(&self) -> VideoQuality;

    /// Dropped frame counter maintained by the player itself
    fn dropped_video_frames(&self) -> u64;

    /// Metrics from the underlying media element, when it has one
    fn native_playback_quality(&self) -> Option<NativePlaybackQuality> {
        None
    }

    fn playback_technology(&self) -> PlaybackTechnology {
        PlaybackTechnology::default()
    }

    fn runtime(&self) -> RuntimeInfo {
        RuntimeInfo::default()
    }

    fn stream_type(&self) -> StreamType;

    /// Raw manifest text of the loaded source
    fn manifest(&self) -> Option<String>;

    /// Chapter markers configured for the loaded source
    fn timeline_markers(&self) -> Vec<TimelineMarker> {
        Vec::new()
    }

    /// Whether the ad schedule contains a post-roll break
    fn has_post_roll(&self) -> bool {
        false
    }
}

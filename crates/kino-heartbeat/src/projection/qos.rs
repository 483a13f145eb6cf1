//! Quality of service sampling

use crate::manifest;
use crate::player::Player;
use crate::types::{PlaybackTechnology, QosDescriptor};
use std::time::{Duration, Instant};
use tracing::trace;

/// Running QoS state for the loaded source
#[derive(Debug, Clone, Default)]
pub struct QosSampler {
    bitrate: u64,
    loaded_at: Option<Instant>,
    startup_time: Option<Duration>,
}

impl QosSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the startup timer and forget the previous source
    pub fn source_loaded(&mut self, bitrate: u64) {
        self.bitrate = bitrate;
        self.loaded_at = Some(Instant::now());
        self.startup_time = None;
    }

    /// Record startup time on the first rendered playback after a load
    pub fn playback_started(&mut self) {
        if self.startup_time.is_some() {
            return;
        }
        if let Some(loaded_at) = self.loaded_at {
            let elapsed = loaded_at.elapsed();
            trace!(startup_ms = elapsed.as_secs_f64() * 1000.0, "Startup time recorded");
            self.startup_time = Some(elapsed);
        }
    }

    pub fn set_bitrate(&mut self, bitrate: u64) {
        self.bitrate = bitrate;
    }

    pub fn bitrate(&self) -> u64 {
        self.bitrate
    }

    /// Startup time in milliseconds
    pub fn startup_time_ms(&self) -> Option<f64> {
        self.startup_time
            .map(|elapsed| elapsed.as_secs_f64() * 1000.0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Snapshot for the analytics collector
    pub fn descriptor(&self, player: &dyn Player) -> QosDescriptor {
        QosDescriptor {
            bitrate: self.bitrate,
            startup_time: self.startup_time_ms(),
            fps: manifest::source_frame_rate(player),
            dropped_frames: dropped_frames(player),
        }
    }
}

/// Dropped frame count.
///
/// The media element's metrics are preferred. The player's own counter is
/// used when the runtime lacks them, and for native playback on Safari
/// where the element under-reports.
pub fn dropped_frames(player: &dyn Player) -> u64 {
    let runtime = player.runtime();
    if !runtime.playback_quality_api {
        return player.dropped_video_frames();
    }
    if runtime.is_safari() && player.playback_technology() == PlaybackTechnology::Native {
        return player.dropped_video_frames();
    }
    player
        .native_playback_quality()
        .map_or_else(|| player.dropped_video_frames(), |q| q.dropped_video_frames)
}

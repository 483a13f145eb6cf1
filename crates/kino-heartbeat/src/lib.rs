//! Kino Heartbeat - player event to analytics session bridge
//!
//! This crate listens to a media player's lifecycle events and turns them
//! into the strict call sequence a heartbeat-style analytics collector
//! expects:
//! - Session start/end with restart-safe boundaries
//! - Play/pause, buffering and seek brackets
//! - Ad breaks, ads and skips
//! - Chapter transitions from timeline markers
//! - Bitrate changes with QoS snapshots (startup time, frame rate, dropped frames)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Kino Heartbeat                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   Player ──on/off──▶ ┌──────────────┐                           │
//! │     │                │    Handle    │                           │
//! │     │ events         │   Registry   │                           │
//! │     ▼                └──────┬───────┘                           │
//! │  ┌──────────────┐           │ arm/disarm                        │
//! │  │   Session    │◀──────────┤                                   │
//! │  │   Machine    │───────────┘                                   │
//! │  └──────┬───────┘                                               │
//! │         │ reads            ┌──────────────┐                     │
//! │         ├─────────────────▶│  Projection  │ chapters, manifest  │
//! │         │                  └──────────────┘                     │
//! │         ▼ actions                                               │
//! │  ┌──────────────┐          ┌──────────────┐                     │
//! │  │    Bridge    │─────────▶│   Tracking   │ collector session   │
//! │  │  Controller  │          │   Session    │                     │
//! │  └──────────────┘          └──────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use kino_heartbeat::testing::ScriptedPlayer;
//! use kino_heartbeat::tracking::RecordingTracker;
//! use kino_heartbeat::{Bridge, EventKind, Projections, SourceDescriptor, TrackingConfig};
//! use std::rc::Rc;
//!
//! let player = Rc::new(ScriptedPlayer::new());
//! let tracker = RecordingTracker::new();
//! let bridge = Bridge::attach(
//!     TrackingConfig::new("metrics.example.com"),
//!     player.clone(),
//!     Projections::new(),
//!     tracker.clone(),
//! )?;
//!
//! player.set_source(SourceDescriptor::titled("Parkour"));
//! player.emit(EventKind::SourceLoaded);
//! player.emit(EventKind::Playing);
//! bridge.teardown();
//!
//! assert_eq!(tracker.names(), vec!["sessionStart", "play", "sessionEnd"]);
//! # Ok::<(), kino_heartbeat::Error>(())
//! ```

pub mod bridge;
pub mod chapters;
pub mod error;
pub mod event;
pub mod manifest;
pub mod player;
pub mod projection;
pub mod registry;
pub mod session;
pub mod testing;
pub mod tracking;
pub mod types;

pub use bridge::{Bridge, MediaDelegate};
pub use chapters::{Chapter, ChapterTable};
pub use error::{Error, Result};
pub use event::{EventKind, EventPayload, PlayerError, PlayerEvent};
pub use player::{EventSource, Player, PlayerCallback};
pub use projection::Projections;
pub use registry::{HandleId, HandleInfo, HandleRegistry, HandleRole};
pub use session::{Phase, SessionState};
pub use tracking::{TrackingCall, TrackingConfig, TrackingEvent, TrackingPayload, TrackingSession};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version
pub fn init() {
    tracing::info!(version = VERSION, "Kino Heartbeat initialized");
}

//! Session replay example
//!
//! Replays a scripted player timeline through the bridge and prints the
//! resulting tracking calls as JSON.
//!
//! Run with: cargo run -p kino-heartbeat --example session_replay [script.json]
//! Set RUST_LOG=kino_heartbeat=debug to see every transition.

use anyhow::Context;
use kino_heartbeat::testing::ScriptedPlayer;
use kino_heartbeat::tracking::RecordingTracker;
use kino_heartbeat::{
    Bridge, PlayerEvent, Projections, SourceDescriptor, StreamType, TimelineMarker,
    TrackingConfig,
};
use serde::Deserialize;
use std::rc::Rc;
use tracing::info;

const DEFAULT_SCRIPT: &str = r#"{
  "config": { "tracking_server": "metrics.example.com", "channel": "web", "debug_logging": true },
  "source": {
    "title": "Red Bull Parkour",
    "hls": "https://cdn.example.com/content/f08e80da-bf1d-4e3d-8899-f0f6155f6efa/master.m3u8"
  },
  "duration": 300.0,
  "markers": [
    { "time": 24.0, "title": "First Chapter", "duration": null },
    { "time": 69.0, "title": "Chapter 2", "duration": null },
    { "time": 105.0, "title": "Chapter 3", "duration": null },
    { "time": 188.0, "title": "Last Chapter", "duration": null }
  ],
  "events": [
    { "kind": "ad_break_started", "payload": { "type": "ad_break", "id": "pre-roll", "schedule_time": 0.0 } },
    { "kind": "ad_started", "payload": { "type": "ad", "id": "ad-1", "click_through_url": null, "duration": 15.0 } },
    { "kind": "ad_skipped" },
    { "kind": "ad_break_finished" },
    { "kind": "playing" },
    { "kind": "time_changed", "payload": { "type": "playback", "time": 50.0 } },
    { "kind": "stall_started" },
    { "kind": "stall_ended" },
    { "kind": "seek" },
    { "kind": "seeked" },
    { "kind": "playing" },
    { "kind": "time_changed", "payload": { "type": "playback", "time": 250.0 } },
    { "kind": "paused" },
    { "kind": "playing" },
    { "kind": "playback_finished" },
    { "kind": "play" },
    { "kind": "playing" },
    { "kind": "destroy" }
  ]
}"#;

#[derive(Debug, Deserialize)]
struct Script {
    config: TrackingConfig,
    source: SourceDescriptor,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    live: bool,
    #[serde(default)]
    markers: Vec<TimelineMarker>,
    events: Vec<PlayerEvent>,
}

/// Media id from the content directory of the HLS URL
fn video_uid(source: Option<SourceDescriptor>) -> String {
    source
        .as_ref()
        .and_then(|source| source.url_for(StreamType::Hls))
        .and_then(|url| url.path_segments())
        .and_then(|segments| segments.rev().nth(1).map(str::to_string))
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kino_heartbeat=info".into()),
        )
        .init();
    kino_heartbeat::init();

    let text = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read script {}", path))?,
        None => DEFAULT_SCRIPT.to_string(),
    };
    let script: Script = serde_json::from_str(&text).context("Invalid replay script")?;

    let player = Rc::new(ScriptedPlayer::new());
    player.set_duration(script.duration.unwrap_or(f64::INFINITY));
    player.set_live(script.live);
    player.set_markers(script.markers);
    player.set_source(script.source);
    player.set_stream_type(StreamType::Hls);

    let projections = Projections::new().with_video_uid(|player| video_uid(player.source()));
    let tracker = RecordingTracker::new();
    let bridge = Bridge::attach(script.config, player.clone(), projections, tracker.clone())?;

    info!(events = script.events.len(), "Replaying script");
    for event in script.events {
        player.emit(event);
    }
    bridge.teardown();

    println!("{}", tracker.to_json()?);
    info!(
        calls = tracker.count(),
        sessions = tracker.session_ids().len(),
        "Replay finished"
    );
    Ok(())
}

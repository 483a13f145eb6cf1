//! Scripted player for tests and replays.
//!
//! [`ScriptedPlayer`] keeps its state in plain fields that tests set
//! directly, and dispatches events to subscribers only when told to with
//! [`ScriptedPlayer::emit`].

use crate::event::{EventKind, PlayerEvent};
use crate::player::{EventSource, Player, PlayerCallback};
use crate::types::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone)]
struct ScriptedState {
    current_time: f64,
    duration: f64,
    stream_start: f64,
    live: bool,
    source: Option<SourceDescriptor>,
    video_quality: VideoQuality,
    dropped_frames: u64,
    native_quality: Option<NativePlaybackQuality>,
    technology: PlaybackTechnology,
    runtime: RuntimeInfo,
    stream_type: StreamType,
    manifest: Option<String>,
    markers: Vec<TimelineMarker>,
    post_roll: bool,
}

impl Default for ScriptedState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: f64::NAN,
            stream_start: 0.0,
            live: false,
            source: None,
            video_quality: VideoQuality::default(),
            dropped_frames: 0,
            native_quality: None,
            technology: PlaybackTechnology::default(),
            runtime: RuntimeInfo::default(),
            stream_type: StreamType::default(),
            manifest: None,
            markers: Vec::new(),
            post_roll: false,
        }
    }
}

/// In-memory [`Player`] driven by test code
#[derive(Default)]
pub struct ScriptedPlayer {
    state: RefCell<ScriptedState>,
    subscribers: RefCell<Vec<(EventKind, PlayerCallback)>>,
    unmatched_offs: Cell<usize>,
}

impl ScriptedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch `event` to every callback subscribed for its kind.
    ///
    /// Subscribers registered during dispatch see the next event, not this
    /// one. Subscribers removed during dispatch are not called.
    pub fn emit(&self, event: impl Into<PlayerEvent>) {
        let event = event.into();
        if let Some(time) = event.time() {
            self.state.borrow_mut().current_time = time;
        }

        let snapshot: Vec<PlayerCallback> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|(kind, _)| *kind == event.kind)
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in snapshot {
            if self.is_subscribed(event.kind, &callback) {
                callback(&event);
            }
        }
    }

    fn is_subscribed(&self, kind: EventKind, callback: &PlayerCallback) -> bool {
        self.subscribers
            .borrow()
            .iter()
            .any(|(k, cb)| *k == kind && Rc::ptr_eq(cb, callback))
    }

    /// Number of live subscriptions for `kind`
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Number of live subscriptions across all kinds
    pub fn total_subscribers(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// `off` calls that matched no subscription
    pub fn unmatched_offs(&self) -> usize {
        self.unmatched_offs.get()
    }

    pub fn set_current_time(&self, time: f64) {
        self.state.borrow_mut().current_time = time;
    }

    pub fn set_duration(&self, duration: f64) {
        self.state.borrow_mut().duration = duration;
    }

    pub fn set_stream_start(&self, start: f64) {
        self.state.borrow_mut().stream_start = start;
    }

    pub fn set_live(&self, live: bool) {
        self.state.borrow_mut().live = live;
    }

    pub fn set_source(&self, source: SourceDescriptor) {
        self.state.borrow_mut().source = Some(source);
    }

    pub fn clear_source(&self) {
        self.state.borrow_mut().source = None;
    }

    pub fn set_video_quality(&self, quality: VideoQuality) {
        self.state.borrow_mut().video_quality = quality;
    }

    pub fn set_dropped_frames(&self, dropped: u64) {
        self.state.borrow_mut().dropped_frames = dropped;
    }

    pub fn set_native_quality(&self, quality: Option<NativePlaybackQuality>) {
        self.state.borrow_mut().native_quality = quality;
    }

    pub fn set_technology(&self, technology: PlaybackTechnology) {
        self.state.borrow_mut().technology = technology;
    }

    pub fn set_runtime(&self, runtime: RuntimeInfo) {
        self.state.borrow_mut().runtime = runtime;
    }

    pub fn set_stream_type(&self, stream_type: StreamType) {
        self.state.borrow_mut().stream_type = stream_type;
    }

    pub fn set_manifest(&self, manifest: Option<String>) {
        self.state.borrow_mut().manifest = manifest;
    }

    pub fn set_markers(&self, markers: Vec<TimelineMarker>) {
        self.state.borrow_mut().markers = markers;
    }

    pub fn set_post_roll(&self, post_roll: bool) {
        self.state.borrow_mut().post_roll = post_roll;
    }
}

impl EventSource for ScriptedPlayer {
    fn on(&self, kind: EventKind, callback: PlayerCallback) {
        self.subscribers.borrow_mut().push((kind, callback));
    }

    fn off(&self, kind: EventKind, callback: &PlayerCallback) {
        let mut subscribers = self.subscribers.borrow_mut();
        let position = subscribers
            .iter()
            .position(|(k, cb)| *k == kind && Rc::ptr_eq(cb, callback));
        match position {
            Some(index) => {
                subscribers.remove(index);
            }
            None => self.unmatched_offs.set(self.unmatched_offs.get() + 1),
        }
    }
}

impl Player for ScriptedPlayer {
    fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    fn is_live(&self) -> bool {
        self.state.borrow().live
    }

    fn stream_start(&self) -> f64 {
        self.state.borrow().stream_start
    }

    fn source(&self) -> Option<SourceDescriptor> {
        self.state.borrow().source.clone()
    }

    fn video_quality(&self) -> VideoQuality {
        self.state.borrow().video_quality.clone()
    }

    fn dropped_video_frames(&self) -> u64 {
        self.state.borrow().dropped_frames
    }

    fn native_playback_quality(&self) -> Option<NativePlaybackQuality> {
        self.state.borrow().native_quality
    }

    fn playback_technology(&self) -> PlaybackTechnology {
        self.state.borrow().technology
    }

    fn runtime(&self) -> RuntimeInfo {
        self.state.borrow().runtime
    }

    fn stream_type(&self) -> StreamType {
        self.state.borrow().stream_type
    }

    fn manifest(&self) -> Option<String> {
        self.state.borrow().manifest.clone()
    }

    fn timeline_markers(&self) -> Vec<TimelineMarker> {
        self.state.borrow().markers.clone()
    }

    fn has_post_roll(&self) -> bool {
        self.state.borrow().post_roll
    }
}

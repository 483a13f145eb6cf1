//! Recording tracker
//!
//! Stores every call with a sequence number, the id of the tracking session
//! it belongs to and a wall-clock timestamp. Clones share the same log.

use super::{TrackingCall, TrackingEvent, TrackingPayload, TrackingSession};
use crate::event::PlayerError;
use crate::types::*;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// A recorded tracking call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub sequence: u64,
    /// Session the call belongs to; `None` before the first session start
    pub session_id: Option<SessionId>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub call: TrackingCall,
}

#[derive(Debug, Default)]
struct RecorderState {
    sequence: u64,
    session_id: Option<SessionId>,
    records: Vec<TrackingRecord>,
}

/// In-memory [`TrackingSession`]
#[derive(Debug, Clone, Default)]
pub struct RecordingTracker {
    state: Rc<RefCell<RecorderState>>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: TrackingCall) {
        let mut state = self.state.borrow_mut();
        if matches!(call, TrackingCall::SessionStart { .. }) {
            state.session_id = Some(SessionId::new());
        }
        state.sequence += 1;
        let record = TrackingRecord {
            sequence: state.sequence,
            session_id: state.session_id,
            timestamp: Utc::now(),
            call,
        };
        state.records.push(record);
    }

    pub fn records(&self) -> Vec<TrackingRecord> {
        self.state.borrow().records.clone()
    }

    pub fn calls(&self) -> Vec<TrackingCall> {
        self.state
            .borrow()
            .records
            .iter()
            .map(|record| record.call.clone())
            .collect()
    }

    /// Call names in order, e.g. `["sessionStart", "play"]`
    pub fn names(&self) -> Vec<&'static str> {
        self.state
            .borrow()
            .records
            .iter()
            .map(|record| record.call.name())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.state.borrow().records.len()
    }

    /// Number of recorded calls with the given name
    pub fn count_named(&self, name: &str) -> usize {
        self.state
            .borrow()
            .records
            .iter()
            .filter(|record| record.call.name() == name)
            .count()
    }

    pub fn count_event(&self, event: TrackingEvent) -> usize {
        self.state
            .borrow()
            .records
            .iter()
            .filter(|record| record.call.tracking_event() == Some(event))
            .count()
    }

    /// Distinct session ids in order of first appearance
    pub fn session_ids(&self) -> Vec<SessionId> {
        let state = self.state.borrow();
        let mut ids: Vec<SessionId> = Vec::new();
        for id in state.records.iter().filter_map(|record| record.session_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.records.clear();
        state.sequence = 0;
    }

    /// Pretty JSON dump of the log
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.state.borrow().records)?)
    }
}

impl TrackingSession for RecordingTracker {
    fn track_session_start(&self, media: &MediaDescriptor, metadata: &CustomMetadata) {
        self.record(TrackingCall::SessionStart {
            media: media.clone(),
            metadata: metadata.clone(),
        });
    }

    fn track_session_end(&self) {
        self.record(TrackingCall::SessionEnd);
    }

    fn track_play(&self) {
        self.record(TrackingCall::Play);
    }

    fn track_pause(&self) {
        self.record(TrackingCall::Pause);
    }

    fn track_complete(&self) {
        self.record(TrackingCall::Complete);
    }

    fn track_event(
        &self,
        event: TrackingEvent,
        payload: Option<&TrackingPayload>,
        metadata: Option<&CustomMetadata>,
    ) {
        self.record(TrackingCall::Event {
            event,
            payload: payload.cloned(),
            metadata: metadata.cloned(),
        });
    }

    fn track_error(&self, error: &PlayerError) {
        self.record(TrackingCall::Error(error.clone()));
    }
}

//! Debug logging decorator

use super::{TrackingEvent, TrackingPayload, TrackingSession};
use crate::event::PlayerError;
use crate::types::*;
use tracing::{debug, error};

/// Logs every tracking call, then forwards it unchanged
pub struct LoggingTracker<T: TrackingSession + ?Sized> {
    inner: T,
}

impl<T: TrackingSession> LoggingTracker<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: TrackingSession + ?Sized> LoggingTracker<T> {
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: TrackingSession + ?Sized> TrackingSession for LoggingTracker<T> {
    fn track_session_start(&self, media: &MediaDescriptor, metadata: &CustomMetadata) {
        debug!(
            name = %media.name,
            media_id = %media.media_id,
            length = media.length,
            stream_type = %media.stream_type,
            metadata_keys = metadata.len(),
            "trackSessionStart"
        );
        self.inner.track_session_start(media, metadata);
    }

    fn track_session_end(&self) {
        debug!("trackSessionEnd");
        self.inner.track_session_end();
    }

    fn track_play(&self) {
        debug!("trackPlay");
        self.inner.track_play();
    }

    fn track_pause(&self) {
        debug!("trackPause");
        self.inner.track_pause();
    }

    fn track_complete(&self) {
        debug!("trackComplete");
        self.inner.track_complete();
    }

    fn track_event(
        &self,
        event: TrackingEvent,
        payload: Option<&TrackingPayload>,
        metadata: Option<&CustomMetadata>,
    ) {
        debug!(event = %event, payload = ?payload, metadata = ?metadata, "trackEvent");
        self.inner.track_event(event, payload, metadata);
    }

    fn track_error(&self, player_error: &PlayerError) {
        error!(code = player_error.code, error = %player_error, "trackError");
        self.inner.track_error(player_error);
    }
}

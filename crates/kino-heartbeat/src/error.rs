//! Error types for Kino Heartbeat

use crate::event::EventKind;
use crate::session::Phase;
use crate::types::StreamType;
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Error, Debug)]
pub enum Error {
    // Protocol anomalies
    #[error("Ad started outside of an active ad break")]
    AdOutsideBreak,

    #[error("No active ad to complete")]
    NoActiveAd,

    #[error("No active ad break to complete")]
    NoActiveAdBreak,

    #[error("Seek completed without a matching seek start")]
    UnmatchedSeekEnd,

    #[error("Seek started while another seek is in progress")]
    SeekInProgress,

    #[error("No tracking session is active")]
    NoActiveSession,

    #[error("Session already completed")]
    AlreadyCompleted,

    #[error("No live subscription for {kind}")]
    HandleNotFound { kind: EventKind },

    #[error("Invalid session phase transition: {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    // Projection errors
    #[error("Failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("Manifest unavailable for {0} streams")]
    ManifestUnavailable(StreamType),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for out-of-order or duplicate player events.
    ///
    /// These are expected races between player callbacks; the bridge logs
    /// them and keeps going.
    pub fn is_anomaly(&self) -> bool {
        matches!(
            self,
            Error::AdOutsideBreak
                | Error::NoActiveAd
                | Error::NoActiveAdBreak
                | Error::UnmatchedSeekEnd
                | Error::SeekInProgress
                | Error::NoActiveSession
                | Error::AlreadyCompleted
                | Error::HandleNotFound { .. }
                | Error::InvalidTransition { .. }
        )
    }

    /// Returns the error code for log correlation
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::AdOutsideBreak => "AD_OUTSIDE_BREAK",
            Error::NoActiveAd => "NO_ACTIVE_AD",
            Error::NoActiveAdBreak => "NO_ACTIVE_AD_BREAK",
            Error::UnmatchedSeekEnd => "UNMATCHED_SEEK_END",
            Error::SeekInProgress => "SEEK_IN_PROGRESS",
            Error::NoActiveSession => "NO_SESSION",
            Error::AlreadyCompleted => "ALREADY_COMPLETED",
            Error::HandleNotFound { .. } => "HANDLE_NOT_FOUND",
            Error::InvalidTransition { .. } => "INVALID_STATE",
            Error::ManifestParse(_) => "MANIFEST_PARSE",
            Error::ManifestUnavailable(_) => "MANIFEST_UNAVAILABLE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
        }
    }
}

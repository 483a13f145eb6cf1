//! Manifest access and frame rate extraction for HLS and DASH

#[cfg(feature = "hls")]
mod hls;
#[cfg(feature = "dash")]
mod dash;

#[cfg(feature = "hls")]
pub use hls::max_frame_rate as hls_frame_rate;
#[cfg(feature = "dash")]
pub use dash::max_frame_rate as dash_frame_rate;

use crate::{error::Error, player::Player, types::StreamType, Result};
use tracing::debug;

/// Scans manifest text for the highest declared frame rate
pub type FrameRateScanner = fn(&str) -> Result<Option<f64>>;

/// Scanner for a delivery format, `None` when the format carries no
/// frame rate declarations
pub fn scanner_for(stream_type: StreamType) -> Option<FrameRateScanner> {
    match stream_type {
        #[cfg(feature = "hls")]
        StreamType::Hls => Some(hls::max_frame_rate),
        #[cfg(feature = "dash")]
        StreamType::Dash => Some(dash::max_frame_rate),
        _ => None,
    }
}

/// Raw manifest of the loaded source.
///
/// Only adaptive formats expose a manifest, and HLS on Safari is played by
/// the platform itself so the player never sees the playlist.
pub fn manifest_text<P: Player + ?Sized>(player: &P) -> Result<String> {
    let stream_type = player.stream_type();
    match stream_type {
        StreamType::Dash => {}
        StreamType::Hls if !player.runtime().is_safari() => {}
        _ => return Err(Error::ManifestUnavailable(stream_type)),
    }
    player
        .manifest()
        .ok_or(Error::ManifestUnavailable(stream_type))
}

/// Highest frame rate declared by the loaded source's manifest
pub fn source_frame_rate<P: Player + ?Sized>(player: &P) -> Option<f64> {
    let scanner = scanner_for(player.stream_type())?;
    let result = manifest_text(player).and_then(|manifest| scanner(&manifest));
    match result {
        Ok(frame_rate) => frame_rate,
        Err(e) => {
            debug!(error = %e, "Frame rate unavailable");
            None
        }
    }
}

/// Fold helper keeping the larger of two optional rates
pub(crate) fn max_rate(current: Option<f64>, candidate: f64) -> Option<f64> {
    if !candidate.is_finite() || candidate <= 0.0 {
        return current;
    }
    Some(current.map_or(candidate, |rate| rate.max(candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_table() {
        assert!(scanner_for(StreamType::Hls).is_some());
        assert!(scanner_for(StreamType::Dash).is_some());
        assert!(scanner_for(StreamType::Progressive).is_none());
        assert!(scanner_for(StreamType::Smooth).is_none());
        assert!(scanner_for(StreamType::Unknown).is_none());
    }

    #[test]
    fn test_max_rate_ignores_invalid() {
        assert_eq!(max_rate(None, 25.0), Some(25.0));
        assert_eq!(max_rate(Some(25.0), 29.97), Some(29.97));
        assert_eq!(max_rate(Some(50.0), 25.0), Some(50.0));
        assert_eq!(max_rate(Some(25.0), f64::NAN), Some(25.0));
        assert_eq!(max_rate(None, 0.0), None);
    }
}

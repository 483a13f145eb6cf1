//! HLS frame rate extraction
//!
//! Frame rates are declared per variant stream through the `FRAME-RATE`
//! attribute of `EXT-X-STREAM-INF` in the master playlist.

use super::max_rate;
use crate::{error::Error, Result};
use m3u8_rs::MasterPlaylist;

/// Highest `FRAME-RATE` across all variant streams
pub fn max_frame_rate(manifest: &str) -> Result<Option<f64>> {
    let master = parse_master(manifest)?;
    Ok(master
        .variants
        .iter()
        .filter_map(|variant| variant.frame_rate)
        .fold(None, max_rate))
}

fn parse_master(content: &str) -> Result<MasterPlaylist> {
    m3u8_rs::parse_master_playlist_res(content.as_bytes())
        .map_err(|e| Error::ManifestParse(format!("Failed to parse HLS master: {:?}", e)))
}

//! DASH frame rate extraction
//!
//! `frameRate` may be declared on `AdaptationSet`, `Representation` and
//! `SubRepresentation` elements, either as `F` or as `F/D`.

use super::max_rate;
use crate::{error::Error, Result};

const FRAME_RATE_ELEMENTS: [&str; 3] = ["AdaptationSet", "Representation", "SubRepresentation"];

/// Highest `frameRate` declared anywhere in the MPD
pub fn max_frame_rate(manifest: &str) -> Result<Option<f64>> {
    if !manifest.contains("<MPD") && !manifest.contains(":MPD") {
        return Err(Error::ManifestParse("Missing MPD root element".to_string()));
    }

    let mut highest = None;
    for tag in manifest.split('<').skip(1) {
        let Some(end) = tag.find('>') else {
            continue;
        };
        let element = &tag[..end];
        let name_end = element
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(element.len());
        let name = &element[..name_end];
        let local_name = name.rsplit(':').next().unwrap_or(name);
        if !FRAME_RATE_ELEMENTS.contains(&local_name) {
            continue;
        }

        if let Some(rate) = extract_attr(&element[name_end..], "frameRate")
            .as_deref()
            .and_then(parse_frame_rate)
        {
            highest = max_rate(highest, rate);
        }
    }
    Ok(highest)
}

/// Extract an attribute value from an element's attribute string
fn extract_attr(attrs: &str, name: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(found) = attrs[search_from..].find(name) {
        let start = search_from + found;
        search_from = start + name.len();

        let preceded_by_space = attrs[..start]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        if !preceded_by_space {
            continue;
        }

        let rest = attrs[search_from..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        let quote = rest.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let value = &rest[1..];
        return value.find(quote).map(|end| value[..end].to_string());
    }
    None
}

/// Parse `F` or `F/D`
fn parse_frame_rate(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.split_once('/') {
        Some((frames, divisor)) => {
            let frames: f64 = frames.trim().parse().ok()?;
            let divisor: f64 = divisor.trim().parse().ok()?;
            if divisor == 0.0 {
                return None;
            }
            Some(frames / divisor)
        }
        None => value.parse().ok(),
    }
}

//! Chapter interval table built from timeline markers

use crate::types::TimelineMarker;
use serde::{Deserialize, Serialize};

/// A named content segment covering `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// Marker time in seconds
    pub time: f64,
    /// Index within the table
    pub position: usize,
    pub interval: (f64, f64),
}

impl Chapter {
    pub fn start(&self) -> f64 {
        self.interval.0
    }

    pub fn end(&self) -> f64 {
        self.interval.1
    }

    /// Last chapter of a table runs to the end of the content
    pub fn is_unbounded(&self) -> bool {
        self.interval.1 == f64::INFINITY
    }

    fn contains(&self, second: f64) -> bool {
        self.interval.0 <= second && second < self.interval.1
    }
}

/// Ordered, contiguous chapter intervals for one source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterTable {
    chapters: Vec<Chapter>,
}

impl ChapterTable {
    /// Build the table from markers; markers are ordered by time first
    pub fn from_markers(markers: &[TimelineMarker]) -> Self {
        let mut sorted: Vec<&TimelineMarker> =
            markers.iter().filter(|marker| marker.time.is_finite()).collect();
        sorted.sort_by(|a, b| a.time.total_cmp(&b.time));

        let chapters = sorted
            .iter()
            .enumerate()
            .map(|(position, marker)| {
                let end = sorted
                    .get(position + 1)
                    .map_or(f64::INFINITY, |next| next.time);
                Chapter {
                    title: marker.title.clone(),
                    time: marker.time,
                    position,
                    interval: (marker.time, end),
                }
            })
            .collect();

        Self { chapters }
    }

    /// Chapter containing the floored playhead
    pub fn locate(&self, time: f64) -> Option<&Chapter> {
        if !time.is_finite() {
            return None;
        }
        let second = time.floor();
        self.chapters.iter().find(|chapter| chapter.contains(second))
    }

    pub fn get(&self, position: usize) -> Option<&Chapter> {
        self.chapters.get(position)
    }

    pub fn first(&self) -> Option<&Chapter> {
        self.chapters.first()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chapter> {
        self.chapters.iter()
    }
}

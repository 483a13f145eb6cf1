//! Projection layer: player state to analytics descriptors
//!
//! Every descriptor field has a default projection. Embedders can replace
//! any subset through [`Projections`]; fields without an override keep the
//! default rather than becoming empty.

mod qos;

pub use qos::{dropped_frames, QosSampler};

use crate::chapters::Chapter;
use crate::event::{AdBreakInfo, AdInfo};
use crate::player::Player;
use crate::types::*;

/// Projection reading only the player
pub type PlayerProjection<T> = Box<dyn Fn(&dyn Player) -> T>;

/// Projection reading the player and the triggering item
pub type ItemProjection<E, T> = Box<dyn Fn(&dyn Player, &E) -> T>;

/// Optional overrides for descriptor fields
#[derive(Default)]
pub struct Projections {
    to_video_uid: Option<PlayerProjection<String>>,
    to_custom_metadata: Option<PlayerProjection<CustomMetadata>>,
    to_ad_break_name: Option<ItemProjection<AdBreakInfo, String>>,
    to_ad_break_position: Option<ItemProjection<AdBreakInfo, u32>>,
    to_ad_name: Option<ItemProjection<AdInfo, String>>,
    to_ad_id: Option<ItemProjection<AdInfo, String>>,
    to_ad_position: Option<ItemProjection<AdInfo, u32>>,
    to_chapter_name: Option<ItemProjection<Chapter, String>>,
    to_chapter_position: Option<ItemProjection<Chapter, u32>>,
    to_chapter_length: Option<ItemProjection<Chapter, f64>>,
    to_chapter_start_time: Option<ItemProjection<Chapter, f64>>,
}

impl Projections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video_uid(mut self, f: impl Fn(&dyn Player) -> String + 'static) -> Self {
        self.to_video_uid = Some(Box::new(f));
        self
    }

    pub fn with_custom_metadata(
        mut self,
        f: impl Fn(&dyn Player) -> CustomMetadata + 'static,
    ) -> Self {
        self.to_custom_metadata = Some(Box::new(f));
        self
    }

    pub fn with_ad_break_name(
        mut self,
        f: impl Fn(&dyn Player, &AdBreakInfo) -> String + 'static,
    ) -> Self {
        self.to_ad_break_name = Some(Box::new(f));
        self
    }

    pub fn with_ad_break_position(
        mut self,
        f: impl Fn(&dyn Player, &AdBreakInfo) -> u32 + 'static,
    ) -> Self {
        self.to_ad_break_position = Some(Box::new(f));
        self
    }

    pub fn with_ad_name(mut self, f: impl Fn(&dyn Player, &AdInfo) -> String + 'static) -> Self {
        self.to_ad_name = Some(Box::new(f));
        self
    }

    pub fn with_ad_id(mut self, f: impl Fn(&dyn Player, &AdInfo) -> String + 'static) -> Self {
        self.to_ad_id = Some(Box::new(f));
        self
    }

    pub fn with_ad_position(mut self, f: impl Fn(&dyn Player, &AdInfo) -> u32 + 'static) -> Self {
        self.to_ad_position = Some(Box::new(f));
        self
    }

    pub fn with_chapter_name(
        mut self,
        f: impl Fn(&dyn Player, &Chapter) -> String + 'static,
    ) -> Self {
        self.to_chapter_name = Some(Box::new(f));
        self
    }

    pub fn with_chapter_position(
        mut self,
        f: impl Fn(&dyn Player, &Chapter) -> u32 + 'static,
    ) -> Self {
        self.to_chapter_position = Some(Box::new(f));
        self
    }

    pub fn with_chapter_length(
        mut self,
        f: impl Fn(&dyn Player, &Chapter) -> f64 + 'static,
    ) -> Self {
        self.to_chapter_length = Some(Box::new(f));
        self
    }

    pub fn with_chapter_start_time(
        mut self,
        f: impl Fn(&dyn Player, &Chapter) -> f64 + 'static,
    ) -> Self {
        self.to_chapter_start_time = Some(Box::new(f));
        self
    }

    /// Main content descriptor for a session start
    pub fn media(&self, player: &dyn Player, mode: StreamMode) -> MediaDescriptor {
        MediaDescriptor {
            name: video_title(player),
            media_id: self
                .to_video_uid
                .as_ref()
                .map_or_else(String::new, |f| f(player)),
            length: media_length(player),
            stream_type: mode.media_stream_type(),
        }
    }

    pub fn custom_metadata(&self, player: &dyn Player) -> CustomMetadata {
        self.to_custom_metadata
            .as_ref()
            .map_or_else(CustomMetadata::new, |f| f(player))
    }

    /// Ad break descriptor; `ordinal` is the 1-based index of the break
    /// within the session
    pub fn ad_break(
        &self,
        player: &dyn Player,
        info: &AdBreakInfo,
        slot: AdSlot,
        ordinal: u32,
    ) -> AdBreakDescriptor {
        AdBreakDescriptor {
            name: self
                .to_ad_break_name
                .as_ref()
                .map_or_else(|| slot.label().to_string(), |f| f(player, info)),
            position: self
                .to_ad_break_position
                .as_ref()
                .map_or(ordinal, |f| f(player, info)),
            start_time: info
                .schedule_time
                .filter(|time| time.is_finite())
                .unwrap_or_else(|| playhead(player)),
        }
    }

    /// Ad descriptor; `ordinal` is the 1-based index of the ad within its
    /// break
    pub fn ad(&self, player: &dyn Player, info: &AdInfo, ordinal: u32) -> AdDescriptor {
        AdDescriptor {
            name: self
                .to_ad_name
                .as_ref()
                .map_or_else(String::new, |f| f(player, info)),
            ad_id: self
                .to_ad_id
                .as_ref()
                .map_or_else(String::new, |f| f(player, info)),
            position: self
                .to_ad_position
                .as_ref()
                .map_or(ordinal, |f| f(player, info)),
            length: info.duration.filter(|d| d.is_finite()).unwrap_or(0.0),
        }
    }

    pub fn chapter(&self, player: &dyn Player, chapter: &Chapter) -> ChapterDescriptor {
        ChapterDescriptor {
            name: self
                .to_chapter_name
                .as_ref()
                .map_or_else(|| chapter.title.clone(), |f| f(player, chapter)),
            position: self
                .to_chapter_position
                .as_ref()
                .map_or(chapter.position as u32, |f| f(player, chapter)),
            length: self
                .to_chapter_length
                .as_ref()
                .map_or_else(|| chapter_length(player, chapter), |f| f(player, chapter)),
            start_time: self
                .to_chapter_start_time
                .as_ref()
                .map_or(chapter.time, |f| f(player, chapter)),
        }
    }
}

impl std::fmt::Debug for Projections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projections")
            .field("to_video_uid", &self.to_video_uid.is_some())
            .field("to_custom_metadata", &self.to_custom_metadata.is_some())
            .field("to_ad_break_name", &self.to_ad_break_name.is_some())
            .field("to_ad_break_position", &self.to_ad_break_position.is_some())
            .field("to_ad_name", &self.to_ad_name.is_some())
            .field("to_ad_id", &self.to_ad_id.is_some())
            .field("to_ad_position", &self.to_ad_position.is_some())
            .field("to_chapter_name", &self.to_chapter_name.is_some())
            .field("to_chapter_position", &self.to_chapter_position.is_some())
            .field("to_chapter_length", &self.to_chapter_length.is_some())
            .field("to_chapter_start_time", &self.to_chapter_start_time.is_some())
            .finish()
    }
}

/// Playhead with NaN mapped to zero
pub fn playhead(player: &dyn Player) -> f64 {
    let time = player.current_time();
    if time.is_nan() {
        0.0
    } else {
        time
    }
}

pub fn video_title(player: &dyn Player) -> String {
    player
        .source()
        .and_then(|source| source.title)
        .unwrap_or_default()
}

/// Content length; live streams report zero
pub fn media_length(player: &dyn Player) -> f64 {
    let duration = player.duration();
    if duration.is_finite() {
        duration
    } else {
        0.0
    }
}

/// Default chapter length: the last chapter runs to the end of the content
pub fn chapter_length(player: &dyn Player, chapter: &Chapter) -> f64 {
    if chapter.is_unbounded() {
        player.duration() - chapter.start()
    } else {
        chapter.end() - chapter.start()
    }
}

/// Slot of an ad break starting now
pub fn ad_slot(player: &dyn Player) -> AdSlot {
    AdSlot::classify(player.current_time(), player.stream_start(), player.duration())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::ChapterTable;
    use crate::testing::ScriptedPlayer;

    fn player() -> ScriptedPlayer {
        let player = ScriptedPlayer::new();
        player.set_source(SourceDescriptor::titled("Red Bull Parkour"));
        player.set_duration(300.0);
        player.set_markers(vec![
            TimelineMarker::new(24.0, "First Chapter"),
            TimelineMarker::new(69.0, "Chapter 2"),
            TimelineMarker::new(105.0, "Chapter 3"),
            TimelineMarker::new(188.0, "Last Chapter"),
        ]);
        player
    }

    #[test]
    fn test_media_defaults() {
        let player = player();
        let media = Projections::new().media(&player, StreamMode::OnDemand);
        assert_eq!(media.name, "Red Bull Parkour");
        assert_eq!(media.media_id, "");
        assert_eq!(media.length, 300.0);
        assert_eq!(media.stream_type, MediaStreamType::Vod);
    }

    #[test]
    fn test_live_media_length() {
        let player = player();
        player.set_duration(f64::INFINITY);
        let media = Projections::new().media(&player, StreamMode::Live);
        assert_eq!(media.length, 0.0);
        assert_eq!(media.stream_type, MediaStreamType::Live);
    }

    #[test]
    fn test_overrides_replace_only_their_field() {
        let player = player();
        let projections = Projections::new()
            .with_video_uid(|_| "f08e80da".to_string())
            .with_ad_break_position(|_, _| 7);

        assert_eq!(projections.media(&player, StreamMode::OnDemand).media_id, "f08e80da");

        let info = AdBreakInfo {
            id: "pre-roll-1".into(),
            schedule_time: Some(0.0),
        };
        let descriptor = projections.ad_break(&player, &info, AdSlot::Pre, 1);
        assert_eq!(descriptor.position, 7);
        assert_eq!(descriptor.name, "pre");
        assert_eq!(descriptor.start_time, 0.0);
    }

    #[test]
    fn test_chapter_defaults() {
        let player = player();
        let table = ChapterTable::from_markers(&player.timeline_markers());
        let projections = Projections::new();

        let first = projections.chapter(&player, table.get(0).unwrap());
        assert_eq!(first.name, "First Chapter");
        assert_eq!(first.position, 0);
        assert_eq!(first.length, 45.0);
        assert_eq!(first.start_time, 24.0);

        let last = projections.chapter(&player, table.get(3).unwrap());
        assert_eq!(last.name, "Last Chapter");
        assert_eq!(last.length, 112.0);
    }

    #[test]
    fn test_ad_defaults() {
        let player = player();
        let info = AdInfo {
            duration: Some(15.0),
            ..Default::default()
        };
        let ad = Projections::new().ad(&player, &info, 2);
        assert_eq!(ad.name, "");
        assert_eq!(ad.ad_id, "");
        assert_eq!(ad.position, 2);
        assert_eq!(ad.length, 15.0);
    }

    #[test]
    fn test_ad_break_start_falls_back_to_playhead() {
        let player = player();
        player.set_current_time(120.0);
        let info = AdBreakInfo {
            id: "mid".into(),
            schedule_time: None,
        };
        let descriptor = Projections::new().ad_break(&player, &info, ad_slot(&player), 2);
        assert_eq!(descriptor.name, "mid");
        assert_eq!(descriptor.start_time, 120.0);
    }
}

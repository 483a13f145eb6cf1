//! Session state machine
//!
//! Turns player events into tracking calls and subscription directives.
//! The machine never touches the player's subscriptions itself: every
//! handler returns an ordered list of [`Action`]s which the bridge executes.
//!
//! ```text
//!   Idle ──source──▶ Started ──playing──▶ Playing ◀──▶ Paused
//!    ▲                  │                    │           │
//!    │                  └───────────┬────────┴───────────┘
//!    │                              ▼
//!    └──────unload/destroy────── Completed ──play──▶ Started (restart)
//! ```

use crate::chapters::{Chapter, ChapterTable};
use crate::error::Error;
use crate::event::{AdBreakInfo, AdInfo, EventKind, PlayerError, PlayerEvent};
use crate::player::Player;
use crate::projection::{self, Projections, QosSampler};
use crate::tracking::{TrackingCall, TrackingEvent, TrackingPayload};
use crate::types::*;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Tracking session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Started,
    Playing,
    Paused,
    Completed,
}

impl Phase {
    /// Check if transition to target phase is valid
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, target),
            // Session start
            (Idle, Started) |
            // Before the first frame
            (Started, Playing) | (Started, Paused) | (Started, Completed) |
            // Play/pause
            (Playing, Paused) | (Paused, Playing) |
            // Completion
            (Playing, Completed) | (Paused, Completed) |
            // Restart
            (Completed, Started) |
            // Session end
            (Started, Idle) | (Playing, Idle) | (Paused, Idle) | (Completed, Idle)
        )
    }

    /// Whether a tracking session is open
    pub fn is_active(&self) -> bool {
        *self != Phase::Idle
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Started => write!(f, "started"),
            Phase::Playing => write!(f, "playing"),
            Phase::Paused => write!(f, "paused"),
            Phase::Completed => write!(f, "completed"),
        }
    }
}

/// An individual ad within a break
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdState {
    pub descriptor: AdDescriptor,
    /// False once the ad completed or was skipped
    pub play: bool,
}

/// The ad break currently playing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdBreakState {
    pub descriptor: AdBreakDescriptor,
    pub slot: AdSlot,
    pub skip_count: u32,
    pub ads_started: u32,
    pub active_ad: Option<AdState>,
    pub last_ad: Option<AdState>,
}

/// Observable session state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    pub seeking: bool,
    pub buffering: bool,
    pub active_ad_break: Option<AdBreakState>,
    /// Position of the active chapter in the chapter table
    pub active_chapter: Option<usize>,
    pub restart_armed: bool,
    pub stream_mode: StreamMode,
    /// Ad breaks started in this session
    pub ad_breaks_started: u32,
    pub post_roll_done: bool,
    /// A seek just closed; the next playing event resumes playback
    pub resume_pending: bool,
}

impl SessionState {
    fn for_mode(stream_mode: StreamMode) -> Self {
        Self {
            stream_mode,
            ..Default::default()
        }
    }
}

/// Directive produced by the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Forward a call to the tracking session
    Track(TrackingCall),
    /// Subscribe the per-source handlers for the current stream mode
    AttachSource,
    /// Release every handler except the lifecycle ones
    DetachSource,
    /// Release every handler
    DetachAll,
    /// Arm the seek-end one-shot and swap the playing handler for a
    /// bracket one-shot
    ArmSeekBracket(SeekEvents),
    /// Release both seek one-shots and restore the playing handler
    DisarmSeekBracket(SeekEvents),
    /// Arm the restart one-shot
    ArmRestart,
    DisarmRestart,
}

impl Action {
    fn event(event: TrackingEvent) -> Self {
        Action::Track(TrackingCall::event(event))
    }

    fn event_with(event: TrackingEvent, payload: TrackingPayload) -> Self {
        Action::Track(TrackingCall::event_with(event, payload))
    }
}

/// Player snapshot and projection overrides available to handlers
#[derive(Clone, Copy)]
pub struct SessionContext<'a> {
    pub player: &'a dyn Player,
    pub projections: &'a Projections,
}

impl<'a> SessionContext<'a> {
    pub fn new(player: &'a dyn Player, projections: &'a Projections) -> Self {
        Self {
            player,
            projections,
        }
    }
}

/// The session state machine
#[derive(Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
    chapters: ChapterTable,
    qos: QosSampler,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn chapters(&self) -> &ChapterTable {
        &self.chapters
    }

    pub fn qos(&self) -> &QosSampler {
        &self.qos
    }

    /// Handle one player event.
    ///
    /// `Err` carries a protocol anomaly; no action must be taken for it.
    pub fn handle(&mut self, event: &PlayerEvent, ctx: SessionContext<'_>) -> Result<Vec<Action>> {
        let seek = self.state.stream_mode.seek_events();
        match event.kind {
            EventKind::SourceLoaded => Ok(self.source_loaded(ctx)),
            EventKind::Ready => Ok(self.ready(ctx)),
            EventKind::SourceUnloaded => Ok(self.source_unloaded()),
            EventKind::Destroy => Ok(self.destroy()),
            EventKind::Play => Ok(self.restart(ctx)),
            EventKind::Playing => self.playing(),
            EventKind::Paused => self.paused(),
            EventKind::StallStarted => Ok(self.stall(true)),
            EventKind::StallEnded => Ok(self.stall(false)),
            kind if kind == seek.start => self.seek_started(),
            kind if kind == seek.end => self.seek_finished(),
            EventKind::AdBreakStarted => self.ad_break_started(event.ad_break_info(), ctx),
            EventKind::AdBreakFinished => self.ad_break_finished(ctx),
            EventKind::AdStarted => self.ad_started(event.ad_info(), ctx),
            EventKind::AdFinished => self.ad_finished(),
            EventKind::AdSkipped => Ok(self.ad_skipped()),
            EventKind::TimeChanged => Ok(self.time_changed(event.time(), ctx)),
            EventKind::VideoPlaybackQualityChanged => Ok(self.quality_changed(event, ctx)),
            EventKind::PlaybackFinished => self.playback_finished(ctx),
            EventKind::Error | EventKind::AdError => Ok(self.error(event)),
            kind => {
                debug!(kind = %kind, mode = %self.state.stream_mode, "Event not tracked in this mode");
                Ok(Vec::new())
            }
        }
    }

    /// Close the session and release everything
    pub fn teardown(&mut self) -> Vec<Action> {
        let mut actions = self.end_session();
        actions.push(Action::DetachAll);
        self.state = SessionState::default();
        actions
    }

    /// Start a session for an already loaded source
    pub fn source_loaded(&mut self, ctx: SessionContext<'_>) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.state.phase.is_active() {
            debug!("New source while a session is active");
            actions.extend(self.end_session());
            actions.push(Action::DetachSource);
        }
        actions.extend(self.start_session(ctx));
        actions
    }

    fn ready(&mut self, ctx: SessionContext<'_>) -> Vec<Action> {
        if self.state.phase.is_active() {
            return Vec::new();
        }
        if ctx.player.source().is_none() {
            debug!("Player ready without a source; waiting for the load");
            return Vec::new();
        }
        self.start_session(ctx)
    }

    fn source_unloaded(&mut self) -> Vec<Action> {
        let mut actions = self.end_session();
        actions.push(Action::DetachSource);
        self.state = SessionState::default();
        self.qos.reset();
        actions
    }

    fn destroy(&mut self) -> Vec<Action> {
        let mut actions = self.end_session();
        actions.push(Action::DetachAll);
        self.state = SessionState::default();
        actions
    }

    fn start_session(&mut self, ctx: SessionContext<'_>) -> Vec<Action> {
        let player = ctx.player;
        let stream_mode = StreamMode::from_live(player.is_live());

        self.chapters = ChapterTable::from_markers(&player.timeline_markers());
        self.qos.source_loaded(player.video_quality().bitrate);
        self.state = SessionState::for_mode(stream_mode);
        self.state.phase = Phase::Started;

        let media = ctx.projections.media(player, stream_mode);
        info!(
            name = %media.name,
            mode = %stream_mode,
            chapters = self.chapters.len(),
            "Tracking session started"
        );

        vec![
            Action::AttachSource,
            Action::Track(TrackingCall::SessionStart {
                media,
                metadata: ctx.projections.custom_metadata(player),
            }),
        ]
    }

    fn end_session(&mut self) -> Vec<Action> {
        if !self.state.phase.is_active() {
            return Vec::new();
        }
        info!(phase = %self.state.phase, "Tracking session ended");
        self.state.phase = Phase::Idle;
        vec![Action::Track(TrackingCall::SessionEnd)]
    }

    fn transition(&mut self, to: Phase) -> Result<()> {
        let from = self.state.phase;
        if !from.can_transition_to(to) {
            return Err(Error::InvalidTransition { from, to });
        }
        debug!(from = %from, to = %to, "Phase transition");
        self.state.phase = to;
        Ok(())
    }

    fn restart(&mut self, ctx: SessionContext<'_>) -> Vec<Action> {
        if !self.state.restart_armed {
            return Vec::new();
        }

        let mode = self.state.stream_mode;
        self.state = SessionState::for_mode(mode);
        self.state.phase = Phase::Started;

        let player = ctx.player;
        self.qos.source_loaded(player.video_quality().bitrate);
        info!("Replay after completion; restarting tracking session");
        vec![
            Action::Track(TrackingCall::SessionEnd),
            Action::Track(TrackingCall::SessionStart {
                media: ctx.projections.media(player, mode),
                metadata: ctx.projections.custom_metadata(player),
            }),
            Action::DisarmRestart,
        ]
    }

    fn playing(&mut self) -> Result<Vec<Action>> {
        let phase = self.state.phase;
        if matches!(phase, Phase::Idle | Phase::Completed) {
            return Err(Error::InvalidTransition {
                from: phase,
                to: Phase::Playing,
            });
        }

        let mut actions = Vec::new();
        let mut resume = std::mem::take(&mut self.state.resume_pending);
        if self.state.seeking {
            debug!("Playback resumed without a seek end");
            actions.extend(self.close_seek());
            resume = true;
        }

        match phase {
            Phase::Started | Phase::Paused => {
                self.transition(Phase::Playing)?;
                self.qos.playback_started();
                actions.push(Action::Track(TrackingCall::Play));
            }
            _ if resume => actions.push(Action::Track(TrackingCall::Play)),
            _ => debug!("Duplicate playing event"),
        }
        Ok(actions)
    }

    fn paused(&mut self) -> Result<Vec<Action>> {
        self.transition(Phase::Paused)?;
        Ok(vec![Action::Track(TrackingCall::Pause)])
    }

    fn stall(&mut self, started: bool) -> Vec<Action> {
        self.state.buffering = started;
        let event = if started {
            TrackingEvent::BufferStart
        } else {
            TrackingEvent::BufferComplete
        };
        vec![Action::event(event)]
    }

    fn require_open_session(&self) -> Result<()> {
        match self.state.phase {
            Phase::Idle => Err(Error::NoActiveSession),
            Phase::Completed => Err(Error::AlreadyCompleted),
            _ => Ok(()),
        }
    }

    fn seek_started(&mut self) -> Result<Vec<Action>> {
        self.require_open_session()?;
        if self.state.seeking {
            return Err(Error::SeekInProgress);
        }
        self.state.seeking = true;
        Ok(vec![
            Action::event(TrackingEvent::SeekStart),
            Action::ArmSeekBracket(self.state.stream_mode.seek_events()),
        ])
    }

    fn seek_finished(&mut self) -> Result<Vec<Action>> {
        if !self.state.seeking {
            return Err(Error::UnmatchedSeekEnd);
        }
        self.state.resume_pending = true;
        Ok(self.close_seek())
    }

    fn close_seek(&mut self) -> Vec<Action> {
        self.state.seeking = false;
        vec![
            Action::event(TrackingEvent::SeekComplete),
            Action::DisarmSeekBracket(self.state.stream_mode.seek_events()),
        ]
    }

    fn ad_break_started(
        &mut self,
        info: Option<&AdBreakInfo>,
        ctx: SessionContext<'_>,
    ) -> Result<Vec<Action>> {
        if !self.state.phase.is_active() {
            return Err(Error::NoActiveSession);
        }

        let mut actions = Vec::new();
        if let Some(previous) = self.state.active_ad_break.take() {
            warn!(name = %previous.descriptor.name, "Ad break started before the previous one finished");
            actions.push(Action::event_with(
                TrackingEvent::AdBreakComplete,
                TrackingPayload::AdBreak(previous.descriptor),
            ));
        }

        let fallback = AdBreakInfo::default();
        let info = info.unwrap_or(&fallback);
        let slot = projection::ad_slot(ctx.player);
        self.state.ad_breaks_started += 1;
        let descriptor =
            ctx.projections
                .ad_break(ctx.player, info, slot, self.state.ad_breaks_started);

        debug!(slot = %slot, position = descriptor.position, "Ad break started");
        actions.push(Action::event_with(
            TrackingEvent::AdBreakStart,
            TrackingPayload::AdBreak(descriptor.clone()),
        ));
        self.state.active_ad_break = Some(AdBreakState {
            descriptor,
            slot,
            skip_count: 0,
            ads_started: 0,
            active_ad: None,
            last_ad: None,
        });
        Ok(actions)
    }

    fn ad_started(&mut self, info: Option<&AdInfo>, ctx: SessionContext<'_>) -> Result<Vec<Action>> {
        let ad_break = self
            .state
            .active_ad_break
            .as_mut()
            .ok_or(Error::AdOutsideBreak)?;

        let fallback = AdInfo::default();
        ad_break.ads_started += 1;
        let descriptor = ctx
            .projections
            .ad(ctx.player, info.unwrap_or(&fallback), ad_break.ads_started);

        if let Some(mut previous) = ad_break.active_ad.take() {
            previous.play = false;
            ad_break.last_ad = Some(previous);
        }
        ad_break.active_ad = Some(AdState {
            descriptor: descriptor.clone(),
            play: true,
        });

        Ok(vec![Action::event_with(
            TrackingEvent::AdStart,
            TrackingPayload::Ad(descriptor),
        )])
    }

    fn ad_finished(&mut self) -> Result<Vec<Action>> {
        let ad_break = self.state.active_ad_break.as_mut().ok_or(Error::NoActiveAd)?;
        let mut ad = ad_break.active_ad.take().ok_or(Error::NoActiveAd)?;
        ad.play = false;
        let descriptor = ad.descriptor.clone();
        ad_break.last_ad = Some(ad);

        Ok(vec![Action::event_with(
            TrackingEvent::AdComplete,
            TrackingPayload::Ad(descriptor),
        )])
    }

    fn ad_skipped(&mut self) -> Vec<Action> {
        let Some(ad_break) = self.state.active_ad_break.as_mut() else {
            debug!("Ad skipped outside of an ad break");
            return Vec::new();
        };
        let Some(mut ad) = ad_break.active_ad.take() else {
            debug!("Ad skipped with no active ad");
            return Vec::new();
        };

        ad.play = false;
        ad_break.skip_count += 1;
        let descriptor = ad.descriptor.clone();
        ad_break.last_ad = Some(ad);

        vec![Action::event_with(
            TrackingEvent::AdSkip,
            TrackingPayload::Ad(descriptor),
        )]
    }

    fn ad_break_finished(&mut self, ctx: SessionContext<'_>) -> Result<Vec<Action>> {
        let mut ad_break = self
            .state
            .active_ad_break
            .take()
            .ok_or(Error::NoActiveAdBreak)?;

        let mut actions = Vec::new();
        if let Some(mut ad) = ad_break.active_ad.take() {
            debug!("Ad break finished with an ad still playing");
            ad.play = false;
            actions.push(Action::event_with(
                TrackingEvent::AdComplete,
                TrackingPayload::Ad(ad.descriptor),
            ));
        }
        actions.push(Action::event_with(
            TrackingEvent::AdBreakComplete,
            TrackingPayload::AdBreak(ad_break.descriptor),
        ));

        if ad_break.slot == AdSlot::Post {
            self.state.post_roll_done = true;
            match self.completion(ctx) {
                Ok(more) => actions.extend(more),
                Err(e) => warn!(error = %e, "Post-roll completion skipped"),
            }
        }
        Ok(actions)
    }

    fn time_changed(&mut self, time: Option<f64>, ctx: SessionContext<'_>) -> Vec<Action> {
        if !self.state.phase.is_active() {
            return Vec::new();
        }
        let time = time.unwrap_or_else(|| ctx.player.current_time());
        let Some(chapter) = self.chapters.locate(time) else {
            return Vec::new();
        };
        if self.state.active_chapter == Some(chapter.position) {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if let Some(outgoing) = self.state.active_chapter {
            if chapter.position != 0 {
                if let Some(outgoing) = self.chapters.get(outgoing) {
                    actions.push(self.chapter_action(TrackingEvent::ChapterComplete, outgoing, ctx));
                }
            }
        }

        debug!(chapter = %chapter.title, position = chapter.position, "Chapter entered");
        actions.push(self.chapter_action(TrackingEvent::ChapterStart, chapter, ctx));
        self.state.active_chapter = Some(chapter.position);
        actions
    }

    fn chapter_action(&self, event: TrackingEvent, chapter: &Chapter, ctx: SessionContext<'_>) -> Action {
        Action::event_with(
            event,
            TrackingPayload::Chapter(ctx.projections.chapter(ctx.player, chapter)),
        )
    }

    fn quality_changed(&mut self, event: &PlayerEvent, ctx: SessionContext<'_>) -> Vec<Action> {
        let bitrate = event
            .quality_change()
            .map_or_else(|| ctx.player.video_quality().bitrate, |change| change.target.bitrate);
        self.qos.set_bitrate(bitrate);
        debug!(bitrate, "Bitrate changed");

        vec![Action::event_with(
            TrackingEvent::BitrateChange,
            TrackingPayload::Qos(self.qos.descriptor(ctx.player)),
        )]
    }

    fn playback_finished(&mut self, ctx: SessionContext<'_>) -> Result<Vec<Action>> {
        if !self.state.phase.is_active() {
            return Err(Error::NoActiveSession);
        }

        let mut actions = self.close_chapter(ctx);
        if ctx.player.has_post_roll() && !self.state.post_roll_done {
            debug!("Content finished; completion deferred to the post-roll");
            return Ok(actions);
        }

        match self.completion(ctx) {
            Ok(more) => actions.extend(more),
            Err(e) if actions.is_empty() => return Err(e),
            Err(e) => warn!(error = %e, "Completion skipped"),
        }
        Ok(actions)
    }

    /// Emit ChapterComplete for the active chapter, if any
    fn close_chapter(&mut self, ctx: SessionContext<'_>) -> Vec<Action> {
        self.state
            .active_chapter
            .take()
            .and_then(|position| self.chapters.get(position))
            .map(|chapter| self.chapter_action(TrackingEvent::ChapterComplete, chapter, ctx))
            .into_iter()
            .collect()
    }

    fn completion(&mut self, ctx: SessionContext<'_>) -> Result<Vec<Action>> {
        if self.state.phase == Phase::Completed {
            return Err(Error::AlreadyCompleted);
        }

        let mut actions = Vec::new();
        if self.state.seeking {
            actions.extend(self.close_seek());
        }
        actions.extend(self.close_chapter(ctx));
        self.transition(Phase::Completed)?;
        self.state.resume_pending = false;
        self.state.restart_armed = true;
        info!("Playback completed");

        actions.push(Action::Track(TrackingCall::Complete));
        actions.push(Action::ArmRestart);
        Ok(actions)
    }

    fn error(&self, event: &PlayerEvent) -> Vec<Action> {
        let error = event
            .player_error()
            .cloned()
            .unwrap_or_else(|| PlayerError::new(0, event.kind.as_str()));
        vec![Action::Track(TrackingCall::Error(error))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPlayer;

    fn player() -> ScriptedPlayer {
        let player = ScriptedPlayer::new();
        player.set_source(SourceDescriptor::titled("Parkour"));
        player.set_duration(300.0);
        player.set_markers(vec![
            TimelineMarker::new(24.0, "First Chapter"),
            TimelineMarker::new(188.0, "Last Chapter"),
        ]);
        player
    }

    fn tracked(actions: &[Action]) -> Vec<&'static str> {
        actions
            .iter()
            .filter_map(|action| match action {
                Action::Track(call) => Some(call.name()),
                _ => None,
            })
            .collect()
    }

    fn run(
        machine: &mut SessionMachine,
        player: &ScriptedPlayer,
        projections: &Projections,
        event: impl Into<PlayerEvent>,
    ) -> Result<Vec<Action>> {
        machine.handle(&event.into(), SessionContext::new(player, projections))
    }

    #[test]
    fn test_phase_transitions() {
        assert!(Phase::Idle.can_transition_to(Phase::Started));
        assert!(Phase::Playing.can_transition_to(Phase::Paused));
        assert!(Phase::Completed.can_transition_to(Phase::Started));
        assert!(!Phase::Idle.can_transition_to(Phase::Playing));
        assert!(!Phase::Completed.can_transition_to(Phase::Playing));
        assert!(!Phase::Paused.can_transition_to(Phase::Paused));
    }

    #[test]
    fn test_source_load_starts_session() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();

        let actions = run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();
        assert_eq!(actions[0], Action::AttachSource);
        assert_eq!(tracked(&actions), vec!["sessionStart"]);
        assert_eq!(machine.phase(), Phase::Started);
        assert_eq!(machine.chapters().len(), 2);

        // Ready after the load does not open a second session
        let actions = run(&mut machine, &player, &projections, EventKind::Ready).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_ready_without_source_waits_for_load() {
        let player = ScriptedPlayer::new();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();

        let actions = run(&mut machine, &player, &projections, EventKind::Ready).unwrap();
        assert!(actions.is_empty());
        assert_eq!(machine.phase(), Phase::Idle);

        player.set_source(SourceDescriptor::titled("Parkour"));
        let actions = run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();
        assert_eq!(tracked(&actions), vec!["sessionStart"]);
    }

    #[test]
    fn test_reload_ends_previous_session() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();

        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();
        run(&mut machine, &player, &projections, EventKind::Playing).unwrap();
        let actions = run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();

        assert_eq!(
            actions[..3],
            [
                Action::Track(TrackingCall::SessionEnd),
                Action::DetachSource,
                Action::AttachSource
            ]
        );
        assert_eq!(machine.phase(), Phase::Started);
    }

    #[test]
    fn test_playing_before_session_is_anomaly() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();

        let err = run(&mut machine, &player, &projections, EventKind::Playing).unwrap_err();
        assert!(err.is_anomaly());
        assert_eq!(machine.phase(), Phase::Idle);
    }

    #[test]
    fn test_seek_bracket_actions() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();
        let vod = StreamMode::OnDemand.seek_events();

        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();
        run(&mut machine, &player, &projections, EventKind::Playing).unwrap();

        let actions = run(&mut machine, &player, &projections, EventKind::Seek).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::event(TrackingEvent::SeekStart),
                Action::ArmSeekBracket(vod)
            ]
        );
        assert!(machine.state().seeking);

        let err = run(&mut machine, &player, &projections, EventKind::Seek).unwrap_err();
        assert!(matches!(err, Error::SeekInProgress));

        let actions = run(&mut machine, &player, &projections, EventKind::Seeked).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::event(TrackingEvent::SeekComplete),
                Action::DisarmSeekBracket(vod)
            ]
        );

        let actions = run(&mut machine, &player, &projections, EventKind::Playing).unwrap();
        assert_eq!(tracked(&actions), vec!["play"]);

        let err = run(&mut machine, &player, &projections, EventKind::Seeked).unwrap_err();
        assert!(matches!(err, Error::UnmatchedSeekEnd));
    }

    #[test]
    fn test_live_ignores_on_demand_seek_events() {
        let player = player();
        player.set_live(true);
        let projections = Projections::new();
        let mut machine = SessionMachine::new();

        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();
        assert!(run(&mut machine, &player, &projections, EventKind::Seek)
            .unwrap()
            .is_empty());
        let actions = run(&mut machine, &player, &projections, EventKind::TimeShift).unwrap();
        assert_eq!(tracked(&actions), vec!["seekStart"]);
    }

    #[test]
    fn test_ad_events_outside_break() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();
        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();

        let err = run(&mut machine, &player, &projections, EventKind::AdStarted).unwrap_err();
        assert!(matches!(err, Error::AdOutsideBreak));
        let err = run(&mut machine, &player, &projections, EventKind::AdFinished).unwrap_err();
        assert!(matches!(err, Error::NoActiveAd));
        assert!(run(&mut machine, &player, &projections, EventKind::AdSkipped)
            .unwrap()
            .is_empty());
        let err = run(&mut machine, &player, &projections, EventKind::AdBreakFinished).unwrap_err();
        assert!(matches!(err, Error::NoActiveAdBreak));
    }

    #[test]
    fn test_ad_skip_keeps_last_ad() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();
        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();

        let info = AdBreakInfo {
            id: "pre".into(),
            schedule_time: Some(0.0),
        };
        run(
            &mut machine,
            &player,
            &projections,
            PlayerEvent::ad_break(EventKind::AdBreakStarted, info),
        )
        .unwrap();
        run(&mut machine, &player, &projections, EventKind::AdStarted).unwrap();
        let actions = run(&mut machine, &player, &projections, EventKind::AdSkipped).unwrap();
        assert_eq!(tracked(&actions), vec!["adSkip"]);

        let ad_break = machine.state().active_ad_break.as_ref().unwrap();
        assert_eq!(ad_break.slot, AdSlot::Pre);
        assert_eq!(ad_break.skip_count, 1);
        assert!(ad_break.active_ad.is_none());
        assert!(!ad_break.last_ad.as_ref().unwrap().play);
    }

    #[test]
    fn test_completion_once_and_restart() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();
        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();
        run(&mut machine, &player, &projections, EventKind::Playing).unwrap();

        let actions = run(&mut machine, &player, &projections, EventKind::PlaybackFinished).unwrap();
        assert_eq!(tracked(&actions), vec!["complete"]);
        assert_eq!(actions.last(), Some(&Action::ArmRestart));

        let err = run(&mut machine, &player, &projections, EventKind::PlaybackFinished).unwrap_err();
        assert!(matches!(err, Error::AlreadyCompleted));

        let actions = run(&mut machine, &player, &projections, EventKind::Play).unwrap();
        assert_eq!(tracked(&actions), vec!["sessionEnd", "sessionStart"]);
        assert_eq!(actions.last(), Some(&Action::DisarmRestart));
        assert_eq!(machine.phase(), Phase::Started);
        assert!(!machine.state().restart_armed);
    }

    #[test]
    fn test_restart_measures_startup_again() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();
        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();
        run(&mut machine, &player, &projections, EventKind::Playing).unwrap();
        assert!(machine.qos().startup_time_ms().is_some());

        run(&mut machine, &player, &projections, EventKind::PlaybackFinished).unwrap();
        run(&mut machine, &player, &projections, EventKind::Play).unwrap();
        assert!(machine.qos().startup_time_ms().is_none());

        run(&mut machine, &player, &projections, EventKind::Playing).unwrap();
        assert!(machine.qos().startup_time_ms().is_some());
    }

    #[test]
    fn test_post_roll_closes_chapter_before_complete() {
        let player = player();
        player.set_post_roll(true);
        let projections = Projections::new();
        let mut machine = SessionMachine::new();
        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();
        run(&mut machine, &player, &projections, EventKind::Playing).unwrap();
        run(&mut machine, &player, &projections, PlayerEvent::time_changed(250.0)).unwrap();

        player.set_current_time(300.0);
        run(
            &mut machine,
            &player,
            &projections,
            PlayerEvent::ad_break(EventKind::AdBreakStarted, AdBreakInfo::default()),
        )
        .unwrap();
        let actions = run(&mut machine, &player, &projections, EventKind::AdBreakFinished).unwrap();
        assert_eq!(
            tracked(&actions),
            vec!["adBreakComplete", "chapterComplete", "complete"]
        );
        assert_eq!(machine.state().active_chapter, None);
    }

    #[test]
    fn test_post_roll_defers_completion() {
        let player = player();
        player.set_post_roll(true);
        let projections = Projections::new();
        let mut machine = SessionMachine::new();
        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();
        run(&mut machine, &player, &projections, EventKind::Playing).unwrap();

        let actions = run(&mut machine, &player, &projections, EventKind::PlaybackFinished).unwrap();
        assert!(tracked(&actions).is_empty());

        player.set_current_time(300.0);
        run(
            &mut machine,
            &player,
            &projections,
            PlayerEvent::ad_break(EventKind::AdBreakStarted, AdBreakInfo::default()),
        )
        .unwrap();
        let actions = run(&mut machine, &player, &projections, EventKind::AdBreakFinished).unwrap();
        assert_eq!(tracked(&actions), vec!["adBreakComplete", "complete"]);
    }

    #[test]
    fn test_teardown_ends_session() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();
        run(&mut machine, &player, &projections, EventKind::SourceLoaded).unwrap();

        let actions = machine.teardown();
        assert_eq!(
            actions,
            vec![Action::Track(TrackingCall::SessionEnd), Action::DetachAll]
        );
        assert_eq!(machine.teardown(), vec![Action::DetachAll]);
    }

    #[test]
    fn test_errors_are_forwarded() {
        let player = player();
        let projections = Projections::new();
        let mut machine = SessionMachine::new();

        let actions = run(
            &mut machine,
            &player,
            &projections,
            PlayerEvent::error(EventKind::AdError, PlayerError::new(1001, "AD_TIMEOUT")),
        )
        .unwrap();
        assert_eq!(
            actions,
            vec![Action::Track(TrackingCall::Error(PlayerError::new(1001, "AD_TIMEOUT")))]
        );
    }
}

//! Bridge controller
//!
//! Owns the handle registry and the session state machine for one player.
//! Player callbacks hold a weak reference back to the bridge, so dropping
//! the [`Bridge`] tears everything down even while the player outlives it.

use crate::event::{EventKind, PlayerEvent};
use crate::player::{Player, PlayerCallback};
use crate::projection::{self, Projections};
use crate::registry::{HandleId, HandleInfo, HandleRegistry, HandleRole};
use crate::session::{Action, Phase, SessionContext, SessionMachine, SessionState};
use crate::tracking::{LoggingTracker, TrackingConfig, TrackingSession};
use crate::types::{QosDescriptor, StreamMode};
use crate::Result;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, instrument, warn};

/// Subscribed for the whole attachment
const LIFECYCLE_EVENTS: [EventKind; 6] = [
    EventKind::SourceLoaded,
    EventKind::Ready,
    EventKind::SourceUnloaded,
    EventKind::Error,
    EventKind::AdError,
    EventKind::Destroy,
];

/// Subscribed while a source is loaded, in addition to the mode's seek start
const SOURCE_EVENTS: [EventKind; 12] = [
    EventKind::Playing,
    EventKind::Paused,
    EventKind::StallStarted,
    EventKind::StallEnded,
    EventKind::AdBreakStarted,
    EventKind::AdBreakFinished,
    EventKind::AdStarted,
    EventKind::AdFinished,
    EventKind::AdSkipped,
    EventKind::TimeChanged,
    EventKind::VideoPlaybackQualityChanged,
    EventKind::PlaybackFinished,
];

struct Inner {
    me: Weak<Inner>,
    player: Rc<dyn Player>,
    registry: HandleRegistry<dyn Player>,
    machine: RefCell<SessionMachine>,
    projections: Projections,
    tracker: Box<dyn TrackingSession>,
    config: TrackingConfig,
    torn_down: Cell<bool>,
}

impl Inner {
    fn register(&self, kind: EventKind, role: HandleRole) -> HandleId {
        let weak = self.me.clone();
        let callback: PlayerCallback = Rc::new(move |event: &PlayerEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(event);
            }
        });
        self.registry.register(kind, role, callback)
    }

    fn dispatch(&self, event: &PlayerEvent) {
        if self.torn_down.get() {
            return;
        }
        debug!(kind = %event.kind, "Player event");

        let result = {
            let mut machine = self.machine.borrow_mut();
            machine.handle(event, SessionContext::new(&*self.player, &self.projections))
        };

        match result {
            Ok(actions) => self.execute(actions),
            Err(e) if e.is_anomaly() => {
                warn!(kind = %event.kind, code = e.error_code(), error = %e, "Ignoring player event")
            }
            Err(e) => error!(kind = %event.kind, error = %e, "Player event failed"),
        }
    }

    fn execute(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Track(call) => call.dispatch(&*self.tracker),
                Action::AttachSource => self.attach_source(),
                Action::DetachSource => {
                    let released = self
                        .registry
                        .release_where(|handle| handle.role != HandleRole::Lifecycle);
                    debug!(released, "Source handlers released");
                }
                Action::DetachAll => {
                    let released = self.registry.release_all();
                    debug!(released, "All handlers released");
                }
                Action::ArmSeekBracket(events) => {
                    self.registry.release_role(EventKind::Playing, HandleRole::Phase);
                    self.register(EventKind::Playing, HandleRole::SeekBracket);
                    self.register(events.end, HandleRole::SeekBracket);
                }
                Action::DisarmSeekBracket(events) => {
                    self.registry.release_role(events.end, HandleRole::SeekBracket);
                    self.registry
                        .release_role(EventKind::Playing, HandleRole::SeekBracket);
                    self.register(EventKind::Playing, HandleRole::Phase);
                }
                Action::ArmRestart => {
                    self.register(EventKind::Play, HandleRole::Restart);
                }
                Action::DisarmRestart => {
                    self.registry.release_role(EventKind::Play, HandleRole::Restart);
                }
            }
        }
    }

    fn attach_source(&self) {
        let mode = self.machine.borrow().state().stream_mode;
        for kind in SOURCE_EVENTS {
            self.register(kind, HandleRole::Phase);
        }
        self.register(mode.seek_events().start, HandleRole::Phase);
        debug!(mode = %mode, handles = self.registry.len(), "Source handlers attached");
    }
}

/// Connects one player to one tracking session
pub struct Bridge {
    inner: Rc<Inner>,
}

impl Bridge {
    /// Validate `config`, subscribe to `player` and start tracking.
    ///
    /// When the player already has a source loaded the session starts
    /// immediately.
    #[instrument(skip_all, fields(tracking_server = %config.tracking_server))]
    pub fn attach<T>(
        config: TrackingConfig,
        player: Rc<dyn Player>,
        projections: Projections,
        tracker: T,
    ) -> Result<Self>
    where
        T: TrackingSession + 'static,
    {
        config.validate()?;

        let tracker: Box<dyn TrackingSession> = if config.debug_logging {
            Box::new(LoggingTracker::new(tracker))
        } else {
            Box::new(tracker)
        };

        let inner = Rc::new_cyclic(|me| Inner {
            me: me.clone(),
            registry: HandleRegistry::new(player.clone()),
            player,
            machine: RefCell::new(SessionMachine::new()),
            projections,
            tracker,
            config,
            torn_down: Cell::new(false),
        });

        for kind in LIFECYCLE_EVENTS {
            inner.register(kind, HandleRole::Lifecycle);
        }

        if inner.player.source().is_some() {
            let actions = {
                let mut machine = inner.machine.borrow_mut();
                machine.source_loaded(SessionContext::new(&*inner.player, &inner.projections))
            };
            inner.execute(actions);
        }

        info!(
            channel = %inner.config.channel,
            handles = inner.registry.len(),
            "Bridge attached"
        );
        Ok(Self { inner })
    }

    /// End an active session and release every handler.
    ///
    /// Only the first call has an effect.
    pub fn teardown(&self) {
        if self.inner.torn_down.replace(true) {
            return;
        }
        let actions = self.inner.machine.borrow_mut().teardown();
        self.inner.execute(actions);
        info!("Bridge torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.get()
    }

    /// Snapshot of the session state
    pub fn state(&self) -> SessionState {
        self.inner.machine.borrow().state().clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.machine.borrow().phase()
    }

    pub fn stream_mode(&self) -> StreamMode {
        self.inner.machine.borrow().state().stream_mode
    }

    /// Live handlers, oldest first
    pub fn handles(&self) -> Vec<HandleInfo> {
        self.inner.registry.handles()
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.inner.config
    }

    /// Delegate the analytics collector polls for playhead and QoS
    pub fn delegate(&self) -> MediaDelegate {
        MediaDelegate {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("phase", &self.phase())
            .field("handles", &self.inner.registry.len())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

/// Polled by the analytics collector between tracking calls.
///
/// Returns neutral values once the bridge is gone.
#[derive(Clone)]
pub struct MediaDelegate {
    inner: Weak<Inner>,
}

impl MediaDelegate {
    /// Playhead in seconds, zero when unknown
    pub fn current_playback_time(&self) -> f64 {
        self.inner
            .upgrade()
            .map_or(0.0, |inner| projection::playhead(&*inner.player))
    }

    pub fn qos(&self) -> QosDescriptor {
        self.inner.upgrade().map_or_else(QosDescriptor::default, |inner| {
            inner.machine.borrow().qos().descriptor(&*inner.player)
        })
    }
}

//! Handle registry for player subscriptions
//!
//! Every callback the bridge registers with the player is tracked here so
//! that it can be released individually (one-shot handlers), by scope
//! (source unload) or all at once (teardown).

use crate::error::Error;
use crate::event::EventKind;
use crate::player::{EventSource, PlayerCallback};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tracing::{trace, warn};

/// Identifier of a registered handle, monotonically increasing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId(pub u64);

/// Why a handle was registered; decides when it is released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleRole {
    /// Lives for the whole attachment
    Lifecycle,
    /// Lives while a source is loaded
    Phase,
    /// One-shot armed while a seek is in progress
    SeekBracket,
    /// One-shot armed after completion to catch a replay
    Restart,
}

/// Metadata of a live handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleInfo {
    pub id: HandleId,
    pub kind: EventKind,
    pub role: HandleRole,
}

/// An active subscription on an event source.
///
/// Releasing is idempotent: only the first call reaches `off`.
pub struct Subscription<S: EventSource + ?Sized> {
    source: Rc<S>,
    kind: EventKind,
    callback: PlayerCallback,
    released: Cell<bool>,
}

impl<S: EventSource + ?Sized> Subscription<S> {
    /// Subscribe `callback` on `source`; active immediately
    pub fn subscribe(source: Rc<S>, kind: EventKind, callback: PlayerCallback) -> Self {
        source.on(kind, callback.clone());
        Self {
            source,
            kind,
            callback,
            released: Cell::new(false),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_released(&self) -> bool {
        self.released.get()
    }

    pub fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        self.source.off(self.kind, &self.callback);
    }
}

struct Handle<S: EventSource + ?Sized> {
    id: HandleId,
    role: HandleRole,
    subscription: Subscription<S>,
}

impl<S: EventSource + ?Sized> Handle<S> {
    fn info(&self) -> HandleInfo {
        HandleInfo {
            id: self.id,
            kind: self.subscription.kind(),
            role: self.role,
        }
    }
}

struct Slots<S: EventSource + ?Sized> {
    next_id: u64,
    by_kind: HashMap<EventKind, VecDeque<Handle<S>>>,
}

impl<S: EventSource + ?Sized> Slots<S> {
    fn take_first(&mut self, kind: EventKind, role: Option<HandleRole>) -> Option<Handle<S>> {
        let queue = self.by_kind.get_mut(&kind)?;
        let index = queue
            .iter()
            .position(|handle| role.map_or(true, |role| handle.role == role))?;
        let handle = queue.remove(index);
        if queue.is_empty() {
            self.by_kind.remove(&kind);
        }
        handle
    }

    fn take_oldest(&mut self) -> Option<Handle<S>> {
        let kind = self
            .by_kind
            .iter()
            .filter_map(|(kind, queue)| queue.front().map(|handle| (handle.id, *kind)))
            .min_by_key(|(id, _)| *id)
            .map(|(_, kind)| kind)?;
        self.take_first(kind, None)
    }
}

/// Registry of live subscriptions on one event source
pub struct HandleRegistry<S: EventSource + ?Sized> {
    source: Rc<S>,
    slots: RefCell<Slots<S>>,
}

impl<S: EventSource + ?Sized> HandleRegistry<S> {
    pub fn new(source: Rc<S>) -> Self {
        Self {
            source,
            slots: RefCell::new(Slots {
                next_id: 0,
                by_kind: HashMap::new(),
            }),
        }
    }

    /// Subscribe `callback` and track the resulting handle
    pub fn register(&self, kind: EventKind, role: HandleRole, callback: PlayerCallback) -> HandleId {
        let subscription = Subscription::subscribe(self.source.clone(), kind, callback);

        let mut slots = self.slots.borrow_mut();
        let id = HandleId(slots.next_id);
        slots.next_id += 1;
        slots.by_kind.entry(kind).or_default().push_back(Handle {
            id,
            role,
            subscription,
        });

        trace!(kind = %kind, role = ?role, id = id.0, "Handle registered");
        id
    }

    /// First live handle for `kind` in insertion order
    pub fn find_by_kind(&self, kind: EventKind) -> Option<HandleInfo> {
        self.slots
            .borrow()
            .by_kind
            .get(&kind)
            .and_then(|queue| queue.front())
            .map(Handle::info)
    }

    /// Release the first live handle for `kind`.
    ///
    /// Returns false when nothing is registered for `kind`; this happens
    /// when teardown requests race each other and is not an error.
    pub fn release_by_kind(&self, kind: EventKind) -> bool {
        let handle = self.slots.borrow_mut().take_first(kind, None);
        self.release_or_warn(kind, handle)
    }

    /// Release the first live handle for `kind` registered with `role`
    pub fn release_role(&self, kind: EventKind, role: HandleRole) -> bool {
        let handle = self.slots.borrow_mut().take_first(kind, Some(role));
        self.release_or_warn(kind, handle)
    }

    fn release_or_warn(&self, kind: EventKind, handle: Option<Handle<S>>) -> bool {
        match Self::release_taken(kind, handle) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Release skipped");
                false
            }
        }
    }

    fn release_taken(kind: EventKind, handle: Option<Handle<S>>) -> Result<()> {
        let handle = handle.ok_or(Error::HandleNotFound { kind })?;
        trace!(kind = %kind, id = handle.id.0, "Handle released");
        handle.subscription.release();
        Ok(())
    }

    /// Release every handle matching `predicate`, oldest first.
    ///
    /// Returns the number of released handles.
    pub fn release_where(&self, predicate: impl Fn(&HandleInfo) -> bool) -> usize {
        let mut taken: Vec<Handle<S>> = {
            let mut slots = self.slots.borrow_mut();
            let mut taken = Vec::new();
            for queue in slots.by_kind.values_mut() {
                let mut index = 0;
                while index < queue.len() {
                    if predicate(&queue[index].info()) {
                        taken.extend(queue.remove(index));
                    } else {
                        index += 1;
                    }
                }
            }
            slots.by_kind.retain(|_, queue| !queue.is_empty());
            taken
        };

        taken.sort_by_key(|handle| handle.id);
        for handle in &taken {
            handle.subscription.release();
        }
        taken.len()
    }

    /// Release every handle exactly once.
    ///
    /// Handles registered while the drain is running are drained as well.
    pub fn release_all(&self) -> usize {
        let mut released = 0;
        loop {
            let next = self.slots.borrow_mut().take_oldest();
            let Some(handle) = next else {
                break;
            };
            handle.subscription.release();
            released += 1;
        }
        if released > 0 {
            trace!(released, "Registry drained");
        }
        released
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.slots.borrow().by_kind.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().by_kind.is_empty()
    }

    /// Number of live handles for `kind`
    pub fn count(&self, kind: EventKind) -> usize {
        self.slots
            .borrow()
            .by_kind
            .get(&kind)
            .map_or(0, VecDeque::len)
    }

    /// Metadata of every live handle, oldest first
    pub fn handles(&self) -> Vec<HandleInfo> {
        let slots = self.slots.borrow();
        let mut infos: Vec<HandleInfo> = slots
            .by_kind
            .values()
            .flat_map(|queue| queue.iter().map(Handle::info))
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }
}

impl<S: EventSource + ?Sized> Drop for HandleRegistry<S> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PlayerEvent;
    use std::rc::Weak;

    #[derive(Default)]
    struct CountingSource {
        callbacks: RefCell<Vec<(EventKind, PlayerCallback)>>,
        offs: Cell<usize>,
        unmatched_offs: Cell<usize>,
        on_off: RefCell<Option<Box<dyn Fn()>>>,
    }

    impl EventSource for CountingSource {
        fn on(&self, kind: EventKind, callback: PlayerCallback) {
            self.callbacks.borrow_mut().push((kind, callback));
        }

        fn off(&self, kind: EventKind, callback: &PlayerCallback) {
            self.offs.set(self.offs.get() + 1);
            let removed = {
                let mut callbacks = self.callbacks.borrow_mut();
                let before = callbacks.len();
                callbacks.retain(|(k, cb)| !(*k == kind && Rc::ptr_eq(cb, callback)));
                before != callbacks.len()
            };
            if !removed {
                self.unmatched_offs.set(self.unmatched_offs.get() + 1);
            }
            let hook = self.on_off.borrow_mut().take();
            if let Some(hook) = hook {
                hook();
            }
        }
    }

    fn noop() -> PlayerCallback {
        Rc::new(|_: &PlayerEvent| {})
    }

    #[test]
    fn test_register_and_find() {
        let source = Rc::new(CountingSource::default());
        let registry = HandleRegistry::new(source.clone());

        let first = registry.register(EventKind::Play, HandleRole::Phase, noop());
        registry.register(EventKind::Play, HandleRole::Restart, noop());
        registry.register(EventKind::Paused, HandleRole::Phase, noop());

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.count(EventKind::Play), 2);
        assert_eq!(source.callbacks.borrow().len(), 3);

        let found = registry.find_by_kind(EventKind::Play).unwrap();
        assert_eq!(found.id, first);
        assert_eq!(found.role, HandleRole::Phase);
        assert!(registry.find_by_kind(EventKind::Seeked).is_none());
    }

    #[test]
    fn test_release_by_kind_missing_is_recoverable() {
        let source = Rc::new(CountingSource::default());
        let registry = HandleRegistry::new(source.clone());

        assert!(!registry.release_by_kind(EventKind::Seeked));
        registry.register(EventKind::Seeked, HandleRole::SeekBracket, noop());
        assert!(registry.release_by_kind(EventKind::Seeked));
        assert!(!registry.release_by_kind(EventKind::Seeked));
        assert_eq!(source.offs.get(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_missing_reports_handle_not_found() {
        let err = HandleRegistry::<CountingSource>::release_taken(EventKind::Seeked, None).unwrap_err();
        assert!(matches!(err, Error::HandleNotFound { kind: EventKind::Seeked }));
        assert!(err.is_anomaly());
    }

    #[test]
    fn test_release_role_skips_other_roles() {
        let source = Rc::new(CountingSource::default());
        let registry = HandleRegistry::new(source.clone());

        registry.register(EventKind::Play, HandleRole::Phase, noop());
        let restart = registry.register(EventKind::Play, HandleRole::Restart, noop());

        assert!(registry.release_role(EventKind::Play, HandleRole::Restart));
        let remaining = registry.handles();
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, restart);
        assert_eq!(remaining[0].role, HandleRole::Phase);
    }

    #[test]
    fn test_release_where_keeps_lifecycle_handles() {
        let source = Rc::new(CountingSource::default());
        let registry = HandleRegistry::new(source.clone());

        registry.register(EventKind::SourceLoaded, HandleRole::Lifecycle, noop());
        registry.register(EventKind::Playing, HandleRole::Phase, noop());
        registry.register(EventKind::Seeked, HandleRole::SeekBracket, noop());
        registry.register(EventKind::Destroy, HandleRole::Lifecycle, noop());

        let released = registry.release_where(|info| info.role != HandleRole::Lifecycle);
        assert_eq!(released, 2);
        let kinds: Vec<_> = registry.handles().iter().map(|info| info.kind).collect();
        assert_eq!(kinds, vec![EventKind::SourceLoaded, EventKind::Destroy]);
        assert_eq!(source.callbacks.borrow().len(), 2);
    }

    #[test]
    fn test_release_all_is_idempotent() {
        let source = Rc::new(CountingSource::default());
        let registry = HandleRegistry::new(source.clone());

        for kind in [EventKind::Play, EventKind::Paused, EventKind::Playing] {
            registry.register(kind, HandleRole::Phase, noop());
        }

        assert_eq!(registry.release_all(), 3);
        assert_eq!(registry.release_all(), 0);
        assert_eq!(source.offs.get(), 3);
        assert_eq!(source.unmatched_offs.get(), 0);
        assert!(source.callbacks.borrow().is_empty());
    }

    #[test]
    fn test_release_all_drains_reentrant_registrations() {
        let source = Rc::new(CountingSource::default());
        let registry = Rc::new(HandleRegistry::new(source.clone()));

        registry.register(EventKind::Play, HandleRole::Phase, noop());
        registry.register(EventKind::Paused, HandleRole::Phase, noop());

        let weak: Weak<HandleRegistry<CountingSource>> = Rc::downgrade(&registry);
        *source.on_off.borrow_mut() = Some(Box::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry.register(EventKind::Seeked, HandleRole::SeekBracket, noop());
            }
        }));

        assert_eq!(registry.release_all(), 3);
        assert!(registry.is_empty());
        assert!(source.callbacks.borrow().is_empty());
    }

    #[test]
    fn test_subscription_double_release() {
        let source = Rc::new(CountingSource::default());
        let subscription = Subscription::subscribe(source.clone(), EventKind::Error, noop());

        subscription.release();
        subscription.release();
        assert!(subscription.is_released());
        assert_eq!(source.offs.get(), 1);
    }
}

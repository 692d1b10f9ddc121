//! Events: deferred callback invocations with cancellation support.
//!
//! An [`Event`] pairs a callback with the delay at which it should fire.
//! Two shapes cover every use: a zero-argument callback bound to a receiver
//! ([`Event::call`]) and a one-argument callback carrying a payload captured
//! by value at construction ([`Event::with_data`]). Receivers are
//! `Rc<RefCell<_>>` components; the event holds them weakly, so a receiver
//! that is dropped while the event is still pending is a wiring bug and
//! aborts at dispatch.

use crate::queue::Simulator;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

/// A strictly increasing event identifier, unique within its [`Simulator`].
///
/// Ids are minted when the event is *constructed*, not when it is inserted
/// into the queue. Among events with equal expiry the smaller id fires
/// first, so simultaneous events dispatch in construction order regardless
/// of insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub(crate) u64);

impl EventId {
    /// The raw counter value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

/// A deferred callback plus the delay at which it should fire.
///
/// Ownership moves into the [`Simulator`] on [`add`](Simulator::add); the
/// queue drops the event after it executes. An event cannot be rescheduled —
/// scheduling again means constructing a new one.
pub struct Event {
    pub(crate) id: EventId,
    pub(crate) delta: Duration,
    pub(crate) active: Rc<Cell<bool>>,
    pub(crate) exec: Box<dyn FnOnce()>,
}

impl Event {
    /// Zero-argument callback: invoke `method` on `receiver`, `delta` after
    /// the event is scheduled.
    pub fn call<C: 'static>(
        sim: &Simulator,
        receiver: &Rc<RefCell<C>>,
        method: fn(&mut C),
        delta: Duration,
    ) -> Self {
        let target = Rc::downgrade(receiver);
        let id = sim.next_event_id();
        Self {
            id,
            delta,
            active: Rc::new(Cell::new(true)),
            exec: Box::new(move || {
                let receiver = upgrade_receiver(&target, id);
                method(&mut receiver.borrow_mut());
            }),
        }
    }

    /// One-argument callback: invoke `method` on `receiver` with `payload`,
    /// `delta` after the event is scheduled.
    ///
    /// The payload is captured by value here, at construction time.
    pub fn with_data<C: 'static, P: 'static>(
        sim: &Simulator,
        receiver: &Rc<RefCell<C>>,
        method: fn(&mut C, P),
        payload: P,
        delta: Duration,
    ) -> Self {
        let target = Rc::downgrade(receiver);
        let id = sim.next_event_id();
        Self {
            id,
            delta,
            active: Rc::new(Cell::new(true)),
            exec: Box::new(move || {
                let receiver = upgrade_receiver(&target, id);
                method(&mut receiver.borrow_mut(), payload);
            }),
        }
    }

    /// Internal shape used by the signal layer: an arbitrary one-shot
    /// closure. Not public — user events reduce to `call` or `with_data`.
    pub(crate) fn from_fn(sim: &Simulator, delta: Duration, exec: impl FnOnce() + 'static) -> Self {
        Self {
            id: sim.next_event_id(),
            delta,
            active: Rc::new(Cell::new(true)),
            exec: Box::new(exec),
        }
    }

    /// The event's identifier.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// The delay requested at construction.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// A cancellation handle sharing this event's liveness flag.
    ///
    /// [`Simulator::add`] returns the same handle; taking one before
    /// insertion is only needed when the handle must be captured by another
    /// event constructed first.
    pub fn handle(&self) -> EventHandle {
        EventHandle {
            id: self.id,
            active: Rc::clone(&self.active),
        }
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("delta", &self.delta)
            .field("active", &self.active.get())
            .finish_non_exhaustive()
    }
}

fn upgrade_receiver<C>(target: &Weak<RefCell<C>>, id: EventId) -> Rc<RefCell<C>> {
    target
        .upgrade()
        .unwrap_or_else(|| panic!("{id}: receiver dropped before the event fired"))
}

/// Cancellation handle for a scheduled event.
///
/// `cancel` is idempotent and irreversible. The queue does not remove a
/// cancelled entry eagerly; it is tombstoned in place and skipped when it
/// reaches the head.
#[derive(Debug, Clone)]
pub struct EventHandle {
    id: EventId,
    active: Rc<Cell<bool>>,
}

impl EventHandle {
    /// Prevent the event from executing. Legal at any time before dispatch.
    pub fn cancel(&self) {
        self.active.set(false);
    }

    /// Whether the event is still eligible to execute.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// The identifier of the event this handle controls.
    pub fn id(&self) -> EventId {
        self.id
    }
}

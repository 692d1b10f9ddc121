//! Virtual clock and priority-ordered event queue.
//!
//! [`Simulator`] replaces the classic process-wide scheduler singleton with
//! an explicitly constructed handle. Cloning is cheap; every clone refers to
//! the same clock and queue, so components store one at construction and
//! schedule through it.
//!
//! Events are ordered by `(expire_at, id)`: earliest expiry first, and among
//! simultaneous events the one constructed first. The queue is a binary
//! min-heap (reversed `Ord`); cancelled entries are tombstoned in place and
//! skipped when popped, which keeps cancellation O(1) without heap repair.

use crate::event::{Event, EventHandle, EventId};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace};

/// An event that has been inserted into the queue.
///
/// `expire_at` is fixed at insertion (`now + delta`) and never recomputed;
/// equal-expiry comparisons are exact comparisons of this stored value.
struct Scheduled {
    expire_at: Duration,
    id: EventId,
    active: Rc<Cell<bool>>,
    exec: Box<dyn FnOnce()>,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.expire_at == other.expire_at && self.id == other.id
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reversed so `BinaryHeap` pops the smallest `(expire_at, id)` first.
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .expire_at
            .cmp(&self.expire_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Counters accumulated by the run loop.
#[derive(Debug, Default, Clone)]
pub struct KernelStats {
    /// Events inserted via [`Simulator::add`].
    pub events_scheduled: u64,
    /// Events whose callback actually ran.
    pub events_processed: u64,
    /// Events popped in the cancelled state and discarded unexecuted.
    pub events_cancelled: u64,
}

struct Kernel {
    now: Duration,
    queue: BinaryHeap<Scheduled>,
    next_id: u64,
    keep_running: bool,
    stats: KernelStats,
}

/// The virtual-time scheduler: current time, pending events, run control.
///
/// Strictly single-threaded and cooperative. A callback runs to completion
/// before the next event is considered; anything a callback schedules is
/// appended behind already-queued equal-expiry events and never preempts.
#[derive(Clone)]
pub struct Simulator {
    inner: Rc<RefCell<Kernel>>,
}

impl Simulator {
    /// Create a scheduler with an empty queue and `now` at zero.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Kernel {
                now: Duration::ZERO,
                queue: BinaryHeap::new(),
                next_id: 0,
                keep_running: false,
                stats: KernelStats::default(),
            })),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of pending (possibly cancelled) entries in the queue.
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Snapshot of the run-loop counters.
    pub fn stats(&self) -> KernelStats {
        self.inner.borrow().stats.clone()
    }

    /// Mint the id for an event under construction.
    pub(crate) fn next_event_id(&self) -> EventId {
        let mut kernel = self.inner.borrow_mut();
        let id = EventId(kernel.next_id);
        kernel.next_id += 1;
        id
    }

    /// Insert `event`, fixing its absolute expiry at `now + delta`.
    ///
    /// Ownership of the event moves into the queue; the returned handle can
    /// cancel it up to the moment it is dispatched.
    pub fn add(&self, event: Event) -> EventHandle {
        let handle = event.handle();
        let mut kernel = self.inner.borrow_mut();
        let expire_at = kernel.now + event.delta;
        trace!(
            id = %event.id,
            delta = ?event.delta,
            expire_at = ?expire_at,
            pending = kernel.queue.len() + 1,
            "scheduled event"
        );
        kernel.queue.push(Scheduled {
            expire_at,
            id: event.id,
            active: event.active,
            exec: event.exec,
        });
        kernel.stats.events_scheduled += 1;
        handle
    }

    /// Run until the queue drains or [`stop`](Self::stop) is called from
    /// within a callback. Returns immediately if the queue is empty.
    ///
    /// On exit `now` is the expiry of the last event that executed.
    pub fn start(&self) {
        self.run(None);
    }

    /// Run like [`start`](Self::start), but dispatch only events expiring at
    /// or before `deadline`. Later events stay queued and `now` ends at the
    /// deadline.
    pub fn run_until(&self, deadline: Duration) {
        self.run(Some(deadline));
        let mut kernel = self.inner.borrow_mut();
        if kernel.now < deadline {
            kernel.now = deadline;
        }
    }

    fn run(&self, deadline: Option<Duration>) {
        {
            let mut kernel = self.inner.borrow_mut();
            if kernel.queue.is_empty() {
                return;
            }
            kernel.keep_running = true;
            debug!(pending = kernel.queue.len(), now = ?kernel.now, "run loop entered");
        }
        loop {
            // The borrow must not be held across the callback: callbacks
            // re-enter through `add`, `now`, `stop` and `clear`.
            let next = {
                let mut kernel = self.inner.borrow_mut();
                if !kernel.keep_running {
                    break;
                }
                if let Some(deadline) = deadline {
                    match kernel.queue.peek() {
                        Some(head) if head.expire_at > deadline => break,
                        _ => {}
                    }
                }
                let Some(entry) = kernel.queue.pop() else {
                    break;
                };
                if entry.active.get() {
                    kernel.now = entry.expire_at;
                    kernel.stats.events_processed += 1;
                    trace!(id = %entry.id, expire_at = ?entry.expire_at, "firing event");
                    Some(entry)
                } else {
                    kernel.stats.events_cancelled += 1;
                    trace!(id = %entry.id, "discarding cancelled event");
                    None
                }
            };
            if let Some(entry) = next {
                (entry.exec)();
            }
        }
        let mut kernel = self.inner.borrow_mut();
        kernel.keep_running = false;
        debug!(
            now = ?kernel.now,
            processed = kernel.stats.events_processed,
            "run loop exited"
        );
    }

    /// Clear the keep-running flag. The loop exits after the callback that
    /// is currently executing; a no-op outside a run.
    pub fn stop(&self) {
        self.inner.borrow_mut().keep_running = false;
    }

    /// Drop every pending event. The clock is left untouched.
    pub fn clear(&self) {
        let mut kernel = self.inner.borrow_mut();
        let dropped = kernel.queue.len();
        kernel.queue.clear();
        debug!(dropped, "cleared event queue");
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

//! Signal/slot dispatch: named output ports with delayed delivery.
//!
//! A [`Signal`] is an output port owned by a producer component. Consumers
//! bind `(receiver, method)` slots to it at wire-up; firing the signal
//! schedules one event per slot at the caller-supplied delay. Every
//! cross-component effect therefore passes through the event queue and
//! respects simulated time — a slot never runs inside the firing callback.
//!
//! [`Trigger`] is the zero-payload flavour.

use crate::event::Event;
use crate::queue::Simulator;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

/// A named output port carrying payloads of type `P`.
///
/// Payloads must be `Clone`: each bound slot receives its own copy, captured
/// by value when the signal is fired. The last slot receives the original,
/// so a single-binding pipeline moves the payload without copying.
pub struct Signal<P: Clone + 'static> {
    sim: Simulator,
    name: &'static str,
    slots: Vec<Rc<dyn Fn(P)>>,
}

impl<P: Clone + 'static> Signal<P> {
    /// Create an unbound port. `name` shows up in traces and abort messages.
    pub fn new(sim: &Simulator, name: &'static str) -> Self {
        Self {
            sim: sim.clone(),
            name,
            slots: Vec::new(),
        }
    }

    /// The port's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of bound slots.
    pub fn bindings(&self) -> usize {
        self.slots.len()
    }

    /// Bind `(receiver, method)` to this port. Multiple bindings are
    /// permitted; each firing then fans out one event per slot.
    ///
    /// The slot holds the receiver weakly. The receiver must outlive every
    /// pending dispatch — a dropped receiver aborts when the event fires.
    pub fn forward<C: 'static>(&mut self, receiver: &Rc<RefCell<C>>, method: fn(&mut C, P)) {
        let name = self.name;
        let target = Rc::downgrade(receiver);
        self.slots.push(Rc::new(move |payload| {
            let receiver = target.upgrade().unwrap_or_else(|| {
                panic!("receiver bound to signal `{name}` dropped with dispatches pending")
            });
            method(&mut receiver.borrow_mut(), payload);
        }));
    }

    /// Schedule `payload` for delivery to every bound slot, `delay` from now.
    ///
    /// Firing an unbound signal is a no-op.
    pub fn fire(&self, payload: P, delay: Duration) {
        let Some((last, rest)) = self.slots.split_last() else {
            trace!(signal = self.name, "fired with no bindings");
            return;
        };
        trace!(
            signal = self.name,
            bindings = self.slots.len(),
            delay = ?delay,
            "fired"
        );
        for slot in rest {
            self.schedule(Rc::clone(slot), payload.clone(), delay);
        }
        self.schedule(Rc::clone(last), payload, delay);
    }

    fn schedule(&self, slot: Rc<dyn Fn(P)>, payload: P, delay: Duration) {
        self.sim
            .add(Event::from_fn(&self.sim, delay, move || slot(payload)));
    }
}

impl<P: Clone + 'static> std::fmt::Debug for Signal<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("bindings", &self.slots.len())
            .finish()
    }
}

/// A named output port carrying no payload.
pub struct Trigger {
    sim: Simulator,
    name: &'static str,
    slots: Vec<Rc<dyn Fn()>>,
}

impl Trigger {
    /// Create an unbound port.
    pub fn new(sim: &Simulator, name: &'static str) -> Self {
        Self {
            sim: sim.clone(),
            name,
            slots: Vec::new(),
        }
    }

    /// The port's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of bound slots.
    pub fn bindings(&self) -> usize {
        self.slots.len()
    }

    /// Bind `(receiver, method)` to this port.
    pub fn forward<C: 'static>(&mut self, receiver: &Rc<RefCell<C>>, method: fn(&mut C)) {
        let name = self.name;
        let target = Rc::downgrade(receiver);
        self.slots.push(Rc::new(move || {
            let receiver = target.upgrade().unwrap_or_else(|| {
                panic!("receiver bound to trigger `{name}` dropped with dispatches pending")
            });
            method(&mut receiver.borrow_mut());
        }));
    }

    /// Schedule a zero-argument dispatch to every bound slot, `delay` from
    /// now. Firing an unbound trigger is a no-op.
    pub fn fire(&self, delay: Duration) {
        if self.slots.is_empty() {
            trace!(trigger = self.name, "fired with no bindings");
            return;
        }
        trace!(
            trigger = self.name,
            bindings = self.slots.len(),
            delay = ?delay,
            "fired"
        );
        for slot in &self.slots {
            let slot = Rc::clone(slot);
            self.sim
                .add(Event::from_fn(&self.sim, delay, move || slot()));
        }
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("bindings", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collector {
        sim: Simulator,
        received: Vec<(u32, Duration)>,
        pokes: u32,
    }

    impl Collector {
        fn new(sim: &Simulator) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                sim: sim.clone(),
                received: Vec::new(),
                pokes: 0,
            }))
        }

        fn take(&mut self, value: u32) {
            let now = self.sim.now();
            self.received.push((value, now));
        }

        fn poke(&mut self) {
            self.pokes += 1;
        }
    }

    #[test]
    fn fire_delivers_through_the_queue() {
        let sim = Simulator::new();
        let collector = Collector::new(&sim);

        let mut port = Signal::new(&sim, "output");
        port.forward(&collector, Collector::take);

        port.fire(7, Duration::from_millis(200));
        // Nothing delivered until the loop runs.
        assert!(collector.borrow().received.is_empty());
        assert_eq!(sim.pending(), 1);

        sim.start();
        assert_eq!(
            collector.borrow().received,
            vec![(7, Duration::from_millis(200))]
        );
    }

    #[test]
    fn fire_fans_out_to_every_binding() {
        let sim = Simulator::new();
        let first = Collector::new(&sim);
        let second = Collector::new(&sim);

        let mut port = Signal::new(&sim, "output");
        port.forward(&first, Collector::take);
        port.forward(&second, Collector::take);
        assert_eq!(port.bindings(), 2);

        port.fire(3, Duration::from_millis(50));
        sim.start();

        assert_eq!(
            first.borrow().received,
            vec![(3, Duration::from_millis(50))]
        );
        assert_eq!(
            second.borrow().received,
            vec![(3, Duration::from_millis(50))]
        );
    }

    #[test]
    fn firing_an_unbound_signal_is_a_no_op() {
        let sim = Simulator::new();
        let port: Signal<u32> = Signal::new(&sim, "dangling");
        port.fire(1, Duration::ZERO);
        assert_eq!(sim.pending(), 0);
    }

    #[test]
    fn repeated_fires_preserve_payload_and_order() {
        let sim = Simulator::new();
        let collector = Collector::new(&sim);
        let mut port = Signal::new(&sim, "output");
        port.forward(&collector, Collector::take);

        // Same expiry: dispatch order follows fire order via event ids.
        port.fire(1, Duration::from_millis(10));
        port.fire(2, Duration::from_millis(10));
        port.fire(3, Duration::from_millis(10));
        sim.start();

        let received: Vec<u32> = collector.borrow().received.iter().map(|r| r.0).collect();
        assert_eq!(received, vec![1, 2, 3]);
    }

    #[test]
    fn trigger_dispatches_zero_argument_slots() {
        let sim = Simulator::new();
        let collector = Collector::new(&sim);
        let mut tick = Trigger::new(&sim, "tick");
        tick.forward(&collector, Collector::poke);

        tick.fire(Duration::from_millis(5));
        tick.fire(Duration::from_millis(6));
        sim.start();
        assert_eq!(collector.borrow().pokes, 2);
    }

    #[test]
    fn unbound_trigger_is_a_no_op() {
        let sim = Simulator::new();
        let tick = Trigger::new(&sim, "tick");
        tick.fire(Duration::ZERO);
        assert_eq!(sim.pending(), 0);
    }
}

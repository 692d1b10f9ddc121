//! Terminal packet consumer.

use linksim_kernel::{Signal, Simulator};
use linksim_types::{Ack, Packet};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

/// A consumer recording every delivered packet and acknowledging each one.
pub struct Sink {
    /// One ack per delivered packet; bind to the ack channel's `input`.
    pub ack_out: Signal<Ack>,

    sim: Simulator,
    received: Vec<(u64, Duration)>,
}

impl Sink {
    /// Create a sink with an empty delivery log.
    pub fn new(sim: &Simulator) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            ack_out: Signal::new(sim, "sink.ack_out"),
            sim: sim.clone(),
            received: Vec::new(),
        }))
    }

    /// Log the packet's arrival and acknowledge it; bind to the data
    /// channel's `output`.
    pub fn handle_packet(&mut self, packet: Packet) {
        let now = self.sim.now();
        trace!(%packet, at = ?now, "packet delivered");
        self.received.push((packet.seq, now));
        self.ack_out.fire(Ack::new(packet.seq), Duration::ZERO);
    }

    /// `(seq, arrival time)` pairs in delivery order.
    pub fn received(&self) -> Vec<(u64, Duration)> {
        self.received.clone()
    }

    /// Number of packets delivered.
    pub fn delivered(&self) -> u64 {
        self.received.len() as u64
    }
}

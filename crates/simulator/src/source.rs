//! Finite-backlog packet producer.

use linksim_kernel::{Signal, Simulator};
use linksim_types::{Ack, Packet};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

/// A producer holding a finite backlog of packets, drained by the data
/// channel's pull mechanism.
///
/// The source is passive: it answers readiness queries with its backlog
/// size and surrenders packets only when the channel requests a burst. Acks
/// routed back through the ack channel are recorded in delivery order.
pub struct Source {
    /// Readiness answers; bind to the channel's `nof_inputs`.
    pub nof_ready: Signal<u32>,
    /// Packet pushes; bind to the channel's `input`.
    pub output: Signal<Packet>,

    backlog: VecDeque<Packet>,
    pushed: u64,
    acked: Vec<u64>,
}

impl Source {
    /// Create a source with `total_packets` of `packet_size` bytes queued.
    pub fn new(sim: &Simulator, total_packets: u64, packet_size: usize) -> Rc<RefCell<Self>> {
        let backlog = (0..total_packets)
            .map(|seq| Packet::new(seq, packet_size))
            .collect();
        Rc::new(RefCell::new(Self {
            nof_ready: Signal::new(sim, "source.nof_ready"),
            output: Signal::new(sim, "source.output"),
            backlog,
            pushed: 0,
            acked: Vec::new(),
        }))
    }

    /// Publish the backlog size; bind to the channel's `get_nof_inputs`.
    pub fn publish_ready(&mut self) {
        self.nof_ready.fire(self.backlog.len() as u32, Duration::ZERO);
    }

    /// Surrender up to `burst` packets; bind to the channel's `input_request`.
    pub fn handle_request(&mut self, burst: u32) {
        for _ in 0..burst {
            let Some(packet) = self.backlog.pop_front() else {
                break;
            };
            trace!(%packet, remaining = self.backlog.len(), "pushing packet");
            self.pushed += 1;
            self.output.fire(packet, Duration::ZERO);
        }
    }

    /// Record a returned acknowledgement; bind to the ack channel's `output`.
    pub fn handle_ack(&mut self, ack: Ack) {
        self.acked.push(ack.seq);
    }

    /// Packets still waiting to be pulled.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Packets surrendered to the channel so far.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Acknowledged sequence numbers, in ack-arrival order.
    pub fn acked(&self) -> Vec<u64> {
        self.acked.clone()
    }
}

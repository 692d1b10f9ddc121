//! Paced-pull lossy delay channel for data packets.

use crate::config::PacketChannelConfig;
use crate::loss::LossModel;
use crate::stats::ChannelStats;
use linksim_kernel::{Event, Signal, Simulator, Trigger};
use linksim_types::Packet;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

/// Counters for the pull side of the channel.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PullStats {
    /// Ticks of the poll loop (one `get_nof_inputs` query each).
    pub polls_issued: u64,
    /// Non-empty bursts requested from upstream.
    pub requests_issued: u64,
}

/// A lossy, delayed transport for data packets with a paced-pull intake.
///
/// The channel polls upstream readiness at `block_rate` via a self-scheduled
/// tick, pulls a bounded random burst of packets, then attrits and delays
/// each packet independently.
///
/// # Ports
///
/// | port | direction | payload | meaning |
/// |---|---|---|---|
/// | `input` | in | [`Packet`] | a packet surrendered to the channel |
/// | `nof_inputs` | in | `u32` | upstream's readiness count |
/// | `start` | in | `bool` | begin / end the periodic poll |
/// | `output` | out | [`Packet`] | accepted packets, `delay` later |
/// | `input_request` | out | `u32` | demand for up to that many packets |
/// | `get_nof_inputs` | out | — | ask upstream to publish its readiness |
///
/// # Ownership
///
/// A packet arriving on `input` belongs to the channel: it is either dropped
/// by the loss policy (and destroyed right there) or moved out through
/// `output`, at which point it belongs to the next receiver.
///
/// # Wiring
///
/// The inbound ports are pre-bound to the channel's own handlers at
/// construction; neighbours connect by binding the outbound ports and by
/// forwarding their own outputs to the public `handle_*` methods.
pub struct PacketChannel {
    /// Packet intake.
    pub input: Signal<Packet>,
    /// Upstream readiness answers.
    pub nof_inputs: Signal<u32>,
    /// Poll-loop control.
    pub start: Signal<bool>,
    /// Accepted, delayed packets.
    pub output: Signal<Packet>,
    /// Demand issued upstream.
    pub input_request: Signal<u32>,
    /// Readiness query issued upstream.
    pub get_nof_inputs: Trigger,

    sim: Simulator,
    me: Weak<RefCell<PacketChannel>>,

    delay: Duration,
    block_time: Duration,
    max_slots: u32,
    parameters_ok: bool,
    keep_running: bool,

    loss: LossModel,
    rng: ChaCha8Rng,
    stats: ChannelStats,
    pull: PullStats,
}

impl PacketChannel {
    /// Create an unconfigured channel. [`set_parameters`](Self::set_parameters)
    /// must run before any traffic or control arrives.
    pub fn new(sim: &Simulator) -> Rc<RefCell<Self>> {
        let channel = Rc::new(RefCell::new(Self {
            input: Signal::new(sim, "packet_channel.input"),
            nof_inputs: Signal::new(sim, "packet_channel.nof_inputs"),
            start: Signal::new(sim, "packet_channel.start"),
            output: Signal::new(sim, "packet_channel.output"),
            input_request: Signal::new(sim, "packet_channel.input_request"),
            get_nof_inputs: Trigger::new(sim, "packet_channel.get_nof_inputs"),
            sim: sim.clone(),
            me: Weak::new(),
            delay: Duration::ZERO,
            block_time: Duration::ZERO,
            max_slots: 0,
            parameters_ok: false,
            keep_running: false,
            loss: LossModel::random(0.0),
            rng: ChaCha8Rng::seed_from_u64(0),
            stats: ChannelStats::default(),
            pull: PullStats::default(),
        }));
        {
            let mut this = channel.borrow_mut();
            this.me = Rc::downgrade(&channel);
            this.input.forward(&channel, Self::handle_input);
            this.nof_inputs.forward(&channel, Self::handle_nof_inputs);
            this.start.forward(&channel, Self::handle_start);
        }
        channel
    }

    /// Create and configure in one step.
    pub fn with_parameters(sim: &Simulator, config: PacketChannelConfig) -> Rc<RefCell<Self>> {
        let channel = Self::new(sim);
        channel.borrow_mut().set_parameters(config);
        channel
    }

    /// Install and validate the channel parameters.
    ///
    /// Resets the loss mode to stochastic and the counters to zero; call
    /// [`set_errors`](Self::set_errors) afterwards to switch to the
    /// deterministic pattern. Aborts on an out-of-range configuration.
    pub fn set_parameters(&mut self, config: PacketChannelConfig) {
        if let Err(e) = config.validate() {
            panic!("packet channel misconfigured: {e}");
        }
        self.delay = config.delay;
        self.block_time = config.block_time();
        self.max_slots = config.max_slots;
        self.loss = LossModel::random(config.loss_probability);
        self.rng = ChaCha8Rng::seed_from_u64(config.seed);
        self.stats = ChannelStats::default();
        self.pull = PullStats::default();
        self.keep_running = false;
        self.parameters_ok = true;
        debug!(
            delay = ?self.delay,
            block_time = ?self.block_time,
            max_slots = self.max_slots,
            loss_probability = config.loss_probability,
            "packet channel configured"
        );
    }

    /// Switch to deterministic loss: arrivals whose zero-based index appears
    /// in `lost` are destroyed, all others forwarded. The indices are sorted
    /// ascending; an empty set leaves the stochastic mode in place.
    ///
    /// Call after [`set_parameters`](Self::set_parameters) and before any
    /// traffic — the two modes keep disjoint state.
    pub fn set_errors(&mut self, lost: Vec<u64>) {
        if lost.is_empty() {
            return;
        }
        self.loss = LossModel::explicit(lost);
    }

    /// Datapath counters.
    pub fn stats(&self) -> ChannelStats {
        self.stats.clone()
    }

    /// Pull-side counters.
    pub fn pull_stats(&self) -> PullStats {
        self.pull.clone()
    }

    /// Whether the poll loop is (or will keep) running.
    pub fn is_running(&self) -> bool {
        self.keep_running
    }

    /// Whether `set_parameters` has run.
    pub fn is_configured(&self) -> bool {
        self.parameters_ok
    }

    /// Accept a packet: destroy it or re-emit it on `output` after the
    /// configured delay. Bound to the `input` port; public so upstream
    /// outputs can forward straight to it.
    pub fn handle_input(&mut self, packet: Packet) {
        assert!(
            self.parameters_ok,
            "packet channel received traffic before set_parameters"
        );
        self.stats.packets_in += 1;
        if self.loss.should_drop(&mut self.rng) {
            self.stats.packets_lost += 1;
            debug!(%packet, "packet lost in transit");
        } else {
            self.stats.packets_forwarded += 1;
            trace!(%packet, delay = ?self.delay, "forwarding packet");
            self.output.fire(packet, self.delay);
        }
    }

    /// React to upstream's readiness count: request a burst of at most
    /// `min(nof_ready, width)` packets, where `width` is a uniform draw up
    /// to `max_slots` (rounded half-away-from-zero), or one when `max_slots`
    /// is zero. Bound to the `nof_inputs` port.
    pub fn handle_nof_inputs(&mut self, nof_ready: u32) {
        assert!(
            self.parameters_ok,
            "packet channel polled before set_parameters"
        );
        let width = if self.max_slots > 0 {
            (self.rng.gen::<f64>() * f64::from(self.max_slots)).round() as u32
        } else {
            1
        };
        let burst = nof_ready.min(width);
        if burst > 0 {
            self.pull.requests_issued += 1;
            trace!(nof_ready, burst, "requesting burst");
            self.input_request.fire(burst, Duration::ZERO);
        }
    }

    /// Start (`true`) or stop (`false`) the periodic poll. Starting an
    /// already-running channel schedules no second ticker; stopping lets
    /// the pending tick fire once more without rescheduling. Bound to the
    /// `start` port.
    pub fn handle_start(&mut self, run: bool) {
        assert!(
            self.parameters_ok,
            "packet channel started before set_parameters"
        );
        if run && !self.keep_running {
            debug!(block_time = ?self.block_time, "poll loop starting");
            self.schedule_tick();
        }
        self.keep_running = run;
    }

    /// One tick of the poll loop: query upstream readiness, then reschedule
    /// while the channel is running.
    fn block_rate_loop(&mut self) {
        assert!(self.parameters_ok, "packet channel ticked before set_parameters");
        self.pull.polls_issued += 1;
        self.get_nof_inputs.fire(Duration::ZERO);
        if self.keep_running {
            self.schedule_tick();
        }
    }

    fn schedule_tick(&self) {
        let me = self
            .me
            .upgrade()
            .expect("packet channel dropped with its poll loop scheduled");
        self.sim.add(Event::call(
            &self.sim,
            &me,
            Self::block_rate_loop,
            self.block_time,
        ));
    }
}

//! Lossy delay channel for acknowledgements.

use crate::config::AckChannelConfig;
use crate::loss::LossModel;
use crate::stats::ChannelStats;
use linksim_kernel::{Signal, Simulator};
use linksim_types::Ack;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace};

/// A degenerate packet channel for the acknowledgement path.
///
/// Same loss policy and delay semantics as
/// [`PacketChannel`](crate::PacketChannel), but no poll loop and no pull:
/// acks are emitted reactively by the receiver, so the control plane needs
/// no pacing. Kept separate from the data channel because the payload types
/// differ and the loss policy must destroy the right kind of object.
///
/// An ack arriving on `input` belongs to the channel: dropped on loss,
/// moved out through `output` otherwise.
pub struct AckChannel {
    /// Ack intake.
    pub input: Signal<Ack>,
    /// Accepted, delayed acks.
    pub output: Signal<Ack>,

    delay: Duration,
    parameters_ok: bool,
    loss: LossModel,
    rng: ChaCha8Rng,
    stats: ChannelStats,
}

impl AckChannel {
    /// Create an unconfigured channel. [`set_parameters`](Self::set_parameters)
    /// must run before any traffic arrives.
    pub fn new(sim: &Simulator) -> Rc<RefCell<Self>> {
        let channel = Rc::new(RefCell::new(Self {
            input: Signal::new(sim, "ack_channel.input"),
            output: Signal::new(sim, "ack_channel.output"),
            delay: Duration::ZERO,
            parameters_ok: false,
            loss: LossModel::random(0.0),
            rng: ChaCha8Rng::seed_from_u64(0),
            stats: ChannelStats::default(),
        }));
        {
            let mut this = channel.borrow_mut();
            this.input.forward(&channel, Self::handle_input);
        }
        channel
    }

    /// Create and configure in one step.
    pub fn with_parameters(sim: &Simulator, config: AckChannelConfig) -> Rc<RefCell<Self>> {
        let channel = Self::new(sim);
        channel.borrow_mut().set_parameters(config);
        channel
    }

    /// Install and validate the channel parameters; resets the loss mode to
    /// stochastic. Aborts on an out-of-range configuration.
    pub fn set_parameters(&mut self, config: AckChannelConfig) {
        if let Err(e) = config.validate() {
            panic!("ack channel misconfigured: {e}");
        }
        self.delay = config.delay;
        self.loss = LossModel::random(config.loss_probability);
        self.rng = ChaCha8Rng::seed_from_u64(config.seed);
        self.stats = ChannelStats::default();
        self.parameters_ok = true;
        debug!(
            delay = ?self.delay,
            loss_probability = config.loss_probability,
            "ack channel configured"
        );
    }

    /// Switch to deterministic loss over arrival indices, exactly as on the
    /// data channel.
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

    /// Whether `set_parameters` has run.
    pub fn is_configured(&self) -> bool {
        self.parameters_ok
    }

    /// Accept an ack: destroy it or re-emit it on `output` after the
    /// configured delay. Bound to the `input` port; public so receiver
    /// outputs can forward straight to it.
    pub fn handle_input(&mut self, ack: Ack) {
        assert!(
            self.parameters_ok,
            "ack channel received traffic before set_parameters"
        );
        self.stats.packets_in += 1;
        if self.loss.should_drop(&mut self.rng) {
            self.stats.packets_lost += 1;
            debug!(%ack, "ack lost in transit");
        } else {
            self.stats.packets_forwarded += 1;
            trace!(%ack, delay = ?self.delay, "forwarding ack");
            self.output.fire(ack, self.delay);
        }
    }
}

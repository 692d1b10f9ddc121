//! Channel configuration.
//!
//! Plain config structs with defaults; validation happens once, inside
//! `set_parameters`. An invalid configuration is a programming error and
//! aborts there — [`validate`](PacketChannelConfig::validate) exists so
//! callers assembling parameters from external input can check first.

use std::time::Duration;
use thiserror::Error;

/// Errors from channel parameter validation.
#[derive(Debug, Error)]
pub enum ChannelConfigError {
    /// Loss probability outside `[0, 1]` (or not a number).
    #[error("loss probability {0} outside [0, 1]")]
    LossProbability(f64),

    /// Poll rate must be positive and finite.
    #[error("block rate {0} is not a positive finite rate")]
    BlockRate(f64),
}

/// Parameters for a [`PacketChannel`](crate::PacketChannel).
///
/// `delay` and `max_slots` carry their `>= 0` contracts in their types.
#[derive(Debug, Clone)]
pub struct PacketChannelConfig {
    /// Per-packet drop probability in `[0, 1]` (stochastic-loss mode).
    pub loss_probability: f64,

    /// Transit delay applied to every forwarded packet.
    pub delay: Duration,

    /// Upstream polls per simulated second; the tick period is its inverse.
    pub block_rate: f64,

    /// Upper bound on the random burst width requested per poll. Zero means
    /// one packet per poll.
    pub max_slots: u32,

    /// Seed for the channel's RNG. Same seed, same run.
    pub seed: u64,
}

impl Default for PacketChannelConfig {
    fn default() -> Self {
        Self {
            loss_probability: 0.0,
            delay: Duration::from_millis(150),
            block_rate: 10.0,
            max_slots: 4,
            seed: 0,
        }
    }
}

impl PacketChannelConfig {
    /// Check the numeric ranges `set_parameters` will abort on.
    pub fn validate(&self) -> Result<(), ChannelConfigError> {
        validate_probability(self.loss_probability)?;
        if !(self.block_rate.is_finite() && self.block_rate > 0.0) {
            return Err(ChannelConfigError::BlockRate(self.block_rate));
        }
        // A rate so high the tick period rounds to zero would spin the
        // clock in place.
        if self.block_time() == Duration::ZERO {
            return Err(ChannelConfigError::BlockRate(self.block_rate));
        }
        Ok(())
    }

    /// The tick period: `1 / block_rate`.
    pub(crate) fn block_time(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.block_rate)
    }

    /// Builder-style seed override.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder-style loss-probability override.
    pub fn with_loss_probability(mut self, loss_probability: f64) -> Self {
        self.loss_probability = loss_probability;
        self
    }
}

/// Parameters for an [`AckChannel`](crate::AckChannel).
#[derive(Debug, Clone)]
pub struct AckChannelConfig {
    /// Per-ack drop probability in `[0, 1]` (stochastic-loss mode).
    pub loss_probability: f64,

    /// Transit delay applied to every forwarded ack.
    pub delay: Duration,

    /// Seed for the channel's RNG.
    pub seed: u64,
}

impl Default for AckChannelConfig {
    fn default() -> Self {
        Self {
            loss_probability: 0.0,
            delay: Duration::from_millis(150),
            seed: 0,
        }
    }
}

impl AckChannelConfig {
    /// Check the numeric ranges `set_parameters` will abort on.
    pub fn validate(&self) -> Result<(), ChannelConfigError> {
        validate_probability(self.loss_probability)
    }

    /// Builder-style seed override.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

fn validate_probability(p: f64) -> Result<(), ChannelConfigError> {
    if !(0.0..=1.0).contains(&p) || p.is_nan() {
        return Err(ChannelConfigError::LossProbability(p));
    }
    Ok(())
}

//! Datapath counters.

/// Counters accumulated by a channel's input handler.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    /// Payloads that arrived on `input`.
    pub packets_in: u64,
    /// Payloads destroyed by the loss policy.
    pub packets_lost: u64,
    /// Payloads re-emitted on `output`.
    pub packets_forwarded: u64,
}

impl ChannelStats {
    /// Observed loss fraction; `0.0` before any traffic.
    pub fn loss_rate(&self) -> f64 {
        if self.packets_in == 0 {
            0.0
        } else {
            self.packets_lost as f64 / self.packets_in as f64
        }
    }
}

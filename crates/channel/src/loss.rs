//! Drop decisions shared by both channel models.
//!
//! A channel is in exactly one loss mode. The stochastic mode draws an iid
//! Bernoulli per arrival; the deterministic mode walks a precomputed
//! ascending index set against an arrival counter. The modes own disjoint
//! state, so switching mid-run is not representable — installing an explicit
//! pattern replaces the model wholesale and must happen before traffic
//! starts.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Per-arrival drop decision.
#[derive(Debug, Clone)]
pub(crate) enum LossModel {
    /// Drop each arrival independently with the given probability.
    ///
    /// The arrival counter of the explicit mode does not exist here; a
    /// stochastic draw never advances any index.
    Random { probability: f64 },

    /// Drop exactly the arrivals whose zero-based index appears in `lost`.
    ///
    /// `seen` counts every arrival; `cursor` points at the next index that
    /// will be dropped. Once the cursor runs off the end, no further
    /// arrivals are dropped.
    Explicit {
        lost: Vec<u64>,
        seen: u64,
        cursor: usize,
    },
}

impl LossModel {
    pub(crate) fn random(probability: f64) -> Self {
        Self::Random { probability }
    }

    /// Build the deterministic mode from arrival indices, sorted ascending.
    pub(crate) fn explicit(mut lost: Vec<u64>) -> Self {
        lost.sort_unstable();
        Self::Explicit {
            lost,
            seen: 0,
            cursor: 0,
        }
    }

    /// Decide whether the current arrival is dropped, advancing the mode's
    /// internal state.
    pub(crate) fn should_drop(&mut self, rng: &mut ChaCha8Rng) -> bool {
        match self {
            Self::Random { probability } => rng.gen::<f64>() < *probability,
            Self::Explicit { lost, seen, cursor } => {
                let drop = lost.get(*cursor).copied() == Some(*seen);
                if drop {
                    *cursor += 1;
                }
                *seen += 1;
                drop
            }
        }
    }
}

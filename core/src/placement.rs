use rand::prelude::*;

use crate::*;

/// Strategy for choosing which slot hides the marker at round start.
pub trait MarkerPlacement {
    fn choose(self, previous: Option<SlotIx>) -> SlotIx;
}

/// Uniform on the first round; afterwards biased away from the slot that
/// hid the marker last round, so back-to-back repeats stay rare without
/// becoming impossible.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BiasedPlacement {
    seed: u64,
    avoid_bias: f64,
}

impl BiasedPlacement {
    /// Probability of steering away from the previous marker slot.
    pub const DEFAULT_AVOID_BIAS: f64 = 0.8;

    pub fn new(seed: u64, avoid_bias: f64) -> Self {
        if !(0.0..=1.0).contains(&avoid_bias) {
            log::warn!("avoid bias {} out of range, clamped", avoid_bias);
        }
        Self {
            seed,
            avoid_bias: avoid_bias.clamp(0.0, 1.0),
        }
    }
}

impl MarkerPlacement for BiasedPlacement {
    fn choose(self, previous: Option<SlotIx>) -> SlotIx {
        let mut rng = SmallRng::seed_from_u64(self.seed);

        let Some(previous) = previous else {
            return rng.random_range(0..SLOT_COUNT);
        };

        if rng.random_bool(self.avoid_bias) {
            let others = other_slots(previous);
            others[rng.random_range(0..others.len())]
        } else {
            rng.random_range(0..SLOT_COUNT)
        }
    }
}

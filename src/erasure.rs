//! Simulated channel loss at a receiver, for testability of the repair
//! loop without a real lossy network.
//!
//! Grounded directly on the reference implementation's
//! `random.uniform(0, 100) > self.erasure` check: each packet draws a
//! fresh erasure probability from a configured range, then compares it
//! against a fresh uniform draw.

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Configurable per-receiver loss injection.
#[derive(Debug, Clone)]
pub struct ErasureModel {
    low: f64,
    high: f64,
    rng: StdRng,
}

impl ErasureModel {
    /// No simulated loss at all (the default for real deployments).
    #[must_use]
    pub fn none() -> Self {
        Self::new(0.0, 0.0, None)
    }

    /// A model drawing a fresh erasure percentage uniformly from
    /// `[low, high]` for every packet, seeded either from `seed` or OS
    /// entropy.
    #[must_use]
    pub fn new(low: f64, high: f64, seed: Option<u64>) -> Self {
        Self {
            low,
            high,
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        }
    }

    /// Whether this packet should be delivered (`true`) or dropped
    /// (`false`).
    pub fn passes(&mut self) -> bool {
        if self.high <= 0.0 {
            return true;
        }
        let threshold = self.rng.gen_range(self.low..=self.high);
        let draw = self.rng.gen_range(0.0..100.0);
        draw > threshold
    }
}

//! Deterministic random streams.
//!
//! One master seed fans out into independent `ChaCha8Rng` streams keyed by
//! `(unit, index)`, so each layout level, distance pass, and population
//! member draws from its own sequence regardless of evaluation order.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Independent generation units that each get their own streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Layout = 1,
    Distances = 2,
    Population = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngStreams {
    master_seed: u64,
}

impl RngStreams {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Pick a master seed from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(rand::rngs::OsRng.next_u64())
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Stream for `unit` number `index`. Same inputs, same stream.
    pub fn stream(&self, unit: Unit, index: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.derive_seed(unit as u64, index))
    }

    /// Sub-streams for nested units, e.g. the optimizer of layout `outer`.
    pub fn nested(&self, outer: u64) -> RngStreams {
        RngStreams::new(self.derive_seed(0, outer))
    }

    fn derive_seed(&self, unit: u64, index: u64) -> u64 {
        let mut seed = self.master_seed;
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= unit.wrapping_mul(1103515245);
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= index.wrapping_mul(48271);
        seed
    }
}

impl Default for RngStreams {
    fn default() -> Self {
        Self::new(42)
    }
}

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Seeded RNG shared by every random draw in the combat core.
///
/// Same seed, same spike field.
#[derive(Resource, Debug, Clone)]
pub struct CombatRng {
    rng: Xoshiro256PlusPlus,
    seed: u64,
}

impl CombatRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in [min, max). Returns `min` for an empty range.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }
}

impl Default for CombatRng {
    fn default() -> Self {
        Self::new(42)
    }
}

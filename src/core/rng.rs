//! Random source for content shuffling.
//!
//! Seedable so that shuffled sequences are reproducible in tests and in
//! replayed sessions.

/// Wrapper around a [`fastrand::Rng`] dedicated to permuting content lists.
#[derive(Debug, Clone)]
pub struct ShuffleRng {
    rng: fastrand::Rng,
}

impl ShuffleRng {
    /// Random source seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Deterministic random source for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Unbiased Fisher-Yates permutation of `items`, in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        self.rng.shuffle(items);
    }
}

impl Default for ShuffleRng {
    fn default() -> Self {
        Self::new()
    }
}

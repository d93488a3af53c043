use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{SeedableRng, rng};

/// Source of the final presentation order of a session.
///
/// Mirrors `Clock`: real randomness by default, swappable for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShuffleMode {
    /// Thread-local RNG, different every call.
    #[default]
    Random,
    /// Same permutation for the same seed and input length.
    Seeded(u64),
    /// Keep pool order (due, unseen, reinforcement).
    Off,
}

impl ShuffleMode {
    /// Permute `items` in place.
    pub fn apply<T>(&self, items: &mut [T]) {
        match self {
            ShuffleMode::Random => items.shuffle(&mut rng()),
            ShuffleMode::Seeded(seed) => items.shuffle(&mut StdRng::seed_from_u64(*seed)),
            ShuffleMode::Off => {}
        }
    }
}

//! Random number sources for world generation and turn processing.
//!
//! Everything that needs randomness takes a `&mut dyn RandomSource`, so a
//! session runs on a seeded [`GameRng`] while tests can script the draws
//! with [`SequenceRandom`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of random decisions.
pub trait RandomSource {
    /// Returns true with the given probability (clamped to `[0, 1]`).
    fn roll(&mut self, probability: f64) -> bool;

    /// Uniform integer in `[low, high)`. Returns `low` when the range is empty.
    fn range(&mut self, low: i32, high: i32) -> i32;

    /// Uniform float in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index into a collection of `len` items.
    fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            0
        } else {
            self.range(0, len as i32) as usize
        }
    }
}

/// Deterministic ChaCha8-backed random source.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
}

impl GameRng {
    /// Create from a numeric seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed_bytes(seed: [u8; 32]) -> Self {
        Self {
            inner: ChaCha8Rng::from_seed(seed),
        }
    }
}

impl RandomSource for GameRng {
    fn roll(&mut self, probability: f64) -> bool {
        if probability.is_nan() {
            return false;
        }
        self.inner.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn range(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        self.inner.gen_range(low..high)
    }

    fn unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }
}

/// Random source that cycles through a fixed list of values in `[0, 1)`.
///
/// `roll(p)` is true when the next value is below `p`; `range` scales the
/// next value into the requested interval.
#[derive(Clone, Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(values: Vec<f64>) -> Self {
        let values = if values.is_empty() { vec![0.0] } else { values };
        Self { values, cursor: 0 }
    }

    /// A source that always returns the same value.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    fn next_value(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value.clamp(0.0, 0.999_999)
    }
}

impl RandomSource for SequenceRandom {
    fn roll(&mut self, probability: f64) -> bool {
        self.next_value() < probability
    }

    fn range(&mut self, low: i32, high: i32) -> i32 {
        if high <= low {
            return low;
        }
        let span = (high - low) as f64;
        low + (self.next_value() * span).floor() as i32
    }

    fn unit(&mut self) -> f64 {
        self.next_value()
    }
}

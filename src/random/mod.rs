//! Random number sources
//!
//! The engine draws every random decision from a [`RandomSource`] owned by
//! the run, never from a global generator, so independent runs embedded in
//! one process do not interfere.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Seedable source of the random primitives the engine needs
pub trait RandomSource {
    /// Uniform value in `[0, 1)`
    fn uniform01(&mut self) -> f64;

    /// Uniform integer in the inclusive range `[lo, hi]`
    fn uniform_int(&mut self, lo: i64, hi: i64) -> i64;

    /// Uniform real in `[lo, hi)`
    fn uniform_real(&mut self, lo: f64, hi: f64) -> f64;

    /// Normally distributed value
    fn gaussian(&mut self, mean: f64, stddev: f64) -> f64;

    /// Returns true with probability `p`
    fn flip(&mut self, p: f64) -> bool {
        self.uniform01() < p
    }

    /// Uniform index in `[0, n)`; `n` must be positive
    fn index(&mut self, n: usize) -> usize {
        debug_assert!(n > 0, "index() needs a non-empty range");
        self.uniform_int(0, n as i64 - 1) as usize
    }

    /// The seed this source was created from
    fn seed(&self) -> u64;
}

/// Default random source backed by `rand::rngs::StdRng`
#[derive(Clone, Debug)]
pub struct StdRandom {
    rng: StdRng,
    seed: u64,
}

impl StdRandom {
    /// Create a deterministic source from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create a source seeded from the operating system
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().gen())
    }

    /// Create the source for worker `rank` of a run seeded with `seed`
    pub fn for_worker(seed: u64, rank: usize) -> Self {
        Self::new(derive_subseed(seed, rank))
    }
}

impl RandomSource for StdRandom {
    fn uniform01(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn uniform_int(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    fn uniform_real(&mut self, lo: f64, hi: f64) -> f64 {
        if lo >= hi || !lo.is_finite() || !hi.is_finite() {
            return lo;
        }
        self.rng.gen_range(lo..hi)
    }

    fn gaussian(&mut self, mean: f64, stddev: f64) -> f64 {
        match Normal::new(mean, stddev) {
            Ok(dist) if stddev > 0.0 => dist.sample(&mut self.rng),
            _ => mean,
        }
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

/// Derive a distinct, reproducible sub-seed for worker `rank`
///
/// Uses the SplitMix64 finalizer so neighbouring ranks get unrelated streams.
pub fn derive_subseed(seed: u64, rank: usize) -> u64 {
    let mut z = seed.wrapping_add((rank as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Fisher-Yates shuffle driven by a [`RandomSource`]
pub fn shuffle<T>(rng: &mut dyn RandomSource, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.index(i + 1);
        items.swap(i, j);
    }
}

/// Draw `k` distinct indices from `[0, n)` (all of them if `k >= n`)
pub fn sample_distinct(rng: &mut dyn RandomSource, n: usize, k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let k = k.min(n);
    for i in 0..k {
        let j = i + rng.index(n - i);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

pub mod prelude {
    pub use super::{derive_subseed, sample_distinct, shuffle, RandomSource, StdRandom};
}

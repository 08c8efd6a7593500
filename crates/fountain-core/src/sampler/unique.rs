//! Distinct-index sampler.
//!
//! Picks `count` distinct integers from `[0, max)` off a seeded stream. Small
//! or sparse requests use rejection sampling (cheap when collisions are rare);
//! dense requests shuffle the whole range and take a prefix.
//!
//! The branch taken depends on the arguments, so the stream position after a
//! call depends on them too. Two samplers only agree when they are fed the
//! same argument sequence.

use std::collections::HashSet;

use rand::Rng;
use rand_chacha::ChaCha20Rng;

use super::{seeded_stream, SamplerError};

/// Requests smaller than this always use rejection sampling.
const REJECTION_COUNT_LIMIT: usize = 200;

/// Requests covering less than this fraction of the range use rejection sampling.
const REJECTION_DENSITY_LIMIT: f64 = 0.1;

pub struct UniqueIndexSampler {
    rng: ChaCha20Rng,
}

impl UniqueIndexSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: seeded_stream(seed),
        }
    }

    /// Draw `count` distinct values in `[0, max)`.
    pub fn next_unique(&mut self, max: usize, count: usize) -> Result<Vec<usize>, SamplerError> {
        if count > max {
            return Err(SamplerError::CountExceedsRange { count, max });
        }
        Ok(self.sample(max, count))
    }

    /// Caller guarantees `count <= max`.
    pub(crate) fn sample(&mut self, max: usize, count: usize) -> Vec<usize> {
        debug_assert!(count <= max);
        if count == 0 {
            return Vec::new();
        }
        if count < REJECTION_COUNT_LIMIT || (count as f64 / max as f64) < REJECTION_DENSITY_LIMIT {
            self.rejection(max, count)
        } else {
            self.shuffled_prefix(max, count)
        }
    }

    /// Retry on duplicates, keep draw order.
    fn rejection(&mut self, max: usize, count: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(count);
        let mut seen = HashSet::with_capacity(count);
        while out.len() < count {
            let v = self.draw_below(max);
            if seen.insert(v) {
                out.push(v);
            }
        }
        out
    }

    /// In-place Fisher–Yates over the full range.
    fn shuffled_prefix(&mut self, max: usize, count: usize) -> Vec<usize> {
        let mut all: Vec<usize> = (0..max).collect();
        for i in (1..max).rev() {
            let j = self.draw_below(i + 1);
            all.swap(i, j);
        }
        all.truncate(count);
        all
    }

    // Draw through u64 so 32- and 64-bit targets consume the stream identically.
    fn draw_below(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound as u64) as usize
    }
}

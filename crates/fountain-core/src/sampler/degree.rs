//! Robust Soliton degree sampler.
//!
//! The probability mass for degree `i` in `1..=K` is
//! `(ideal(i) + robust(i)) / Z`, where:
//!
//!   ideal(1)  = 1/K
//!   ideal(i)  = 1/(i·(i-1))            for i > 1
//!   robust(i) = 1/(i·M)                for i < M
//!   robust(M) = ln(R/δ)/M              with R = K/M
//!   robust(i) = 0                      for i > M
//!
//! Sampling is inverse-CDF: draw `u` in [0,1) and return the smallest degree
//! whose running sum exceeds `u`.

use rand::Rng;
use rand_chacha::ChaCha20Rng;

use super::{seeded_stream, SamplerError};

/// Default failure probability δ.
pub const DEFAULT_FAILURE_PROBABILITY: f64 = 0.02;

/// Default spike position for `k` blocks: `ceil(ln(k)^2)`, at least 1.
pub fn default_spike(k: usize) -> usize {
    let ln = (k as f64).ln();
    ((ln * ln).ceil() as usize).max(1)
}

/// Shape of the distribution. Sender and receiver must use the same values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolitonParams {
    /// Spike position `M`. `None` = `default_spike(k)`.
    pub spike: Option<usize>,
    /// Failure probability δ.
    pub failure_probability: f64,
}

impl Default for SolitonParams {
    fn default() -> Self {
        Self {
            spike: None,
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
        }
    }
}

impl SolitonParams {
    pub fn spike_for(&self, k: usize) -> usize {
        self.spike.unwrap_or_else(|| default_spike(k))
    }
}

pub struct DegreeSampler {
    rng: ChaCha20Rng,
    k: usize,
    spike: usize,
    failure_probability: f64,
    /// Running sums of the normalized mass, `cdf[i - 1]` for degree `i`.
    cdf: Vec<f64>,
}

impl DegreeSampler {
    /// Build a sampler over `[1, k]` with the given spike and δ.
    pub fn new(
        k: usize,
        spike: usize,
        failure_probability: f64,
        seed: u64,
    ) -> Result<Self, SamplerError> {
        if k == 0 {
            return Err(SamplerError::NoBlocks);
        }
        if spike == 0 {
            return Err(SamplerError::InvalidSpike);
        }
        if !(failure_probability > 0.0 && failure_probability < 1.0) {
            return Err(SamplerError::InvalidFailureProbability(failure_probability));
        }

        let r = k as f64 / spike as f64;
        let mass = |i: usize| ideal(k, i) + robust(spike, r, failure_probability, i);

        let z: f64 = (1..=k).map(mass).sum();

        let mut cdf = Vec::with_capacity(k);
        let mut sum = 0.0;
        for i in 1..=k {
            sum += mass(i) / z;
            cdf.push(sum);
        }

        Ok(Self {
            rng: seeded_stream(seed),
            k,
            spike,
            failure_probability,
            cdf,
        })
    }

    /// Build a sampler with the default spike and δ.
    pub fn with_defaults(k: usize, seed: u64) -> Result<Self, SamplerError> {
        Self::new(k, default_spike(k), DEFAULT_FAILURE_PROBABILITY, seed)
    }

    /// Draw the next degree in `[1, k]`.
    pub fn next_degree(&mut self) -> usize {
        let u: f64 = self.rng.gen();
        self.degree_for(u)
    }

    /// Inverse-CDF lookup for a uniform draw `u`.
    fn degree_for(&self, u: f64) -> usize {
        // First running sum strictly greater than u. Rounding can leave the
        // last sum a hair under 1.0; such draws land on k.
        let idx = self.cdf.partition_point(|&c| c <= u);
        (idx + 1).min(self.k)
    }

    /// Normalized probability of drawing degree `i`.
    pub fn probability(&self, i: usize) -> f64 {
        match i {
            0 => 0.0,
            1 => self.cdf[0],
            i if i <= self.k => self.cdf[i - 1] - self.cdf[i - 2],
            _ => 0.0,
        }
    }

    pub fn block_count(&self) -> usize {
        self.k
    }

    pub fn spike(&self) -> usize {
        self.spike
    }

    pub fn failure_probability(&self) -> f64 {
        self.failure_probability
    }
}

fn ideal(k: usize, i: usize) -> f64 {
    if i == 1 {
        1.0 / k as f64
    } else {
        1.0 / (i as f64 * (i - 1) as f64)
    }
}

fn robust(spike: usize, r: f64, delta: f64, i: usize) -> f64 {
    if i < spike {
        1.0 / (i as f64 * spike as f64)
    } else if i == spike {
        (r / delta).ln() / spike as f64
    } else {
        0.0
    }
}

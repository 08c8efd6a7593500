//! Per-frame neighbor sets.
//!
//! Couples a degree sampler and a distinct-index sampler under one nonce.
//! Both streams are strictly sequential, so neighbor sets are generated in
//! frame-index order and cached; asking for a later index forces every
//! index in between to be generated first.

use std::sync::Arc;

use super::degree::SolitonParams;
use super::{DegreeSampler, SamplerError, UniqueIndexSampler};

/// XORed into the nonce to seed the degree stream apart from the index stream.
pub const SOLITON_SEED: u64 = 0x3062_4700_3062_4770;

/// Source-block indices combined into one frame.
pub type Neighbors = Arc<[usize]>;

pub struct NeighborGenerator {
    nonce: u64,
    k: usize,
    degrees: DegreeSampler,
    indices: UniqueIndexSampler,
    /// `cache[i]` holds the neighbors of frame `i`. Append-only.
    cache: Vec<Neighbors>,
}

impl NeighborGenerator {
    /// Default distribution: spike at `ceil(ln(k)^2)`, δ = 0.02.
    pub fn new(nonce: u64, k: usize) -> Result<Self, SamplerError> {
        Self::with_soliton(nonce, k, &SolitonParams::default())
    }

    pub fn with_soliton(nonce: u64, k: usize, params: &SolitonParams) -> Result<Self, SamplerError> {
        Self::with_params(nonce, k, params.spike_for(k), params.failure_probability)
    }

    pub fn with_params(
        nonce: u64,
        k: usize,
        spike: usize,
        failure_probability: f64,
    ) -> Result<Self, SamplerError> {
        let degrees = DegreeSampler::new(k, spike, failure_probability, nonce ^ SOLITON_SEED)?;
        Ok(Self {
            nonce,
            k,
            degrees,
            indices: UniqueIndexSampler::new(nonce),
            cache: Vec::new(),
        })
    }

    /// Neighbors of frame `frame_index`, generating any missing predecessors.
    pub fn get(&mut self, frame_index: u64) -> Neighbors {
        while self.cache.len() as u64 <= frame_index {
            self.generate_next();
        }
        Arc::clone(&self.cache[frame_index as usize])
    }

    /// Neighbors of frame `frame_index` if already generated.
    pub fn cached(&self, frame_index: u64) -> Option<Neighbors> {
        usize::try_from(frame_index)
            .ok()
            .and_then(|i| self.cache.get(i))
            .cloned()
    }

    fn generate_next(&mut self) {
        let degree = self.degrees.next_degree();
        // degree is always within [1, k], so the draw cannot fail.
        let neighbors = self.indices.sample(self.k, degree);
        self.cache.push(neighbors.into());
    }

    /// Highest frame index generated so far, `None` before the first.
    pub fn cursor(&self) -> Option<u64> {
        (self.cache.len() as u64).checked_sub(1)
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn block_count(&self) -> usize {
        self.k
    }

    pub fn spike(&self) -> usize {
        self.degrees.spike()
    }
}

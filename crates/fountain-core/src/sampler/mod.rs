//! Seeded sampling pipeline. Decides which source blocks each frame combines.
//!
//! Every random choice in a coding session flows from the session nonce.
//! Sender and receiver build the same samplers from the same nonce and must
//! consume them in the same order; the neighbor generator enforces that order.
//!
//! The underlying stream is ChaCha20 seeded via `seed_from_u64`, which is
//! stable across platforms and `rand` releases of the 0.8 line.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

pub mod degree;
pub mod neighbor;
pub mod unique;

pub use degree::{DegreeSampler, SolitonParams};
pub use neighbor::NeighborGenerator;
pub use unique::UniqueIndexSampler;

/// Build the seeded stream shared by all samplers.
pub(crate) fn seeded_stream(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Parameter errors raised when a sampler is constructed or called.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    #[error("block count must be positive")]
    NoBlocks,

    #[error("spike position must be positive")]
    InvalidSpike,

    #[error("failure probability {0} must lie strictly between 0 and 1")]
    InvalidFailureProbability(f64),

    #[error("cannot draw {count} distinct values from a range of {max}")]
    CountExceedsRange { count: usize, max: usize },
}

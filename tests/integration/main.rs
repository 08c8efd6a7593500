//! fountain integration test harness.
//!
//! Drives encoder and decoder together through the public API only. Frames
//! cross the boundary as wire bytes wherever a real channel would carry them.
//!
//!   cargo test --test integration
//!
//! All randomness (payloads, loss, arrival order) is seeded, so failures
//! reproduce exactly.

use anyhow::{bail, Context, Result};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use fountain_core::{Decoder, Encoder};

// ── Harness ───────────────────────────────────────────────────────────────────

/// Deterministic pseudo-random payload.
pub fn payload(len: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0u8; len];
    ChaCha20Rng::seed_from_u64(seed).fill_bytes(&mut data);
    data
}

/// Seeded rng for loss and shuffle draws.
pub fn rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

/// Send frames through a channel that drops each with probability `loss`
/// until the decoder finishes. Returns the number of frames generated.
pub fn transmit(
    encoder: &mut Encoder,
    decoder: &mut Decoder,
    loss: f64,
    rng: &mut ChaCha20Rng,
    cap: u64,
) -> Result<u64> {
    for sent in 1..=cap {
        let frame = encoder.next_frame().context("encoder stopped early")?;
        if rng.gen_bool(loss) {
            continue;
        }
        decoder
            .on_bytes(&frame.to_bytes())
            .with_context(|| format!("frame {} rejected", sent - 1))?;
        if decoder.is_finished() {
            return Ok(sent);
        }
    }
    bail!(
        "not finished after {cap} frames: {}/{} blocks",
        decoder.resolved_count(),
        decoder.block_count()
    )
}

/// First `n` frames as wire bytes.
pub fn wire_frames(encoder: &mut Encoder, n: usize) -> Vec<Vec<u8>> {
    encoder.by_ref().take(n).map(|f| f.to_bytes()).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

mod loss;
mod ordering;
mod wire;

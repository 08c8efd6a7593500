//! Lossy channel scenarios. Frames travel as wire bytes so the codec is
//! exercised end to end.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::Rng;

use fountain_core::{Decoder, Encoder};

/// What a scenario cost.
#[derive(Debug, Clone, Copy)]
pub struct Report {
    pub sent: u64,
    pub delivered: u64,
    pub blocks: usize,
}

impl Report {
    /// Delivered frames per source block.
    pub fn overhead(&self) -> f64 {
        self.delivered as f64 / self.blocks as f64
    }
}

/// Frames in index order, each dropped with probability `loss_rate`.
pub fn sequential(
    encoder: &mut Encoder,
    decoder: &mut Decoder,
    rng: &mut StdRng,
    loss_rate: f64,
    max_frames: u64,
) -> Result<Report> {
    let mut delivered = 0;
    for sent in 1..=max_frames {
        let frame = encoder.next_frame().context("encoder stopped")?;
        if rng.gen_bool(loss_rate) {
            continue;
        }
        delivered += 1;
        decoder
            .on_bytes(&frame.to_bytes())
            .context("decoder rejected frame")?;
        if decoder.is_finished() {
            return Ok(Report {
                sent,
                delivered,
                blocks: decoder.block_count(),
            });
        }
    }
    bail!(
        "gave up after {max_frames} frames with {}/{} blocks",
        decoder.resolved_count(),
        decoder.block_count()
    )
}

/// Surviving frames pass through a holding buffer of `window` slots and
/// leave it in random order.
pub fn reordered(
    encoder: &mut Encoder,
    decoder: &mut Decoder,
    rng: &mut StdRng,
    loss_rate: f64,
    window: usize,
    max_frames: u64,
) -> Result<Report> {
    let mut held: Vec<Vec<u8>> = Vec::with_capacity(window + 1);
    let mut delivered = 0;
    for sent in 1..=max_frames {
        let frame = encoder.next_frame().context("encoder stopped")?;
        if !rng.gen_bool(loss_rate) {
            held.push(frame.to_bytes());
        }
        if held.len() <= window {
            continue;
        }
        let bytes = held.swap_remove(rng.gen_range(0..held.len()));
        delivered += 1;
        decoder
            .on_bytes(&bytes)
            .context("decoder rejected frame")?;
        if decoder.is_finished() {
            return Ok(Report {
                sent,
                delivered,
                blocks: decoder.block_count(),
            });
        }
    }
    bail!(
        "gave up after {max_frames} frames with {}/{} blocks",
        decoder.resolved_count(),
        decoder.block_count()
    )
}


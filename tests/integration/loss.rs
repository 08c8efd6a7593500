//! Seeded independent loss across block counts and loss rates.

use fountain_core::{Decoder, Encoder};

use crate::{payload, rng, transmit};

/// Frame size used for every case; K follows from the payload length.
const FRAME_SIZE: usize = 64;

fn decode_under_loss(blocks: usize, loss: f64, seed: u64) -> u64 {
    let data = payload(blocks * FRAME_SIZE - 3, seed);
    let mut enc = Encoder::with_nonce(&data, FRAME_SIZE, seed ^ 0x5eed).unwrap();
    let mut dec = Decoder::new();
    // Generous: completion probability tends to 1 as the frame count grows.
    let cap = 50 * blocks as u64 + 200;
    let cap = (cap as f64 / (1.0 - loss)).ceil() as u64;
    let sent = transmit(&mut enc, &mut dec, loss, &mut rng(seed), cap)
        .unwrap_or_else(|e| panic!("K={blocks} loss={loss}: {e:#}"));
    assert_eq!(dec.block_count(), blocks);
    assert_eq!(dec.decoded().unwrap(), data, "K={blocks} loss={loss}");
    assert_eq!(dec.pending_frames(), 0);
    sent
}

#[test]
fn single_block() {
    for (i, loss) in [0.0, 0.3, 0.7].into_iter().enumerate() {
        decode_under_loss(1, loss, 100 + i as u64);
    }
}

#[test]
fn ten_blocks() {
    for (i, loss) in [0.0, 0.3, 0.7].into_iter().enumerate() {
        decode_under_loss(10, loss, 200 + i as u64);
    }
}

#[test]
fn hundred_blocks() {
    for (i, loss) in [0.0, 0.3, 0.7].into_iter().enumerate() {
        decode_under_loss(100, loss, 300 + i as u64);
    }
}

#[test]
fn overhead_is_modest_without_loss() {
    // Averaged over several nonces, K=100 should need well under 2K frames.
    let total: u64 = (0..8).map(|seed| decode_under_loss(100, 0.0, 400 + seed)).sum();
    let mean = total as f64 / 8.0;
    assert!(mean < 200.0, "mean frames {mean}");
    assert!(mean >= 100.0);
}

#[test]
fn loss_needs_more_frames_generated() {
    let lossless: u64 = (0..4).map(|s| decode_under_loss(50, 0.0, 500 + s)).sum();
    let lossy: u64 = (0..4).map(|s| decode_under_loss(50, 0.7, 500 + s)).sum();
    assert!(lossy > lossless);
}

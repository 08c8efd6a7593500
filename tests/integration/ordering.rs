//! Arrival order, duplicates and interleaved streams.

use rand::seq::SliceRandom;

use fountain_core::{Decoder, DecoderOptions, Encoder, FrameOutcome};

use crate::{payload, rng, wire_frames};

#[test]
fn arrival_order_does_not_change_result() {
    let data = payload(3200, 1);
    let mut enc = Encoder::with_nonce(&data, 100, 0xabc).unwrap();
    let frames = wire_frames(&mut enc, 160);

    let mut forward = Decoder::new();
    for bytes in &frames {
        forward.on_bytes(bytes).unwrap();
    }

    let mut shuffled = frames.clone();
    shuffled.shuffle(&mut rng(2));
    // Re-deliver a slice of frames to mix duplicates in.
    let extra: Vec<Vec<u8>> = shuffled[..40].to_vec();
    shuffled.extend(extra);
    shuffled.shuffle(&mut rng(3));

    let mut mixed = Decoder::new();
    for bytes in &shuffled {
        mixed.on_bytes(bytes).unwrap();
    }

    assert_eq!(forward.resolved_mask(), mixed.resolved_mask());
    assert_eq!(forward.resolved_count(), mixed.resolved_count());
    for i in 0..forward.block_count() {
        assert_eq!(forward.block(i), mixed.block(i), "block {i}");
    }
    assert!(forward.is_finished());
    assert_eq!(mixed.decoded().unwrap(), data);
}

#[test]
fn partial_sets_resolve_identically() {
    // Too few frames to finish: the partial state must still agree.
    let data = payload(6400, 4);
    let mut enc = Encoder::with_nonce(&data, 100, 91).unwrap();
    let frames = wire_frames(&mut enc, 40);

    let mut forward = Decoder::new();
    for bytes in &frames {
        forward.on_bytes(bytes).unwrap();
    }
    let mut backward = Decoder::new();
    for bytes in frames.iter().rev() {
        backward.on_bytes(bytes).unwrap();
    }
    assert!(!forward.is_finished());
    assert_eq!(forward.resolved_mask(), backward.resolved_mask());
    assert_eq!(forward.pending_frames(), backward.pending_frames());
}

#[test]
fn redelivery_is_a_no_op() {
    let data = payload(5000, 5);
    let mut enc = Encoder::with_nonce(&data, 100, 12).unwrap();
    let mut dec = Decoder::new();
    for bytes in wire_frames(&mut enc, 120) {
        dec.on_bytes(&bytes).unwrap();
        let resolved = dec.resolved_count();
        let pending = dec.pending_frames();
        let again = dec.on_bytes(&bytes).unwrap();
        assert!(
            matches!(again, FrameOutcome::Duplicate | FrameOutcome::Redundant),
            "second delivery gave {again:?}"
        );
        assert_eq!(dec.resolved_count(), resolved);
        assert_eq!(dec.pending_frames(), pending);
    }
}

#[test]
fn interleaved_streams_only_feed_their_decoder() {
    let a_data = payload(2000, 10);
    let b_data = payload(2000, 11);
    let mut a_enc = Encoder::with_nonce(&a_data, 100, 1).unwrap();
    let mut b_enc = Encoder::with_nonce(&b_data, 100, 2).unwrap();

    let mut a_dec = Decoder::new();
    // First frame binds the decoder to stream A.
    a_dec.on_bytes(&a_enc.next_frame().unwrap().to_bytes()).unwrap();

    let mut foreign = 0;
    while !a_dec.is_finished() {
        let ours = a_enc.next_frame().unwrap().to_bytes();
        let theirs = b_enc.next_frame().unwrap().to_bytes();
        assert_eq!(a_dec.on_bytes(&theirs).unwrap(), FrameOutcome::Foreign);
        foreign += 1;
        a_dec.on_bytes(&ours).unwrap();
        assert!(foreign < 2_000, "stream A never finished");
    }
    assert_eq!(a_dec.stats().foreign, foreign);
    assert_eq!(a_dec.decoded().unwrap(), a_data);
}

#[test]
fn far_ahead_indices_can_be_capped() {
    let data = payload(1000, 12);
    let mut enc = Encoder::with_nonce(&data, 100, 66).unwrap();
    let mut dec = Decoder::with_options(DecoderOptions {
        max_frame_index: Some(10_000),
        ..DecoderOptions::default()
    });
    dec.on_frame(enc.frame_at(0).unwrap()).unwrap();
    let far = enc.frame_at(50_000).unwrap();
    assert_eq!(dec.on_frame(far).unwrap(), FrameOutcome::Ignored);
    assert_eq!(dec.stats().ignored, 1);
}

//! Encoder output as seen on the wire.

use fountain_core::wire::MAX_U48;
use fountain_core::{DecodeError, Decoder, Encoder, Frame, FrameOutcome, WireError, HEADER_LEN};

use crate::{payload, wire_frames};

#[test]
fn encoded_frames_carry_stream_header() {
    let data = payload(777, 30);
    let mut enc = Encoder::with_nonce(&data, 70, 0x1122_3344_5566_7788).unwrap();
    for (i, bytes) in wire_frames(&mut enc, 5).iter().enumerate() {
        assert_eq!(bytes.len(), HEADER_LEN + 70);
        assert_eq!(&bytes[0..8], &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
        assert_eq!(&bytes[8..14], &[0, 0, 0, 0, 0x03, 0x09]);
        assert_eq!(&bytes[14..20], &[0, 0, 0, 0, 0, i as u8]);

        let frame = Frame::from_bytes_sized(bytes, 70).unwrap();
        assert_eq!(frame.frame_index(), i as u64);
        assert_eq!(frame.total_length(), 777);
    }
}

#[test]
fn encoder_frame_matches_parsed_frame() {
    let data = payload(400, 31);
    let mut enc = Encoder::with_nonce(&data, 40, 3).unwrap();
    let frame = enc.next_frame().unwrap();
    let neighbors = frame.neighbors().cloned().unwrap();
    assert!(!neighbors.is_empty());

    let parsed = Frame::from_bytes(&frame.to_bytes()).unwrap();
    assert_eq!(parsed.payload(), frame.payload());
    assert!(parsed.neighbors().is_none());
}

#[test]
fn malformed_buffers_are_errors_not_panics() {
    let mut dec = Decoder::new();
    for len in [0, 1, HEADER_LEN - 1] {
        assert_eq!(
            dec.on_bytes(&vec![0u8; len]).unwrap_err(),
            DecodeError::Wire(WireError::Truncated(len))
        );
    }
    // Header with no payload cannot establish a frame size.
    let empty = Frame::new(5, 100, 0, Default::default()).unwrap().to_bytes();
    assert!(matches!(
        dec.on_bytes(&empty),
        Err(DecodeError::InvalidFrame(_))
    ));
    assert!(!dec.is_initialized());
}

#[test]
fn resized_frame_of_same_stream_is_rejected() {
    let data = payload(1000, 32);
    let mut enc = Encoder::with_nonce(&data, 100, 8).unwrap();
    let mut dec = Decoder::new();
    let first = enc.next_frame().unwrap().to_bytes();
    dec.on_bytes(&first).unwrap();

    let mut trimmed = enc.next_frame().unwrap().to_bytes();
    trimmed.truncate(HEADER_LEN + 60);
    assert_eq!(
        dec.on_bytes(&trimmed).unwrap_err(),
        DecodeError::ParameterMismatch {
            field: "frame_size",
            expected: 100,
            got: 60
        }
    );

    // A different stream of another size is merely foreign.
    let mut other = Encoder::with_nonce(&data, 60, 9).unwrap();
    let theirs = other.next_frame().unwrap().to_bytes();
    assert_eq!(dec.on_bytes(&theirs).unwrap(), FrameOutcome::Foreign);
}

#[test]
fn index_space_is_48_bits() {
    let data = payload(100, 33);
    let mut enc = Encoder::with_nonce(&data, 10, 1).unwrap();
    assert!(enc.frame_at(MAX_U48 + 1).is_err());
}

#[test]
fn tiny_frame_claiming_huge_stream_is_refused() {
    let hostile = Frame::new(7, 1 << 40, 0, vec![0u8].into()).unwrap().to_bytes();
    assert_eq!(hostile.len(), HEADER_LEN + 1);

    let mut dec = Decoder::new();
    assert!(matches!(
        dec.on_bytes(&hostile),
        Err(DecodeError::InvalidFrame(_))
    ));
    assert!(!dec.is_initialized());
}

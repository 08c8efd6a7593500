//! Source block helpers shared by the encoder and decoder.

use bytes::{Bytes, BytesMut};

/// Number of `frame_size` blocks needed for `total_length` bytes.
pub fn block_count(total_length: u64, frame_size: usize) -> u64 {
    total_length.div_ceil(frame_size as u64)
}

/// Split `data` into `frame_size` blocks, zero-padding the last one.
pub(crate) fn split_blocks(data: &[u8], frame_size: usize) -> Vec<Bytes> {
    data.chunks(frame_size)
        .map(|chunk| {
            if chunk.len() == frame_size {
                Bytes::copy_from_slice(chunk)
            } else {
                let mut padded = BytesMut::zeroed(frame_size);
                padded[..chunk.len()].copy_from_slice(chunk);
                padded.freeze()
            }
        })
        .collect()
}

/// `dst ^= src`, byte for byte. Both slices have the frame size.
pub(crate) fn xor_into(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

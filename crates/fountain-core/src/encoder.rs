//! Encoder: turns K source blocks into an unbounded stream of frames.
//!
//! Work happens on pull. Each pull takes the next frame index, asks the
//! neighbor generator which blocks that index combines, XORs them, and
//! returns the frame. For a fixed `(nonce, frame_size, data)` the n-th frame
//! is byte-identical across runs and across encoder instances.

use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::block::{block_count, split_blocks, xor_into};
use crate::sampler::{NeighborGenerator, SamplerError, SolitonParams};
use crate::wire::{Frame, MAX_U48};

pub struct Encoder {
    nonce: u64,
    frame_size: usize,
    total_length: u64,
    next_index: u64,
    /// `None` once closed.
    state: Option<EncoderState>,
}

struct EncoderState {
    blocks: Vec<Bytes>,
    neighbors: NeighborGenerator,
}

impl Encoder {
    /// Encode `data` under a random nonce.
    pub fn new(data: &[u8], frame_size: usize) -> Result<Self, EncodeError> {
        Self::with_nonce(data, frame_size, rand::random())
    }

    pub fn with_nonce(data: &[u8], frame_size: usize, nonce: u64) -> Result<Self, EncodeError> {
        Self::with_soliton(data, frame_size, nonce, &SolitonParams::default())
    }

    /// Encode with a non-default degree distribution. The decoder must be
    /// given the same parameters.
    pub fn with_soliton(
        data: &[u8],
        frame_size: usize,
        nonce: u64,
        soliton: &SolitonParams,
    ) -> Result<Self, EncodeError> {
        if frame_size == 0 {
            return Err(EncodeError::InvalidFrameSize);
        }
        let blocks = split_blocks(data, frame_size);
        Self::build(blocks, frame_size, nonce, data.len() as u64, soliton)
    }

    /// Read `reader` to EOF in `frame_size` chunks.
    pub fn from_reader<R: Read>(
        mut reader: R,
        frame_size: usize,
        nonce: u64,
        soliton: &SolitonParams,
    ) -> Result<Self, EncodeError> {
        if frame_size == 0 {
            return Err(EncodeError::InvalidFrameSize);
        }
        let mut blocks = Vec::new();
        let mut total_length = 0u64;
        loop {
            let mut chunk = BytesMut::zeroed(frame_size);
            let read = read_full(&mut reader, &mut chunk)?;
            if read > 0 {
                total_length += read as u64;
                blocks.push(chunk.freeze());
            }
            if read < frame_size {
                break;
            }
        }
        Self::build(blocks, frame_size, nonce, total_length, soliton)
    }

    /// Encode externally prepared blocks. Every block must be `frame_size`
    /// bytes (the last one padded) and their count must match `total_length`.
    pub fn from_blocks(
        blocks: Vec<Bytes>,
        frame_size: usize,
        nonce: u64,
        total_length: u64,
        soliton: &SolitonParams,
    ) -> Result<Self, EncodeError> {
        if frame_size == 0 {
            return Err(EncodeError::InvalidFrameSize);
        }
        if blocks.iter().any(|b| b.len() != frame_size) {
            return Err(EncodeError::BlockLayout("block length differs from frame size"));
        }
        if blocks.len() as u64 != block_count(total_length, frame_size) {
            return Err(EncodeError::BlockLayout("block count does not cover total length"));
        }
        Self::build(blocks, frame_size, nonce, total_length, soliton)
    }

    fn build(
        blocks: Vec<Bytes>,
        frame_size: usize,
        nonce: u64,
        total_length: u64,
        soliton: &SolitonParams,
    ) -> Result<Self, EncodeError> {
        if total_length == 0 {
            return Err(EncodeError::EmptyPayload);
        }
        if total_length > MAX_U48 {
            return Err(EncodeError::PayloadTooLarge(total_length));
        }
        let neighbors = NeighborGenerator::with_soliton(nonce, blocks.len(), soliton)?;

        tracing::debug!(
            nonce = format_args!("{nonce:016x}"),
            blocks = blocks.len(),
            frame_size,
            total_length,
            spike = neighbors.spike(),
            "encoder ready"
        );

        Ok(Self {
            nonce,
            frame_size,
            total_length,
            next_index: 0,
            state: Some(EncoderState { blocks, neighbors }),
        })
    }

    /// Produce the next frame and advance the index counter.
    pub fn next_frame(&mut self) -> Result<Frame, EncodeError> {
        let frame = self.frame_at(self.next_index)?;
        self.next_index += 1;
        Ok(frame)
    }

    /// Rebuild frame `index` without touching the counter.
    pub fn frame_at(&mut self, index: u64) -> Result<Frame, EncodeError> {
        let state = self.state.as_mut().ok_or(EncodeError::Closed)?;
        if index > MAX_U48 {
            return Err(EncodeError::Exhausted);
        }

        // Degree is at least 1: the first neighbor seeds the buffer.
        let neighbors = state.neighbors.get(index);
        let mut payload = BytesMut::from(&state.blocks[neighbors[0]][..]);
        for &j in &neighbors[1..] {
            xor_into(&mut payload, &state.blocks[j]);
        }

        tracing::trace!(index, degree = neighbors.len(), "frame encoded");

        Ok(Frame::encoded(
            self.nonce,
            self.total_length,
            index,
            payload.freeze(),
            neighbors,
        ))
    }

    /// Release the blocks. Later pulls fail with `EncodeError::Closed`.
    pub fn close(&mut self) {
        if self.state.take().is_some() {
            tracing::debug!(frames = self.next_index, "encoder closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_none()
    }

    /// Index the next pull will produce.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn block_count(&self) -> usize {
        block_count(self.total_length, self.frame_size) as usize
    }

    /// Source blocks, last one zero padded. Empty once closed.
    pub fn blocks(&self) -> &[Bytes] {
        self.state.as_ref().map(|s| s.blocks.as_slice()).unwrap_or(&[])
    }
}

impl Iterator for Encoder {
    type Item = Frame;

    /// Unbounded until closed or the 48-bit index space runs out.
    fn next(&mut self) -> Option<Frame> {
        self.next_frame().ok()
    }
}

/// Fill `buf` from `reader`, stopping early only at EOF.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame size must be positive")]
    InvalidFrameSize,

    #[error("cannot encode empty payload")]
    EmptyPayload,

    #[error("payload of {0} bytes exceeds the 48-bit length field")]
    PayloadTooLarge(u64),

    #[error("invalid block layout: {0}")]
    BlockLayout(&'static str),

    #[error("frame index space exhausted")]
    Exhausted,

    #[error("encoder is closed")]
    Closed,

    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
}

//! Fountain wire format — on-wire layout of an encoded frame.
//!
//! Every frame is a fixed 20-byte big-endian header followed by exactly
//! `frame_size` payload bytes:
//!
//!   bytes  0..8   nonce        (u64)
//!   bytes  8..14  total length (u48)
//!   bytes 14..20  frame index  (u48)
//!   bytes 20..    payload
//!
//! The payload length is not carried. A receiver learns it from the first
//! frame of a stream or from out-of-band configuration. Neighbor sets are not
//! carried either; both ends re-derive them from `(nonce, frame_index)`.

use bytes::Bytes;
use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U64};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::sampler::neighbor::Neighbors;

// ── Header ────────────────────────────────────────────────────────────────────

/// Wire size: 20 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    /// Session nonce. Also the seed of every sampling stream.
    pub nonce: U64<BigEndian>,

    /// Length of the original payload in bytes. Top 16 bits of the
    /// conceptual u64 are not transmitted.
    pub total_length: [u8; 6],

    /// Encoder-assigned frame index, from 0.
    pub frame_index: [u8; 6],
}

assert_eq_size!(FrameHeader, [u8; 20]);

/// Header size in bytes.
pub const HEADER_LEN: usize = 20;

/// Largest value a 48-bit header field can hold.
pub const MAX_U48: u64 = (1 << 48) - 1;

fn put_u48(value: u64) -> [u8; 6] {
    let mut out = [0u8; 6];
    out.copy_from_slice(&value.to_be_bytes()[2..]);
    out
}

fn get_u48(raw: [u8; 6]) -> u64 {
    let mut buf = [0u8; 8];
    buf[2..].copy_from_slice(&raw);
    u64::from_be_bytes(buf)
}

// ── Frame ─────────────────────────────────────────────────────────────────────

/// One encoded frame: the XOR of the source blocks named by its neighbors.
#[derive(Debug, Clone)]
pub struct Frame {
    nonce: u64,
    total_length: u64,
    frame_index: u64,
    payload: Bytes,
    /// Attached by the encoder; absent on frames parsed off the wire.
    neighbors: Option<Neighbors>,
}

impl Frame {
    /// Build a frame, checking the 48-bit header fields.
    pub fn new(
        nonce: u64,
        total_length: u64,
        frame_index: u64,
        payload: Bytes,
    ) -> Result<Self, WireError> {
        if total_length > MAX_U48 {
            return Err(WireError::FieldOverflow("total_length", total_length));
        }
        if frame_index > MAX_U48 {
            return Err(WireError::FieldOverflow("frame_index", frame_index));
        }
        Ok(Self {
            nonce,
            total_length,
            frame_index,
            payload,
            neighbors: None,
        })
    }

    /// Encoder path: fields are already known to fit.
    pub(crate) fn encoded(
        nonce: u64,
        total_length: u64,
        frame_index: u64,
        payload: Bytes,
        neighbors: Neighbors,
    ) -> Self {
        debug_assert!(total_length <= MAX_U48 && frame_index <= MAX_U48);
        Self {
            nonce,
            total_length,
            frame_index,
            payload,
            neighbors: Some(neighbors),
        }
    }

    /// Parse a frame, taking everything after the header as payload.
    ///
    /// Used for the first frame of a stream, before the frame size is known.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        let header = FrameHeader::read_from_prefix(buf).ok_or(WireError::Truncated(buf.len()))?;
        Ok(Self::from_header(&header, Bytes::copy_from_slice(&buf[HEADER_LEN..])))
    }

    /// Parse a frame whose payload must be exactly `frame_size` bytes.
    pub fn from_bytes_sized(buf: &[u8], frame_size: usize) -> Result<Self, WireError> {
        let expected = HEADER_LEN + frame_size;
        if buf.len() != expected {
            return Err(WireError::LengthMismatch {
                expected,
                got: buf.len(),
            });
        }
        Self::from_bytes(buf)
    }

    fn from_header(header: &FrameHeader, payload: Bytes) -> Self {
        // Copy packed fields to locals before use.
        let nonce = header.nonce;
        let total_length = header.total_length;
        let frame_index = header.frame_index;
        Self {
            nonce: nonce.get(),
            total_length: get_u48(total_length),
            frame_index: get_u48(frame_index),
            payload,
            neighbors: None,
        }
    }

    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            nonce: U64::new(self.nonce),
            total_length: put_u48(self.total_length),
            frame_index: put_u48(self.frame_index),
        }
    }

    /// Serialize to header + payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(self.header().as_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn frame_size(&self) -> usize {
        self.payload.len()
    }

    pub fn neighbors(&self) -> Option<&Neighbors> {
        self.neighbors.as_ref()
    }

    pub(crate) fn into_payload(self) -> Bytes {
        self.payload
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("buffer of {0} bytes is shorter than the {HEADER_LEN}-byte header")]
    Truncated(usize),

    #[error("frame length mismatch: expected {expected} bytes, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("{0} value {1} does not fit in 48 bits")]
    FieldOverflow(&'static str, u64),
}

// ── Tests ─────────────────────────────────────────────────────────────────────

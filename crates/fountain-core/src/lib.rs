//! fountain-core — LT fountain code: seeded samplers, frame wire format,
//! encoder and peeling decoder.
//!
//! A payload is split into K source blocks. The encoder emits an unbounded
//! stream of frames, each the XOR of a pseudo-random subset of blocks. Any
//! sufficiently large subset of frames, in any order, lets the decoder
//! rebuild the payload. Sender and receiver share only the nonce carried in
//! every frame header.

pub mod block;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod reader;
pub mod sampler;
pub mod wire;

pub use config::{ConfigError, FountainConfig};
pub use decoder::{
    DecodeError, Decoder, DecoderOptions, DecoderParams, DecoderStats, FrameOutcome,
};
pub use encoder::{EncodeError, Encoder};
pub use reader::DecodedReader;
pub use sampler::{DegreeSampler, NeighborGenerator, SamplerError, SolitonParams, UniqueIndexSampler};
pub use wire::{Frame, FrameHeader, WireError, HEADER_LEN};

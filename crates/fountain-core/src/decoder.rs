//! Peeling decoder.
//!
//! Every source block starts Unknown and becomes Resolved exactly once. Each
//! received frame is one XOR equation over its neighbors. On arrival the
//! neighbors are split into known and unknown blocks:
//!
//!   0 unknown   the frame is redundant and dropped
//!   1 unknown   XOR out the known blocks; what remains is the unknown block
//!   2+ unknown  the frame is parked under each unknown index
//!
//! When a block resolves, every frame parked under it is re-evaluated. That
//! can resolve further blocks, so re-evaluation runs off an explicit worklist
//! instead of recursion. Each block resolves once, which bounds the total
//! cascade work by K plus the number of parked registrations.
//!
//! The decoder initializes itself from the first frame it sees (frame size =
//! payload length), unless it was built with explicit `DecoderParams`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::block::{block_count, xor_into};
use crate::reader::DecodedReader;
use crate::sampler::neighbor::Neighbors;
use crate::sampler::{NeighborGenerator, SamplerError, SolitonParams};
use crate::wire::{Frame, WireError, MAX_U48};

// ── Parameters ────────────────────────────────────────────────────────────────

/// Default ceiling on K. 256 MiB of payload at 1 KiB frames.
pub const DEFAULT_MAX_BLOCKS: usize = 1 << 18;

/// Stream shape a decoder is bound to. The degree distribution is not part
/// of it; that comes from `DecoderOptions::soliton` in every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderParams {
    pub nonce: u64,
    pub total_length: u64,
    pub frame_size: usize,
}

impl DecoderParams {
    pub fn new(nonce: u64, total_length: u64, frame_size: usize) -> Self {
        Self {
            nonce,
            total_length,
            frame_size,
        }
    }

    /// K, the number of source blocks.
    pub fn block_count(&self) -> usize {
        block_count(self.total_length, self.frame_size) as usize
    }
}

/// Knobs that apply however the decoder gets initialized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderOptions {
    /// Degree distribution. Must match the encoder's.
    pub soliton: SolitonParams,
    /// Frames above this index are ignored. Bounds the neighbor cache a
    /// single far-ahead index would otherwise force.
    pub max_frame_index: Option<u64>,
    /// Largest K a stream may declare. The header's total length alone
    /// sizes the block table, so this bounds what one frame can allocate.
    pub max_blocks: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            soliton: SolitonParams::default(),
            max_frame_index: None,
            max_blocks: DEFAULT_MAX_BLOCKS,
        }
    }
}

// ── Outcomes & stats ──────────────────────────────────────────────────────────

/// Terminal local outcome of one `on_frame` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Different nonce. Belongs to another stream.
    Foreign,
    /// Same frame index is already parked.
    Duplicate,
    /// Index above `max_frame_index`.
    Ignored,
    /// Every neighbor already known.
    Redundant,
    /// Resolved `blocks` source blocks, cascade included.
    Resolved { blocks: usize },
    /// Waiting on two or more unknown blocks.
    Parked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub received: u64,
    pub foreign: u64,
    pub duplicate: u64,
    pub ignored: u64,
    pub redundant: u64,
    pub parked: u64,
    /// Frames that resolved a block on arrival.
    pub resolving: u64,
    /// Blocks resolved by re-evaluating parked frames.
    pub cascaded: u64,
    /// Most blocks one cascade resolved, not counting its root.
    pub longest_cascade: u64,
}

// ── Decoder ───────────────────────────────────────────────────────────────────

pub struct Decoder {
    options: DecoderOptions,
    state: State,
    stats: DecoderStats,
}

enum State {
    Uninitialized,
    Active(Box<Session>),
    Closed,
}

struct Session {
    params: DecoderParams,
    neighbors: NeighborGenerator,
    blocks: Vec<Option<Bytes>>,
    resolved_count: usize,
    /// Frames waiting on unknown blocks, by frame index.
    parked: HashMap<u64, ParkedFrame>,
    /// `pending[j]` holds the parked frames that have `j` as an unresolved
    /// neighbor. Emptied when `j` resolves.
    pending: Vec<BTreeSet<u64>>,
}

struct ParkedFrame {
    payload: Bytes,
    neighbors: Neighbors,
}

/// Known/unknown split of a frame's neighbors.
enum Reduction {
    Redundant,
    Single(usize),
    Open(Vec<usize>),
}

impl Decoder {
    /// Decoder that learns its parameters from the first frame.
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self {
            options,
            state: State::Uninitialized,
            stats: DecoderStats::default(),
        }
    }

    /// Decoder bound up front to known parameters, default distribution.
    /// First-frame inference is skipped; frames whose size or length
    /// disagree are rejected.
    pub fn with_params(params: DecoderParams) -> Result<Self, DecodeError> {
        Self::with_params_and_options(params, DecoderOptions::default())
    }

    pub fn with_params_and_options(
        params: DecoderParams,
        options: DecoderOptions,
    ) -> Result<Self, DecodeError> {
        let session = Session::new(params, &options)?;
        log_initialized(&params, "explicit");
        Ok(Self {
            options,
            state: State::Active(Box::new(session)),
            stats: DecoderStats::default(),
        })
    }

    /// Parse a wire buffer and feed it in.
    pub fn on_bytes(&mut self, buf: &[u8]) -> Result<FrameOutcome, DecodeError> {
        let frame = Frame::from_bytes(buf)?;
        self.on_frame(frame)
    }

    /// Feed one frame and run any cascade it triggers to completion.
    pub fn on_frame(&mut self, frame: Frame) -> Result<FrameOutcome, DecodeError> {
        if let State::Uninitialized = self.state {
            let session = self.infer(&frame)?;
            self.state = State::Active(Box::new(session));
        }
        let State::Active(session) = &mut self.state else {
            return Err(DecodeError::Closed);
        };

        self.stats.received += 1;
        let index = frame.frame_index();

        if frame.nonce() != session.params.nonce {
            self.stats.foreign += 1;
            tracing::trace!(
                index,
                nonce = format_args!("{:016x}", frame.nonce()),
                "foreign frame dropped"
            );
            return Ok(FrameOutcome::Foreign);
        }
        session.check_frame(&frame)?;

        if self.options.max_frame_index.is_some_and(|max| index > max) {
            self.stats.ignored += 1;
            tracing::trace!(index, "frame index above limit, ignored");
            return Ok(FrameOutcome::Ignored);
        }
        if session.parked.contains_key(&index) {
            self.stats.duplicate += 1;
            tracing::trace!(index, "duplicate of parked frame");
            return Ok(FrameOutcome::Duplicate);
        }

        let neighbors = session.neighbors.get(index);
        let outcome = match session.reduce(&neighbors) {
            Reduction::Redundant => {
                self.stats.redundant += 1;
                FrameOutcome::Redundant
            }
            Reduction::Single(j) => {
                self.stats.resolving += 1;
                let blocks = session.resolve_and_cascade(j, &frame.into_payload(), &neighbors);
                let cascaded = blocks as u64 - 1;
                self.stats.cascaded += cascaded;
                self.stats.longest_cascade = self.stats.longest_cascade.max(cascaded);
                FrameOutcome::Resolved { blocks }
            }
            Reduction::Open(unknown) => {
                self.stats.parked += 1;
                session.park(index, frame.into_payload(), neighbors, &unknown);
                FrameOutcome::Parked
            }
        };

        tracing::trace!(
            index,
            ?outcome,
            resolved = session.resolved_count,
            "frame processed"
        );
        if matches!(outcome, FrameOutcome::Resolved { .. }) && session.is_finished() {
            tracing::info!(
                nonce = format_args!("{:016x}", session.params.nonce),
                blocks = session.blocks.len(),
                frames = self.stats.received,
                "decode complete"
            );
        }
        Ok(outcome)
    }

    /// Session parameters from the first frame: frame size is its payload length.
    fn infer(&self, frame: &Frame) -> Result<Session, DecodeError> {
        if frame.frame_size() == 0 {
            return Err(DecodeError::InvalidFrame("empty payload"));
        }
        if frame.total_length() == 0 {
            return Err(DecodeError::InvalidFrame("zero total length"));
        }
        let blocks = block_count(frame.total_length(), frame.frame_size());
        if blocks > self.options.max_blocks as u64 {
            tracing::warn!(
                blocks,
                limit = self.options.max_blocks,
                total_length = frame.total_length(),
                frame_size = frame.frame_size(),
                "first frame declares too many blocks"
            );
            return Err(DecodeError::InvalidFrame("block count above limit"));
        }
        let params = DecoderParams::new(frame.nonce(), frame.total_length(), frame.frame_size());
        let session = Session::new(params, &self.options)?;
        log_initialized(&params, "first frame");
        Ok(session)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    /// True once every source block is resolved.
    pub fn is_finished(&self) -> bool {
        self.session().is_some_and(Session::is_finished)
    }

    pub fn resolved_count(&self) -> usize {
        self.session().map_or(0, |s| s.resolved_count)
    }

    /// K, or 0 before initialization.
    pub fn block_count(&self) -> usize {
        self.session().map_or(0, |s| s.blocks.len())
    }

    pub fn params(&self) -> Option<&DecoderParams> {
        self.session().map(|s| &s.params)
    }

    pub fn is_resolved(&self, index: usize) -> bool {
        self.block(index).is_some()
    }

    /// Per-block resolution flags, index order.
    pub fn resolved_mask(&self) -> Vec<bool> {
        self.session()
            .map(|s| s.blocks.iter().map(Option::is_some).collect())
            .unwrap_or_default()
    }

    /// Resolved block `index`, full frame size (the last one still padded).
    pub fn block(&self, index: usize) -> Option<&Bytes> {
        self.session()
            .and_then(|s| s.blocks.get(index))
            .and_then(Option::as_ref)
    }

    /// Number of frames currently parked.
    pub fn pending_frames(&self) -> usize {
        self.session().map_or(0, |s| s.parked.len())
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// The reconstructed payload, exactly `total_length` bytes.
    pub fn decoded(&self) -> Result<Vec<u8>, DecodeError> {
        let session = self.finished_session()?;
        let total = session.params.total_length as usize;
        let mut out = Vec::with_capacity(total);
        for block in session.blocks.iter().flatten() {
            out.extend_from_slice(block);
        }
        out.truncate(total);
        Ok(out)
    }

    /// Sequential `Read + Seek` view over the resolved blocks.
    pub fn reader(&self) -> Result<DecodedReader, DecodeError> {
        let session = self.finished_session()?;
        let blocks = session.blocks.iter().flatten().cloned().collect();
        Ok(DecodedReader::new(blocks, session.params.total_length))
    }

    /// Drop all state. Later frames are rejected with `DecodeError::Closed`.
    pub fn close(&mut self) {
        if !matches!(self.state, State::Closed) {
            tracing::debug!(
                resolved = self.resolved_count(),
                blocks = self.block_count(),
                "decoder closed"
            );
        }
        self.state = State::Closed;
    }

    fn session(&self) -> Option<&Session> {
        match &self.state {
            State::Active(session) => Some(session),
            _ => None,
        }
    }

    fn finished_session(&self) -> Result<&Session, DecodeError> {
        match &self.state {
            State::Active(session) if session.is_finished() => Ok(session),
            State::Active(session) => Err(DecodeError::NotFinished {
                resolved: session.resolved_count,
                total: session.blocks.len(),
            }),
            State::Uninitialized => Err(DecodeError::NotFinished {
                resolved: 0,
                total: 0,
            }),
            State::Closed => Err(DecodeError::Closed),
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn log_initialized(params: &DecoderParams, source: &'static str) {
    tracing::debug!(
        nonce = format_args!("{:016x}", params.nonce),
        blocks = params.block_count(),
        frame_size = params.frame_size,
        total_length = params.total_length,
        source,
        "decoder initialized"
    );
}

impl Session {
    fn new(params: DecoderParams, options: &DecoderOptions) -> Result<Self, DecodeError> {
        if params.frame_size == 0 {
            return Err(DecodeError::InvalidParams("frame size must be positive"));
        }
        if params.total_length == 0 {
            return Err(DecodeError::InvalidParams("total length must be positive"));
        }
        if params.total_length > MAX_U48 {
            return Err(DecodeError::InvalidParams("total length exceeds 48 bits"));
        }
        if block_count(params.total_length, params.frame_size) > options.max_blocks as u64 {
            return Err(DecodeError::InvalidParams("block count above limit"));
        }
        let k = params.block_count();
        let neighbors = NeighborGenerator::with_soliton(params.nonce, k, &options.soliton)?;
        Ok(Self {
            params,
            neighbors,
            blocks: vec![None; k],
            resolved_count: 0,
            parked: HashMap::new(),
            pending: vec![BTreeSet::new(); k],
        })
    }

    fn is_finished(&self) -> bool {
        self.resolved_count == self.blocks.len()
    }

    /// Same-stream frames must match the established shape.
    fn check_frame(&self, frame: &Frame) -> Result<(), DecodeError> {
        if frame.frame_size() != self.params.frame_size {
            tracing::warn!(
                index = frame.frame_index(),
                expected = self.params.frame_size,
                got = frame.frame_size(),
                "frame size mismatch"
            );
            return Err(DecodeError::ParameterMismatch {
                field: "frame_size",
                expected: self.params.frame_size as u64,
                got: frame.frame_size() as u64,
            });
        }
        if frame.total_length() != self.params.total_length {
            tracing::warn!(
                index = frame.frame_index(),
                expected = self.params.total_length,
                got = frame.total_length(),
                "total length mismatch"
            );
            return Err(DecodeError::ParameterMismatch {
                field: "total_length",
                expected: self.params.total_length,
                got: frame.total_length(),
            });
        }
        Ok(())
    }

    /// Split neighbors against the current resolved set. Never cached: other
    /// frames may have resolved blocks since the last look.
    fn reduce(&self, neighbors: &[usize]) -> Reduction {
        let unknown: Vec<usize> = neighbors
            .iter()
            .copied()
            .filter(|&j| self.blocks[j].is_none())
            .collect();
        match unknown.as_slice() {
            [] => Reduction::Redundant,
            [j] => Reduction::Single(*j),
            _ => Reduction::Open(unknown),
        }
    }

    fn park(&mut self, index: u64, payload: Bytes, neighbors: Neighbors, unknown: &[usize]) {
        for &j in unknown {
            self.pending[j].insert(index);
        }
        self.parked.insert(index, ParkedFrame { payload, neighbors });
    }

    /// Remove a frame from every pending set it may still sit in.
    fn unpark(&mut self, index: u64) -> Option<ParkedFrame> {
        let frame = self.parked.remove(&index)?;
        for &j in frame.neighbors.iter() {
            self.pending[j].remove(&index);
        }
        Some(frame)
    }

    /// XOR the known neighbors out of `payload`; the remainder is block `j`.
    fn resolve(&mut self, j: usize, payload: &[u8], neighbors: &[usize]) {
        debug_assert!(self.blocks[j].is_none(), "block {j} resolved twice");
        let mut block = BytesMut::from(payload);
        for &i in neighbors {
            if i == j {
                continue;
            }
            if let Some(known) = &self.blocks[i] {
                xor_into(&mut block, known);
            }
        }
        self.blocks[j] = Some(block.freeze());
        self.resolved_count += 1;
        tracing::trace!(block = j, resolved = self.resolved_count, "block resolved");
    }

    /// Resolve `j`, then keep re-evaluating frames parked on newly resolved
    /// blocks until nothing changes. Returns the number of blocks resolved.
    fn resolve_and_cascade(&mut self, j: usize, payload: &[u8], neighbors: &[usize]) -> usize {
        self.resolve(j, payload, neighbors);
        let mut resolved = 1;

        let mut worklist: Vec<u64> = std::mem::take(&mut self.pending[j]).into_iter().collect();
        while let Some(index) = worklist.pop() {
            // A frame can be queued under several blocks; the first visit
            // that consumes it wins.
            let Some(neighbors) = self.parked.get(&index).map(|f| Arc::clone(&f.neighbors)) else {
                continue;
            };
            match self.reduce(&neighbors) {
                Reduction::Redundant => {
                    self.unpark(index);
                }
                Reduction::Single(next) => {
                    if let Some(frame) = self.unpark(index) {
                        self.resolve(next, &frame.payload, &frame.neighbors);
                        resolved += 1;
                        worklist.extend(std::mem::take(&mut self.pending[next]));
                    }
                }
                // Still registered under its remaining unknowns.
                Reduction::Open(_) => {}
            }
        }

        if resolved > 1 {
            tracing::debug!(
                root = j,
                resolved,
                total = self.resolved_count,
                "cascade resolved blocks"
            );
        }
        resolved
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),

    #[error("invalid decoder parameters: {0}")]
    InvalidParams(&'static str),

    #[error("{field} mismatch: stream has {expected}, frame has {got}")]
    ParameterMismatch {
        field: &'static str,
        expected: u64,
        got: u64,
    },

    #[error("decoding not finished: {resolved} of {total} blocks resolved")]
    NotFinished { resolved: usize, total: usize },

    #[error("decoder is closed")]
    Closed,

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Byte-stream view over decoded blocks.

use std::io::{self, Read, Seek, SeekFrom};

use bytes::Bytes;

/// `Read + Seek` over resolved blocks, ending at the original payload length.
/// Padding in the last block is never returned.
#[derive(Debug, Clone)]
pub struct DecodedReader {
    blocks: Vec<Bytes>,
    frame_size: usize,
    len: u64,
    pos: u64,
}

impl DecodedReader {
    /// All blocks share one size; the last may carry padding past `len`.
    pub(crate) fn new(blocks: Vec<Bytes>, len: u64) -> Self {
        let frame_size = blocks.first().map_or(0, Bytes::len);
        Self {
            blocks,
            frame_size,
            len,
            pos: 0,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes left before end of payload.
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }
}

impl Read for DecodedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() && self.pos < self.len {
            let block = (self.pos / self.frame_size as u64) as usize;
            let offset = (self.pos % self.frame_size as u64) as usize;
            let in_block = self.frame_size - offset;
            let n = in_block
                .min(buf.len() - written)
                .min(self.remaining() as usize);
            buf[written..written + n].copy_from_slice(&self.blocks[block][offset..offset + n]);
            written += n;
            self.pos += n as u64;
        }
        Ok(written)
    }
}

impl Seek for DecodedReader {
    /// Seeking past the end is allowed; reads there return 0.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match target {
            Some(n) => {
                self.pos = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of payload",
            )),
        }
    }
}

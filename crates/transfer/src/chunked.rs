use bytes::Bytes;
use drivedrop_drive::ByteRange;
use md5::{Digest, Md5};

use crate::DEFAULT_CHUNK_SIZE;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes MD5 of `data` and returns the hex-encoded digest.
///
/// MD5 is what the drive reports for stored content, so it is the only
/// digest that can be compared end to end.
pub fn checksum_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

// ---------------------------------------------------------------------------
// ChunkWindows
// ---------------------------------------------------------------------------

/// One window of a payload, ready to send.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub range: ByteRange,
    /// Shares the payload's allocation; slicing never copies.
    pub data: Bytes,
}

/// Cuts an in-memory payload into fixed-size windows.
pub struct ChunkWindows {
    data: Bytes,
    chunk_size: usize,
    offset: u64,
}

impl ChunkWindows {
    /// Prepares windows over `data`.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(data: Bytes, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            data,
            chunk_size,
            offset: 0,
        }
    }

    /// Moves to the given byte offset (for resume), clamped to the end.
    pub fn seek_to(&mut self, offset: u64) {
        self.offset = offset.min(self.total_size());
    }

    /// Returns the next window and advances past it. `None` at the end.
    pub fn next_chunk(&mut self) -> Option<Chunk> {
        let remaining = self.remaining();
        if remaining == 0 {
            return None;
        }

        let len = remaining.min(self.chunk_size as u64);
        let start = self.offset as usize;
        let data = self.data.slice(start..start + len as usize);
        let chunk = Chunk {
            range: ByteRange::new(self.offset, len, self.total_size()),
            data,
        };
        self.offset += len;
        Some(chunk)
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total payload size in bytes.
    pub fn total_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Bytes remaining after the current offset.
    pub fn remaining(&self) -> u64 {
        self.total_size() - self.offset
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of windows needed to send the whole payload from offset 0.
    pub fn window_count(&self) -> u64 {
        self.total_size().div_ceil(self.chunk_size as u64)
    }
}

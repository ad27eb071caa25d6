//! Chunked file transfer over resumable upload sessions.
//!
//! Small payloads go up in a single request; anything above the simple-upload
//! threshold opens a session and is sent in fixed-size windows until the
//! remote reports completion.

mod chunked;
mod session;
mod types;

use drivedrop_drive::StoreError;

pub use chunked::{Chunk, ChunkWindows, checksum_bytes};
pub use session::{ChunkedTransfer, TransferOptions};
pub use types::{TransferMode, TransferReceipt, TransferRequest, TransferSession, TransferState};

/// Default chunk size: 8 MiB (a multiple of the drive's 256 KiB granularity).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Payloads at or below this size skip the resumable session: 5 MiB.
pub const DEFAULT_SIMPLE_UPLOAD_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("session initiation failed: {0}")]
    SessionInit(#[source] StoreError),

    #[error("chunk upload failed with HTTP {status}: {body}")]
    ChunkUpload { status: u16, body: String },

    #[error("remote made no progress past offset {offset}")]
    Stalled { offset: u64 },

    #[error("remote acknowledged all {total} bytes without completing the upload")]
    Unfinished { total: u64 },

    #[error("checksum mismatch: local {local}, remote {remote}")]
    ChecksumMismatch { local: String, remote: String },

    #[error("remote store error: {0}")]
    Store(#[from] StoreError),

    #[error("cancelled")]
    Cancelled,
}

//! The remote store capability and the values crossing it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use drivedrop_protocol::RemoteEntry;

use crate::error::StoreError;

/// Boxed future returned by every [`RemoteStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Abstract client of the remote drive.
///
/// Every call is a single round trip; implementations never retry.
/// Using a trait keeps the engine decoupled from HTTP and testable with
/// [`MemoryStore`](crate::MemoryStore).
pub trait RemoteStore: Send + Sync {
    /// Lists entries directly under `parent_id`, optionally restricted to an
    /// exact name and/or to folders.
    fn list_entries<'a>(
        &'a self,
        parent_id: &'a str,
        name: Option<&'a str>,
        folders_only: bool,
    ) -> StoreFuture<'a, Vec<RemoteEntry>>;

    /// Creates a folder named `name` under `parent_id`.
    fn create_folder<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
    ) -> StoreFuture<'a, RemoteEntry>;

    /// Creates a file with its whole content in one request.
    fn create_file_simple<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
        content_type: &'a str,
        data: Bytes,
    ) -> StoreFuture<'a, RemoteEntry>;

    /// Opens a resumable upload session for a file of `total_size` bytes.
    ///
    /// A rejection by the remote is reported as [`StoreError::SessionInit`].
    fn begin_resumable_session<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
        content_type: &'a str,
        total_size: u64,
    ) -> StoreFuture<'a, SessionEndpoint>;

    /// Sends one chunk of a resumable session.
    ///
    /// `Err` is reserved for transport failures; any HTTP answer is mapped
    /// to a [`ChunkOutcome`].
    fn send_chunk<'a>(
        &'a self,
        session: &'a SessionEndpoint,
        range: ByteRange,
        data: Bytes,
    ) -> StoreFuture<'a, ChunkOutcome>;
}

/// Opaque upload URL of a resumable session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndpoint(String);

impl SessionEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Byte window of a chunk within a file of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset (inclusive).
    pub start: u64,
    /// Number of bytes in the window.
    pub len: u64,
    /// Total size of the file.
    pub total: u64,
}

impl ByteRange {
    pub fn new(start: u64, len: u64, total: u64) -> Self {
        Self { start, len, total }
    }

    /// Offset one past the last byte of the window.
    pub fn end(&self) -> u64 {
        self.start + self.len
    }

    /// Value of the `Content-Range` header: `bytes <start>-<end>/<total>`.
    pub fn content_range(&self) -> String {
        if self.len == 0 {
            return format!("bytes */{}", self.total);
        }
        format!("bytes {}-{}/{}", self.start, self.end() - 1, self.total)
    }
}

/// What the remote answered to one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// More bytes expected. `committed` is the offset the remote has
    /// persisted up to, when it told us.
    Continue { committed: Option<u64> },
    /// The file is complete and stored as this entry.
    Complete(RemoteEntry),
    /// Any other status; fatal for the session.
    Error { status: u16, body: String },
}

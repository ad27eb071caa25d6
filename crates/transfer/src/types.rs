use bytes::Bytes;
use drivedrop_drive::SessionEndpoint;
use drivedrop_protocol::RemoteEntry;

use crate::TransferError;
use crate::chunked::ChunkWindows;

/// Everything needed to put one file into one folder.
#[derive(Debug, Clone)]
pub struct TransferRequest<'a> {
    /// Name the remote entry will carry (already disambiguated).
    pub name: &'a str,
    pub parent_id: &'a str,
    pub content_type: &'a str,
    pub data: Bytes,
}

impl TransferRequest<'_> {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// How the bytes reached the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// One request carrying metadata and content.
    Simple,
    /// A resumable session; `chunks` is the number of chunk requests sent.
    Resumable { chunks: u32 },
}

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub file_id: String,
    pub file_name: String,
    pub size: u64,
    pub mode: TransferMode,
}

/// State of one open resumable session.
///
/// Created once the remote hands out an endpoint and dropped when the
/// transfer ends either way.
pub struct TransferSession {
    endpoint: SessionEndpoint,
    windows: ChunkWindows,
    acknowledged: u64,
    chunks_sent: u32,
}

impl TransferSession {
    pub fn new(endpoint: SessionEndpoint, data: Bytes, chunk_size: usize) -> Self {
        Self {
            endpoint,
            windows: ChunkWindows::new(data, chunk_size),
            acknowledged: 0,
            chunks_sent: 0,
        }
    }

    pub fn endpoint(&self) -> &SessionEndpoint {
        &self.endpoint
    }

    /// Bytes the remote has confirmed so far.
    pub fn acknowledged(&self) -> u64 {
        self.acknowledged
    }

    pub fn total_size(&self) -> u64 {
        self.windows.total_size()
    }

    pub fn chunk_size(&self) -> usize {
        self.windows.chunk_size()
    }

    /// Chunk requests needed when the remote keeps every window whole.
    pub fn expected_chunks(&self) -> u64 {
        self.windows.window_count()
    }

    pub fn chunks_sent(&self) -> u32 {
        self.chunks_sent
    }

    pub(crate) fn windows_mut(&mut self) -> &mut ChunkWindows {
        &mut self.windows
    }

    pub(crate) fn record_send(&mut self) {
        self.chunks_sent += 1;
    }

    /// Records that the remote holds everything before `offset` and makes
    /// the next window start there.
    pub(crate) fn acknowledge(&mut self, offset: u64) {
        self.acknowledged = offset;
        self.windows.seek_to(offset);
    }
}

/// Resumable transfer state machine.
pub enum TransferState {
    Initiating,
    Transferring(TransferSession),
    Completed { entry: RemoteEntry, chunks: u32 },
    Failed(TransferError),
}

impl TransferState {
    pub fn name(&self) -> &'static str {
        match self {
            TransferState::Initiating => "initiating",
            TransferState::Transferring(_) => "transferring",
            TransferState::Completed { .. } => "completed",
            TransferState::Failed(_) => "failed",
        }
    }
}

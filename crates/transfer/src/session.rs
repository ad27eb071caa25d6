//! Transfer driver: picks simple or resumable upload and runs the session
//! state machine to completion.

use drivedrop_drive::{ChunkOutcome, RemoteStore, StoreError};
use drivedrop_protocol::RemoteEntry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::chunked::checksum_bytes;
use crate::types::{TransferMode, TransferReceipt, TransferRequest, TransferSession, TransferState};
use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_SIMPLE_UPLOAD_THRESHOLD, TransferError};

/// Tunables of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Bytes per chunk request. 0 means [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: usize,
    /// Payloads at or below this size use a single request.
    pub simple_upload_threshold: u64,
    /// Compare the remote MD5 (when reported) against the local one.
    pub verify_checksum: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            simple_upload_threshold: DEFAULT_SIMPLE_UPLOAD_THRESHOLD,
            verify_checksum: true,
        }
    }
}

/// Uploads single files to a [`RemoteStore`].
pub struct ChunkedTransfer<'a> {
    store: &'a dyn RemoteStore,
    options: TransferOptions,
    cancel: CancellationToken,
}

impl<'a> ChunkedTransfer<'a> {
    pub fn new(store: &'a dyn RemoteStore, options: TransferOptions) -> Self {
        Self {
            store,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to abort between chunks.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Uploads one file and returns where it landed.
    ///
    /// Nothing is retried: a failed request fails the whole file.
    pub async fn upload(&self, req: &TransferRequest<'_>) -> Result<TransferReceipt, TransferError> {
        self.check_cancelled()?;

        let size = req.size();
        let (entry, mode) = if size <= self.options.simple_upload_threshold {
            let entry = self
                .store
                .create_file_simple(req.name, req.parent_id, req.content_type, req.data.clone())
                .await?;
            (entry, TransferMode::Simple)
        } else {
            let (entry, chunks) = self.upload_resumable(req).await?;
            (entry, TransferMode::Resumable { chunks })
        };

        self.verify(req, &entry)?;

        info!(
            file = %req.name,
            id = %entry.id,
            bytes = size,
            mode = ?mode,
            "file uploaded"
        );

        Ok(TransferReceipt {
            file_id: entry.id,
            file_name: req.name.to_string(),
            size,
            mode,
        })
    }

    /// Drives `Initiating -> Transferring -> Completed` (or `Failed`).
    async fn upload_resumable(
        &self,
        req: &TransferRequest<'_>,
    ) -> Result<(RemoteEntry, u32), TransferError> {
        let mut state = TransferState::Initiating;

        loop {
            trace!(file = %req.name, state = state.name(), "transfer step");
            state = match state {
                TransferState::Initiating => self.initiate(req).await,
                TransferState::Transferring(session) => self.send_next(session).await,
                TransferState::Completed { entry, chunks } => return Ok((entry, chunks)),
                TransferState::Failed(e) => {
                    warn!(file = %req.name, error = %e, "resumable upload failed");
                    return Err(e);
                }
            };
        }
    }

    async fn initiate(&self, req: &TransferRequest<'_>) -> TransferState {
        let result = self
            .store
            .begin_resumable_session(req.name, req.parent_id, req.content_type, req.size())
            .await;

        match result {
            Ok(endpoint) => {
                let session =
                    TransferSession::new(endpoint, req.data.clone(), self.options.chunk_size);
                debug!(
                    file = %req.name,
                    total_bytes = session.total_size(),
                    chunk_size = session.chunk_size(),
                    chunks = session.expected_chunks(),
                    "resumable session opened"
                );
                TransferState::Transferring(session)
            }
            Err(e @ StoreError::SessionInit(_)) => {
                TransferState::Failed(TransferError::SessionInit(e))
            }
            Err(e) => TransferState::Failed(TransferError::Store(e)),
        }
    }

    /// Sends one window and decides the next state from the answer.
    async fn send_next(&self, mut session: TransferSession) -> TransferState {
        if let Err(e) = self.check_cancelled() {
            return TransferState::Failed(e);
        }

        let Some(chunk) = session.windows_mut().next_chunk() else {
            return TransferState::Failed(TransferError::Unfinished {
                total: session.total_size(),
            });
        };
        let range = chunk.range;
        session.record_send();

        let outcome = match self
            .store
            .send_chunk(session.endpoint(), range, chunk.data)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return TransferState::Failed(TransferError::Store(e)),
        };

        match outcome {
            ChunkOutcome::Continue { committed } => {
                // Without a committed range the whole window counts as received.
                let next = committed.unwrap_or(range.end()).min(range.end());
                if next <= range.start {
                    return TransferState::Failed(TransferError::Stalled {
                        offset: range.start,
                    });
                }
                session.acknowledge(next);
                debug!(
                    chunk = session.chunks_sent(),
                    range = %range.content_range(),
                    acknowledged = session.acknowledged(),
                    "chunk accepted"
                );
                TransferState::Transferring(session)
            }
            ChunkOutcome::Complete(entry) => {
                debug!(chunks = session.chunks_sent(), "session complete");
                TransferState::Completed {
                    entry,
                    chunks: session.chunks_sent(),
                }
            }
            ChunkOutcome::Error { status, body } => {
                TransferState::Failed(TransferError::ChunkUpload { status, body })
            }
        }
    }

    fn verify(&self, req: &TransferRequest<'_>, entry: &RemoteEntry) -> Result<(), TransferError> {
        if !self.options.verify_checksum {
            return Ok(());
        }
        let Some(remote) = entry.md5_checksum.as_deref() else {
            return Ok(());
        };
        let local = checksum_bytes(&req.data);
        if !local.eq_ignore_ascii_case(remote) {
            return Err(TransferError::ChecksumMismatch {
                local,
                remote: remote.to_string(),
            });
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            Err(TransferError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use drivedrop_drive::{ByteRange, MemoryStore, SessionEndpoint, StoreFuture};

    use super::*;

    fn options(chunk_size: usize, threshold: u64) -> TransferOptions {
        TransferOptions {
            chunk_size,
            simple_upload_threshold: threshold,
            verify_checksum: true,
        }
    }

    fn request<'a>(name: &'a str, data: &'static [u8]) -> TransferRequest<'a> {
        TransferRequest {
            name,
            parent_id: "root",
            content_type: "application/octet-stream",
            data: Bytes::from_static(data),
        }
    }

    /// Store answering chunks from a script.
    struct ScriptedStore {
        answers: Mutex<Vec<ChunkOutcome>>,
        sent: Mutex<Vec<ByteRange>>,
    }

    impl ScriptedStore {
        fn new(mut answers: Vec<ChunkOutcome>) -> Self {
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl RemoteStore for ScriptedStore {
        fn list_entries<'a>(
            &'a self,
            _parent_id: &'a str,
            _name: Option<&'a str>,
            _folders_only: bool,
        ) -> StoreFuture<'a, Vec<RemoteEntry>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn create_folder<'a>(
            &'a self,
            _name: &'a str,
            _parent_id: &'a str,
        ) -> StoreFuture<'a, RemoteEntry> {
            Box::pin(async { Err(StoreError::Unavailable("not scripted".into())) })
        }

        fn create_file_simple<'a>(
            &'a self,
            _name: &'a str,
            _parent_id: &'a str,
            _content_type: &'a str,
            _data: Bytes,
        ) -> StoreFuture<'a, RemoteEntry> {
            Box::pin(async { Err(StoreError::Unavailable("not scripted".into())) })
        }

        fn begin_resumable_session<'a>(
            &'a self,
            _name: &'a str,
            _parent_id: &'a str,
            _content_type: &'a str,
            _total_size: u64,
        ) -> StoreFuture<'a, SessionEndpoint> {
            Box::pin(async { Ok(SessionEndpoint::new("scripted://session")) })
        }

        fn send_chunk<'a>(
            &'a self,
            _session: &'a SessionEndpoint,
            range: ByteRange,
            _data: Bytes,
        ) -> StoreFuture<'a, ChunkOutcome> {
            self.sent.lock().unwrap().push(range);
            let answer = self.answers.lock().unwrap().pop();
            Box::pin(async move {
                answer.ok_or_else(|| StoreError::Unavailable("script exhausted".into()))
            })
        }
    }

    #[tokio::test]
    async fn small_payload_uses_simple_upload() {
        let store = MemoryStore::new();
        let transfer = ChunkedTransfer::new(&store, options(4, 16));

        let receipt = transfer.upload(&request("a.txt", b"hello")).await.unwrap();
        assert_eq!(receipt.mode, TransferMode::Simple);
        assert_eq!(receipt.size, 5);
        assert_eq!(receipt.file_name, "a.txt");

        let calls = store.calls();
        assert_eq!(calls.simple_uploads, 1);
        assert_eq!(calls.sessions_opened, 0);
        assert_eq!(store.content(&receipt.file_id).unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn payload_at_threshold_stays_simple() {
        let store = MemoryStore::new();
        let transfer = ChunkedTransfer::new(&store, options(4, 5));

        let receipt = transfer.upload(&request("a.txt", b"hello")).await.unwrap();
        assert_eq!(receipt.mode, TransferMode::Simple);
        assert_eq!(store.calls().sessions_opened, 0);
    }

    #[tokio::test]
    async fn large_payload_sends_ceil_chunks() {
        let store = MemoryStore::new();
        let transfer = ChunkedTransfer::new(&store, options(4, 5));

        let receipt = transfer
            .upload(&request("video.mp4", b"0123456789"))
            .await
            .unwrap();
        assert_eq!(receipt.mode, TransferMode::Resumable { chunks: 3 });

        let calls = store.calls();
        assert_eq!(calls.sessions_opened, 1);
        assert_eq!(calls.simple_uploads, 0);
        assert_eq!(
            calls.chunks,
            vec![
                ByteRange::new(0, 4, 10),
                ByteRange::new(4, 4, 10),
                ByteRange::new(8, 2, 10),
            ]
        );
        assert_eq!(
            store.content(&receipt.file_id).unwrap(),
            Bytes::from_static(b"0123456789")
        );
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn missing_committed_range_advances_to_window_end() {
        let store = MemoryStore::new();
        store.omit_committed_range(true);
        let transfer = ChunkedTransfer::new(&store, options(4, 5));

        let receipt = transfer
            .upload(&request("video.mp4", b"0123456789"))
            .await
            .unwrap();
        assert_eq!(receipt.mode, TransferMode::Resumable { chunks: 3 });
    }

    #[tokio::test]
    async fn short_commit_resends_from_committed_offset() {
        let store = MemoryStore::new();
        store.limit_chunk_commit("video.mp4", 3);
        let transfer = ChunkedTransfer::new(&store, options(4, 5));

        let receipt = transfer
            .upload(&request("video.mp4", b"0123456789"))
            .await
            .unwrap();

        let starts: Vec<u64> = store.calls().chunks.iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0, 3, 6, 9]);
        assert_eq!(receipt.mode, TransferMode::Resumable { chunks: 4 });
        assert_eq!(
            store.content(&receipt.file_id).unwrap(),
            Bytes::from_static(b"0123456789")
        );
    }

    #[tokio::test]
    async fn rejected_session_is_session_init_error() {
        let store = MemoryStore::new();
        store.reject_session_for("video.mp4");
        let transfer = ChunkedTransfer::new(&store, options(4, 5));

        let err = transfer
            .upload(&request("video.mp4", b"0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::SessionInit(_)));
        assert!(store.calls().chunks.is_empty());
    }

    #[tokio::test]
    async fn chunk_error_fails_transfer() {
        let store = MemoryStore::new();
        store.fail_chunks_for("video.mp4", 500);
        let transfer = ChunkedTransfer::new(&store, options(4, 5));

        let err = transfer
            .upload(&request("video.mp4", b"0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::ChunkUpload { status: 500, .. }));
        // No retry after a fatal answer.
        assert_eq!(store.calls().chunks.len(), 1);
    }

    #[tokio::test]
    async fn checksum_mismatch_fails_file() {
        let store = MemoryStore::new();
        store.corrupt_checksum_for("a.txt");
        let transfer = ChunkedTransfer::new(&store, options(4, 16));

        let err = transfer.upload(&request("a.txt", b"hello")).await.unwrap_err();
        assert!(matches!(err, TransferError::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn checksum_not_verified_when_disabled() {
        let store = MemoryStore::new();
        store.corrupt_checksum_for("a.txt");
        let mut opts = options(4, 16);
        opts.verify_checksum = false;
        let transfer = ChunkedTransfer::new(&store, opts);

        assert!(transfer.upload(&request("a.txt", b"hello")).await.is_ok());
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let transfer = ChunkedTransfer::new(&store, options(4, 5)).with_cancel(cancel);

        let err = transfer
            .upload(&request("video.mp4", b"0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
        assert_eq!(store.calls().sessions_opened, 0);
    }

    #[tokio::test]
    async fn zero_progress_is_stalled() {
        let store = ScriptedStore::new(vec![ChunkOutcome::Continue { committed: Some(0) }]);
        let transfer = ChunkedTransfer::new(&store, options(4, 5));

        let err = transfer
            .upload(&request("video.mp4", b"0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Stalled { offset: 0 }));
    }

    #[tokio::test]
    async fn continue_after_last_byte_is_unfinished() {
        let store = ScriptedStore::new(vec![
            ChunkOutcome::Continue { committed: None },
            ChunkOutcome::Continue { committed: None },
            ChunkOutcome::Continue { committed: None },
        ]);
        let transfer = ChunkedTransfer::new(&store, options(4, 5));

        let err = transfer
            .upload(&request("video.mp4", b"0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Unfinished { total: 10 }));
        assert_eq!(store.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn transport_error_during_chunk() {
        let store = ScriptedStore::new(Vec::new());
        let transfer = ChunkedTransfer::new(&store, options(4, 5));

        let err = transfer
            .upload(&request("video.mp4", b"0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Store(StoreError::Unavailable(_))));
    }
}

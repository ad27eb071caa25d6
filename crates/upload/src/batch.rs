//! Batch upload driver.
//!
//! Runs a validated batch one file at a time, in input order, and reports
//! one outcome per file. A failing file never stops its siblings.
//!
//! Naming and transfer of a file run under the lock of its name family in
//! the target folder, so concurrent batches in one process never pick the
//! same final name.

use drivedrop_drive::RemoteStore;
use drivedrop_protocol::{BatchResult, UploadOutcome};
use drivedrop_transfer::{ChunkedTransfer, TransferRequest};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::error::UploadError;
use crate::locks::ResolveLocks;
use crate::naming::{NameDisambiguator, name_family};
use crate::types::IncomingFile;
use crate::validation::validate_batch;

/// Uploads batches of files into one folder.
pub struct BatchUploader<'a> {
    store: &'a dyn RemoteStore,
    config: &'a EngineConfig,
    locks: &'a ResolveLocks,
    cancel: CancellationToken,
}

impl<'a> BatchUploader<'a> {
    /// Creates an uploader. Uploaders sharing `locks` never race on names.
    pub fn new(
        store: &'a dyn RemoteStore,
        config: &'a EngineConfig,
        locks: &'a ResolveLocks,
    ) -> Self {
        Self {
            store,
            config,
            locks,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to stop before the next file or chunk.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Uploads `files` into `folder_id`.
    ///
    /// Returns `Err` only when the batch as a whole is rejected, before any
    /// transfer. Otherwise every file gets an outcome, in input order; once
    /// cancelled, the current and all remaining files fail with "cancelled".
    pub async fn upload_batch(
        &self,
        files: &[IncomingFile],
        folder_id: &str,
    ) -> Result<BatchResult, UploadError> {
        let names = validate_batch(files, folder_id, self.config)?;
        let folder_id = folder_id.trim();

        let mut outcomes = Vec::with_capacity(files.len());
        for (file, name) in files.iter().zip(&names) {
            if self.cancel.is_cancelled() {
                let err = UploadError::Cancelled.to_string();
                outcomes.push(UploadOutcome::failed(&file.name, name, err, file.size));
                continue;
            }
            outcomes.push(self.upload_one(file, name, folder_id).await);
        }

        let result = BatchResult::from_outcomes(outcomes);
        info!(
            folder = %folder_id,
            total = result.total,
            successful = result.successful,
            failed = result.failed,
            "batch finished"
        );
        Ok(result)
    }

    async fn upload_one(&self, file: &IncomingFile, name: &str, folder_id: &str) -> UploadOutcome {
        // Held until the entry exists, so the next flow sees it when checking.
        let _guard = self.locks.acquire(folder_id, &name_family(name)).await;

        let resolved = NameDisambiguator::new(self.store)
            .unique_name(name, folder_id)
            .await;

        let transfer = ChunkedTransfer::new(self.store, self.config.transfer_options())
            .with_cancel(self.cancel.clone());
        let req = TransferRequest {
            name: &resolved,
            parent_id: folder_id,
            content_type: &file.content_type,
            data: file.data.clone(),
        };

        match transfer.upload(&req).await {
            Ok(receipt) => {
                UploadOutcome::succeeded(&file.name, &resolved, receipt.file_id, receipt.size)
            }
            Err(e) => {
                let err = UploadError::from(e).to_string();
                error!(file = %file.name, name = %resolved, error = %err, "upload failed");
                UploadOutcome::failed(&file.name, &resolved, err, file.size)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use drivedrop_drive::MemoryStore;

    use super::*;

    fn config() -> EngineConfig {
        EngineConfig {
            // Anything above 4 bytes goes through a resumable session.
            simple_upload_threshold: 4,
            chunk_size: 4,
            ..EngineConfig::default()
        }
    }

    fn file(name: &str, data: &'static [u8]) -> IncomingFile {
        IncomingFile::new(name, "application/octet-stream", Bytes::from_static(data))
    }

    #[tokio::test]
    async fn uploads_every_file_in_order() {
        let store = MemoryStore::new();
        let locks = ResolveLocks::new();
        let config = config();
        let uploader = BatchUploader::new(&store, &config, &locks);
        let files = vec![file("a.txt", b"abc"), file("b.mp4", b"0123456789")];

        let result = uploader.upload_batch(&files, "d1").await.unwrap();
        assert!(result.success);
        assert_eq!(result.total, 2);
        assert_eq!(result.successful, 2);
        assert_eq!(result.files[0].original_name, "a.txt");
        assert_eq!(result.files[1].original_name, "b.mp4");
        assert_eq!(result.files[1].size, 10);

        let id = result.files[1].file_id.as_deref().unwrap();
        assert_eq!(store.content(id).unwrap(), Bytes::from_static(b"0123456789"));
        assert_eq!(store.calls().simple_uploads, 1);
        assert_eq!(store.calls().sessions_opened, 1);
    }

    #[tokio::test]
    async fn failing_file_does_not_abort_siblings() {
        let store = MemoryStore::new();
        let locks = ResolveLocks::new();
        store.fail_chunks_for("two.mp4", 500);
        let config = config();
        let uploader = BatchUploader::new(&store, &config, &locks);
        let files = vec![
            file("one.mp4", b"0123456789"),
            file("two.mp4", b"0123456789"),
            file("three.mp4", b"0123456789"),
        ];

        let result = uploader.upload_batch(&files, "d1").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.total, 3);
        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 1);

        assert!(result.files[0].success);
        assert!(result.files[0].file_id.is_some());
        assert!(!result.files[1].success);
        assert!(result.files[1].file_id.is_none());
        assert!(result.files[1].error.as_deref().unwrap().contains("500"));
        assert!(result.files[2].success);
        assert!(result.files[2].file_id.is_some());
    }

    #[tokio::test]
    async fn oversized_batch_fails_before_any_transfer() {
        let store = MemoryStore::new();
        let locks = ResolveLocks::new();
        let config = EngineConfig {
            max_total_size: 15,
            ..config()
        };
        let uploader = BatchUploader::new(&store, &config, &locks);
        let files = vec![file("a.bin", b"0123456789"), file("b.bin", b"0123456789")];

        let err = uploader.upload_batch(&files, "d1").await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
        assert_eq!(store.calls(), Default::default());
    }

    #[tokio::test]
    async fn same_name_twice_gets_distinct_names() {
        let store = MemoryStore::new();
        let locks = ResolveLocks::new();
        let config = config();
        let uploader = BatchUploader::new(&store, &config, &locks);
        let files = vec![file("report.pdf", b"v1"), file("report.pdf", b"v2")];

        let result = uploader.upload_batch(&files, "d1").await.unwrap();
        assert_eq!(result.files[0].file_name, "report.pdf");
        assert_eq!(result.files[1].file_name, "report(1).pdf");

        let again = uploader
            .upload_batch(&[file("report.pdf", b"v3")], "d1")
            .await
            .unwrap();
        assert_eq!(again.files[0].file_name, "report(2).pdf");

        let mut names: Vec<String> = store.children("d1").into_iter().map(|e| e.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[tokio::test]
    async fn path_components_are_stripped_from_names() {
        let store = MemoryStore::new();
        let locks = ResolveLocks::new();
        let config = config();
        let uploader = BatchUploader::new(&store, &config, &locks);

        let result = uploader
            .upload_batch(&[file("../secret/a.txt", b"abc")], "d1")
            .await
            .unwrap();
        assert_eq!(result.files[0].original_name, "../secret/a.txt");
        assert_eq!(result.files[0].file_name, "a.txt");
    }

    #[tokio::test]
    async fn cancelled_batch_reports_every_file() {
        let store = MemoryStore::new();
        let locks = ResolveLocks::new();
        let config = config();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let uploader = BatchUploader::new(&store, &config, &locks).with_cancel(cancel);
        let files = vec![file("a.txt", b"abc"), file("b.txt", b"abc")];

        let result = uploader.upload_batch(&files, "d1").await.unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.failed, 2);
        assert!(result
            .files
            .iter()
            .all(|f| f.error.as_deref() == Some("cancelled")));
        assert_eq!(store.calls().simple_uploads, 0);
    }

    #[tokio::test]
    async fn session_rejection_is_per_file() {
        let store = MemoryStore::new();
        let locks = ResolveLocks::new();
        store.reject_session_for("big.mp4");
        let config = config();
        let uploader = BatchUploader::new(&store, &config, &locks);
        let files = vec![file("big.mp4", b"0123456789"), file("small.txt", b"ok")];

        let result = uploader.upload_batch(&files, "d1").await.unwrap();
        assert!(!result.files[0].success);
        assert!(result.files[0]
            .error
            .as_deref()
            .unwrap()
            .contains("session initiation failed"));
        assert!(result.files[1].success);
    }

    #[tokio::test]
    async fn name_check_failure_keeps_original_name() {
        let store = MemoryStore::new();
        let locks = ResolveLocks::new();
        store.fail_listing(true);
        let config = config();
        let uploader = BatchUploader::new(&store, &config, &locks);

        let result = uploader
            .upload_batch(&[file("a.txt", b"abc")], "d1")
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.files[0].file_name, "a.txt");
    }
}

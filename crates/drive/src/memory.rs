//! In-process remote store.
//!
//! Keeps a flat list of entries with parent links, honors the resumable
//! session protocol (ordered byte windows, 308-style continuation) and lets
//! callers inject faults per operation or per file name. Used by tests.

use std::collections::{HashMap, HashSet};
use std::future::ready;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use drivedrop_protocol::constants::FOLDER_MIME_TYPE;
use drivedrop_protocol::RemoteEntry;
use md5::{Digest, Md5};

use crate::error::StoreError;
use crate::store::{ByteRange, ChunkOutcome, RemoteStore, SessionEndpoint, StoreFuture};

/// Counters of the calls a [`MemoryStore`] has served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub lists: usize,
    pub folders_created: usize,
    pub simple_uploads: usize,
    pub sessions_opened: usize,
    /// Every chunk range received, in arrival order.
    pub chunks: Vec<ByteRange>,
}

/// Remote store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<StoredEntry>,
    sessions: HashMap<String, PendingSession>,
    next_id: u64,
    faults: Faults,
    calls: CallLog,
}

struct StoredEntry {
    entry: RemoteEntry,
    parent: String,
    data: Bytes,
}

struct PendingSession {
    name: String,
    parent: String,
    content_type: String,
    total: u64,
    received: Vec<u8>,
}

#[derive(Default)]
struct Faults {
    credentials_expired: bool,
    listing_unavailable: bool,
    folder_creation_unavailable: bool,
    omit_committed_range: bool,
    rejected_sessions: HashSet<String>,
    chunk_failures: HashMap<String, u16>,
    commit_limits: HashMap<String, usize>,
    corrupt_checksums: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -----------------------------------------------------------------------
    // Seeding and inspection
    // -----------------------------------------------------------------------

    /// Adds a folder without counting it as a call. Returns its id.
    pub fn insert_folder(&self, parent_id: &str, name: &str) -> String {
        let mut inner = self.lock();
        inner.store_entry(parent_id, name, FOLDER_MIME_TYPE, Bytes::new()).id
    }

    /// Adds a file without counting it as a call. Returns its id.
    pub fn insert_file(&self, parent_id: &str, name: &str, data: &[u8]) -> String {
        let mut inner = self.lock();
        let data = Bytes::copy_from_slice(data);
        inner
            .store_entry(parent_id, name, "application/octet-stream", data)
            .id
    }

    /// Entries directly under `parent_id`, in creation order.
    pub fn children(&self, parent_id: &str) -> Vec<RemoteEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.parent == parent_id)
            .map(|e| e.entry.clone())
            .collect()
    }

    /// Stored content of a file entry.
    pub fn content(&self, id: &str) -> Option<Bytes> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.entry.id == id)
            .map(|e| e.data.clone())
    }

    /// Number of resumable sessions opened but not completed.
    pub fn open_sessions(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn calls(&self) -> CallLog {
        self.lock().calls.clone()
    }

    // -----------------------------------------------------------------------
    // Fault injection
    // -----------------------------------------------------------------------

    /// Every call fails with 401 from now on.
    pub fn expire_credentials(&self) {
        self.lock().faults.credentials_expired = true;
    }

    /// List calls fail with a transport error.
    pub fn fail_listing(&self, fail: bool) {
        self.lock().faults.listing_unavailable = fail;
    }

    /// Folder creation fails with a transport error.
    pub fn fail_folder_creation(&self, fail: bool) {
        self.lock().faults.folder_creation_unavailable = fail;
    }

    /// Opening a session for a file named `name` is refused.
    pub fn reject_session_for(&self, name: &str) {
        self.lock().faults.rejected_sessions.insert(name.to_string());
    }

    /// Chunks of a file named `name` are answered with `status`.
    pub fn fail_chunks_for(&self, name: &str, status: u16) {
        self.lock().faults.chunk_failures.insert(name.to_string(), status);
    }

    /// Persists at most `max_bytes` of each chunk of a file named `name`,
    /// reporting the shorter committed range back.
    pub fn limit_chunk_commit(&self, name: &str, max_bytes: usize) {
        self.lock().faults.commit_limits.insert(name.to_string(), max_bytes);
    }

    /// Continuation answers carry no committed range.
    pub fn omit_committed_range(&self, omit: bool) {
        self.lock().faults.omit_committed_range = omit;
    }

    /// Reports a wrong MD5 for a file named `name` once stored.
    pub fn corrupt_checksum_for(&self, name: &str) {
        self.lock().faults.corrupt_checksums.insert(name.to_string());
    }
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn store_entry(
        &mut self,
        parent: &str,
        name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> RemoteEntry {
        let id = self.next_id("mem");
        let is_folder = mime_type == FOLDER_MIME_TYPE;
        let md5_checksum = if is_folder {
            None
        } else if self.faults.corrupt_checksums.contains(name) {
            Some("00000000000000000000000000000000".to_string())
        } else {
            Some(hex::encode(Md5::digest(&data)))
        };
        let entry = RemoteEntry {
            id,
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: (!is_folder).then_some(data.len() as u64),
            md5_checksum,
        };
        self.entries.push(StoredEntry {
            entry: entry.clone(),
            parent: parent.to_string(),
            data,
        });
        entry
    }

    fn check_credentials(&self) -> Result<(), StoreError> {
        if self.faults.credentials_expired {
            return Err(StoreError::Auth { status: 401 });
        }
        Ok(())
    }

    fn list(
        &mut self,
        parent: &str,
        name: Option<&str>,
        folders_only: bool,
    ) -> Result<Vec<RemoteEntry>, StoreError> {
        self.check_credentials()?;
        self.calls.lists += 1;
        if self.faults.listing_unavailable {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        Ok(self
            .entries
            .iter()
            .filter(|e| e.parent == parent)
            .filter(|e| name.is_none_or(|n| e.entry.name == n))
            .filter(|e| !folders_only || e.entry.is_folder())
            .map(|e| e.entry.clone())
            .collect())
    }

    fn mkdir(&mut self, name: &str, parent: &str) -> Result<RemoteEntry, StoreError> {
        self.check_credentials()?;
        if self.faults.folder_creation_unavailable {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.calls.folders_created += 1;
        Ok(self.store_entry(parent, name, FOLDER_MIME_TYPE, Bytes::new()))
    }

    fn upload_simple(
        &mut self,
        name: &str,
        parent: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<RemoteEntry, StoreError> {
        self.check_credentials()?;
        self.calls.simple_uploads += 1;
        Ok(self.store_entry(parent, name, content_type, data))
    }

    fn open_session(
        &mut self,
        name: &str,
        parent: &str,
        content_type: &str,
        total: u64,
    ) -> Result<SessionEndpoint, StoreError> {
        self.check_credentials()?;
        if self.faults.rejected_sessions.contains(name) {
            return Err(StoreError::SessionInit("HTTP 403: storageQuotaExceeded".into()));
        }
        self.calls.sessions_opened += 1;
        let id = self.next_id("session");
        self.sessions.insert(
            id.clone(),
            PendingSession {
                name: name.to_string(),
                parent: parent.to_string(),
                content_type: content_type.to_string(),
                total,
                received: Vec::new(),
            },
        );
        Ok(SessionEndpoint::new(format!("memory://upload/{id}")))
    }

    fn put_chunk(
        &mut self,
        session: &SessionEndpoint,
        range: ByteRange,
        data: Bytes,
    ) -> Result<ChunkOutcome, StoreError> {
        self.calls.chunks.push(range);
        let id = session.as_str().trim_start_matches("memory://upload/").to_string();

        let Some(pending) = self.sessions.get_mut(&id) else {
            return Ok(ChunkOutcome::Error {
                status: 404,
                body: "no such upload session".into(),
            });
        };
        if let Some(&status) = self.faults.chunk_failures.get(&pending.name) {
            return Ok(ChunkOutcome::Error {
                status,
                body: "injected failure".into(),
            });
        }
        if range.start != pending.received.len() as u64
            || range.len != data.len() as u64
            || range.total != pending.total
        {
            return Ok(ChunkOutcome::Error {
                status: 400,
                body: format!("unexpected range {}", range.content_range()),
            });
        }

        let keep = self
            .faults
            .commit_limits
            .get(&pending.name)
            .map_or(data.len(), |&limit| limit.min(data.len()));
        pending.received.extend_from_slice(&data[..keep]);

        if pending.received.len() as u64 >= pending.total
            && let Some(done) = self.sessions.remove(&id)
        {
            let entry = self.store_entry(
                &done.parent,
                &done.name,
                &done.content_type,
                Bytes::from(done.received),
            );
            return Ok(ChunkOutcome::Complete(entry));
        }

        let received = self.sessions.get(&id).map_or(0, |p| p.received.len() as u64);
        let committed = (!self.faults.omit_committed_range).then_some(received);
        Ok(ChunkOutcome::Continue { committed })
    }
}

impl RemoteStore for MemoryStore {
    fn list_entries<'a>(
        &'a self,
        parent_id: &'a str,
        name: Option<&'a str>,
        folders_only: bool,
    ) -> StoreFuture<'a, Vec<RemoteEntry>> {
        let result = self.lock().list(parent_id, name, folders_only);
        Box::pin(ready(result))
    }

    fn create_folder<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
    ) -> StoreFuture<'a, RemoteEntry> {
        let result = self.lock().mkdir(name, parent_id);
        Box::pin(ready(result))
    }

    fn create_file_simple<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
        content_type: &'a str,
        data: Bytes,
    ) -> StoreFuture<'a, RemoteEntry> {
        let result = self.lock().upload_simple(name, parent_id, content_type, data);
        Box::pin(ready(result))
    }

    fn begin_resumable_session<'a>(
        &'a self,
        name: &'a str,
        parent_id: &'a str,
        content_type: &'a str,
        total_size: u64,
    ) -> StoreFuture<'a, SessionEndpoint> {
        let result = self.lock().open_session(name, parent_id, content_type, total_size);
        Box::pin(ready(result))
    }

    fn send_chunk<'a>(
        &'a self,
        session: &'a SessionEndpoint,
        range: ByteRange,
        data: Bytes,
    ) -> StoreFuture<'a, ChunkOutcome> {
        let result = self.lock().put_chunk(session, range, data);
        Box::pin(ready(result))
    }
}

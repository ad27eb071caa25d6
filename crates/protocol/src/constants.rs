/// MIME type the drive uses to mark an entry as a folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type used when the client did not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Base URL for metadata calls (list, folder creation).
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for content calls (simple and resumable uploads).
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Status the drive answers a non-final chunk with ("Resume Incomplete").
pub const RESUME_INCOMPLETE: u16 = 308;

/// Every non-final chunk of a resumable session must be a multiple of this.
pub const CHUNK_GRANULARITY: usize = 256 * 1024;

/// Resource fields requested on every call that returns an entry.
pub const ENTRY_FIELDS: &str = "id,name,mimeType,size,md5Checksum";

//! Data types for the upload flow.

use bytes::Bytes;
use drivedrop_protocol::constants::DEFAULT_CONTENT_TYPE;

/// A file handed to the engine by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    /// Client-supplied original name.
    pub name: String,
    pub content_type: String,
    /// Size announced by the client; checked against the payload before any
    /// transfer starts.
    pub size: u64,
    pub data: Bytes,
}

impl IncomingFile {
    /// Creates a file whose declared size is its payload length.
    ///
    /// An empty content type falls back to `application/octet-stream`.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        let size = data.len() as u64;
        Self::with_declared_size(name, content_type, size, data)
    }

    /// Creates a file with an explicitly declared size.
    pub fn with_declared_size(
        name: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
        data: Bytes,
    ) -> Self {
        let content_type = content_type.into();
        let content_type = if content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            content_type
        };
        Self {
            name: name.into(),
            content_type,
            size,
            data,
        }
    }
}

/// A remote folder reached by path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    pub id: String,
    /// Name the folder was found or created under.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_size_defaults_to_payload() {
        let file = IncomingFile::new("a.txt", "text/plain", Bytes::from_static(b"hello"));
        assert_eq!(file.size, 5);
        assert_eq!(file.content_type, "text/plain");
    }

    #[test]
    fn empty_content_type_falls_back() {
        let file = IncomingFile::new("a.bin", "", Bytes::new());
        assert_eq!(file.content_type, "application/octet-stream");
    }
}

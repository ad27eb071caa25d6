use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::FOLDER_MIME_TYPE;

/// A file or folder as reported by the drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    /// Byte size of the stored content. The API encodes it as a string;
    /// folders have none.
    #[serde(
        default,
        deserialize_with = "de_opt_u64",
        serialize_with = "ser_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,
}

impl RemoteEntry {
    /// Returns `true` if the entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// One page of a `files.list` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryList {
    #[serde(default)]
    pub files: Vec<RemoteEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Metadata body sent when creating an entry or opening a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl EntryMetadata {
    /// Metadata for a folder named `name` under `parent_id`.
    pub fn folder(name: &str, parent_id: &str) -> Self {
        Self {
            name: name.to_string(),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            parents: vec![parent_id.to_string()],
        }
    }

    /// Metadata for a file named `name` under `parent_id`.
    pub fn file(name: &str, parent_id: &str, content_type: &str) -> Self {
        Self {
            name: name.to_string(),
            mime_type: Some(content_type.to_string()),
            parents: vec![parent_id.to_string()],
        }
    }
}

/// Result of uploading one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub success: bool,
    /// Name the client supplied.
    pub original_name: String,
    /// Name the entry was (or would have been) stored under.
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub size: u64,
}

impl UploadOutcome {
    pub fn succeeded(original_name: &str, file_name: &str, file_id: String, size: u64) -> Self {
        Self {
            success: true,
            original_name: original_name.to_string(),
            file_name: file_name.to_string(),
            file_id: Some(file_id),
            error: None,
            size,
        }
    }

    pub fn failed(original_name: &str, file_name: &str, error: String, size: u64) -> Self {
        Self {
            success: false,
            original_name: original_name.to_string(),
            file_name: file_name.to_string(),
            file_id: None,
            error: Some(error),
            size,
        }
    }
}

/// Aggregate result of one batch upload call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// `true` only if every file succeeded.
    pub success: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub files: Vec<UploadOutcome>,
}

impl BatchResult {
    /// Builds the aggregate counts from per-file outcomes (kept in order).
    pub fn from_outcomes(files: Vec<UploadOutcome>) -> Self {
        let total = files.len();
        let successful = files.iter().filter(|o| o.success).count();
        let failed = total - successful;
        Self {
            success: failed == 0 && total > 0,
            total,
            successful,
            failed,
            files,
        }
    }
}

fn de_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn ser_opt_u64<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serializer.serialize_str(&v.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_entry_parses_string_size() {
        let json = r#"{"id":"f1","name":"clip.mp4","mimeType":"video/mp4","size":"1048576","md5Checksum":"abc"}"#;
        let entry: RemoteEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.size, Some(1_048_576));
        assert_eq!(entry.md5_checksum.as_deref(), Some("abc"));
        assert!(!entry.is_folder());
    }

    #[test]
    fn remote_entry_folder_without_size() {
        let json = r#"{"id":"d1","name":"Photos","mimeType":"application/vnd.google-apps.folder"}"#;
        let entry: RemoteEntry = serde_json::from_str(json).unwrap();
        assert!(entry.is_folder());
        assert_eq!(entry.size, None);

        let back = serde_json::to_string(&entry).unwrap();
        assert!(!back.contains("size"));
    }

    #[test]
    fn remote_entry_rejects_garbage_size() {
        let json = r#"{"id":"f1","name":"a","size":"lots"}"#;
        assert!(serde_json::from_str::<RemoteEntry>(json).is_err());
    }

    #[test]
    fn entry_list_missing_files_is_empty() {
        let list: EntryList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn folder_metadata_shape() {
        let meta = EntryMetadata::folder("Alice", "root-1");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["mimeType"], FOLDER_MIME_TYPE);
        assert_eq!(json["parents"][0], "root-1");
    }

    #[test]
    fn batch_result_counts() {
        let result = BatchResult::from_outcomes(vec![
            UploadOutcome::succeeded("a.png", "a.png", "id-a".into(), 10),
            UploadOutcome::failed("b.png", "b(1).png", "boom".into(), 20),
            UploadOutcome::succeeded("c.png", "c.png", "id-c".into(), 30),
        ]);
        assert_eq!(result.total, 3);
        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 1);
        assert!(!result.success);
        assert_eq!(result.files[1].file_name, "b(1).png");
    }

    #[test]
    fn outcome_json_uses_camel_case() {
        let outcome = UploadOutcome::succeeded("a.png", "a(1).png", "id-a".into(), 10);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"originalName\":\"a.png\""));
        assert!(json.contains("\"fileId\":\"id-a\""));
        assert!(!json.contains("error"));
    }
}

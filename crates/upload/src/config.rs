//! Engine configuration.
//!
//! Every field has a serde default, so a partial `[engine]` table is valid.

use std::collections::BTreeMap;

use drivedrop_protocol::constants::CHUNK_GRANULARITY;
use drivedrop_transfer::{DEFAULT_CHUNK_SIZE, DEFAULT_SIMPLE_UPLOAD_THRESHOLD, TransferOptions};
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

const GIB: u64 = 1024 * 1024 * 1024;

/// Appends `segment` below the category folder when both `platform` and
/// `category` match (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraSegmentRule {
    pub platform: String,
    pub category: String,
    pub segment: String,
}

impl ExtraSegmentRule {
    pub fn matches(&self, platform: &str, category: &str) -> bool {
        self.platform.trim().eq_ignore_ascii_case(platform)
            && self.category.trim().eq_ignore_ascii_case(category)
    }
}

/// Upload engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Remote folder every logical path starts from.
    #[serde(default)]
    pub root_folder_id: String,

    /// Largest accepted file, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Largest accepted batch (sum of declared sizes), in bytes.
    #[serde(default = "default_max_total_size")]
    pub max_total_size: u64,

    /// Most files accepted in one batch.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Bytes per resumable chunk. Must be a multiple of 256 KiB.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Files at or below this size are uploaded in a single request.
    #[serde(default = "default_simple_upload_threshold")]
    pub simple_upload_threshold: u64,

    /// Compare the remote MD5 of each stored file with the local one.
    #[serde(default = "default_true")]
    pub verify_checksum: bool,

    #[serde(default)]
    pub extra_segments: Vec<ExtraSegmentRule>,

    /// Platform folder names, keyed by lowercase platform identifier.
    #[serde(default = "default_platforms")]
    pub platforms: BTreeMap<String, String>,
}

fn default_max_file_size() -> u64 {
    5 * GIB
}

fn default_max_total_size() -> u64 {
    10 * GIB
}

fn default_max_files() -> usize {
    50
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_simple_upload_threshold() -> u64 {
    DEFAULT_SIMPLE_UPLOAD_THRESHOLD
}

fn default_true() -> bool {
    true
}

fn default_platforms() -> BTreeMap<String, String> {
    [
        ("instagram", "Instagram"),
        ("tiktok", "TikTok"),
        ("youtube", "YouTube"),
        ("x", "X"),
        ("twitter", "X"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_folder_id: String::new(),
            max_file_size: default_max_file_size(),
            max_total_size: default_max_total_size(),
            max_files: default_max_files(),
            chunk_size: default_chunk_size(),
            simple_upload_threshold: default_simple_upload_threshold(),
            verify_checksum: default_true(),
            extra_segments: Vec::new(),
            platforms: default_platforms(),
        }
    }
}

impl EngineConfig {
    /// Checks the limits and chunk size. The root folder is checked when a
    /// path is resolved, so a config without one can still upload by id.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.chunk_size == 0 || self.chunk_size % CHUNK_GRANULARITY != 0 {
            return Err(UploadError::Config(format!(
                "chunk_size must be a non-zero multiple of {CHUNK_GRANULARITY} bytes, got {}",
                self.chunk_size
            )));
        }
        if self.max_files == 0 {
            return Err(UploadError::Config("max_files must be at least 1".into()));
        }
        if self.max_file_size == 0 || self.max_total_size == 0 {
            return Err(UploadError::Config(
                "size limits must be greater than zero".into(),
            ));
        }
        if self.extra_segments.iter().any(|r| r.segment.trim().is_empty()) {
            return Err(UploadError::Config(
                "extra segment rules need a non-empty segment".into(),
            ));
        }
        Ok(())
    }

    /// Root folder id, or a `Config` error when none is set.
    pub fn root_folder(&self) -> Result<&str, UploadError> {
        let root = self.root_folder_id.trim();
        if root.is_empty() {
            return Err(UploadError::Config("root_folder_id is not set".into()));
        }
        Ok(root)
    }

    /// Folder name for a platform identifier; unknown platforms pass through.
    pub fn platform_segment(&self, platform: &str) -> String {
        let platform = platform.trim();
        self.platforms
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(platform))
            .map_or_else(|| platform.to_string(), |(_, name)| name.clone())
    }

    /// Extra segment for a platform/category pair, if a rule matches.
    pub fn extra_segment(&self, platform: &str, category: &str) -> Option<&str> {
        self.extra_segments
            .iter()
            .find(|r| r.matches(platform.trim(), category.trim()))
            .map(|r| r.segment.trim())
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            chunk_size: self.chunk_size,
            simple_upload_threshold: self.simple_upload_threshold,
            verify_checksum: self.verify_checksum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert!(config.root_folder_id.is_empty());
        assert_eq!(config.max_file_size, 5 * GIB);
        assert_eq!(config.max_total_size, 10 * GIB);
        assert_eq!(config.max_files, 50);
        assert_eq!(config.chunk_size, 8 * 1024 * 1024);
        assert_eq!(config.simple_upload_threshold, 5 * 1024 * 1024);
        assert!(config.verify_checksum);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_config_uses_defaults() {
        let json = r#"{"root_folder_id": "root-1", "max_files": 3}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.root_folder_id, "root-1");
        assert_eq!(config.max_files, 3);
        assert_eq!(config.max_total_size, 10 * GIB);
        assert_eq!(config.platform_segment("tiktok"), "TikTok");
    }

    #[test]
    fn chunk_size_must_be_aligned() {
        let config = EngineConfig {
            chunk_size: 300 * 1024,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(UploadError::Config(_))));

        let config = EngineConfig {
            chunk_size: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            chunk_size: 512 * 1024,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_root_folder() {
        let config = EngineConfig::default();
        assert!(matches!(config.root_folder(), Err(UploadError::Config(_))));

        let config = EngineConfig {
            root_folder_id: " root-1 ".into(),
            ..EngineConfig::default()
        };
        assert_eq!(config.root_folder().unwrap(), "root-1");
    }

    #[test]
    fn platform_lookup_is_case_insensitive() {
        let config = EngineConfig::default();
        assert_eq!(config.platform_segment("Instagram"), "Instagram");
        assert_eq!(config.platform_segment("YOUTUBE"), "YouTube");
        assert_eq!(config.platform_segment("twitter"), "X");
        assert_eq!(config.platform_segment(" x "), "X");
        assert_eq!(config.platform_segment("Snapchat"), "Snapchat");
    }

    #[test]
    fn extra_segment_rules() {
        let config = EngineConfig {
            extra_segments: vec![ExtraSegmentRule {
                platform: "instagram".into(),
                category: "Stories".into(),
                segment: "Raw".into(),
            }],
            ..EngineConfig::default()
        };
        assert_eq!(config.extra_segment("Instagram", "stories"), Some("Raw"));
        assert_eq!(config.extra_segment("TikTok", "stories"), None);
        assert_eq!(config.extra_segment("instagram", "Reels"), None);
    }

    #[test]
    fn transfer_options_follow_config() {
        let config = EngineConfig {
            chunk_size: 256 * 1024,
            simple_upload_threshold: 1024,
            verify_checksum: false,
            ..EngineConfig::default()
        };
        let opts = config.transfer_options();
        assert_eq!(opts.chunk_size, 256 * 1024);
        assert_eq!(opts.simple_upload_threshold, 1024);
        assert!(!opts.verify_checksum);
    }
}

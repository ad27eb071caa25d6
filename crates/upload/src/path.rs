//! Logical paths: ordered folder names below the root folder.

use std::fmt;

use crate::config::EngineConfig;
use crate::error::UploadError;

/// Ordered folder names, relative to the configured root folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPath {
    segments: Vec<String>,
}

impl LogicalPath {
    /// Builds a path from raw segment names.
    ///
    /// Each name is trimmed. Blank names and names containing `/` are
    /// rejected, since a segment is exactly one folder level.
    pub fn new<I, S>(segments: I) -> Result<Self, UploadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments = segments
            .into_iter()
            .map(|s| check_segment(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Builds `model / platform / category [/ extra] [/ title]`.
    ///
    /// The platform goes through the configured name map and an extra
    /// segment is added when a platform/category rule matches. A blank
    /// title is ignored.
    pub fn for_upload(
        model: &str,
        platform: &str,
        category: &str,
        title: Option<&str>,
        config: &EngineConfig,
    ) -> Result<Self, UploadError> {
        for (field, value) in [("model", model), ("platform", platform), ("category", category)] {
            if value.trim().is_empty() {
                return Err(UploadError::validation(format!("{field} is required")));
            }
        }

        let mut segments = vec![
            model.to_string(),
            config.platform_segment(platform),
            category.to_string(),
        ];
        if let Some(extra) = config.extra_segment(platform, category) {
            segments.push(extra.to_string());
        }
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            segments.push(title.to_string());
        }

        Self::new(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

fn check_segment(raw: &str) -> Result<String, UploadError> {
    let segment = raw.trim();
    if segment.is_empty() {
        return Err(UploadError::validation("path segment must not be empty"));
    }
    if segment.contains('/') {
        return Err(UploadError::validation(format!(
            "path segment must not contain '/': {segment:?}"
        )));
    }
    Ok(segment.to_string())
}

//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/drivedrop/config.toml`
//! - Windows: `%APPDATA%/drivedrop/config.toml`
//!
//! `DRIVEDROP_ACCESS_TOKEN` and `DRIVEDROP_ROOT_FOLDER_ID` override the file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use drivedrop_protocol::constants::{DEFAULT_API_BASE_URL, DEFAULT_UPLOAD_BASE_URL};
use drivedrop_upload::EngineConfig;
use serde::{Deserialize, Serialize};

pub const ENV_ACCESS_TOKEN: &str = "DRIVEDROP_ACCESS_TOKEN";
pub const ENV_ROOT_FOLDER_ID: &str = "DRIVEDROP_ROOT_FOLDER_ID";

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OAuth access token sent as a Bearer credential.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,

    /// Base URL for metadata calls.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL for content uploads.
    #[serde(default = "default_upload_base_url")]
    pub upload_base_url: String,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.into()
}

fn default_upload_base_url() -> String {
    DEFAULT_UPLOAD_BASE_URL.into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_base_url: default_api_base_url(),
            upload_base_url: default_upload_base_url(),
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration and applies environment overrides.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used and a default file is written there on first run.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let path = config_path()?;
                if path.exists() {
                    Self::read(&path)?
                } else {
                    let config = Config::default();
                    config.save_to(&path)?;
                    config
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // The file may hold a token.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Replaces file values with non-empty values from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
            self.access_token = token;
        }
        if let Some(root) = non_empty(ENV_ROOT_FOLDER_ID) {
            self.engine.root_folder_id = root;
        }
    }

    /// Access token, or an error explaining where to set one.
    pub fn token(&self) -> anyhow::Result<&str> {
        let token = self.access_token.trim();
        if token.is_empty() {
            anyhow::bail!("no access token: set access_token in the config file or {ENV_ACCESS_TOKEN}");
        }
        Ok(token)
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("drivedrop").join("config.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("drivedrop")
            .join("config.toml"))
    }
}

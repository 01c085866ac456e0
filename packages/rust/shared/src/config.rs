//! Application configuration for confeed.
//!
//! An optional config file at `~/.confeed/confeed.toml` supplies defaults.
//! CLI flags override config file values, which override built-in defaults.
//! Credentials never live in the config file; they arrive via CLI flags only.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfeedError, Result};
use crate::types::LoadOptions;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "confeed.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".confeed";

// ---------------------------------------------------------------------------
// Config structs (matching confeed.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Retrieval defaults.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Ingestion service settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Page-listing batch size per request.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Ceiling on the total number of pages retrieved in one pass.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Whether to download text attachments alongside pages.
    #[serde(default = "default_true")]
    pub include_attachments: bool,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            max_pages: default_max_pages(),
            include_attachments: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_page_limit() -> u32 {
    50
}
fn default_max_pages() -> u32 {
    100_000
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Ingestion service endpoint accepting `(file_name, text)` submissions.
    #[serde(default = "default_ingest_endpoint")]
    pub endpoint: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ingest_endpoint(),
        }
    }
}

fn default_ingest_endpoint() -> String {
    "http://localhost:8001/v1/ingest/text".into()
}

impl From<&AppConfig> for LoadOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            include_attachments: config.retrieval.include_attachments,
            limit: config.retrieval.page_limit,
            max_pages: config.retrieval.max_pages,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.confeed/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ConfeedError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.confeed/confeed.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfeedError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ConfeedError::config(format!("failed to parse {}: {e}", path.display())))
}

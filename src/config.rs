//! TOML configuration.
//!
//! ```toml
//! [storage]
//! upload_dir = "./data/uploads"
//! summary_dir = "./data/summaries"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! max_upload_bytes = 104857600
//! strict_status = false
//!
//! [jobs]
//! max_concurrent = 4
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_summary_dir")]
    pub summary_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            summary_dir: default_summary_dir(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}
fn default_summary_dir() -> PathBuf {
    PathBuf::from("./data/summaries")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Answer unknown job ids with `404` instead of `200` + error body.
    #[serde(default)]
    pub strict_status: bool,
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobsConfig {
    /// Number of summaries that may be rendered at the same time.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    4
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }

    if config.jobs.max_concurrent == 0 {
        anyhow::bail!("jobs.max_concurrent must be >= 1");
    }

    if config.storage.upload_dir == config.storage.summary_dir {
        anyhow::bail!(
            "storage.upload_dir and storage.summary_dir must differ (both are '{}')",
            config.storage.upload_dir.display()
        );
    }

    Ok(())
}

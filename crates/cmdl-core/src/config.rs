use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::downloader::{DEFAULT_MAX_CHUNK_SIZE, DEFAULT_THREADS};
use crate::error::DownloadError;
use crate::transport::ClientOptions;

/// HTTP client settings (`[http]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Proxy URL for every request (e.g. `http://127.0.0.1:7890`).
    pub proxy: Option<String>,
    /// Disable TLS certificate verification.
    pub insecure_tls: bool,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let client = ClientOptions::default();
        Self {
            proxy: None,
            insecure_tls: false,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            user_agent: client.user_agent,
        }
    }
}

/// Global configuration loaded from `~/.config/cmdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmdlConfig {
    /// Catalog API token, sent as a bearer token. Empty = anonymous.
    pub api_key: String,
    /// Concurrent chunk fetches per download.
    pub threads: usize,
    /// Upper bound on one chunk's length in bytes.
    pub max_chunk_size: u64,
    /// Where downloads land when `--output-dir` is not given.
    pub download_dir: Option<PathBuf>,
    pub catalog_url: String,
    pub http: HttpConfig,
}

impl Default for CmdlConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            threads: DEFAULT_THREADS,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            download_dir: None,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl CmdlConfig {
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.threads == 0 {
            return Err(DownloadError::config("threads must be at least 1"));
        }
        if self.max_chunk_size == 0 {
            return Err(DownloadError::config("max_chunk_size must be at least 1 byte"));
        }
        Ok(())
    }

    /// Transport settings derived from the `[http]` section and `api_key`.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            proxy: self.http.proxy.clone().filter(|p| !p.is_empty()),
            insecure_tls: self.http.insecure_tls,
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs.max(1)),
            user_agent: self.http.user_agent.clone(),
            bearer_token: Some(self.api_key.clone()).filter(|k| !k.is_empty()),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cmdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CmdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CmdlConfig::default();
        write_default(&path, &default_cfg)?;
        tracing::info!("created default config at {}", path.display());
        tracing::warn!("api_key is empty; set it in {} for gated downloads", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load an explicit config file; a missing file is an error.
pub fn load_from(path: &Path) -> Result<CmdlConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: CmdlConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

fn write_default(path: &Path, cfg: &CmdlConfig) -> Result<()> {
    let toml = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml).with_context(|| format!("writing config {}", path.display()))?;
    Ok(())
}

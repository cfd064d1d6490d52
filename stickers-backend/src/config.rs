use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickersConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Root of the persistent cache, one sub-directory per namespace
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory where pack archives are created for delivery
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,

    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    #[serde(default = "default_cdn_url")]
    pub cdn_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: u64,

    #[serde(default = "default_content_ttl_secs")]
    pub content_ttl_secs: u64,

    /// Entry ceiling of each cache namespace
    #[serde(default = "default_cache_threshold")]
    pub cache_threshold: usize,

    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,

    #[serde(default = "default_max_random_attempts")]
    pub max_random_attempts: usize,

    /// Archives above this size (bytes) are not delivered
    #[serde(default = "default_max_pack_size")]
    pub max_pack_size: u64,

    /// Bot address used in `mailto:` links of search results
    #[serde(default)]
    pub self_address: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("data/blobs")
}

fn default_catalog_url() -> String {
    crate::catalog::client::DEFAULT_CATALOG_URL.to_string()
}

fn default_cdn_url() -> String {
    crate::content::client::DEFAULT_CDN_URL.to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:92.0) Gecko/20100101 Firefox/92.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_catalog_ttl_secs() -> u64 {
    60 * 60 * 24 * 3
}

fn default_content_ttl_secs() -> u64 {
    60 * 60 * 24 * 60
}

fn default_cache_threshold() -> usize {
    5000
}

fn default_max_search_results() -> usize {
    100
}

fn default_max_random_attempts() -> usize {
    200
}

fn default_max_pack_size() -> u64 {
    1024 * 1024 * 15
}

impl Default for StickersConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            cache_dir: default_cache_dir(),
            blob_dir: default_blob_dir(),
            catalog_url: default_catalog_url(),
            cdn_url: default_cdn_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            catalog_ttl_secs: default_catalog_ttl_secs(),
            content_ttl_secs: default_content_ttl_secs(),
            cache_threshold: default_cache_threshold(),
            max_search_results: default_max_search_results(),
            max_random_attempts: default_max_random_attempts(),
            max_pack_size: default_max_pack_size(),
            self_address: String::new(),
        }
    }
}

impl StickersConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: StickersConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    pub fn content_ttl(&self) -> Duration {
        Duration::from_secs(self.content_ttl_secs)
    }
}

pub static CONFIG: OnceLock<StickersConfig> = OnceLock::new();

/// Load `path` into the global config, falling back to defaults when the file is absent.
pub fn read_config(path: impl AsRef<Path>) -> anyhow::Result<&'static StickersConfig> {
    let path = path.as_ref();
    let config = if path.exists() {
        StickersConfig::from_file(path)?
    } else {
        tracing::warn!("Config file {:?} not found, using defaults", path);
        StickersConfig::default()
    };

    Ok(CONFIG.get_or_init(|| config))
}

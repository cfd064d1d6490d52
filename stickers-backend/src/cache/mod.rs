///! Key-value caching with per-entry expiry
///!
///! Stores are byte-valued and interchangeable (filesystem, memory, none).
///! A `CacheNamespace` binds a store to one TTL policy; the catalog and the
///! pack content live in separate namespaces.
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemCache;
pub use memory::{MemoryCache, NullCache};

/// Backing store of a cache namespace
///
/// Implementations must tolerate concurrent readers and writers. Expired
/// entries are reported as absent.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Overwrite `key`. `ttl` of `None` applies the store default.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> anyhow::Result<()>;
}

/// Expiry instant in unix milliseconds, 0 meaning "never"
pub(crate) fn expiry_millis(ttl: Option<Duration>) -> i64 {
    match ttl {
        Some(ttl) if !ttl.is_zero() => {
            let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            chrono::Utc::now().timestamp_millis().saturating_add(ttl)
        }
        _ => 0,
    }
}

pub(crate) fn is_expired(expires_at: i64) -> bool {
    expires_at != 0 && expires_at <= chrono::Utc::now().timestamp_millis()
}

/// A store plus the TTL applied to everything written through it
///
/// Store failures never propagate: a failed read is a miss, a failed write
/// is logged and dropped.
#[derive(Clone)]
pub struct CacheNamespace {
    name: &'static str,
    store: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
}

impl CacheNamespace {
    pub fn new(name: &'static str, store: Arc<dyn CacheStore>, ttl: Option<Duration>) -> Self {
        Self { name, store, ttl }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub async fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                debug!("Cache hit [{}] {}", self.name, key);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache miss [{}] {}", self.name, key);
                None
            }
            Err(e) => {
                warn!("Cache read failed [{}] {}: {:#}", self.name, key, e);
                None
            }
        }
    }

    pub async fn set_bytes(&self, key: &str, value: &[u8]) {
        if let Err(e) = self.store.set(key, value, self.ttl).await {
            warn!("Cache write failed [{}] {}: {:#}", self.name, key, e);
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_bytes(key).await?;
        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry [{}] {}: {}", self.name, key, e);
                None
            }
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(raw) => self.set_bytes(key, &raw).await,
            Err(e) => warn!("Failed to serialize cache entry [{}] {}: {}", self.name, key, e),
        }
    }
}

/// The two namespaces the sticker layer reads through
#[derive(Clone)]
pub struct Caches {
    /// Catalog list, short TTL
    pub catalog: CacheNamespace,
    /// Pack manifests and sticker images, long TTL
    pub content: CacheNamespace,
}

impl Caches {
    pub const CATALOG: &'static str = "catalog";
    pub const CONTENT: &'static str = "content";

    /// One directory per namespace under `root`
    pub fn filesystem(
        root: impl AsRef<Path>,
        threshold: usize,
        catalog_ttl: Duration,
        content_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let catalog = FileSystemCache::new(root.join(Self::CATALOG), threshold, Some(catalog_ttl))?;
        let content = FileSystemCache::new(root.join(Self::CONTENT), threshold, Some(content_ttl))?;

        Ok(Self {
            catalog: CacheNamespace::new(Self::CATALOG, Arc::new(catalog), Some(catalog_ttl)),
            content: CacheNamespace::new(Self::CONTENT, Arc::new(content), Some(content_ttl)),
        })
    }

    pub fn memory(threshold: usize, catalog_ttl: Duration, content_ttl: Duration) -> Self {
        Self {
            catalog: CacheNamespace::new(
                Self::CATALOG,
                Arc::new(MemoryCache::new(threshold, Some(catalog_ttl))),
                Some(catalog_ttl),
            ),
            content: CacheNamespace::new(
                Self::CONTENT,
                Arc::new(MemoryCache::new(threshold, Some(content_ttl))),
                Some(content_ttl),
            ),
        }
    }

    /// Every lookup misses; every operation hits the network
    pub fn disabled() -> Self {
        Self {
            catalog: CacheNamespace::new(Self::CATALOG, Arc::new(NullCache), None),
            content: CacheNamespace::new(Self::CONTENT, Arc::new(NullCache), None),
        }
    }
}

///! In-process cache stores
use anyhow::Result;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{expiry_millis, is_expired, CacheStore};

struct Entry {
    value: Vec<u8>,
    expires_at: i64,
}

/// Least-recently-used store, lost on restart
pub struct MemoryCache {
    entries: RwLock<LruCache<String, Entry>>,
    default_ttl: Option<Duration>,
}

impl MemoryCache {
    /// `threshold` of `0` keeps every entry
    pub fn new(threshold: usize, default_ttl: Option<Duration>) -> Self {
        let entries = match NonZeroUsize::new(threshold) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        Self {
            entries: RwLock::new(entries),
            default_ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().await;
        let expired = match entries.get(key) {
            Some(entry) if !is_expired(entry.expires_at) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: expiry_millis(ttl.or(self.default_ttl)),
        };
        self.entries.write().await.put(key.to_string(), entry);
        Ok(())
    }
}

/// Store that keeps nothing
pub struct NullCache;

#[async_trait]
impl CacheStore for NullCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> Result<()> {
        Ok(())
    }
}

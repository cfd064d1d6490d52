///! Directory-backed cache store
///!
///! One file per key, named after the SHA-256 of the key. Each file starts
///! with the big-endian expiry (unix millis, 0 = never) followed by the value.
///!
///! The entry count is tracked in memory (seeded from the directory on open),
///! so the directory is only scanned when a write would cross the threshold.
use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use super::{expiry_millis, is_expired, CacheStore};

const HEADER_LEN: usize = 8;
const TEMP_SUFFIX: &str = ".tmp";
/// A full cache drops `threshold / PRUNE_DIVISOR` of its oldest entries at once
const PRUNE_DIVISOR: usize = 4;

pub struct FileSystemCache {
    cache_dir: PathBuf,
    threshold: usize,
    default_ttl: Option<Duration>,
    entry_count: AtomicUsize,
    prune_runs: AtomicUsize,
}

impl FileSystemCache {
    /// Create the store, making `cache_dir` if needed.
    ///
    /// `threshold` bounds the number of entries; `0` disables pruning.
    pub fn new<P: AsRef<Path>>(cache_dir: P, threshold: usize, default_ttl: Option<Duration>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {:?}", cache_dir))?;
        let entry_count = count_entries(&cache_dir)
            .with_context(|| format!("Failed to read cache directory {:?}", cache_dir))?;

        debug!("Opened cache {:?} with {} entries", cache_dir, entry_count);
        Ok(Self {
            cache_dir,
            threshold,
            default_ttl,
            entry_count: AtomicUsize::new(entry_count),
            prune_runs: AtomicUsize::new(0),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Tracked number of entries on disk
    pub fn len(&self) -> usize {
        self.entry_count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(hex::encode(Sha256::digest(key.as_bytes())))
    }

    fn entry_removed(&self) {
        let _ = self
            .entry_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
    }

    /// Entry files currently on disk, in-flight temp files excluded
    async fn list_entries(&self) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !is_temp_file(&path) && entry.file_type().await?.is_file() {
                entries.push(path);
            }
        }
        Ok(entries)
    }

    async fn read_expiry(path: &Path) -> Result<i64> {
        let mut file = fs::File::open(path).await?;
        let mut header = [0u8; HEADER_LEN];
        file.read_exact(&mut header).await?;
        Ok(i64::from_be_bytes(header))
    }

    /// Make room for one more entry: drop expired entries, then a batch of the oldest ones.
    async fn prune(&self) -> Result<()> {
        self.prune_runs.fetch_add(1, Ordering::SeqCst);

        let entries = self.list_entries().await?;
        let mut live = Vec::with_capacity(entries.len());
        let mut removed = 0;
        for path in entries {
            let expired = match Self::read_expiry(&path).await {
                Ok(expires_at) => is_expired(expires_at),
                // Truncated or unreadable entry
                Err(_) => true,
            };
            if expired {
                if fs::remove_file(&path).await.is_ok() {
                    removed += 1;
                }
                continue;
            }
            let modified = fs::metadata(&path)
                .await
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            live.push((modified, path));
        }

        if live.len() >= self.threshold {
            live.sort_by_key(|(modified, _)| *modified);
            let batch = (live.len() + 1 - self.threshold).max(self.threshold / PRUNE_DIVISOR);
            let evicted: Vec<_> = live.drain(..batch.min(live.len())).collect();
            for (_, path) in evicted {
                if fs::remove_file(&path).await.is_ok() {
                    removed += 1;
                }
            }
        }

        self.entry_count.store(live.len(), Ordering::SeqCst);
        if removed > 0 {
            info!("Pruned {} entries from cache {:?}", removed, self.cache_dir);
        }
        Ok(())
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(TEMP_SUFFIX))
}

fn count_entries(dir: &Path) -> std::io::Result<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !is_temp_file(&entry.path()) && entry.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

#[async_trait]
impl CacheStore for FileSystemCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read cache entry {:?}", path)),
        };

        let expired = match content.get(..HEADER_LEN) {
            Some(header) => {
                let mut expiry = [0u8; HEADER_LEN];
                expiry.copy_from_slice(header);
                is_expired(i64::from_be_bytes(expiry))
            }
            None => {
                debug!("Removing truncated cache entry {:?}", path);
                true
            }
        };
        if expired {
            if fs::remove_file(&path).await.is_ok() {
                self.entry_removed();
            }
            return Ok(None);
        }

        Ok(Some(content[HEADER_LEN..].to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let path = self.entry_path(key);
        let is_new = !fs::try_exists(&path).await.unwrap_or(false);
        if is_new && self.threshold > 0 && self.len() >= self.threshold {
            self.prune().await.context("Failed to prune cache")?;
        }

        let expires_at = expiry_millis(ttl.or(self.default_ttl));
        let mut content = Vec::with_capacity(HEADER_LEN + value.len());
        content.extend_from_slice(&expires_at.to_be_bytes());
        content.extend_from_slice(value);

        // Concurrent writers each use their own temp file; rename is atomic.
        let temp_path = self
            .cache_dir
            .join(format!(".{}{}", uuid::Uuid::now_v7(), TEMP_SUFFIX));
        fs::write(&temp_path, &content)
            .await
            .with_context(|| format!("Failed to write cache entry {:?}", temp_path))?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| format!("Failed to move cache entry into {:?}", path));
        }

        if is_new {
            self.entry_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

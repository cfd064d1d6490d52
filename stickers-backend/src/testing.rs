///! In-memory catalog and pack sources for tests
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stickers_common::{CatalogEntry, PackManifest, PackMeta, PackRef, PackSummary, StickerRef};

use crate::cache::Caches;
use crate::catalog::CatalogSource;
use crate::content::PackSource;
use crate::error::{StickerError, StickerResult};
use crate::stickers::{SignalStickers, StickerSettings};

pub(crate) fn catalog_entry(id: &str, title: &str, tags: &[&str]) -> CatalogEntry {
    CatalogEntry {
        meta: PackMeta {
            id: id.to_string(),
            key: format!("{}-key", id),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        },
        manifest: PackSummary {
            title: title.to_string(),
            author: String::new(),
        },
    }
}

pub(crate) fn manifest(id: &str, title: &str, stickers: &[(u32, &str)]) -> PackManifest {
    let stickers: Vec<StickerRef> = stickers
        .iter()
        .map(|(sticker_id, emoji)| StickerRef::new(*sticker_id, *emoji))
        .collect();
    PackManifest {
        id: id.to_string(),
        key: format!("{}-key", id),
        title: title.to_string(),
        author: String::new(),
        cover: stickers[0].clone(),
        stickers,
    }
}

/// Image bytes a fake pack serves for a sticker
pub(crate) fn image_of(pack_id: &str, sticker_id: u32) -> Vec<u8> {
    format!("RIFF-{}-{}-WEBP", pack_id, sticker_id).into_bytes()
}

#[derive(Default)]
pub(crate) struct FakeCatalog {
    pub entries: Vec<CatalogEntry>,
    pub unavailable: bool,
    pub calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch_catalog(&self) -> StickerResult<Vec<CatalogEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(StickerError::upstream("catalog", "connection refused"));
        }
        Ok(self.entries.clone())
    }
}

#[derive(Default)]
pub(crate) struct FakePacks {
    pub manifests: HashMap<String, PackManifest>,
    /// Packs whose every request fails
    pub unavailable: HashSet<String>,
    /// Stickers whose image request fails
    pub broken_stickers: HashSet<(String, u32)>,
    pub manifest_calls: AtomicUsize,
    pub sticker_calls: AtomicUsize,
}

impl FakePacks {
    pub fn new(manifests: Vec<PackManifest>) -> Self {
        Self {
            manifests: manifests.into_iter().map(|m| (m.id.clone(), m)).collect(),
            ..Default::default()
        }
    }

    pub fn manifest_calls(&self) -> usize {
        self.manifest_calls.load(Ordering::SeqCst)
    }

    pub fn sticker_calls(&self) -> usize {
        self.sticker_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackSource for FakePacks {
    async fn fetch_manifest(&self, pack: &PackRef) -> StickerResult<PackManifest> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.contains(&pack.id) {
            return Err(StickerError::upstream(&pack.id, "timed out"));
        }
        self.manifests
            .get(&pack.id)
            .cloned()
            .ok_or_else(|| StickerError::upstream(&pack.id, "HTTP error 403 Forbidden"))
    }

    async fn fetch_sticker(&self, pack: &PackRef, sticker_id: u32) -> StickerResult<Vec<u8>> {
        self.sticker_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.contains(&pack.id) || self.broken_stickers.contains(&(pack.id.clone(), sticker_id)) {
            return Err(StickerError::upstream(&pack.id, "timed out"));
        }
        Ok(image_of(&pack.id, sticker_id))
    }
}

pub(crate) fn memory_caches() -> Caches {
    Caches::memory(1000, Duration::from_secs(3600), Duration::from_secs(3600))
}

pub(crate) fn stickers_with(
    catalog: Arc<FakeCatalog>,
    packs: Arc<FakePacks>,
    settings: StickerSettings,
) -> SignalStickers {
    SignalStickers::new(catalog, packs, memory_caches(), settings)
}

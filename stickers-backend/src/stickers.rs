///! Sticker pack lookup, packaging, search and random emoji lookup
///!
///! Every remote read goes through a cache namespace first: the catalog list
///! under a fixed key, manifests under the pack id and sticker images under
///! `<pack id>+<sticker id>`.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use stickers_common::{CatalogEntry, PackManifest, PackRef};
use tracing::{debug, info, warn};

use crate::cache::Caches;
use crate::catalog::{self, search, CatalogClient, CatalogSource};
use crate::config::StickersConfig;
use crate::content::{PackSource, SignalCdnClient};
use crate::error::StickerResult;
use crate::locator;
use crate::packaging::PackArchive;

const CATALOG_KEY: &str = "packs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickerSettings {
    /// Result cap of `search`
    pub max_search_results: usize,
    /// Packs inspected by `get_random_sticker` before giving up
    pub max_random_attempts: usize,
}

impl Default for StickerSettings {
    fn default() -> Self {
        Self {
            max_search_results: 100,
            max_random_attempts: 200,
        }
    }
}

/// Summary text and cover image of a pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackInfo {
    pub summary: String,
    pub cover: Vec<u8>,
}

/// A packaged pack; the caller owns (and must delete) `path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedPack {
    pub title: String,
    pub path: PathBuf,
}

/// A sticker found for an emoji and the link to its pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomSticker {
    pub pack_url: String,
    pub image: Vec<u8>,
}

pub struct SignalStickers {
    catalog_source: Arc<dyn CatalogSource>,
    pack_source: Arc<dyn PackSource>,
    caches: Caches,
    settings: StickerSettings,
}

impl SignalStickers {
    pub fn new(
        catalog_source: Arc<dyn CatalogSource>,
        pack_source: Arc<dyn PackSource>,
        caches: Caches,
        settings: StickerSettings,
    ) -> Self {
        Self {
            catalog_source,
            pack_source,
            caches,
            settings,
        }
    }

    /// HTTP sources and a filesystem cache under `config.cache_dir`
    pub fn from_config(config: &StickersConfig) -> anyhow::Result<Self> {
        let timeout = config.request_timeout();
        let catalog_source = CatalogClient::new(&config.catalog_url, &config.user_agent, timeout)?;
        let pack_source = SignalCdnClient::new(&config.cdn_url, &config.user_agent, timeout)?;
        let caches = Caches::filesystem(
            &config.cache_dir,
            config.cache_threshold,
            config.catalog_ttl(),
            config.content_ttl(),
        )?;

        info!("Sticker cache at {:?}", config.cache_dir);
        Ok(Self::new(
            Arc::new(catalog_source),
            Arc::new(pack_source),
            caches,
            StickerSettings {
                max_search_results: config.max_search_results,
                max_random_attempts: config.max_random_attempts,
            },
        ))
    }

    pub fn settings(&self) -> StickerSettings {
        self.settings
    }

    pub fn is_pack(text: &str) -> bool {
        locator::is_pack(text)
    }

    /// Full catalog, from cache when fresh
    pub async fn catalog(&self) -> StickerResult<Vec<CatalogEntry>> {
        if let Some(entries) = self.caches.catalog.get_json::<Vec<CatalogEntry>>(CATALOG_KEY).await {
            return Ok(entries);
        }

        let entries = self.catalog_source.fetch_catalog().await?;
        self.caches.catalog.set_json(CATALOG_KEY, &entries).await;
        Ok(entries)
    }

    pub async fn manifest(&self, pack: &PackRef) -> StickerResult<PackManifest> {
        if let Some(manifest) = self.caches.content.get_json::<PackManifest>(&pack.id).await {
            return Ok(manifest);
        }

        let manifest = self.pack_source.fetch_manifest(pack).await?;
        self.caches.content.set_json(&pack.id, &manifest).await;
        Ok(manifest)
    }

    pub async fn sticker_image(&self, pack: &PackRef, sticker_id: u32) -> StickerResult<Vec<u8>> {
        let key = format!("{}+{}", pack.id, sticker_id);
        if let Some(image) = self.caches.content.get_bytes(&key).await {
            return Ok(image);
        }

        let image = self.pack_source.fetch_sticker(pack, sticker_id).await?;
        self.caches.content.set_bytes(&key, &image).await;
        Ok(image)
    }

    /// Title/author/sticker count (plus catalog tags) and the cover image of the pack at `url`
    pub async fn get_pack_metadata(&self, url: &str) -> StickerResult<PackInfo> {
        let pack = locator::parse(url)?;
        let manifest = self.manifest(&pack).await?;

        let mut summary = format!(
            "Title: {}\nAuthor: {}\nStickers: {}",
            or_placeholder(&manifest.title, "NO TITLE"),
            or_placeholder(&manifest.author, "ANONYMOUS"),
            manifest.stickers.len()
        );

        let entries = self.catalog().await?;
        if let Some(entry) = entries.iter().find(|entry| entry.meta.id == manifest.id) {
            let tags = catalog::tags(entry);
            if !tags.is_empty() {
                summary.push_str("\nTags: ");
                summary.push_str(&tags.into_iter().collect::<Vec<_>>().join(", "));
            }
        }

        let cover = self.sticker_image(&manifest.pack_ref(), manifest.cover.id).await?;
        Ok(PackInfo { summary, cover })
    }

    /// Zip every sticker of the pack at `url` into a new file in `dest_dir`, in manifest order
    pub async fn download_pack(&self, dest_dir: &Path, url: &str) -> StickerResult<DownloadedPack> {
        let pack = locator::parse(url)?;
        let manifest = self.manifest(&pack).await?;
        let pack = manifest.pack_ref();

        let mut archive = PackArchive::create(dest_dir, &manifest.title)?;
        for sticker in &manifest.stickers {
            let written = match self.sticker_image(&pack, sticker.id).await {
                Ok(image) => archive.add_sticker(sticker, &image),
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                archive.discard();
                return Err(e);
            }
        }

        let path = archive.finish()?;
        Ok(DownloadedPack {
            title: manifest.title,
            path,
        })
    }

    pub async fn search(&self, query: &str) -> StickerResult<Vec<CatalogEntry>> {
        let entries = self.catalog().await?;
        let results: Vec<CatalogEntry> = search::search(&entries, query, self.settings.max_search_results)
            .into_iter()
            .cloned()
            .collect();

        debug!("Search '{}' found {} packs", query, results.len());
        Ok(results)
    }

    /// `search` rendered as HTML, empty when nothing matches
    pub async fn search_html(&self, self_address: &str, query: &str) -> StickerResult<String> {
        let results = self.search(query).await?;
        let results: Vec<&CatalogEntry> = results.iter().collect();
        Ok(search::render_html(self_address, &results))
    }

    /// Look for `emoji` in randomly drawn catalog packs
    ///
    /// Packs are drawn without replacement until a sticker matches, the
    /// catalog is exhausted or `max_random_attempts` packs were inspected.
    /// A pack whose manifest cannot be fetched is skipped; the call only
    /// fails when no inspected pack could be fetched at all.
    pub async fn get_random_sticker(&self, emoji: &str) -> StickerResult<Option<RandomSticker>> {
        if emoji.is_empty() {
            return Ok(None);
        }

        let entries = self.catalog().await?;
        let mut pool = CandidatePool::new(&entries);
        let mut attempts = 0;
        let mut fetched = 0;
        let mut last_error = None;

        while attempts < self.settings.max_random_attempts {
            let candidate = {
                let mut rng = rand::rng();
                pool.draw(&mut rng)
            };
            let Some(entry) = candidate else {
                break;
            };
            attempts += 1;

            let manifest = match self.manifest(&entry.pack_ref()).await {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!("Skipping pack {} while looking for {}: {}", entry.meta.id, emoji, e);
                    last_error = Some(e);
                    continue;
                }
            };
            fetched += 1;

            if let Some(sticker) = manifest.find_emoji(emoji) {
                let pack = manifest.pack_ref();
                let image = self.sticker_image(&pack, sticker.id).await?;
                debug!("Found {} in pack {} after {} attempts", emoji, pack.id, attempts);
                return Ok(Some(RandomSticker {
                    pack_url: locator::pack_url(&pack),
                    image,
                }));
            }
        }

        match last_error {
            Some(e) if fetched == 0 => Err(e),
            _ => {
                debug!("No sticker for {} after {} attempts", emoji, attempts);
                Ok(None)
            }
        }
    }
}

/// Random draws without replacement over an immutable catalog snapshot
struct CandidatePool<'a> {
    entries: &'a [CatalogEntry],
    excluded: HashSet<usize>,
}

impl<'a> CandidatePool<'a> {
    fn new(entries: &'a [CatalogEntry]) -> Self {
        Self {
            entries,
            excluded: HashSet::new(),
        }
    }

    fn remaining(&self) -> usize {
        self.entries.len() - self.excluded.len()
    }

    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&'a CatalogEntry> {
        let remaining = self.remaining();
        if remaining == 0 {
            return None;
        }

        let nth = rng.random_range(0..remaining);
        let index = (0..self.entries.len())
            .filter(|i| !self.excluded.contains(i))
            .nth(nth)?;
        self.excluded.insert(index);
        Some(&self.entries[index])
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

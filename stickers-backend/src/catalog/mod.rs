///! Remote catalog of published sticker packs
///!
///! The catalog is a single JSON list fetched on demand and cached whole.
use std::collections::BTreeSet;

use async_trait::async_trait;
use stickers_common::CatalogEntry;

use crate::error::StickerResult;

pub mod client;
pub mod search;

pub use client::CatalogClient;

/// Source of the full catalog list
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> StickerResult<Vec<CatalogEntry>>;
}

/// Lower-cased declared tags plus the synthetic `nsfw`, `animated` and `original` tags
pub fn tags(entry: &CatalogEntry) -> BTreeSet<String> {
    let mut tags: BTreeSet<String> = entry
        .meta
        .tags
        .iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();

    if entry.meta.nsfw {
        tags.insert("nsfw".to_string());
    }
    if entry.meta.animated {
        tags.insert("animated".to_string());
    }
    if entry.meta.original {
        tags.insert("original".to_string());
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use stickers_common::{PackMeta, PackSummary};

    #[test]
    fn test_tags_are_normalized() {
        let entry = CatalogEntry {
            meta: PackMeta {
                id: "p1".to_string(),
                key: "k1".to_string(),
                tags: vec!["Cute".to_string(), "cute".to_string(), " ANIMALS ".to_string(), String::new()],
                nsfw: false,
                animated: true,
                original: true,
            },
            manifest: PackSummary::default(),
        };

        let tags: Vec<String> = tags(&entry).into_iter().collect();
        assert_eq!(tags, vec!["animals", "animated", "cute", "original"]);
    }

    #[test]
    fn test_no_tags() {
        let entry = CatalogEntry {
            meta: PackMeta {
                id: "p1".to_string(),
                key: "k1".to_string(),
                ..Default::default()
            },
            manifest: PackSummary::default(),
        };
        assert!(tags(&entry).is_empty());
    }

    #[test]
    fn test_nsfw_flag() {
        let entry = CatalogEntry {
            meta: PackMeta {
                id: "p1".to_string(),
                key: "k1".to_string(),
                nsfw: true,
                ..Default::default()
            },
            manifest: PackSummary::default(),
        };
        assert!(tags(&entry).contains("nsfw"));
    }
}

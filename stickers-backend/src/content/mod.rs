///! Pack content: manifests and sticker images from the storage service
use async_trait::async_trait;
use stickers_common::proto::Pack;
use stickers_common::{PackManifest, PackRef, StickerRef};

use crate::error::{StickerError, StickerResult};

pub mod client;
pub mod crypto;

pub use client::SignalCdnClient;

/// Source of pack manifests and sticker images
#[async_trait]
pub trait PackSource: Send + Sync {
    async fn fetch_manifest(&self, pack: &PackRef) -> StickerResult<PackManifest>;

    async fn fetch_sticker(&self, pack: &PackRef, sticker_id: u32) -> StickerResult<Vec<u8>>;
}

/// Convert a decoded manifest message
///
/// The cover is the listed sticker with the upstream cover id, or the first
/// sticker when the cover is absent or not part of the pack.
pub fn manifest_from_proto(pack: &PackRef, message: Pack) -> StickerResult<PackManifest> {
    let stickers: Vec<StickerRef> = message
        .stickers
        .into_iter()
        .map(|sticker| StickerRef::new(sticker.id.unwrap_or_default(), sticker.emoji.unwrap_or_default()))
        .collect();

    let cover_id = message.cover.and_then(|cover| cover.id);
    let listed_cover = cover_id.and_then(|id| stickers.iter().find(|sticker| sticker.id == id));
    if cover_id.is_some() && listed_cover.is_none() {
        tracing::warn!("Pack {} lists cover {:?} outside its stickers", pack.id, cover_id);
    }
    let cover = listed_cover
        .or_else(|| stickers.first())
        .cloned()
        .ok_or_else(|| StickerError::upstream(&pack.id, "manifest has no stickers"))?;

    Ok(PackManifest {
        id: pack.id.clone(),
        key: pack.key.clone(),
        title: message.title.unwrap_or_default(),
        author: message.author.unwrap_or_default(),
        stickers,
        cover,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stickers_common::proto::pack::Sticker;

    fn sticker(id: u32, emoji: &str) -> Sticker {
        Sticker {
            id: Some(id),
            emoji: Some(emoji.to_string()),
            content_type: Some("image/webp".to_string()),
        }
    }

    #[test]
    fn test_manifest_keeps_sticker_order() {
        let message = Pack {
            title: Some("Cats".to_string()),
            author: None,
            cover: Some(sticker(2, "😺")),
            stickers: vec![sticker(3, "🐱"), sticker(1, ""), sticker(2, "😺")],
        };

        let manifest = manifest_from_proto(&PackRef::new("p1", "k1"), message).unwrap();
        assert_eq!(manifest.title, "Cats");
        assert_eq!(manifest.author, "");
        assert_eq!(manifest.stickers.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(manifest.cover, StickerRef::new(2, "😺"));
        assert_eq!(manifest.pack_ref(), PackRef::new("p1", "k1"));
    }

    #[test]
    fn test_missing_cover_uses_first_sticker() {
        let message = Pack {
            title: None,
            author: Some("Someone".to_string()),
            cover: None,
            stickers: vec![sticker(0, "🐶"), sticker(1, "🐱")],
        };

        let manifest = manifest_from_proto(&PackRef::new("p1", "k1"), message).unwrap();
        assert_eq!(manifest.cover, StickerRef::new(0, "🐶"));
        assert_eq!(manifest.title, "");
    }

    #[test]
    fn test_unlisted_cover_uses_first_sticker() {
        let message = Pack {
            title: Some("Cats".to_string()),
            author: None,
            cover: Some(sticker(9, "🦊")),
            stickers: vec![sticker(4, "🐱"), sticker(5, "😺")],
        };

        let manifest = manifest_from_proto(&PackRef::new("p1", "k1"), message).unwrap();
        assert_eq!(manifest.cover, StickerRef::new(4, "🐱"));
        assert!(manifest.stickers.contains(&manifest.cover));
    }

    #[test]
    fn test_cover_without_stickers_is_rejected() {
        let message = Pack {
            cover: Some(sticker(1, "🐱")),
            ..Default::default()
        };
        let err = manifest_from_proto(&PackRef::new("p1", "k1"), message).unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn test_empty_manifest_is_rejected() {
        let err = manifest_from_proto(&PackRef::new("p1", "k1"), Pack::default()).unwrap_err();
        assert!(err.is_upstream());
    }
}

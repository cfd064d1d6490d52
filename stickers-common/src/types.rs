use serde::{Deserialize, Deserializer, Serialize};

/// Identifier/key pair of a retrievable sticker pack
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackRef {
    /// Public pack id (hex string upstream, treated as opaque)
    pub id: String,
    /// Pack key used to decrypt the pack's manifest and stickers
    pub key: String,
}

impl PackRef {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for PackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A sticker inside a pack manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerRef {
    pub id: u32,
    /// Single emoji the sticker represents, empty when the author set none
    #[serde(default)]
    pub emoji: String,
}

impl StickerRef {
    pub fn new(id: u32, emoji: impl Into<String>) -> Self {
        Self {
            id,
            emoji: emoji.into(),
        }
    }
}

/// Full pack manifest as delivered by the storage service
///
/// `stickers` keeps upstream order, which is also the packaging order.
/// `cover` is always one of `stickers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackManifest {
    pub id: String,
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub stickers: Vec<StickerRef>,
    pub cover: StickerRef,
}

impl PackManifest {
    pub fn pack_ref(&self) -> PackRef {
        PackRef::new(self.id.clone(), self.key.clone())
    }

    /// First sticker carrying exactly `emoji`
    pub fn find_emoji(&self, emoji: &str) -> Option<&StickerRef> {
        self.stickers.iter().find(|sticker| sticker.emoji == emoji)
    }
}

/// Catalog metadata block of a published pack
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackMeta {
    pub id: String,
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nsfw: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub animated: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original: bool,
}

/// Title and author as listed in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
}

/// One published pack in the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub meta: PackMeta,
    #[serde(default)]
    pub manifest: PackSummary,
}

impl CatalogEntry {
    pub fn pack_ref(&self) -> PackRef {
        PackRef::new(self.meta.id.clone(), self.meta.key.clone())
    }
}

/// Upstream sends `null` for unset optional fields
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

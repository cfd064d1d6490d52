pub mod proto;
pub mod types;

pub use types::{CatalogEntry, PackManifest, PackMeta, PackRef, PackSummary, StickerRef};

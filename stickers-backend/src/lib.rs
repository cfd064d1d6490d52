pub mod cache;
pub mod catalog;
pub mod config;
pub mod content;
pub mod error;
pub mod handler;
pub mod locator;
pub mod logging;
pub mod packaging;
pub mod stickers;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{StickerError, StickerResult};
pub use stickers::{SignalStickers, StickerSettings};

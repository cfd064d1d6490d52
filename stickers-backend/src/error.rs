///! Error taxonomy of the sticker layer
use std::path::PathBuf;
use thiserror::Error;

pub type StickerResult<T> = Result<T, StickerError>;

#[derive(Debug, Error)]
pub enum StickerError {
    /// Input looked like a pack link but `pack_id` or `pack_key` is missing
    #[error("unrecognized pack URL: {0}")]
    MalformedPackUrl(String),

    /// Catalog or storage service failed, timed out or sent an unusable payload
    #[error("upstream unavailable ({target}): {reason}")]
    UpstreamUnavailable { target: String, reason: String },

    /// Local filesystem error while creating or writing a pack archive
    #[error("failed to package pack into {path:?}: {source}")]
    PackagingFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StickerError {
    pub fn upstream(target: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StickerError::UpstreamUnavailable {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn packaging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StickerError::PackagingFailure {
            path: path.into(),
            source,
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, StickerError::UpstreamUnavailable { .. })
    }
}

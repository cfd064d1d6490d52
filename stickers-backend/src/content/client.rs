///! HTTP client for the sticker storage service (CDN)
use async_trait::async_trait;
use prost::Message;
use reqwest::Client;
use std::time::Duration;
use stickers_common::proto::Pack;
use stickers_common::{PackManifest, PackRef};

use super::crypto::PackKeys;
use super::{manifest_from_proto, PackSource};
use crate::error::{StickerError, StickerResult};
use crate::locator::pack_url;

pub const DEFAULT_CDN_URL: &str = "https://cdn-ca.signal.org";

pub struct SignalCdnClient {
    client: Client,
    base_url: String,
}

impl SignalCdnClient {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> StickerResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| StickerError::upstream(&base_url, format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn manifest_url(&self, pack: &PackRef) -> String {
        format!("{}/stickers/{}/manifest.proto", self.base_url, urlencoding::encode(&pack.id))
    }

    fn sticker_url(&self, pack: &PackRef, sticker_id: u32) -> String {
        format!("{}/stickers/{}/full/{}", self.base_url, urlencoding::encode(&pack.id), sticker_id)
    }

    /// GET `url` and decrypt the body with the pack's keys
    async fn fetch_sealed(&self, url: &str, pack: &PackRef) -> StickerResult<Vec<u8>> {
        let keys = PackKeys::derive(&pack.key).map_err(|e| {
            tracing::debug!("Rejecting pack {}: {}", pack.id, e);
            StickerError::MalformedPackUrl(pack_url(pack))
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StickerError::upstream(url, e))?;

        if !response.status().is_success() {
            return Err(StickerError::upstream(url, format!("HTTP error {}", response.status())));
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| StickerError::upstream(url, format!("failed to read body: {}", e)))?;

        keys.decrypt(&payload).map_err(|e| StickerError::upstream(url, e))
    }
}

#[async_trait]
impl PackSource for SignalCdnClient {
    async fn fetch_manifest(&self, pack: &PackRef) -> StickerResult<PackManifest> {
        let url = self.manifest_url(pack);
        tracing::info!("Fetching manifest of pack {}", pack.id);

        let plaintext = self.fetch_sealed(&url, pack).await?;
        let message = Pack::decode(plaintext.as_slice())
            .map_err(|e| StickerError::upstream(&url, format!("invalid manifest: {}", e)))?;

        let manifest = manifest_from_proto(pack, message)?;
        tracing::debug!(
            "Pack {} '{}' has {} stickers",
            manifest.id,
            manifest.title,
            manifest.stickers.len()
        );
        Ok(manifest)
    }

    async fn fetch_sticker(&self, pack: &PackRef, sticker_id: u32) -> StickerResult<Vec<u8>> {
        let url = self.sticker_url(pack, sticker_id);
        tracing::debug!("Fetching sticker {} of pack {}", sticker_id, pack.id);
        self.fetch_sealed(&url, pack).await
    }
}

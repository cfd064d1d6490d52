///! HTTP client for the pack catalog
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use stickers_common::CatalogEntry;

use super::CatalogSource;
use crate::error::{StickerError, StickerResult};

pub const DEFAULT_CATALOG_URL: &str = "https://api.signalstickers.com/v1/packs/";

pub struct CatalogClient {
    client: Client,
    url: String,
}

impl CatalogClient {
    pub fn new(url: impl Into<String>, user_agent: &str, timeout: Duration) -> StickerResult<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| StickerError::upstream(&url, format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_catalog(&self) -> StickerResult<Vec<CatalogEntry>> {
        tracing::info!("Fetching pack catalog from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| StickerError::upstream(&self.url, e))?;

        if !response.status().is_success() {
            return Err(StickerError::upstream(
                &self.url,
                format!("HTTP error {}", response.status()),
            ));
        }

        let entries: Vec<CatalogEntry> = response
            .json()
            .await
            .map_err(|e| StickerError::upstream(&self.url, format!("invalid catalog: {}", e)))?;

        tracing::info!("Fetched {} catalog entries", entries.len());
        Ok(entries)
    }
}

//! AtomicAssets indexer client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::{AssetQuery, InventorySource, RawAsset, SchedulerError};

/// Path of the asset listing endpoint.
pub const ASSETS_PATH: &str = "/atomicassets/v1/assets";

#[derive(Debug, Deserialize)]
struct AssetsResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Vec<RawAsset>,
}

/// Lists assets through an AtomicAssets-compatible HTTP indexer.
#[derive(Debug, Clone)]
pub struct AtomicAssetsClient {
    base_url: String,
    client: Client,
}

impl AtomicAssetsClient {
    /// Create a client for `base_url` (no trailing path).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client reusing an existing HTTP client.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Full listing URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, ASSETS_PATH)
    }
}

#[async_trait]
impl InventorySource for AtomicAssetsClient {
    async fn fetch_page(
        &self,
        query: &AssetQuery,
        page: u32,
        limit: u32,
    ) -> Result<Vec<RawAsset>, SchedulerError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("page", page.to_string()),
                ("limit", limit.to_string()),
                ("owner", query.owner.clone()),
                ("collection_name", query.collection.clone()),
                ("template_id", query.template_id.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SchedulerError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SchedulerError::Fetch(format!(
                "indexer returned {}",
                response.status()
            )));
        }

        let body: AssetsResponse = response
            .json()
            .await
            .map_err(|e| SchedulerError::Malformed(e.to_string()))?;
        if body.success == Some(false) {
            return Err(SchedulerError::Fetch("indexer reported failure".into()));
        }
        Ok(body.data)
    }
}

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::info;

use crate::models::CatalogEntry;

/// Per-user saved records, keyed `users/{user}/list/{record id}` in the hosted
/// document store. Auth flows live outside this service; callers hand us an
/// already-resolved user id.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn list(&self, user_id: &str) -> Result<Vec<CatalogEntry>>;
    async fn save(&self, user_id: &str, entry: &CatalogEntry) -> Result<()>;
    async fn remove(&self, user_id: &str, entry_id: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct DocStoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<CatalogEntry>,
}

impl DocStoreClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let user_agent = format!("reelgrid/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(8))
            .user_agent(user_agent)
            .build()
            .context("Failed to build document store HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let base_url = env::var("DOCSTORE_URL").context("DOCSTORE_URL not set")?;
        let api_key = env::var("DOCSTORE_API_KEY").context("DOCSTORE_API_KEY not set")?;
        Self::new(base_url, api_key)
    }

    fn collection_url(&self, user_id: &str) -> String {
        format!(
            "{}/users/{}/list",
            self.base_url,
            urlencoding::encode(user_id)
        )
    }

    fn document_url(&self, user_id: &str, entry_id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(user_id),
            urlencoding::encode(entry_id)
        )
    }
}

#[async_trait]
impl WatchlistStore for DocStoreClient {
    async fn list(&self, user_id: &str) -> Result<Vec<CatalogEntry>> {
        let response = self
            .client
            .get(self.collection_url(user_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Watchlist list request failed")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // No collection yet means an empty list, not a failure.
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(anyhow!("Failed to list watchlist. Status: {}", status));
        }
        let parsed: ListResponse = response
            .json()
            .await
            .context("Failed to parse watchlist response")?;
        Ok(parsed.items)
    }

    async fn save(&self, user_id: &str, entry: &CatalogEntry) -> Result<()> {
        let response = self
            .client
            .put(self.document_url(user_id, &entry.id))
            .bearer_auth(&self.api_key)
            .json(entry)
            .send()
            .await
            .context("Watchlist save request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "Failed to save '{}' to watchlist. Status: {}",
                entry.title,
                status
            ));
        }
        info!("Saved '{}' to watchlist for user {}", entry.title, user_id);
        Ok(())
    }

    async fn remove(&self, user_id: &str, entry_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.document_url(user_id, entry_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Watchlist remove request failed")?;

        let status = response.status();
        // Removing a record that is already gone is fine.
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(anyhow!(
                "Failed to remove '{}' from watchlist. Status: {}",
                entry_id,
                status
            ));
        }
        Ok(())
    }
}

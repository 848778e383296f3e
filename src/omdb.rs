use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::CatalogError;

const OMDB_BASE: &str = "https://www.omdbapi.com";

/// OMDB caps paged search at 100 pages.
pub const MAX_SEARCH_PAGE: u32 = 100;

#[async_trait]
pub trait OmdbApi: Send + Sync {
    async fn lookup_by_id(&self, imdb_id: &str) -> Result<OmdbRecord, CatalogError>;
    async fn search(&self, query: &str, page: u32) -> Result<OmdbSearchPage, CatalogError>;
}

/// A record as OMDB returns it. Only the fields the normalizer and view layer
/// care about are kept; everything else rides along in the envelope untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OmdbRecord {
    #[serde(rename = "imdbID")]
    pub imdb_id: Option<String>,
    #[serde(rename = "Title", alias = "title")]
    pub title: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Released")]
    pub released: Option<String>,
    #[serde(rename = "Poster")]
    pub poster: Option<String>,
    #[serde(rename = "Plot")]
    pub plot: Option<String>,
    #[serde(rename = "Genre")]
    pub genre: Option<String>,
    #[serde(rename = "Director")]
    pub director: Option<String>,
    #[serde(rename = "Actors")]
    pub actors: Option<String>,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    #[serde(rename = "Type")]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OmdbSearchPage {
    pub records: Vec<OmdbRecord>,
    pub total_results: u32,
}

#[derive(Debug, Clone)]
pub struct OmdbClient {
    client: Client,
    api_key: String,
}

impl OmdbClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let user_agent = format!("reelgrid/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(8))
            .user_agent(user_agent)
            .build()
            .context("Failed to build OMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OMDB_API_KEY").context("OMDB_API_KEY not set")?;
        Self::new(api_key)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, CatalogError> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(CatalogError::from_status(status));
        }
        serde_json::from_str(&text).map_err(|e| CatalogError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl OmdbApi for OmdbClient {
    async fn lookup_by_id(&self, imdb_id: &str) -> Result<OmdbRecord, CatalogError> {
        let imdb_id = imdb_id.trim();
        if imdb_id.is_empty() {
            return Err(CatalogError::Validation(
                "imdb id must not be empty".to_string(),
            ));
        }

        let url = format!(
            "{OMDB_BASE}/?apikey={}&i={}&plot=full",
            self.api_key,
            urlencoding::encode(imdb_id)
        );
        let envelope: LookupEnvelope = self.get_json(&url).await?;
        if envelope.response.as_deref() == Some("False") {
            return Err(false_body_error(envelope.error.as_deref()));
        }
        Ok(envelope.record)
    }

    async fn search(&self, query: &str, page: u32) -> Result<OmdbSearchPage, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::Validation(
                "search query must not be empty".to_string(),
            ));
        }

        let url = format!(
            "{OMDB_BASE}/?apikey={}&s={}&type=movie&page={}",
            self.api_key,
            urlencoding::encode(query),
            clamp_page(page)
        );
        let envelope: SearchEnvelope = self.get_json(&url).await?;
        if envelope.response.as_deref() == Some("False") {
            // "Movie not found!" on a search simply means zero hits.
            return match false_body_error(envelope.error.as_deref()) {
                CatalogError::NotFound => Ok(OmdbSearchPage {
                    records: Vec::new(),
                    total_results: 0,
                }),
                other => Err(other),
            };
        }
        let total_results = envelope
            .total_results
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        Ok(OmdbSearchPage {
            records: envelope.search.unwrap_or_default(),
            total_results,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LookupEnvelope {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(flatten)]
    record: OmdbRecord,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "Search")]
    search: Option<Vec<OmdbRecord>>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

pub(crate) fn clamp_page(page: u32) -> u32 {
    page.clamp(1, MAX_SEARCH_PAGE)
}

/// OMDB reports errors in a 200 body: `{"Response":"False","Error":"..."}`.
fn false_body_error(message: Option<&str>) -> CatalogError {
    let message = message.unwrap_or("unknown OMDB error");
    let lower = message.to_ascii_lowercase();
    if lower.contains("not found") || lower.contains("incorrect imdb id") {
        CatalogError::NotFound
    } else if lower.contains("limit") {
        CatalogError::RateLimited
    } else {
        CatalogError::MalformedResponse(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clamps_page_to_supported_range() {
        assert_eq!(clamp_page(0), 1);
        assert_eq!(clamp_page(1), 1);
        assert_eq!(clamp_page(42), 42);
        assert_eq!(clamp_page(1000), MAX_SEARCH_PAGE);
    }

    #[test]
    fn maps_false_body_messages_into_taxonomy() {
        assert!(matches!(
            false_body_error(Some("Movie not found!")),
            CatalogError::NotFound
        ));
        assert!(matches!(
            false_body_error(Some("Incorrect IMDb ID.")),
            CatalogError::NotFound
        ));
        assert!(matches!(
            false_body_error(Some("Request limit reached!")),
            CatalogError::RateLimited
        ));
        assert!(matches!(
            false_body_error(Some("Invalid API key!")),
            CatalogError::MalformedResponse(_)
        ));
    }

    #[test]
    fn deserializes_search_envelope() {
        let value = json!({
            "Search": [
                { "Title": "Heat", "Year": "1995", "imdbID": "tt0113277", "Poster": "https://img/heat.jpg" }
            ],
            "totalResults": "31",
            "Response": "True"
        });
        let envelope: SearchEnvelope = serde_json::from_value(value).expect("envelope deserialize");
        let records = envelope.search.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.as_deref(), Some("Heat"));
        assert_eq!(envelope.total_results.as_deref(), Some("31"));
    }

    #[test]
    fn record_accepts_lowercase_title_key() {
        let value = json!({ "title": "Converted", "imdbID": "tt0000001" });
        let record: OmdbRecord = serde_json::from_value(value).expect("record deserialize");
        assert_eq!(record.title.as_deref(), Some("Converted"));
    }

    #[tokio::test]
    async fn empty_query_fails_before_any_network_call() {
        // Key is bogus on purpose; validation must reject first.
        let client = OmdbClient::new("test-key").unwrap();
        let err = client.search("   ", 1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}

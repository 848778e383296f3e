use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::error::CatalogError;
use crate::omdb::clamp_page;

const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/original";

/// TMDB movie genre ids used by the fixed shelf batteries.
pub const GENRE_ACTION: u32 = 28;
pub const GENRE_COMEDY: u32 = 35;

static GENRE_NAMES: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (28, "Action"),
        (12, "Adventure"),
        (16, "Animation"),
        (35, "Comedy"),
        (80, "Crime"),
        (99, "Documentary"),
        (18, "Drama"),
        (10751, "Family"),
        (14, "Fantasy"),
        (36, "History"),
        (27, "Horror"),
        (10402, "Music"),
        (9648, "Mystery"),
        (10749, "Romance"),
        (878, "Science Fiction"),
        (10770, "TV Movie"),
        (53, "Thriller"),
        (10752, "War"),
        (37, "Western"),
    ])
});

pub fn genre_name(id: u32) -> Option<&'static str> {
    GENRE_NAMES.get(&id).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Popular,
    TopRated,
    Trending,
}

impl Category {
    fn path(&self) -> &'static str {
        match self {
            Category::Popular => "/movie/popular",
            Category::TopRated => "/movie/top_rated",
            Category::Trending => "/trending/movie/week",
        }
    }
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn list_category(&self, category: Category) -> Result<Vec<TmdbRecord>, CatalogError>;
    async fn list_genre(&self, genre_id: u32) -> Result<Vec<TmdbRecord>, CatalogError>;
    async fn search(&self, query: &str, page: u32) -> Result<TmdbSearchPage, CatalogError>;
    async fn lookup_by_id(&self, id: u64) -> Result<TmdbRecord, CatalogError>;
}

/// A record as TMDB returns it in list/search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbRecord {
    pub id: u64,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct TmdbSearchPage {
    pub records: Vec<TmdbRecord>,
    pub total_results: u32,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let user_agent = format!("reelgrid/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(8))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
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
impl TmdbApi for TmdbClient {
    async fn list_category(&self, category: Category) -> Result<Vec<TmdbRecord>, CatalogError> {
        let url = format!(
            "{TMDB_BASE}{}?api_key={}&language=en-US",
            category.path(),
            self.api_key
        );
        let data: ListResponse = self.get_json(&url).await?;
        Ok(data.results)
    }

    async fn list_genre(&self, genre_id: u32) -> Result<Vec<TmdbRecord>, CatalogError> {
        let url = format!(
            "{TMDB_BASE}/discover/movie?api_key={}&with_genres={}&sort_by=popularity.desc&language=en-US",
            self.api_key, genre_id
        );
        let data: ListResponse = self.get_json(&url).await?;
        Ok(data.results)
    }

    async fn search(&self, query: &str, page: u32) -> Result<TmdbSearchPage, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::Validation(
                "search query must not be empty".to_string(),
            ));
        }

        let url = format!(
            "{TMDB_BASE}/search/movie?api_key={}&query={}&page={}&language=en-US",
            self.api_key,
            urlencoding::encode(query),
            clamp_page(page)
        );
        let data: SearchResponse = self.get_json(&url).await?;
        Ok(TmdbSearchPage {
            records: data.results,
            total_results: data.total_results,
        })
    }

    async fn lookup_by_id(&self, id: u64) -> Result<TmdbRecord, CatalogError> {
        let url = format!(
            "{TMDB_BASE}/movie/{id}?api_key={}&language=en-US",
            self.api_key
        );
        // The detail endpoint nests genres as objects; flatten them back to ids
        // so detail lookups normalize the same way list results do.
        let detail: DetailResponse = self.get_json(&url).await?;
        Ok(detail.into_record())
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    results: Vec<TmdbRecord>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<TmdbRecord>,
    #[serde(default)]
    total_results: u32,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    id: u64,
    title: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genres: Vec<GenreObject>,
}

#[derive(Debug, Deserialize)]
struct GenreObject {
    id: u32,
}

impl DetailResponse {
    fn into_record(self) -> TmdbRecord {
        TmdbRecord {
            id: self.id,
            title: self.title,
            overview: self.overview,
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            release_date: self.release_date,
            vote_average: self.vote_average,
            genre_ids: self.genres.into_iter().map(|g| g.id).collect(),
        }
    }
}

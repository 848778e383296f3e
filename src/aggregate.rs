use futures::future::join_all;
use std::sync::Arc;
use tracing::warn;

use crate::error::CatalogError;
use crate::models::{CatalogEntry, Shelf, SourceRecord};
use crate::normalize::normalize;
use crate::omdb::OmdbApi;
use crate::tmdb::{Category, TmdbApi, GENRE_ACTION, GENRE_COMEDY};

/// One named fetch the aggregator will run for a shelf.
#[derive(Debug, Clone)]
pub struct ShelfRequest {
    pub title: String,
    pub spec: FetchSpec,
}

impl ShelfRequest {
    pub fn new(title: impl Into<String>, spec: FetchSpec) -> Self {
        Self {
            title: title.into(),
            spec,
        }
    }
}

/// Which client operation backs a shelf.
#[derive(Debug, Clone)]
pub enum FetchSpec {
    TmdbCategory(Category),
    TmdbGenre(u32),
    /// A fixed batch of individual OMDB lookups, resolved concurrently.
    OmdbIds(Vec<String>),
    OmdbSearch(String),
}

#[derive(Debug, Clone)]
pub struct SearchResults {
    pub records: Vec<CatalogEntry>,
    pub total_results: u32,
}

/// Fans a battery of shelf requests out across both catalog clients, absorbing
/// per-call failures so one dead upstream never takes the page down.
#[derive(Clone)]
pub struct Aggregator {
    omdb: Arc<dyn OmdbApi>,
    tmdb: Arc<dyn TmdbApi>,
}

impl Aggregator {
    pub fn new(omdb: Arc<dyn OmdbApi>, tmdb: Arc<dyn TmdbApi>) -> Self {
        Self { omdb, tmdb }
    }

    /// Build all requested shelves concurrently. Output order always matches
    /// request order; a failed shelf settles as an error shelf without
    /// cancelling or delaying its siblings. No retries, no partial emission.
    pub async fn build_shelves(&self, requests: Vec<ShelfRequest>) -> Vec<Shelf> {
        join_all(requests.into_iter().map(|r| self.build_shelf(r))).await
    }

    async fn build_shelf(&self, request: ShelfRequest) -> Shelf {
        let ShelfRequest { title, spec } = request;
        let outcome = match spec {
            FetchSpec::TmdbCategory(category) => self
                .tmdb
                .list_category(category)
                .await
                .map(normalized_tmdb),
            FetchSpec::TmdbGenre(genre_id) => {
                self.tmdb.list_genre(genre_id).await.map(normalized_tmdb)
            }
            FetchSpec::OmdbSearch(query) => self
                .omdb
                .search(&query, 1)
                .await
                .map(|page| normalized_omdb(page.records)),
            FetchSpec::OmdbIds(ids) => return self.build_id_batch(title, ids).await,
        };

        match outcome {
            Ok(records) => Shelf::new(title, records),
            Err(e) => {
                warn!("Shelf '{}' failed: {}", title, e);
                Shelf::failed(title, e.to_string())
            }
        }
    }

    /// Resolve every id in the batch concurrently. Failed lookups are dropped
    /// and the survivors keep the id-list order; the shelf only reports an
    /// error when the entire batch came back empty-handed.
    async fn build_id_batch(&self, title: String, ids: Vec<String>) -> Shelf {
        let outcomes = join_all(ids.iter().map(|id| self.omdb.lookup_by_id(id))).await;

        let mut records = Vec::new();
        let mut last_error: Option<CatalogError> = None;
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(record) => records.push(normalize(&SourceRecord::Omdb(record), index)),
                Err(e) => {
                    warn!("Lookup '{}' for shelf '{}' failed: {}", ids[index], title, e);
                    last_error = Some(e);
                }
            }
        }

        if records.is_empty() {
            if let Some(e) = last_error {
                return Shelf::failed(title, e.to_string());
            }
        }
        Shelf::new(title, records)
    }

    /// Combined search across both catalogs. Each side settles independently;
    /// only when both fail does the caller see an error. Empty queries are the
    /// caller's mistake and propagate immediately.
    pub async fn search(&self, query: &str, page: u32) -> Result<SearchResults, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::Validation(
                "search query must not be empty".to_string(),
            ));
        }

        let (omdb, tmdb) = tokio::join!(self.omdb.search(query, page), self.tmdb.search(query, page));

        if let (Err(omdb_err), Err(tmdb_err)) = (&omdb, &tmdb) {
            warn!(
                "Search '{}' failed on both catalogs: {} / {}",
                query, omdb_err, tmdb_err
            );
            return Err(omdb_err.clone());
        }

        let mut records = Vec::new();
        let mut total_results = 0;
        match omdb {
            Ok(page) => {
                total_results += page.total_results;
                records.extend(normalized_omdb(page.records));
            }
            Err(e) => warn!("OMDB search '{}' failed: {}", query, e),
        }
        match tmdb {
            Ok(page) => {
                total_results += page.total_results;
                let offset = records.len();
                records.extend(page.records.iter().enumerate().map(|(i, r)| {
                    normalize(&SourceRecord::Tmdb(r.clone()), offset + i)
                }));
            }
            Err(e) => warn!("TMDB search '{}' failed: {}", query, e),
        }

        Ok(SearchResults {
            records,
            total_results,
        })
    }
}

fn normalized_omdb(records: Vec<crate::omdb::OmdbRecord>) -> Vec<CatalogEntry> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| normalize(&SourceRecord::Omdb(r), i))
        .collect()
}

fn normalized_tmdb(records: Vec<crate::tmdb::TmdbRecord>) -> Vec<CatalogEntry> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| normalize(&SourceRecord::Tmdb(r), i))
        .collect()
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// The fixed movie battery the browse page renders.
pub fn movie_shelves() -> Vec<ShelfRequest> {
    vec![
        ShelfRequest::new(
            "Drama Classics",
            FetchSpec::OmdbIds(ids(&["tt0111161", "tt0068646", "tt0050083", "tt0108052"])),
        ),
        ShelfRequest::new(
            "Trending Now",
            FetchSpec::OmdbIds(ids(&[
                "tt0111161", "tt0068646", "tt0468569", "tt0071562", "tt0050083", "tt0108052",
                "tt0167260", "tt0110912",
            ])),
        ),
        ShelfRequest::new("Action Movies", FetchSpec::TmdbGenre(GENRE_ACTION)),
        ShelfRequest::new("Comedy Movies", FetchSpec::TmdbGenre(GENRE_COMEDY)),
        ShelfRequest::new(
            "Horror Movies",
            FetchSpec::OmdbIds(ids(&["tt0081505", "tt0078748", "tt0070047", "tt0054215"])),
        ),
        ShelfRequest::new(
            "Romance Movies",
            FetchSpec::OmdbIds(ids(&["tt0338013", "tt0332280", "tt0100405", "tt0118799"])),
        ),
        ShelfRequest::new(
            "Documentaries",
            FetchSpec::OmdbIds(ids(&["tt1663202", "tt1772925", "tt2125608", "tt1949969"])),
        ),
        ShelfRequest::new(
            "Marvel Movies",
            FetchSpec::OmdbSearch("marvel".to_string()),
        ),
        ShelfRequest::new(
            "Star Wars Movies",
            FetchSpec::OmdbSearch("star wars".to_string()),
        ),
        ShelfRequest::new(
            "Harry Potter Movies",
            FetchSpec::OmdbSearch("harry potter".to_string()),
        ),
        ShelfRequest::new(
            "Lord of the Rings Movies",
            FetchSpec::OmdbSearch("lord of the rings".to_string()),
        ),
        ShelfRequest::new(
            "Disney Movies",
            FetchSpec::OmdbSearch("disney".to_string()),
        ),
        ShelfRequest::new("Popular Movies", FetchSpec::TmdbCategory(Category::Popular)),
    ]
}

/// The fixed TV battery. OMDB has no discovery endpoints, so every TV shelf is
/// a curated id batch.
pub fn tv_shelves() -> Vec<ShelfRequest> {
    vec![
        ShelfRequest::new(
            "Popular TV Shows",
            FetchSpec::OmdbIds(ids(&[
                "tt0944947", "tt0903747", "tt0108778", "tt0098904", "tt0141842", "tt7366338",
                "tt0386676", "tt2442560",
            ])),
        ),
        ShelfRequest::new(
            "Trending TV Shows",
            FetchSpec::OmdbIds(ids(&[
                "tt7335184", "tt8111088", "tt1190634", "tt5180504", "tt2356777", "tt8420184",
                "tt9174558", "tt1844624",
            ])),
        ),
        ShelfRequest::new(
            "Top Rated TV Shows",
            FetchSpec::OmdbIds(ids(&[
                "tt0903747", "tt7366338", "tt0795176", "tt0185906", "tt0944947", "tt1475582",
                "tt0306414", "tt7920978",
            ])),
        ),
        ShelfRequest::new(
            "Sci-Fi TV Shows",
            FetchSpec::OmdbIds(ids(&["tt0407362", "tt0112178", "tt0460681", "tt0118480"])),
        ),
        ShelfRequest::new(
            "Drama TV Shows",
            FetchSpec::OmdbIds(ids(&["tt0944947", "tt0903747", "tt0141842", "tt7366338"])),
        ),
    ]
}

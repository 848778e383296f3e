use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use reelgrid::aggregate::movie_shelves;
use reelgrid::app::{build_router, AppState};
use reelgrid::error::CatalogError;
use reelgrid::models::{CatalogEntry, SourceRecord};
use reelgrid::normalize::normalize;
use reelgrid::omdb::{OmdbApi, OmdbRecord, OmdbSearchPage};
use reelgrid::tmdb::{Category, TmdbApi, TmdbRecord, TmdbSearchPage};
use reelgrid::watchlist::WatchlistStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

#[derive(Default)]
struct FakeOmdb {
    fail_all: bool,
    not_found_ids: Vec<String>,
}

fn omdb_record(id: &str) -> OmdbRecord {
    OmdbRecord {
        imdb_id: Some(id.to_string()),
        title: Some(format!("Movie {id}")),
        year: Some("1994".to_string()),
        poster: Some("https://img/poster.jpg".to_string()),
        plot: Some("A plot.".to_string()),
        imdb_rating: Some("8.4".to_string()),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl OmdbApi for FakeOmdb {
    async fn lookup_by_id(&self, imdb_id: &str) -> Result<OmdbRecord, CatalogError> {
        if self.fail_all {
            return Err(CatalogError::Network("connection refused".to_string()));
        }
        if self.not_found_ids.iter().any(|id| id == imdb_id) {
            return Err(CatalogError::NotFound);
        }
        Ok(omdb_record(imdb_id))
    }

    async fn search(&self, query: &str, _page: u32) -> Result<OmdbSearchPage, CatalogError> {
        if self.fail_all {
            return Err(CatalogError::Network("connection refused".to_string()));
        }
        Ok(OmdbSearchPage {
            records: vec![omdb_record(&format!("tt-{query}"))],
            total_results: 1,
        })
    }
}

#[derive(Default)]
struct FakeTmdb {
    fail_all: bool,
}

fn tmdb_record(id: u64) -> TmdbRecord {
    TmdbRecord {
        id,
        title: Some(format!("Tmdb {id}")),
        overview: Some("An overview.".to_string()),
        poster_path: Some("/poster.jpg".to_string()),
        release_date: Some("1999-03-31".to_string()),
        vote_average: Some(7.5),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn list_category(&self, _category: Category) -> Result<Vec<TmdbRecord>, CatalogError> {
        if self.fail_all {
            return Err(CatalogError::Network("timed out".to_string()));
        }
        Ok(vec![tmdb_record(1), tmdb_record(2)])
    }

    async fn list_genre(&self, genre_id: u32) -> Result<Vec<TmdbRecord>, CatalogError> {
        if self.fail_all {
            return Err(CatalogError::Network("timed out".to_string()));
        }
        Ok(vec![tmdb_record(genre_id as u64)])
    }

    async fn search(&self, _query: &str, _page: u32) -> Result<TmdbSearchPage, CatalogError> {
        if self.fail_all {
            return Err(CatalogError::Network("timed out".to_string()));
        }
        Ok(TmdbSearchPage {
            records: vec![tmdb_record(99)],
            total_results: 1,
        })
    }

    async fn lookup_by_id(&self, id: u64) -> Result<TmdbRecord, CatalogError> {
        if self.fail_all {
            return Err(CatalogError::Network("timed out".to_string()));
        }
        Ok(tmdb_record(id))
    }
}

#[derive(Default)]
struct FakeWatchlist {
    entries: Mutex<HashMap<String, Vec<CatalogEntry>>>,
}

#[async_trait::async_trait]
impl WatchlistStore for FakeWatchlist {
    async fn list(&self, user_id: &str) -> anyhow::Result<Vec<CatalogEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, user_id: &str, entry: &CatalogEntry) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let list = entries.entry(user_id.to_string()).or_default();
        list.retain(|e| e.id != entry.id);
        list.push(entry.clone());
        Ok(())
    }

    async fn remove(&self, user_id: &str, entry_id: &str) -> anyhow::Result<()> {
        if let Some(list) = self.entries.lock().unwrap().get_mut(user_id) {
            list.retain(|e| e.id != entry_id);
        }
        Ok(())
    }
}

fn app(omdb: FakeOmdb, tmdb: FakeTmdb) -> Router {
    build_router(AppState::new(
        Arc::new(omdb),
        Arc::new(tmdb),
        Arc::new(FakeWatchlist::default()),
    ))
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let res = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_is_ok() {
    let app = app(FakeOmdb::default(), FakeTmdb::default());
    let res = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn browse_keeps_battery_order_and_tolerates_one_dead_upstream() {
    // TMDB down entirely; the OMDB-backed shelves must still come through in
    // battery order and TMDB shelves degrade to per-shelf errors.
    let app = app(FakeOmdb::default(), FakeTmdb { fail_all: true });
    let (status, body) = get_json(&app, "/api/browse").await;
    assert_eq!(status, StatusCode::OK);

    let shelves = body["shelves"].as_array().unwrap();
    let expected: Vec<String> = movie_shelves().into_iter().map(|r| r.title).collect();
    let actual: Vec<&str> = shelves
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(actual, expected);

    let drama = &shelves[0];
    assert_eq!(drama["title"], "Drama Classics");
    assert_eq!(drama["records"].as_array().unwrap().len(), 4);
    assert!(drama["fetch_error"].is_null());

    let action = shelves
        .iter()
        .find(|s| s["title"] == "Action Movies")
        .unwrap();
    assert!(action["records"].as_array().unwrap().is_empty());
    assert!(action["fetch_error"].is_string());
}

#[tokio::test]
async fn browse_with_everything_down_is_a_page_level_error() {
    let app = app(FakeOmdb { fail_all: true, ..Default::default() }, FakeTmdb { fail_all: true });
    let (status, body) = get_json(&app, "/api/browse").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn search_rejects_empty_query() {
    let app = app(FakeOmdb::default(), FakeTmdb::default());
    let (status, body) = get_json(&app, "/api/search?q=%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn search_merges_results_from_both_catalogs() {
    let app = app(FakeOmdb::default(), FakeTmdb::default());
    let (status, body) = get_json(&app, "/api/search?q=heat&page=1").await;
    assert_eq!(status, StatusCode::OK);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(body["total_results"], 2);
    // OMDB results lead, TMDB results follow.
    assert_eq!(records[0]["source"], "omdb");
    assert_eq!(records[1]["source"], "tmdb");
}

#[tokio::test]
async fn title_lookup_routes_numeric_ids_to_tmdb_and_the_rest_to_omdb() {
    let app = app(FakeOmdb::default(), FakeTmdb::default());

    let (status, body) = get_json(&app, "/api/title/603").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Tmdb 603");
    assert_eq!(body["id"], "603");

    let (status, body) = get_json(&app, "/api/title/tt0113277").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Movie tt0113277");
    assert_eq!(body["rating_percent"], 84);
}

#[tokio::test]
async fn missing_title_is_not_found() {
    let app = app(
        FakeOmdb {
            not_found_ids: vec!["tt9999999".to_string()],
            ..Default::default()
        },
        FakeTmdb::default(),
    );
    let (status, _) = get_json(&app, "/api/title/tt9999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn watchlist_save_list_remove_roundtrip() {
    let app = app(FakeOmdb::default(), FakeTmdb::default());

    let entry = normalize(&SourceRecord::Omdb(omdb_record("tt0113277")), 0);
    let body = serde_json::to_string(&entry).unwrap();
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/list/user-1")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (status, body) = get_json(&app, "/api/list/user-1").await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "0113277");

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/list/user-1/0113277")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (_, body) = get_json(&app, "/api/list/user-1").await;
    assert!(body["items"].as_array().unwrap().is_empty());
}

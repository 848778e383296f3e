use crate::aggregate::{movie_shelves, tv_shelves, Aggregator};
use crate::error::CatalogError;
use crate::models::{CatalogEntry, Shelf, SourceRecord};
use crate::normalize::normalize;
use crate::omdb::{OmdbApi, OmdbClient};
use crate::tmdb::{TmdbApi, TmdbClient};
use crate::watchlist::{DocStoreClient, WatchlistStore};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub omdb: Arc<dyn OmdbApi>,
    pub tmdb: Arc<dyn TmdbApi>,
    pub watchlist: Arc<dyn WatchlistStore>,
    pub aggregator: Aggregator,
}

impl AppState {
    pub fn new(
        omdb: Arc<dyn OmdbApi>,
        tmdb: Arc<dyn TmdbApi>,
        watchlist: Arc<dyn WatchlistStore>,
    ) -> Self {
        let aggregator = Aggregator::new(omdb.clone(), tmdb.clone());
        Self {
            omdb,
            tmdb,
            watchlist,
            aggregator,
        }
    }
}

pub async fn run_server() -> Result<()> {
    let omdb: Arc<dyn OmdbApi> = Arc::new(OmdbClient::from_env()?);
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_env()?);
    let watchlist: Arc<dyn WatchlistStore> = Arc::new(DocStoreClient::from_env()?);
    let state = AppState::new(omdb, tmdb, watchlist);

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3172));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/browse", get(browse_movies))
        .route("/api/browse/tv", get(browse_tv))
        .route("/api/search", get(search))
        .route("/api/title/:id", get(title_detail))
        .route(
            "/api/list/:user",
            get(watchlist_index).put(watchlist_save),
        )
        .route("/api/list/:user/:id", delete(watchlist_remove))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn browse_movies(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    respond_shelves(state.aggregator.build_shelves(movie_shelves()).await)
}

async fn browse_tv(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    respond_shelves(state.aggregator.build_shelves(tv_shelves()).await)
}

/// Empty shelves stay in the payload (the frontend decides whether to hide
/// them); only a page where every shelf failed becomes a page-level error.
fn respond_shelves(shelves: Vec<Shelf>) -> (StatusCode, Json<Value>) {
    let all_failed = !shelves.is_empty()
        && shelves
            .iter()
            .all(|s| s.records.is_empty() && s.fetch_error.is_some());
    if all_failed {
        error!("Every shelf in the battery failed");
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "catalog temporarily unavailable",
                "shelves": shelves,
            })),
        );
    }
    (StatusCode::OK, Json(json!({ "shelves": shelves })))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    page: Option<u32>,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> (StatusCode, Json<Value>) {
    let query = params.q.unwrap_or_default();
    match state
        .aggregator
        .search(&query, params.page.unwrap_or(1))
        .await
    {
        Ok(results) => (
            StatusCode::OK,
            Json(json!({
                "records": results.records,
                "total_results": results.total_results,
            })),
        ),
        Err(e) => catalog_error_response(e),
    }
}

/// Ad hoc single-record lookup. Bare numbers are TMDB ids, anything else is
/// treated as an imdb id and sent to OMDB.
async fn title_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let record = if let Ok(tmdb_id) = id.parse::<u64>() {
        state
            .tmdb
            .lookup_by_id(tmdb_id)
            .await
            .map(SourceRecord::Tmdb)
    } else {
        state.omdb.lookup_by_id(&id).await.map(SourceRecord::Omdb)
    };
    match record {
        Ok(record) => (StatusCode::OK, Json(json!(normalize(&record, 0)))),
        Err(e) => catalog_error_response(e),
    }
}

async fn watchlist_index(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.watchlist.list(&user).await {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))),
        Err(e) => store_error_response(&user, e),
    }
}

async fn watchlist_save(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(entry): Json<CatalogEntry>,
) -> (StatusCode, Json<Value>) {
    if entry.id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "entry id must not be empty" })),
        );
    }
    match state.watchlist.save(&user, &entry).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "saved" }))),
        Err(e) => store_error_response(&user, e),
    }
}

async fn watchlist_remove(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    match state.watchlist.remove(&user, &id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "removed" }))),
        Err(e) => store_error_response(&user, e),
    }
}

fn catalog_error_response(err: CatalogError) -> (StatusCode, Json<Value>) {
    let status = match err {
        CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotFound => StatusCode::NOT_FOUND,
        CatalogError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        CatalogError::Network(_) | CatalogError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

fn store_error_response(user: &str, err: anyhow::Error) -> (StatusCode, Json<Value>) {
    error!("Watchlist operation failed for user {}: {:?}", user, err);
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": "watchlist store unavailable" })),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}

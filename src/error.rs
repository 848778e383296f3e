use reqwest::StatusCode;
use thiserror::Error;

/// Failures a catalog client can surface. The aggregator absorbs these per call;
/// only `Validation` is meant to reach the original caller synchronously.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),
    #[error("record not found")]
    NotFound,
    #[error("upstream rate limit hit")]
    RateLimited,
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    #[error("invalid request: {0}")]
    Validation(String),
}

impl CatalogError {
    /// Classify a non-success HTTP status from either upstream.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => CatalogError::NotFound,
            StatusCode::TOO_MANY_REQUESTS => CatalogError::RateLimited,
            other => CatalogError::Network(format!("upstream returned {}", other)),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts are deliberately folded into the network class; the aggregator
        // treats them identically to any other failed call.
        CatalogError::Network(err.to_string())
    }
}

use serde::{Deserialize, Serialize};

use crate::omdb::OmdbRecord;
use crate::tmdb::TmdbRecord;

/// Which upstream schema a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    Omdb,
    Tmdb,
}

/// A raw record from one of the two catalog services, tagged by schema so the
/// normalizer works off an explicit precedence table instead of probing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "schema", content = "record", rename_all = "snake_case")]
pub enum SourceRecord {
    Omdb(OmdbRecord),
    Tmdb(TmdbRecord),
}

/// The schema-independent representation the view layer consumes.
///
/// Invariants upheld by `normalize`: `id` is never empty, `rating_percent` is
/// within 0..=100, and `poster_url` always resolves to something renderable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub overview: String,
    pub poster_url: String,
    pub backdrop_url: Option<String>,
    pub release_year: String,
    pub rating_percent: u8,
    pub genre_tags: Vec<String>,
    pub source: Schema,
    /// Original record, kept for fields the unified shape does not cover.
    pub raw: SourceRecord,
}

/// A named, ordered group of entries corresponding to one UI shelf.
#[derive(Debug, Clone, Serialize)]
pub struct Shelf {
    pub title: String,
    pub records: Vec<CatalogEntry>,
    /// Set only when every underlying request for this shelf failed.
    pub fetch_error: Option<String>,
}

impl Shelf {
    pub fn new(title: impl Into<String>, records: Vec<CatalogEntry>) -> Self {
        Self {
            title: title.into(),
            records,
            fetch_error: None,
        }
    }

    pub fn failed(title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            records: Vec::new(),
            fetch_error: Some(error.into()),
        }
    }
}

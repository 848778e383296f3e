use crate::models::{CatalogEntry, Schema, SourceRecord};
use crate::tmdb::{genre_name, BACKDROP_BASE, POSTER_BASE};

/// Served by the frontend when neither upstream has an image.
pub const PLACEHOLDER_POSTER: &str = "/placeholder-movie.jpg";

/// OMDB's marker for an absent poster.
const NOT_AVAILABLE: &str = "N/A";

/// Map a source record into the unified shape. Total and deterministic: missing
/// or unrecognized fields become safe defaults, never errors.
///
/// `index` is the record's position within its batch; it is the id of last
/// resort when a record carries no usable identifier.
pub fn normalize(record: &SourceRecord, index: usize) -> CatalogEntry {
    match record {
        SourceRecord::Omdb(r) => CatalogEntry {
            id: omdb_id(r.imdb_id.as_deref(), index),
            title: r.title.clone().unwrap_or_default(),
            overview: r.plot.clone().unwrap_or_default(),
            poster_url: omdb_poster(r.poster.as_deref()),
            backdrop_url: None,
            release_year: r.year.clone().unwrap_or_default(),
            rating_percent: rating_from_str(r.imdb_rating.as_deref()),
            genre_tags: split_genres(r.genre.as_deref()),
            source: Schema::Omdb,
            raw: record.clone(),
        },
        SourceRecord::Tmdb(r) => CatalogEntry {
            id: r.id.to_string(),
            title: r.title.clone().unwrap_or_default(),
            overview: r.overview.clone().unwrap_or_default(),
            poster_url: r
                .poster_path
                .as_deref()
                .map(|p| format!("{POSTER_BASE}{p}"))
                .unwrap_or_else(|| PLACEHOLDER_POSTER.to_string()),
            backdrop_url: r
                .backdrop_path
                .as_deref()
                .map(|p| format!("{BACKDROP_BASE}{p}")),
            release_year: year_from_date(r.release_date.as_deref()),
            rating_percent: rating_from_vote(r.vote_average),
            genre_tags: r
                .genre_ids
                .iter()
                .filter_map(|id| genre_name(*id))
                .map(str::to_string)
                .collect(),
            source: Schema::Tmdb,
            raw: record.clone(),
        },
    }
}

/// Derive an id from an imdb identifier by stripping non-digit characters,
/// falling back to the positional index. Best effort only: distinct external
/// ids sharing a digit sequence collide, matching upstream behavior.
fn omdb_id(imdb_id: Option<&str>, index: usize) -> String {
    let digits: String = imdb_id
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        index.to_string()
    } else {
        digits
    }
}

fn omdb_poster(poster: Option<&str>) -> String {
    match poster {
        Some(url) if !url.is_empty() && url != NOT_AVAILABLE => url.to_string(),
        _ => PLACEHOLDER_POSTER.to_string(),
    }
}

/// OMDB ratings are 0-10 strings ("8.4"); scale to a percentage.
fn rating_from_str(rating: Option<&str>) -> u8 {
    rating
        .and_then(|r| r.parse::<f64>().ok())
        .map(scale_rating)
        .unwrap_or(0)
}

/// TMDB vote averages are 0-10 floats; scale to a percentage.
fn rating_from_vote(vote: Option<f64>) -> u8 {
    vote.map(scale_rating).unwrap_or(0)
}

/// Values outside the source's 0-10 scale are treated as missing.
fn scale_rating(value: f64) -> u8 {
    if (0.0..=10.0).contains(&value) {
        (value * 10.0).round() as u8
    } else {
        0
    }
}

fn year_from_date(date: Option<&str>) -> String {
    let date = date.unwrap_or_default();
    if date.len() >= 4 && date.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
        date[..4].to_string()
    } else {
        String::new()
    }
}

fn split_genres(genre: Option<&str>) -> Vec<String> {
    genre
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

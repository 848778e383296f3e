pub mod aggregate;
pub mod app;
pub mod error;
pub mod models;
pub mod normalize;
pub mod omdb;
pub mod tmdb;
pub mod watchlist;

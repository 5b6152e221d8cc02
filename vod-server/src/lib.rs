//! VOD HLS packaging server.
//!
//! Serves HLS playlists and MPEG-TS segments for stored MP4 assets. Each
//! request resolves a fragment list — from the persisted index when one
//! exists, by parsing the container otherwise — and renders the requested
//! artifact from it.

pub mod config;
pub mod error;
pub mod indexer;
pub mod movie;
pub mod routes;

pub use config::Config;
pub use routes::AppState;

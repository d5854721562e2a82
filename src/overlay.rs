//! Overlay marker script evaluated in-page after cookie priming.
//!
//! The default payload is embedded at compile time from `scripts/overlay.js`.
//! A configured path replaces it and is read fresh for every scrape.

use std::path::Path;

use crate::error::ScrapeError;

/// Embedded contents of `scripts/overlay.js`.
pub const OVERLAY_SCRIPT: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/scripts/overlay.js"));

/// Load the overlay payload, preferring `path` when given.
pub async fn load_overlay_script(path: Option<&Path>) -> Result<String, ScrapeError> {
    match path {
        None => Ok(OVERLAY_SCRIPT.to_string()),
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScrapeError::Overlay {
                path: path.display().to_string(),
                source,
            }),
    }
}

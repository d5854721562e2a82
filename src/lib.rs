//! Browser-driven page scraping.
//!
//! A [`PageScraper`] launches a browser session, primes cookies, navigates to
//! the target, waits for the network to go idle, scrolls until lazy content
//! stops loading, and then extracts readable text from the rendered HTML, a
//! PDF, or an arXiv paper depending on the URL.

pub mod arxiv;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod normalize;
pub mod orchestrator;
pub mod overlay;
pub mod pdf;
pub mod router;
pub mod runtime;
pub mod scroll;

pub use config::{BrowserEngine, ScraperConfig, ScraperConfigOverrides, Verbosity};
pub use error::{ScrapeError, ScrapeErrorKind, ScrapeFailure, ScrapeResult, render_result};
pub use orchestrator::{PageScraper, ScrapeRequest, SessionHandle};

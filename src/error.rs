//! Error types for a scrape run and the tagged failure handed to callers.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arxiv::ArxivError;
use crate::browser::BrowserRuntimeError;
use crate::pdf::PdfError;

/// Message returned when a request arrives without a URL.
pub const URL_NOT_SPECIFIED: &str =
    "A URL was not specified, cancelling request to browse website.";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("URL not specified")]
    InvalidRequest,
    #[error("failed to prime cookies from {url}")]
    CookiePriming {
        url: String,
        #[source]
        source: BrowserRuntimeError,
    },
    #[error(transparent)]
    Browser(#[from] BrowserRuntimeError),
    #[error("failed to read overlay script {path}")]
    Overlay {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Pdf(#[from] PdfError),
    #[error(transparent)]
    Arxiv(#[from] ArxivError),
    #[error("Percentage should be between 0 and 1, got {ratio}")]
    InvalidArgument { ratio: f64 },
    #[error("{what} did not finish within {elapsed:?}")]
    Timeout { what: &'static str, elapsed: Duration },
    #[error("page height still growing after {iterations} scroll cycles")]
    ScrollNotConverged { iterations: u32 },
}

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeErrorKind {
    InvalidRequest,
    CookiePrimingFailure,
    PipelineFailure,
    InvalidArgument,
    Timeout,
}

impl ScrapeError {
    pub fn kind(&self) -> ScrapeErrorKind {
        match self {
            ScrapeError::InvalidRequest => ScrapeErrorKind::InvalidRequest,
            ScrapeError::CookiePriming { .. } => ScrapeErrorKind::CookiePrimingFailure,
            ScrapeError::InvalidArgument { .. } => ScrapeErrorKind::InvalidArgument,
            ScrapeError::Timeout { .. }
            | ScrapeError::ScrollNotConverged { .. }
            | ScrapeError::Browser(BrowserRuntimeError::Timeout { .. }) => ScrapeErrorKind::Timeout,
            ScrapeError::Browser(_)
            | ScrapeError::Overlay { .. }
            | ScrapeError::Pdf(_)
            | ScrapeError::Arxiv(_) => ScrapeErrorKind::PipelineFailure,
        }
    }
}

/// Failure half of a [`ScrapeResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeFailure {
    pub kind: ScrapeErrorKind,
    pub message: String,
    /// Source chain of the underlying error, outermost first.
    pub trace: String,
}

impl ScrapeFailure {
    pub fn from_error(err: &ScrapeError) -> Self {
        let message = match err {
            ScrapeError::InvalidRequest => URL_NOT_SPECIFIED.to_string(),
            other => other.to_string(),
        };
        Self {
            kind: err.kind(),
            message,
            trace: error_chain(err),
        }
    }

    /// Text form for callers that only handle strings.
    pub fn render(&self) -> String {
        match self.kind {
            ScrapeErrorKind::InvalidRequest => self.message.clone(),
            _ => format!(
                "An error occurred: {}\n\nStack trace:\n{}",
                self.message, self.trace
            ),
        }
    }
}

impl fmt::Display for ScrapeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ScrapeFailure {}

impl From<ScrapeError> for ScrapeFailure {
    fn from(err: ScrapeError) -> Self {
        ScrapeFailure::from_error(&err)
    }
}

/// Normalized text on success, tagged failure otherwise.
pub type ScrapeResult = Result<String, ScrapeFailure>;

/// Collapse a [`ScrapeResult`] into the always-a-string form.
pub fn render_result(result: &ScrapeResult) -> String {
    match result {
        Ok(text) => text.clone(),
        Err(failure) => failure.render(),
    }
}

/// Format an error and its sources, one per line.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut lines = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        lines.push(format!("caused by: {source}"));
        current = source.source();
    }
    lines.join("\n")
}

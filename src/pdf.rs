//! PDF text extraction collaborator.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to download PDF from {url}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} did not return a PDF document")]
    NotPdf { url: String },
    #[error("failed to extract text from PDF: {0}")]
    Extract(String),
    #[error("failed to build PDF download client")]
    Client(#[source] reqwest::Error),
}

/// Turns a direct PDF URL into text.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String, PdfError>;
}

/// Downloads the document with reqwest and parses it with `pdf-extract`.
#[derive(Debug, Clone)]
pub struct HttpPdfExtractor {
    client: reqwest::Client,
}

impl HttpPdfExtractor {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client sending `user_agent` with a 60 second request timeout.
    pub fn try_with_user_agent(user_agent: &str) -> Result<Self, PdfError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(PdfError::Client)?;
        Ok(Self { client })
    }

    /// Like [`Self::try_with_user_agent`], falling back to a stock client.
    pub fn with_user_agent(user_agent: &str) -> Self {
        Self::try_with_user_agent(user_agent).unwrap_or_else(|err| {
            log::warn!(
                "{}; PDF downloads fall back to the default client",
                crate::error::error_chain(&err)
            );
            Self::new(reqwest::Client::new())
        })
    }
}

#[async_trait]
impl PdfExtractor for HttpPdfExtractor {
    async fn extract(&self, url: &str) -> Result<String, PdfError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| PdfError::Download {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PdfError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|source| PdfError::Download {
            url: url.to_string(),
            source,
        })?;

        if !is_pdf(content_type.as_deref(), &bytes) {
            return Err(PdfError::NotPdf {
                url: url.to_string(),
            });
        }

        tokio::task::spawn_blocking(move || extract_text_from_bytes(&bytes))
            .await
            .map_err(|err| PdfError::Extract(err.to_string()))?
    }
}

/// Parse an in-memory PDF.
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String, PdfError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|err| PdfError::Extract(err.to_string()))
}

/// True when the content type or the leading bytes identify a PDF.
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    content_type.contains("application/pdf") || head.starts_with(b"%PDF-")
}

//! arXiv paper retrieval by identifier.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::pdf::{PdfError, PdfExtractor};

#[derive(Debug, Error)]
pub enum ArxivError {
    #[error("arXiv identifier is empty")]
    EmptyId,
    #[error("failed to fetch arXiv paper {id}")]
    Fetch {
        id: String,
        #[source]
        source: PdfError,
    },
}

/// Turns an arXiv identifier (the trailing URL segment) into text.
#[async_trait]
pub trait ArxivExtractor: Send + Sync {
    async fn extract(&self, id: &str) -> Result<String, ArxivError>;
}

/// Fetches `{base}/pdf/{id}` and hands it to a [`PdfExtractor`].
#[derive(Clone)]
pub struct ArxivPdfExtractor {
    base_url: String,
    pdf: Arc<dyn PdfExtractor>,
}

impl ArxivPdfExtractor {
    pub fn new(base_url: impl Into<String>, pdf: Arc<dyn PdfExtractor>) -> Self {
        Self {
            base_url: base_url.into(),
            pdf,
        }
    }

    pub fn pdf_url(&self, id: &str) -> String {
        format!("{}/pdf/{}", self.base_url.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl ArxivExtractor for ArxivPdfExtractor {
    async fn extract(&self, id: &str) -> Result<String, ArxivError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ArxivError::EmptyId);
        }
        let url = self.pdf_url(id);
        self.pdf
            .extract(&url)
            .await
            .map_err(|source| ArxivError::Fetch {
                id: id.to_string(),
                source,
            })
    }
}

//! Content-type routing: PDF, arXiv, or rendered HTML.
//!
//! Rules are checked in order and the first match wins, so a URL that ends in
//! `.pdf` is treated as a PDF even when it also mentions arXiv.

use std::sync::Arc;

use crate::arxiv::ArxivExtractor;
use crate::browser::PageDriver;
use crate::error::ScrapeError;
use crate::extract::HtmlTextExtractor;
use crate::logging::ScrapeLogger;
use crate::pdf::PdfExtractor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRoute {
    Pdf { url: String },
    Arxiv { id: String },
    Html,
}

impl ContentRoute {
    pub fn label(&self) -> &'static str {
        match self {
            ContentRoute::Pdf { .. } => "pdf",
            ContentRoute::Arxiv { .. } => "arxiv",
            ContentRoute::Html => "html",
        }
    }
}

struct RouteRule {
    matches: fn(&str) -> bool,
    build: fn(&str) -> ContentRoute,
}

const RULES: [RouteRule; 2] = [
    RouteRule {
        matches: |url| url.ends_with(".pdf"),
        build: |url| ContentRoute::Pdf {
            url: url.to_string(),
        },
    },
    RouteRule {
        matches: |url| url.contains("arxiv"),
        build: |url| ContentRoute::Arxiv {
            id: url.rsplit('/').next().unwrap_or_default().to_string(),
        },
    },
];

/// Pick the extraction path for `url`.
pub fn route(url: &str) -> ContentRoute {
    RULES
        .iter()
        .find(|rule| (rule.matches)(url))
        .map(|rule| (rule.build)(url))
        .unwrap_or(ContentRoute::Html)
}

/// The three extraction collaborators a route can hand off to.
#[derive(Clone)]
pub struct ContentExtractors {
    pub pdf: Arc<dyn PdfExtractor>,
    pub arxiv: Arc<dyn ArxivExtractor>,
    pub html: Arc<HtmlTextExtractor>,
}

/// Route `url` and run the matching extractor. Only the HTML path reads the
/// rendered page.
pub async fn route_and_extract<P>(
    url: &str,
    page: &P,
    extractors: &ContentExtractors,
    logger: &ScrapeLogger,
) -> Result<String, ScrapeError>
where
    P: PageDriver + ?Sized,
{
    let route = route(url);
    logger.info(
        format!("extracting via {} route", route.label()),
        "route",
        Some(serde_json::json!({ "url": url })),
    );

    match route {
        ContentRoute::Pdf { url } => Ok(extractors.pdf.extract(&url).await?),
        ContentRoute::Arxiv { id } => Ok(extractors.arxiv.extract(&id).await?),
        ContentRoute::Html => {
            let markup = page.content().await?;
            let text = extractors.html.extract_text(&markup);
            logger.debug(
                "extracted html text",
                "extract",
                Some(serde_json::json!({ "markup_bytes": markup.len(), "text_bytes": text.len() })),
            );
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_suffix_routes_to_pdf() {
        assert_eq!(
            route("https://x.com/file.pdf"),
            ContentRoute::Pdf {
                url: "https://x.com/file.pdf".into()
            }
        );
    }

    #[test]
    fn arxiv_host_routes_with_trailing_identifier() {
        assert_eq!(
            route("https://arxiv.org/abs/1234.5678"),
            ContentRoute::Arxiv {
                id: "1234.5678".into()
            }
        );
    }

    #[test]
    fn everything_else_is_html() {
        assert_eq!(route("https://example.com/page"), ContentRoute::Html);
        assert_eq!(route("https://example.com/file.pdf?download=1"), ContentRoute::Html);
    }

    #[test]
    fn pdf_rule_wins_over_arxiv_rule() {
        assert_eq!(route("https://arxiv.org/pdf/1234.5678.pdf").label(), "pdf");
        assert_eq!(route("https://arxiv.org/pdf/1234.5678").label(), "arxiv");
    }
}

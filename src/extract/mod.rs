//! Heuristic text extraction from rendered HTML.
//!
//! Candidate elements (headings, paragraphs, list items, `div` and `span`)
//! are visited in document order. A candidate survives when its text is
//! non-empty, has at least [`MIN_TOKENS`] whitespace-separated tokens and is
//! not flagged by the configured [`ChromeFilter`]. Survivors have their
//! whitespace collapsed and are joined with blank lines.

use scraper::{ElementRef, Html, Node};

mod filter;

pub use filter::{AnyFilter, ChromeFilter, ParentClassFilter};

/// Elements considered for extraction.
pub const CANDIDATE_TAGS: [&str; 9] = ["h1", "h2", "h3", "h4", "h5", "p", "li", "div", "span"];

/// Blocks with fewer tokens than this are treated as buttons or labels.
pub const MIN_TOKENS: usize = 3;

/// Elements whose contents never count as readable text.
const SKIPPED_TAGS: [&str; 2] = ["script", "style"];

/// One candidate element's text, as found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTextBlock {
    pub tag: String,
    pub text: String,
    pub parent_classes: Vec<String>,
}

impl ExtractedTextBlock {
    pub fn token_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn collapsed(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

pub struct HtmlTextExtractor {
    filter: Box<dyn ChromeFilter>,
    min_tokens: usize,
}

impl Default for HtmlTextExtractor {
    fn default() -> Self {
        Self::new(ParentClassFilter::default())
    }
}

impl HtmlTextExtractor {
    pub fn new(filter: impl ChromeFilter + 'static) -> Self {
        Self {
            filter: Box::new(filter),
            min_tokens: MIN_TOKENS,
        }
    }

    pub fn with_min_tokens(mut self, min_tokens: usize) -> Self {
        self.min_tokens = min_tokens;
        self
    }

    /// Extract readable text from a full HTML document.
    pub fn extract_text(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        self.extract_blocks(&document)
            .iter()
            .map(ExtractedTextBlock::collapsed)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Candidate blocks that pass every filter, in document order.
    pub fn extract_blocks(&self, document: &Html) -> Vec<ExtractedTextBlock> {
        candidate_blocks(document)
            .into_iter()
            .filter(|block| self.keep(block))
            .collect()
    }

    fn keep(&self, block: &ExtractedTextBlock) -> bool {
        if block.text.trim().is_empty() {
            return false;
        }
        if block.token_count() < self.min_tokens {
            return false;
        }
        !self.filter.is_chrome(block)
    }
}

/// Every candidate element in document order, unfiltered.
pub fn candidate_blocks(document: &Html) -> Vec<ExtractedTextBlock> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| CANDIDATE_TAGS.contains(&element.value().name()))
        .filter(|element| !inside_skipped(element))
        .map(|element| ExtractedTextBlock {
            tag: element.value().name().to_string(),
            text: readable_text(&element),
            parent_classes: parent_classes(&element),
        })
        .collect()
}

fn parent_classes(element: &ElementRef<'_>) -> Vec<String> {
    element
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| parent.value().classes().map(str::to_string).collect())
        .unwrap_or_default()
}

fn inside_skipped(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| SKIPPED_TAGS.contains(&ancestor.value().name()))
}

/// Concatenated text nodes below `element`, skipping script and style.
///
/// Walks descendants iteratively; nesting depth is bounded only by the parser.
/// Script and style hold raw text, so their text is always a direct child.
fn readable_text(element: &ElementRef<'_>) -> String {
    element
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let skipped = node
                    .parent()
                    .and_then(ElementRef::wrap)
                    .is_some_and(|parent| SKIPPED_TAGS.contains(&parent.value().name()));
                (!skipped).then_some(&**text)
            }
            _ => None,
        })
        .collect()
}

/// Extract text with the default chrome rules.
pub fn extract_text(html: &str) -> String {
    HtmlTextExtractor::default().extract_text(html)
}

//! Rules deciding whether a text block belongs to page chrome.

use std::collections::HashSet;

use super::ExtractedTextBlock;

/// Decides whether a candidate block is navigation, menus or similar chrome.
pub trait ChromeFilter: Send + Sync {
    fn is_chrome(&self, block: &ExtractedTextBlock) -> bool;
}

/// Matches when the immediate parent carries one of a fixed set of class
/// tokens. Comparison is exact per token, so `footer-links` does not match
/// `footer`.
#[derive(Debug, Clone)]
pub struct ParentClassFilter {
    classes: HashSet<String>,
}

impl ParentClassFilter {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ParentClassFilter {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CHROME_CLASSES)
    }
}

impl ChromeFilter for ParentClassFilter {
    fn is_chrome(&self, block: &ExtractedTextBlock) -> bool {
        block
            .parent_classes
            .iter()
            .any(|class| self.classes.contains(class))
    }
}

/// Matches when any of the wrapped filters matches.
#[derive(Default)]
pub struct AnyFilter {
    filters: Vec<Box<dyn ChromeFilter>>,
}

impl AnyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl ChromeFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl ChromeFilter for AnyFilter {
    fn is_chrome(&self, block: &ExtractedTextBlock) -> bool {
        self.filters.iter().any(|filter| filter.is_chrome(block))
    }
}

impl<F> ChromeFilter for F
where
    F: Fn(&ExtractedTextBlock) -> bool + Send + Sync,
{
    fn is_chrome(&self, block: &ExtractedTextBlock) -> bool {
        self(block)
    }
}

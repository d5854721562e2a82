//! Scrolling to force lazy-loaded content to render.

use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::browser::{BrowserRuntimeError, PageDriver};
use crate::error::ScrapeError;
use crate::logging::ScrapeLogger;

pub const DOCUMENT_HEIGHT: &str = "document.body.scrollHeight";
const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollOptions {
    /// Pause after each scroll so lazy content can load.
    pub settle: Duration,
    /// Scroll cycles allowed before giving up on convergence.
    pub max_iterations: u32,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            max_iterations: 50,
        }
    }
}

/// How a converged scroll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub cycles: u32,
    pub final_height: i64,
}

/// Scroll to the bottom until the document stops growing.
///
/// Each cycle scrolls, waits `settle`, and re-reads the height; the loop ends
/// on the first cycle whose height matches the previous one.
pub async fn scroll_to_bottom<P>(
    page: &P,
    options: ScrollOptions,
    logger: &ScrapeLogger,
) -> Result<ScrollOutcome, ScrapeError>
where
    P: PageDriver + ?Sized,
{
    let mut last_height = document_height(page).await?;
    let mut cycles = 0;

    loop {
        if cycles >= options.max_iterations {
            return Err(ScrapeError::ScrollNotConverged { iterations: cycles });
        }

        page.evaluate(SCROLL_TO_BOTTOM).await?;
        page.wait_for_timeout(options.settle).await;
        cycles += 1;

        let new_height = document_height(page).await?;
        if new_height == last_height {
            return Ok(ScrollOutcome {
                cycles,
                final_height: new_height,
            });
        }

        logger.debug(
            "document height changed",
            "scroll",
            Some(serde_json::json!({ "from": last_height, "to": new_height, "cycle": cycles })),
        );
        last_height = new_height;
    }
}

/// Scroll to `ratio` of the document height.
pub async fn scroll_to_fraction<P>(page: &P, ratio: f64) -> Result<(), ScrapeError>
where
    P: PageDriver + ?Sized,
{
    if !(0.0..=1.0).contains(&ratio) {
        return Err(ScrapeError::InvalidArgument { ratio });
    }
    page.evaluate(&format!(
        "window.scrollTo(0, document.body.scrollHeight * {ratio})"
    ))
    .await?;
    Ok(())
}

async fn document_height<P>(page: &P) -> Result<i64, BrowserRuntimeError>
where
    P: PageDriver + ?Sized,
{
    let value = page.read_property(DOCUMENT_HEIGHT).await?;
    height_from_value(&value)
}

fn height_from_value(value: &JsonValue) -> Result<i64, BrowserRuntimeError> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|height| height.round() as i64))
        .ok_or_else(|| {
            BrowserRuntimeError::Evaluation(format!("document height was not a number: {value}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Page whose reported height follows a fixed script.
    struct GrowingPage {
        heights: Mutex<VecDeque<i64>>,
        evaluated: Mutex<Vec<String>>,
        waits: Mutex<Vec<Duration>>,
    }

    impl GrowingPage {
        fn new(heights: &[i64]) -> Self {
            Self {
                heights: Mutex::new(heights.iter().copied().collect()),
                evaluated: Mutex::new(Vec::new()),
                waits: Mutex::new(Vec::new()),
            }
        }

        fn scroll_commands(&self) -> Vec<String> {
            self.evaluated.lock().unwrap().clone()
        }

        fn wait_count(&self) -> usize {
            self.waits.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageDriver for GrowingPage {
        async fn set_extra_headers(
            &self,
            _headers: &HashMap<String, String>,
        ) -> Result<(), BrowserRuntimeError> {
            Ok(())
        }

        async fn goto(&self, _url: &str) -> Result<(), BrowserRuntimeError> {
            Ok(())
        }

        async fn wait_for_network_idle(&self) -> Result<(), BrowserRuntimeError> {
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> Result<JsonValue, BrowserRuntimeError> {
            self.evaluated.lock().unwrap().push(script.to_string());
            Ok(JsonValue::Null)
        }

        async fn content(&self) -> Result<String, BrowserRuntimeError> {
            Ok(String::new())
        }

        async fn read_property(&self, _expression: &str) -> Result<JsonValue, BrowserRuntimeError> {
            let mut heights = self.heights.lock().unwrap();
            let next = if heights.len() > 1 {
                heights.pop_front()
            } else {
                heights.front().copied()
            };
            Ok(next.map(JsonValue::from).unwrap_or(JsonValue::Null))
        }

        async fn wait_for_timeout(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    #[tokio::test]
    async fn growing_then_stable_page_takes_two_cycles() {
        let page = GrowingPage::new(&[100, 300, 300]);
        let outcome = scroll_to_bottom(&page, ScrollOptions::default(), &ScrapeLogger::default())
            .await
            .expect("converges");
        assert_eq!(outcome.cycles, 2);
        assert_eq!(outcome.final_height, 300);
        assert_eq!(page.wait_count(), 2);
        assert_eq!(page.scroll_commands().len(), 2);
    }

    #[tokio::test]
    async fn stable_page_takes_one_cycle() {
        let page = GrowingPage::new(&[100, 100]);
        let outcome = scroll_to_bottom(&page, ScrollOptions::default(), &ScrapeLogger::default())
            .await
            .expect("converges");
        assert_eq!(outcome.cycles, 1);
        assert_eq!(page.wait_count(), 1);
        assert_eq!(
            page.scroll_commands(),
            vec![SCROLL_TO_BOTTOM.to_string()]
        );
    }

    #[tokio::test]
    async fn settle_interval_is_passed_to_each_wait() {
        let page = GrowingPage::new(&[10, 20, 20]);
        let options = ScrollOptions {
            settle: Duration::from_millis(750),
            max_iterations: 10,
        };
        scroll_to_bottom(&page, options, &ScrapeLogger::default())
            .await
            .expect("converges");
        assert!(page
            .waits
            .lock()
            .unwrap()
            .iter()
            .all(|wait| *wait == Duration::from_millis(750)));
    }

    #[tokio::test]
    async fn endless_growth_hits_iteration_ceiling() {
        let heights: Vec<i64> = (1..=20).map(|n| n * 100).collect();
        let page = GrowingPage::new(&heights);
        let options = ScrollOptions {
            settle: Duration::ZERO,
            max_iterations: 5,
        };
        let err = scroll_to_bottom(&page, options, &ScrapeLogger::default())
            .await
            .expect_err("never converges");
        assert!(matches!(err, ScrapeError::ScrollNotConverged { iterations: 5 }));
        assert_eq!(page.wait_count(), 5);
    }

    #[tokio::test]
    async fn fraction_outside_unit_interval_is_rejected() {
        let page = GrowingPage::new(&[100]);
        for ratio in [-0.1, 1.1] {
            let err = scroll_to_fraction(&page, ratio).await.expect_err("out of range");
            assert!(matches!(err, ScrapeError::InvalidArgument { .. }));
            assert_eq!(err.kind(), crate::error::ScrapeErrorKind::InvalidArgument);
        }
        assert!(page.scroll_commands().is_empty());
    }

    #[tokio::test]
    async fn fraction_scrolls_to_share_of_height() {
        let page = GrowingPage::new(&[100]);
        scroll_to_fraction(&page, 0.5).await.expect("valid ratio");
        assert_eq!(
            page.scroll_commands(),
            vec!["window.scrollTo(0, document.body.scrollHeight * 0.5)".to_string()]
        );
    }

    #[test]
    fn fractional_heights_are_rounded() {
        assert_eq!(height_from_value(&JsonValue::from(812.6)).unwrap(), 813);
        assert!(height_from_value(&JsonValue::Null).is_err());
    }
}

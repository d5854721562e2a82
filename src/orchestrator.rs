//! Scrape orchestration.
//!
//! [`PageScraper::scrape`] owns one browser session per request and drives it
//! through cookie priming, overlay injection, navigation, the network-idle
//! wait, scroll convergence and content routing before normalizing the text.
//! The session is closed exactly once on every path after launch; a request
//! without a URL never launches anything.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::arxiv::ArxivPdfExtractor;
use crate::browser::{BrowserRuntime, BrowserSession, PageDriver};
use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeFailure, ScrapeResult, render_result};
use crate::extract::{HtmlTextExtractor, ParentClassFilter};
use crate::logging::ScrapeLogger;
use crate::normalize::normalize_text;
use crate::overlay::load_overlay_script;
use crate::pdf::{HttpPdfExtractor, PdfExtractor};
use crate::router::{ContentExtractors, route_and_extract};
use crate::runtime::ChromiumoxideRuntime;
use crate::scroll::{ScrollOptions, scroll_to_bottom};

/// Caller-supplied session/context identifier. Carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionHandle>,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }
}

pub struct PageScraper<R: BrowserRuntime> {
    config: ScraperConfig,
    runtime: R,
    extractors: ContentExtractors,
    logger: ScrapeLogger,
}

impl PageScraper<ChromiumoxideRuntime> {
    /// Scraper backed by a locally launched Chromium.
    pub fn new_local(config: ScraperConfig) -> Self {
        Self::with_runtime(config, ChromiumoxideRuntime::new())
    }
}

impl<R: BrowserRuntime> PageScraper<R> {
    /// Build a scraper whose extractors follow `config`.
    pub fn with_runtime(config: ScraperConfig, runtime: R) -> Self {
        let pdf: Arc<dyn PdfExtractor> = Arc::new(HttpPdfExtractor::with_user_agent(&config.user_agent));
        let extractors = ContentExtractors {
            arxiv: Arc::new(ArxivPdfExtractor::new(
                config.arxiv_base_url.clone(),
                Arc::clone(&pdf),
            )),
            pdf,
            html: Arc::new(HtmlTextExtractor::new(ParentClassFilter::new(
                config.chrome_classes.iter().cloned(),
            ))),
        };
        let logger = ScrapeLogger::new(config.verbose);

        Self {
            config,
            runtime,
            extractors,
            logger,
        }
    }

    pub fn with_extractors(mut self, extractors: ContentExtractors) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_html_extractor(mut self, extractor: HtmlTextExtractor) -> Self {
        self.extractors.html = Arc::new(extractor);
        self
    }

    pub fn with_logger(mut self, logger: ScrapeLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn logger(&self) -> &ScrapeLogger {
        &self.logger
    }

    /// Scrape `request.url` into normalized text.
    ///
    /// Failures come back as a tagged [`ScrapeFailure`] after being logged
    /// with their source chain; nothing here panics or re-raises.
    pub async fn scrape(&self, request: &ScrapeRequest) -> ScrapeResult {
        if request.url.trim().is_empty() {
            let failure = ScrapeFailure::from(ScrapeError::InvalidRequest);
            self.logger.info(failure.message.clone(), "scrape", None);
            return Err(failure);
        }

        let started = Instant::now();
        self.logger.info(
            format!("scraping {}", request.url),
            "scrape",
            Some(json!({
                "url": request.url,
                "session": request.session.as_ref().map(SessionHandle::as_str),
            })),
        );

        match self.run(request).await {
            Ok(text) => {
                self.logger.info(
                    "scrape finished",
                    "scrape",
                    Some(json!({
                        "url": request.url,
                        "chars": text.chars().count(),
                        "elapsed_ms": started.elapsed().as_millis() as u64,
                    })),
                );
                Ok(text)
            }
            Err(err) => {
                let failure = ScrapeFailure::from_error(&err);
                self.logger.error(
                    format!("scrape of {} failed: {}", request.url, failure.message),
                    "scrape",
                    Some(json!({
                        "kind": failure.kind,
                        "trace": failure.trace,
                        "elapsed_ms": started.elapsed().as_millis() as u64,
                    })),
                );
                Err(failure)
            }
        }
    }

    /// Scrape a bare URL.
    pub async fn scrape_url(&self, url: &str) -> ScrapeResult {
        self.scrape(&ScrapeRequest::new(url)).await
    }

    /// Scrape and render the outcome as a single string, failure or not.
    pub async fn scrape_to_string(&self, request: &ScrapeRequest) -> String {
        render_result(&self.scrape(request).await)
    }

    async fn run(&self, request: &ScrapeRequest) -> Result<String, ScrapeError> {
        let session = self.runtime.launch(&self.config.launch_plan()).await?;

        let outcome = match self.config.request_timeout() {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.drive(&session, &request.url)).await {
                    Ok(result) => result,
                    Err(_) => Err(ScrapeError::Timeout {
                        what: "scrape",
                        elapsed: deadline,
                    }),
                }
            }
            None => self.drive(&session, &request.url).await,
        };

        if let Err(err) = session.close().await {
            self.logger.error(
                format!("failed to close browser session: {err}"),
                "scrape",
                None,
            );
        }

        outcome
    }

    async fn drive(&self, session: &R::Session, url: &str) -> Result<String, ScrapeError> {
        let page = session.open_page().await?;

        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), self.config.user_agent.clone());
        page.set_extra_headers(&headers).await?;

        if let Err(err) = self.prime_cookies(&page).await {
            self.logger.error(
                format!("cookie priming failed, continuing: {err}"),
                "cookies",
                Some(json!({ "trace": crate::error::error_chain(&err) })),
            );
        }

        let overlay = load_overlay_script(self.config.overlay_script_path.as_deref()).await?;
        page.evaluate(&overlay).await?;
        self.logger.debug("overlay injected", "overlay", None);

        page.goto(url).await?;
        self.logger.debug(format!("navigated to {url}"), "navigate", None);
        page.wait_for_network_idle().await?;

        let scrolled = scroll_to_bottom(
            &page,
            ScrollOptions {
                settle: self.config.scroll_settle(),
                max_iterations: self.config.max_scroll_iterations,
            },
            &self.logger,
        )
        .await?;
        self.logger.debug(
            "page height converged",
            "scroll",
            Some(json!({ "cycles": scrolled.cycles, "height": scrolled.final_height })),
        );

        let text = route_and_extract(url, &page, &self.extractors, &self.logger).await?;
        Ok(normalize_text(&text))
    }

    async fn prime_cookies<P>(&self, page: &P) -> Result<(), ScrapeError>
    where
        P: PageDriver + ?Sized,
    {
        let url = &self.config.cookie_priming_url;
        page.goto(url)
            .await
            .map_err(|source| ScrapeError::CookiePriming {
                url: url.clone(),
                source,
            })?;
        page.wait_for_timeout(self.config.cookie_priming_wait()).await;
        self.logger.debug(format!("primed cookies from {url}"), "cookies", None);
        Ok(())
    }
}

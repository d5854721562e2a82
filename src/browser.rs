//! Browser collaborator seams.
//!
//! The scraper never talks to a browser engine directly. It drives three
//! traits instead: a [`BrowserRuntime`] that launches sessions, the
//! [`BrowserSession`] it hands back, and the [`PageDriver`] for the single
//! tab a scrape works in. The chromiumoxide implementation lives in
//! [`crate::runtime`]; tests substitute recording mocks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::config::BrowserEngine;

/// Viewport dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 1288,
            height: 711,
        }
    }
}

/// Everything a runtime needs to start one browser instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    pub engine: BrowserEngine,
    pub headless: bool,
    pub args: Vec<String>,
    pub viewport: Viewport,
    pub chrome_executable: Option<PathBuf>,
    pub network_idle_timeout: Duration,
    pub network_idle_quiet: Duration,
}

#[derive(Debug, Error)]
pub enum BrowserRuntimeError {
    #[error("browser runtime error: {0}")]
    Message(String),
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("script evaluation failed: {0}")]
    Evaluation(String),
    #[error("{what} not reached within {elapsed:?}")]
    Timeout { what: &'static str, elapsed: Duration },
    #[error("browser runtime feature unsupported: {0}")]
    Unsupported(String),
}

/// Launches browser sessions.
#[async_trait]
pub trait BrowserRuntime: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self, plan: &LaunchPlan) -> Result<Self::Session, BrowserRuntimeError>;
}

/// One running browser instance.
///
/// `close` consumes the session so it can only ever be released once.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Page: PageDriver;

    async fn open_page(&self) -> Result<Self::Page, BrowserRuntimeError>;

    async fn close(self) -> Result<(), BrowserRuntimeError>;
}

/// A single page/tab inside a [`BrowserSession`].
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn set_extra_headers(
        &self,
        headers: &HashMap<String, String>,
    ) -> Result<(), BrowserRuntimeError>;

    async fn goto(&self, url: &str) -> Result<(), BrowserRuntimeError>;

    async fn wait_for_network_idle(&self) -> Result<(), BrowserRuntimeError>;

    async fn evaluate(&self, script: &str) -> Result<JsonValue, BrowserRuntimeError>;

    /// Full rendered markup of the current document.
    async fn content(&self) -> Result<String, BrowserRuntimeError>;

    async fn read_property(&self, expression: &str) -> Result<JsonValue, BrowserRuntimeError> {
        self.evaluate(expression).await
    }

    async fn wait_for_timeout(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<R> BrowserRuntime for Arc<R>
where
    R: BrowserRuntime,
{
    type Session = R::Session;

    async fn launch(&self, plan: &LaunchPlan) -> Result<Self::Session, BrowserRuntimeError> {
        (**self).launch(plan).await
    }
}

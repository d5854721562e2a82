//! Chromiumoxide-based browser runtime.
//!
//! Implements the [`BrowserRuntime`](crate::browser::BrowserRuntime) seam on
//! top of the `chromiumoxide` crate. Each launch starts a fresh local Chromium
//! process with its own CDP handler task; closing the session shuts the
//! process down and stops the handler.

use std::collections::HashMap;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    page::Page as ChromiumPage,
};
use futures_util::StreamExt;
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;

use crate::browser::{
    BrowserRuntime, BrowserRuntimeError, BrowserSession, LaunchPlan, PageDriver,
};
use crate::config::BrowserEngine;

mod idle;

pub use idle::IdleSettings;

/// Launches local Chromium instances over CDP.
#[derive(Debug, Default, Clone)]
pub struct ChromiumoxideRuntime;

impl ChromiumoxideRuntime {
    pub fn new() -> Self {
        Self
    }
}

/// A running Chromium process plus the task pumping its CDP connection.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    idle: IdleSettings,
}

/// The tab a scrape works in.
#[derive(Clone)]
pub struct ChromiumPageDriver {
    page: ChromiumPage,
    idle: IdleSettings,
}

impl ChromiumPageDriver {
    pub fn inner(&self) -> &ChromiumPage {
        &self.page
    }
}

#[async_trait]
impl BrowserRuntime for ChromiumoxideRuntime {
    type Session = ChromiumSession;

    async fn launch(&self, plan: &LaunchPlan) -> Result<ChromiumSession, BrowserRuntimeError> {
        if plan.engine != BrowserEngine::Chromium {
            log::warn!(
                "{} is not available over CDP; launching chromium instead",
                plan.engine
            );
        }

        let config = build_config(plan)?;
        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|err| BrowserRuntimeError::Launch(err.to_string()))?;

        Ok(ChromiumSession {
            browser,
            handler: spawn_handler(handler),
            idle: IdleSettings {
                timeout: plan.network_idle_timeout,
                quiet_window: plan.network_idle_quiet,
            },
        })
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Page = ChromiumPageDriver;

    async fn open_page(&self) -> Result<ChromiumPageDriver, BrowserRuntimeError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(map_chromiumoxide_error)?;
        Ok(ChromiumPageDriver {
            page,
            idle: self.idle,
        })
    }

    async fn close(mut self) -> Result<(), BrowserRuntimeError> {
        let closed = self
            .browser
            .close()
            .await
            .map_err(map_chromiumoxide_error);
        if closed.is_ok() {
            if let Err(err) = self.browser.wait().await {
                log::debug!("chromium process did not exit cleanly: {err}");
            }
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

#[async_trait]
impl PageDriver for ChromiumPageDriver {
    async fn set_extra_headers(
        &self,
        headers: &HashMap<String, String>,
    ) -> Result<(), BrowserRuntimeError> {
        let map = headers
            .iter()
            .map(|(name, value)| (name.clone(), JsonValue::String(value.clone())))
            .collect();
        let params = SetExtraHttpHeadersParams::new(Headers::new(JsonValue::Object(map)));
        self.page
            .execute(params)
            .await
            .map_err(map_chromiumoxide_error)?;
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<(), BrowserRuntimeError> {
        self.page
            .goto(url)
            .await
            .map_err(|err| BrowserRuntimeError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<(), BrowserRuntimeError> {
        idle::wait_for_network_idle(&self.page, self.idle).await
    }

    async fn evaluate(&self, script: &str) -> Result<JsonValue, BrowserRuntimeError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|err| BrowserRuntimeError::Evaluation(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    async fn content(&self) -> Result<String, BrowserRuntimeError> {
        self.page.content().await.map_err(map_chromiumoxide_error)
    }
}

fn build_config(plan: &LaunchPlan) -> Result<BrowserConfig, BrowserRuntimeError> {
    let viewport = chromiumoxide::handler::viewport::Viewport {
        width: plan.viewport.width,
        height: plan.viewport.height,
        device_scale_factor: None,
        emulating_mobile: false,
        is_landscape: plan.viewport.width >= plan.viewport.height,
        has_touch: false,
    };

    let mut builder = BrowserConfig::builder();

    if let Some(path) = &plan.chrome_executable {
        builder = builder.chrome_executable(path);
    }

    let builder = builder.viewport(viewport).args(plan.args.clone());

    let builder = if plan.headless {
        builder
    } else {
        builder.with_head()
    };

    builder.build().map_err(BrowserRuntimeError::Launch)
}

fn map_chromiumoxide_error<E: std::fmt::Display>(err: E) -> BrowserRuntimeError {
    BrowserRuntimeError::Message(err.to_string())
}

fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = handler.next().await {
            if let Err(err) = result {
                log::debug!("chromiumoxide handler error: {err}");
            }
        }
    })
}

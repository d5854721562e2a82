//! Strongly-typed configuration for the page scraper.
//!
//! Values can be constructed from defaults, loaded from `PAGESCRAPE_*`
//! environment variables (with optional `.env` support), or merged with
//! explicit overrides for programmatic updates.

use std::env;
use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use serde::de::{Deserialize, Deserializer, Error as DeError};
use serde::ser::{Serialize, Serializer};
use serde::{Deserialize as DeriveDeserialize, Serialize as DeriveSerialize};
use thiserror::Error;

use crate::browser::{LaunchPlan, Viewport};

/// User agent sent with every page request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

/// Origin visited before the target to pick up baseline cookies.
pub const DEFAULT_COOKIE_PRIMING_URL: &str = "https://www.google.com";

pub const DEFAULT_ARXIV_BASE_URL: &str = "https://arxiv.org";

/// Parent classes that mark navigation and other page chrome.
pub const DEFAULT_CHROME_CLASSES: [&str; 4] = ["nav", "menu", "sidebar", "footer"];

/// Browser engine requested for a scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeriveSerialize, DeriveDeserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    Chromium,
    Firefox,
    Webkit,
}

impl Default for BrowserEngine {
    fn default() -> Self {
        BrowserEngine::Chromium
    }
}

impl BrowserEngine {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Some(BrowserEngine::Chromium),
            "firefox" => Some(BrowserEngine::Firefox),
            "webkit" => Some(BrowserEngine::Webkit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BrowserEngine::Chromium => "chromium",
            BrowserEngine::Firefox => "firefox",
            BrowserEngine::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity level for scraper logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Minimal,
    Medium,
    Detailed,
}

impl Verbosity {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Verbosity::Minimal => 0,
            Verbosity::Medium => 1,
            Verbosity::Detailed => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Verbosity::Minimal),
            1 => Some(Verbosity::Medium),
            2 => Some(Verbosity::Detailed),
            _ => None,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Medium
    }
}

impl Serialize for Verbosity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Verbosity::from_u8(value).ok_or_else(|| {
            DeError::custom(format!(
                "invalid verbosity value {value}; expected 0, 1, or 2"
            ))
        })
    }
}

/// Configuration values for a [`PageScraper`](crate::orchestrator::PageScraper).
#[derive(Debug, Clone, DeriveSerialize, DeriveDeserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub engine: BrowserEngine,
    pub headless: bool,
    #[serde(alias = "userAgent")]
    pub user_agent: String,
    #[serde(alias = "cookiePrimingUrl")]
    pub cookie_priming_url: String,
    #[serde(alias = "cookiePrimingWaitMs")]
    pub cookie_priming_wait_ms: u64,
    #[serde(alias = "scrollSettleMs")]
    pub scroll_settle_ms: u64,
    #[serde(alias = "maxScrollIterations")]
    pub max_scroll_iterations: u32,
    #[serde(alias = "networkIdleTimeoutMs")]
    pub network_idle_timeout_ms: u64,
    #[serde(alias = "networkIdleQuietMs")]
    pub network_idle_quiet_ms: u64,
    #[serde(alias = "requestTimeoutMs")]
    pub request_timeout_ms: Option<u64>,
    #[serde(alias = "overlayScriptPath")]
    pub overlay_script_path: Option<PathBuf>,
    #[serde(alias = "chromeExecutable")]
    pub chrome_executable: Option<PathBuf>,
    #[serde(alias = "launchArgs")]
    pub launch_args: Vec<String>,
    pub viewport: Viewport,
    #[serde(alias = "arxivBaseUrl")]
    pub arxiv_base_url: String,
    #[serde(alias = "chromeClasses")]
    pub chrome_classes: Vec<String>,
    pub verbose: Verbosity,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            engine: BrowserEngine::default(),
            headless: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie_priming_url: DEFAULT_COOKIE_PRIMING_URL.to_string(),
            cookie_priming_wait_ms: 2_000,
            scroll_settle_ms: 2_000,
            max_scroll_iterations: 50,
            network_idle_timeout_ms: 30_000,
            network_idle_quiet_ms: 500,
            request_timeout_ms: Some(180_000),
            overlay_script_path: None,
            chrome_executable: None,
            launch_args: vec!["--disable-blink-features=AutomationControlled".to_string()],
            viewport: Viewport::default(),
            arxiv_base_url: DEFAULT_ARXIV_BASE_URL.to_string(),
            chrome_classes: DEFAULT_CHROME_CLASSES
                .iter()
                .map(|class| class.to_string())
                .collect(),
            verbose: Verbosity::default(),
        }
    }
}

impl ScraperConfig {
    /// Construct a configuration by reading `PAGESCRAPE_*` environment
    /// variables, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self, ScraperConfigError> {
        let _ = dotenv();
        let mut config = ScraperConfig::default();

        // Unknown engines launch Chromium rather than failing the whole config.
        if let Some(value) = env_var("PAGESCRAPE_ENGINE") {
            config.engine = BrowserEngine::parse(&value).unwrap_or_else(|| {
                log::warn!("unknown PAGESCRAPE_ENGINE {value:?}, using chromium");
                BrowserEngine::Chromium
            });
        }

        if let Some(value) = env_var("PAGESCRAPE_HEADLESS") {
            config.headless = parse_bool("PAGESCRAPE_HEADLESS", &value)?;
        }

        if let Some(value) = env_var("PAGESCRAPE_USER_AGENT") {
            config.user_agent = value;
        }

        if let Some(value) = env_var("PAGESCRAPE_COOKIE_PRIMING_URL") {
            config.cookie_priming_url = value;
        }

        if let Some(value) = env_var("PAGESCRAPE_SCROLL_SETTLE_MS") {
            config.scroll_settle_ms = parse_u64("PAGESCRAPE_SCROLL_SETTLE_MS", &value)?;
        }

        if let Some(value) = env_var("PAGESCRAPE_MAX_SCROLL_ITERATIONS") {
            config.max_scroll_iterations =
                parse_u64("PAGESCRAPE_MAX_SCROLL_ITERATIONS", &value)?.min(u32::MAX as u64) as u32;
        }

        if let Some(value) = env_var("PAGESCRAPE_NETWORK_IDLE_TIMEOUT_MS") {
            config.network_idle_timeout_ms =
                parse_u64("PAGESCRAPE_NETWORK_IDLE_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = env_var("PAGESCRAPE_REQUEST_TIMEOUT_MS") {
            let parsed = parse_u64("PAGESCRAPE_REQUEST_TIMEOUT_MS", &value)?;
            config.request_timeout_ms = (parsed > 0).then_some(parsed);
        }

        if let Some(value) = env_var("PAGESCRAPE_OVERLAY_SCRIPT") {
            config.overlay_script_path = Some(PathBuf::from(value));
        }

        if let Some(value) = env_var("PAGESCRAPE_CHROME_BIN") {
            config.chrome_executable = Some(PathBuf::from(value));
        }

        if let Some(value) = env_var("PAGESCRAPE_ARXIV_BASE_URL") {
            config.arxiv_base_url = value;
        }

        if let Some(value) = env_var("PAGESCRAPE_VERBOSE") {
            let parsed = parse_u8("PAGESCRAPE_VERBOSE", &value)?;
            config.verbose = Verbosity::from_u8(parsed).ok_or_else(|| {
                ScraperConfigError::invalid_enum("PAGESCRAPE_VERBOSE", parsed.to_string())
            })?;
        }

        Ok(config)
    }

    /// Create a new configuration with explicit field overrides applied.
    pub fn with_overrides(&self, overrides: ScraperConfigOverrides) -> ScraperConfig {
        let mut next = self.clone();

        if let Some(engine) = overrides.engine {
            next.engine = engine;
        }
        if let Some(value) = overrides.headless {
            next.headless = value;
        }
        if let Some(value) = overrides.user_agent {
            next.user_agent = value;
        }
        if let Some(value) = overrides.cookie_priming_url {
            next.cookie_priming_url = value;
        }
        if let Some(value) = overrides.scroll_settle_ms {
            next.scroll_settle_ms = value;
        }
        if let Some(value) = overrides.max_scroll_iterations {
            next.max_scroll_iterations = value;
        }
        if let Some(value) = overrides.request_timeout_ms {
            next.request_timeout_ms = value;
        }
        if let Some(value) = overrides.overlay_script_path {
            next.overlay_script_path = value;
        }
        if let Some(value) = overrides.chrome_executable {
            next.chrome_executable = value;
        }
        if let Some(value) = overrides.verbose {
            next.verbose = value;
        }

        next
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn cookie_priming_wait(&self) -> Duration {
        Duration::from_millis(self.cookie_priming_wait_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Launch parameters handed to the browser runtime.
    pub fn launch_plan(&self) -> LaunchPlan {
        LaunchPlan {
            engine: self.engine,
            headless: self.headless,
            args: self.launch_args.clone(),
            viewport: self.viewport.clone(),
            chrome_executable: self.chrome_executable.clone(),
            network_idle_timeout: Duration::from_millis(self.network_idle_timeout_ms),
            network_idle_quiet: Duration::from_millis(self.network_idle_quiet_ms),
        }
    }
}

/// Field-level overrides for [`ScraperConfig::with_overrides`].
#[derive(Debug, Default, Clone)]
pub struct ScraperConfigOverrides {
    pub engine: Option<BrowserEngine>,
    pub headless: Option<bool>,
    pub user_agent: Option<String>,
    pub cookie_priming_url: Option<String>,
    pub scroll_settle_ms: Option<u64>,
    pub max_scroll_iterations: Option<u32>,
    pub request_timeout_ms: Option<Option<u64>>,
    pub overlay_script_path: Option<Option<PathBuf>>,
    pub chrome_executable: Option<Option<PathBuf>>,
    pub verbose: Option<Verbosity>,
}

impl ScraperConfigOverrides {
    pub fn engine(mut self, engine: BrowserEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = Some(headless);
        self
    }

    pub fn chrome_executable<T: Into<Option<PathBuf>>>(mut self, path: T) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }
}

/// Errors that can arise while constructing a [`ScraperConfig`].
#[derive(Debug, Error)]
pub enum ScraperConfigError {
    #[error("invalid value '{value}' for {field}")]
    InvalidEnumVariant { field: &'static str, value: String },
    #[error("invalid boolean '{value}' for {field}")]
    InvalidBool { field: &'static str, value: String },
    #[error("invalid number '{value}' for {field}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl ScraperConfigError {
    fn invalid_enum(field: &'static str, value: String) -> Self {
        ScraperConfigError::InvalidEnumVariant { field, value }
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ScraperConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ScraperConfigError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_u8(field: &'static str, value: &str) -> Result<u8, ScraperConfigError> {
    value
        .trim()
        .parse::<u8>()
        .map_err(|source| ScraperConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ScraperConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|source| ScraperConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[derive(Debug)]
    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(vars: &[(&str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(key, value)| {
                    let original = env::var(key).ok();
                    match value {
                        Some(v) => unsafe {
                            env::set_var(key, v);
                        },
                        None => unsafe {
                            env::remove_var(key);
                        },
                    };
                    ((*key).to_string(), original)
                })
                .collect();
            EnvGuard { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => unsafe {
                        env::set_var(&key, v);
                    },
                    None => unsafe {
                        env::remove_var(&key);
                    },
                }
            }
        }
    }

    #[test]
    fn defaults_match_browser_scraper_constants() {
        let config = ScraperConfig::default();
        assert_eq!(config.engine, BrowserEngine::Chromium);
        assert!(!config.headless);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.user_agent.contains("Chrome/128.0.0.0"));
        assert_eq!(config.cookie_priming_url, "https://www.google.com");
        assert_eq!(config.scroll_settle(), Duration::from_secs(2));
        assert_eq!(config.cookie_priming_wait(), Duration::from_secs(2));
        assert_eq!(
            config.chrome_classes,
            vec!["nav", "menu", "sidebar", "footer"]
        );
        assert_eq!(config.verbose, Verbosity::Medium);
    }

    #[test]
    #[serial]
    fn from_env_parses_values() {
        let _guard = EnvGuard::new(&[
            ("PAGESCRAPE_ENGINE", Some("Firefox")),
            ("PAGESCRAPE_HEADLESS", Some("yes")),
            ("PAGESCRAPE_SCROLL_SETTLE_MS", Some("250")),
            ("PAGESCRAPE_MAX_SCROLL_ITERATIONS", Some("7")),
            ("PAGESCRAPE_REQUEST_TIMEOUT_MS", Some("0")),
            ("PAGESCRAPE_CHROME_BIN", Some("/usr/bin/chromium")),
            ("PAGESCRAPE_VERBOSE", Some("2")),
        ]);

        let config = ScraperConfig::from_env().expect("config from env");
        assert_eq!(config.engine, BrowserEngine::Firefox);
        assert!(config.headless);
        assert_eq!(config.scroll_settle_ms, 250);
        assert_eq!(config.max_scroll_iterations, 7);
        assert!(config.request_timeout().is_none());
        assert_eq!(
            config.chrome_executable.as_deref(),
            Some(std::path::Path::new("/usr/bin/chromium"))
        );
        assert_eq!(config.verbose, Verbosity::Detailed);
    }

    #[test]
    #[serial]
    fn from_env_unknown_engine_falls_back_to_chromium() {
        let _guard = EnvGuard::new(&[
            ("PAGESCRAPE_ENGINE", Some("netscape")),
            ("PAGESCRAPE_HEADLESS", Some("true")),
        ]);
        let config = ScraperConfig::from_env().expect("unknown engine is not fatal");
        assert_eq!(config.engine, BrowserEngine::Chromium);
        assert!(config.headless);
    }

    #[test]
    #[serial]
    fn from_env_rejects_bad_values() {
        let _guard = EnvGuard::new(&[("PAGESCRAPE_HEADLESS", Some("maybe"))]);
        let err = ScraperConfig::from_env().expect_err("invalid bool");
        assert!(err.to_string().contains("PAGESCRAPE_HEADLESS"));
    }

    #[test]
    fn overrides_support_clearing_optionals() {
        let base = ScraperConfig::default();
        let overrides = ScraperConfigOverrides::default()
            .engine(BrowserEngine::Webkit)
            .headless(true)
            .chrome_executable(Some(PathBuf::from("/opt/chrome")));
        let overrides = ScraperConfigOverrides {
            request_timeout_ms: Some(None),
            ..overrides
        };

        let updated = base.with_overrides(overrides);
        assert_eq!(updated.engine, BrowserEngine::Webkit);
        assert!(updated.headless);
        assert!(updated.request_timeout().is_none());
        assert_eq!(
            updated.chrome_executable.as_deref(),
            Some(std::path::Path::new("/opt/chrome"))
        );
    }

    #[test]
    fn launch_plan_carries_browser_settings() {
        let mut config = ScraperConfig::default();
        config.headless = true;
        config.network_idle_timeout_ms = 1_000;
        let plan = config.launch_plan();
        assert!(plan.headless);
        assert_eq!(plan.engine, BrowserEngine::Chromium);
        assert_eq!(plan.network_idle_timeout, Duration::from_secs(1));
        assert_eq!(plan.viewport.width, 1288);
    }

    #[test]
    fn engine_parse_is_case_insensitive() {
        assert_eq!(BrowserEngine::parse("WebKit"), Some(BrowserEngine::Webkit));
        assert_eq!(BrowserEngine::parse(" chrome "), Some(BrowserEngine::Chromium));
        assert_eq!(BrowserEngine::parse("lynx"), None);
    }
}

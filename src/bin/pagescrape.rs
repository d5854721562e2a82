//! pagescrape CLI.
//!
//! Scrapes a single URL and prints the normalized text.
//!
//! Usage:
//!     $ PAGESCRAPE_CHROME_BIN=/path/to/chrome \
//!       cargo run --bin pagescrape -- https://example.com --headless

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use log::info;
use pagescrape::{
    BrowserEngine, PageScraper, ScrapeRequest, ScraperConfig, ScraperConfigOverrides, Verbosity,
};

#[derive(Parser)]
#[command(
    name = "pagescrape",
    author,
    version,
    about = "Scrape readable text from a web page, PDF or arXiv paper"
)]
struct Cli {
    /// Page, PDF or arXiv URL to scrape.
    url: String,

    /// Run the browser without a visible window.
    #[arg(long)]
    headless: bool,

    /// Browser engine to request.
    #[arg(long, value_enum)]
    engine: Option<EngineArg>,

    /// Path to a Chrome/Chromium executable.
    #[arg(long, env = "PAGESCRAPE_CHROME_BIN")]
    chrome_bin: Option<PathBuf>,

    /// Overall deadline for the scrape; 0 disables it.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Increase log verbosity (pass multiple times for DEBUG).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum EngineArg {
    Chromium,
    Firefox,
    Webkit,
}

impl From<EngineArg> for BrowserEngine {
    fn from(engine: EngineArg) -> Self {
        match engine {
            EngineArg::Chromium => BrowserEngine::Chromium,
            EngineArg::Firefox => BrowserEngine::Firefox,
            EngineArg::Webkit => BrowserEngine::Webkit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_env_logger();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    info!("Scraping {} with {}", cli.url, config.engine);

    let scraper = PageScraper::new_local(config);
    match scraper.scrape(&ScrapeRequest::new(cli.url)).await {
        Ok(text) => {
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            eprintln!("{}", failure.render());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn build_config(cli: &Cli) -> Result<ScraperConfig> {
    let base = ScraperConfig::from_env().context("failed to load PAGESCRAPE_* configuration")?;

    let mut overrides = ScraperConfigOverrides::default();
    if cli.verbose > 0 {
        overrides.verbose = Some(verbosity_from_count(cli.verbose));
    }
    if cli.headless {
        overrides = overrides.headless(true);
    }
    if let Some(engine) = cli.engine {
        overrides = overrides.engine(engine.into());
    }
    if let Some(path) = &cli.chrome_bin {
        overrides = overrides.chrome_executable(Some(path.clone()));
    }
    if let Some(secs) = cli.timeout_secs {
        overrides.request_timeout_ms = Some((secs > 0).then_some(secs.saturating_mul(1_000)));
    }

    Ok(base.with_overrides(overrides))
}

fn verbosity_from_count(count: u8) -> Verbosity {
    match count {
        0 => Verbosity::Medium,
        1 => Verbosity::Detailed,
        _ => Verbosity::Detailed,
    }
}

fn init_env_logger() {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "info");
        }
    }

    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .format_timestamp_secs()
        .try_init();
}

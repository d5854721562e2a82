use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use log::info;
use pagescrape::browser::{BrowserRuntime, BrowserSession, PageDriver};
use pagescrape::runtime::ChromiumoxideRuntime;
use pagescrape::{PageScraper, ScraperConfig};

fn chrome_bin() -> Option<PathBuf> {
    let chrome_bin = match env::var("PAGESCRAPE_CHROME_BIN") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => {
            eprintln!("skipping chromiumoxide integration test: PAGESCRAPE_CHROME_BIN not set");
            return None;
        }
    };

    if !chrome_bin.exists() {
        eprintln!(
            "skipping chromiumoxide integration test: chrome executable not found at {}",
            chrome_bin.display()
        );
        return None;
    }
    Some(chrome_bin)
}

fn local_config(chrome_bin: PathBuf) -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.headless = true;
    config.chrome_executable = Some(chrome_bin);
    config.scroll_settle_ms = 200;
    config.cookie_priming_wait_ms = 200;
    config
}

#[tokio::test]
async fn chromiumoxide_runtime_drives_page() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let Some(chrome_bin) = chrome_bin() else {
        return Ok(());
    };

    let config = local_config(chrome_bin);
    let runtime = ChromiumoxideRuntime::new();
    let session = runtime.launch(&config.launch_plan()).await?;

    let outcome = async {
        let page = session.open_page().await?;
        page.goto("https://example.com").await?;
        page.wait_for_network_idle().await?;
        let height = page.read_property("document.body.scrollHeight").await?;
        let content = page.content().await?;
        Ok::<_, anyhow::Error>((height, content))
    }
    .await;
    session.close().await?;

    let (height, content) = outcome?;
    info!("Fetched page content ({} bytes), height {height}", content.len());
    assert!(height.as_i64().is_some_and(|h| h > 0));
    assert!(
        content.contains("Example Domain"),
        "expected Example Domain in page content"
    );
    Ok(())
}

#[tokio::test]
async fn page_scraper_extracts_live_page() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let Some(chrome_bin) = chrome_bin() else {
        return Ok(());
    };

    let scraper = PageScraper::new_local(local_config(chrome_bin));
    let text = scraper
        .scrape_url("https://example.com")
        .await
        .map_err(|failure| anyhow!(failure.render()))?;

    info!("Scraped text: {text}");
    assert!(text.contains("This domain is for use in"));
    Ok(())
}

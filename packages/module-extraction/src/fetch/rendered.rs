//! Headless Chromium strategy.
//!
//! Each attempt launches its own browser process in a throwaway profile
//! directory. [`BrowserGuard`] owns the process: the normal path closes it
//! and waits for exit, and dropping the guard (timeout, cancellation)
//! kills it.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{html, identity, FetchStrategy};
use crate::error::{FetchError, FetchResult};
use crate::types::attempt::{FetchedText, StrategyKind};
use crate::types::config::LadderConfig;

/// Find a Chromium or Chrome binary on `PATH`.
pub fn find_chromium() -> Option<PathBuf> {
    [
        "chromium",
        "chromium-browser",
        "google-chrome",
        "google-chrome-stable",
        "chrome",
    ]
    .iter()
    .find_map(|name| which::which(name).ok())
}

/// The browser binary to launch: `explicit` when given, otherwise the first
/// one found on `PATH`.
pub fn locate_chromium(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(find_chromium)
}

/// Scoped browser process.
struct BrowserGuard {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl BrowserGuard {
    async fn launch(chrome: &Path, user_agent: &str) -> FetchResult<Self> {
        let profile_dir = std::env::temp_dir().join(format!("pulse-chromium-{}", Uuid::new_v4()));

        let config = BrowserConfig::builder()
            .chrome_executable(chrome)
            .user_data_dir(&profile_dir)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", user_agent))
            .build()
            .map_err(|e| FetchError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            handler,
            profile_dir,
        })
    }

    /// Close the browser and wait for the process to exit.
    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!(error = %e, "Browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Waiting for browser exit failed");
        }
        let _ = tokio::fs::remove_dir_all(&self.profile_dir).await;
    }
}

impl Drop for BrowserGuard {
    fn drop(&mut self) {
        // Browser's own Drop kills a process that is still running.
        self.handler.abort();
        let _ = std::fs::remove_dir_all(&self.profile_dir);
    }
}

/// Headless rendering strategy.
pub struct Rendered {
    chrome: Option<PathBuf>,
    timeout: Duration,
    settle: Duration,
    settle_difficult: Duration,
}

impl Rendered {
    pub fn new(chrome: Option<PathBuf>, config: &LadderConfig) -> Self {
        Self {
            chrome,
            timeout: config.render_timeout,
            settle: config.render_settle,
            settle_difficult: config.render_settle_difficult,
        }
    }

    async fn render(guard: &BrowserGuard, url: &str, settle: Duration) -> FetchResult<FetchedText> {
        let page = guard
            .browser
            .new_page(url)
            .await
            .map_err(|e| FetchError::Browser(format!("navigation failed: {e}")))?;

        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let markup: String = page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| FetchError::Browser(format!("failed to read DOM: {e}")))?
            .into_value()
            .map_err(|e| FetchError::Browser(format!("failed to convert DOM: {e:?}")))?;

        let final_url = page.url().await.ok().flatten();
        let _ = page.close().await;

        let fetched = FetchedText::new(html::page_text(&markup));
        Ok(match final_url {
            Some(final_url) if final_url.trim_end_matches('/') != url.trim_end_matches('/') => {
                fetched.with_source_url(final_url)
            }
            _ => fetched,
        })
    }
}

#[async_trait]
impl FetchStrategy for Rendered {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Rendered
    }

    fn timeout(&self, _default: Duration) -> Duration {
        self.timeout
    }

    async fn fetch(&self, url: &str) -> FetchResult<FetchedText> {
        let chrome = self
            .chrome
            .as_deref()
            .ok_or_else(|| FetchError::NotConfigured("no Chromium binary found".into()))?;

        let settle = if identity::is_difficult_site(url) {
            self.settle_difficult
        } else {
            self.settle
        };

        let guard = BrowserGuard::launch(chrome, identity::random_user_agent()).await?;
        let result = Self::render(&guard, url, settle).await;
        guard.shutdown().await;
        result
    }
}

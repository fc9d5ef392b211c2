//! Chrome automation over the DevTools protocol via chromiumoxide

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::traits::{BrowserLauncher, BrowserSession, PageElement};

/// Common Chrome executable locations
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

/// Launches a local Chrome per session
pub struct ChromeLauncher {
    settings: BrowserSettings,
}

impl ChromeLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn find_chrome(&self) -> Result<PathBuf> {
        if let Some(path) = &self.settings.chrome_executable {
            return Ok(path.clone());
        }

        CHROME_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
            .ok_or_else(|| {
                anyhow!("Chrome/Chromium not found. Install it or set CHROME_EXECUTABLE")
            })
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self) -> Result<ChromeSession> {
        let chrome_path = self.find_chrome()?;
        info!(
            "Launching {} (headless={})",
            chrome_path.display(),
            self.settings.headless
        );

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        if !self.settings.headless {
            builder = builder.with_head();
        }
        let config = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {e}"))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("Failed to close browser after launch error: {}", close_err);
                }
                handler_task.abort();
                return Err(e).context("Failed to open browser tab");
            }
        };

        Ok(ChromeSession {
            browser,
            page,
            handler_task,
        })
    }
}

/// One Chrome instance with a single tab
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Element = ChromeElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to load {url}"))?;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ChromeElement>> {
        let elements = self.page.find_elements(selector).await?;
        Ok(elements.into_iter().map(ChromeElement).collect())
    }

    async fn execute(&self, script: &str) -> Result<()> {
        self.page.evaluate(script).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self.browser.close().await;
        if closed.is_ok() {
            self.browser.wait().await?;
        }
        self.handler_task.abort();
        closed?;
        info!("Browser closed");
        Ok(())
    }
}

pub struct ChromeElement(Element);

#[async_trait]
impl PageElement for ChromeElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.0.attribute(name).await?)
    }

    async fn inner_html(&self) -> Result<Option<String>> {
        Ok(self.0.inner_html().await?)
    }

    async fn click(&self) -> Result<()> {
        self.0.click().await?;
        Ok(())
    }
}

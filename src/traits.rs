//! Traits for the browser automation boundary
//!
//! The scrape loop and the engine adapters only talk to the page through
//! these traits. Selectors are passed through untouched.

use anyhow::Result;
use async_trait::async_trait;

/// A handle to one element on the current page
#[async_trait]
pub trait PageElement: Send + Sync {
    /// Read an attribute, `None` when the element does not carry it
    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// The element's inner HTML
    async fn inner_html(&self) -> Result<Option<String>>;

    async fn click(&self) -> Result<()>;
}

/// A live browser page owned by one scrape session
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Element: PageElement;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// Scroll to the bottom of the document to trigger lazy loading
    async fn scroll_to_bottom(&self) -> Result<()> {
        self.execute("window.scrollTo(0, document.body.scrollHeight);")
            .await
    }

    /// All elements matching `selector`, in document order
    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Evaluate a script in the page, discarding its result
    async fn execute(&self, script: &str) -> Result<()>;

    /// Release the browser. Called exactly once per session.
    async fn close(&mut self) -> Result<()>;
}

/// Opens browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self) -> Result<Self::Session>;
}

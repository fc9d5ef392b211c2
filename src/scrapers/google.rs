//! Google Images detail panel

use anyhow::Result;
use tracing::debug;

use super::collect_candidates;
use crate::config::ScrapeTimings;
use crate::engines::{SearchEngine, SearchEngineProfile};
use crate::models::Candidate;
use crate::traits::{BrowserSession, PageElement};

/// The detail panel shows the clicked image with its neighbours, each with a
/// resolution label. Full-size sources load asynchronously behind a progress
/// bar, until then `src` holds the inline preview.
#[derive(Debug, Clone)]
pub struct GoogleAdapter {
    profile: &'static SearchEngineProfile,
    timings: ScrapeTimings,
}

impl GoogleAdapter {
    pub fn new(timings: ScrapeTimings) -> Self {
        Self {
            profile: SearchEngine::Google.profile(),
            timings,
        }
    }

    pub(super) async fn candidates<S: BrowserSession>(&self, session: &S) -> Result<Vec<Candidate>> {
        self.wait_for_full_image(session).await;
        collect_candidates(session, self.profile).await
    }

    /// Poll until every loading bar is hidden. Gives up silently after the
    /// retry limit, in which case previews are skipped later as inline data.
    async fn wait_for_full_image<S: BrowserSession>(&self, session: &S) {
        let Some(selector) = self.profile.selectors.loading_indicator else {
            return;
        };

        for attempt in 0..self.timings.image_load_retries {
            tokio::time::sleep(self.timings.image_load_poll).await;

            let bars = match session.find_all(selector).await {
                Ok(bars) => bars,
                Err(e) => {
                    debug!("Could not read loading indicators: {:#}", e);
                    return;
                }
            };

            if !any_visible(&bars).await {
                return;
            }
            debug!("Full image still loading (attempt {})", attempt + 1);
        }
    }
}

// A bar without inline style is visible; hiding it sets `display: none`.
async fn any_visible<E: PageElement>(bars: &[E]) -> bool {
    for bar in bars {
        match bar.attribute("style").await {
            Ok(Some(style)) if !style.trim().is_empty() => {}
            Ok(_) => return true,
            Err(_) => {}
        }
    }
    false
}

//! DuckDuckGo image detail panel

use anyhow::Result;

use super::collect_candidates;
use crate::config::ScrapeTimings;
use crate::engines::{SearchEngine, SearchEngineProfile};
use crate::models::Candidate;
use crate::traits::BrowserSession;

/// The detail panel links to the original image; no resolution is shown next
/// to it, so candidates carry none and the fetcher decides alone.
#[derive(Debug, Clone)]
pub struct DuckDuckGoAdapter {
    profile: &'static SearchEngineProfile,
    timings: ScrapeTimings,
}

impl DuckDuckGoAdapter {
    pub fn new(timings: ScrapeTimings) -> Self {
        Self {
            profile: SearchEngine::DuckDuckGo.profile(),
            timings,
        }
    }

    pub(super) async fn candidates<S: BrowserSession>(&self, session: &S) -> Result<Vec<Candidate>> {
        tokio::time::sleep(self.timings.image_load_poll).await;
        collect_candidates(session, self.profile).await
    }
}

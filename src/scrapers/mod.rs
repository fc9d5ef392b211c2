//! Per-engine extraction of full-resolution images after a thumbnail click

mod duckduckgo;
mod google;

use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};

pub use duckduckgo::DuckDuckGoAdapter;
pub use google::GoogleAdapter;

use crate::config::ScrapeTimings;
use crate::engines::{SearchEngine, SearchEngineProfile};
use crate::fetcher::ImageFetcher;
use crate::models::{Candidate, DownloadRecord, ImageFilter};
use crate::traits::{BrowserSession, PageElement};

/// Where accepted images go and what they must satisfy
pub struct DownloadContext<'a> {
    pub fetcher: &'a ImageFetcher,
    pub filter: &'a ImageFilter,
    pub save_dir: &'a Path,
}

/// One adapter per supported engine
#[derive(Debug, Clone)]
pub enum EngineAdapter {
    Google(GoogleAdapter),
    DuckDuckGo(DuckDuckGoAdapter),
}

impl EngineAdapter {
    pub fn new(engine: SearchEngine, timings: ScrapeTimings) -> Self {
        match engine {
            SearchEngine::Google => Self::Google(GoogleAdapter::new(timings)),
            SearchEngine::DuckDuckGo => Self::DuckDuckGo(DuckDuckGoAdapter::new(timings)),
        }
    }

    /// Save at most one image from the detail panel opened by the last click.
    ///
    /// Extraction problems are logged and reported as `None`.
    pub async fn process_image<S: BrowserSession>(
        &self,
        session: &S,
        ctx: &DownloadContext<'_>,
    ) -> Option<DownloadRecord> {
        let (engine, candidates) = match self {
            Self::Google(adapter) => (SearchEngine::Google, adapter.candidates(session).await),
            Self::DuckDuckGo(adapter) => {
                (SearchEngine::DuckDuckGo, adapter.candidates(session).await)
            }
        };

        match candidates {
            Ok(candidates) => download_first(&candidates, ctx).await,
            Err(e) => {
                warn!("{} image extraction failed: {:#}", engine, e);
                None
            }
        }
    }
}

/// Read the image URLs of the detail panel and pair them with their
/// displayed resolution labels, when the engine renders any.
///
/// An unequal number of images and labels means the panel was caught
/// mid-render; it is reported as an error for this click only.
async fn collect_candidates<S: BrowserSession>(
    session: &S,
    profile: &SearchEngineProfile,
) -> Result<Vec<Candidate>> {
    let selectors = &profile.selectors;
    let images = session.find_all(selectors.full_image).await?;

    let labels = match selectors.full_image_resolution {
        Some(selector) => {
            let labels = session.find_all(selector).await?;
            if labels.len() != images.len() {
                anyhow::bail!(
                    "found {} images but {} resolution labels",
                    images.len(),
                    labels.len()
                );
            }
            Some(labels)
        }
        None => None,
    };

    let mut candidates = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        let Some(url) = image.attribute(selectors.full_image_attribute).await? else {
            continue;
        };

        let displayed_resolution = match labels.as_ref().and_then(|labels| labels.get(index)) {
            Some(label) => {
                let text = label.inner_html().await?.unwrap_or_default();
                let parsed = profile.parse_resolution(&text);
                if parsed.is_none() {
                    debug!("Unreadable resolution label {:?}", text);
                }
                parsed
            }
            None => None,
        };

        candidates.push(Candidate {
            url,
            displayed_resolution,
        });
    }

    Ok(candidates)
}

async fn download_first(
    candidates: &[Candidate],
    ctx: &DownloadContext<'_>,
) -> Option<DownloadRecord> {
    for candidate in candidates {
        if candidate.is_inline() {
            continue;
        }

        let outcome = ctx
            .fetcher
            .try_download_image(candidate, ctx.filter, ctx.save_dir)
            .await;
        if let Some(record) = outcome.into_record() {
            return Some(record);
        }
    }
    None
}

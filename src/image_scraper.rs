use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ScrapeTimings, ScraperSettings};
use crate::engines::SearchEngineProfile;
use crate::fetcher::ImageFetcher;
use crate::models::{ScrapeReport, SessionParams};
use crate::progress::{ProgressReporter, progress_percent};
use crate::scrapers::{DownloadContext, EngineAdapter};
use crate::traits::{BrowserLauncher, BrowserSession, PageElement};

/// Drives one browser through scroll, click and download cycles until
/// enough images are saved or the caller cancels.
pub struct ImageScraper<L> {
    launcher: L,
    fetcher: ImageFetcher,
    timings: ScrapeTimings,
    max_idle_cycles: Option<u32>,
}

impl<L: BrowserLauncher> ImageScraper<L> {
    pub fn new(launcher: L, fetcher: ImageFetcher) -> Self {
        Self {
            launcher,
            fetcher,
            timings: ScrapeTimings::default(),
            max_idle_cycles: None,
        }
    }

    pub fn with_settings(mut self, settings: &ScraperSettings) -> Self {
        self.timings = settings.timings.clone();
        self.max_idle_cycles = settings.max_idle_cycles;
        self
    }

    /// Run a complete session.
    ///
    /// Fails only when the parameters are invalid, the save directory cannot
    /// be created, or the browser cannot be opened or navigated. A cycle whose
    /// scroll or result listing fails is retried and counts as idle. The
    /// browser is closed on every path once it has been launched.
    /// `on_finished` is reported unless the session was cancelled.
    pub async fn download_images<R: ProgressReporter>(
        &self,
        params: &SessionParams,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<ScrapeReport> {
        params.validate()?;

        tokio::fs::create_dir_all(&params.save_dir)
            .await
            .with_context(|| format!("Failed to create {}", params.save_dir.display()))?;

        let mut session = self
            .launcher
            .launch()
            .await
            .context("Failed to open browser session")?;

        let outcome = self
            .find_images_and_download(&session, params, reporter, cancel)
            .await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {:#}", e);
        }

        let report = outcome?;
        if !report.cancelled {
            reporter.on_finished();
        }

        info!(
            "Session ended: {} images downloaded in {} cycles{}",
            report.downloaded,
            report.cycles,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    async fn find_images_and_download<S: BrowserSession, R: ProgressReporter>(
        &self,
        session: &S,
        params: &SessionParams,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<ScrapeReport> {
        let profile = params.engine.profile();
        let adapter = EngineAdapter::new(params.engine, self.timings.clone());
        let ctx = DownloadContext {
            fetcher: &self.fetcher,
            filter: &params.filter,
            save_dir: &params.save_dir,
        };
        let max_count = params.max_images_count;

        let search_url = profile.build_search_url(&params.query);
        info!("Searching {} for {:?}", profile.engine, params.query);
        session.navigate(&search_url).await?;

        let mut report = ScrapeReport::default();
        let mut idle_cycles = 0u32;

        loop {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if report.downloaded >= max_count {
                break;
            }

            report.cycles += 1;
            let (thumbnails, label_count) = match self.read_results(session, profile).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!("Failed to read search results, scrolling again: {:#}", e);
                    if self.is_stalled(&mut idle_cycles, false) {
                        break;
                    }
                    continue;
                }
            };
            let number_results = thumbnails.len();
            let results_start = report.results_offset;
            let found_new = number_results > results_start;

            if let Some(labels) = label_count.filter(|&labels| labels != number_results) {
                warn!(
                    "Found {} thumbnails but {} resolution labels, scrolling again",
                    number_results, labels
                );
                if self.is_stalled(&mut idle_cycles, false) {
                    break;
                }
                continue;
            }

            info!(
                "Found: {} search results. Extracting links from {}:{}",
                number_results, results_start, number_results
            );

            let mut exhausted = true;
            for thumbnail in thumbnails.iter().skip(results_start) {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    exhausted = false;
                    break;
                }

                if let Err(e) = thumbnail.click().await {
                    debug!("Thumbnail click failed: {:#}", e);
                    continue;
                }

                if let Some(record) = adapter.process_image(session, &ctx).await {
                    report.downloaded += 1;
                    reporter.on_image_saved(&record);
                    reporter.on_progress(progress_percent(report.downloaded, max_count));

                    if report.downloaded >= max_count {
                        exhausted = false;
                        break;
                    }
                }
            }

            if exhausted {
                info!(
                    "Found: {} images, looking for more ...",
                    report.downloaded
                );
                self.try_load_more(session, profile).await;
            }

            report.results_offset = results_start.max(number_results);

            if report.cancelled || self.is_stalled(&mut idle_cycles, found_new) {
                break;
            }
        }

        Ok(report)
    }

    /// Scroll to the end of the results and list the thumbnails, along with
    /// the number of resolution labels when the engine renders them.
    async fn read_results<S: BrowserSession>(
        &self,
        session: &S,
        profile: &SearchEngineProfile,
    ) -> Result<(Vec<S::Element>, Option<usize>)> {
        session.scroll_to_bottom().await?;
        tokio::time::sleep(self.timings.scroll_settle).await;

        let thumbnails = session.find_all(profile.selectors.thumbnail).await?;
        let label_count = match profile.selectors.thumbnail_resolution {
            Some(selector) => Some(session.find_all(selector).await?.len()),
            None => None,
        };

        Ok((thumbnails, label_count))
    }

    /// Click the engine's "show more" control. Absent or unclickable
    /// controls are ignored.
    async fn try_load_more<S: BrowserSession>(&self, session: &S, profile: &SearchEngineProfile) {
        let Some(selector) = profile.selectors.load_more else {
            return;
        };

        let result: Result<()> = async {
            if session.find_all(selector).await?.is_empty() {
                return Ok(());
            }
            let script = format!(
                "document.querySelector({}).click();",
                serde_json::to_string(selector)?
            );
            session.execute(&script).await
        }
        .await;

        if let Err(e) = result {
            debug!("Load more failed: {:#}", e);
        }
    }

    /// Count cycles without new thumbnails against the idle limit
    fn is_stalled(&self, idle_cycles: &mut u32, found_new: bool) -> bool {
        if found_new {
            *idle_cycles = 0;
            return false;
        }
        *idle_cycles += 1;

        match self.max_idle_cycles {
            Some(limit) if *idle_cycles >= limit => {
                info!("No new results after {} cycles, stopping", idle_cycles);
                true
            }
            _ => false,
        }
    }
}

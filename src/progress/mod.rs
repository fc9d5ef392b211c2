//! Progress notifications from a scrape session to its caller
//!
//! Delivery is fire-and-forget: reporters never block the session and a
//! disconnected receiver is ignored.

use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::models::{DownloadRecord, ScrapeEvent};

pub trait ProgressReporter: Send + Sync {
    /// Percentage of the requested image count downloaded so far
    fn on_progress(&self, percent: u8);

    /// The session ended without being cancelled
    fn on_finished(&self);

    fn on_image_saved(&self, _record: &DownloadRecord) {}
}

/// Integer percentage, floored and capped at 100
pub fn progress_percent(downloaded: usize, max_count: usize) -> u8 {
    if max_count == 0 {
        return 100;
    }
    let percent = downloaded.saturating_mul(100) / max_count;
    u8::try_from(percent.min(100)).unwrap_or(100)
}

impl ProgressReporter for UnboundedSender<ScrapeEvent> {
    fn on_progress(&self, percent: u8) {
        let _ = self.send(ScrapeEvent::Progress(percent));
    }

    fn on_finished(&self) {
        let _ = self.send(ScrapeEvent::Finished);
    }

    fn on_image_saved(&self, record: &DownloadRecord) {
        let _ = self.send(ScrapeEvent::ImageSaved {
            url: record.url.clone(),
            file_name: record.file_name.clone(),
        });
    }
}

/// Reports through the log, for headless runs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn on_progress(&self, percent: u8) {
        info!("Progress: {}%", percent);
    }

    fn on_finished(&self) {
        info!("Download finished");
    }

    fn on_image_saved(&self, record: &DownloadRecord) {
        info!(
            "Saved {} ({}, {})",
            record.file_name, record.resolution, record.content_type
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn percent_is_floored() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 66);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(0, 7), 0);
    }

    #[test]
    fn percent_never_exceeds_100() {
        assert_eq!(progress_percent(5, 3), 100);
    }

    #[test]
    fn channel_reporter_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.on_progress(50);
        tx.on_finished();
    }

    #[test]
    fn channel_reporter_forwards_events_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.on_progress(10);
        tx.on_finished();
        assert_eq!(rx.try_recv().unwrap(), ScrapeEvent::Progress(10));
        assert_eq!(rx.try_recv().unwrap(), ScrapeEvent::Finished);
    }
}

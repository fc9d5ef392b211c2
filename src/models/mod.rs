//! Data models for search sessions, image candidates and download results

use std::fmt;
use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engines::SearchEngine;

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Inclusive component-wise bounds check
    pub const fn is_within(&self, min: Resolution, max: Resolution) -> bool {
        self.width >= min.width
            && self.height >= min.height
            && self.width <= max.width
            && self.height <= max.height
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A full-resolution image URL extracted from the results page, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    /// Resolution as printed on the page, when the engine shows one
    pub displayed_resolution: Option<Resolution>,
}

impl Candidate {
    /// Inline `data:` images are previews embedded in the page, not fetchable assets
    pub fn is_inline(&self) -> bool {
        self.url.starts_with("data:")
    }
}

/// Metadata resolved from the remote resource itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    pub resolution: Option<Resolution>,
    pub content_type: Option<String>,
}

/// Acceptance criteria for downloaded images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFilter {
    pub min_resolution: Resolution,
    pub max_resolution: Resolution,
    /// Exact content types to accept, e.g. `image/png`
    pub allowed_content_types: Vec<String>,
}

/// An image saved to the session's directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub url: String,
    pub file_name: String,
    pub path: PathBuf,
    pub content_type: String,
    pub resolution: Resolution,
    pub downloaded_at: DateTime<Utc>,
}

/// Why a candidate was not saved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Failed resolution, content type or URL checks
    Invalid,
    /// A file with the same content-addressed name already exists
    Duplicate,
    /// Network or filesystem error while saving
    Failed,
}

#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    Downloaded(DownloadRecord),
    Skipped(SkipReason),
}

impl DownloadOutcome {
    pub fn into_record(self) -> Option<DownloadRecord> {
        match self {
            Self::Downloaded(record) => Some(record),
            Self::Skipped(_) => None,
        }
    }
}

/// Everything the caller supplies to start a scrape session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParams {
    pub query: String,
    pub engine: SearchEngine,
    pub max_images_count: usize,
    pub filter: ImageFilter,
    pub save_dir: PathBuf,
}

impl SessionParams {
    /// Reject parameters a session cannot run with.
    ///
    /// Minimum and maximum resolutions are not compared against each other;
    /// an inverted range simply accepts nothing.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            bail!("Search query must not be empty");
        }
        if self.max_images_count == 0 {
            bail!("Maximum image count must be positive");
        }
        if self.filter.allowed_content_types.is_empty() {
            bail!("At least one image content type must be allowed");
        }
        Ok(())
    }
}

/// Events sent back to whatever started the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    ImageSaved { url: String, file_name: String },
    Progress(u8),
    Finished,
}

/// Summary of a finished session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub downloaded: usize,
    /// Index of the first thumbnail not yet inspected
    pub results_offset: usize,
    pub cycles: usize,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SessionParams {
        SessionParams {
            query: "mountains".to_string(),
            engine: SearchEngine::Google,
            max_images_count: 5,
            filter: ImageFilter {
                min_resolution: Resolution::new(100, 100),
                max_resolution: Resolution::new(1920, 1080),
                allowed_content_types: vec!["image/png".to_string()],
            },
            save_dir: PathBuf::from("out"),
        }
    }

    #[test]
    fn accepts_well_formed_params() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn rejects_blank_query() {
        let mut p = params();
        p.query = "   ".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_zero_count_and_empty_types() {
        let mut p = params();
        p.max_images_count = 0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.filter.allowed_content_types.clear();
        assert!(p.validate().is_err());
    }

    #[test]
    fn inverted_bounds_are_left_to_the_caller() {
        let mut p = params();
        p.filter.min_resolution = Resolution::new(2000, 2000);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn data_urls_are_inline() {
        let candidate = Candidate {
            url: "data:image/jpeg;base64,AAAA".to_string(),
            displayed_resolution: None,
        };
        assert!(candidate.is_inline());
    }
}

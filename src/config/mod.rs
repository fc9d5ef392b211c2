//! Runtime settings from the environment and saved project files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::engines::SearchEngine;
use crate::models::{ImageFilter, Resolution, SessionParams};

/// How the browser is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    /// Explicit Chrome binary, otherwise common install paths are probed
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            headless: true,
        }
    }
}

/// Fixed waits used while driving the results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTimings {
    /// Pause after scrolling so lazy thumbnails can render
    pub scroll_settle: Duration,
    /// Interval between checks of the full-image loading indicator
    pub image_load_poll: Duration,
    /// Checks before giving up on the loading indicator
    pub image_load_retries: u32,
}

impl Default for ScrapeTimings {
    fn default() -> Self {
        Self {
            scroll_settle: Duration::from_secs(2),
            image_load_poll: Duration::from_millis(200),
            image_load_retries: 50,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScraperSettings {
    pub browser: BrowserSettings,
    pub timings: ScrapeTimings,
    /// Stop after this many consecutive cycles without new thumbnails
    pub max_idle_cycles: Option<u32>,
}

impl ScraperSettings {
    /// Read settings from the process environment.
    ///
    /// ## Environment Variables
    ///
    /// - `CHROME_EXECUTABLE`: Chrome/Chromium binary
    /// - `SCRAPER_HEADLESS`: `true` or `false` (default `true`)
    /// - `SCRAPER_SCROLL_SETTLE_MS`: default 2000
    /// - `SCRAPER_IMAGE_LOAD_POLL_MS`: default 200
    /// - `SCRAPER_IMAGE_LOAD_RETRIES`: default 50
    /// - `SCRAPER_MAX_IDLE_CYCLES`: unset means scroll until cancelled
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let parse_u64 = |key: &str| -> Result<Option<u64>> {
            lookup(key)
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .with_context(|| format!("{key} must be a non-negative integer"))
                })
                .transpose()
        };

        let headless = match lookup("SCRAPER_HEADLESS") {
            Some(value) => value
                .trim()
                .parse::<bool>()
                .context("SCRAPER_HEADLESS must be true or false")?,
            None => defaults.browser.headless,
        };

        let timings = ScrapeTimings {
            scroll_settle: parse_u64("SCRAPER_SCROLL_SETTLE_MS")?
                .map_or(defaults.timings.scroll_settle, Duration::from_millis),
            image_load_poll: parse_u64("SCRAPER_IMAGE_LOAD_POLL_MS")?
                .map_or(defaults.timings.image_load_poll, Duration::from_millis),
            image_load_retries: parse_u64("SCRAPER_IMAGE_LOAD_RETRIES")?
                .map(u32::try_from)
                .transpose()
                .context("SCRAPER_IMAGE_LOAD_RETRIES is too large")?
                .unwrap_or(defaults.timings.image_load_retries),
        };

        let max_idle_cycles = parse_u64("SCRAPER_MAX_IDLE_CYCLES")?
            .map(u32::try_from)
            .transpose()
            .context("SCRAPER_MAX_IDLE_CYCLES is too large")?;

        Ok(Self {
            browser: BrowserSettings {
                chrome_executable: lookup("CHROME_EXECUTABLE").map(PathBuf::from),
                headless,
            },
            timings,
            max_idle_cycles,
        })
    }
}

/// Saved search form, stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub search_query: String,
    pub search_engine: String,
    pub save_dir: PathBuf,
    pub max_images_count: usize,
    pub min_resolution_width: u32,
    pub min_resolution_height: u32,
    pub max_resolution_width: u32,
    pub max_resolution_height: u32,
    pub image_extension_jpg: bool,
    pub image_extension_png: bool,
    pub image_extension_gif: bool,
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self {
            search_query: "Wallpapers".to_string(),
            search_engine: SearchEngine::Google.to_string(),
            save_dir: PathBuf::from("scraped_images"),
            max_images_count: 10,
            min_resolution_width: 100,
            min_resolution_height: 100,
            max_resolution_width: 1920,
            max_resolution_height: 1080,
            image_extension_jpg: true,
            image_extension_png: true,
            image_extension_gif: false,
        }
    }
}

impl ProjectFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid project file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write project file {}", path.display()))
    }

    /// Content types for the ticked extensions
    pub fn content_types(&self) -> Vec<String> {
        let mut types = Vec::new();
        if self.image_extension_jpg {
            types.push("image/jpg".to_string());
            types.push("image/jpeg".to_string());
        }
        if self.image_extension_png {
            types.push("image/png".to_string());
        }
        if self.image_extension_gif {
            types.push("image/gif".to_string());
        }
        types
    }

    pub fn to_session_params(&self) -> Result<SessionParams> {
        let engine: SearchEngine = self.search_engine.parse()?;
        let allowed_content_types = self.content_types();
        if allowed_content_types.is_empty() {
            bail!("Select at least one image extension");
        }

        let params = SessionParams {
            query: self.search_query.clone(),
            engine,
            max_images_count: self.max_images_count,
            filter: ImageFilter {
                min_resolution: Resolution::new(
                    self.min_resolution_width,
                    self.min_resolution_height,
                ),
                max_resolution: Resolution::new(
                    self.max_resolution_width,
                    self.max_resolution_height,
                ),
                allowed_content_types,
            },
            save_dir: self.save_dir.clone(),
        };
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = ScraperSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, ScraperSettings::default());
        assert_eq!(settings.timings.image_load_retries, 50);
        assert!(settings.max_idle_cycles.is_none());
    }

    #[test]
    fn environment_overrides_are_applied() {
        let settings = ScraperSettings::from_lookup(lookup(&[
            ("CHROME_EXECUTABLE", "/opt/chrome"),
            ("SCRAPER_HEADLESS", "false"),
            ("SCRAPER_SCROLL_SETTLE_MS", "0"),
            ("SCRAPER_IMAGE_LOAD_POLL_MS", "10"),
            ("SCRAPER_IMAGE_LOAD_RETRIES", "3"),
            ("SCRAPER_MAX_IDLE_CYCLES", "4"),
        ]))
        .unwrap();

        assert_eq!(
            settings.browser.chrome_executable,
            Some(PathBuf::from("/opt/chrome"))
        );
        assert!(!settings.browser.headless);
        assert_eq!(settings.timings.scroll_settle, Duration::ZERO);
        assert_eq!(settings.timings.image_load_poll, Duration::from_millis(10));
        assert_eq!(settings.timings.image_load_retries, 3);
        assert_eq!(settings.max_idle_cycles, Some(4));
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(ScraperSettings::from_lookup(lookup(&[("SCRAPER_HEADLESS", "maybe")])).is_err());
        assert!(
            ScraperSettings::from_lookup(lookup(&[("SCRAPER_SCROLL_SETTLE_MS", "-1")])).is_err()
        );
    }

    #[test]
    fn jpg_maps_to_both_jpeg_spellings() {
        let project = ProjectFile {
            image_extension_png: false,
            ..ProjectFile::default()
        };
        assert_eq!(project.content_types(), vec!["image/jpg", "image/jpeg"]);
    }

    #[test]
    fn project_without_extensions_is_rejected() {
        let project = ProjectFile {
            image_extension_jpg: false,
            image_extension_png: false,
            image_extension_gif: false,
            ..ProjectFile::default()
        };
        assert!(project.to_session_params().is_err());
    }

    #[test]
    fn unknown_engine_is_rejected() {
        let project = ProjectFile {
            search_engine: "Pinterest".to_string(),
            ..ProjectFile::default()
        };
        assert!(project.to_session_params().is_err());
    }

    #[test]
    fn project_survives_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.iss");
        let project = ProjectFile {
            search_query: "northern lights".to_string(),
            search_engine: "DuckDuckGo".to_string(),
            image_extension_gif: true,
            ..ProjectFile::default()
        };

        project.save(&path).unwrap();
        let loaded = ProjectFile::load(&path).unwrap();
        assert_eq!(loaded, project);

        let params = loaded.to_session_params().unwrap();
        assert_eq!(params.engine, SearchEngine::DuckDuckGo);
        assert_eq!(params.filter.max_resolution, Resolution::new(1920, 1080));
        assert!(params.filter.allowed_content_types.contains(&"image/gif".to_string()));
    }

    #[test]
    fn partial_project_files_fill_in_defaults() {
        let project: ProjectFile =
            serde_json::from_str(r#"{"search_query": "cats", "max_images_count": 3}"#).unwrap();
        assert_eq!(project.search_query, "cats");
        assert_eq!(project.max_images_count, 3);
        assert_eq!(project.search_engine, "Google");
    }
}

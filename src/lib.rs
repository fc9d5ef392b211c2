//! Browser-driven image search scraping.
//!
//! A session opens an engine's image results page, scrolls to load
//! thumbnails, clicks each one, and downloads the full-resolution image when
//! it passes the resolution and content-type filters.

pub mod browser;
pub mod config;
pub mod engines;
pub mod fetcher;
pub mod image_scraper;
pub mod models;
pub mod progress;
pub mod scrapers;
pub mod traits;
pub mod validation;

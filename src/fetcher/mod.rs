//! # Image Fetching
//!
//! Resolves the real metadata of a candidate image, names it by a hash of its
//! URL and stores it in the session's directory.
//!
//! ## TLS
//!
//! The HTTP client is built with certificate validation **disabled**. Image
//! hosts linked from search results routinely serve expired, self-signed or
//! mismatched certificates, and the downloaded bytes are only ever written to
//! disk, never executed. Do not reuse this client for anything else.
//!
//! ## Duplicate suppression
//!
//! File names are `sha256(url)` in hex plus an extension taken from the
//! content type. A candidate whose file already exists is skipped before any
//! full download. Two candidates with the same URL in one run are only
//! deduplicated once the first one has been written.
//!
//! The digest is SHA-256, not SHA-1, so directories filled by older SHA-1
//! named tools are not recognised as containing duplicates.

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use image::ImageReader;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::models::{
    Candidate, DownloadOutcome, DownloadRecord, ImageFilter, ImageMetadata, Resolution, SkipReason,
};
use crate::validation::is_image_valid;

/// Sent with every request
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/51.0.2704.103 Safari/537.36";

pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Look up the content type and native dimensions of `url`.
    ///
    /// The body is streamed and dropped as soon as the dimensions decode, so
    /// only the leading bytes of most images are transferred. Metadata
    /// segments of any size before the frame header are read through. Any
    /// transport failure yields an empty [`ImageMetadata`].
    pub async fn resolve_metadata(&self, url: &str) -> ImageMetadata {
        match self.read_metadata(url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Metadata lookup failed for {}: {:#}", url, e);
                ImageMetadata::default()
            }
        }
    }

    async fn read_metadata(&self, url: &str) -> Result<ImageMetadata> {
        let head = self.client.head(url).send().await?;
        let content_type = head
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(normalize_content_type);

        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            bail!("Metadata request returned {}", response.status());
        }

        let mut buffer = Vec::new();
        let mut resolution = None;
        while let Some(chunk) = response.chunk().await? {
            buffer.extend_from_slice(&chunk);
            resolution = decode_dimensions(&buffer);
            if resolution.is_some() {
                break;
            }
        }

        Ok(ImageMetadata {
            resolution,
            content_type,
        })
    }

    /// Fetch the whole resource and move it into place once fully written.
    pub async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            bail!("Failed to download {}: {}", url, response.status());
        }

        let bytes = response.bytes().await?;

        let mut partial = destination.as_os_str().to_owned();
        partial.push(".part");
        let written: std::io::Result<()> = async {
            tokio::fs::write(&partial, &bytes).await?;
            tokio::fs::rename(&partial, destination).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e).with_context(|| format!("Failed to write {}", destination.display()));
        }

        Ok(())
    }

    /// Validate a candidate against its real metadata and save it.
    ///
    /// The resolution displayed on the results page is ignored in favour of
    /// the one decoded from the image, which may differ from the preview.
    /// Errors are logged and reported as skips.
    pub async fn try_download_image(
        &self,
        candidate: &Candidate,
        filter: &ImageFilter,
        save_dir: &Path,
    ) -> DownloadOutcome {
        let url = candidate.url.as_str();
        let metadata = self.resolve_metadata(url).await;

        let (Some(resolution), Some(content_type)) = (metadata.resolution, metadata.content_type)
        else {
            debug!("No usable metadata for {}", url);
            return DownloadOutcome::Skipped(SkipReason::Invalid);
        };

        if !is_image_valid(Some(url), Some(resolution), Some(&content_type), filter) {
            debug!("Rejected {} ({}, {})", url, resolution, content_type);
            return DownloadOutcome::Skipped(SkipReason::Invalid);
        }

        let file_name = file_name_for(url, &content_type);
        let path = save_dir.join(&file_name);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Already downloaded {} as {}", url, file_name);
            return DownloadOutcome::Skipped(SkipReason::Duplicate);
        }

        if let Err(e) = self.download(url, &path).await {
            warn!("Download failed for {}: {:#}", url, e);
            return DownloadOutcome::Skipped(SkipReason::Failed);
        }

        info!("{} $$ {}", url, file_name);
        DownloadOutcome::Downloaded(DownloadRecord {
            url: url.to_string(),
            file_name,
            path,
            content_type,
            resolution,
            downloaded_at: Utc::now(),
        })
    }
}

impl Clone for ImageFetcher {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

/// Content-addressed file name: hex SHA-256 of the URL plus the image subtype
pub fn file_name_for(url: &str, content_type: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    let extension = content_type.strip_prefix("image/").unwrap_or(content_type);
    format!("{digest}.{extension}")
}

// "image/jpeg; charset=binary" -> "image/jpeg"
fn normalize_content_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or(raw).trim().to_string()
}

/// Decode width and height from a possibly truncated image prefix
fn decode_dimensions(bytes: &[u8]) -> Option<Resolution> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    reader.format()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some(Resolution::new(width, height))
}

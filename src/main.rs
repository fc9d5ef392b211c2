use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use image_scraper::browser::ChromeLauncher;
use image_scraper::config::{ProjectFile, ScraperSettings};
use image_scraper::fetcher::ImageFetcher;
use image_scraper::image_scraper::ImageScraper;
use image_scraper::progress::LogReporter;

/// Download images from a search engine's image results
#[derive(Debug, Parser)]
#[command(name = "image-scraper", version)]
struct Cli {
    /// Start from a saved project file
    #[arg(long)]
    project: Option<PathBuf>,

    /// Search query
    #[arg(short, long)]
    query: Option<String>,

    /// Search engine (Google or DuckDuckGo)
    #[arg(short, long)]
    engine: Option<String>,

    /// Number of images to download
    #[arg(short = 'n', long)]
    count: Option<usize>,

    #[arg(long)]
    min_width: Option<u32>,

    #[arg(long)]
    min_height: Option<u32>,

    #[arg(long)]
    max_width: Option<u32>,

    #[arg(long)]
    max_height: Option<u32>,

    /// Accepted extensions, e.g. `jpg,png,gif`
    #[arg(long, value_delimiter = ',')]
    types: Option<Vec<String>>,

    /// Directory the images are saved to
    #[arg(short, long)]
    save_dir: Option<PathBuf>,

    /// Write the effective settings to a project file
    #[arg(long)]
    save_project: Option<PathBuf>,
}

impl Cli {
    fn into_project(self) -> Result<(ProjectFile, Option<PathBuf>)> {
        let mut project = match &self.project {
            Some(path) => ProjectFile::load(path)?,
            None => ProjectFile::default(),
        };

        if let Some(query) = self.query {
            project.search_query = query;
        }
        if let Some(engine) = self.engine {
            project.search_engine = engine;
        }
        if let Some(count) = self.count {
            project.max_images_count = count;
        }
        if let Some(width) = self.min_width {
            project.min_resolution_width = width;
        }
        if let Some(height) = self.min_height {
            project.min_resolution_height = height;
        }
        if let Some(width) = self.max_width {
            project.max_resolution_width = width;
        }
        if let Some(height) = self.max_height {
            project.max_resolution_height = height;
        }
        if let Some(types) = self.types {
            let has = |ext: &str| types.iter().any(|t| t.trim().eq_ignore_ascii_case(ext));
            project.image_extension_jpg = has("jpg") || has("jpeg");
            project.image_extension_png = has("png");
            project.image_extension_gif = has("gif");
        }
        if let Some(dir) = self.save_dir {
            project.save_dir = dir;
        }

        Ok((project, self.save_project))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let (project, save_project) = Cli::parse().into_project()?;
    if let Some(path) = save_project {
        project.save(&path)?;
        info!("Project saved to {}", path.display());
    }

    let params = project.to_session_params()?;
    let settings = ScraperSettings::from_env()?;

    info!(
        "Downloading {} images of {:?} from {} into {}",
        params.max_images_count,
        params.query,
        params.engine,
        params.save_dir.display()
    );

    let scraper = ImageScraper::new(ChromeLauncher::new(settings.browser.clone()), ImageFetcher::new()?)
        .with_settings(&settings);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping after the current image");
            ctrl_c.cancel();
        }
    });

    match scraper.download_images(&params, &LogReporter, &cancel).await {
        Ok(report) => {
            info!("Downloaded {} images", report.downloaded);
            Ok(())
        }
        Err(e) => {
            error!("Scrape session failed: {:#}", e);
            Err(e)
        }
    }
}

mod batch;
mod classify;
mod engine;
mod errors;
mod fallback;
mod fetch;
mod images;
mod layout;
mod platform;
mod types;
mod ytdlp;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::PlaylistSelection;
pub use engine::{AudioExtraction, MediaEngine};
pub use errors::{EngineErrorKind, MediaError};
pub use fetch::{HttpFetcher, PageFetcher};
pub use layout::DownloadDirs;
pub use platform::Platform;
pub use types::{DownloadOutcome, PostMetadata};
pub use ytdlp::YtDlpEngine;

use crate::config::Settings;
use crate::utils::format_number;
use engine::{EngineFailure, EngineOptions};
use errors::EngineErrorKind as Kind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use types::DownloadType;
use url::Url;

const AUDIO_CODECS: [&str; 9] = [
    "best", "aac", "alac", "flac", "m4a", "mp3", "opus", "vorbis", "wav",
];

/// What the media service needs from the process configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub download_dir: PathBuf,
    pub socket_timeout: Duration,
    pub max_filesize: Option<String>,
    pub max_concurrent: usize,
}

impl From<&Settings> for ServiceConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            download_dir: settings.download_dir.clone(),
            socket_timeout: settings.socket_timeout(),
            max_filesize: Some(settings.max_filesize.trim().to_string()).filter(|s| !s.is_empty()),
            max_concurrent: settings.max_concurrent_downloads,
        }
    }
}

/// Which rendition to fetch for a single-post download.
#[derive(Debug, Clone, Default)]
pub struct DownloadSelection {
    pub format_id: Option<String>,
    pub audio_only: bool,
    pub audio_format: Option<String>,
    pub audio_quality: Option<String>,
}

pub struct MediaService {
    engine: Arc<dyn MediaEngine>,
    fetcher: Arc<dyn PageFetcher>,
    dirs: DownloadDirs,
    config: ServiceConfig,
}

impl MediaService {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        fetcher: Arc<dyn PageFetcher>,
        config: ServiceConfig,
    ) -> Self {
        info!(
            "Media service initialized - engine: {}, download root: {}",
            engine.name(),
            config.download_dir.display()
        );

        Self {
            engine,
            fetcher,
            dirs: DownloadDirs::new(&config.download_dir),
            config,
        }
    }

    pub fn dirs(&self) -> &DownloadDirs {
        &self.dirs
    }

    fn base_options(&self) -> EngineOptions {
        EngineOptions::new(self.config.socket_timeout, self.config.max_filesize.clone())
    }

    async fn run_engine<T, F>(&self, call: F) -> Result<T, MediaError>
    where
        F: FnOnce(&dyn MediaEngine) -> Result<T, EngineFailure> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(Arc::clone(&self.engine), call).await
    }

    pub async fn extract(&self, platform: Platform, url: &Url) -> Result<PostMetadata, MediaError> {
        info!("Extracting {} metadata for: {}", platform, url);
        platform.check_supported(url)?;

        let mut options = self.base_options();
        platform.tune(&mut options);
        let target = url.to_string();

        match self
            .run_engine(move |engine| engine.extract_info(&target, &options))
            .await
        {
            Ok(raw) => {
                let has_formats = raw.formats.as_ref().is_some_and(|f| !f.is_empty());
                let images = if platform.hosts_image_posts() && !has_formats {
                    self.find_images(url, &raw).await
                } else {
                    Vec::new()
                };
                Ok(PostMetadata::from_raw(raw, url.as_str(), images))
            }
            Err(err) if platform.hosts_image_posts() && err.kind() == Some(Kind::NoMediaFound) => {
                info!("No video in {} post {}, trying image fallback", platform, url);
                self.resolve_image_post(platform, url, err).await
            }
            Err(err) => {
                warn!("Extraction failed for {}: {}", url, err);
                Err(err)
            }
        }
    }

    pub async fn extract_playlist(
        &self,
        platform: Platform,
        url: &Url,
    ) -> Result<PostMetadata, MediaError> {
        info!("Extracting {} playlist for: {}", platform, url);
        platform.check_supported(url)?;

        let mut options = self.base_options();
        options.flat_playlist = true;
        options.ignore_errors = true;
        let target = url.to_string();

        let raw = self
            .run_engine(move |engine| engine.extract_info(&target, &options))
            .await?;
        if !raw.is_playlist() {
            return Err(MediaError::engine(Kind::NotAPlaylist, url.as_str()));
        }

        Ok(PostMetadata::playlist_from_raw(raw, url.as_str()))
    }

    pub async fn download(
        &self,
        platform: Platform,
        url: &Url,
        selection: DownloadSelection,
    ) -> Result<DownloadOutcome, MediaError> {
        platform.check_supported(url)?;

        let mut options = self.base_options();
        platform.tune(&mut options);

        let download_type = if selection.audio_only {
            options.format = "bestaudio/best".to_string();
            options.output_template = Some(DownloadDirs::file_template(&self.dirs.audio()));
            options.audio = Some(audio_extraction(
                selection.audio_format.as_deref(),
                selection.audio_quality.as_deref(),
            )?);
            DownloadType::Audio
        } else {
            options.format = selection
                .format_id
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .ok_or_else(|| {
                    MediaError::validation("format_id is required unless audio_only is set")
                })?;
            options.output_template = Some(DownloadDirs::file_template(self.dirs.root()));
            DownloadType::Video
        };

        info!(
            "Downloading {} {}: {} (format: {})",
            platform,
            if selection.audio_only { "audio" } else { "video" },
            url,
            options.format
        );

        let target = url.to_string();
        let report = self
            .run_engine(move |engine| engine.download(&target, &options))
            .await?;

        let Some(path) = report.files.into_iter().next() else {
            return Err(MediaError::engine(Kind::NoFilesDownloaded, url.as_str()));
        };
        let size = tokio::fs::metadata(&path)
            .await
            .map_err(|e| MediaError::unexpected(format!("cannot read {}: {e}", path.display())))?
            .len();

        info!("Downloaded {} ({} bytes)", path.display(), format_number(size));
        let message = match download_type {
            DownloadType::Audio => "Audio downloaded successfully",
            _ => "Video downloaded successfully",
        };
        Ok(DownloadOutcome::single(&path, size, download_type, message))
    }

    pub async fn test_setup(&self) -> anyhow::Result<String> {
        info!("Testing media engine setup...");
        let version = self.run_engine(|engine| engine.probe()).await?;
        info!("✅ {} is available, version: {}", self.engine.name(), version);
        Ok(version)
    }
}

/// Runs a blocking engine call on the blocking thread pool.
async fn run_blocking<T, F>(engine: Arc<dyn MediaEngine>, call: F) -> Result<T, MediaError>
where
    F: FnOnce(&dyn MediaEngine) -> Result<T, EngineFailure> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || call(engine.as_ref()))
        .await
        .map_err(MediaError::unexpected)?
        .map_err(MediaError::from)
}

/// Parses a user-supplied URL, accepting only absolute http(s) URLs.
pub fn parse_url(raw: &str) -> Result<Url, MediaError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MediaError::validation("url is required"));
    }

    let url = Url::parse(raw).map_err(|e| MediaError::validation(format!("Invalid URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(MediaError::validation(format!(
            "Invalid URL '{raw}': only http(s) URLs are supported"
        )));
    }
    Ok(url)
}

fn audio_extraction(
    codec: Option<&str>,
    quality: Option<&str>,
) -> Result<AudioExtraction, MediaError> {
    let mut audio = AudioExtraction::default();

    if let Some(codec) = codec.map(str::trim).filter(|c| !c.is_empty()) {
        let codec = codec.to_ascii_lowercase();
        if !AUDIO_CODECS.contains(&codec.as_str()) {
            return Err(MediaError::validation(format!(
                "Unsupported audio_format '{codec}'. Supported: {}",
                AUDIO_CODECS.join(", ")
            )));
        }
        audio.codec = codec;
    }

    if let Some(quality) = quality.map(str::trim).filter(|q| !q.is_empty()) {
        if !quality.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MediaError::validation(format!(
                "Invalid audio_quality '{quality}'"
            )));
        }
        audio.quality = quality.to_string();
    }

    Ok(audio)
}

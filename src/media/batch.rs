//! Multi-item downloads: playlists through a single engine call, and batches
//! of independent URLs fanned out under a semaphore.

use super::engine::{AudioExtraction, EngineOptions, PlaylistRange};
use super::errors::{EngineErrorKind, MediaError};
use super::layout::DownloadDirs;
use super::platform::Platform;
use super::types::{DownloadOutcome, DownloadType, OutcomeStatus};
use super::{run_blocking, MediaService};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

const DEFAULT_PLAYLIST_MAX: usize = 10;

/// Which slice of a playlist to download. Indices are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSelection {
    pub download_all: bool,
    pub max_downloads: usize,
    pub start_index: usize,
    pub end_index: Option<usize>,
}

impl Default for PlaylistSelection {
    fn default() -> Self {
        Self {
            download_all: false,
            max_downloads: DEFAULT_PLAYLIST_MAX,
            start_index: 1,
            end_index: None,
        }
    }
}

impl PlaylistSelection {
    /// An explicit end wins, then `download_all`, then `start + max - 1`.
    pub fn range(&self) -> Result<PlaylistRange, MediaError> {
        if self.start_index == 0 {
            return Err(MediaError::validation("start_index must be 1 or greater"));
        }

        let end = match self.end_index {
            Some(end) if end < self.start_index => {
                return Err(MediaError::validation(format!(
                    "end_index ({end}) must not be lower than start_index ({})",
                    self.start_index
                )));
            }
            Some(end) => Some(end),
            None if self.download_all => None,
            None if self.max_downloads == 0 => {
                return Err(MediaError::validation("max_downloads must be 1 or greater"));
            }
            None => Some(
                self.start_index
                    .checked_add(self.max_downloads - 1)
                    .ok_or_else(|| MediaError::validation("playlist range is too large"))?,
            ),
        };

        Ok(PlaylistRange {
            start: self.start_index,
            end,
        })
    }
}

async fn create_dir(dir: &Path) -> Result<(), MediaError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| MediaError::unexpected(format!("cannot create {}: {e}", dir.display())))
}

fn apply_audio(options: &mut EngineOptions) {
    options.format = "bestaudio/best".to_string();
    options.audio = Some(AudioExtraction::default());
}

impl MediaService {
    /// Downloads a slice of a playlist. The engine walks the items itself and
    /// keeps going past failed ones; each completed file counts as a success
    /// and each reported item error as a failure.
    pub async fn download_playlist(
        &self,
        platform: Platform,
        url: &Url,
        selection: PlaylistSelection,
        audio_only: bool,
    ) -> Result<DownloadOutcome, MediaError> {
        platform.check_supported(url)?;
        let range = selection.range()?;

        let dir = if audio_only {
            self.dirs.playlist_audio()
        } else {
            self.dirs.playlists()
        };
        create_dir(&dir).await?;

        let mut options = self.base_options();
        options.ignore_errors = true;
        options.playlist_items = Some(range);
        options.output_template = Some(DownloadDirs::playlist_template(&dir));
        if audio_only {
            apply_audio(&mut options);
        }

        info!("Downloading {} playlist items {} from {}", platform, range, url);
        let target = url.to_string();
        let report = self
            .run_engine(move |engine| engine.download(&target, &options))
            .await?;

        for failure in &report.failures {
            warn!("Playlist item failed for {}: {}", url, failure);
        }

        let success = report.files.len();
        let errors = report.failures.len();
        info!("Playlist {} finished: {} downloaded, {} failed", url, success, errors);

        Ok(DownloadOutcome::multi(
            OutcomeStatus::Success,
            DownloadType::Playlist,
            &report.files,
            success,
            errors,
            format!("Downloaded {success} playlist items ({errors} failed)"),
        ))
    }

    /// Downloads independent URLs concurrently, at most `max_concurrent` at a
    /// time. Item failures are counted, never propagated.
    pub async fn batch(
        &self,
        urls: Vec<Url>,
        format_preference: Option<String>,
        audio_only: bool,
        max_concurrent: Option<usize>,
    ) -> Result<DownloadOutcome, MediaError> {
        if urls.is_empty() {
            return Err(MediaError::validation("urls must contain at least one URL"));
        }

        let dir = if audio_only {
            self.dirs.batch_audio()
        } else {
            self.dirs.batch()
        };
        create_dir(&dir).await?;

        let mut options = self.base_options();
        options.output_template = Some(DownloadDirs::file_template(&dir));
        // each batch item is one post, never the playlist it may be part of
        options.no_playlist = true;
        if audio_only {
            apply_audio(&mut options);
        } else if let Some(format) = format_preference
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
        {
            options.format = format;
        }

        let limit = max_concurrent.unwrap_or(self.config.max_concurrent).max(1);
        let total = urls.len();
        info!(
            "Starting batch of {} URLs with max {} concurrent (format: {})",
            total, limit, options.format
        );

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        for url in urls {
            let semaphore = Arc::clone(&semaphore);
            let engine = Arc::clone(&self.engine);
            let options = options.clone();

            tasks.spawn(async move {
                let result = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(MediaError::unexpected)?;
                    let target = url.to_string();
                    let report =
                        run_blocking(engine, move |engine| engine.download(&target, &options))
                            .await?;
                    if report.files.is_empty() {
                        return Err(MediaError::engine(
                            EngineErrorKind::NoFilesDownloaded,
                            url.as_str(),
                        ));
                    }
                    Ok::<_, MediaError>(report.files)
                }
                .await;
                (url, result)
            });
        }

        let mut files: Vec<PathBuf> = Vec::new();
        let mut success = 0;
        let mut errors = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((url, Ok(downloaded))) => {
                    debug!("Batch item {} produced {} files", url, downloaded.len());
                    success += 1;
                    files.extend(downloaded);
                }
                Ok((url, Err(e))) => {
                    warn!("Batch item {} failed: {}", url, e);
                    errors += 1;
                }
                Err(e) => {
                    error!("Batch task panicked or was cancelled: {}", e);
                    errors += 1;
                }
            }
        }

        info!("Batch finished: {} of {} succeeded", success, total);
        Ok(DownloadOutcome::multi(
            OutcomeStatus::Success,
            DownloadType::Batch,
            &files,
            success,
            errors,
            format!("Batch download completed: {success} succeeded, {errors} failed"),
        ))
    }
}

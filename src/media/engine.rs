use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The external extraction engine.
///
/// Every call blocks the calling thread until the engine finishes, so callers
/// on the async runtime must go through `spawn_blocking`.
pub trait MediaEngine: Send + Sync {
    /// Human-readable name of the engine
    fn name(&self) -> &'static str;

    /// Extract post information without downloading anything
    fn extract_info(&self, url: &str, options: &EngineOptions) -> Result<RawInfo, EngineFailure>;

    /// Download according to `options`, returning every file that completed
    fn download(&self, url: &str, options: &EngineOptions) -> Result<DownloadReport, EngineFailure>;

    /// Check that the engine can be run, returning its version
    fn probe(&self) -> Result<String, EngineFailure>;
}

#[derive(Debug, Error)]
pub enum EngineFailure {
    /// The engine ran and reported an error for the request
    #[error("{0}")]
    Reported(String),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed engine output: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Files that completed during a download call, plus the per-item errors the
/// engine reported while continuing past failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadReport {
    pub files: Vec<PathBuf>,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioExtraction {
    pub codec: String,
    pub quality: String,
}

impl Default for AudioExtraction {
    fn default() -> Self {
        Self {
            codec: "mp3".to_string(),
            quality: "192".to_string(),
        }
    }
}

/// 1-based inclusive playlist range; an open end means "to the last item".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl fmt::Display for PlaylistRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}:{}", self.start, end),
            None => write!(f, "{}:", self.start),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub format: String,
    pub output_template: Option<PathBuf>,
    pub socket_timeout: Duration,
    pub max_filesize: Option<String>,
    pub ignore_errors: bool,
    pub no_playlist: bool,
    pub flat_playlist: bool,
    pub playlist_items: Option<PlaylistRange>,
    pub audio: Option<AudioExtraction>,
}

impl EngineOptions {
    /// Non-interactive defaults: single best format, errors abort the call.
    pub fn new(socket_timeout: Duration, max_filesize: Option<String>) -> Self {
        Self {
            format: "best".to_string(),
            output_template: None,
            socket_timeout,
            max_filesize,
            ignore_errors: false,
            no_playlist: false,
            flat_playlist: false,
            playlist_items: None,
            audio: None,
        }
    }

    /// Keep going past sub-errors and accept the lowest quality, so the
    /// engine returns whatever information it can still assemble.
    pub fn permissive(mut self) -> Self {
        self.ignore_errors = true;
        self.format = "worst".to_string();
        self
    }
}

/// Post information as the engine reports it. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub uploader: Option<String>,
    pub upload_date: Option<String>,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub thumbnail: Option<String>,
    pub thumbnails: Option<Vec<RawThumbnail>>,
    pub webpage_url: Option<String>,
    pub url: Option<String>,
    pub formats: Option<Vec<RawFormat>>,
    pub is_live: Option<bool>,
    pub live_status: Option<String>,
    #[serde(rename = "_type")]
    pub kind: Option<String>,
    pub playlist_count: Option<u64>,
    pub entries: Option<Vec<Option<RawInfo>>>,
}

impl RawInfo {
    pub fn is_live(&self) -> bool {
        self.is_live.unwrap_or(false) || self.live_status.as_deref() == Some("is_live")
    }

    pub fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist") || self.entries.is_some()
    }

    /// The main thumbnail followed by every listed thumbnail URL.
    pub fn thumbnail_urls(&self) -> impl Iterator<Item = &str> {
        self.thumbnail.as_deref().into_iter().chain(
            self.thumbnails
                .iter()
                .flatten()
                .filter_map(|t| t.url.as_deref()),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawThumbnail {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub format_note: Option<String>,
    pub ext: Option<String>,
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
    pub tbr: Option<f64>,
    pub vbr: Option<f64>,
    pub abr: Option<f64>,
    pub quality: Option<f64>,
}

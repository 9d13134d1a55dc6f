use super::classify::classify_format;
use super::engine::{RawFormat, RawInfo};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatType {
    Combined,
    VideoOnly,
    AudioOnly,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityCategory {
    Best,
    High,
    Medium,
    Low,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
    None,
    Playlist,
    Live,
}

impl MediaType {
    /// Formats make a post live or video, then images make it an image post.
    /// A live post without formats has nothing to offer and resolves to `None`.
    pub fn resolve(is_live: bool, has_formats: bool, has_images: bool) -> Self {
        if has_formats && is_live {
            Self::Live
        } else if has_formats {
            Self::Video
        } else if has_images {
            Self::Image
        } else {
            Self::None
        }
    }
}

/// One downloadable rendition of a post.
#[derive(Debug, Clone, Serialize)]
pub struct MediaFormat {
    pub format_id: String,
    pub format_note: Option<String>,
    pub ext: String,
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub tbr: Option<f64>,
    pub vbr: Option<f64>,
    pub abr: Option<f64>,
    pub quality: Option<f64>,
    #[serde(rename = "type")]
    pub format_type: FormatType,
    pub quality_category: QualityCategory,
    pub codec_label: String,
    pub glyph: &'static str,
}

impl MediaFormat {
    pub fn from_raw(raw: RawFormat) -> Self {
        let classification = classify_format(
            raw.vcodec.as_deref(),
            raw.acodec.as_deref(),
            raw.height,
            raw.abr.or(raw.tbr),
            raw.format_note.as_deref(),
        );

        let resolution = raw.resolution.clone().or_else(|| match (raw.width, raw.height) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        });

        Self {
            format_id: raw.format_id.unwrap_or_default(),
            format_note: raw.format_note,
            ext: raw.ext.unwrap_or_else(|| "unknown".to_string()),
            resolution,
            width: raw.width,
            height: raw.height,
            fps: raw.fps,
            vcodec: raw.vcodec,
            acodec: raw.acodec,
            filesize: raw.filesize.map(to_bytes),
            filesize_approx: raw.filesize_approx.map(to_bytes),
            tbr: raw.tbr,
            vbr: raw.vbr,
            abr: raw.abr,
            quality: raw.quality,
            format_type: classification.format_type,
            quality_category: classification.category,
            codec_label: classification.label,
            glyph: classification.glyph,
        }
    }
}

fn to_bytes(size: f64) -> u64 {
    if size.is_finite() && size > 0.0 {
        size.round() as u64
    } else {
        0
    }
}

/// Normalized description of a post.
#[derive(Debug, Clone, Serialize)]
pub struct PostMetadata {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub uploader: Option<String>,
    pub upload_date: Option<String>,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub thumbnail: Option<String>,
    pub webpage_url: String,
    pub formats: Vec<MediaFormat>,
    pub media_type: MediaType,
    pub images: Option<Vec<String>>,
    pub has_media: bool,
    pub is_live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<PostMetadata>>,
}

impl PostMetadata {
    /// Builds a single post from engine output. `images` are only kept when
    /// the post turned out to carry no video formats.
    pub fn from_raw(raw: RawInfo, requested_url: &str, images: Vec<String>) -> Self {
        let is_live = raw.is_live();
        let formats: Vec<MediaFormat> = raw
            .formats
            .unwrap_or_default()
            .into_iter()
            .map(MediaFormat::from_raw)
            .collect();

        let images = if formats.is_empty() && !images.is_empty() {
            Some(images)
        } else {
            None
        };
        let has_images = images.is_some();
        let media_type = MediaType::resolve(is_live, !formats.is_empty(), has_images);

        Self {
            id: raw.id.unwrap_or_default(),
            title: raw.title.unwrap_or_else(|| "Unknown Title".to_string()),
            description: raw.description,
            uploader: raw.uploader,
            upload_date: raw.upload_date,
            duration: raw.duration,
            view_count: raw.view_count,
            like_count: raw.like_count,
            thumbnail: raw.thumbnail,
            webpage_url: raw
                .webpage_url
                .or(raw.url)
                .unwrap_or_else(|| requested_url.to_string()),
            has_media: !formats.is_empty() || has_images,
            formats,
            media_type,
            images,
            is_live,
            playlist_count: None,
            entries: None,
        }
    }

    /// Builds a playlist with one level of children. Nested playlists among
    /// the children are kept as plain entries and not expanded.
    pub fn playlist_from_raw(mut raw: RawInfo, requested_url: &str) -> Self {
        let children: Vec<PostMetadata> = raw
            .entries
            .take()
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|mut entry| {
                entry.entries = None;
                let url = entry.url.clone().unwrap_or_default();
                Self::from_raw(entry, &url, Vec::new())
            })
            .collect();

        let count = raw
            .playlist_count
            .map(|c| c as usize)
            .unwrap_or(children.len());
        let mut playlist = Self::from_raw(raw, requested_url, Vec::new());
        playlist.formats.clear();
        playlist.media_type = MediaType::Playlist;
        playlist.has_media = !children.is_empty();
        playlist.playlist_count = Some(count);
        playlist.entries = Some(children);
        playlist
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Ok,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadType {
    Video,
    Audio,
    Images,
    Playlist,
    Batch,
}

/// Terminal result of a download attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_type: Option<DownloadType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
}

impl DownloadOutcome {
    pub fn single(path: &Path, size: u64, download_type: DownloadType, message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Ok,
            file_path: Some(path.display().to_string()),
            filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            file_size: Some(size),
            message: message.into(),
            download_type: Some(download_type),
            downloaded_files: None,
            total_files: None,
            success_count: None,
            error_count: None,
        }
    }

    /// Multi-item outcome. The total is always `success + error`.
    pub fn multi(
        status: OutcomeStatus,
        download_type: DownloadType,
        files: &[PathBuf],
        success_count: usize,
        error_count: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            file_path: None,
            filename: None,
            file_size: None,
            message: message.into(),
            download_type: Some(download_type),
            downloaded_files: Some(files.iter().map(|f| f.display().to_string()).collect()),
            total_files: Some(success_count + error_count),
            success_count: Some(success_count),
            error_count: Some(error_count),
        }
    }

    pub fn with_file_path(mut self, path: &Path) -> Self {
        self.file_path = Some(path.display().to_string());
        self
    }
}

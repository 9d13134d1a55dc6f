use crate::media::PostMetadata;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,
    pub format_id: Option<String>,
    #[serde(default)]
    pub audio_only: bool,
    pub audio_format: Option<String>,
    pub audio_quality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageDownloadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_true")]
    pub download_all: bool,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistDownloadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub download_all: bool,
    pub max_downloads: Option<usize>,
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    #[serde(default)]
    pub audio_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchDownloadRequest {
    #[serde(default)]
    pub urls: Vec<String>,
    pub format_preference: Option<String>,
    #[serde(default)]
    pub audio_only: bool,
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub status: &'static str,
    pub metadata: PostMetadata,
    pub message: String,
}

impl ExtractResponse {
    pub fn ok(metadata: PostMetadata, message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            metadata,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub download_dir: String,
    pub supported_platforms: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let images: ImageDownloadRequest =
            serde_json::from_str(r#"{"url": "https://x.com/a/status/1"}"#).unwrap();
        assert!(images.download_all);

        let playlist: PlaylistDownloadRequest =
            serde_json::from_str(r#"{"url": "https://youtube.com/playlist?list=1"}"#).unwrap();
        assert!(!playlist.download_all);
        assert!(!playlist.audio_only);
        assert_eq!(playlist.max_downloads, None);

        let download: DownloadRequest = serde_json::from_str("{}").unwrap();
        assert!(download.url.is_empty());
        assert!(download.format_id.is_none());
    }
}

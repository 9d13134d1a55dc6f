use super::errors::{EngineErrorKind, MediaError};
use super::platform::Platform;
use super::types::{DownloadOutcome, DownloadType, OutcomeStatus};
use super::MediaService;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// File extension for an image URL: the `format=` query value, then the path
/// extension, then `jpg`.
pub fn image_extension(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "jpg".to_string();
    };

    let from_query = parsed
        .query_pairs()
        .find(|(key, _)| key == "format")
        .map(|(_, value)| value.to_ascii_lowercase());
    let from_path = || {
        let name = parsed.path_segments()?.next_back()?;
        // legacy `name.jpg:large` suffixes
        let name = name.split(':').next()?;
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    };

    from_query
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .or_else(|| from_path().filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str())))
        .unwrap_or_else(|| "jpg".to_string())
}

impl MediaService {
    /// Downloads the images of an image post into `images/<title [id]>/`.
    pub async fn download_images(
        &self,
        platform: Platform,
        url: &Url,
        download_all: bool,
    ) -> Result<DownloadOutcome, MediaError> {
        let post = self.extract(platform, url).await?;
        let mut images = post.images.unwrap_or_default();
        if images.is_empty() {
            return Err(MediaError::engine(EngineErrorKind::NoMediaFound, url.as_str()));
        }
        if !download_all {
            images.truncate(1);
        }

        let dir = self.dirs.image_post(&post.title, &post.id);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            MediaError::unexpected(format!("cannot create {}: {e}", dir.display()))
        })?;

        info!("Downloading {} images from {} into {}", images.len(), url, dir.display());

        let mut files: Vec<PathBuf> = Vec::new();
        let mut errors = 0;
        for (index, image_url) in images.iter().enumerate() {
            let path = dir.join(format!(
                "{}_{}.{}",
                post.id,
                index + 1,
                image_extension(image_url)
            ));

            let result = match self.fetcher.fetch_bytes(image_url).await {
                Ok(data) => tokio::fs::write(&path, data).await.map_err(anyhow::Error::from),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    debug!("Saved {}", path.display());
                    files.push(path);
                }
                Err(e) => {
                    warn!("Failed to download image {}: {:#}", image_url, e);
                    errors += 1;
                }
            }
        }

        if files.is_empty() {
            return Err(MediaError::engine(EngineErrorKind::NoFilesDownloaded, url.as_str()));
        }

        let message = format!("Downloaded {} of {} images", files.len(), images.len());
        Ok(
            DownloadOutcome::multi(OutcomeStatus::Ok, DownloadType::Images, &files, files.len(), errors, message)
                .with_file_path(&dir),
        )
    }
}

use crate::utils::sanitize_path_component;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const FILE_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";
const PLAYLIST_FILE_TEMPLATE: &str = "%(playlist_index)02d - %(title)s [%(id)s].%(ext)s";

/// The download tree shared by every request.
#[derive(Debug, Clone)]
pub struct DownloadDirs {
    root: PathBuf,
}

impl DownloadDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn audio(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn playlists(&self) -> PathBuf {
        self.root.join("playlists")
    }

    pub fn playlist_audio(&self) -> PathBuf {
        self.playlists().join("audio")
    }

    pub fn batch(&self) -> PathBuf {
        self.root.join("batch")
    }

    pub fn batch_audio(&self) -> PathBuf {
        self.batch().join("audio")
    }

    pub fn images(&self) -> PathBuf {
        self.root.join("images")
    }

    /// `images/<title [id]>/`. Only the title is shortened, the id is always kept.
    pub fn image_post(&self, title: &str, id: &str) -> PathBuf {
        self.images().join(format!(
            "{} [{}]",
            sanitize_path_component(title),
            sanitize_path_component(id)
        ))
    }

    /// Creates the whole tree. Safe to call repeatedly.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.audio(),
            self.playlists(),
            self.playlist_audio(),
            self.batch(),
            self.batch_audio(),
            self.images(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn file_template(dir: &Path) -> PathBuf {
        dir.join(FILE_TEMPLATE)
    }

    pub fn playlist_template(dir: &Path) -> PathBuf {
        dir.join(PLAYLIST_FILE_TEMPLATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = DownloadDirs::new(tmp.path().join("downloads"));
        dirs.ensure().unwrap();
        dirs.ensure().unwrap();

        for sub in ["audio", "playlists/audio", "batch/audio", "images"] {
            assert!(dirs.root().join(sub).is_dir(), "{sub} missing");
        }
    }

    #[test]
    fn test_templates_embed_title_and_id() {
        let template = DownloadDirs::file_template(Path::new("/dl"));
        assert_eq!(template, PathBuf::from("/dl/%(title)s [%(id)s].%(ext)s"));

        let playlist = DownloadDirs::playlist_template(Path::new("/dl/playlists"));
        assert!(playlist.to_string_lossy().contains("%(playlist_index)02d - "));
    }

    #[test]
    fn test_image_post_dir() {
        let dirs = DownloadDirs::new("/dl");
        assert_eq!(
            dirs.image_post("A/B", "42"),
            PathBuf::from("/dl/images/A_B [42]")
        );
    }

    #[test]
    fn test_long_titles_keep_the_id() {
        let dirs = DownloadDirs::new("/dl");
        let title = "A".repeat(100);
        let first = dirs.image_post(&title, "111");
        let second = dirs.image_post(&title, "222");

        assert_ne!(first, second);
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("{} [111]", "A".repeat(80)));
    }
}

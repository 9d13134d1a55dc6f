use super::engine::EngineOptions;
use super::errors::{EngineErrorKind, MediaError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    Facebook,
    Twitter,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Youtube,
        Platform::Instagram,
        Platform::Facebook,
        Platform::Twitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
        }
    }

    /// Platforms whose posts may carry images and no video at all.
    pub fn hosts_image_posts(&self) -> bool {
        matches!(self, Platform::Twitter)
    }

    /// Path segment preceding the post id, e.g. `/<user>/status/<id>`.
    pub fn post_id_marker(&self) -> Option<&'static str> {
        match self {
            Platform::Twitter => Some("status"),
            _ => None,
        }
    }

    /// Adjust the engine options for a single-post call on this platform.
    pub fn tune(&self, options: &mut EngineOptions) {
        if let Platform::Youtube = self {
            options.no_playlist = true;
        }
    }

    /// Rejects URL shapes the engine is known not to handle.
    pub fn check_supported(&self, url: &Url) -> Result<(), MediaError> {
        if let Platform::Youtube = self {
            let path = url.path().to_ascii_lowercase();
            let is_text_post = path.starts_with("/post/")
                || path.split('/').any(|segment| segment == "community" || segment == "posts");
            if is_text_post {
                return Err(MediaError::engine(EngineErrorKind::UnsupportedTab, url.as_str()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "twitter" | "x" => Ok(Platform::Twitter),
            other => Err(MediaError::validation(format!(
                "Unsupported platform '{other}'. Supported platforms: youtube, instagram, facebook, twitter"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_platform() {
        assert_eq!("YouTube".parse::<Platform>().unwrap(), Platform::Youtube);
        assert_eq!("x".parse::<Platform>().unwrap(), Platform::Twitter);
        assert!(matches!("tiktok".parse::<Platform>(), Err(MediaError::Validation(_))));
    }

    #[test]
    fn test_youtube_text_posts_rejected() {
        let post = Url::parse("https://www.youtube.com/post/UgkxAbc").unwrap();
        let err = Platform::Youtube.check_supported(&post).unwrap_err();
        assert_eq!(err.kind(), Some(EngineErrorKind::UnsupportedTab));

        let tab = Url::parse("https://www.youtube.com/@someone/community").unwrap();
        assert!(Platform::Youtube.check_supported(&tab).is_err());

        let video = Url::parse("https://www.youtube.com/watch?v=abc").unwrap();
        assert!(Platform::Youtube.check_supported(&video).is_ok());
        assert!(Platform::Twitter.check_supported(&post).is_ok());
    }

    #[test]
    fn test_post_id_marker_only_for_image_hosts() {
        for platform in Platform::ALL {
            assert_eq!(platform.post_id_marker().is_some(), platform.hosts_image_posts());
        }
        assert_eq!(Platform::Twitter.post_id_marker(), Some("status"));
    }

    #[test]
    fn test_tune_only_touches_youtube() {
        let mut options = EngineOptions::new(Duration::from_secs(1), None);
        Platform::Twitter.tune(&mut options);
        assert!(!options.no_playlist);
        Platform::Youtube.tune(&mut options);
        assert!(options.no_playlist);
    }
}

//! Image-post fallback.
//!
//! Some platforms host posts that carry only images. The engine reports
//! those as "no video found", so when that specific error comes back we try,
//! in order: a permissive re-extraction, a stub built from the post id in
//! the URL, and finally scraping image URLs out of the public page. Each
//! step logs and swallows its own failure.

use super::engine::RawInfo;
use super::errors::MediaError;
use super::platform::Platform;
use super::types::PostMetadata;
use super::MediaService;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use url::Url;

static MEDIA_IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://pbs\.twimg\.com/media/[A-Za-z0-9_-]+(?:\.(?:jpe?g|png|webp|gif))?(?:(?:\?|&amp;|&)(?:format|name)=[A-Za-z0-9_]+)*(?::(?:thumb|small|medium|large|orig))?",
    )
    .expect("media image pattern is valid")
});

static SIZE_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([?&]name=)(?:thumb|small|medium|120x120|240x240|360x360|900x900)\b")
        .expect("size query pattern is valid")
});

static SIZE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":(?:thumb|small|medium)$").expect("size suffix pattern is valid")
});

/// Rewrites small/medium size markers to `large`. Idempotent.
pub fn upgrade_image_url(url: &str) -> String {
    let upgraded = SIZE_QUERY.replace_all(url, "${1}large");
    SIZE_SUFFIX.replace(&upgraded, ":large").into_owned()
}

/// Image URLs found in an HTML page, unescaped, upgraded and deduplicated in
/// order of first appearance.
pub fn extract_image_urls(html: &str) -> Vec<String> {
    dedup_upgraded(
        MEDIA_IMAGE_URL
            .find_iter(html)
            .map(|m| m.as_str().replace("&amp;", "&")),
    )
}

/// Post images the engine exposed through its thumbnail list.
pub fn images_from_info(raw: &RawInfo) -> Vec<String> {
    dedup_upgraded(
        raw.thumbnail_urls()
            .filter(|url| MEDIA_IMAGE_URL.is_match(url))
            .map(str::to_string),
    )
}

fn dedup_upgraded(urls: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.map(|url| upgrade_image_url(&url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// The path segment following `marker`, e.g. the id in `/user/status/<id>`.
pub fn post_id_from_url(url: &Url, marker: &str) -> Option<String> {
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == marker)?;
    segments
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Minimal record carrying only an id, used to shape a response.
fn stub_info(id: &str, url: &Url) -> RawInfo {
    RawInfo {
        id: Some(id.to_string()),
        title: Some(format!("Post {id}")),
        webpage_url: Some(url.to_string()),
        ..Default::default()
    }
}

impl MediaService {
    /// Images exposed by the engine output, or scraped from the page when
    /// there are none.
    pub(super) async fn find_images(&self, url: &Url, raw: &RawInfo) -> Vec<String> {
        let images = images_from_info(raw);
        if !images.is_empty() {
            return images;
        }
        self.scrape_images(url).await
    }

    async fn scrape_images(&self, url: &Url) -> Vec<String> {
        match self.fetcher.fetch_text(url.as_str()).await {
            Ok(html) => {
                let images = extract_image_urls(&html);
                debug!("Scraped {} image URLs from {}", images.len(), url);
                images
            }
            Err(e) => {
                warn!("Image scraping failed for {}: {:#}", url, e);
                Vec::new()
            }
        }
    }

    /// Resolves a post whose primary extraction found no video. Only fails,
    /// with `original`, when not even a stub record can be built.
    pub(super) async fn resolve_image_post(
        &self,
        platform: Platform,
        url: &Url,
        original: MediaError,
    ) -> Result<PostMetadata, MediaError> {
        let mut options = self.base_options().permissive();
        platform.tune(&mut options);
        let target = url.to_string();

        let raw = match self
            .run_engine(move |engine| engine.extract_info(&target, &options))
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                debug!("Permissive extraction failed for {}: {}", url, err);
                let id = platform
                    .post_id_marker()
                    .and_then(|marker| post_id_from_url(url, marker));
                match id {
                    Some(id) => stub_info(&id, url),
                    None => {
                        warn!("No post id in {}, keeping original error", url);
                        return Err(original);
                    }
                }
            }
        };

        let images = self.find_images(url, &raw).await;
        let metadata = PostMetadata::from_raw(raw, url.as_str(), images);
        info!(
            "Image fallback for {} resolved as {:?} with {} images",
            url,
            metadata.media_type,
            metadata.images.as_ref().map_or(0, Vec::len)
        );
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::super::engine::{EngineFailure, RawThumbnail};
    use super::super::errors::EngineErrorKind;
    use super::super::parse_url;
    use super::super::testing::{self, FakeEngine, FakeFetcher};
    use super::super::types::MediaType;
    use super::*;
    use std::sync::Arc;

    const TWEET: &str = "https://x.com/someone/status/1790000000000000001";

    fn no_video() -> EngineFailure {
        EngineFailure::Reported(
            "[twitter] 1790000000000000001: No video could be found in this tweet".to_string(),
        )
    }

    #[test]
    fn test_upgrade_image_url() {
        assert_eq!(
            upgrade_image_url("https://pbs.twimg.com/media/Abc?format=jpg&name=small"),
            "https://pbs.twimg.com/media/Abc?format=jpg&name=large"
        );
        assert_eq!(
            upgrade_image_url("https://pbs.twimg.com/media/Abc.jpg:medium"),
            "https://pbs.twimg.com/media/Abc.jpg:large"
        );
        assert_eq!(
            upgrade_image_url("https://pbs.twimg.com/media/Abc?format=png&name=orig"),
            "https://pbs.twimg.com/media/Abc?format=png&name=orig"
        );
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        for url in [
            "https://pbs.twimg.com/media/Abc?format=jpg&name=900x900",
            "https://pbs.twimg.com/media/Abc.png:thumb",
            "https://pbs.twimg.com/media/Abc?name=medium&format=webp",
        ] {
            let once = upgrade_image_url(url);
            assert_eq!(upgrade_image_url(&once), once);
        }
    }

    #[test]
    fn test_extract_image_urls_from_html() {
        let html = r#"
            <meta property="og:image" content="https://pbs.twimg.com/media/AAA?format=jpg&amp;name=small">
            <img src="https://pbs.twimg.com/media/AAA?format=jpg&name=large">
            <img src="https://pbs.twimg.com/media/BBB.png">
            <img src="https://pbs.twimg.com/profile_images/1/me.jpg">
        "#;
        assert_eq!(
            extract_image_urls(html),
            vec![
                "https://pbs.twimg.com/media/AAA?format=jpg&name=large".to_string(),
                "https://pbs.twimg.com/media/BBB.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_images_from_info_skips_video_thumbnails() {
        let raw = RawInfo {
            thumbnail: Some("https://pbs.twimg.com/ext_tw_video_thumb/1/pu/img/x.jpg".to_string()),
            thumbnails: Some(vec![RawThumbnail {
                url: Some("https://pbs.twimg.com/media/CCC?format=jpg&name=small".to_string()),
            }]),
            ..Default::default()
        };
        assert_eq!(
            images_from_info(&raw),
            vec!["https://pbs.twimg.com/media/CCC?format=jpg&name=large".to_string()]
        );
    }

    #[test]
    fn test_post_id_from_url() {
        let url = Url::parse(TWEET).unwrap();
        assert_eq!(post_id_from_url(&url, "status").as_deref(), Some("1790000000000000001"));
        let profile = Url::parse("https://x.com/someone").unwrap();
        assert_eq!(post_id_from_url(&profile, "status"), None);
    }

    #[tokio::test]
    async fn test_image_post_scraped_after_no_video_error() {
        let html = r#"
            <img src="https://pbs.twimg.com/media/A1?format=jpg&name=small">
            <img src="https://pbs.twimg.com/media/B2?format=jpg&name=medium">
            <img src="https://pbs.twimg.com/media/C3?format=png&name=small">
            <img src="https://pbs.twimg.com/media/A1?format=jpg&name=large">
        "#;
        let engine = FakeEngine::new().on_extract(|_, _| Err(no_video()));
        let fetcher = FakeFetcher::default().with_page(TWEET, html);
        let (service, _tmp) = testing::service(engine, fetcher);
        let url = parse_url(TWEET).unwrap();

        let post = service.extract(Platform::Twitter, &url).await.unwrap();
        assert_eq!(post.media_type, MediaType::Image);
        assert_eq!(post.images.as_ref().map(Vec::len), Some(3));
        assert!(post.formats.is_empty());
        assert!(post.has_media);
        assert_eq!(post.id, "1790000000000000001");
    }

    #[tokio::test]
    async fn test_permissive_extraction_is_tried_first() {
        let engine = Arc::new(FakeEngine::new().on_extract(|_, options| {
            if options.ignore_errors {
                Ok(RawInfo {
                    id: Some("1790000000000000001".to_string()),
                    title: Some("Photos".to_string()),
                    thumbnails: Some(vec![RawThumbnail {
                        url: Some("https://pbs.twimg.com/media/Z9?format=jpg&name=small".to_string()),
                    }]),
                    ..Default::default()
                })
            } else {
                Err(no_video())
            }
        }));
        let fetcher = Arc::new(FakeFetcher::default());
        let (service, _tmp) = testing::service_with(Arc::clone(&engine), Arc::clone(&fetcher));
        let url = parse_url(TWEET).unwrap();

        let post = service.extract(Platform::Twitter, &url).await.unwrap();
        assert_eq!(post.title, "Photos");
        assert_eq!(post.media_type, MediaType::Image);
        assert_eq!(post.images.unwrap().len(), 1);
        let calls = engine.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].options.format, "worst");
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_post_without_media_shapes_empty_response() {
        let engine = FakeEngine::new().on_extract(|_, _| Err(no_video()));
        let (service, _tmp) = testing::service(engine, FakeFetcher::default());
        let url = parse_url(TWEET).unwrap();

        let post = service.extract(Platform::Twitter, &url).await.unwrap();
        assert_eq!(post.media_type, MediaType::None);
        assert!(!post.has_media);
        assert!(post.images.is_none());
    }

    #[tokio::test]
    async fn test_original_error_kept_without_post_id() {
        let engine = FakeEngine::new().on_extract(|_, _| Err(no_video()));
        let (service, _tmp) = testing::service(engine, FakeFetcher::default());
        let url = parse_url("https://x.com/someone").unwrap();

        let err = service.extract(Platform::Twitter, &url).await.unwrap_err();
        assert_eq!(err.kind(), Some(EngineErrorKind::NoMediaFound));
    }

    #[tokio::test]
    async fn test_other_errors_skip_fallback() {
        let engine = Arc::new(FakeEngine::new().on_extract(|_, _| {
            Err(EngineFailure::Reported("HTTP Error 429: Too Many Requests".to_string()))
        }));
        let fetcher = Arc::new(FakeFetcher::default());
        let (service, _tmp) = testing::service_with(Arc::clone(&engine), Arc::clone(&fetcher));
        let url = parse_url(TWEET).unwrap();

        let err = service.extract(Platform::Twitter, &url).await.unwrap_err();
        assert_eq!(err.kind(), Some(EngineErrorKind::Other));
        assert_eq!(err.to_string(), "Download error: HTTP Error 429: Too Many Requests");
        assert_eq!(engine.calls().len(), 1);
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_no_media_on_non_image_platform_is_not_resolved() {
        let engine = Arc::new(FakeEngine::new().on_extract(|_, _| Err(no_video())));
        let (service, _tmp) = testing::service_shared(Arc::clone(&engine), FakeFetcher::default());
        let url = parse_url("https://www.facebook.com/watch/?v=1").unwrap();

        let err = service.extract(Platform::Facebook, &url).await.unwrap_err();
        assert_eq!(err.kind(), Some(EngineErrorKind::NoMediaFound));
        assert_eq!(engine.calls().len(), 1);
    }
}

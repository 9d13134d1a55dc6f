//! In-process fakes for the engine and page-fetcher seams.

use super::engine::{
    DownloadReport, EngineFailure, EngineOptions, MediaEngine, RawFormat, RawInfo,
};
use super::fetch::PageFetcher;
use super::{MediaService, ServiceConfig};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type ExtractFn = dyn Fn(&str, &EngineOptions) -> Result<RawInfo, EngineFailure> + Send + Sync;
type DownloadFn = dyn Fn(&str, &EngineOptions) -> Result<DownloadReport, EngineFailure> + Send + Sync;

#[derive(Debug, Clone)]
pub struct Call {
    pub op: &'static str,
    pub url: String,
    pub options: EngineOptions,
}

pub struct FakeEngine {
    extract: Box<ExtractFn>,
    download: Box<DownloadFn>,
    calls: Mutex<Vec<Call>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            extract: Box::new(|url: &str, _: &EngineOptions| {
                Err(EngineFailure::Reported(format!("Unsupported URL: {url}")))
            }),
            download: Box::new(|url: &str, _: &EngineOptions| {
                Err(EngineFailure::Reported(format!("Unsupported URL: {url}")))
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_extract(
        mut self,
        f: impl Fn(&str, &EngineOptions) -> Result<RawInfo, EngineFailure> + Send + Sync + 'static,
    ) -> Self {
        self.extract = Box::new(f);
        self
    }

    pub fn on_download(
        mut self,
        f: impl Fn(&str, &EngineOptions) -> Result<DownloadReport, EngineFailure> + Send + Sync + 'static,
    ) -> Self {
        self.download = Box::new(f);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str, url: &str, options: &EngineOptions) {
        self.calls.lock().unwrap().push(Call {
            op,
            url: url.to_string(),
            options: options.clone(),
        });
    }
}

impl MediaEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn extract_info(&self, url: &str, options: &EngineOptions) -> Result<RawInfo, EngineFailure> {
        self.record("extract", url, options);
        (self.extract)(url, options)
    }

    fn download(&self, url: &str, options: &EngineOptions) -> Result<DownloadReport, EngineFailure> {
        self.record("download", url, options);
        (self.download)(url, options)
    }

    fn probe(&self) -> Result<String, EngineFailure> {
        Ok("0.0-fake".to_string())
    }
}

/// A post with a 1080p combined format and a 128 kbps audio-only format.
pub fn video_info() -> RawInfo {
    RawInfo {
        id: Some("abc".to_string()),
        title: Some("Clip".to_string()),
        formats: Some(vec![
            RawFormat {
                format_id: Some("22".to_string()),
                vcodec: Some("avc1.640028".to_string()),
                acodec: Some("mp4a.40.2".to_string()),
                height: Some(1080),
                ..Default::default()
            },
            RawFormat {
                format_id: Some("140".to_string()),
                vcodec: Some("none".to_string()),
                acodec: Some("mp4a.40.2".to_string()),
                abr: Some(128.0),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

pub fn reported(message: &str) -> EngineFailure {
    EngineFailure::Reported(message.to_string())
}

/// Engine output that could not be parsed.
pub fn malformed() -> EngineFailure {
    match serde_json::from_str::<RawInfo>("not json") {
        Err(e) => EngineFailure::Malformed(e),
        Ok(_) => unreachable!("garbage parsed as engine output"),
    }
}

/// Writes a small file where the output template points and reports it.
pub fn write_file_for(options: &EngineOptions, id: &str) -> DownloadReport {
    let template = options.output_template.as_ref().unwrap();
    let dir = template.parent().unwrap();
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("Title [{id}].mp4"));
    std::fs::write(&path, b"data").unwrap();
    DownloadReport {
        files: vec![path],
        failures: Vec::new(),
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    blobs: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_blob(mut self, url: &str, data: &[u8]) -> Self {
        self.blobs.insert(url.to_string(), data.to_vec());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("HTTP 404 for {url}"))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.blobs
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("HTTP 404 for {url}"))
    }
}

pub fn config(root: PathBuf) -> ServiceConfig {
    ServiceConfig {
        download_dir: root,
        socket_timeout: Duration::from_secs(300),
        max_filesize: Some("500M".to_string()),
        max_concurrent: 3,
    }
}

pub fn service(engine: FakeEngine, fetcher: FakeFetcher) -> (MediaService, TempDir) {
    service_with(Arc::new(engine), Arc::new(fetcher))
}

pub fn service_shared(engine: Arc<FakeEngine>, fetcher: FakeFetcher) -> (MediaService, TempDir) {
    service_with(engine, Arc::new(fetcher))
}

pub fn service_with(engine: Arc<FakeEngine>, fetcher: Arc<FakeFetcher>) -> (MediaService, TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path().join("downloads"));
    let service = MediaService::new(engine, fetcher, config);
    service.dirs().ensure().unwrap();
    (service, tmp)
}

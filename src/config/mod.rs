use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Process-wide settings: built-in defaults, then an optional TOML file, then
/// environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub download_dir: PathBuf,
    /// Per-call socket timeout in seconds
    pub download_timeout: u64,
    pub max_filesize: String,
    pub max_concurrent_downloads: usize,
    pub log_level: String,
    pub logging_format: String,
    pub bind_address: String,
    pub ytdlp_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
            download_timeout: 300,
            max_filesize: "500M".to_string(),
            max_concurrent_downloads: 3,
            log_level: "info".to_string(),
            logging_format: "json".to_string(),
            bind_address: "0.0.0.0:8000".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file {}", path))
    }

    /// Overlays environment values fetched through `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = get("DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }
        if let Some(timeout) = get("DOWNLOAD_TIMEOUT") {
            self.download_timeout = parse_env("DOWNLOAD_TIMEOUT", &timeout)?;
        }
        if let Some(max_filesize) = get("MAX_FILESIZE") {
            self.max_filesize = max_filesize;
        }
        if let Some(max) = get("MAX_CONCURRENT_DOWNLOADS") {
            self.max_concurrent_downloads = parse_env("MAX_CONCURRENT_DOWNLOADS", &max)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(format) = get("LOG_FORMAT") {
            self.logging_format = format;
        }
        if let Some(bind) = get("BIND_ADDRESS") {
            self.bind_address = bind;
        }
        if let Some(path) = get("YTDLP_PATH") {
            self.ytdlp_path = path;
        }

        self.validate()?;
        Ok(self)
    }

    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env(|key| std::env::var(key).ok())
    }

    fn validate(&self) -> Result<()> {
        if self.download_timeout == 0 {
            bail!("download_timeout must be greater than zero");
        }
        if self.max_concurrent_downloads == 0 {
            bail!("max_concurrent_downloads must be greater than zero");
        }
        Ok(())
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout)
    }

    pub fn get_logging_format(&self) -> &str {
        &self.logging_format
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, value))
}

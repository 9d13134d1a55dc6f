use super::engine::{DownloadReport, EngineFailure, EngineOptions, MediaEngine, RawInfo};
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::{debug, info, warn};

/// Drives the `yt-dlp` executable. Calls block until the process exits.
pub struct YtDlpEngine {
    program: String,
}

impl YtDlpEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[String]) -> Result<Output, EngineFailure> {
        debug!("Running {} {}", self.program, args.join(" "));
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| EngineFailure::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

fn common_args(options: &EngineOptions) -> Vec<String> {
    let mut args = vec![
        "--no-warnings".to_string(),
        "--no-progress".to_string(),
        "--socket-timeout".to_string(),
        options.socket_timeout.as_secs().max(1).to_string(),
        "--format".to_string(),
        options.format.clone(),
    ];

    if let Some(max_filesize) = &options.max_filesize {
        args.push("--max-filesize".to_string());
        args.push(max_filesize.clone());
    }
    if options.ignore_errors {
        args.push("--ignore-errors".to_string());
    }
    if options.no_playlist {
        args.push("--no-playlist".to_string());
    }
    if options.flat_playlist {
        args.push("--flat-playlist".to_string());
    }
    if let Some(range) = options.playlist_items {
        args.push("--playlist-items".to_string());
        args.push(range.to_string());
    }

    args
}

pub fn extract_args(url: &str, options: &EngineOptions) -> Vec<String> {
    let mut args = common_args(options);
    args.push("--dump-single-json".to_string());
    args.push("--skip-download".to_string());
    args.push("--".to_string());
    args.push(url.to_string());
    args
}

pub fn download_args(url: &str, options: &EngineOptions) -> Vec<String> {
    let mut args = common_args(options);

    if let Some(template) = &options.output_template {
        args.push("--output".to_string());
        args.push(template.display().to_string());
    }
    if let Some(audio) = &options.audio {
        args.push("--extract-audio".to_string());
        args.push("--audio-format".to_string());
        args.push(audio.codec.clone());
        args.push("--audio-quality".to_string());
        args.push(audio.quality.clone());
    }

    // --print alone implies --simulate
    args.push("--print".to_string());
    args.push("after_move:filepath".to_string());
    args.push("--no-simulate".to_string());
    args.push("--".to_string());
    args.push(url.to_string());
    args
}

/// Paths printed by `--print after_move:filepath`, one per completed file.
pub fn printed_paths(stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('['))
        .map(PathBuf::from)
        .collect()
}

/// `ERROR:` lines from stderr with the prefix removed.
pub fn error_lines(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .filter_map(|line| line.trim().strip_prefix("ERROR:"))
        .map(|line| line.trim().to_string())
        .collect()
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    error_lines(&stderr)
        .pop()
        .or_else(|| {
            stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .last()
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status))
}

impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn extract_info(&self, url: &str, options: &EngineOptions) -> Result<RawInfo, EngineFailure> {
        debug!("Extracting metadata with yt-dlp for: {}", url);
        let output = self.run(&extract_args(url, options))?;

        // With --ignore-errors yt-dlp may exit non-zero yet still print the info
        if !output.status.success() && (output.stdout.is_empty() || !options.ignore_errors) {
            return Err(EngineFailure::Reported(failure_message(&output)));
        }

        let info: RawInfo = serde_json::from_slice(&output.stdout)?;
        Ok(info)
    }

    fn download(&self, url: &str, options: &EngineOptions) -> Result<DownloadReport, EngineFailure> {
        info!("Downloading with yt-dlp: {} (format: {})", url, options.format);
        let output = self.run(&download_args(url, options))?;

        let report = DownloadReport {
            files: printed_paths(&String::from_utf8_lossy(&output.stdout)),
            failures: error_lines(&String::from_utf8_lossy(&output.stderr)),
        };

        if !output.status.success() && report.files.is_empty() && !options.ignore_errors {
            return Err(EngineFailure::Reported(failure_message(&output)));
        }

        for failure in &report.failures {
            warn!("yt-dlp item error for {}: {}", url, failure);
        }
        Ok(report)
    }

    fn probe(&self) -> Result<String, EngineFailure> {
        let output = self.run(&["--version".to_string()])?;
        if !output.status.success() {
            return Err(EngineFailure::Reported(failure_message(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

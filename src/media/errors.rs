use super::engine::EngineFailure;
use crate::utils::truncate_message;
use serde::Serialize;
use thiserror::Error;

const MAX_RAW_MESSAGE_CHARS: usize = 300;

/// What went wrong inside the engine, as far as its message text tells us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    NoMediaFound,
    PrivateVideo,
    MembersOnly,
    AgeRestricted,
    UnsupportedTab,
    UnsupportedUrl,
    NotAPlaylist,
    NoFilesDownloaded,
    Other,
}

/// Maps free-form engine error text onto a closed set of kinds. This is the
/// only place that looks at message substrings.
pub fn classify_engine_message(message: &str) -> EngineErrorKind {
    let lower = message.to_lowercase();

    if lower.contains("no video could be found")
        || lower.contains("no media found")
        || lower.contains("there's no video")
        || lower.contains("no video formats found")
    {
        return EngineErrorKind::NoMediaFound;
    }

    if lower.contains("private video") || lower.contains("video is private") {
        return EngineErrorKind::PrivateVideo;
    }

    if lower.contains("members-only")
        || lower.contains("members only")
        || lower.contains("join this channel")
    {
        return EngineErrorKind::MembersOnly;
    }

    if lower.contains("age-restricted")
        || lower.contains("age restricted")
        || lower.contains("confirm your age")
    {
        return EngineErrorKind::AgeRestricted;
    }

    if lower.contains("unsupported tab")
        || (lower.contains("does not have a") && lower.contains("tab"))
    {
        return EngineErrorKind::UnsupportedTab;
    }

    if lower.contains("unsupported url") {
        return EngineErrorKind::UnsupportedUrl;
    }

    EngineErrorKind::Other
}

/// A message safe to show to the user for an engine error.
pub fn user_message(kind: EngineErrorKind, raw: &str) -> String {
    match kind {
        EngineErrorKind::NoMediaFound => "No video could be found in this post".to_string(),
        EngineErrorKind::PrivateVideo => {
            "This video is private and cannot be downloaded".to_string()
        }
        EngineErrorKind::MembersOnly => {
            "This video is only available to channel members".to_string()
        }
        EngineErrorKind::AgeRestricted => {
            "This video is age-restricted and requires sign-in".to_string()
        }
        EngineErrorKind::UnsupportedTab => {
            "Community posts and channel tabs are not supported; use a video URL".to_string()
        }
        EngineErrorKind::UnsupportedUrl => "This URL is not supported".to_string(),
        EngineErrorKind::NotAPlaylist => "This URL does not point to a playlist".to_string(),
        EngineErrorKind::NoFilesDownloaded => "No files were downloaded".to_string(),
        EngineErrorKind::Other => format!(
            "Download error: {}",
            truncate_message(raw, MAX_RAW_MESSAGE_CHARS)
        ),
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    /// The request itself is malformed
    #[error("{0}")]
    Validation(String),
    /// The engine rejected or could not serve the request
    #[error("{message}")]
    Engine {
        kind: EngineErrorKind,
        message: String,
    },
    /// Anything else: filesystem, runtime, unparseable engine output
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl MediaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn engine(kind: EngineErrorKind, raw: &str) -> Self {
        Self::Engine {
            kind,
            message: user_message(kind, raw),
        }
    }

    pub fn unexpected(error: impl std::fmt::Display) -> Self {
        Self::Unexpected(truncate_message(&error.to_string(), MAX_RAW_MESSAGE_CHARS))
    }

    pub fn kind(&self) -> Option<EngineErrorKind> {
        match self {
            Self::Engine { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<EngineFailure> for MediaError {
    fn from(failure: EngineFailure) -> Self {
        match failure {
            EngineFailure::Reported(raw) => Self::engine(classify_engine_message(&raw), &raw),
            other => Self::unexpected(other),
        }
    }
}

use std::{fmt, path::PathBuf};

/// Failures while downloading a video or extracting its frames.
/// Fatal to the request that hit them.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("Invalid video url: {0}")]
    InvalidUrl(String),
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("Failed to parse video metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("Download did not produce a video file in {}", .0.display())]
    MissingVideo(PathBuf),
    #[error("Video unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a hosted model call.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("No content in model response")]
    EmptyResponse,
}

impl ModelError {
    pub fn kind(&self) -> StageErrorKind {
        match self {
            ModelError::Request(e) if e.is_timeout() => StageErrorKind::Timeout,
            ModelError::Request(_) => StageErrorKind::Transport,
            ModelError::Io(_) => StageErrorKind::Io,
            ModelError::Api { status: 429, .. } => StageErrorKind::RateLimited,
            ModelError::Api { .. } => StageErrorKind::Api,
            ModelError::EmptyResponse => StageErrorKind::EmptyResponse,
        }
    }
}

/// Coarse classification of a degraded stage, attached to log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    Timeout,
    Transport,
    Io,
    RateLimited,
    Api,
    EmptyResponse,
}

impl fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            StageErrorKind::Timeout => "timeout",
            StageErrorKind::Transport => "transport",
            StageErrorKind::Io => "io",
            StageErrorKind::RateLimited => "rate_limited",
            StageErrorKind::Api => "api",
            StageErrorKind::EmptyResponse => "empty_response",
        };
        f.write_str(kind)
    }
}

/// The single error surfaced by [`crate::AnalysisOrchestrator::analyze`].
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Video analysis failed: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error("Video analysis failed: {0}")]
    Internal(String),
}

/// Startup configuration problems. The process must not serve requests
/// when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingSecret(&'static str),
    #[error("Failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

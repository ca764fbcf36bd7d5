use std::fmt;
use std::path::PathBuf;

pub type JobId = u64;

/// What a download job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    Runtime,
    Bundle,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Runtime => write!(f, "runtime"),
            Artifact::Bundle => write!(f, "bundle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Bytes for the terminal output stream: PTY output and job status lines alike.
    Output(Vec<u8>),
    DownloadStarted {
        artifact: Artifact,
        uri: String,
        destination: PathBuf,
    },
    DownloadProgress {
        artifact: Artifact,
        percent: f64,
    },
    JobCompleted {
        job_id: JobId,
        artifact: Artifact,
        result: Result<PathBuf, FetchError>,
    },
    /// The PTY reader reached end of stream.
    SessionClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Io,
    Archive,
    UnsupportedPlatform,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Archive => write!(f, "archive error"),
            FailureKind::UnsupportedPlatform => write!(f, "unsupported platform"),
        }
    }
}

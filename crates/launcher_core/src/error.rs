use crate::Stage;

/// Error reported by an external collaborator. The message is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DispatchError {
    pub message: String,
}

impl DispatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    #[error("prerequisite query failed: {0}")]
    PrerequisiteQueryFailed(String),
    #[error("runtime install failed: {0}")]
    InstallDispatchFailed(String),
    #[error("runtime install marker not observed after {passes} quiet periods")]
    InstallMarkerTimedOut { passes: u32 },
    #[error("bundle download failed: {0}")]
    DownloadDispatchFailed(String),
    #[error("bundle unpack marker not observed after {passes} quiet periods")]
    UnpackMarkerNotObserved { passes: u32 },
    #[error("server start failed: {0}")]
    ServerStartDispatchFailed(String),
    #[error("{stage:?} gave up after {attempts} attempts: {cause}")]
    RetryBoundExceeded {
        stage: Stage,
        attempts: u32,
        cause: String,
    },
    #[error("{line}")]
    FailureMarker { stage: Stage, line: String },
}

/// Terminal failure record attached to an absorbing failure stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Stage that was current when the run failed.
    pub stage: Stage,
    pub error: LaunchError,
}

impl Failure {
    pub fn cause(&self) -> String {
        self.error.to_string()
    }
}

use crate::Stage;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DownloadView {
    /// Latest reported progress, 0.0..=100.0.
    pub percent: Option<f64>,
    pub messages: Vec<String>,
    /// Already on disk before or after this run's download.
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetupViewModel {
    pub stage: Stage,
    pub failure_cause: Option<String>,
    pub runtime: DownloadView,
    pub bundle: DownloadView,
    pub runtime_version: Option<String>,
    pub target_url: Option<String>,
    pub closed: bool,
    pub dirty: bool,
}

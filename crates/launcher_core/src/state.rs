use std::path::Path;

use launcher_logging::{launch_info, launch_warn};

use crate::view_model::{DownloadView, SetupViewModel};
use crate::{Failure, LaunchError, LaunchSettings, ServerCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    CheckPrerequisites,
    InstallRuntime,
    AwaitRuntimeInstalled,
    AcquireBundle,
    AwaitBundleReady,
    StartServer,
    AwaitServerReady,
    Ready,
    PrerequisitesFailed,
    RuntimeInstallFailed,
    BundleAcquireFailed,
    ServerStartFailed,
}

impl Stage {
    /// Position in the forward sequence; `None` for failure stages.
    pub fn ordinal(self) -> Option<u8> {
        match self {
            Stage::CheckPrerequisites => Some(0),
            Stage::InstallRuntime => Some(1),
            Stage::AwaitRuntimeInstalled => Some(2),
            Stage::AcquireBundle => Some(3),
            Stage::AwaitBundleReady => Some(4),
            Stage::StartServer => Some(5),
            Stage::AwaitServerReady => Some(6),
            Stage::Ready => Some(7),
            Stage::PrerequisitesFailed
            | Stage::RuntimeInstallFailed
            | Stage::BundleAcquireFailed
            | Stage::ServerStartFailed => None,
        }
    }

    pub fn is_failure(self) -> bool {
        self.ordinal().is_none()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Ready || self.is_failure()
    }

    /// Absorbing failure stage reached from this stage.
    pub fn failure_stage(self) -> Stage {
        match self {
            Stage::CheckPrerequisites => Stage::PrerequisitesFailed,
            Stage::InstallRuntime | Stage::AwaitRuntimeInstalled => Stage::RuntimeInstallFailed,
            Stage::AcquireBundle | Stage::AwaitBundleReady => Stage::BundleAcquireFailed,
            Stage::StartServer | Stage::AwaitServerReady => Stage::ServerStartFailed,
            terminal => terminal,
        }
    }
}

/// Snapshot returned by the prerequisites collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Prerequisites {
    pub runtime_present: bool,
    pub runtime_path: Option<String>,
    pub bundle_present: bool,
    pub bundle_path: Option<String>,
    /// Directory bundles are downloaded into.
    pub app_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadTarget {
    Runtime,
    Bundle,
}

/// Paths and URL resolved during one run. Each value is written once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedPaths {
    runtime_path: Option<String>,
    bundle_path: Option<String>,
    app_dir: Option<String>,
    target_url: Option<String>,
}

impl ResolvedPaths {
    pub fn runtime_path(&self) -> Option<&str> {
        self.runtime_path.as_deref()
    }

    pub fn bundle_path(&self) -> Option<&str> {
        self.bundle_path.as_deref()
    }

    pub fn app_dir(&self) -> Option<&str> {
        self.app_dir.as_deref()
    }

    pub fn target_url(&self) -> Option<&str> {
        self.target_url.as_deref()
    }

    pub(crate) fn set_runtime_path(&mut self, value: String) {
        set_once("runtime_path", &mut self.runtime_path, value);
    }

    pub(crate) fn set_bundle_path(&mut self, value: String) {
        set_once("bundle_path", &mut self.bundle_path, value);
    }

    pub(crate) fn set_app_dir(&mut self, value: String) {
        set_once("app_dir", &mut self.app_dir, value);
    }

    pub(crate) fn set_target_url(&mut self, value: String) {
        set_once("target_url", &mut self.target_url, value);
    }
}

fn set_once(name: &str, slot: &mut Option<String>, value: String) {
    if let Some(existing) = slot.as_deref() {
        if existing != value {
            launch_warn!("{} already resolved to {}; ignoring {}", name, existing, value);
        }
        return;
    }
    *slot = Some(value);
}

/// Per-stage failure bookkeeping, cleared when the stage is left.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorState {
    pub attempts_failed: u32,
    pub last_error: Option<LaunchError>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct DownloadStatus {
    pub(crate) percent: Option<f64>,
    pub(crate) messages: Vec<String>,
    pub(crate) present: bool,
}

/// Readiness signals collected while waiting for the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ServerSignals {
    pub(crate) url: Option<String>,
    pub(crate) ready: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetupState {
    stage: Stage,
    settings: LaunchSettings,
    paths: ResolvedPaths,
    errors: ErrorState,
    failure: Option<Failure>,
    pub(crate) pending_command: Option<ServerCommand>,
    pub(crate) server: ServerSignals,
    pub(crate) idle_passes: u32,
    pub(crate) runtime_version: Option<String>,
    pub(crate) runtime: DownloadStatus,
    pub(crate) bundle: DownloadStatus,
    pub(crate) terminal_size: (u16, u16),
    started: bool,
    promoted: bool,
    closed: bool,
    dirty: bool,
}

impl SetupState {
    pub fn new(settings: LaunchSettings) -> Self {
        let terminal_size = (settings.terminal_rows, settings.terminal_cols);
        Self {
            settings,
            terminal_size,
            ..Self::default()
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    pub fn errors(&self) -> &ErrorState {
        &self.errors
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_promoted(&self) -> bool {
        self.promoted
    }

    pub fn view(&self) -> SetupViewModel {
        SetupViewModel {
            stage: self.stage,
            failure_cause: self.failure.as_ref().map(Failure::cause),
            runtime: download_view(&self.runtime),
            bundle: download_view(&self.bundle),
            runtime_version: self.runtime_version.clone(),
            target_url: self.paths.target_url.clone(),
            closed: self.closed,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn paths_mut(&mut self) -> &mut ResolvedPaths {
        &mut self.paths
    }

    pub(crate) fn errors_mut(&mut self) -> &mut ErrorState {
        &mut self.errors
    }

    pub(crate) fn download_mut(&mut self, target: crate::DownloadTarget) -> &mut DownloadStatus {
        match target {
            crate::DownloadTarget::Runtime => &mut self.runtime,
            crate::DownloadTarget::Bundle => &mut self.bundle,
        }
    }

    /// Returns false when the run was already started.
    pub(crate) fn mark_started(&mut self) -> bool {
        !std::mem::replace(&mut self.started, true)
    }

    /// Returns false when the run was already promoted.
    pub(crate) fn mark_promoted(&mut self) -> bool {
        !std::mem::replace(&mut self.promoted, true)
    }

    pub(crate) fn close(&mut self) -> bool {
        let was_open = !std::mem::replace(&mut self.closed, true);
        if was_open {
            self.dirty = true;
        }
        was_open
    }

    pub(crate) fn enter(&mut self, next: Stage) {
        if next == self.stage {
            return;
        }
        launch_info!("stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
        self.errors = ErrorState::default();
        self.idle_passes = 0;
        self.pending_command = None;
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, error: LaunchError) {
        let failed_in = self.stage;
        let next = failed_in.failure_stage();
        launch_warn!("{:?} failed: {}", failed_in, error);
        self.failure = Some(Failure {
            stage: failed_in,
            error,
        });
        self.enter(next);
    }

    /// Where the bundle archive is downloaded: `<app_dir>/<bundle_file_name>`.
    pub(crate) fn bundle_destination(&self) -> String {
        let app_dir = self.paths.app_dir().unwrap_or(".");
        Path::new(app_dir)
            .join(&self.settings.bundle_file_name)
            .to_string_lossy()
            .into_owned()
    }

    pub(crate) fn runtime_command(&self) -> &str {
        self.paths
            .runtime_path()
            .unwrap_or(&self.settings.runtime_command)
    }
}

fn download_view(status: &DownloadStatus) -> DownloadView {
    DownloadView {
        percent: status.percent,
        messages: status.messages.clone(),
        present: status.present,
    }
}

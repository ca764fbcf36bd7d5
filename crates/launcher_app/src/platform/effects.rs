use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use anyhow::Context;
use launcher_core::{Collaborators, DispatchError, DownloadTarget, LaunchSettings, Prerequisites};
use launcher_engine::{
    default_app_dir, default_runtime_bin_dir, probe, Artifact, EngineEvent, EngineHandle,
    EngineSettings, FetchSettings, ProbeSettings, PtySession, SessionConfig,
};
use launcher_logging::{launch_info, launch_warn};

/// Performs orchestrator effects against the engine and the shell session.
pub struct EffectRunner {
    engine: EngineHandle,
    session: Option<PtySession>,
    probe: ProbeSettings,
}

impl EffectRunner {
    pub fn new(settings: &LaunchSettings) -> anyhow::Result<Self> {
        let runtime_bin_dir =
            default_runtime_bin_dir().context("cannot locate the runtime install directory")?;
        let app_dir = match &settings.app_dir {
            Some(dir) => PathBuf::from(dir),
            None => default_app_dir().context("cannot locate the application directory")?,
        };

        let engine = EngineHandle::new(EngineSettings {
            fetch: FetchSettings::default(),
            runtime_version: settings.runtime_version.clone(),
            runtime_download_base: settings.runtime_download_base.clone(),
            runtime_bin_dir: runtime_bin_dir.clone(),
        });
        let session = PtySession::spawn(
            SessionConfig::interactive_shell(settings.terminal_rows, settings.terminal_cols),
            engine.event_sender(),
        )
        .context("failed to start the shell session")?;

        Ok(Self {
            engine,
            session: Some(session),
            probe: ProbeSettings {
                runtime_bin_dir,
                app_dir,
                bundle_file_name: settings.bundle_file_name.clone(),
                server_entrypoint: settings.server_entrypoint.clone(),
            },
        })
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.engine.recv_timeout(timeout)
    }

    fn session(&mut self) -> Result<&mut PtySession, DispatchError> {
        self.session
            .as_mut()
            .ok_or_else(|| DispatchError::new("shell session is closed"))
    }
}

impl Collaborators for EffectRunner {
    fn fetch_prerequisites(&mut self) -> Result<Prerequisites, DispatchError> {
        let report = probe(&self.probe).map_err(|err| DispatchError::new(err.to_string()))?;
        Ok(Prerequisites {
            runtime_present: report.runtime_path.is_some(),
            runtime_path: report.runtime_path.as_deref().map(display),
            bundle_present: report.bundle_dir.is_some(),
            bundle_path: report.bundle_dir.as_deref().map(display),
            app_dir: display(&report.app_dir),
        })
    }

    fn install_runtime(&mut self) -> Result<(), DispatchError> {
        let job_id = self
            .engine
            .install_runtime()
            .map_err(|err| DispatchError::new(err.to_string()))?;
        launch_info!("runtime install queued as job {}", job_id);
        Ok(())
    }

    fn acquire_bundle(&mut self, source_url: &str, destination: &str) -> Result<(), DispatchError> {
        let job_id = self
            .engine
            .acquire_bundle(source_url, Path::new(destination))
            .map_err(|err| DispatchError::new(err.to_string()))?;
        launch_info!("bundle download queued as job {}", job_id);
        Ok(())
    }

    fn send_input(&mut self, data: &[u8]) -> Result<(), DispatchError> {
        self.session()?
            .write(data)
            .map_err(|err| DispatchError::new(err.to_string()))
    }

    fn resize_session(&mut self, rows: u16, cols: u16) -> Result<(), DispatchError> {
        self.session()?
            .resize(rows, cols)
            .map_err(|err| DispatchError::new(err.to_string()))
    }

    fn promote_to_main_surface(&mut self, target_url: &str) {
        launch_info!("server ready at {}", target_url);
        println!("\r\n==> LobeChat is ready: {target_url}\r");
    }

    fn dispose_session(&mut self) {
        match self.session.take() {
            Some(mut session) => session.dispose(),
            None => launch_warn!("dispose requested without a session"),
        }
    }
}

pub(crate) fn map_artifact(artifact: Artifact) -> DownloadTarget {
    match artifact {
        Artifact::Runtime => DownloadTarget::Runtime,
        Artifact::Bundle => DownloadTarget::Bundle,
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use launcher_logging::{launch_error, launch_info, launch_warn};

use crate::fetch::{
    status_line, ChannelProgressSink, Downloader, FetchSettings, ProgressSink, ReqwestDownloader,
};
use crate::install::{finish_install, release_target, runtime_archive_name, runtime_archive_url};
use crate::unpack::{unpack_archive, unpack_dir_for};
use crate::{Artifact, EngineEvent, FailureKind, FetchError, JobId};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub fetch: FetchSettings,
    pub runtime_version: String,
    pub runtime_download_base: String,
    pub runtime_bin_dir: PathBuf,
}

enum EngineCommand {
    InstallRuntime {
        job_id: JobId,
        url: String,
        archive: PathBuf,
        bin_dir: PathBuf,
    },
    AcquireBundle {
        job_id: JobId,
        url: String,
        archive: PathBuf,
    },
}

/// Runs install and download jobs on a worker thread. Requests return as
/// soon as the job is queued; results arrive as [`EngineEvent`]s.
pub struct EngineHandle {
    settings: EngineSettings,
    next_job: AtomicU64,
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Self {
        let downloader = Arc::new(ReqwestDownloader::new(settings.fetch.clone()));
        Self::with_downloader(settings, downloader)
    }

    pub fn with_downloader(settings: EngineSettings, downloader: Arc<dyn Downloader>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let (event_tx, event_rx) = mpsc::channel();
        let worker_tx = event_tx.clone();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    launch_error!("engine runtime failed to start: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                let downloader = downloader.clone();
                let event_tx = worker_tx.clone();
                runtime.spawn(async move {
                    handle_command(downloader.as_ref(), command, event_tx).await;
                });
            }
        });

        Self {
            settings,
            next_job: AtomicU64::new(1),
            cmd_tx,
            event_tx,
            event_rx,
        }
    }

    /// Sender for other producers of terminal output, such as the pty reader.
    pub fn event_sender(&self) -> mpsc::Sender<EngineEvent> {
        self.event_tx.clone()
    }

    pub fn install_runtime(&self) -> Result<JobId, FetchError> {
        let target = release_target().ok_or_else(|| {
            FetchError::new(
                FailureKind::UnsupportedPlatform,
                format!(
                    "no runtime release for {}-{}",
                    std::env::consts::ARCH,
                    std::env::consts::OS
                ),
            )
        })?;
        let version = &self.settings.runtime_version;
        let bin_dir = self.settings.runtime_bin_dir.clone();
        let job_id = self.next_job_id();
        self.send(EngineCommand::InstallRuntime {
            job_id,
            url: runtime_archive_url(&self.settings.runtime_download_base, version, target),
            archive: bin_dir.join(runtime_archive_name(version, target)),
            bin_dir,
        })?;
        Ok(job_id)
    }

    pub fn acquire_bundle(&self, url: &str, archive: &Path) -> Result<JobId, FetchError> {
        reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, format!("{url:?}: {err}")))?;
        if unpack_dir_for(archive).is_none() {
            return Err(FetchError::new(
                FailureKind::Io,
                format!("{} is not an archive path", archive.display()),
            ));
        }
        let job_id = self.next_job_id();
        self.send(EngineCommand::AcquireBundle {
            job_id,
            url: url.to_string(),
            archive: archive.to_path_buf(),
        })?;
        Ok(job_id)
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.event_rx.recv_timeout(timeout)
    }

    fn next_job_id(&self) -> JobId {
        self.next_job.fetch_add(1, Ordering::Relaxed)
    }

    fn send(&self, command: EngineCommand) -> Result<(), FetchError> {
        self.cmd_tx
            .send(command)
            .map_err(|_| FetchError::new(FailureKind::Io, "engine worker is not running"))
    }
}

async fn handle_command(
    downloader: &dyn Downloader,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    let (job_id, artifact, result) = match command {
        EngineCommand::InstallRuntime {
            job_id,
            url,
            archive,
            bin_dir,
        } => {
            let result = install_runtime(downloader, &url, &archive, &bin_dir, &sink).await;
            if let Ok(binary) = &result {
                status_line(
                    &sink,
                    format!("Deno was installed successfully to {}", binary.display()),
                );
            }
            (job_id, Artifact::Runtime, result)
        }
        EngineCommand::AcquireBundle {
            job_id,
            url,
            archive,
        } => {
            let result = acquire_bundle(downloader, &url, &archive, &sink).await;
            if let Ok(dir) = &result {
                status_line(&sink, format!("Bundle unpacked to {}", dir.display()));
            }
            (job_id, Artifact::Bundle, result)
        }
    };

    match &result {
        Ok(path) => launch_info!("job {} ({}) done: {}", job_id, artifact, path.display()),
        Err(err) => {
            launch_warn!("job {} ({}) failed: {}", job_id, artifact, err);
            status_line(&sink, format!("Error: {}", err.message));
        }
    }
    let _ = event_tx.send(EngineEvent::JobCompleted {
        job_id,
        artifact,
        result,
    });
}

async fn install_runtime(
    downloader: &dyn Downloader,
    url: &str,
    archive: &Path,
    bin_dir: &Path,
    sink: &dyn ProgressSink,
) -> Result<PathBuf, FetchError> {
    status_line(sink, format!("download deno from {url}"));
    if !archive.is_file() {
        downloader
            .download(Artifact::Runtime, url, archive, sink)
            .await?;
    }
    let binary = finish_install(archive, bin_dir)
        .map_err(|err| FetchError::new(FailureKind::Archive, err.to_string()))?;
    report_version(&binary, sink).await;
    Ok(binary)
}

async fn acquire_bundle(
    downloader: &dyn Downloader,
    url: &str,
    archive: &Path,
    sink: &dyn ProgressSink,
) -> Result<PathBuf, FetchError> {
    if archive.is_file() {
        status_line(sink, format!("using cached archive {}", archive.display()));
    } else {
        downloader
            .download(Artifact::Bundle, url, archive, sink)
            .await?;
    }
    let dir = unpack_dir_for(archive)
        .ok_or_else(|| FetchError::new(FailureKind::Io, "archive path has no parent"))?;
    unpack_archive(archive, &dir)
        .map_err(|err| FetchError::new(FailureKind::Archive, err.to_string()))?;
    Ok(dir)
}

/// Echoes `<binary> --version` into the output stream. Informational only.
async fn report_version(binary: &Path, sink: &dyn ProgressSink) {
    match tokio::process::Command::new(binary)
        .arg("--version")
        .output()
        .await
    {
        Ok(output) if output.status.success() => {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                status_line(sink, line);
            }
        }
        Ok(output) => launch_warn!("{} --version exited with {}", binary.display(), output.status),
        Err(err) => launch_warn!("{} --version failed: {}", binary.display(), err),
    }
}

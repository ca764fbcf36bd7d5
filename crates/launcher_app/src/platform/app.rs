use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use launcher_core::{Msg, Orchestrator, SetupViewModel};
use launcher_engine::EngineEvent;
use launcher_logging::{launch_info, launch_warn, LogDestination};
use log::LevelFilter;

use super::effects::{map_artifact, EffectRunner};
use super::{render, settings};

/// Upper bound on one wait, so Ctrl-C is noticed promptly.
const TICK_INTERVAL: Duration = Duration::from_millis(75);

pub fn run_app() -> anyhow::Result<()> {
    launcher_logging::initialize(
        LogDestination::Both,
        LevelFilter::Info,
        Path::new("./launcher.log"),
    );

    let settings_path = settings::settings_path(std::env::args().nth(1));
    let settings = settings::load_settings(&settings_path)?;
    if settings.bundle_url.trim().is_empty() {
        launch_warn!("bundle_url is empty in {:?}; downloads will fail", settings_path);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("failed to set ctrl-c handler")?;

    let mut orchestrator =
        Orchestrator::new(settings.clone()).context("invalid marker pattern in settings")?;
    let mut runner = EffectRunner::new(&settings)?;
    let mut shown = SetupViewModel::default();

    let effects = orchestrator.start();
    orchestrator.drive(&mut runner, effects);

    loop {
        if shutdown.load(Ordering::SeqCst) {
            launch_info!("interrupted");
            break;
        }

        let now = Instant::now();
        let wait = orchestrator
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .map_or(TICK_INTERVAL, |wait| wait.min(TICK_INTERVAL));

        match runner.recv_timeout(wait) {
            Ok(EngineEvent::SessionClosed) => {
                launch_warn!("shell session ended");
                break;
            }
            Ok(event) => {
                if let Some(msg) = handle_event(&mut orchestrator, event) {
                    let effects = orchestrator.apply(msg);
                    orchestrator.drive(&mut runner, effects);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let effects = orchestrator.on_timer(Instant::now());
        orchestrator.drive(&mut runner, effects);

        if orchestrator.consume_dirty() {
            let view = orchestrator.state().view();
            for line in render::status_lines(&shown, &view) {
                eprintln!("{line}");
            }
            shown = view;
        }
        if orchestrator.state().stage().is_failure() {
            break;
        }
    }

    let effects = orchestrator.teardown();
    orchestrator.drive(&mut runner, effects);

    match orchestrator.state().failure() {
        Some(failure) => Err(anyhow!(
            "setup failed during {:?}: {}",
            failure.stage,
            failure.cause()
        )),
        None => Ok(()),
    }
}

fn mirror_output(out: &mut impl Write, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(bytes)?;
    out.flush()
}

/// Mirrors terminal output and turns engine notices into messages.
fn handle_event(orchestrator: &mut Orchestrator, event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::Output(bytes) => {
            if let Err(err) = mirror_output(&mut std::io::stdout().lock(), &bytes) {
                launch_warn!("could not mirror terminal output: {}", err);
            }
            orchestrator.on_output(&bytes, Instant::now());
            None
        }
        EngineEvent::DownloadStarted {
            artifact,
            uri,
            destination,
        } => Some(Msg::DownloadStarted {
            target: map_artifact(artifact),
            uri,
            destination: destination.display().to_string(),
        }),
        EngineEvent::DownloadProgress { artifact, percent } => Some(Msg::DownloadProgress {
            target: map_artifact(artifact),
            percent,
        }),
        EngineEvent::JobCompleted {
            job_id,
            artifact,
            result,
        } => {
            match result {
                Ok(path) => launch_info!("{} job {} finished: {}", artifact, job_id, path.display()),
                Err(err) => launch_warn!("{} job {} failed: {}", artifact, job_id, err),
            }
            None
        }
        EngineEvent::SessionClosed => None,
    }
}

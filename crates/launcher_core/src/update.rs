use launcher_logging::{launch_debug, launch_info, launch_warn};

use crate::classifier::{Classification, Milestone};
use crate::{
    command, DispatchError, Effect, LaunchError, Msg, Prerequisites, ServerCommand, SetupState,
    Stage,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: SetupState, msg: Msg) -> (SetupState, Vec<Effect>) {
    if state.is_closed() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Start => {
            if state.mark_started() {
                state.mark_dirty();
                vec![Effect::FetchPrerequisites]
            } else {
                Vec::new()
            }
        }
        Msg::PrerequisitesFetched(result) => {
            if state.stage() != Stage::CheckPrerequisites {
                return ignored(state, "prerequisites result");
            }
            match result {
                Ok(prerequisites) => apply_prerequisites(&mut state, prerequisites),
                Err(err) => retry_or_fail(
                    &mut state,
                    LaunchError::PrerequisiteQueryFailed(err.message.clone()),
                    err,
                    Effect::FetchPrerequisites,
                ),
            }
        }
        Msg::RuntimeInstallDispatched(result) => {
            if state.stage() != Stage::InstallRuntime {
                return ignored(state, "runtime install ack");
            }
            match result {
                Ok(()) => {
                    state.enter(Stage::AwaitRuntimeInstalled);
                    Vec::new()
                }
                Err(err) => retry_or_fail(
                    &mut state,
                    LaunchError::InstallDispatchFailed(err.message.clone()),
                    err,
                    Effect::InstallRuntime,
                ),
            }
        }
        Msg::BundleAcquireDispatched(result) => {
            if state.stage() != Stage::AcquireBundle {
                return ignored(state, "bundle acquire ack");
            }
            match result {
                Ok(()) => {
                    state.enter(Stage::AwaitBundleReady);
                    Vec::new()
                }
                Err(err) => {
                    state.fail(LaunchError::DownloadDispatchFailed(err.message));
                    Vec::new()
                }
            }
        }
        Msg::InputDelivered { command, result } => {
            if state.stage() != Stage::StartServer || state.pending_command != Some(command) {
                return ignored(state, "input ack");
            }
            match (command, result) {
                (_, Err(err)) => {
                    state.fail(LaunchError::ServerStartDispatchFailed(err.message));
                    Vec::new()
                }
                (ServerCommand::ChangeDirectory, Ok(())) => {
                    state.pending_command = Some(ServerCommand::LaunchServer);
                    let settings = state.settings();
                    let data = command::launch_server(
                        settings.shell,
                        state.runtime_command(),
                        &settings.server_args,
                        &settings.server_entrypoint,
                    );
                    vec![Effect::SendInput {
                        command: ServerCommand::LaunchServer,
                        data,
                    }]
                }
                (ServerCommand::LaunchServer, Ok(())) => {
                    state.enter(Stage::AwaitServerReady);
                    state.server = Default::default();
                    Vec::new()
                }
            }
        }
        Msg::QuietPeriodElapsed { classification } => {
            apply_classification(&mut state, classification)
        }
        Msg::DownloadStarted {
            target,
            uri,
            destination,
        } => {
            let status = state.download_mut(target);
            status.messages.push(format!("url: {uri}"));
            status.messages.push(format!("download to: {destination}"));
            state.mark_dirty();
            Vec::new()
        }
        Msg::DownloadProgress { target, percent } => {
            let percent = (percent.clamp(0.0, 100.0) * 100.0).round() / 100.0;
            state.download_mut(target).percent = Some(percent);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SurfaceResized { rows, cols } => {
            if state.terminal_size == (rows, cols) {
                Vec::new()
            } else {
                state.terminal_size = (rows, cols);
                vec![Effect::ResizeSession { rows, cols }]
            }
        }
        Msg::TeardownRequested => {
            if state.close() {
                launch_info!("teardown requested in {:?}", state.stage());
                vec![Effect::InterruptSession, Effect::DisposeSession]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn ignored(state: SetupState, what: &str) -> (SetupState, Vec<Effect>) {
    launch_debug!("ignoring {} in {:?}", what, state.stage());
    (state, Vec::new())
}

fn apply_prerequisites(state: &mut SetupState, prerequisites: Prerequisites) -> Vec<Effect> {
    launch_info!("prerequisites: {:?}", prerequisites);
    state.paths_mut().set_app_dir(prerequisites.app_dir);

    if !prerequisites.runtime_present {
        return begin_runtime_install(state);
    }
    state.runtime.present = true;
    if let Some(path) = prerequisites.runtime_path {
        state.paths_mut().set_runtime_path(path);
    }

    match prerequisites.bundle_path {
        Some(path) if prerequisites.bundle_present => {
            state.bundle.present = true;
            state.paths_mut().set_bundle_path(path);
            begin_server_start(state)
        }
        _ => begin_bundle_acquire(state),
    }
}

/// Bounded retry for the prerequisite query and the runtime install request.
fn retry_or_fail(
    state: &mut SetupState,
    error: LaunchError,
    cause: DispatchError,
    retry: Effect,
) -> Vec<Effect> {
    let allowed = state.settings().attempts_allowed();
    let stage = state.stage();
    let errors = state.errors_mut();
    errors.attempts_failed += 1;
    errors.last_error = Some(error);
    let attempts = errors.attempts_failed;
    state.mark_dirty();

    if attempts >= allowed {
        state.fail(LaunchError::RetryBoundExceeded {
            stage,
            attempts,
            cause: cause.message,
        });
        return Vec::new();
    }
    launch_warn!(
        "{:?} attempt {}/{} failed: {}; retrying",
        stage,
        attempts,
        allowed,
        cause
    );
    vec![retry]
}

fn begin_runtime_install(state: &mut SetupState) -> Vec<Effect> {
    state.enter(Stage::InstallRuntime);
    vec![Effect::InstallRuntime]
}

fn begin_bundle_acquire(state: &mut SetupState) -> Vec<Effect> {
    state.enter(Stage::AcquireBundle);
    vec![Effect::AcquireBundle {
        source_url: state.settings().bundle_url.clone(),
        destination: state.bundle_destination(),
    }]
}

fn begin_server_start(state: &mut SetupState) -> Vec<Effect> {
    let Some(dir) = state.paths().bundle_path().map(command::change_directory) else {
        return begin_bundle_acquire(state);
    };
    state.enter(Stage::StartServer);
    state.pending_command = Some(ServerCommand::ChangeDirectory);
    vec![Effect::SendInput {
        command: ServerCommand::ChangeDirectory,
        data: dir,
    }]
}

fn enter_ready(state: &mut SetupState, url: String) -> Vec<Effect> {
    state.paths_mut().set_target_url(url);
    state.enter(Stage::Ready);
    if !state.mark_promoted() {
        return Vec::new();
    }
    match state.paths().target_url() {
        Some(url) => vec![Effect::PromoteToMainSurface {
            url: url.to_string(),
        }],
        None => Vec::new(),
    }
}

fn apply_classification(
    state: &mut SetupState,
    classification: Option<Classification>,
) -> Vec<Effect> {
    let stage = state.stage();
    if stage.is_terminal() {
        return Vec::new();
    }
    let Some(classification) = classification else {
        return count_idle_pass(state);
    };
    launch_debug!("{:?} observed {:?}", stage, classification.observations());

    match stage {
        Stage::AwaitRuntimeInstalled => {
            if let Some(version) = classification
                .first(Milestone::RuntimeVersion)
                .and_then(|observation| observation.payload.clone())
            {
                state.runtime_version = Some(version);
                state.mark_dirty();
            }
            let decisive = classification
                .earliest_of(&[Milestone::RuntimeInstalled, Milestone::RuntimeInstallFailed])
                .cloned();
            match decisive {
                Some(observation) if observation.milestone == Milestone::RuntimeInstalled => {
                    state.runtime.present = true;
                    if let Some(path) = classification
                        .first_with_payload(Milestone::RuntimeInstalled)
                        .and_then(|observation| observation.payload.clone())
                    {
                        state.paths_mut().set_runtime_path(path);
                    }
                    begin_bundle_acquire(state)
                }
                Some(observation) => {
                    state.fail(LaunchError::FailureMarker {
                        stage,
                        line: observation.line,
                    });
                    Vec::new()
                }
                None => count_idle_pass(state),
            }
        }
        Stage::AwaitBundleReady => {
            let decisive = classification
                .earliest_of(&[Milestone::BundleUnpacked, Milestone::BundleUnpackFailed])
                .cloned();
            match decisive {
                Some(observation) if observation.milestone == Milestone::BundleUnpacked => {
                    let path = classification
                        .first_with_payload(Milestone::BundleUnpacked)
                        .and_then(|observation| observation.payload.clone());
                    let Some(path) = path else {
                        launch_warn!("bundle unpacked without a path; still waiting");
                        return count_idle_pass(state);
                    };
                    state.paths_mut().set_bundle_path(path);
                    state.bundle.present = true;
                    begin_server_start(state)
                }
                Some(observation) => {
                    state.fail(LaunchError::FailureMarker {
                        stage,
                        line: observation.line,
                    });
                    Vec::new()
                }
                None => count_idle_pass(state),
            }
        }
        Stage::AwaitServerReady => {
            if state.server.url.is_none() {
                // The first listening banner wins; later duplicates never replace it.
                state.server.url = classification
                    .first_with_payload(Milestone::ServerListening)
                    .and_then(|observation| observation.payload.clone());
            }
            if classification.first(Milestone::ServerReady).is_some() {
                state.server.ready = true;
            }

            let resolved = if state.settings().requires_ready_marker() {
                if state.server.ready {
                    state
                        .server
                        .url
                        .clone()
                        .or_else(|| state.settings().fallback_url())
                } else {
                    None
                }
            } else {
                state.server.url.clone()
            };
            match resolved {
                Some(url) => enter_ready(state, url),
                None => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

fn count_idle_pass(state: &mut SetupState) -> Vec<Effect> {
    let Some(limit) = state.settings().marker_wait_limit else {
        return Vec::new();
    };
    let stage = state.stage();
    if !matches!(stage, Stage::AwaitRuntimeInstalled | Stage::AwaitBundleReady) {
        return Vec::new();
    }

    state.idle_passes += 1;
    let passes = state.idle_passes;
    if passes < limit {
        return Vec::new();
    }
    let error = if stage == Stage::AwaitRuntimeInstalled {
        LaunchError::InstallMarkerTimedOut { passes }
    } else {
        LaunchError::UnpackMarkerNotObserved { passes }
    };
    state.fail(error);
    Vec::new()
}

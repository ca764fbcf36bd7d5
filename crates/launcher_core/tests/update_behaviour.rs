mod common;

use common::*;
use launcher_core::{
    update, Classifier, DownloadTarget, Effect, LaunchError, LaunchSettings, Msg, ServerCommand,
    ServerFlavor, Stage,
};
use pretty_assertions::assert_eq;

fn classifier_for(settings: &LaunchSettings) -> Classifier {
    Classifier::from_settings(settings).unwrap()
}

#[test]
fn start_is_only_dispatched_once() {
    init_logging();
    let state = started(settings());

    let (state, effects) = update(state, Msg::Start);
    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::CheckPrerequisites);
}

#[test]
fn missing_runtime_installs_then_waits_for_marker() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = started(settings);

    let (state, effects) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(false, false))),
    );
    assert_eq!(state.stage(), Stage::InstallRuntime);
    assert_eq!(effects, vec![Effect::InstallRuntime]);

    let (state, effects) = update(state, Msg::RuntimeInstallDispatched(Ok(())));
    assert_eq!(state.stage(), Stage::AwaitRuntimeInstalled);
    assert!(effects.is_empty());

    // A version line alone is not the success marker.
    let (state, effects) = classify(state, &classifier, &["deno 1.39.0"]);
    assert_eq!(state.stage(), Stage::AwaitRuntimeInstalled);
    assert!(effects.is_empty());
    assert_eq!(state.view().runtime_version.as_deref(), Some("1.39.0"));
    assert!(state.failure().is_none());

    let (state, effects) = classify(state, &classifier, &["Deno was installed successfully"]);
    assert_eq!(state.stage(), Stage::AcquireBundle);
    assert_eq!(
        effects,
        vec![Effect::AcquireBundle {
            source_url: "https://example.com/lobe-chat_v1.36.11.zip".to_string(),
            destination: bundle_archive(),
        }]
    );
}

#[test]
fn install_marker_path_resolves_runtime_for_server_start() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = started(settings);
    let (state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(false, false))),
    );
    let (state, _) = update(state, Msg::RuntimeInstallDispatched(Ok(())));
    let (state, _) = classify(
        state,
        &classifier,
        &["Download progress: 100.00%", "Deno was installed successfully to /opt/deno/bin/deno"],
    );
    assert_eq!(state.paths().runtime_path(), Some("/opt/deno/bin/deno"));

    let (state, _) = update(state, Msg::BundleAcquireDispatched(Ok(())));
    assert_eq!(state.stage(), Stage::AwaitBundleReady);

    let (state, effects) = classify(state, &classifier, &["Bundle unpacked to /apps/lobe"]);
    assert_eq!(state.stage(), Stage::StartServer);
    assert_eq!(
        effects,
        vec![Effect::SendInput {
            command: ServerCommand::ChangeDirectory,
            data: "cd /apps/lobe\r".to_string(),
        }]
    );

    let (_, effects) = update(state, ok_input(ServerCommand::ChangeDirectory));
    assert_eq!(
        effects,
        vec![Effect::SendInput {
            command: ServerCommand::LaunchServer,
            data: "/opt/deno/bin/deno run --allow-all server.cjs\r".to_string(),
        }]
    );
}

#[test]
fn runtime_present_bundle_missing_goes_to_download() {
    init_logging();
    let state = started(settings());

    let (state, effects) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(true, false))),
    );

    assert_eq!(state.stage(), Stage::AcquireBundle);
    assert_eq!(state.paths().runtime_path(), Some(RUNTIME));
    assert!(matches!(effects.as_slice(), [Effect::AcquireBundle { .. }]));
}

#[test]
fn everything_present_starts_server_in_order() {
    init_logging();
    let state = started(settings());

    let (state, effects) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(true, true))),
    );
    assert_eq!(state.stage(), Stage::StartServer);
    assert_eq!(
        effects,
        vec![Effect::SendInput {
            command: ServerCommand::ChangeDirectory,
            data: format!("cd {BUNDLE}\r"),
        }]
    );

    // An ack for the launch command before the cd completed is ignored.
    let (state, effects) = update(state.clone(), ok_input(ServerCommand::LaunchServer));
    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::StartServer);

    let (state, effects) = update(state, ok_input(ServerCommand::ChangeDirectory));
    assert_eq!(
        effects,
        vec![Effect::SendInput {
            command: ServerCommand::LaunchServer,
            data: format!("{RUNTIME} run --allow-all server.cjs\r"),
        }]
    );
    assert_eq!(state.stage(), Stage::StartServer);

    let (state, effects) = update(state, ok_input(ServerCommand::LaunchServer));
    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::AwaitServerReady);
}

#[test]
fn server_banner_with_ready_marker_promotes() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = awaiting_server(settings);

    let (state, effects) = classify(
        state,
        &classifier,
        &["", "  Local:   http://localhost:3210", "  Ready in 842ms"],
    );

    assert_eq!(state.stage(), Stage::Ready);
    assert_eq!(state.paths().target_url(), Some("http://localhost:3210"));
    assert_eq!(
        effects,
        vec![Effect::PromoteToMainSurface {
            url: "http://localhost:3210".to_string(),
        }]
    );
}

#[test]
fn url_without_ready_marker_waits() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = awaiting_server(settings);

    let (state, effects) = classify(state, &classifier, &["Local:   http://localhost:3210"]);
    assert_eq!(state.stage(), Stage::AwaitServerReady);
    assert!(effects.is_empty());

    // A later duplicate banner does not override the first URL.
    let (state, effects) = classify(
        state,
        &classifier,
        &["Local:   http://localhost:9999", "Ready in 12ms"],
    );
    assert_eq!(state.stage(), Stage::Ready);
    assert_eq!(
        effects,
        vec![Effect::PromoteToMainSurface {
            url: "http://localhost:3210".to_string(),
        }]
    );
}

#[test]
fn ready_marker_without_url_uses_fallback_port() {
    init_logging();
    let settings = LaunchSettings {
        fallback_port: Some(8100),
        ..settings()
    };
    let classifier = classifier_for(&settings);
    let state = awaiting_server(settings);

    let (state, effects) = classify(state, &classifier, &["Ready in 1.2s"]);

    assert_eq!(state.stage(), Stage::Ready);
    assert_eq!(
        effects,
        vec![Effect::PromoteToMainSurface {
            url: "http://localhost:8100".to_string(),
        }]
    );
}

#[test]
fn ready_marker_without_url_or_fallback_keeps_waiting() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = awaiting_server(settings);

    let (state, effects) = classify(state, &classifier, &["Ready in 842ms"]);

    assert_eq!(state.stage(), Stage::AwaitServerReady);
    assert!(effects.is_empty());
}

#[test]
fn url_only_flavor_needs_a_url_payload() {
    init_logging();
    let settings = LaunchSettings {
        server_flavor: ServerFlavor::UrlOnly,
        fallback_port: Some(8100),
        ..settings()
    };
    let classifier = classifier_for(&settings);
    let state = awaiting_server(settings);

    let (state, effects) = classify(state, &classifier, &["Local:"]);
    assert_eq!(state.stage(), Stage::AwaitServerReady);
    assert!(effects.is_empty());

    let (state, effects) = classify(state, &classifier, &["- Local:        http://localhost:3010"]);
    assert_eq!(state.stage(), Stage::Ready);
    assert_eq!(
        effects,
        vec![Effect::PromoteToMainSurface {
            url: "http://localhost:3010".to_string(),
        }]
    );
}

#[test]
fn ready_is_promoted_only_once() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = awaiting_server(settings);
    let batch = ["Local:   http://localhost:3210", "Ready in 842ms"];

    let (state, effects) = classify(state, &classifier, &batch);
    assert_eq!(effects.len(), 1);
    assert!(state.is_promoted());

    let lines: Vec<String> = batch.iter().map(|line| line.to_string()).collect();
    let replay = Classifier::from_settings(state.settings())
        .unwrap()
        .scan(Stage::AwaitServerReady, &lines);
    let (state, effects) = update(
        state,
        Msg::QuietPeriodElapsed {
            classification: replay,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::Ready);
}

#[test]
fn bundle_dispatch_error_fails_without_retry() {
    init_logging();
    let state = started(settings());
    let (state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(true, false))),
    );

    let (state, effects) = update(
        state,
        Msg::BundleAcquireDispatched(Err(failed("connection refused"))),
    );

    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::BundleAcquireFailed);
    let failure = state.failure().unwrap();
    assert_eq!(failure.stage, Stage::AcquireBundle);
    assert_eq!(
        failure.error,
        LaunchError::DownloadDispatchFailed("connection refused".to_string())
    );
    assert!(failure.cause().contains("connection refused"));
    assert_eq!(
        state.view().failure_cause.as_deref(),
        Some("bundle download failed: connection refused")
    );
}

#[test]
fn runtime_install_retries_up_to_bound() {
    init_logging();
    let state = started(settings());
    let (mut state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(false, false))),
    );

    for attempt in 1..3 {
        let (next, effects) = update(
            state,
            Msg::RuntimeInstallDispatched(Err(failed("disk full"))),
        );
        assert_eq!(effects, vec![Effect::InstallRuntime], "attempt {attempt}");
        assert_eq!(next.stage(), Stage::InstallRuntime);
        assert_eq!(next.errors().attempts_failed, attempt);
        assert_eq!(
            next.errors().last_error,
            Some(LaunchError::InstallDispatchFailed("disk full".to_string()))
        );
        state = next;
    }

    let (state, effects) = update(
        state,
        Msg::RuntimeInstallDispatched(Err(failed("disk full"))),
    );
    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::RuntimeInstallFailed);
    assert_eq!(
        state.failure().unwrap().error,
        LaunchError::RetryBoundExceeded {
            stage: Stage::InstallRuntime,
            attempts: 3,
            cause: "disk full".to_string(),
        }
    );
}

#[test]
fn retry_counter_clears_after_success() {
    init_logging();
    let state = started(settings());
    let (state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(false, false))),
    );
    let (state, _) = update(state, Msg::RuntimeInstallDispatched(Err(failed("busy"))));
    assert_eq!(state.errors().attempts_failed, 1);

    let (state, _) = update(state, Msg::RuntimeInstallDispatched(Ok(())));
    assert_eq!(state.stage(), Stage::AwaitRuntimeInstalled);
    assert_eq!(state.errors().attempts_failed, 0);
    assert_eq!(state.errors().last_error, None);
}

#[test]
fn prerequisite_query_failures_exhaust_into_failure_stage() {
    init_logging();
    let mut state = started(settings());

    for _ in 0..2 {
        let (next, effects) = update(
            state,
            Msg::PrerequisitesFetched(Err(failed("store unavailable"))),
        );
        assert_eq!(effects, vec![Effect::FetchPrerequisites]);
        state = next;
    }
    let (state, effects) = update(
        state,
        Msg::PrerequisitesFetched(Err(failed("store unavailable"))),
    );

    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::PrerequisitesFailed);
    assert!(state
        .failure()
        .unwrap()
        .cause()
        .contains("store unavailable"));
}

#[test]
fn explicit_failure_marker_ends_install_wait() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = started(settings);
    let (state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(false, false))),
    );
    let (state, _) = update(state, Msg::RuntimeInstallDispatched(Ok(())));

    let (state, effects) = classify(
        state,
        &classifier,
        &["Download progress: 12.50%", "Error: Failed to download the file - Status: 404"],
    );

    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::RuntimeInstallFailed);
    assert_eq!(
        state.failure().unwrap().error,
        LaunchError::FailureMarker {
            stage: Stage::AwaitRuntimeInstalled,
            line: "Error: Failed to download the file - Status: 404".to_string(),
        }
    );
}

#[test]
fn unrelated_output_never_fails_a_wait() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = started(settings);
    let (state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(true, false))),
    );
    let (mut state, _) = update(state, Msg::BundleAcquireDispatched(Ok(())));

    for _ in 0..50 {
        let (next, effects) = classify(state, &classifier, &["npm WARN deprecated", "   "]);
        assert!(effects.is_empty());
        state = next;
    }
    let (state, _) = update(
        state,
        Msg::QuietPeriodElapsed {
            classification: None,
        },
    );

    assert_eq!(state.stage(), Stage::AwaitBundleReady);
    assert!(state.failure().is_none());
}

#[test]
fn marker_wait_limit_turns_silence_into_timeout() {
    init_logging();
    let settings = LaunchSettings {
        marker_wait_limit: Some(2),
        ..settings()
    };
    let classifier = classifier_for(&settings);
    let state = started(settings);
    let (state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(false, false))),
    );
    let (state, _) = update(state, Msg::RuntimeInstallDispatched(Ok(())));

    let (state, _) = classify(state, &classifier, &["deno 2.1.4"]);
    assert_eq!(state.stage(), Stage::AwaitRuntimeInstalled);
    let (state, _) = classify(state, &classifier, &["something else"]);

    assert_eq!(state.stage(), Stage::RuntimeInstallFailed);
    assert_eq!(
        state.failure().unwrap().error,
        LaunchError::InstallMarkerTimedOut { passes: 2 }
    );
}

#[test]
fn bundle_marker_without_path_is_insufficient() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = started(settings);
    let (state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(true, false))),
    );
    let (state, _) = update(state, Msg::BundleAcquireDispatched(Ok(())));

    let (state, effects) = classify(state, &classifier, &["Bundle unpacked"]);

    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::AwaitBundleReady);
}

#[test]
fn server_command_failure_is_surfaced() {
    init_logging();
    let state = started(settings());
    let (state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(true, true))),
    );

    let (state, effects) = update(
        state,
        Msg::InputDelivered {
            command: ServerCommand::ChangeDirectory,
            result: Err(failed("broken pipe")),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::ServerStartFailed);
    assert_eq!(
        state.failure().unwrap().error,
        LaunchError::ServerStartDispatchFailed("broken pipe".to_string())
    );
}

#[test]
fn stage_never_moves_backwards_on_happy_path() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let mut stages = Vec::new();

    let state = started(settings);
    stages.push(state.stage());
    let (state, _) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(false, false))),
    );
    stages.push(state.stage());
    let (state, _) = update(state, Msg::RuntimeInstallDispatched(Err(failed("busy"))));
    stages.push(state.stage());
    let (state, _) = update(state, Msg::RuntimeInstallDispatched(Ok(())));
    stages.push(state.stage());
    let (state, _) = classify(state, &classifier, &["Deno was installed successfully"]);
    stages.push(state.stage());
    let (state, _) = update(state, Msg::BundleAcquireDispatched(Ok(())));
    stages.push(state.stage());
    let (state, _) = classify(state, &classifier, &["Bundle unpacked to /apps/lobe"]);
    stages.push(state.stage());
    let (state, _) = update(state, ok_input(ServerCommand::ChangeDirectory));
    stages.push(state.stage());
    let (state, _) = update(state, ok_input(ServerCommand::LaunchServer));
    stages.push(state.stage());
    let (state, _) = classify(
        state,
        &classifier,
        &["Local:   http://localhost:3210", "Ready in 842ms"],
    );
    stages.push(state.stage());

    let ordinals: Vec<u8> = stages.iter().filter_map(|stage| stage.ordinal()).collect();
    assert_eq!(ordinals.len(), stages.len());
    assert!(ordinals.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(stages.last(), Some(&Stage::Ready));
}

#[test]
fn teardown_interrupts_once_and_freezes_the_run() {
    init_logging();
    let state = started(settings());

    let (state, effects) = update(state, Msg::TeardownRequested);
    assert_eq!(
        effects,
        vec![Effect::InterruptSession, Effect::DisposeSession]
    );
    assert!(state.view().closed);

    let (state, effects) = update(state, Msg::TeardownRequested);
    assert!(effects.is_empty());

    let (state, effects) = update(
        state,
        Msg::PrerequisitesFetched(Ok(prerequisites(true, true))),
    );
    assert!(effects.is_empty());
    assert_eq!(state.stage(), Stage::CheckPrerequisites);
}

#[test]
fn resize_is_forwarded_only_on_change() {
    init_logging();
    let state = started(settings());

    let (state, effects) = update(state, Msg::SurfaceResized { rows: 24, cols: 80 });
    assert!(effects.is_empty());

    let (_, effects) = update(state, Msg::SurfaceResized { rows: 30, cols: 120 });
    assert_eq!(effects, vec![Effect::ResizeSession { rows: 30, cols: 120 }]);
}

#[test]
fn download_notices_feed_the_view() {
    init_logging();
    let state = started(settings());

    let (state, _) = update(
        state,
        Msg::DownloadStarted {
            target: DownloadTarget::Bundle,
            uri: "https://example.com/b.zip".to_string(),
            destination: "/apps/b.zip".to_string(),
        },
    );
    let (mut state, effects) = update(
        state,
        Msg::DownloadProgress {
            target: DownloadTarget::Bundle,
            percent: 45.678,
        },
    );

    assert!(effects.is_empty());
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
    let view = state.view();
    assert_eq!(view.bundle.percent, Some(45.68));
    assert_eq!(
        view.bundle.messages,
        vec![
            "url: https://example.com/b.zip".to_string(),
            "download to: /apps/b.zip".to_string(),
        ]
    );
    assert_eq!(view.runtime.percent, None);
    assert_eq!(view.stage, Stage::CheckPrerequisites);
}

#[test]
fn malformed_listening_url_does_not_hide_a_later_valid_one() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = awaiting_server(settings);

    let (state, effects) = classify(
        state,
        &classifier,
        &[
            "Local:   http://[oops",
            "Local:   http://localhost:3210",
            "Ready in 842ms",
        ],
    );

    assert_eq!(state.stage(), Stage::Ready);
    assert_eq!(
        effects,
        vec![Effect::PromoteToMainSurface {
            url: "http://localhost:3210".to_string(),
        }]
    );
}

#[test]
fn coloured_banner_still_yields_the_url() {
    init_logging();
    let settings = settings();
    let classifier = classifier_for(&settings);
    let state = awaiting_server(settings);

    let (state, effects) = classify(
        state,
        &classifier,
        &[
            "Local:   http://localhost:3210\u{1b}[22m",
            "\u{1b}[32m✓\u{1b}[39m Ready in 842ms",
        ],
    );

    assert_eq!(state.stage(), Stage::Ready);
    assert_eq!(
        effects,
        vec![Effect::PromoteToMainSurface {
            url: "http://localhost:3210".to_string(),
        }]
    );
}

#![allow(dead_code)]

use std::path::Path;
use std::sync::Once;

use launcher_core::{
    update, Classifier, DispatchError, Effect, LaunchSettings, Msg, Prerequisites,
    ServerCommand, SetupState, ShellKind,
};

pub const APP_DIR: &str = "/apps";
pub const RUNTIME: &str = "/home/u/.deno/bin/deno";
pub const BUNDLE: &str = "/apps/lobe-chat_v1.36.11";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(launcher_logging::initialize_for_tests);
}

pub fn settings() -> LaunchSettings {
    LaunchSettings {
        bundle_url: "https://example.com/lobe-chat_v1.36.11.zip".to_string(),
        shell: ShellKind::Posix,
        ..LaunchSettings::default()
    }
}

pub fn bundle_archive() -> String {
    Path::new(APP_DIR)
        .join("lobe-chat_v1.36.11.zip")
        .to_string_lossy()
        .into_owned()
}

pub fn prerequisites(runtime_present: bool, bundle_present: bool) -> Prerequisites {
    Prerequisites {
        runtime_present,
        runtime_path: runtime_present.then(|| RUNTIME.to_string()),
        bundle_present,
        bundle_path: bundle_present.then(|| BUNDLE.to_string()),
        app_dir: APP_DIR.to_string(),
    }
}

pub fn started(settings: LaunchSettings) -> SetupState {
    let (state, effects) = update(SetupState::new(settings), Msg::Start);
    assert_eq!(effects, vec![Effect::FetchPrerequisites]);
    state
}

pub fn classify(
    state: SetupState,
    classifier: &Classifier,
    raw: &[&str],
) -> (SetupState, Vec<Effect>) {
    let lines: Vec<String> = raw.iter().map(|line| line.to_string()).collect();
    let classification = classifier.scan(state.stage(), &lines);
    update(state, Msg::QuietPeriodElapsed { classification })
}

pub fn ok_input(command: ServerCommand) -> Msg {
    Msg::InputDelivered {
        command,
        result: Ok(()),
    }
}

pub fn failed(message: &str) -> DispatchError {
    DispatchError::new(message)
}

/// Drives a run with everything present up to `AwaitServerReady`.
pub fn awaiting_server(settings: LaunchSettings) -> SetupState {
    let state = started(settings);
    let (state, _) = update(state, Msg::PrerequisitesFetched(Ok(prerequisites(true, true))));
    let (state, _) = update(state, ok_input(ServerCommand::ChangeDirectory));
    let (state, _) = update(state, ok_input(ServerCommand::LaunchServer));
    state
}

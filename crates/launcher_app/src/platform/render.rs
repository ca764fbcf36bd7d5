use launcher_core::{SetupViewModel, Stage};

/// Status lines for what changed between two snapshots of the view.
pub(crate) fn status_lines(previous: &SetupViewModel, view: &SetupViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    if previous.stage != view.stage {
        lines.push(format!("[launcher] {}", stage_label(view.stage)));
    }
    if previous.runtime_version != view.runtime_version {
        if let Some(version) = &view.runtime_version {
            lines.push(format!("[launcher] runtime version {version}"));
        }
    }
    if previous.failure_cause != view.failure_cause {
        if let Some(cause) = &view.failure_cause {
            lines.push(format!("[launcher] failed: {cause}"));
        }
    }
    lines
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::CheckPrerequisites => "checking prerequisites",
        Stage::InstallRuntime => "installing runtime",
        Stage::AwaitRuntimeInstalled => "waiting for runtime install",
        Stage::AcquireBundle => "downloading bundle",
        Stage::AwaitBundleReady => "waiting for bundle",
        Stage::StartServer => "starting server",
        Stage::AwaitServerReady => "waiting for server",
        Stage::Ready => "ready",
        Stage::PrerequisitesFailed => "prerequisite check failed",
        Stage::RuntimeInstallFailed => "runtime install failed",
        Stage::BundleAcquireFailed => "bundle download failed",
        Stage::ServerStartFailed => "server start failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unchanged_view_prints_nothing() {
        let view = SetupViewModel::default();
        assert!(status_lines(&view, &view).is_empty());
    }

    #[test]
    fn failure_prints_stage_and_cause() {
        let previous = SetupViewModel {
            stage: Stage::AwaitBundleReady,
            ..SetupViewModel::default()
        };
        let view = SetupViewModel {
            stage: Stage::BundleAcquireFailed,
            failure_cause: Some("Error: disk full".to_string()),
            ..previous.clone()
        };

        assert_eq!(
            status_lines(&previous, &view),
            vec![
                "[launcher] bundle download failed".to_string(),
                "[launcher] failed: Error: disk full".to_string(),
            ]
        );
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use launcher_core::LaunchSettings;
use launcher_engine::AtomicFileWriter;
use launcher_logging::{launch_info, launch_warn};

const SETTINGS_FILENAME: &str = "launcher.ron";
const SETTINGS_ENV: &str = "LAUNCHER_SETTINGS";

/// First CLI argument, then `LAUNCHER_SETTINGS`, then `./launcher.ron`.
pub(crate) fn settings_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var(SETTINGS_ENV).ok())
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILENAME))
}

/// Loads settings. A missing file yields the defaults, which are written
/// back for editing; a malformed file is an error.
pub(crate) fn load_settings(path: &Path) -> anyhow::Result<LaunchSettings> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let defaults = LaunchSettings::default();
            if let Err(err) = save_settings(path, &defaults) {
                launch_warn!("Could not write default settings to {:?}: {:#}", path, err);
            } else {
                launch_info!("Wrote default settings to {:?}", path);
            }
            return Ok(defaults);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read settings from {path:?}"))
        }
    };

    let settings: LaunchSettings =
        ron::from_str(&content).with_context(|| format!("malformed settings in {path:?}"))?;
    launch_info!("Loaded settings from {:?}", path);
    Ok(settings)
}

pub(crate) fn save_settings(path: &Path, settings: &LaunchSettings) -> anyhow::Result<()> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("settings path {path:?} has no file name"))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(settings, pretty).context("serialize settings")?;
    AtomicFileWriter::new(dir).write(filename, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use launcher_core::ServerFlavor;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults_and_writes_them_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("launcher.ron");

        let settings = load_settings(&path).unwrap();

        assert_eq!(settings, LaunchSettings::default());
        assert!(path.is_file());
        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("launcher.ron");
        fs::write(
            &path,
            r#"(bundle_url: "https://example.com/b.zip", server_flavor: UrlOnly, fallback_port: Some(3210))"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();

        assert_eq!(settings.bundle_url, "https://example.com/b.zip");
        assert_eq!(settings.server_flavor, ServerFlavor::UrlOnly);
        assert_eq!(settings.fallback_port, Some(3210));
        assert_eq!(settings.retry_bound, 3);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("launcher.ron");
        fs::write(&path, "(retry_bound: \"three\")").unwrap();

        let err = load_settings(&path).unwrap_err();
        assert!(format!("{err:#}").contains("malformed settings"));
    }

    #[test]
    fn explicit_argument_wins() {
        assert_eq!(
            settings_path(Some("/etc/launcher.ron".to_string())),
            PathBuf::from("/etc/launcher.ron")
        );
    }
}

use std::path::{Path, PathBuf};

use launcher_logging::launch_debug;
use thiserror::Error;

use crate::install::runtime_binary_name;
use crate::persist::{ensure_dir, PersistError};
use crate::unpack::unpack_dir_for;

const APP_DIR_NAME: &str = "lobe_chat_client";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("home directory not found")]
    NoHomeDir,
    #[error("application directory {path}: {source}")]
    AppDir { path: PathBuf, source: PersistError },
    #[error("bundle file name {0:?} has no stem")]
    BundleName(String),
}

/// What is already on disk before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub runtime_path: Option<PathBuf>,
    pub bundle_dir: Option<PathBuf>,
    pub app_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub runtime_bin_dir: PathBuf,
    pub app_dir: PathBuf,
    pub bundle_file_name: String,
    /// A bundle directory only counts when it contains this file.
    pub server_entrypoint: String,
}

/// `~/lobe_chat_client`.
pub fn default_app_dir() -> Result<PathBuf, ProbeError> {
    dirs::home_dir()
        .map(|home| home.join(APP_DIR_NAME))
        .ok_or(ProbeError::NoHomeDir)
}

/// Looks for an installed runtime and an unpacked bundle. Creates the
/// application directory when it is missing.
pub fn probe(settings: &ProbeSettings) -> Result<ProbeReport, ProbeError> {
    ensure_dir(&settings.app_dir).map_err(|source| ProbeError::AppDir {
        path: settings.app_dir.clone(),
        source,
    })?;

    let binary = settings.runtime_bin_dir.join(runtime_binary_name());
    let runtime_path = binary.is_file().then_some(binary);

    let bundle_dir = unpack_dir_for(&settings.app_dir.join(&settings.bundle_file_name))
        .ok_or_else(|| ProbeError::BundleName(settings.bundle_file_name.clone()))?;
    let bundle_dir = is_unpacked(&bundle_dir, &settings.server_entrypoint).then_some(bundle_dir);

    let report = ProbeReport {
        runtime_path,
        bundle_dir,
        app_dir: settings.app_dir.clone(),
    };
    launch_debug!("probe: {:?}", report);
    Ok(report)
}

fn is_unpacked(dir: &Path, entrypoint: &str) -> bool {
    dir.is_dir() && dir.join(entrypoint).is_file()
}

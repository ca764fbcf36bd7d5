use std::path::{Path, PathBuf};

use crate::unpack::{unpack_archive, UnpackError};

/// Release target triple for the host, if the runtime ships one.
pub fn release_target() -> Option<&'static str> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("windows", "x86_64") => Some("x86_64-pc-windows-msvc"),
        ("macos", "aarch64") => Some("aarch64-apple-darwin"),
        ("macos", "x86_64") => Some("x86_64-apple-darwin"),
        ("linux", "x86_64") => Some("x86_64-unknown-linux-gnu"),
        ("linux", "aarch64") => Some("aarch64-unknown-linux-gnu"),
        _ => None,
    }
}

pub fn runtime_archive_url(base: &str, version: &str, target: &str) -> String {
    format!(
        "{}/v{}/deno-{}.zip",
        base.trim_end_matches('/'),
        version.trim_start_matches('v'),
        target
    )
}

pub fn runtime_archive_name(version: &str, target: &str) -> String {
    format!("deno-{}-{}.zip", version.trim_start_matches('v'), target)
}

pub fn runtime_binary_name() -> &'static str {
    if cfg!(windows) {
        "deno.exe"
    } else {
        "deno"
    }
}

/// `$DENO_INSTALL/bin`, falling back to `~/.deno/bin`.
pub fn default_runtime_bin_dir() -> Option<PathBuf> {
    let root = match std::env::var_os("DENO_INSTALL") {
        Some(root) if !root.is_empty() => PathBuf::from(root),
        _ => dirs::home_dir()?.join(".deno"),
    };
    Some(root.join("bin"))
}

/// Unpacks a downloaded runtime archive into `bin_dir` and marks the binary
/// executable. Returns the binary path.
pub fn finish_install(archive: &Path, bin_dir: &Path) -> Result<PathBuf, UnpackError> {
    unpack_archive(archive, bin_dir)?;
    let binary = bin_dir.join(runtime_binary_name());
    if !binary.is_file() {
        return Err(UnpackError::MissingEntry(runtime_binary_name().to_string()));
    }
    make_executable(&binary)?;
    Ok(binary)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

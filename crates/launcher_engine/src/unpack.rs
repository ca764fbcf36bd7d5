use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use launcher_logging::{launch_debug, launch_warn};
use thiserror::Error;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("cannot open archive {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("archive did not contain {0}")]
    MissingEntry(String),
}

/// Directory an archive unpacks into: a sibling named after the file stem,
/// `<dir>/bundle.zip` -> `<dir>/bundle`.
pub fn unpack_dir_for(archive: &Path) -> Option<PathBuf> {
    let stem = archive.file_stem()?;
    Some(archive.parent()?.join(stem))
}

/// Extracts every entry of `archive` below `into`. Entries whose names would
/// escape `into` are skipped. Returns the number of files written.
pub fn unpack_archive(archive: &Path, into: &Path) -> Result<usize, UnpackError> {
    let file = File::open(archive).map_err(|source| UnpackError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = ZipArchive::new(file)?;
    fs::create_dir_all(into)?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            launch_warn!("skipping unsafe archive entry {:?}", entry.name());
            continue;
        };
        let out_path = into.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }
    launch_debug!("unpacked {} files into {}", written, into.display());
    Ok(written)
}

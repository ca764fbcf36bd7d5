use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure a directory exists and is writable; create it if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::Dir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
    Ok(())
}

/// Moves a fully written temp file over `target`.
pub(crate) fn commit(tmp: NamedTempFile, target: &Path) -> Result<(), PersistError> {
    if target.exists() {
        fs::remove_file(target)?;
    }
    tmp.persist(target).map_err(|e| PersistError::Io(e.error))?;
    Ok(())
}

/// Writes whole files into one directory through a temp file and rename, so
/// readers never see a partial file.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf, PersistError> {
        ensure_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_ref())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        commit(tmp, &target)?;
        Ok(target)
    }
}

//! Launcher engine: pty session, downloads, archive unpacking and the
//! prerequisite probe.
mod engine;
mod fetch;
mod install;
mod persist;
mod probe;
mod session;
mod types;
mod unpack;

pub use engine::{EngineHandle, EngineSettings};
pub use fetch::{ChannelProgressSink, Downloader, FetchSettings, ProgressSink, ReqwestDownloader};
pub use install::{
    default_runtime_bin_dir, finish_install, release_target, runtime_archive_name,
    runtime_archive_url, runtime_binary_name,
};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use probe::{default_app_dir, probe, ProbeError, ProbeReport, ProbeSettings};
pub use session::{PtySession, SessionConfig, SessionError};
pub use types::{Artifact, EngineEvent, FailureKind, FetchError, JobId};
pub use unpack::{unpack_archive, unpack_dir_for, UnpackError};

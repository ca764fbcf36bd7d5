//! Launcher core: terminal line log, milestone classifier, and the pure setup
//! state machine that decides what to do next from what the session printed.
mod classifier;
pub mod command;
mod dispatch;
mod effect;
mod error;
mod intake;
mod line_log;
mod msg;
mod orchestrator;
mod settings;
mod state;
mod update;
mod view_model;

pub use classifier::{Classification, Classifier, Milestone, Observation, Recognizer};
pub use dispatch::{perform, Collaborators};
pub use effect::{Effect, ServerCommand};
pub use error::{DispatchError, Failure, LaunchError};
pub use intake::IntakeLoop;
pub use line_log::LineLog;
pub use msg::Msg;
pub use orchestrator::Orchestrator;
pub use settings::{
    LaunchSettings, MarkerPatterns, ServerFlavor, ShellKind, MAX_QUIET_PERIOD_MS,
};
pub use state::{DownloadTarget, ErrorState, Prerequisites, ResolvedPaths, SetupState, Stage};
pub use update::update;
pub use view_model::{DownloadView, SetupViewModel};

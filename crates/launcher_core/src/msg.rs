use crate::{Classification, DispatchError, DownloadTarget, Prerequisites, ServerCommand};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Begin the run by asking for a prerequisite snapshot.
    Start,
    /// Result of the prerequisite query.
    PrerequisitesFetched(Result<Prerequisites, DispatchError>),
    /// Acknowledgement of the runtime install request.
    RuntimeInstallDispatched(Result<(), DispatchError>),
    /// Acknowledgement of the bundle download request.
    BundleAcquireDispatched(Result<(), DispatchError>),
    /// A server command was written to the session.
    InputDelivered {
        command: ServerCommand,
        result: Result<(), DispatchError>,
    },
    /// One debounced pass over newly appended lines.
    QuietPeriodElapsed {
        classification: Option<Classification>,
    },
    DownloadStarted {
        target: DownloadTarget,
        uri: String,
        destination: String,
    },
    DownloadProgress {
        target: DownloadTarget,
        percent: f64,
    },
    /// The presentation surface changed size.
    SurfaceResized { rows: u16, cols: u16 },
    /// The hosting session is going away.
    TeardownRequested,
}

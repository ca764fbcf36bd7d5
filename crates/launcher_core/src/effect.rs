#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchPrerequisites,
    InstallRuntime,
    AcquireBundle {
        source_url: String,
        destination: String,
    },
    SendInput {
        command: ServerCommand,
        data: String,
    },
    ResizeSession {
        rows: u16,
        cols: u16,
    },
    PromoteToMainSurface {
        url: String,
    },
    /// Send the interrupt byte to the session.
    InterruptSession,
    DisposeSession,
}

/// The two commands that start the server, in delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    ChangeDirectory,
    LaunchServer,
}

use launcher_logging::{launch_info, launch_warn};

use crate::{command, DispatchError, Effect, Msg, Prerequisites};

/// The external side of the orchestrator. Implementations do the I/O; the
/// orchestrator only sees acknowledgements and errors.
pub trait Collaborators {
    fn fetch_prerequisites(&mut self) -> Result<Prerequisites, DispatchError>;

    /// Starts the install. Completion shows up later in the session output.
    fn install_runtime(&mut self) -> Result<(), DispatchError>;

    /// Starts download and unpack. Completion shows up later in the session output.
    fn acquire_bundle(&mut self, source_url: &str, destination: &str)
        -> Result<(), DispatchError>;

    fn send_input(&mut self, data: &[u8]) -> Result<(), DispatchError>;

    fn resize_session(&mut self, rows: u16, cols: u16) -> Result<(), DispatchError>;

    fn promote_to_main_surface(&mut self, target_url: &str);

    fn dispose_session(&mut self);
}

/// Performs exactly one collaborator call for `effect` and returns the
/// message that reports its result, if the stage machine needs one. Never retries.
pub fn perform(collaborators: &mut dyn Collaborators, effect: Effect) -> Option<Msg> {
    launch_info!("dispatch {:?}", effect);
    match effect {
        Effect::FetchPrerequisites => Some(Msg::PrerequisitesFetched(
            collaborators.fetch_prerequisites(),
        )),
        Effect::InstallRuntime => Some(Msg::RuntimeInstallDispatched(
            collaborators.install_runtime(),
        )),
        Effect::AcquireBundle {
            source_url,
            destination,
        } => Some(Msg::BundleAcquireDispatched(
            collaborators.acquire_bundle(&source_url, &destination),
        )),
        Effect::SendInput { command, data } => Some(Msg::InputDelivered {
            command,
            result: collaborators.send_input(data.as_bytes()),
        }),
        Effect::ResizeSession { rows, cols } => {
            if let Err(err) = collaborators.resize_session(rows, cols) {
                launch_warn!("resize to {}x{} failed: {}", cols, rows, err);
            }
            None
        }
        Effect::PromoteToMainSurface { url } => {
            collaborators.promote_to_main_surface(&url);
            None
        }
        Effect::InterruptSession => {
            if let Err(err) = collaborators.send_input(command::INTERRUPT.as_bytes()) {
                launch_warn!("interrupt failed: {}", err);
            }
            None
        }
        Effect::DisposeSession => {
            collaborators.dispose_session();
            None
        }
    }
}

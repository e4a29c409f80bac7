use serde::{Deserialize, Serialize};

/// Lifecycle state of a location reporter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    /// No subscription exists.
    #[default]
    Stopped,
    /// Permissions are checked and a provider is negotiated.
    Starting,
    /// A provider subscription is active and fixes are reported.
    Running,
    /// The subscription is being torn down.
    Stopping,
}

/// How the host shall treat the service after a start command.
///
/// Mirrors the answer a foreground service gives its host when it is started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartMode {
    /// The service is running and shall be restarted by the host if it gets killed.
    Sticky,
    /// The service failed to start and shall not be restarted.
    NotSticky,
}

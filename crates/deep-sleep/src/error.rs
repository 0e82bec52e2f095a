//! Errors raised by the sleep controller and its collaborators

use thiserror::Error;

/// A sleep controller error
///
/// None of these cross the sleep boundary. The sleep entry points log them
/// and carry on with a degraded wake strategy.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that the real-time clock did not return a usable time.
    #[error("The real-time clock could not be read.")]
    ClockUnreadable,

    /// Indicates that the real-time clock rejected a time or alarm write.
    #[error("The real-time clock could not be written.")]
    ClockUnwritable,

    /// Indicates that the observer registry has no room for another observer.
    #[error("The observer registry is full.")]
    RegistryFull,

    /// Indicates that no observer is registered under the given id.
    #[error("The observer is not registered.")]
    UnknownObserver,

    /// Indicates that the controller is already lent out, most likely to a
    /// sleep call that is still in progress.
    #[error("The sleep controller is already in use.")]
    ControllerBusy,

    /// Indicates that a global logger was already installed.
    #[error("Failed to set the global logger. No logs will be provided.")]
    FailedToSetLogger,
}

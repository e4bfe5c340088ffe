//! Unified error type for the button peripheral.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (feature `defmt`) for efficient on-target logging.

use core::fmt;

/// Outbound stack commands, named so a failure says which one failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    ConfigureSecurity,
    CreateAdvertisingSet,
    SetAdvertisingTiming,
    StartAdvertising,
    IncreaseSecurity,
    DeleteBondings,
    CloseConnection,
    SendNotification,
}

/// Failure status of a single stack command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackError {
    /// Raw status code from the radio stack.
    Raw(u16),
    /// The connection handle does not name an open connection.
    InvalidConnection,
    /// The stack is not in a state that accepts the command.
    InvalidState,
    /// Out of buffers / advertising sets / TX slots.
    NoResources,
}

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A stack command returned a non-success status.
    Command { command: Command, cause: StackError },

    /// An advertising command was issued before boot created the set.
    NoAdvertisingSet,
}

impl Error {
    /// The command that failed, if any.
    pub fn command(&self) -> Option<Command> {
        match self {
            Error::Command { command, .. } => Some(*command),
            Error::NoAdvertisingSet => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Command { command, cause } => {
                write!(f, "{:?} failed: {:?}", command, cause)
            }
            Error::NoAdvertisingSet => f.write_str("no advertising set"),
        }
    }
}

// Convenience conversions

impl From<(Command, StackError)> for Error {
    fn from((command, cause): (Command, StackError)) -> Self {
        Error::Command { command, cause }
    }
}

/// Tag a stack result with the command that produced it.
pub trait CommandResultExt<T> {
    fn during(self, command: Command) -> Result<T, Error>;
}

impl<T> CommandResultExt<T> for Result<T, StackError> {
    fn during(self, command: Command) -> Result<T, Error> {
        self.map_err(|cause| Error::from((command, cause)))
    }
}

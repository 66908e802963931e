//! Error handling for fluidjog
//!
//! Provides error types for every layer of the jog tester:
//! - Connection errors (serial port acquisition and I/O)
//! - Controller errors (boot detection, status polling)
//! - Jog errors (command generation from user parameters)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents failures to acquire or use the serial channel to the controller.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Session has already been closed
    #[error("Serial channel is closed")]
    NotConnected,

    /// Connection lost mid-session
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// Invalid connection parameters
    #[error("Invalid connection parameters: {reason}")]
    InvalidParameters {
        /// The reason the parameters are invalid.
        reason: String,
    },
}

/// Controller error type
///
/// Represents protocol-level failures while talking to the controller firmware.
#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    /// No boot banner was seen inside the boot window
    #[error("No '{banner}' boot banner within {window_ms}ms; power cycle the controller and try again")]
    BootTimeout {
        /// The banner substring that was expected.
        banner: String,
        /// The boot window in milliseconds.
        window_ms: u64,
    },

    /// Status polling never reported Idle
    #[error("Controller did not report Idle within {timeout_ms}ms")]
    IdleTimeout {
        /// The idle timeout in milliseconds.
        timeout_ms: u64,
    },
}

/// Jog command generation error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JogError {
    /// Speed percentage outside 0-100
    #[error("Speed must be between 0 and 100 percent, got {0}")]
    SpeedOutOfRange(u32),

    /// Distance is zero, NaN, or infinite
    #[error("Jog distance must be a finite, non-zero value, got {0}")]
    InvalidDistance(f64),

    /// No feedrate limit configured for an axis
    #[error("No maximum feedrate configured for axis {0}")]
    MissingFeedrateLimit(char),

    /// Axis name not recognised
    #[error("Unknown axis '{0}', expected X or Y")]
    UnknownAxis(String),
}

/// Main error type for fluidjog
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Jog error
    #[error(transparent)]
    Jog(#[from] JogError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Io(_))
    }

    /// Check if this is a boot timeout
    pub fn is_boot_timeout(&self) -> bool {
        matches!(self, Error::Controller(ControllerError::BootTimeout { .. }))
    }

    /// Check if this is an idle timeout
    pub fn is_idle_timeout(&self) -> bool {
        matches!(self, Error::Controller(ControllerError::IdleTimeout { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

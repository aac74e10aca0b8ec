//! Error types for multish.

use thiserror::Error;

/// Main error type for multish operations.
///
/// Every variant is recoverable: errors are reported inline on the
/// controller's output stream and never terminate the session loop.
#[derive(Error, Debug)]
pub enum MultishError {
    /// Malformed control-command arguments.
    #[error("{0}")]
    Usage(String),

    /// A pattern token matched no session.
    #[error("{0} not found")]
    Lookup(String),

    /// A session's connection broke or the child exited unexpectedly.
    #[error("Error talking to {0}")]
    Connection(String),

    /// Unresolved or ambiguous control command.
    #[error("Unknown control command: {0}")]
    UnknownCommand(String),

    /// PTY-related error.
    #[error("PTY error: {0}")]
    Pty(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for multish operations.
pub type Result<T> = std::result::Result<T, MultishError>;

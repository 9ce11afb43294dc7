//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while talking to the container engine.
///
/// Session and handle operations return these unchanged; they carry the
/// origin of a failure, not a reclassification of it.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine command failed.
    #[error("container {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Container was not found.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// Image was not found.
    #[error("image not found: {0}")]
    ImageNotFound(String),

    /// Failed to parse engine output.
    #[error("failed to parse engine output: {0}")]
    ParseError(String),

    /// No container runtime available.
    #[error("no container runtime available (docker or podman)")]
    NoRuntimeAvailable,

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The session's execution context was cancelled before the call finished.
    #[error("{0} cancelled")]
    Cancelled(String),

    /// The handle's container was already stopped and removed.
    #[error("container already removed: {0}")]
    ContainerRemoved(String),

    /// Engine settings could not be loaded.
    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Generic IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for a failed engine command.
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }
}

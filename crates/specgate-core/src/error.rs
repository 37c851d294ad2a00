//! Error types for specgate.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Process errors
    #[error("Failed to start {program}: {message}")]
    ProcessStart { program: String, message: String },

    #[error("{program} was cancelled")]
    Cancelled { program: String },

    #[error("{program} timed out after {seconds} seconds")]
    Timeout { program: String, seconds: u64 },

    #[error("{tool} exited with code {exit_code}\n{output}")]
    ToolFailed {
        tool: String,
        exit_code: i32,
        output: String,
    },

    // Fetch errors
    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("Failed to extract {path}: {message}")]
    Archive { path: PathBuf, message: String },

    // Pipeline errors
    #[error("Installation of {tool} failed: {message}")]
    InstallationFailed { tool: String, message: String },

    #[error("Generation of document '{document}' failed: {message}")]
    GenerationFailed { document: String, message: String },

    #[error("{task} failed: {message}")]
    TaskFailed { task: String, message: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a failed attempt may succeed when repeated.
    ///
    /// Cancellation, unlaunchable executables and bad configuration never
    /// improve on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ToolFailed { .. }
                | Error::Timeout { .. }
                | Error::Download { .. }
                | Error::Archive { .. }
                | Error::GenerationFailed { .. }
                | Error::Io(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Whether this error aborts the whole run when it reaches the
    /// orchestrator. A bare non-zero tool exit is interpreted by the caller
    /// instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ToolFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

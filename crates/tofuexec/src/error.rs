//! Error types for engine operations.

use std::io;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while driving the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The environment contains a variable the driver manages itself.
    #[error("manual setting of env var {0:?} detected")]
    ManualEnvVar(String),

    /// The engine executable could not be started.
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The engine exited with an unexpected status.
    #[error("{command} exited with {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| format!("code {c}")))]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, `None` if killed by a signal.
        code: Option<i32>,
        /// Tail of the captured stderr.
        stderr: String,
    },

    /// The engine printed something that is not the expected JSON document.
    #[error("invalid output from {command}: {source}")]
    InvalidOutput {
        /// Rendered command line.
        command: String,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// IO error while streaming engine output.
    #[error("IO error while running {command}: {source}")]
    Io {
        /// Rendered command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Exit code of a failed command, if any.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }
}

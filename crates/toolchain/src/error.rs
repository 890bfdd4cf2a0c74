//! Error types for toolchain operations.
//!
//! Errors are categorized so callers can decide how to report a failed
//! provisioning step. Every variant maps onto one stage of the pipeline:
//! resolving the version, downloading the archive, locating the binary
//! inside it, and writing it to disk.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for toolchain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of toolchain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (transient, retryable).
    Network,
    /// Platform not supported.
    Platform,
    /// Version string or archive contents did not match expectations.
    NotFound,
    /// Filesystem or permission problem while installing.
    Install,
    /// Decompression or file format error.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Platform => "Unsupported platform",
            Self::NotFound => "Version or binary not found",
            Self::Install => "Installation failed",
            Self::Format => "Invalid file format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::Platform => "OpenTofu may not publish a release for your platform",
            Self::NotFound => "Verify the requested version exists upstream",
            Self::Install => "Check permissions of the install directory",
            Self::Format => "The downloaded archive may be corrupted, try again",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while resolving and provisioning the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested version is not `latest` and not a semantic version.
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion {
        /// The raw version string.
        input: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Failed to detect a supported platform.
    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform {
        /// Operating system.
        os: String,
        /// CPU architecture.
        arch: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    HttpError {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Downloading the release archive failed.
    #[error("download failed for {url}: {message}")]
    DownloadFailed {
        /// Archive URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The archive was read to the end without finding the binary.
    #[error("binary '{binary}' not found in archive")]
    BinaryNotFound {
        /// Entry name that was searched for.
        binary: String,
    },

    /// Writing the binary or restoring its permissions failed.
    #[error("failed to install {path}: {source}")]
    InstallFailed {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Failed to decompress or read the archive.
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Invalid response from the releases API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Every installer source failed.
    #[error("no installer source succeeded: {0}")]
    SourcesExhausted(String),
}

impl Error {
    /// Create an install error with path context.
    pub fn install(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::InstallFailed {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid version error.
    pub fn invalid_version(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidVersion { .. } | Error::BinaryNotFound { .. } => ErrorCategory::NotFound,
            Error::UnsupportedPlatform { .. } => ErrorCategory::Platform,
            Error::HttpError { .. } | Error::DownloadFailed { .. } => ErrorCategory::Network,
            Error::InstallFailed { .. } => ErrorCategory::Install,
            Error::DecompressionFailed(_) | Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::SourcesExhausted(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::HttpError {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::HttpError {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

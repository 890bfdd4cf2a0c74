//! Run-level errors.

use crate::artifacts::Artifact;
use crate::cli::Operation;
use std::path::PathBuf;

/// A failure that aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("control plane bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("{0} is not implemented")]
    Unimplemented(Operation),

    #[error("failed to install tofu")]
    Provision(#[from] toolchain::Error),

    #[error("failed to set up execution environment")]
    EnvironmentSetupFailed(#[source] tofuexec::Error),

    #[error("failed to initialize tofu")]
    EngineInitFailed(#[source] tofuexec::Error),

    #[error("plan requested before init")]
    NotInitialized,

    #[error("plan failed")]
    PlanExecutionFailed(#[source] tofuexec::Error),

    #[error("failed to read plan file {}", .path.display())]
    PlanFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {artifact}")]
    ArtifactSerializationFailed {
        artifact: Artifact,
        #[source]
        source: serde_json::Error,
    },
}

/// A failed PUT.
#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error("response code: {0}")]
    Status(u16),

    #[error(transparent)]
    Transport(#[from] ureq::Error),
}

/// A non-fatal upload failure.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed uploading {artifact} to {url}: {source}")]
    UploadFailed {
        artifact: Artifact,
        url: String,
        #[source]
        source: PutError,
    },

    #[error("failed uploading logs to {url}: {source}")]
    LogUploadFailed {
        url: String,
        #[source]
        source: PutError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_names_artifact() {
        let err = UploadError::UploadFailed {
            artifact: Artifact::RedactedJsonPlan,
            url: "http://example.invalid/r".to_string(),
            source: PutError::Status(500),
        };
        assert_eq!(
            err.to_string(),
            "failed uploading redacted json plan to http://example.invalid/r: response code: 500"
        );
    }

    #[test]
    fn test_unimplemented_display() {
        assert_eq!(
            RunError::Unimplemented(Operation::Apply).to_string(),
            "apply is not implemented"
        );
    }

    #[test]
    fn test_provision_error_wraps_toolchain() {
        let err: RunError = toolchain::Error::BinaryNotFound {
            binary: "tofu".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "failed to install tofu");
    }

    #[test]
    fn test_error_chain_names_cause_once() {
        let err = anyhow::Error::from(RunError::from(toolchain::Error::BinaryNotFound {
            binary: "tofu".to_string(),
        }))
        .context("tofu plan failed");

        let rendered = format!("{err:#}");
        assert_eq!(rendered.matches("not found in archive").count(), 1);
        assert!(rendered.starts_with("tofu plan failed: failed to install tofu: "));
    }

    #[test]
    fn test_engine_failure_keeps_source() {
        use std::error::Error as _;

        let err = RunError::EngineInitFailed(tofuexec::Error::ManualEnvVar("TF_LOG".to_string()));
        assert_eq!(err.to_string(), "failed to initialize tofu");
        assert!(err.source().is_some());
    }
}

// ABOUTME: Error taxonomy for deployment operations.
// ABOUTME: Distinguishes validation, I/O, build, timeout, config, and aggregated failures.

use crate::patch::PatchError;
use crate::process::ProcessError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by pipeline operations.
///
/// Expected outcomes (nothing to remove, an unconfigured environment) are
/// return values on the operations themselves, never errors.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Missing/invalid paths or an out-of-order promotion attempt.
    #[error("{0}")]
    Validation(String),

    /// Copy/delete/read/write failure.
    #[error("I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refusing to traverse a symbolic link during a tree copy.
    #[error("refusing to copy symbolic link {0}")]
    Symlink(PathBuf),

    /// The build command ran and exited non-zero.
    #[error("build failed with exit code {code}: {stderr}")]
    Build { code: i32, stderr: String },

    /// The build command could not be started.
    #[error("failed to launch build command: {0}")]
    Spawn(#[source] std::io::Error),

    /// The build command started but its exit status could not be collected.
    #[error("failed to collect build command status: {0}")]
    Wait(#[source] std::io::Error),

    /// The build or its output drain exceeded the time bound.
    #[error("build timed out after {0} seconds")]
    Timeout(u64),

    /// Unparseable config file content.
    #[error("malformed config file {path}: {reason}")]
    ConfigFormat { path: PathBuf, reason: String },

    /// Multiple independent failures from a multi-environment operation.
    #[error("{}", aggregate_message(.0))]
    Aggregate(Vec<DeployError>),

    /// Shutdown was requested; the operation stopped at a stage boundary.
    #[error("operation cancelled")]
    Cancelled,
}

fn aggregate_message(errors: &[DeployError]) -> String {
    let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!("{} failure(s): {}", errors.len(), details.join("; "))
}

impl From<ProcessError> for DeployError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Spawn(e) => DeployError::Spawn(e),
            ProcessError::Wait(e) => DeployError::Wait(e),
            ProcessError::Failed { code, stderr } => DeployError::Build { code, stderr },
            ProcessError::Timeout(secs) => DeployError::Timeout(secs),
            ProcessError::Cancelled => DeployError::Cancelled,
        }
    }
}

impl From<PatchError> for DeployError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::Format { path, reason } => DeployError::ConfigFormat { path, reason },
            PatchError::Io { path, source } => DeployError::Io { path, source },
            PatchError::Aggregate(errors) => {
                DeployError::Aggregate(errors.into_iter().map(DeployError::from).collect())
            }
        }
    }
}

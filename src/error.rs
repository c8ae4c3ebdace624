// ABOUTME: Application-wide error types for stagecoach.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::deploy::DeployError;
use crate::settings::SettingsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("settings file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("no project named '{0}' in the settings file")]
    UnknownProject(String),

    #[error("invalid version '{0}': expected dotted numbers like 1.2.0")]
    InvalidVersion(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

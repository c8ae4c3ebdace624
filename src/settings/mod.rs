// ABOUTME: The flat settings document: environment base paths plus the project list.
// ABOUTME: Saved as pretty JSON with a plain .bak backup of the previous revision.

mod project;

pub use project::{ConfigSetting, Project, SharedProject, effective_settings};

use crate::types::Environment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SETTINGS_FILENAME: &str = "stagecoach.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Base directories for the three environments and the configured projects.
///
/// An empty base path means that environment is unconfigured; operations
/// against it report "nothing deployed / nothing done" rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub development_base_path: String,
    pub test_base_path: String,
    pub production_base_path: String,
    /// Event log file; empty disables file logging.
    pub log_file: String,
    pub projects: Vec<Project>,
}

impl Settings {
    /// Load settings from `path`. A missing file yields defaults; a present
    /// but unparseable file is an error, never silently replaced.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save settings to `path`, keeping the previous revision as `<path>.bak`.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }

        if path.exists() {
            let mut backup = path.as_os_str().to_owned();
            backup.push(".bak");
            std::fs::copy(path, PathBuf::from(backup)).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(write_err)
    }

    pub fn environment_paths(&self) -> EnvironmentPaths {
        EnvironmentPaths {
            development: non_empty_path(&self.development_base_path),
            test: non_empty_path(&self.test_base_path),
            production: non_empty_path(&self.production_base_path),
        }
    }

    pub fn project_index(&self, name: &str) -> Option<usize> {
        self.projects.iter().position(|p| p.name == name)
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// Resolved base directories, one per environment.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentPaths {
    pub development: Option<PathBuf>,
    pub test: Option<PathBuf>,
    pub production: Option<PathBuf>,
}

impl EnvironmentPaths {
    pub fn base(&self, env: Environment) -> Option<&Path> {
        match env {
            Environment::Development => self.development.as_deref(),
            Environment::Test => self.test.as_deref(),
            Environment::Production => self.production.as_deref(),
        }
    }
}

// ABOUTME: Project records and their per-environment config settings.
// ABOUTME: Deployed-to flags are derived state; directory existence is authoritative.

use crate::types::Environment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// A project shared between the command layer and background pipeline tasks.
///
/// Every read-then-write of the deployed flags goes through this lock, one
/// lock per project, so unrelated projects never block each other.
pub type SharedProject = Arc<parking_lot::Mutex<Project>>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub current_version: String,
    pub source_path: PathBuf,
    pub build_command: String,
    /// Optional external build descriptor (XML project file).
    pub project_file_path: Option<PathBuf>,

    pub deployed_to_development: bool,
    pub deployed_to_test: bool,
    pub deployed_to_production: bool,

    pub config_settings: Vec<ConfigSetting>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Project {
            name: name.into(),
            current_version: "1.0.0".to_string(),
            ..Default::default()
        }
    }

    pub fn deployed(&self, env: Environment) -> bool {
        match env {
            Environment::Development => self.deployed_to_development,
            Environment::Test => self.deployed_to_test,
            Environment::Production => self.deployed_to_production,
        }
    }

    pub fn set_deployed(&mut self, env: Environment, value: bool) {
        match env {
            Environment::Development => self.deployed_to_development = value,
            Environment::Test => self.deployed_to_test = value,
            Environment::Production => self.deployed_to_production = value,
        }
    }

    pub fn into_shared(self) -> SharedProject {
        Arc::new(parking_lot::Mutex::new(self))
    }
}

/// One config key and its value in each environment.
///
/// Each record produces a single key/value pair per environment at patch
/// time; duplicate keys are last-write-wins.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfigSetting {
    pub key_name: String,
    pub development_value: String,
    pub test_value: String,
    pub production_value: String,
}

impl ConfigSetting {
    pub fn value_for(&self, env: Environment) -> &str {
        match env {
            Environment::Development => &self.development_value,
            Environment::Test => &self.test_value,
            Environment::Production => &self.production_value,
        }
    }
}

/// Flatten settings into `(key, value)` pairs for one environment.
///
/// First-seen key order is preserved; a later duplicate overwrites the
/// earlier value in place.
pub fn effective_settings(settings: &[ConfigSetting], env: Environment) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::with_capacity(settings.len());
    for setting in settings {
        let value = setting.value_for(env).to_string();
        match pairs.iter_mut().find(|(k, _)| *k == setting.key_name) {
            Some((_, v)) => *v = value,
            None => pairs.push((setting.key_name.clone(), value)),
        }
    }
    pairs
}

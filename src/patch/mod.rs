// ABOUTME: Idempotent environment-specific config rewriting inside a deployed tree.
// ABOUTME: Scans recursively, patches per file, and aggregates per-file failures.

mod json;
mod xml;

pub use json::patch_json_config;
pub use xml::patch_xml_config;

use crate::settings::{ConfigSetting, effective_settings};
use crate::types::Environment;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("malformed config file {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("I/O failure on config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", aggregate_message(.0))]
    Aggregate(Vec<PatchError>),
}

fn aggregate_message(errors: &[PatchError]) -> String {
    let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!(
        "{} config file(s) failed to patch: {}",
        errors.len(),
        details.join("; ")
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Xml,
    Json,
}

/// Map a file name to its config format, if it is a patch target.
///
/// `*.config` files carry an XML `appSettings` section; `appsettings*.json`
/// files are flat JSON maps.
fn config_format(file_name: &str) -> Option<ConfigFormat> {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".config") {
        Some(ConfigFormat::Xml)
    } else if lower.starts_with("appsettings") && lower.ends_with(".json") {
        Some(ConfigFormat::Json)
    } else {
        None
    }
}

/// Patch every discovered config file under `dir` for the given environment.
///
/// Returns the files that were actually rewritten. Per-file failures do not
/// stop the scan: every file is processed, successfully patched files stay
/// patched, and the failures are surfaced as one aggregated error at the end.
pub fn patch_directory(
    dir: &Path,
    settings: &[ConfigSetting],
    env: Environment,
) -> Result<Vec<PathBuf>, PatchError> {
    let pairs = effective_settings(settings, env);
    if pairs.is_empty() {
        return Ok(Vec::new());
    }

    let mut patched = Vec::new();
    let mut errors = Vec::new();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                errors.push(PatchError::Io {
                    path: path.clone(),
                    source: e.into_io_error().unwrap_or_else(|| {
                        std::io::Error::other("directory walk failed")
                    }),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let Some(format) = entry.file_name().to_str().and_then(config_format) else {
            continue;
        };

        let path = entry.path();
        let result = match format {
            ConfigFormat::Xml => patch_xml_config(path, &pairs),
            ConfigFormat::Json => patch_json_config(path, &pairs),
        };
        match result {
            Ok(true) => {
                tracing::debug!(path = %path.display(), "patched config file");
                patched.push(path.to_path_buf());
            }
            Ok(false) => {
                tracing::debug!(path = %path.display(), "config file already up to date");
            }
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(patched)
    } else {
        Err(PatchError::Aggregate(errors))
    }
}

// ABOUTME: Recursive tree copy preserving relative structure.
// ABOUTME: Overwrites destination files; refuses symlinks; no rollback on failure.

use super::DeployError;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively replicate `source` beneath `target`.
///
/// Destination files are overwritten. Symbolic links are an explicit error
/// rather than a traversal hazard. On failure, files copied before the error
/// remain in place; no rollback is attempted.
pub fn copy_tree(source: &Path, target: &Path) -> Result<(), DeployError> {
    if !source.is_dir() {
        return Err(DeployError::Validation(format!(
            "source directory does not exist: {}",
            source.display()
        )));
    }

    std::fs::create_dir_all(target).map_err(|e| io_error(target, e))?;

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            DeployError::Io {
                path,
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            }
        })?;

        let path = entry.path();
        if entry.path_is_symlink() {
            return Err(DeployError::Symlink(path.to_path_buf()));
        }

        let relative = path
            .strip_prefix(source)
            .expect("walked entries are under the source root");
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination).map_err(|e| io_error(&destination, e))?;
        } else {
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
            }
            std::fs::copy(path, &destination).map_err(|e| io_error(path, e))?;
        }
    }

    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> DeployError {
    DeployError::Io {
        path: path.to_path_buf(),
        source,
    }
}

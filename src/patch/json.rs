// ABOUTME: Patches flat key/value maps in appsettings*.json files.
// ABOUTME: Rewrites only when a value actually changes or a key is added.

use super::PatchError;
use serde_json::Value;
use std::path::Path;

/// Patch a JSON config file in place.
///
/// The root must be an object; configured keys are overwritten or inserted
/// as string values. Returns whether the file was rewritten.
pub fn patch_json_config(path: &Path, pairs: &[(String, String)]) -> Result<bool, PatchError> {
    let io_err = |source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    };

    let content = std::fs::read_to_string(path).map_err(io_err)?;
    let mut root: Value = serde_json::from_str(&content).map_err(|e| PatchError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let Value::Object(map) = &mut root else {
        return Err(PatchError::Format {
            path: path.to_path_buf(),
            reason: "root element is not a JSON object".to_string(),
        });
    };

    let mut changed = false;
    for (key, value) in pairs {
        let new_value = Value::String(value.clone());
        if map.get(key) != Some(&new_value) {
            map.insert(key.clone(), new_value);
            changed = true;
        }
    }

    if !changed {
        return Ok(false);
    }

    let mut output = serde_json::to_string_pretty(&root).map_err(|e| PatchError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    output.push('\n');
    std::fs::write(path, output).map_err(io_err)?;
    Ok(true)
}

// ABOUTME: Value types shared across the crate.
// ABOUTME: Environments, version numbers, and version folder naming.

mod environment;
mod folder_name;
mod version;

pub use environment::Environment;
pub use folder_name::{is_valid_version, sanitize_name, version_folder_name};
pub use version::Version;

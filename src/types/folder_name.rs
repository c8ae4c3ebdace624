// ABOUTME: Deterministic version folder naming for deployment directories.
// ABOUTME: Sanitizes project names, bounds total length, keeps the version suffix intact.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of a version folder name, in characters.
const MAX_FOLDER_NAME_LEN: usize = 100;

/// Floor for the name segment when truncating an over-long folder name.
const MIN_NAME_SEGMENT_LEN: usize = 10;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("version pattern is valid"));

/// Whether a version string is dotted-numeric (`1`, `1.2`, `1.2.3`, ...).
pub fn is_valid_version(version: &str) -> bool {
    VERSION_RE.is_match(version)
}

/// Replace characters that are illegal in file names with underscores.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_ascii_control() => '_',
            c => c,
        })
        .collect()
}

/// Compute the version folder name for a (project name, version) pair.
///
/// The result is `<sanitized name>_v<version with dots as underscores>`,
/// truncated to at most 100 characters by shortening the name segment while
/// preserving the version suffix. The same inputs always yield the same
/// folder name, which is what lets promotion re-stage the identical folder
/// at each tier.
///
/// An invalid version string is replaced with `1.0.0` for this computation
/// only; the caller's stored version is never rewritten here.
pub fn version_folder_name(name: &str, version: &str) -> String {
    let project_name = if name.trim().is_empty() {
        "Project"
    } else {
        name
    };
    let mut safe_name = sanitize_name(project_name);

    let mut version_to_format = version;
    if version.trim().is_empty() || !is_valid_version(version) {
        tracing::warn!(version, "invalid version for folder naming, using 1.0.0");
        version_to_format = "1.0.0";
    }

    let formatted_version = format!("v{}", version_to_format.replace('.', "_"));

    let folder_name = format!("{safe_name}_{formatted_version}");
    if folder_name.chars().count() <= MAX_FOLDER_NAME_LEN {
        return folder_name;
    }

    let max_name_len = (90usize.saturating_sub(formatted_version.chars().count()))
        .max(MIN_NAME_SEGMENT_LEN);
    safe_name = safe_name.chars().take(max_name_len).collect();

    let truncated = format!("{safe_name}_{formatted_version}");
    tracing::warn!(folder = %truncated, "folder name was too long and has been truncated");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_inputs() {
        let a = version_folder_name("Alpha", "1.2.0");
        let b = version_folder_name("Alpha", "1.2.0");
        assert_eq!(a, b);
        assert_eq!(a, "Alpha_v1_2_0");
    }

    #[test]
    fn sanitizes_illegal_characters() {
        assert_eq!(sanitize_name("a/b\\c:d*e"), "a_b_c_d_e");
        assert_eq!(
            version_folder_name("my?project", "1.0.0"),
            "my_project_v1_0_0"
        );
    }

    #[test]
    fn invalid_version_falls_back_without_touching_input() {
        let version = "abc";
        assert_eq!(version_folder_name("Alpha", version), "Alpha_v1_0_0");
        // The caller's string is untouched; only the derived name changed.
        assert_eq!(version, "abc");
    }

    #[test]
    fn empty_name_uses_placeholder() {
        assert_eq!(version_folder_name("  ", "2.0.0"), "Project_v2_0_0");
    }

    #[test]
    fn long_names_are_truncated_preserving_version() {
        let name = "x".repeat(200);
        let folder = version_folder_name(&name, "1.2.3");
        assert!(folder.chars().count() <= 100);
        assert!(folder.ends_with("_v1_2_3"));
    }

    #[test]
    fn truncation_keeps_a_minimum_name_segment() {
        let long_version = format!("1{}", ".0".repeat(60));
        let folder = version_folder_name(&"y".repeat(150), &long_version);
        let name_segment: String = folder.chars().take_while(|c| *c == 'y').collect();
        assert!(name_segment.chars().count() >= 10);
    }

    #[test]
    fn valid_version_patterns() {
        assert!(is_valid_version("1"));
        assert!(is_valid_version("1.2.3.4"));
        assert!(!is_valid_version("1.2.3-rc1"));
        assert!(!is_valid_version(""));
    }
}

// ABOUTME: Three-component version numbers with increment helpers.
// ABOUTME: Parsing is lenient, falling back to 1.0.0 for unusable input.

use std::fmt;

/// A `major.minor.patch` version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Parse a dotted version string, falling back to `1.0.0` when the
    /// input does not contain at least three numeric components.
    pub fn parse_lenient(value: &str) -> Self {
        let parts: Vec<u32> = value
            .split('.')
            .map(|p| p.trim().parse::<u32>())
            .take_while(Result::is_ok)
            .map(|p| p.unwrap_or_default())
            .collect();

        if parts.len() >= 3 {
            Version {
                major: parts[0],
                minor: parts[1],
                patch: parts[2],
            }
        } else {
            Version::default()
        }
    }

    pub fn increment_major(self) -> Self {
        Version {
            major: self.major + 1,
            minor: 0,
            patch: 0,
        }
    }

    pub fn increment_minor(self) -> Self {
        Version {
            minor: self.minor + 1,
            patch: 0,
            ..self
        }
    }

    pub fn increment_patch(self) -> Self {
        Version {
            patch: self.patch + 1,
            ..self
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version {
            major: 1,
            minor: 0,
            patch: 0,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_components() {
        let v = Version::parse_lenient("2.5.11");
        assert_eq!((v.major, v.minor, v.patch), (2, 5, 11));
    }

    #[test]
    fn garbage_falls_back_to_default() {
        assert_eq!(Version::parse_lenient("abc"), Version::default());
        assert_eq!(Version::parse_lenient(""), Version::default());
        assert_eq!(Version::parse_lenient("1.2"), Version::default());
    }

    #[test]
    fn major_increment_resets_lower_components() {
        let v = Version::parse_lenient("1.2.3").increment_major();
        assert_eq!(v.to_string(), "2.0.0");
    }

    #[test]
    fn minor_increment_resets_patch() {
        let v = Version::parse_lenient("1.2.3").increment_minor();
        assert_eq!(v.to_string(), "1.3.0");
    }

    #[test]
    fn patch_increment_keeps_rest() {
        let v = Version::parse_lenient("1.2.3").increment_patch();
        assert_eq!(v.to_string(), "1.2.4");
    }
}

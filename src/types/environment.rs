// ABOUTME: The three promotion tiers and their ordering.
// ABOUTME: Each environment is seeded from its predecessor, development from source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered promotion tier with its own base directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    /// All environments in promotion order.
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Test,
        Environment::Production,
    ];

    /// The tier this environment is promoted from.
    ///
    /// Development has no predecessor: it is staged directly from the
    /// project's source path.
    pub fn predecessor(self) -> Option<Environment> {
        match self {
            Environment::Development => None,
            Environment::Test => Some(Environment::Development),
            Environment::Production => Some(Environment::Test),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

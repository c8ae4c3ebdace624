// ABOUTME: Library root for stagecoach - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod deploy;
pub mod error;
pub mod eventlog;
pub mod patch;
pub mod process;
pub mod settings;
pub mod types;

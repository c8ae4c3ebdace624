// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use stagecoach::types::Environment;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stagecoach")]
#[command(about = "Promote versioned build artifacts through development, test, and production")]
#[command(version)]
pub struct Cli {
    /// Path to the settings file (defaults to ./stagecoach.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a template settings file
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },

    /// Refresh deployment status from disk and print it
    Status {
        /// Limit to one project (all projects when omitted)
        project: Option<String>,
    },

    /// Update the project version and run its build command
    Build {
        project: String,

        /// Explicit new version (dotted numbers, e.g. 1.2.0)
        #[arg(long, value_name = "VERSION", conflicts_with = "bump")]
        set: Option<String>,

        /// Component to increment (defaults to patch)
        #[arg(long, value_enum)]
        bump: Option<Bump>,
    },

    /// Stage the project's version folder into an environment
    Deploy {
        project: String,

        #[arg(value_enum)]
        environment: Environment,
    },

    /// Delete the project's version folder from an environment
    Remove {
        project: String,

        #[arg(value_enum, required_unless_present = "all")]
        environment: Option<Environment>,

        /// Remove from all environments, production first
        #[arg(long, conflicts_with = "environment")]
        all: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Bump {
    Major,
    Minor,
    Patch,
}

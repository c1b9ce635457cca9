//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Superset deploy - stack configuration resolver and deployment planner.
#[derive(Parser, Debug)]
#[command(name = "superset-deploy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the system configuration file.
    #[arg(short, long, global = true, env = "SUPERSET_DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter system.yaml.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate every stack in the configuration.
    Validate {
        /// Show warnings as well as errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// List configured stacks.
    List,

    /// Show a resolved stack configuration.
    Show {
        /// Stack name.
        stack: String,
    },

    /// Dispatch a stack against the dry-run provisioner.
    Plan {
        /// Stack name (qualified names such as `superset-dev` are accepted).
        stack: String,
    },

    /// Show resolved application settings.
    Settings,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_with_globals() {
        let cli = Cli::try_parse_from([
            "superset-deploy",
            "plan",
            "superset-dev",
            "--output",
            "json",
            "-c",
            "stacks.yaml",
        ])
        .expect("arguments parse");

        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("stacks.yaml")));
        assert!(matches!(cli.command, Commands::Plan { ref stack } if stack == "superset-dev"));
    }

    #[test]
    fn test_show_requires_stack() {
        assert!(Cli::try_parse_from(["superset-deploy", "show"]).is_err());
    }
}

//! CLI module for the Superset deployment tool.
//!
//! This module provides the command-line interface for validating,
//! inspecting and planning stack deployments.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::{OutputFormatter, StackSummary};

//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use serde_yaml::{Mapping, Value};
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{AppSettings, ConfigHasher, SETTING_OPTIONS, is_enabled};
use crate::dispatcher::DeployOutcome;
use crate::provision::CollaboratorRequest;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// One line of the `list` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackSummary {
    /// Stack name.
    pub name: String,
    /// Declared `type`, or `-` when absent.
    pub stack_type: String,
    /// Declared `environment`, or `-` when absent.
    pub environment: String,
    /// Whether the stack is enabled.
    pub enabled: bool,
    /// Configuration fingerprint.
    pub fingerprint: String,
}

impl StackSummary {
    /// Summarizes a resolved stack.
    #[must_use]
    pub fn new(name: &str, stack: &Mapping, hasher: &ConfigHasher) -> Self {
        let field = |key: &str| {
            stack
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string()
        };

        Self {
            name: name.to_string(),
            stack_type: field("type"),
            environment: field("environment"),
            enabled: is_enabled(stack),
            fingerprint: hasher.hash_stack(stack),
        }
    }
}

/// JSON shape of the `show` command.
#[derive(Serialize)]
struct StackJson<'a> {
    name: &'a str,
    config: &'a Mapping,
}

/// Stack row for table display.
#[derive(Tabled)]
struct StackRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    stack_type: String,
    #[tabled(rename = "Environment")]
    environment: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
}

/// Collaborator step row for table display.
#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Collaborator")]
    kind: String,
    #[tabled(rename = "Resource")]
    resource: String,
}

/// Setting row for table display.
#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Variable")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Effect")]
    effect: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats validation results.
    #[must_use]
    pub fn format_validation(&self, errors: &[String], warnings: &[String]) -> String {
        match self.format {
            OutputFormat::Json => pretty(&json!({
                "valid": errors.is_empty(),
                "errors": errors,
                "warnings": warnings,
            })),
            OutputFormat::Text => {
                let mut output = String::new();

                if errors.is_empty() {
                    let _ = writeln!(output, "{} Configuration is valid!", "✓".green());
                } else {
                    let _ = writeln!(
                        output,
                        "{} Configuration has {} error(s):",
                        "✗".red(),
                        errors.len()
                    );
                    for error in errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                }

                for warning in warnings {
                    let _ = writeln!(output, "{} {warning}", "⚠".yellow());
                }

                output
            }
        }
    }

    /// Formats the stack list together with the whole-document fingerprint.
    #[must_use]
    pub fn format_stacks(&self, stacks: &[StackSummary], system_fingerprint: &str) -> String {
        let hasher = ConfigHasher::new();

        match self.format {
            OutputFormat::Json => pretty(&json!({
                "fingerprint": system_fingerprint,
                "stacks": stacks,
            })),
            OutputFormat::Text => {
                if stacks.is_empty() {
                    return String::from("   No stacks defined.\n");
                }

                let rows: Vec<StackRow> = stacks
                    .iter()
                    .map(|s| StackRow {
                        name: s.name.clone(),
                        stack_type: s.stack_type.clone(),
                        environment: s.environment.clone(),
                        enabled: if s.enabled {
                            "yes".green().to_string()
                        } else {
                            "no".dimmed().to_string()
                        },
                        fingerprint: hasher.short_hash(&s.fingerprint),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                let _ = writeln!(
                    output,
                    "\nConfig hash: {}",
                    hasher.short_hash(system_fingerprint)
                );
                output
            }
        }
    }

    /// Formats a resolved stack as YAML (text) or JSON.
    #[must_use]
    pub fn format_stack(&self, name: &str, stack: &Mapping) -> String {
        match self.format {
            OutputFormat::Json => pretty(&StackJson { name, config: stack }),
            OutputFormat::Text => {
                let body = serde_yaml::to_string(stack).unwrap_or_default();
                format!("# {name}\n{body}")
            }
        }
    }

    /// Formats a dispatch outcome together with the collaborator calls it made.
    #[must_use]
    pub fn format_plan(&self, outcome: &DeployOutcome, steps: &[CollaboratorRequest]) -> String {
        match self.format {
            OutputFormat::Json => {
                let collaborators: Vec<_> = steps
                    .iter()
                    .map(|step| json!({ "kind": step.kind, "name": step.name }))
                    .collect();
                pretty(&json!({ "outcome": outcome, "collaborators": collaborators }))
            }
            OutputFormat::Text => Self::format_plan_text(outcome, steps),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(outcome: &DeployOutcome, steps: &[CollaboratorRequest]) -> String {
        let report = match outcome {
            DeployOutcome::Disabled { stack } => {
                return format!(
                    "{} Stack {stack} is disabled - nothing to deploy.\n",
                    "⚠".yellow()
                );
            }
            DeployOutcome::Deployed(report) => report,
        };

        let mut output = String::new();
        let _ = write!(
            output,
            "\n📋 Plan for {} ({})\n   Config hash: {}\n\n",
            report.stack.bold(),
            report.stack_type,
            ConfigHasher::new().short_hash(&report.fingerprint)
        );

        if steps.is_empty() {
            output.push_str("   No collaborators invoked.\n");
        } else {
            let rows: Vec<StepRow> = steps
                .iter()
                .enumerate()
                .map(|(i, step)| StepRow {
                    index: i + 1,
                    kind: step.kind.to_string(),
                    resource: step.name.clone(),
                })
                .collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        output.push_str("\nOutputs:\n");
        for (key, value) in &report.outputs {
            match value {
                serde_json::Value::String(text) if text.contains('\n') => {
                    let _ = writeln!(output, "   {key}:");
                    for line in text.lines() {
                        let _ = writeln!(output, "     {line}");
                    }
                }
                serde_json::Value::String(text) => {
                    let _ = writeln!(output, "   {key} = {text}");
                }
                other => {
                    let _ = writeln!(output, "   {key} = {other}");
                }
            }
        }

        output
    }

    /// Formats resolved application settings.
    #[must_use]
    pub fn format_settings(&self, settings: &AppSettings) -> String {
        let endpoint = settings.redis_endpoint();

        match self.format {
            OutputFormat::Json => pretty(&json!({
                "settings": settings,
                "redis_endpoint": endpoint.as_ref().ok(),
            })),
            OutputFormat::Text => {
                let rows: Vec<SettingRow> = settings
                    .entries()
                    .into_iter()
                    .zip(SETTING_OPTIONS)
                    .map(|((name, value), option)| SettingRow {
                        name: name.to_string(),
                        value: if name == "SUPERSET_SECRET_KEY" {
                            mask(value)
                        } else {
                            value.to_string()
                        },
                        effect: option.effect.to_string(),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                output.push('\n');
                match endpoint {
                    Ok(endpoint) => {
                        let _ = writeln!(
                            output,
                            "\nAsync queries: redis host={} port={} db={}",
                            endpoint.host, endpoint.port, endpoint.db
                        );
                    }
                    Err(e) => {
                        let _ = writeln!(output, "\n{} {e}", "⚠".yellow());
                    }
                }
                output
            }
        }
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Keeps the first four characters of a secret.
fn mask(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        return String::from("****");
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}

//! Superset deploy CLI entrypoint.
//!
//! This is the main entrypoint for the superset-deploy command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use superset_deploy::cli::{Cli, Commands, OutputFormatter, StackSummary};
use superset_deploy::config::{
    AppSettings, ConfigHasher, ConfigLoader, StackValidator, SystemConfig, find_config_file,
};
use superset_deploy::dispatcher::Dispatcher;
use superset_deploy::error::{ConfigError, Result};
use superset_deploy::provision::DryRunProvisioner;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` wins over the `--verbose` default. Logs go to stderr so that
/// JSON output on stdout stays parseable.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::List => cmd_list(config_path, &formatter),
        Commands::Show { stack } => cmd_show(config_path, &stack, &formatter),
        Commands::Plan { stack } => cmd_plan(config_path, &stack, &formatter).await,
        Commands::Settings => cmd_settings(config_path, &formatter),
    }
}

/// Writes a formatted block to stdout.
fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Write a starter configuration.
fn cmd_init(path: &Path, force: bool) -> Result<ExitCode> {
    info!("Initializing new configuration in: {}", path.display());

    let config_path = path.join("system.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    // Check if files exist
    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(ExitCode::FAILURE);
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, include_str!("../templates/system.yaml"))?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.lines().any(|line| line.trim() == ".env") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# Superset deploy\n.env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nConfiguration initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and set SUPERSET_SECRET_KEY");
    eprintln!("  2. Edit system.yaml with your GCP project and stacks");
    eprintln!("  3. Run 'superset-deploy validate' to check your configuration");
    eprintln!("  4. Run 'superset-deploy plan <stack>' to see what would be provisioned");

    Ok(ExitCode::SUCCESS)
}

/// Validate every stack.
fn cmd_validate(
    config_path: Option<&Path>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let errors = StackValidator::new().validate_resolved(&config);
    let mut warnings = Vec::new();
    if show_warnings && !config.stacks.is_empty() && config.enabled_stacks().is_empty() {
        warnings.push(String::from("No stacks are enabled"));
    }

    emit(&formatter.format_validation(&errors, &warnings))?;

    if errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// List configured stacks.
fn cmd_list(config_path: Option<&Path>, formatter: &OutputFormatter) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let hasher = ConfigHasher::new();

    let summaries: Vec<StackSummary> = config
        .stacks
        .iter()
        .map(|(name, stack)| StackSummary::new(name, stack, &hasher))
        .collect();

    emit(&formatter.format_stacks(&summaries, &hasher.hash_system(&config)))?;
    Ok(ExitCode::SUCCESS)
}

/// Show one resolved stack.
fn cmd_show(
    config_path: Option<&Path>,
    name: &str,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let provisioner = DryRunProvisioner::new();
    let name = Dispatcher::new(&config, &provisioner).resolve_stack_name(name)?;

    let stack = config.stack(&name).ok_or_else(|| ConfigError::StackNotFound {
        name: name.clone(),
    })?;

    emit(&formatter.format_stack(&name, stack))?;
    Ok(ExitCode::SUCCESS)
}

/// Dispatch a stack against the dry-run provisioner.
async fn cmd_plan(
    config_path: Option<&Path>,
    name: &str,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let provisioner = DryRunProvisioner::new();

    let outcome = match Dispatcher::new(&config, &provisioner).dispatch(name).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(errors) = e.validation_errors() {
                emit(&formatter.format_validation(errors, &[]))?;
                return Ok(ExitCode::FAILURE);
            }
            return Err(e);
        }
    };

    let steps = provisioner.into_invocations();
    debug!("Plan invoked {} collaborator(s)", steps.len());

    emit(&formatter.format_plan(&outcome, &steps))?;
    Ok(ExitCode::SUCCESS)
}

/// Show resolved application settings.
fn cmd_settings(config_path: Option<&Path>, formatter: &OutputFormatter) -> Result<ExitCode> {
    let base = config_path
        .and_then(Path::parent)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    ConfigLoader::new().with_base_path(base).load_dotenv()?;

    let settings = AppSettings::from_env();
    emit(&formatter.format_settings(&settings))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads `.env` and the resolved configuration.
fn load_config(config_path: Option<&Path>) -> Result<SystemConfig> {
    let config_file = resolve_config_path(config_path)?;

    let loader = ConfigLoader::new().with_base_path(
        config_file
            .parent()
            .unwrap_or_else(|| Path::new(".")),
    );
    loader.load_dotenv()?;

    loader.load_file(&config_file)
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => find_config_file(std::env::current_dir()?),
    }
}

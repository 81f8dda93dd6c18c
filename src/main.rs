//! Binary entry point for aspect-workspace.
//!
//! This binary provides the CLI interface for managing an Aspect Model
//! workspace.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::anyhow;
use aspect_workspace::cli::{
    CommandResult, NamespacesOutputFormat, OutputFormat, cmd_backup, cmd_export, cmd_import,
    cmd_migrate, cmd_namespaces, cmd_validate_package, resolve_bump_version,
};
use aspect_workspace::config::WorkspaceConfig;
use aspect_workspace::observability;
use aspect_workspace::services::ServiceContainer;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Aspect workspace - package, migrate and back up Aspect Models.
#[derive(Parser)]
#[command(name = "aspect-workspace")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "ASPECT_WORKSPACE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Workspace root, overriding the configuration.
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Output format: json or yaml.
    #[arg(long, global = true, default_value = "json")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Import a ZIP package into the workspace.
    Import {
        /// Package to import.
        package: PathBuf,

        /// Import only this package member (repeatable).
        #[arg(long = "only", value_name = "MEMBER")]
        only: Vec<String>,
    },

    /// Preview a package without importing it.
    ValidatePackage {
        /// Package to inspect.
        package: PathBuf,
    },

    /// Export elements and everything they reference.
    Export {
        /// Element URNs, e.g. `urn:samm:org.acme:1.0.0#Foo`.
        #[arg(required = true)]
        urns: Vec<String>,

        /// Package file to write.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a timestamped backup of the workspace.
    Backup {
        /// Directory to write the backup to.
        #[arg(short, long)]
        destination: Option<PathBuf>,
    },

    /// Upgrade every model file to the current meta model.
    Migrate {
        /// Write every file to the next major version of its namespace.
        #[arg(long, overrides_with = "no_bump_version")]
        bump_version: bool,

        /// Upgrade in place even if the configuration enables bumping.
        #[arg(long, overrides_with = "bump_version")]
        no_bump_version: bool,

        /// Report what would change without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// List namespaces and versions of the workspace.
    Namespaces {
        /// Output format: table, json, or yaml.
        #[arg(long = "as", default_value = "table")]
        output: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration, then applies environment and CLI overrides.
fn load_config(cli: &Cli) -> anyhow::Result<WorkspaceConfig> {
    let config = WorkspaceConfig::load(cli.config.as_deref())?;
    Ok(match &cli.workspace {
        Some(root) => config.with_workspace_root(root),
        None => config,
    })
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &WorkspaceConfig) -> anyhow::Result<()> {
    let services = ServiceContainer::from_config(config);
    let format: OutputFormat = cli.format.parse()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    tracing::debug!(
        root = %config.workspace_root.display(),
        store = config.store.as_str(),
        "Running command"
    );

    match cli.command {
        Commands::Import { package, only } => in_context(
            cmd_import(&mut out, &services, &package, &only, format),
            &format!("importing {}", package.display()),
        ),
        Commands::ValidatePackage { package } => in_context(
            cmd_validate_package(&mut out, &services, &package, format),
            &format!("validating {}", package.display()),
        ),
        Commands::Export { urns, output } => in_context(
            cmd_export(&mut out, &services, &urns, &output, format),
            "exporting models",
        ),
        Commands::Backup { destination } => in_context(
            cmd_backup(&mut out, &services, destination.as_deref(), format),
            "backing up workspace",
        ),
        Commands::Migrate {
            bump_version,
            no_bump_version,
            dry_run,
        } => in_context(
            cmd_migrate(
                &mut out,
                &services,
                resolve_bump_version(bump_version, no_bump_version, config.bump_version),
                dry_run,
                format,
            ),
            "migrating workspace",
        ),
        Commands::Namespaces { output } => {
            let output: NamespacesOutputFormat = output.parse()?;
            in_context(
                cmd_namespaces(&mut out, services.store().as_ref(), output, cli.verbose),
                "listing namespaces",
            )
        },
    }
}

/// Attaches context to a command failure.
fn in_context(result: CommandResult, what: &str) -> anyhow::Result<()> {
    result.map_err(|e| anyhow!("{what}: {e}"))
}

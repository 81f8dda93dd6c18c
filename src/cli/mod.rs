//! CLI command implementations.
//!
//! Each submodule implements one command as a thin pass-through to the
//! services of a [`ServiceContainer`](crate::ServiceContainer). Results are
//! written to any [`Write`] so they can be captured in tests.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `import` | Import a ZIP package into the workspace |
//! | `validate-package` | Preview a package without importing it |
//! | `export` | Export elements and their references as a ZIP package |
//! | `backup` | Write a timestamped backup of the workspace |
//! | `migrate` | Upgrade every model file to the current meta model |
//! | `namespaces` | List the namespaces and versions of the workspace |
//!
//! # Example Usage
//!
//! ```bash
//! # Preview, then import a package
//! aspect-workspace validate-package models.zip
//! aspect-workspace import models.zip
//!
//! # Export an aspect with everything it references
//! aspect-workspace export urn:samm:org.acme:1.0.0#Foo --output foo.zip
//!
//! # Move every model to the next major version
//! aspect-workspace migrate --bump-version
//! ```

mod backup;
mod migrate;
mod namespaces;
mod package;

pub use backup::cmd_backup;
pub use migrate::{cmd_migrate, resolve_bump_version};
pub use namespaces::{NamespaceInfo, NamespacesOutputFormat, cmd_namespaces, namespace_infos};
pub use package::{ExportSummary, cmd_export, cmd_import, cmd_validate_package};

use serde::Serialize;
use std::io::Write;
use std::str::FromStr;

/// Result type of CLI commands.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty printed JSON (default).
    #[default]
    Json,
    /// YAML.
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "yaml" | "yml" => Self::Yaml,
            _ => Self::Json,
        })
    }
}

/// Writes a command result in the requested format.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_output<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
) -> CommandResult {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            writeln!(writer, "{json}")?;
        },
        OutputFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(value)?;
            write!(writer, "{yaml}")?;
        },
    }
    Ok(())
}

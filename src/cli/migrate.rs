//! Migration CLI command.
//!
//! Upgrades every model file of the workspace to the current meta model,
//! optionally moving each namespace to its next major version.

use super::{CommandResult, OutputFormat, write_output};
use crate::services::{MigrationOptions, ServiceContainer};
use std::io::Write;

/// Picks the effective version bump from the CLI flag pair and the
/// configured default. An explicit flag wins over the configuration.
#[must_use]
pub const fn resolve_bump_version(bump: bool, no_bump: bool, configured: bool) -> bool {
    if no_bump {
        false
    } else {
        bump || configured
    }
}

/// Executes the `migrate` command.
///
/// Per-file failures are part of the printed result; the command itself only
/// fails when the workspace cannot be enumerated.
///
/// # Errors
///
/// Returns an error if the workspace cannot be walked or output fails.
pub fn cmd_migrate<W: Write>(
    writer: &mut W,
    services: &ServiceContainer,
    bump_version: bool,
    dry_run: bool,
    format: OutputFormat,
) -> CommandResult {
    let options = MigrationOptions::new()
        .with_bump_version(bump_version)
        .with_dry_run(dry_run);
    let result = services.migration().migrate(&options)?;
    write_output(writer, format, &result)
}

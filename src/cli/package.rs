//! Package commands: `import`, `validate-package` and `export`.

use super::{CommandResult, OutputFormat, write_output};
use crate::Error;
use crate::document::Violation;
use crate::io::ImportOptions;
use crate::models::ModelUrn;
use crate::services::ServiceContainer;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Outcome of the `export` command.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    /// Written package.
    pub output: PathBuf,
    /// Package paths of the exported files.
    pub files: Vec<String>,
    /// Violations found while validating the exported documents.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

fn read_package(path: &Path) -> Result<Vec<u8>, Error> {
    fs::read(path).map_err(|e| Error::OperationFailed {
        operation: "read_package".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}

/// Executes the `import` command.
///
/// # Errors
///
/// Returns an error if the package cannot be read or imported.
pub fn cmd_import<W: Write>(
    writer: &mut W,
    services: &ServiceContainer,
    package: &Path,
    only: &[String],
    format: OutputFormat,
) -> CommandResult {
    let bytes = read_package(package)?;
    let mut options = ImportOptions::default();
    if !only.is_empty() {
        options = options.with_selected(only.iter().cloned());
    }
    let grouping = services.import().import_package(&bytes, &options)?;
    write_output(writer, format, &grouping)
}

/// Executes the `validate-package` command.
///
/// # Errors
///
/// Returns an error if the package cannot be read or is unsafe.
pub fn cmd_validate_package<W: Write>(
    writer: &mut W,
    services: &ServiceContainer,
    package: &Path,
    format: OutputFormat,
) -> CommandResult {
    let bytes = read_package(package)?;
    let report = services.import().validate_package(&bytes)?;
    write_output(writer, format, &report)
}

/// Executes the `export` command.
///
/// # Errors
///
/// Returns an error if a URN is malformed, nothing resolves, or the package
/// cannot be written.
pub fn cmd_export<W: Write>(
    writer: &mut W,
    services: &ServiceContainer,
    urns: &[String],
    output: &Path,
    format: OutputFormat,
) -> CommandResult {
    let urns = urns
        .iter()
        .map(|u| ModelUrn::parse(u))
        .collect::<Result<Vec<_>, _>>()?;

    let session = services.export().validate_for_export(&urns)?;
    let files: Vec<String> = session.file_names().map(str::to_string).collect();
    let violations = session.violations.clone();
    let bytes = services.export().export_session(session)?;

    fs::write(output, bytes).map_err(|e| Error::OperationFailed {
        operation: "write_package".to_string(),
        cause: format!("{}: {e}", output.display()),
    })?;

    let summary = ExportSummary {
        output: output.to_path_buf(),
        files,
        violations,
    };
    write_output(writer, format, &summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FOO: &str = "@prefix samm: <urn:samm:org.eclipse.esmf.samm:meta-model:2.1.0#> .
@prefix : <urn:samm:org.acme:1.0.0#> .
:Foo a samm:Aspect .
";

    fn workspace() -> TempDir {
        let ws = TempDir::new().unwrap();
        let dir = ws.path().join("org.acme").join("1.0.0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Foo.ttl"), FOO).unwrap();
        ws
    }

    #[test]
    fn test_export_then_validate_then_import() {
        let source = workspace();
        let services = ServiceContainer::for_root(source.path());
        let out = TempDir::new().unwrap();
        let package = out.path().join("foo.zip");

        let mut buffer = Vec::new();
        cmd_export(
            &mut buffer,
            &services,
            &["urn:samm:org.acme:1.0.0#Foo".to_string()],
            &package,
            OutputFormat::Json,
        )
        .unwrap();
        let summary: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(summary["files"][0], "org.acme/1.0.0/Foo.ttl");
        assert!(package.exists());

        let target = TempDir::new().unwrap();
        let services = ServiceContainer::for_root(target.path());

        let mut buffer = Vec::new();
        cmd_validate_package(&mut buffer, &services, &package, OutputFormat::Json).unwrap();
        let report: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(report["entries"][0]["member"], "org.acme/1.0.0/Foo.ttl");

        let mut buffer = Vec::new();
        cmd_import(&mut buffer, &services, &package, &[], OutputFormat::Yaml).unwrap();
        assert!(String::from_utf8(buffer).unwrap().contains("org.acme"));
        assert!(target.path().join("org.acme/1.0.0/Foo.ttl").exists());
    }

    #[test]
    fn test_export_rejects_bad_urn() {
        let ws = workspace();
        let services = ServiceContainer::for_root(ws.path());
        let mut buffer = Vec::new();
        let result = cmd_export(
            &mut buffer,
            &services,
            &["not-a-urn".to_string()],
            &ws.path().join("x.zip"),
            OutputFormat::Json,
        );
        assert!(result.is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_import_missing_package() {
        let ws = TempDir::new().unwrap();
        let services = ServiceContainer::for_root(ws.path());
        let mut buffer = Vec::new();
        let result = cmd_import(
            &mut buffer,
            &services,
            &ws.path().join("missing.zip"),
            &[],
            OutputFormat::Json,
        );
        assert!(result.is_err());
    }
}

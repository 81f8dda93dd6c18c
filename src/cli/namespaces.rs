//! CLI command for listing workspace namespaces.

use super::CommandResult;
use crate::models::NamespaceGrouping;
use crate::storage::ModelStore;
use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

/// One namespace version of the workspace.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceInfo {
    /// Namespace identifier.
    pub namespace: String,
    /// Namespace version.
    pub version: String,
    /// File names in the version directory.
    pub files: Vec<String>,
}

/// Flattens a grouping into one row per namespace version.
#[must_use]
pub fn namespace_infos(grouping: &NamespaceGrouping) -> Vec<NamespaceInfo> {
    grouping
        .namespaces()
        .flat_map(|namespace| {
            grouping
                .versions(namespace)
                .unwrap_or_default()
                .iter()
                .map(move |group| NamespaceInfo {
                    namespace: namespace.to_string(),
                    version: group.version.to_string(),
                    files: group.files.iter().map(|f| f.name.clone()).collect(),
                })
        })
        .collect()
}

/// Output format for namespaces command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamespacesOutputFormat {
    /// Table format (default).
    #[default]
    Table,
    /// JSON format.
    Json,
    /// YAML format.
    Yaml,
}

impl FromStr for NamespacesOutputFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "yaml" => Self::Yaml,
            _ => Self::Table,
        })
    }
}

/// Writes namespaces as a table to the given writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_table<W: Write>(
    writer: &mut W,
    namespaces: &[NamespaceInfo],
    verbose: bool,
) -> io::Result<()> {
    writeln!(writer, "{:<32}{:<12}FILES", "NAMESPACE", "VERSION")?;
    for ns in namespaces {
        if verbose {
            writeln!(
                writer,
                "{:<32}{:<12}{}",
                ns.namespace,
                ns.version,
                ns.files.join(", ")
            )?;
        } else {
            writeln!(writer, "{:<32}{:<12}{}", ns.namespace, ns.version, ns.files.len())?;
        }
    }
    Ok(())
}

/// Writes namespaces as JSON to the given writer.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, namespaces: &[NamespaceInfo]) -> CommandResult {
    let json = serde_json::to_string_pretty(namespaces)?;
    writeln!(writer, "{json}")?;
    Ok(())
}

/// Writes namespaces as YAML to the given writer.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_yaml<W: Write>(writer: &mut W, namespaces: &[NamespaceInfo]) -> CommandResult {
    let yaml = serde_yaml_ng::to_string(namespaces)?;
    write!(writer, "{yaml}")?;
    Ok(())
}

/// Executes the namespaces command.
///
/// # Errors
///
/// Returns an error if the store cannot be listed or output fails.
pub fn cmd_namespaces<W: Write>(
    writer: &mut W,
    store: &dyn ModelStore,
    format: NamespacesOutputFormat,
    verbose: bool,
) -> CommandResult {
    let namespaces = namespace_infos(&store.list_namespaces()?);

    match format {
        NamespacesOutputFormat::Table => {
            write_table(writer, &namespaces, verbose)?;
            Ok(())
        },
        NamespacesOutputFormat::Json => write_json(writer, &namespaces),
        NamespacesOutputFormat::Yaml => write_yaml(writer, &namespaces),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelUrn;
    use crate::storage::InMemoryModelStore;

    fn store() -> InMemoryModelStore {
        let store = InMemoryModelStore::new();
        for urn in [
            "urn:samm:org.acme:1.0.0#Foo",
            "urn:samm:org.acme:1.0.0#Bar",
            "urn:samm:org.acme:2.0.0#Foo",
            "urn:samm:com.example:0.1.0#Thing",
        ] {
            let urn = ModelUrn::parse(urn).unwrap();
            let content = format!(
                "@prefix : <{}> .\n:{} :p \"v\" .\n",
                urn.namespace_urn(),
                urn.element().unwrap()
            );
            store.save_model(&urn, &content).unwrap();
        }
        store
    }

    #[test]
    fn test_namespace_infos_sorted() {
        let infos = namespace_infos(&store().list_namespaces().unwrap());
        let rows: Vec<(&str, &str)> = infos
            .iter()
            .map(|i| (i.namespace.as_str(), i.version.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("com.example", "0.1.0"),
                ("org.acme", "1.0.0"),
                ("org.acme", "2.0.0"),
            ]
        );
        assert_eq!(infos[1].files.len(), 2);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            NamespacesOutputFormat::from_str("JSON").unwrap(),
            NamespacesOutputFormat::Json
        );
        assert_eq!(
            NamespacesOutputFormat::from_str("yaml").unwrap(),
            NamespacesOutputFormat::Yaml
        );
        assert_eq!(
            NamespacesOutputFormat::from_str("invalid").unwrap(),
            NamespacesOutputFormat::Table
        );
    }

    #[test]
    fn test_write_table_simple() {
        let mut buffer = Vec::new();
        cmd_namespaces(&mut buffer, &store(), NamespacesOutputFormat::Table, false).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("NAMESPACE"));
        assert_eq!(output.lines().count(), 4);
    }

    #[test]
    fn test_write_table_verbose() {
        let mut buffer = Vec::new();
        cmd_namespaces(&mut buffer, &store(), NamespacesOutputFormat::Table, true).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("Thing.ttl"));
    }

    #[test]
    fn test_write_json() {
        let mut buffer = Vec::new();
        cmd_namespaces(&mut buffer, &store(), NamespacesOutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
        assert_eq!(value[0]["namespace"], "com.example");
    }

    #[test]
    fn test_write_yaml() {
        let mut buffer = Vec::new();
        cmd_namespaces(&mut buffer, &store(), NamespacesOutputFormat::Yaml, false).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("namespace: org.acme"));
    }
}

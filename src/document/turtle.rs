//! Textual Turtle reader backing the default document collaborators.
//!
//! The reader tokenizes a document, expands prefixed names through the
//! declared prefixes and records statement subjects (defined elements) and
//! object terms (references). It does not build a triple graph.

use super::{
    DocumentLoader, DocumentSerializer, DocumentSource, DocumentUpgrader, DocumentValidator,
    ParsedDocument, ParsedDocumentSet, Violation, ViolationKind,
};
use crate::models::{ModelUrn, ModelVersion};
use crate::{Error, Result};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// Meta model version documents are upgraded to.
pub const CURRENT_META_MODEL_VERSION: ModelVersion = ModelVersion::new(2, 1, 0);

/// Meta model namespace IRIs, current and legacy.
static META_MODEL_IRI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"urn:(?:bamm:io\.openmanufacturing|samm:org\.eclipse\.esmf\.samm):([a-z][a-z-]*):(\d+)\.(\d+)\.(\d+)#",
    )
    .unwrap_or_else(|_| unreachable!())
});

/// Default implementation of the document collaborators.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurtleDocuments;

impl TurtleDocuments {
    /// Creates the collaborator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DocumentLoader for TurtleDocuments {
    fn parse(&self, source: DocumentSource) -> Result<ParsedDocument> {
        let describe = source.location.as_ref().map_or_else(
            || "<in-memory document>".to_string(),
            |p| p.display().to_string(),
        );
        let tokens = tokenize(&source.content)
            .map_err(|e| Error::ResolutionError(format!("{describe}: {e}")))?;
        let outline = Outline::read(&tokens)
            .map_err(|e| Error::ResolutionError(format!("{describe}: {e}")))?;
        let header = header_lines(&source.content);

        Ok(ParsedDocument {
            source,
            namespace: outline.namespace,
            defined: outline.defined,
            references: outline.references,
            meta_model: outline.meta_model,
            header,
        })
    }
}

impl DocumentValidator for TurtleDocuments {
    fn validate(&self, set: &ParsedDocumentSet) -> Vec<Violation> {
        let mut violations = Vec::new();

        for doc in set {
            let location = doc.location().map(std::path::Path::to_path_buf);
            if doc.namespace().is_none() {
                violations.push(Violation {
                    message: format!("{} declares no model namespace", doc.describe()),
                    focus: None,
                    kind: ViolationKind::Syntax,
                    location,
                });
            } else if let Err(e) = doc.urn() {
                violations.push(Violation {
                    message: e.to_string(),
                    focus: doc.namespace().cloned(),
                    kind: ViolationKind::Semantic,
                    location,
                });
            } else if let Some(name) = doc.source().file_name() {
                let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
                if !doc.defined_elements().iter().any(|d| d.element() == Some(stem)) {
                    violations.push(Violation {
                        message: format!("file name {name} matches no element it defines"),
                        focus: doc.urn().ok(),
                        kind: ViolationKind::Semantic,
                        location,
                    });
                }
            }
        }

        for (urn, doc) in set.unresolved_references() {
            violations.push(Violation {
                message: format!("{urn} referenced by {} is not defined", doc.describe()),
                focus: Some(urn.clone()),
                kind: ViolationKind::Processing,
                location: doc.location().map(std::path::Path::to_path_buf),
            });
        }

        violations
    }
}

impl DocumentUpgrader for TurtleDocuments {
    fn upgrade(&self, document: ParsedDocument) -> Result<ParsedDocument> {
        let content = document.content();
        let mut unsupported = None;

        let upgraded = META_MODEL_IRI.replace_all(content, |caps: &regex::Captures<'_>| {
            let version = ModelVersion::parse(&format!("{}.{}.{}", &caps[2], &caps[3], &caps[4]));
            if let Ok(version) = version
                && version > CURRENT_META_MODEL_VERSION
            {
                unsupported.get_or_insert(version);
            }
            format!(
                "urn:samm:org.eclipse.esmf.samm:{}:{CURRENT_META_MODEL_VERSION}#",
                &caps[1]
            )
        });

        if let Some(version) = unsupported {
            return Err(Error::UnsupportedVersion(format!(
                "{} uses meta model {version}, newer than {CURRENT_META_MODEL_VERSION}",
                document.describe()
            )));
        }

        let upgraded = upgraded.replace(crate::models::BAMM_URN_PREFIX, crate::models::SAMM_URN_PREFIX);
        if upgraded == content {
            return Ok(document);
        }

        tracing::debug!(document = %document.describe(), "Upgraded meta model references");
        self.parse(DocumentSource {
            location: document.source.location,
            content: upgraded,
        })
    }

    fn rebase(&self, document: ParsedDocument, version: ModelVersion) -> Result<ParsedDocument> {
        let namespace = document.namespace().cloned().ok_or_else(|| {
            Error::InvalidIdentity(format!("{} declares no model namespace", document.describe()))
        })?;
        let target = namespace.with_version(version);
        let content = document
            .content()
            .replace(&namespace.to_string(), &target.to_string());

        self.parse(DocumentSource {
            location: document.source.location,
            content,
        })
    }
}

impl DocumentSerializer for TurtleDocuments {
    fn to_bytes(&self, document: &ParsedDocument) -> Result<Vec<u8>> {
        Ok(document.content().as_bytes().to_vec())
    }
}

/// Collects the leading comment block.
fn header_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .take_while(|line| line.is_empty() || line.starts_with('#'))
        .filter_map(|line| line.strip_prefix('#'))
        .map(|line| line.strip_prefix(' ').unwrap_or(line).to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Iri(String),
    Literal,
    Punct(char),
    Word(String),
}

fn tokenize(content: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = content.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            },
            c if c.is_whitespace() => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            },
            '<' => {
                let start = i + 1;
                let end = (start..chars.len())
                    .find(|&j| chars[j] == '>' || chars[j] == '\n')
                    .filter(|&j| chars[j] == '>')
                    .ok_or_else(|| format!("unterminated IRI on line {line}"))?;
                tokens.push(Token::Iri(chars[start..end].iter().collect()));
                i = end + 1;
            },
            '"' | '\'' => {
                i = skip_literal(&chars, i, &mut line)?;
                tokens.push(Token::Literal);
            },
            '.' | ';' | ',' | '(' | ')' | '[' | ']' => {
                tokens.push(Token::Punct(c));
                i += 1;
            },
            _ => {
                let start = i;
                while i < chars.len() && !is_word_boundary(chars[i]) {
                    i += 1;
                }
                let mut word: String = chars[start..i].iter().collect();
                // A word may swallow the statement terminator (`:Foo a :Bar.`).
                let mut terminated = false;
                while word.len() > 1 && word.ends_with('.') && !is_numeric(&word) {
                    word.pop();
                    terminated = true;
                }
                tokens.push(Token::Word(word));
                if terminated {
                    tokens.push(Token::Punct('.'));
                }
            },
        }
    }

    Ok(tokens)
}

const fn is_word_boundary(c: char) -> bool {
    c.is_whitespace()
        || matches!(c, ';' | ',' | '(' | ')' | '[' | ']' | '<' | '"' | '\'' | '#')
}

fn is_numeric(word: &str) -> bool {
    word.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
        && word.chars().any(|c| c.is_ascii_digit())
}

fn skip_literal(chars: &[char], start: usize, line: &mut usize) -> std::result::Result<usize, String> {
    let quote = chars[start];
    let opened_on = *line;
    let long = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = if long { start + 3 } else { start + 1 };

    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\n' if !long => break,
            '\n' => {
                *line += 1;
                i += 1;
            },
            c if c == quote => {
                if !long {
                    return Ok(i + 1);
                }
                if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                    return Ok(i + 3);
                }
                i += 1;
            },
            _ => i += 1,
        }
    }

    Err(format!("unterminated string literal opened on line {opened_on}"))
}

/// What the reader learns about a document.
#[derive(Debug, Default)]
struct Outline {
    namespace: Option<ModelUrn>,
    defined: Vec<ModelUrn>,
    references: BTreeSet<ModelUrn>,
    meta_model: Option<ModelUrn>,
}

impl Outline {
    fn read(tokens: &[Token]) -> std::result::Result<Self, String> {
        let mut prefixes: HashMap<String, String> = HashMap::new();
        let mut outline = Self::default();
        let mut objects = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            if let Token::Word(word) = &tokens[i]
                && (word == "@prefix" || word.eq_ignore_ascii_case("prefix"))
            {
                let (Some(Token::Word(name)), Some(Token::Iri(iri))) =
                    (tokens.get(i + 1), tokens.get(i + 2))
                else {
                    return Err("malformed prefix directive".to_string());
                };
                let name = name
                    .strip_suffix(':')
                    .ok_or_else(|| format!("malformed prefix name '{name}'"))?;
                prefixes.insert(name.to_string(), iri.clone());
                i += 3;
                if word == "@prefix" {
                    if tokens.get(i) != Some(&Token::Punct('.')) {
                        return Err(format!("prefix directive for '{name}:' is not terminated"));
                    }
                    i += 1;
                }
                continue;
            }

            if let Token::Word(word) = &tokens[i]
                && (word == "@base" || word.eq_ignore_ascii_case("base"))
            {
                i += 2;
                if word == "@base" && tokens.get(i) == Some(&Token::Punct('.')) {
                    i += 1;
                }
                continue;
            }

            let end = statement_end(tokens, i)?;
            let statement = &tokens[i..end];
            if let Some(subject) = statement.first().map(|t| expand(t, &prefixes)).transpose()?
                && let Some(urn) = subject.and_then(|iri| ModelUrn::try_parse(&iri))
                && !urn.is_meta_model()
                && urn.element().is_some()
                && !outline.defined.contains(&urn)
            {
                outline.defined.push(urn);
            }
            for token in statement.iter().skip(1) {
                if let Some(iri) = expand(token, &prefixes)? {
                    objects.push(iri);
                }
            }
            i = end + 1;
        }

        for iri in prefixes.values() {
            let Some(urn) = ModelUrn::try_parse(iri) else {
                continue;
            };
            if urn.is_meta_model()
                && (outline.meta_model.is_none() || urn.namespace().ends_with(":meta-model"))
            {
                outline.meta_model = Some(urn);
            }
        }

        outline.namespace = prefixes
            .get("")
            .and_then(|iri| ModelUrn::try_parse(iri))
            .filter(|urn| !urn.is_meta_model())
            .map(|urn| urn.namespace_urn())
            .or_else(|| outline.defined.first().map(ModelUrn::namespace_urn));

        for iri in objects {
            if let Some(urn) = ModelUrn::try_parse(&iri)
                && !urn.is_meta_model()
                && urn.element().is_some()
                && !outline.defined.contains(&urn)
            {
                outline.references.insert(urn);
            }
        }

        Ok(outline)
    }
}

/// Returns the index of the `.` terminating the statement starting at `start`.
fn statement_end(tokens: &[Token], start: usize) -> std::result::Result<usize, String> {
    let mut depth = 0i32;
    for (offset, token) in tokens[start..].iter().enumerate() {
        match token {
            Token::Punct('[' | '(') => depth += 1,
            Token::Punct(']' | ')') => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced closing bracket".to_string());
                }
            },
            Token::Punct('.') if depth == 0 => return Ok(start + offset),
            _ => {},
        }
    }
    Err("statement is not terminated with '.'".to_string())
}

/// Expands a token to a full IRI. Literals, keywords and blank nodes yield `None`.
fn expand(token: &Token, prefixes: &HashMap<String, String>) -> std::result::Result<Option<String>, String> {
    match token {
        Token::Iri(iri) => Ok(Some(iri.clone())),
        Token::Word(word) => {
            let word = word.strip_prefix("^^").unwrap_or(word);
            if word.is_empty()
                || word == "a"
                || word.starts_with('@')
                || word.starts_with("_:")
                || word == "true"
                || word == "false"
                || is_numeric(word)
            {
                return Ok(None);
            }
            let Some((prefix, local)) = word.split_once(':') else {
                return Err(format!("unexpected token '{word}'"));
            };
            prefixes
                .get(prefix)
                .map(|iri| Some(format!("{iri}{local}")))
                .ok_or_else(|| format!("undefined prefix '{prefix}:'"))
        },
        Token::Literal | Token::Punct(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryModelStore, ModelStore};

    const FOO: &str = r#"# Copyright (c) 2024 ACME
# SPDX-License-Identifier: MPL-2.0

@prefix samm: <urn:samm:org.eclipse.esmf.samm:meta-model:2.1.0#> .
@prefix samm-c: <urn:samm:org.eclipse.esmf.samm:characteristic:2.1.0#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix : <urn:samm:org.acme:1.0.0#> .

:Foo a samm:Aspect ;
   samm:preferredName "Foo aspect"@en ;
   samm:description """Multi-line
description with a . dot"""@en ;
   samm:properties ( :bar ) ;
   samm:operations ( ) .

:bar a samm:Property ;
   samm:characteristic <urn:samm:org.acme:1.0.0#Bar> .
"#;

    const BAR: &str = r"@prefix samm: <urn:samm:org.eclipse.esmf.samm:meta-model:2.1.0#> .
@prefix samm-c: <urn:samm:org.eclipse.esmf.samm:characteristic:2.1.0#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix : <urn:samm:org.acme:1.0.0#> .

:Bar a samm-c:Measurement ;
   samm:dataType xsd:float ;
   samm-c:unit [ a samm:Unit ; samm:symbol 1.5 ] .
";

    const LEGACY: &str = r"@prefix bamm: <urn:bamm:io.openmanufacturing:meta-model:1.0.0#> .
@prefix bamm-c: <urn:bamm:io.openmanufacturing:characteristic:1.0.0#> .
@prefix : <urn:bamm:org.acme:1.0.0#> .

:Legacy a bamm:Aspect ;
   bamm:properties ( ) ;
   bamm:operations ( ) .
";

    fn named(content: &str, name: &str) -> DocumentSource {
        DocumentSource::in_memory(content).with_location(format!("/tmp/{name}"))
    }

    #[test]
    fn test_parse_discovers_identity_and_references() {
        let doc = TurtleDocuments.parse(named(FOO, "Foo.ttl")).unwrap();

        assert_eq!(doc.urn().unwrap().to_string(), "urn:samm:org.acme:1.0.0#Foo");
        assert_eq!(doc.defined_elements().len(), 2);
        let refs: Vec<String> = doc.references().iter().map(ToString::to_string).collect();
        assert_eq!(refs, vec!["urn:samm:org.acme:1.0.0#Bar"]);
        assert_eq!(
            doc.meta_model().unwrap().to_string(),
            "urn:samm:org.eclipse.esmf.samm:meta-model:2.1.0#"
        );
        assert_eq!(doc.header()[0], "Copyright (c) 2024 ACME");
    }

    #[test]
    fn test_identity_prefers_file_stem() {
        let doc = TurtleDocuments.parse(named(FOO, "bar.ttl")).unwrap();
        assert_eq!(doc.urn().unwrap().element(), Some("bar"));
    }

    #[test]
    fn test_nested_blank_nodes_and_numbers() {
        let doc = TurtleDocuments.parse(named(BAR, "Bar.ttl")).unwrap();
        assert_eq!(doc.urn().unwrap().element(), Some("Bar"));
        assert!(doc.references().is_empty());
    }

    #[test]
    fn test_undefined_prefix_is_resolution_error() {
        let result = TurtleDocuments.parse(DocumentSource::in_memory(":A a samm:Aspect ."));
        assert!(matches!(result, Err(Error::ResolutionError(_))));
    }

    #[test]
    fn test_unterminated_literal_is_resolution_error() {
        let content = "@prefix : <urn:samm:org.acme:1.0.0#> .\n:A :b \"open .\n";
        let result = TurtleDocuments.parse(DocumentSource::in_memory(content));
        assert!(matches!(result, Err(Error::ResolutionError(_))));
    }

    #[test]
    fn test_missing_identity() {
        let content = "@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n";
        let doc = TurtleDocuments.parse(DocumentSource::in_memory(content)).unwrap();
        assert!(matches!(doc.urn(), Err(Error::InvalidIdentity(_))));

        let violations = TurtleDocuments.validate(&ParsedDocumentSet::new(vec![doc]));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Syntax);
    }

    #[test]
    fn test_file_name_mismatch_is_semantic() {
        let doc = TurtleDocuments.parse(named(BAR, "Renamed.ttl")).unwrap();
        let violations = TurtleDocuments.validate(&ParsedDocumentSet::new(vec![doc]));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Semantic);
    }

    #[test]
    fn test_load_requires_references() {
        let result = TurtleDocuments.load(vec![named(FOO, "Foo.ttl")]);
        assert!(matches!(result, Err(Error::ResolutionError(_))));

        let set = TurtleDocuments
            .load(vec![named(FOO, "Foo.ttl"), named(BAR, "Bar.ttl")])
            .unwrap();
        assert_eq!(set.len(), 2);
        assert!(TurtleDocuments.validate(&set).is_empty());
    }

    #[test]
    fn test_load_with_store_resolves_against_workspace() {
        let store = InMemoryModelStore::new();
        let bar = ModelUrn::parse("urn:samm:org.acme:1.0.0#Bar").unwrap();
        store.save_model(&bar, BAR).unwrap();

        let set = TurtleDocuments
            .load_with_store(vec![named(FOO, "Foo.ttl")], &store)
            .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_resolve_follows_references() {
        let store = InMemoryModelStore::new();
        let foo = ModelUrn::parse("urn:samm:org.acme:1.0.0#Foo").unwrap();
        let bar = ModelUrn::parse("urn:samm:org.acme:1.0.0#Bar").unwrap();
        store.save_model(&foo, FOO).unwrap();
        store.save_model(&bar, BAR).unwrap();

        let set = TurtleDocuments.resolve(&[foo], &store).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.find_definition(&bar).is_some());
    }

    #[test]
    fn test_resolve_skips_missing_requested() {
        let store = InMemoryModelStore::new();
        let missing = ModelUrn::parse("urn:samm:org.acme:1.0.0#Missing").unwrap();
        let set = TurtleDocuments.resolve(&[missing], &store).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_upgrade_legacy_document() {
        let doc = TurtleDocuments.parse(named(LEGACY, "Legacy.ttl")).unwrap();
        let upgraded = TurtleDocuments.upgrade(doc).unwrap();

        assert!(upgraded
            .content()
            .contains("<urn:samm:org.eclipse.esmf.samm:meta-model:2.1.0#>"));
        assert!(!upgraded.content().contains("urn:bamm:"));
        assert_eq!(
            upgraded.urn().unwrap().to_string(),
            "urn:samm:org.acme:1.0.0#Legacy"
        );
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        let doc = TurtleDocuments.parse(named(LEGACY, "Legacy.ttl")).unwrap();
        let once = TurtleDocuments.upgrade(doc).unwrap();
        let twice = TurtleDocuments.upgrade(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_upgrade_rejects_newer_meta_model() {
        let content = FOO.replace("2.1.0", "9.0.0");
        let doc = TurtleDocuments.parse(named(&content, "Foo.ttl")).unwrap();
        assert!(matches!(
            TurtleDocuments.upgrade(doc),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_rebase_rewrites_own_namespace() {
        let doc = TurtleDocuments.parse(named(FOO, "Foo.ttl")).unwrap();
        let rebased = TurtleDocuments
            .rebase(doc, ModelVersion::new(2, 0, 0))
            .unwrap();

        assert_eq!(rebased.urn().unwrap().to_string(), "urn:samm:org.acme:2.0.0#Foo");
        assert!(rebased.content().contains("<urn:samm:org.acme:2.0.0#Bar>"));
        assert!(rebased.content().contains("meta-model:2.1.0#"));
    }
}

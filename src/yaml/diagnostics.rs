//! Diagnostics for broken model files

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Document kinds accepted in `*.elca.yaml` files
const DOCUMENT_KINDS: &str =
    "project, indicators, process_db, process_config, element_types, variant";

/// YAML syntax or shape error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("invalid model file: {message}")]
#[diagnostic(code(elca::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl YamlSyntaxError {
    /// Create an error from a serde_yml error, pointing at its location
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convert 1-based line/column to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;

    for (idx, current) in source.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            let within = current
                .char_indices()
                .nth(column.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or_else(|| current.len().saturating_sub(1));
            return line_start + within;
        }
        line_start += current.len();
    }

    source.len().saturating_sub(1)
}

/// Suggest a fix based on the error message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("missing field `kind`") || msg_lower.contains("unknown variant") {
        return Some(format!("Every document needs a `kind:` of: {}", DOCUMENT_KINDS));
    }

    if msg_lower.contains("invalid element type code") {
        return Some("Element types are three digit DIN 276 codes, quoted: \"331\"".to_string());
    }

    if msg_lower.contains("invalid life cycle module") {
        return Some("Modules are A1, A2, A3, A1-3, A4, A5, B1..B7, C1..C4 or D".to_string());
    }

    if msg_lower.contains("missing field") {
        return Some("Add the missing field to the document.".to_string());
    }

    if msg_lower.contains("tab") {
        return Some(
            "YAML requires spaces for indentation, not tabs. Replace tabs with spaces.".to_string(),
        );
    }

    if msg_lower.contains("duplicate key") {
        return Some("Each key can only appear once. Remove or rename the duplicate key.".to_string());
    }

    if msg_lower.contains("mapping values are not allowed") {
        return Some("You may be missing a space after ':' or have incorrect indentation.".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_to_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_col_to_offset(source, 1, 1), 0);
        assert_eq!(line_col_to_offset(source, 2, 1), 6);
        assert_eq!(line_col_to_offset(source, 3, 3), 14);
    }

    #[test]
    fn test_help_generation() {
        assert!(generate_help("unknown variant `building`").unwrap().contains("process_config"));
        assert!(generate_help("Invalid element type code: '33'").is_some());
        assert!(generate_help("missing field `life_time`").is_some());
        assert!(generate_help("some random error").is_none());
    }

    #[test]
    fn test_from_serde_error_keeps_message() {
        let source = "kind: process_db\nid: [broken\n";
        let err = serde_yml::from_str::<serde_yml::Value>(source).unwrap_err();
        let diag = YamlSyntaxError::from_serde_error(&err, source, "db.elca.yaml");
        assert!(!diag.message().is_empty());
        assert!(diag.to_string().starts_with("invalid model file"));
    }
}

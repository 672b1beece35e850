use std::fmt::Display;

use miette::{Diagnostic, LabeledSpan, NamedSource, Severity, SourceCode, SourceSpan};
use proto_forge_dsl::{Diagnostic as DslDiagnostic, Severity as DslSeverity};

/// A parser diagnostic positioned in its source text for miette rendering.
///
/// The parser reports 0-based line and column pairs; these are converted to
/// a byte span covering the offending token.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SchemaDiagnostic {
    src: NamedSource<String>,
    span: SourceSpan,
    message: String,
    label: String,
    severity: Severity,
    suggestion: Option<String>,
}

impl Diagnostic for SchemaDiagnostic {
    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.suggestion
            .as_ref()
            .map(|s| Box::new(s) as Box<dyn Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_with_span(Some(self.label.clone()), self.span);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Convert a parser diagnostic into a miette `SchemaDiagnostic`.
pub fn to_schema_diagnostic(
    diagnostic: &DslDiagnostic,
    source: &str,
    filename: &str,
) -> SchemaDiagnostic {
    let offset = byte_offset(source, diagnostic.location.line, diagnostic.location.column);
    let (severity, label) = match diagnostic.severity {
        DslSeverity::Error => (Severity::Error, "here"),
        DslSeverity::Warning => (Severity::Warning, "noted here"),
    };

    SchemaDiagnostic {
        src: NamedSource::new(filename, source.to_string()),
        span: (offset, token_len(&source[offset..])).into(),
        message: diagnostic.message.clone(),
        label: label.to_string(),
        severity,
        suggestion: suggestion(&diagnostic.message),
    }
}

/// Render all diagnostics for a file using miette.
///
/// Returns a vector of `miette::Report` that can be printed to stderr.
pub fn render_diagnostics(
    diagnostics: &[DslDiagnostic],
    source: &str,
    filename: &str,
) -> Vec<miette::Report> {
    diagnostics
        .iter()
        .map(|d| miette::Report::new(to_schema_diagnostic(d, source, filename)))
        .collect()
}

/// Byte offset of a 0-based (line, column) position, where columns count
/// characters. Positions past the end clamp to the end of the line or input.
fn byte_offset(source: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;
    for _ in 0..line {
        match source[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return source.len(),
        }
    }

    let rest = &source[line_start..];
    let line_len = rest.find('\n').unwrap_or(rest.len());
    let within = rest[..line_len]
        .char_indices()
        .nth(column)
        .map_or(line_len, |(i, _)| i);
    line_start + within
}

/// Length in bytes of the token starting at the beginning of `rest`.
fn token_len(rest: &str) -> usize {
    let mut chars = rest.chars();
    match chars.next() {
        None | Some('\n') => 0,
        Some(c) if c.is_alphanumeric() || c == '_' || c == '.' => rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(rest.len()),
        Some(c) => c.len_utf8(),
    }
}

/// A hint for the messages where the fix is not obvious from the text.
fn suggestion(message: &str) -> Option<String> {
    let hint = if message.starts_with("expected \";\"") {
        "Statements end with ';'."
    } else if message.starts_with("expected \"required\", \"optional\", or \"repeated\"") {
        "proto2 fields need a label, e.g. 'optional int32 id = 1;'."
    } else if message.starts_with("required fields are not allowed in proto3") {
        "Drop the label, or declare syntax = \"proto2\"."
    } else if message.starts_with("explicit default values are not allowed in proto3") {
        "proto3 fields default to zero values; remove the default option."
    } else if message.starts_with("need space between number and identifier") {
        "Insert a space after the number."
    } else if message.starts_with("unmatched") {
        "Remove the extra '}' or add the matching '{'."
    } else if message.starts_with("reached end of input") {
        "Close every open block with '}'."
    } else if message.starts_with("map key type") {
        "Use an integral, bool or string key type."
    } else if message.starts_with("group fields are not supported") {
        "Declare a nested message and a field of that type instead."
    } else if message.starts_with("numbers starting with leading zero") {
        "Drop the leading zero, or use only digits 0-7."
    } else {
        return None;
    };
    Some(hint.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto_forge_core::Location;

    fn error_at(line: usize, column: usize, message: &str) -> DslDiagnostic {
        DslDiagnostic {
            severity: DslSeverity::Error,
            location: Location::new(line, column),
            message: message.into(),
        }
    }

    #[test]
    fn byte_offset_walks_lines_and_chars() {
        let source = "ab\ncdé f\n";
        assert_eq!(byte_offset(source, 0, 0), 0);
        assert_eq!(byte_offset(source, 1, 0), 3);
        // 'é' is two bytes wide
        assert_eq!(byte_offset(source, 1, 4), 8);
    }

    #[test]
    fn byte_offset_clamps_past_end() {
        let source = "ab\ncd";
        assert_eq!(byte_offset(source, 1, 10), 5);
        assert_eq!(byte_offset(source, 7, 0), 5);
    }

    #[test]
    fn token_len_covers_identifiers() {
        assert_eq!(token_len("foo.bar = 1;"), 7);
        assert_eq!(token_len("}"), 1);
        assert_eq!(token_len(""), 0);
        assert_eq!(token_len("\nx"), 0);
    }

    #[test]
    fn span_points_at_reported_token() {
        let source = "syntax = \"proto3\";\nmessage A { int32 = 1; }\n";
        let diag = to_schema_diagnostic(
            &error_at(1, 18, "expected field name, found \"=\""),
            source,
            "a.proto",
        );
        assert_eq!(diag.span.offset(), source.find("= 1").unwrap());
        assert_eq!(diag.span.len(), 1);
        assert_eq!(diag.severity, Severity::Error);
    }

    #[test]
    fn warning_keeps_warning_severity() {
        let warning = DslDiagnostic {
            severity: DslSeverity::Warning,
            location: Location::new(0, 0),
            message: "no syntax specified".into(),
        };
        let diag = to_schema_diagnostic(&warning, "message A {}", "a.proto");
        assert_eq!(diag.severity(), Some(Severity::Warning));
    }

    #[test]
    fn missing_semicolon_has_suggestion() {
        let diag = to_schema_diagnostic(
            &error_at(0, 5, "expected \";\", found \"}\""),
            "x = 1 }",
            "a.proto",
        );
        assert!(diag.suggestion.as_ref().unwrap().contains("';'"));
    }

    #[test]
    fn plain_unexpected_token_has_no_suggestion() {
        let diag = to_schema_diagnostic(
            &error_at(0, 0, "expected identifier, found \"{\""),
            "{",
            "a.proto",
        );
        assert!(diag.suggestion.is_none());
        assert_eq!(diag.to_string(), "expected identifier, found \"{\"");
    }

    #[test]
    fn render_diagnostics_produces_reports() {
        let diagnostics = vec![
            error_at(0, 0, "unmatched \"}\""),
            error_at(0, 2, "expected top-level statement (e.g. \"message\")"),
        ];
        let reports = render_diagnostics(&diagnostics, "} ?", "a.proto");
        assert_eq!(reports.len(), 2);
    }
}

use std::fmt;

use proto_forge_core::error::DescriptorError;
use proto_forge_core::Location;

/// Errors reported by the lexer and parser.
///
/// These never travel through `Result` to the caller: they are rendered
/// into an [`ErrorCollector`] at the position of the offending token, and
/// the parse as a whole is marked failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DslError {
    /// A string literal ran to the end of input without a closing quote.
    UnterminatedString,

    /// A string literal ran into a line break.
    MultilineString,

    /// A block comment was never closed.
    UnterminatedBlockComment,

    /// `/*` appeared inside a block comment.
    NestedBlockComment,

    /// A number ran straight into an identifier, e.g. `123abc`.
    NumberFollowedByIdentifier,

    /// A control character that cannot start any token.
    InvalidControlCharacter(char),

    /// The parser encountered an unexpected token.
    UnexpectedToken { expected: String, found: String },

    /// The input ended inside a block.
    UnexpectedEndOfInput { context: &'static str },

    /// An integer literal does not fit the target type.
    IntegerOutOfRange { text: String },

    /// A leading-zero literal with non-octal digits, e.g. `09`.
    InvalidOctal { text: String },

    /// A proto2 field without `optional`, `required` or `repeated`.
    MissingLabel,

    /// `required` used under proto3.
    RequiredInProto3,

    /// `[default = ...]` used under proto3.
    DefaultInProto3,

    /// A field inside a oneof carries a label.
    LabelInOneof,

    /// A map field carries a label.
    LabelOnMapField,

    /// A map field appears where maps are not allowed.
    MapFieldNotAllowed { context: &'static str },

    /// A map key type that is not an integral, bool or string scalar.
    InvalidMapKeyType { found: String },

    /// `group` fields are not supported by this compiler.
    GroupsUnsupported,

    /// A scalar type used where a message type is required.
    ScalarNotAllowed { found: String },

    /// A pseudo-option (`default`, `json_name`) set twice on one field.
    DuplicateOption { name: &'static str },

    /// A field number already taken by another field of the same message.
    DuplicateFieldNumber {
        number: i32,
        message: String,
        previous: String,
    },

    /// `[default = ...]` on a repeated field.
    RepeatedDefault,

    /// A negative default on an unsigned integer field.
    NegativeUnsignedDefault,

    /// A `-` in front of an option value that cannot be negative.
    InvalidNegativeValue,

    /// More than one `package` statement.
    MultiplePackages,

    /// A stray `}` at the top level.
    UnmatchedCloseBrace,

    /// Something other than a declaration at the top level.
    ExpectedTopLevelStatement,

    /// Warning: the file has no `syntax` statement.
    MissingSyntax,

    /// A descriptor value rejected by its constructor.
    Descriptor(DescriptorError),
}

impl fmt::Display for DslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => write!(f, "unexpected end of string"),
            Self::MultilineString => {
                write!(f, "string literals cannot cross line boundaries")
            }
            Self::UnterminatedBlockComment => write!(f, "end-of-file inside block comment"),
            Self::NestedBlockComment => {
                write!(f, "\"/*\" inside block comment; block comments cannot be nested")
            }
            Self::NumberFollowedByIdentifier => {
                write!(f, "need space between number and identifier")
            }
            Self::InvalidControlCharacter(c) => {
                write!(f, "invalid control character {:#04x} in input", *c as u32)
            }
            Self::UnexpectedToken { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::UnexpectedEndOfInput { context } => {
                write!(f, "reached end of input in {context} (missing '}}')")
            }
            Self::IntegerOutOfRange { text } => write!(f, "integer out of range: {text}"),
            Self::InvalidOctal { text } => {
                write!(f, "numbers starting with leading zero must be in octal: {text}")
            }
            Self::MissingLabel => {
                write!(f, "expected \"required\", \"optional\", or \"repeated\"")
            }
            Self::RequiredInProto3 => write!(f, "required fields are not allowed in proto3"),
            Self::DefaultInProto3 => {
                write!(f, "explicit default values are not allowed in proto3")
            }
            Self::LabelInOneof => write!(
                f,
                "fields in oneofs must not have labels (required / optional / repeated)"
            ),
            Self::LabelOnMapField => write!(
                f,
                "field labels (required/optional/repeated) are not allowed on map fields"
            ),
            Self::MapFieldNotAllowed { context } => {
                write!(f, "map fields are not allowed {context}")
            }
            Self::InvalidMapKeyType { found } => write!(
                f,
                "map key type {found} is invalid: keys must be an integral, bool or string type"
            ),
            Self::GroupsUnsupported => write!(f, "group fields are not supported"),
            Self::ScalarNotAllowed { found } => {
                write!(f, "expected message type, found scalar type {found}")
            }
            Self::DuplicateOption { name } => write!(f, "already set option \"{name}\""),
            Self::DuplicateFieldNumber {
                number,
                message,
                previous,
            } => write!(
                f,
                "field number {number} has already been used in \"{message}\" by field \"{previous}\""
            ),
            Self::RepeatedDefault => write!(f, "repeated fields can't have default values"),
            Self::NegativeUnsignedDefault => {
                write!(f, "unsigned field can't have negative default value")
            }
            Self::InvalidNegativeValue => {
                write!(f, "identifier after '-' symbol must be inf or nan")
            }
            Self::MultiplePackages => write!(f, "multiple package definitions"),
            Self::UnmatchedCloseBrace => write!(f, "unmatched \"}}\""),
            Self::ExpectedTopLevelStatement => {
                write!(f, "expected top-level statement (e.g. \"message\")")
            }
            Self::MissingSyntax => write!(
                f,
                "no syntax specified; defaulting to proto2 (add 'syntax = \"proto2\";')"
            ),
            Self::Descriptor(source) => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for DslError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Descriptor(source) => Some(source),
            _ => None,
        }
    }
}

impl From<DescriptorError> for DslError {
    fn from(source: DescriptorError) -> Self {
        Self::Descriptor(source)
    }
}

/// Receives errors and warnings for a single input.
///
/// Positions are 0-based.
pub trait ErrorCollector {
    fn record_error(&mut self, line: usize, column: usize, message: &str);

    fn record_warning(&mut self, line: usize, column: usize, message: &str) {
        let _ = (line, column, message);
    }
}

impl<T: ErrorCollector + ?Sized> ErrorCollector for &mut T {
    fn record_error(&mut self, line: usize, column: usize, message: &str) {
        (**self).record_error(line, column, message);
    }

    fn record_warning(&mut self, line: usize, column: usize, message: &str) {
        (**self).record_warning(line, column, message);
    }
}

/// Receives errors and warnings from a driver that processes several files.
pub trait MultiFileErrorCollector {
    fn record_error(&mut self, filename: &str, line: usize, column: usize, message: &str);

    fn record_warning(&mut self, filename: &str, line: usize, column: usize, message: &str) {
        let _ = (filename, line, column, message);
    }
}

/// Binds a filename to a [`MultiFileErrorCollector`] so it can serve as the
/// sink of a single parse.
pub struct FileErrorCollector<'a, M: MultiFileErrorCollector + ?Sized> {
    filename: &'a str,
    inner: &'a mut M,
}

impl<'a, M: MultiFileErrorCollector + ?Sized> FileErrorCollector<'a, M> {
    pub fn new(filename: &'a str, inner: &'a mut M) -> Self {
        Self { filename, inner }
    }
}

impl<M: MultiFileErrorCollector + ?Sized> ErrorCollector for FileErrorCollector<'_, M> {
    fn record_error(&mut self, line: usize, column: usize, message: &str) {
        self.inner.record_error(self.filename, line, column, message);
    }

    fn record_warning(&mut self, line: usize, column: usize, message: &str) {
        self.inner.record_warning(self.filename, line, column, message);
    }
}

/// Whether a diagnostic blocks further processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// One recorded error or warning.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Location,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

/// An [`ErrorCollector`] that keeps everything it is given.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    fn push(&mut self, severity: Severity, line: usize, column: usize, message: &str) {
        self.entries.push(Diagnostic {
            severity,
            location: Location::new(line, column),
            message: message.to_string(),
        });
    }
}

impl ErrorCollector for Diagnostics {
    fn record_error(&mut self, line: usize, column: usize, message: &str) {
        self.push(Severity::Error, line, column, message);
    }

    fn record_warning(&mut self, line: usize, column: usize, message: &str) {
        self.push(Severity::Warning, line, column, message);
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn error_display_unexpected_token() {
        let err = DslError::UnexpectedToken {
            expected: "\";\"".into(),
            found: "\"}\"".into(),
        };
        assert_eq!(err.to_string(), "expected \";\", found \"}\"");
    }

    #[test]
    fn error_display_end_of_input() {
        let err = DslError::UnexpectedEndOfInput {
            context: "message definition",
        };
        let msg = err.to_string();
        assert!(msg.contains("end of input in message definition"));
        assert!(msg.contains("missing '}'"));
    }

    #[test]
    fn error_display_control_character() {
        let msg = DslError::InvalidControlCharacter('\u{1}').to_string();
        assert!(msg.contains("0x01"), "{msg}");
    }

    #[test]
    fn descriptor_errors_have_source() {
        let err: DslError = DescriptorError::EmptyRange { start: 3, end: 2 }.into();
        assert!(err.source().is_some());
        assert!(DslError::MissingLabel.source().is_none());
    }

    #[test]
    fn diagnostics_split_by_severity() {
        let mut diags = Diagnostics::new();
        diags.record_warning(0, 0, "no syntax");
        assert!(!diags.has_errors());
        diags.record_error(2, 4, "bad");
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.warnings().count(), 1);
        let err = diags.errors().next().unwrap();
        assert_eq!(err.location, Location::new(2, 4));
        assert_eq!(err.to_string(), "3:5: error: bad");
    }

    #[derive(Default)]
    struct PerFile(Vec<String>);

    impl MultiFileErrorCollector for PerFile {
        fn record_error(&mut self, filename: &str, line: usize, column: usize, message: &str) {
            self.0.push(format!("{filename}:{line}:{column}: {message}"));
        }
    }

    #[test]
    fn file_collector_prefixes_filename() {
        let mut all = PerFile::default();
        {
            let mut sink = FileErrorCollector::new("a.proto", &mut all);
            sink.record_error(1, 2, "oops");
            sink.record_warning(3, 4, "ignored by default");
        }
        assert_eq!(all.0, ["a.proto:1:2: oops"]);
    }

    #[test]
    fn mutable_reference_is_a_collector() {
        fn report(mut sink: impl ErrorCollector) {
            sink.record_error(0, 0, "x");
        }
        let mut diags = Diagnostics::new();
        report(&mut diags);
        assert_eq!(diags.len(), 1);
    }
}

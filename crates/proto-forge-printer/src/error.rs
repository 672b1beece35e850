use std::fmt;

/// Errors in a template or in how it is driven.
///
/// These point at a bug in the calling generator, not at bad input:
/// [`Printer::emit`](crate::Printer::emit) panics on them, while
/// [`Printer::try_emit`](crate::Printer::try_emit) hands them back.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateError {
    /// A `$name$` with no binding in any active frame.
    UndefinedVariable(String),

    /// A delimiter with no closing partner on the same line.
    UnterminatedVariable { line: String },

    /// `_end$tag$` did not close the innermost open `_start$`.
    MismatchedRange {
        expected: Option<String>,
        found: String,
    },

    /// A `_start$tag$` still open when its template ended.
    UnclosedRange(String),

    /// A callback substituted from inside itself.
    RecursiveCallback(String),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedVariable(name) => write!(f, "undefined variable ${name}$"),
            Self::UnterminatedVariable { line } => {
                write!(f, "unterminated variable in template line {line:?}")
            }
            Self::MismatchedRange {
                expected: Some(expected),
                found,
            } => write!(
                f,
                "range marker _end${found}$ does not match open _start${expected}$"
            ),
            Self::MismatchedRange {
                expected: None,
                found,
            } => write!(f, "range marker _end${found}$ has no open _start$"),
            Self::UnclosedRange(tag) => write!(f, "range marker _start${tag}$ was never closed"),
            Self::RecursiveCallback(name) => {
                write!(f, "callback ${name}$ substituted recursively")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

use std::fmt;

/// Errors that occur when constructing descriptor tree values.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DescriptorError {
    /// A number range whose start is not below its end.
    EmptyRange { start: i32, end: i32 },
    /// A `syntax` statement named something other than proto2/proto3.
    UnknownSyntax(String),
    /// A field number outside `1..=MAX_FIELD_NUMBER`.
    FieldNumberOutOfRange(i64),
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRange { start, end } => {
                write!(f, "invalid range {start}..{end}: start must be below end")
            }
            Self::UnknownSyntax(s) => {
                write!(
                    f,
                    "unrecognized syntax identifier \"{s}\": expected \"proto2\" or \"proto3\""
                )
            }
            Self::FieldNumberOutOfRange(n) => {
                write!(f, "field number {n} is out of range")
            }
        }
    }
}

impl std::error::Error for DescriptorError {}

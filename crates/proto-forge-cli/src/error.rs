use std::path::PathBuf;

use proto_forge_dsl::Diagnostic;

/// Exit codes for the CLI process.
///
/// Each variant maps to a numeric exit code following standard conventions:
/// - 0: success
/// - 1: general error
/// - 2: invalid arguments / usage error
/// - 3: parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidArguments = 2,
    ParseError = 3,
}

/// Errors returned by CLI command handlers.
///
/// Each variant maps to an `ExitCode` and can produce structured
/// output in JSON mode.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A single file failed to tokenize or parse.
    #[error("parse errors in {file}")]
    Parse {
        file: PathBuf,
        diagnostics: Vec<Diagnostic>,
    },

    /// Some of several parsed files had errors; each was already reported.
    #[error("{failed} of {total} files failed to parse")]
    ParseFailures { failed: usize, total: usize },

    /// IO errors (file not found, permission denied).
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Schema file or directory not found.
    #[error("no schema files found in {path}")]
    NoSchemaFiles { path: PathBuf },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// Maps this error to the appropriate exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Parse { .. } | Self::ParseFailures { .. } => ExitCode::ParseError,
            Self::Config { .. } | Self::NoSchemaFiles { .. } => ExitCode::InvalidArguments,
            Self::Io { .. } | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Serializes this error as a JSON value for `--format json` output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Parse { file, diagnostics } => serde_json::json!({
                "error": "parse_error",
                "file": file.display().to_string(),
                "errors": diagnostics.iter().map(diagnostic_json).collect::<Vec<_>>(),
            }),
            Self::ParseFailures { failed, total } => serde_json::json!({
                "error": "parse_error",
                "failed": failed,
                "total": total,
            }),
            Self::Io { path, source } => serde_json::json!({
                "error": "io_error",
                "path": path.display().to_string(),
                "message": source.to_string(),
            }),
            Self::Config { message } => serde_json::json!({
                "error": "config_error",
                "message": message,
            }),
            other => serde_json::json!({
                "error": "error",
                "message": other.to_string(),
            }),
        }
    }
}

/// One diagnostic as JSON, with 1-based line and column.
pub fn diagnostic_json(diagnostic: &Diagnostic) -> serde_json::Value {
    serde_json::json!({
        "severity": diagnostic.severity,
        "line": diagnostic.location.line + 1,
        "column": diagnostic.location.column + 1,
        "message": diagnostic.message,
    })
}

pub mod parse;
pub mod print;
pub mod tokens;

use std::path::{Path, PathBuf};

use proto_forge_core::types::FileSchema;
use proto_forge_core::SourceLocationTable;
use proto_forge_dsl::{parse_with_options, Diagnostic, Diagnostics, ParseFailed, ParserOptions};

use crate::error::CliError;

/// Read a schema file into memory.
pub fn read_source(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Everything one parse of one file produced.
pub struct ParsedFile {
    pub path: PathBuf,
    pub source: String,
    pub result: Result<FileSchema, ParseFailed>,
    pub locations: SourceLocationTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedFile {
    pub fn filename(&self) -> String {
        self.path.display().to_string()
    }

    /// The tree, whether or not the parse succeeded.
    pub fn tree(&self) -> &FileSchema {
        match &self.result {
            Ok(file) => file,
            Err(failed) => &failed.partial,
        }
    }

    pub fn error_count(&self) -> usize {
        match &self.result {
            Ok(_) => 0,
            Err(failed) => failed.error_count,
        }
    }
}

/// Read and parse one file, collecting its diagnostics.
pub fn parse_file(path: &Path, options: ParserOptions) -> Result<ParsedFile, CliError> {
    let source = read_source(path)?;
    let mut diagnostics = Diagnostics::new();
    let mut locations = SourceLocationTable::new();

    let span = tracing::debug_span!("parse_file", path = %path.display());
    let _guard = span.enter();
    let result = parse_with_options(&source, &mut diagnostics, &mut locations, options);
    tracing::debug!(
        diagnostics = diagnostics.len(),
        locations = locations.len(),
        ok = result.is_ok(),
        "parsed"
    );

    Ok(ParsedFile {
        path: path.to_path_buf(),
        source,
        result,
        locations,
        diagnostics: diagnostics.into_vec(),
    })
}

/// Discover schema files from a list of paths.
///
/// Paths can be files (used directly) or directories (searched recursively
/// for files matching `**/*.<extension>`).
pub fn discover_schema_files(paths: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>, CliError> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let pattern = format!("{}/**/*.{extension}", path.display());
            let entries = glob::glob(&pattern).map_err(|e| CliError::Other(e.to_string()))?;
            for entry in entries {
                let entry = entry.map_err(|e| CliError::Other(e.to_string()))?;
                files.push(entry);
            }
        } else {
            return Err(CliError::NoSchemaFiles { path: path.clone() });
        }
    }

    if files.is_empty() {
        let display_path = paths
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("protos/"));
        return Err(CliError::NoSchemaFiles { path: display_path });
    }

    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_schema_files_nonexistent_path() {
        let result = discover_schema_files(&[PathBuf::from("/nonexistent/path")], "proto");
        assert!(matches!(result, Err(CliError::NoSchemaFiles { .. })));
    }

    #[test]
    fn discover_schema_files_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_schema_files(&[dir.path().to_path_buf()], "proto");
        assert!(result.is_err());
    }

    #[test]
    fn discover_schema_files_finds_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("v1")).unwrap();
        let top = dir.path().join("a.proto");
        let nested = dir.path().join("v1/b.proto");
        std::fs::write(&top, "syntax = \"proto3\";").unwrap();
        std::fs::write(&nested, "syntax = \"proto3\";").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = discover_schema_files(&[dir.path().to_path_buf()], "proto").unwrap();
        assert_eq!(files, vec![top, nested]);
    }

    #[test]
    fn discover_schema_files_honours_extension() {
        let dir = tempfile::tempdir().unwrap();
        let idl = dir.path().join("a.idl");
        std::fs::write(&idl, "syntax = \"proto3\";").unwrap();
        std::fs::write(dir.path().join("b.proto"), "syntax = \"proto3\";").unwrap();

        let files = discover_schema_files(&[dir.path().to_path_buf()], "idl").unwrap();
        assert_eq!(files, vec![idl]);
    }

    #[test]
    fn discover_schema_files_accepts_direct_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("direct.txt");
        std::fs::write(&path, "syntax = \"proto3\";").unwrap();
        let files = discover_schema_files(std::slice::from_ref(&path), "proto").unwrap();
        assert_eq!(files[0], path);
    }

    #[test]
    fn discover_schema_files_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.proto");
        std::fs::write(&path, "syntax = \"proto3\";").unwrap();
        let files = discover_schema_files(&[path.clone(), path.clone()], "proto").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn parse_file_keeps_partial_tree_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.proto");
        std::fs::write(
            &path,
            "syntax = \"proto3\";\nmessage A { int32 = 1; }\nmessage B {}\n",
        )
        .unwrap();

        let parsed = parse_file(&path, ParserOptions::default()).unwrap();
        assert!(parsed.result.is_err());
        assert_eq!(parsed.error_count(), 1);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.tree().find_message("B").is_some());
    }

    #[test]
    fn parse_file_missing_is_io_error() {
        let result = parse_file(Path::new("/nonexistent/a.proto"), ParserOptions::default());
        assert!(matches!(result, Err(CliError::Io { .. })));
    }
}

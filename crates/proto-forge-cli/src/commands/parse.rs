use std::path::PathBuf;

use proto_forge_dsl::{print_with_options, Severity};

use crate::cli::ParseArgs;
use crate::commands::{discover_schema_files, parse_file, ParsedFile};
use crate::config::{resolve_parser_options, resolve_printer_options, CliConfig};
use crate::error::{diagnostic_json, CliError};
use crate::output::{OutputContext, OutputMode};

/// Run the `parse` command: parse schema files and render diagnostics.
pub fn run(args: ParseArgs, config: &CliConfig, output: &OutputContext) -> Result<(), CliError> {
    let paths = if args.paths.is_empty() {
        vec![PathBuf::from(&config.parse.default_dir)]
    } else {
        args.paths
    };
    let options = resolve_parser_options(config, args.escapes.as_deref(), args.allow_missing_syntax)?;
    let files = discover_schema_files(&paths, &config.parse.extension)?;
    tracing::info!(files = files.len(), "parsing schema files");

    let dump = args.json || output.mode == OutputMode::Json;
    let mut results: Vec<serde_json::Value> = Vec::new();
    let mut total_errors = 0usize;
    let mut total_warnings = 0usize;
    let mut failed = 0usize;

    for path in &files {
        let parsed = parse_file(path, options)?;
        let filename = parsed.filename();
        let errors = parsed.error_count();
        let warnings = parsed
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        total_errors += errors;
        total_warnings += warnings;
        if errors > 0 {
            failed += 1;
        }

        output.print_diagnostics(&parsed.diagnostics, &parsed.source, &filename);

        if dump {
            results.push(file_json(&parsed, args.json));
        } else if args.print {
            if parsed.result.is_ok() {
                let printer = resolve_printer_options(config, None);
                print!("{}", print_with_options(parsed.tree(), printer));
            }
        } else if errors == 0 {
            let tree = parsed.tree();
            output.status(&format!(
                "  {filename} .... {} messages, {} enums, {} services",
                tree.message_types.len(),
                tree.enum_types.len(),
                tree.services.len()
            ));
        }
    }

    // Summary
    if dump {
        let summary = serde_json::json!({
            "files": files.len(),
            "errors": total_errors,
            "warnings": total_warnings,
            "results": results,
        });
        output.print_json(&summary);
    } else if output.mode == OutputMode::Plain {
        if !args.print {
            println!("{}\t{total_errors}\t{total_warnings}", files.len());
        }
    } else {
        let line = format!(
            "{} files parsed, {total_errors} errors, {total_warnings} warnings",
            files.len()
        );
        if failed > 0 {
            output.warn(&line);
        } else {
            output.success(&line);
        }
    }

    if failed > 0 {
        Err(CliError::ParseFailures {
            failed,
            total: files.len(),
        })
    } else {
        Ok(())
    }
}

/// One file's entry in the JSON output. With `with_tree`, the descriptor
/// tree (partial if the parse failed) and its location table are included.
fn file_json(parsed: &ParsedFile, with_tree: bool) -> serde_json::Value {
    let mut entry = serde_json::json!({
        "file": parsed.filename(),
        "ok": parsed.result.is_ok(),
        "diagnostics": parsed.diagnostics.iter().map(diagnostic_json).collect::<Vec<_>>(),
    });
    if with_tree {
        entry["descriptor"] = serde_json::to_value(parsed.tree()).unwrap_or_default();
        entry["source_locations"] = serde_json::to_value(&parsed.locations).unwrap_or_default();
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto_forge_dsl::ParserOptions;

    fn parsed(source: &str) -> ParsedFile {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.proto");
        std::fs::write(&path, source).unwrap();
        parse_file(&path, ParserOptions::default()).unwrap()
    }

    #[test]
    fn file_json_without_tree() {
        let json = file_json(&parsed("syntax = \"proto3\";\nmessage A {}\n"), false);
        assert_eq!(json["ok"], true);
        assert!(json["diagnostics"].as_array().unwrap().is_empty());
        assert!(json.get("descriptor").is_none());
    }

    #[test]
    fn file_json_with_tree_and_locations() {
        let json = file_json(
            &parsed("syntax = \"proto3\";\npackage shop;\nmessage Order { int64 id = 1; }\n"),
            true,
        );
        assert_eq!(json["descriptor"]["package"], "shop");
        assert!(!json["source_locations"]["locations"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn file_json_reports_failure_and_warning() {
        let json = file_json(&parsed("message A { int32 = 1; }\n"), false);
        assert_eq!(json["ok"], false);
        let severities: Vec<_> = json["diagnostics"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["severity"].as_str().unwrap().to_string())
            .collect();
        assert!(severities.contains(&"warning".to_string()));
        assert!(severities.contains(&"error".to_string()));
    }
}

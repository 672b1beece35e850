use std::path::{Path, PathBuf};

use proto_forge_dsl::{EscapeDecoding, LexerOptions, ParserOptions};
use proto_forge_printer::PrinterOptions;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// CLI configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub parse: ParseConfig,
    #[serde(default)]
    pub print: PrintConfig,
}

/// Settings for reading and parsing schema files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// File extension searched for in directories, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_dir")]
    pub default_dir: String,
    #[serde(default)]
    pub escapes: EscapeDecoding,
    #[serde(default = "default_require_syntax")]
    pub require_syntax: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            default_dir: default_dir(),
            escapes: EscapeDecoding::default(),
            require_syntax: default_require_syntax(),
        }
    }
}

/// Settings for printing descriptor trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintConfig {
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
        }
    }
}

fn default_extension() -> String {
    "proto".to_string()
}

fn default_dir() -> String {
    "protos/".to_string()
}

fn default_require_syntax() -> bool {
    true
}

fn default_indent() -> usize {
    2
}

/// Discovery order for config file:
/// 1. `--config <path>` (explicit, also fed by `PROTO_FORGE_CONFIG`)
/// 2. `PROTO_FORGE_CONFIG` env var
/// 3. `./proto-forge.toml` (project-local)
/// 4. `$XDG_CONFIG_HOME/proto-forge/config.toml`
/// 5. `~/.config/proto-forge/config.toml`
pub fn load_config(explicit_path: Option<&Path>) -> Result<CliConfig, CliError> {
    if let Some(path) = explicit_path {
        return load_config_from_path(path);
    }

    if let Ok(env_path) = std::env::var("PROTO_FORGE_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    let local = PathBuf::from("proto-forge.toml");
    if local.exists() {
        return load_config_from_path(&local);
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg).join("proto-forge/config.toml");
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join(".config/proto-forge/config.toml");
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    tracing::debug!("no config file found, using defaults");
    Ok(CliConfig::default())
}

fn load_config_from_path(path: &Path) -> Result<CliConfig, CliError> {
    tracing::debug!(path = %path.display(), "loading config");
    let contents = std::fs::read_to_string(path).map_err(|e| CliError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| CliError::Config {
        message: format!("failed to parse {}: {}", path.display(), e),
    })
}

/// Maps an `--escapes` flag value onto the lexer setting.
fn escape_decoding(flag: &str) -> Result<EscapeDecoding, CliError> {
    match flag {
        "passthrough" => Ok(EscapeDecoding::Passthrough),
        "full" => Ok(EscapeDecoding::Full),
        other => Err(CliError::Config {
            message: format!("unknown escape decoding '{other}' (expected passthrough or full)"),
        }),
    }
}

/// Resolve lexer settings from config + CLI overrides.
pub fn resolve_lexer_options(
    config: &CliConfig,
    escapes: Option<&str>,
) -> Result<LexerOptions, CliError> {
    let escapes = match escapes {
        Some(flag) => escape_decoding(flag)?,
        None => config.parse.escapes,
    };
    Ok(LexerOptions { escapes })
}

/// Resolve parser settings from config + CLI overrides.
///
/// CLI flags take precedence over config file values.
pub fn resolve_parser_options(
    config: &CliConfig,
    escapes: Option<&str>,
    allow_missing_syntax: bool,
) -> Result<ParserOptions, CliError> {
    Ok(ParserOptions {
        lexer: resolve_lexer_options(config, escapes)?,
        require_syntax: config.parse.require_syntax && !allow_missing_syntax,
    })
}

/// Resolve printer settings from config + CLI overrides.
pub fn resolve_printer_options(config: &CliConfig, indent: Option<usize>) -> PrinterOptions {
    PrinterOptions {
        spaces_per_indent: indent.unwrap_or(config.print.indent),
        ..PrinterOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = CliConfig::default();
        assert_eq!(config.parse.extension, "proto");
        assert_eq!(config.parse.default_dir, "protos/");
        assert_eq!(config.parse.escapes, EscapeDecoding::Passthrough);
        assert!(config.parse.require_syntax);
        assert_eq!(config.print.indent, 2);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
[parse]
extension = "idl"
"#;
        let config: CliConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.parse.extension, "idl");
        // Defaults for missing fields
        assert_eq!(config.parse.default_dir, "protos/");
        assert!(config.parse.require_syntax);
        assert_eq!(config.print.indent, 2);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[parse]
extension = "proto"
default_dir = "api/"
escapes = "full"
require_syntax = false

[print]
indent = 4
"#;
        let config: CliConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.parse.default_dir, "api/");
        assert_eq!(config.parse.escapes, EscapeDecoding::Full);
        assert!(!config.parse.require_syntax);
        assert_eq!(config.print.indent, 4);
    }

    #[test]
    fn parse_rejects_unknown_escape_mode() {
        let toml_str = r#"
[parse]
escapes = "octal"
"#;
        assert!(toml::from_str::<CliConfig>(toml_str).is_err());
    }

    #[test]
    fn resolve_parser_options_uses_config_defaults() {
        let config = CliConfig::default();
        let options = resolve_parser_options(&config, None, false).unwrap();
        assert_eq!(options.lexer.escapes, EscapeDecoding::Passthrough);
        assert!(options.require_syntax);
    }

    #[test]
    fn resolve_parser_options_cli_overrides() {
        let config = CliConfig::default();
        let options = resolve_parser_options(&config, Some("full"), true).unwrap();
        assert_eq!(options.lexer.escapes, EscapeDecoding::Full);
        assert!(!options.require_syntax);
    }

    #[test]
    fn resolve_lexer_options_rejects_unknown_flag() {
        let config = CliConfig::default();
        assert!(resolve_lexer_options(&config, Some("weird")).is_err());
    }

    #[test]
    fn resolve_printer_options_prefers_flag() {
        let mut config = CliConfig::default();
        config.print.indent = 8;
        assert_eq!(resolve_printer_options(&config, None).spaces_per_indent, 8);
        assert_eq!(resolve_printer_options(&config, Some(3)).spaces_per_indent, 3);
        assert_eq!(resolve_printer_options(&config, None).delimiter, '$');
    }

    #[test]
    fn load_config_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proto-forge.toml");
        std::fs::write(&path, "[print]\nindent = 3\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.print.indent, 3);
    }

    #[test]
    fn load_config_from_explicit_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/proto-forge.toml")));
        assert!(matches!(result, Err(CliError::Io { .. })));
    }

    #[test]
    fn load_config_reports_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[print\nindent = ").unwrap();
        let result = load_config(Some(&path));
        assert!(matches!(result, Err(CliError::Config { .. })));
    }
}

use proto_forge_dsl::{tokenize, Token, TokenKind};

use crate::cli::TokensArgs;
use crate::commands::read_source;
use crate::config::{resolve_lexer_options, CliConfig};
use crate::error::CliError;
use crate::output::{OutputContext, OutputMode};

/// Run the `tokens` command: dump the token stream of one file.
pub fn run(args: TokensArgs, config: &CliConfig, output: &OutputContext) -> Result<(), CliError> {
    let source = read_source(&args.file)?;
    let options = resolve_lexer_options(config, args.escapes.as_deref())?;
    let filename = args.file.display().to_string();

    let tokens = match tokenize(&source, options) {
        Ok(tokens) => tokens,
        Err(diagnostics) => {
            output.print_diagnostics(&diagnostics, &source, &filename);
            return Err(CliError::Parse {
                file: args.file,
                diagnostics,
            });
        }
    };
    tracing::debug!(count = tokens.len(), "tokenized {filename}");

    match output.mode {
        OutputMode::Json => {
            let value = serde_json::to_value(&tokens).map_err(|e| CliError::Other(e.to_string()))?;
            output.print_json(&value);
        }
        OutputMode::Plain => {
            for token in &tokens {
                println!(
                    "{}\t{}\t{}\t{:?}\t{}",
                    token.line + 1,
                    token.column + 1,
                    token.end_column + 1,
                    token.kind,
                    token.text
                );
            }
        }
        OutputMode::Human => {
            for token in &tokens {
                print!("{}", human_line(token));
            }
        }
    }
    Ok(())
}

/// A token and its attached comments, one item per line.
fn human_line(token: &Token) -> String {
    let mut out = String::new();
    for detached in &token.detached_comments {
        out.push_str(&format!("    detached {detached:?}\n"));
    }
    if let Some(leading) = &token.leading_comment {
        out.push_str(&format!("    leading  {leading:?}\n"));
    }
    let text = match token.kind {
        TokenKind::End => String::new(),
        _ => format!(" {}", token.text),
    };
    out.push_str(&format!(
        "{:>4}:{:<4} {:<10}{text}\n",
        token.line + 1,
        token.column + 1,
        token.kind.description()
    ));
    if let Some(trailing) = &token.trailing_comment {
        out.push_str(&format!("    trailing {trailing:?}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto_forge_dsl::LexerOptions;

    #[test]
    fn human_line_shows_position_kind_and_text() {
        let tokens = tokenize("message Foo", LexerOptions::default()).unwrap();
        let line = human_line(&tokens[1]);
        assert!(line.starts_with("   1:9"));
        assert!(line.contains("identifier"));
        assert!(line.trim_end().ends_with("Foo"));
    }

    #[test]
    fn human_line_includes_comments() {
        let tokens = tokenize("// lead\nfoo; // trail\n", LexerOptions::default()).unwrap();
        let line = human_line(&tokens[0]);
        assert!(line.contains("leading  \"lead\\n\""));
        let semi = human_line(&tokens[1]);
        assert!(semi.contains("trailing \"trail\\n\""));
    }

    #[test]
    fn end_token_has_no_text() {
        let tokens = tokenize("", LexerOptions::default()).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(human_line(&tokens[0]).trim_end().ends_with("end of input"));
    }
}

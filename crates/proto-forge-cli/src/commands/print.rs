use proto_forge_dsl::print_with_options;

use crate::cli::PrintArgs;
use crate::commands::parse_file;
use crate::config::{resolve_parser_options, resolve_printer_options, CliConfig};
use crate::error::CliError;
use crate::output::OutputContext;

/// Run the `print` command: parse one file and print it back as IDL.
/// Files with parse errors are reported and not printed.
pub fn run(args: PrintArgs, config: &CliConfig, output: &OutputContext) -> Result<(), CliError> {
    let options = resolve_parser_options(config, None, false)?;
    let parsed = parse_file(&args.file, options)?;
    let filename = parsed.filename();
    output.print_diagnostics(&parsed.diagnostics, &parsed.source, &filename);

    let file = match parsed.result {
        Ok(file) => file,
        Err(_) => {
            return Err(CliError::Parse {
                file: args.file,
                diagnostics: parsed.diagnostics,
            });
        }
    };

    let text = print_with_options(&file, resolve_printer_options(config, args.indent));
    match args.output {
        Some(path) => {
            std::fs::write(&path, &text).map_err(|e| CliError::Io {
                path: path.clone(),
                source: e,
            })?;
            output.success(&format!("wrote {}", path.display()));
        }
        None => print!("{text}"),
    }
    Ok(())
}

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Front end for protobuf-style interface definitions.
///
/// proto-forge tokenizes and parses `.proto` files into a descriptor tree
/// with source locations and comments, reports errors against the source
/// text, and prints trees back out as canonical IDL.
#[derive(Parser)]
#[command(
    name = "proto-forge",
    version,
    about = "Parser and printer for protobuf-style interface definitions",
    after_help = "Use 'proto-forge <command> --help' for more information about a command.",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Global options available to all subcommands.
#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Configuration file path [env: PROTO_FORGE_CONFIG]
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        env = "PROTO_FORGE_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// Output format: human (default), json, plain
    #[arg(
        long,
        global = true,
        default_value = "human",
        value_parser = ["human", "json", "plain"]
    )]
    pub format: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all non-error output
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output [env: NO_COLOR]
    #[arg(long = "no-color", global = true, env = "NO_COLOR")]
    pub no_color: bool,
}

/// Top-level subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Parse and validate .proto files
    Parse(ParseArgs),

    /// Dump the token stream of a file with positions and comments
    Tokens(TokensArgs),

    /// Parse a file and print it back as canonical IDL
    Print(PrintArgs),
}

// ---------------------------------------------------------------------------
// Individual command argument structs
// ---------------------------------------------------------------------------

/// Arguments for `proto-forge parse`.
#[derive(Args)]
pub struct ParseArgs {
    /// Files or directories to parse (default: [parse] default_dir)
    pub paths: Vec<PathBuf>,

    /// Dump the descriptor tree and location table as JSON
    #[arg(long = "json", conflicts_with = "print")]
    pub json: bool,

    /// Print each parsed file back as IDL
    #[arg(long = "print")]
    pub print: bool,

    /// String escape decoding: passthrough, full
    #[arg(long = "escapes", value_parser = ["passthrough", "full"])]
    pub escapes: Option<String>,

    /// Do not warn about files without a syntax statement
    #[arg(long = "allow-missing-syntax")]
    pub allow_missing_syntax: bool,
}

/// Arguments for `proto-forge tokens`.
#[derive(Args)]
pub struct TokensArgs {
    /// File to tokenize
    pub file: PathBuf,

    /// String escape decoding: passthrough, full
    #[arg(long = "escapes", value_parser = ["passthrough", "full"])]
    pub escapes: Option<String>,
}

/// Arguments for `proto-forge print`.
#[derive(Args)]
pub struct PrintArgs {
    /// File to parse and print
    pub file: PathBuf,

    /// Spaces per indentation level (default: [print] indent)
    #[arg(long = "indent")]
    pub indent: Option<usize>,

    /// Write the output to a file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_minimal_args() {
        let cli = Cli::try_parse_from(["proto-forge", "tokens", "a.proto"]).unwrap();
        assert!(matches!(cli.command, Commands::Tokens(_)));
    }

    #[test]
    fn parse_global_verbose() {
        let cli = Cli::try_parse_from(["proto-forge", "-vvv", "tokens", "a.proto"]).unwrap();
        assert_eq!(cli.global.verbose, 3);
    }

    #[test]
    fn parse_global_quiet() {
        let cli = Cli::try_parse_from(["proto-forge", "-q", "tokens", "a.proto"]).unwrap();
        assert!(cli.global.quiet);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["proto-forge", "-q", "-v", "tokens", "a.proto"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_global_format_json() {
        let cli =
            Cli::try_parse_from(["proto-forge", "--format", "json", "tokens", "a.proto"]).unwrap();
        assert_eq!(cli.global.format, "json");
    }

    #[test]
    fn rejects_unknown_format() {
        let result = Cli::try_parse_from(["proto-forge", "--format", "xml", "tokens", "a.proto"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_command_defaults_to_no_paths() {
        let cli = Cli::try_parse_from(["proto-forge", "parse"]).unwrap();
        if let Commands::Parse(args) = cli.command {
            assert!(args.paths.is_empty());
            assert!(!args.json);
            assert!(!args.print);
            assert_eq!(args.escapes, None);
        } else {
            panic!("expected Parse command");
        }
    }

    #[test]
    fn parse_command_with_print_and_escapes() {
        let cli = Cli::try_parse_from([
            "proto-forge",
            "parse",
            "--print",
            "--escapes",
            "full",
            "protos/",
        ])
        .unwrap();
        if let Commands::Parse(args) = cli.command {
            assert!(args.print);
            assert_eq!(args.escapes.as_deref(), Some("full"));
            assert_eq!(args.paths, vec![PathBuf::from("protos/")]);
        } else {
            panic!("expected Parse command");
        }
    }

    #[test]
    fn parse_json_conflicts_with_print() {
        let result = Cli::try_parse_from(["proto-forge", "parse", "--json", "--print", "a.proto"]);
        assert!(result.is_err());
    }

    #[test]
    fn print_command_with_indent() {
        let cli =
            Cli::try_parse_from(["proto-forge", "print", "--indent", "4", "a.proto"]).unwrap();
        if let Commands::Print(args) = cli.command {
            assert_eq!(args.indent, Some(4));
            assert_eq!(args.file, PathBuf::from("a.proto"));
            assert!(args.output.is_none());
        } else {
            panic!("expected Print command");
        }
    }

    #[test]
    fn print_requires_file() {
        assert!(Cli::try_parse_from(["proto-forge", "print"]).is_err());
    }
}

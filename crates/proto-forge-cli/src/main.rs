mod cli;
mod commands;
mod config;
mod diagnostic;
mod error;
mod logging;
mod output;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    let output = output::OutputContext::from_global(&cli.global);
    logging::init(&output);

    let result = config::load_config(cli.global.config.as_deref()).and_then(|config| {
        match cli.command {
            cli::Commands::Parse(args) => commands::parse::run(args, &config, &output),
            cli::Commands::Tokens(args) => commands::tokens::run(args, &config, &output),
            cli::Commands::Print(args) => commands::print::run(args, &config, &output),
        }
    });

    match result {
        Ok(()) => std::process::exit(error::ExitCode::Success as i32),
        Err(e) => {
            output.print_error(&e);
            std::process::exit(e.exit_code() as i32);
        }
    }
}

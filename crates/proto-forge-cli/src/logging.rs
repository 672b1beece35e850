use tracing_subscriber::EnvFilter;

use crate::output::OutputContext;

/// Environment variable that overrides the level chosen by `-v` / `-q`.
pub const LOG_ENV: &str = "PROTO_FORGE_LOG";

/// Level directive for the given verbosity flags.
fn default_directive(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the stderr `tracing` subscriber.
///
/// `PROTO_FORGE_LOG` takes an `EnvFilter` directive and wins over the flags.
pub fn init(output: &OutputContext) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(output.quiet, output.verbose)));

    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(output.use_color)
        .with_target(false)
        .try_init();
}

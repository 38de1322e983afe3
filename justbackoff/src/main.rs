use clap::Parser;
use justbackoff::cli::{self, Cli, ColorChoice};
use justbackoff::output;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging(cli: &Cli) {
    let level = match (cli.debug, cli.verbose) {
        (true, _) => "debug",
        (false, true) => "info",
        _ => "warn",
    };
    let ansi = match cli.color {
        Some(ColorChoice::Always) => true,
        Some(ColorChoice::Never) => false,
        _ => std::env::var_os("NO_COLOR").is_none(),
    };
    let _ = fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // the YAML map is the only error report on stderr
            if output::emit_error(&err).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

use anyhow::Result;
use clap::{CommandFactory, Parser};
use statsdiff::{cli::Cli, commands};
use tracing_subscriber::EnvFilter;

/// Initialize tracing: `RUST_LOG` wins, else info (debug with --verbose)
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    if cli.stats_dirs.is_empty() {
        Cli::command().print_help()?;
        return Ok(1);
    }
    commands::run(cli)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

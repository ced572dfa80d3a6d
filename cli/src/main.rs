use std::io;
use std::process;

use clap::Parser;
use kurai_cli::{Cli, Outcome};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout().lock();
    match kurai_cli::run(&cli, &mut stdout) {
        Ok(Outcome::Success) => {}
        Ok(Outcome::Failure) => process::exit(1),
        Err(err) => {
            tracing::debug!(?err, "command failed");
            eprintln!("Error: {err}");
            process::exit(1);
        }
    }
}

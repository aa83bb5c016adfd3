use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use fundnav::cli::Cli;
use fundnav::dispatcher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output on stdout stays parseable
    let filter = EnvFilter::try_from_env("FUNDNAV_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if cli.no_color || cli.json || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    dispatcher::dispatch(cli)
}

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod cli;
mod config;
mod destination;
mod error;
mod identity;
mod pipeline;
mod plan;
mod playlist;
mod report;
mod runtime;

use cli::Cli;
use report::Verbosity;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbosity());
    runtime::run(cli)
}

/// Logs go to stderr so they never mix with the report on stdout.
/// `RUST_LOG` wins over the verbosity flags.
fn init_tracing(verbosity: Verbosity) {
    let default = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

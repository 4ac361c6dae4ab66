//! codepack CLI entry point

use clap::Parser;
use codepack::cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("CODEPACK_LOG"))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Snapshot(args) => codepack::cli::snapshot::run(args),
        Commands::Info(args) => codepack::cli::info::run(args),
        Commands::Cycles(args) => codepack::cli::cycles::run(args),
    };

    if let Err(error) = result {
        eprintln!("{}", error.report());
        std::process::exit(error.exit_code());
    }
}

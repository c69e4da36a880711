// src/main.rs

use clap::Parser;
use crossforge::cli::{Cli, Commands};
use crossforge::commands;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build(args) => commands::build(args),
        Commands::Validate(args) => commands::validate_existing(args),
        Commands::Workflow(args) => commands::generate_workflow(args),
    };

    // The single outermost catch: one clear error line, non-zero exit.
    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

//! gridctl (grid) - CLI for the spotgrid control plane.
//!
//! Compiles declarative stack manifests into rendered resource graphs
//! and hands them to a provisioner.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod error;
mod manifest;
mod output;

use commands::Cli;

fn main() -> Result<()> {
    // Diagnostics go to stderr so piped JSON output stays clean.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli.run() {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}

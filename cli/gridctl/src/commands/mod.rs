//! CLI commands.

mod apply;
mod synth;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// spotgrid CLI - compile and inspect batch compute stacks.
#[derive(Debug, Parser)]
#[command(name = "grid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a stack manifest (offline).
    Validate(validate::ValidateCommand),

    /// Compile a manifest and print the rendered resource graph.
    Synth(synth::SynthCommand),

    /// Compile a manifest and hand the graph to a provisioner.
    Apply(apply::ApplyCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub fn run(self) -> Result<()> {
        let format = match self.format.as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        };

        let ctx = CommandContext { format };

        match self.command {
            Commands::Validate(cmd) => cmd.run(ctx),
            Commands::Synth(cmd) => cmd.run(ctx),
            Commands::Apply(cmd) => cmd.run(ctx),
            Commands::Version => {
                println!("grid {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub format: OutputFormat,
}

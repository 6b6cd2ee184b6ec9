//! Error handling and display for the CLI.

use colored::Colorize;
use spotgrid_graph::GraphError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Manifest error in {path}: {message}")]
    Manifest { path: String, message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    // Provide hints for the common failure classes.
    if err.downcast_ref::<CliError>().is_some() {
        eprintln!(
            "\n{}",
            "Hint: Fix the manifest and re-run `grid validate`.".yellow()
        );
    } else if let Some(graph_err) = err.downcast_ref::<GraphError>() {
        match graph_err {
            GraphError::MissingReference { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Every referenced resource must be declared in the same manifest."
                        .yellow()
                );
            }
            GraphError::QueuePerimeterMismatch { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: All tiers of one queue must share a network perimeter.".yellow()
                );
            }
            GraphError::NoIdentityForSecrets { .. } | GraphError::MissingGrant { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Templates binding secrets need an identity granted read access."
                        .yellow()
                );
            }
            _ => {}
        }
    }
}

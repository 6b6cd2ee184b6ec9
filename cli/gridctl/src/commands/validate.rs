//! Validate a stack manifest offline.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::manifest;
use crate::output::{print_info, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Validate a stack manifest (offline).
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Manifest file path (TOML). Defaults to ./grid.toml.
    #[arg(value_name = "PATH")]
    manifest: Option<PathBuf>,
}

impl ValidateCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let path = self.manifest.unwrap_or_else(|| PathBuf::from("grid.toml"));
        let parsed = manifest::load(&path)?;

        // Compiling catches what parsing cannot: dangling references,
        // perimeter mismatches, missing grants.
        let graph = manifest::build_graph(&parsed)?;
        let rendered = graph.compile()?;

        let contents = std::fs::read_to_string(&path)?;
        let manifest_hash = manifest::manifest_hash(&contents)?;

        match ctx.format {
            OutputFormat::Json => {
                let out = serde_json::json!({
                    "valid": true,
                    "manifest_hash": manifest_hash,
                    "graph_hash": rendered.hash().as_str(),
                    "resource_count": rendered.resources().len(),
                });
                print_single(&out, OutputFormat::Json);
            }
            OutputFormat::Table => {
                print_success(&format!("Manifest is valid: {}", path.display()));
                print_info(&format!("manifest_hash: {}", manifest_hash));
                print_info(&format!("graph_hash: {}", rendered.hash()));
                print_info(&format!("resources: {}", rendered.resources().len()));
            }
        }

        Ok(())
    }
}

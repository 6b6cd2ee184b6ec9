//! Compile a manifest and hand the graph to a provisioner.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use spotgrid_graph::{DryRunProvisioner, Provisioner};

use crate::manifest;
use crate::output::{print_info, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Compile a manifest and hand the graph to a provisioner.
#[derive(Debug, Args)]
pub struct ApplyCommand {
    /// Manifest file path (TOML). Defaults to ./grid.toml.
    #[arg(value_name = "PATH")]
    manifest: Option<PathBuf>,

    /// Log what would be reconciled without touching infrastructure.
    #[arg(long)]
    dry_run: bool,
}

impl ApplyCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        if !self.dry_run {
            anyhow::bail!(
                "no live provisioner is configured in this build; re-run with --dry-run"
            );
        }

        let path = self.manifest.unwrap_or_else(|| PathBuf::from("grid.toml"));
        let parsed = manifest::load(&path)?;
        let rendered = manifest::build_graph(&parsed)?.compile()?;

        let mut provisioner = DryRunProvisioner;
        let report = provisioner.apply(&rendered)?;

        match ctx.format {
            OutputFormat::Json => {
                let out = serde_json::json!({
                    "dry_run": true,
                    "applied": report.applied,
                    "graph_hash": report.graph_hash,
                });
                print_single(&out, OutputFormat::Json);
            }
            OutputFormat::Table => {
                print_success(&format!(
                    "Dry-run apply complete: {} resource(s)",
                    report.applied
                ));
                print_info(&format!("graph_hash: {}", report.graph_hash));
            }
        }

        Ok(())
    }
}

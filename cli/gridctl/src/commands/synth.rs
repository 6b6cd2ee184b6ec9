//! Compile a manifest and print the rendered resource graph.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::manifest;
use crate::output::{print_info, print_output, print_single, OutputFormat};

use super::CommandContext;

/// Compile a manifest and print the rendered resource graph.
#[derive(Debug, Args)]
pub struct SynthCommand {
    /// Manifest file path (TOML). Defaults to ./grid.toml.
    #[arg(value_name = "PATH")]
    manifest: Option<PathBuf>,
}

#[derive(Debug, Serialize, Tabled)]
struct ResourceRow {
    #[tabled(rename = "KIND")]
    kind: String,

    #[tabled(rename = "RESOURCE")]
    srn: String,
}

impl SynthCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let path = self.manifest.unwrap_or_else(|| PathBuf::from("grid.toml"));
        let parsed = manifest::load(&path)?;
        let rendered = manifest::build_graph(&parsed)?.compile()?;

        match ctx.format {
            OutputFormat::Json => {
                print_single(&rendered, OutputFormat::Json);
            }
            OutputFormat::Table => {
                let rows: Vec<ResourceRow> = rendered
                    .resources()
                    .values()
                    .map(|r| ResourceRow {
                        kind: r.kind.to_string(),
                        srn: r.srn.to_string(),
                    })
                    .collect();
                print_output(&rows, OutputFormat::Table);
                print_info(&format!("graph_hash: {}", rendered.hash()));
            }
        }

        Ok(())
    }
}

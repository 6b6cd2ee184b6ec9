//! The provisioner seam.
//!
//! The provisioner is an external collaborator that reconciles live
//! infrastructure to match a rendered graph. The control plane's
//! contract ends at handing over a graph with no dangling references
//! and no duplicate names; everything past that point is the
//! provisioner's problem and is reported back as a structured
//! diagnostic naming the offending resource.

use thiserror::Error;
use tracing::info;

use crate::render::RenderedGraph;

/// A structured failure from the provisioner, naming the resource it
/// could not reconcile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("provisioning failed for '{resource}': {message}")]
pub struct ProvisionDiagnostic {
    pub resource: String,
    pub message: String,
}

/// Outcome of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Number of resources reconciled.
    pub applied: usize,

    /// The content hash of the graph that was applied.
    pub graph_hash: String,
}

/// Reconciles a rendered graph to live infrastructure.
pub trait Provisioner {
    /// Apply the graph to the environment it was compiled for.
    fn apply(&mut self, graph: &RenderedGraph) -> Result<ApplyReport, ProvisionDiagnostic>;
}

/// A provisioner that only logs what it would reconcile.
///
/// Used by `grid apply --dry-run` and in tests.
#[derive(Debug, Default)]
pub struct DryRunProvisioner;

impl Provisioner for DryRunProvisioner {
    fn apply(&mut self, graph: &RenderedGraph) -> Result<ApplyReport, ProvisionDiagnostic> {
        for (srn, resource) in graph.resources() {
            info!(resource = %srn, kind = %resource.kind, "Would reconcile");
        }

        info!(
            environment = %graph.environment(),
            resource_count = graph.resources().len(),
            "Dry-run apply complete"
        );

        Ok(ApplyReport {
            applied: graph.resources().len(),
            graph_hash: graph.hash().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvironmentContext;
    use std::collections::BTreeMap;

    #[test]
    fn test_dry_run_reports_counts() {
        let env = EnvironmentContext::new("acct", "region").unwrap();
        let graph = RenderedGraph::new(env, BTreeMap::new());

        let mut provisioner = DryRunProvisioner;
        let report = provisioner.apply(&graph).unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.graph_hash, graph.hash().to_string());
    }
}

//! Resource graph compilation for spotgrid.
//!
//! The control plane is a one-shot compiler: declared components go in,
//! a validated, deterministic rendered graph comes out, and an external
//! provisioner reconciles live infrastructure to match. There are no
//! suspension points; construction and validation are synchronous and
//! total.
//!
//! Pipeline:
//!
//! 1. [`ResourceGraph`] collects components under caller-assigned names
//!    and rejects duplicates at insertion.
//! 2. [`ResourceGraph::compile`] checks referential integrity (no
//!    dangling tier, identity, or secret references), renders every
//!    component to JSON properties, and applies the post-render
//!    secret-injection transform.
//! 3. The resulting [`RenderedGraph`] is content-hashed and handed to a
//!    [`Provisioner`].
//!
//! A compiled graph is guaranteed deployable-or-rejected before any
//! live resource is touched; runtime failures belong to the substrate.

mod env;
mod error;
mod graph;
mod provisioner;
mod render;
mod transform;

pub use env::EnvironmentContext;
pub use error::{GraphError, OverrideError};
pub use graph::ResourceGraph;
pub use provisioner::{ApplyReport, DryRunProvisioner, Provisioner, ProvisionDiagnostic};
pub use render::{GraphHash, RenderedGraph, RenderedResource, ResourceKind};
pub use transform::SecretInjection;

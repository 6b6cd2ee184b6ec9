//! Domain model for the spotgrid batch compute platform.
//!
//! This crate holds the declarative building blocks the control plane
//! compiles into a resource graph:
//!
//! - [`ImageSource`]: a versioned container image reference
//! - [`CredentialVault`]: scoped secret storage (trait + in-memory impl)
//! - [`ExecutionIdentity`]: a minimal-permission principal for running jobs
//! - [`JobTemplate`]: the immutable description of one unit of work
//! - [`CapacityTier`]: a priced, bounded pool of compute capacity
//! - [`DispatchQueue`] and [`Dispatcher`]: ordered routing across tiers
//!
//! # Invariants
//!
//! - All validation happens at construction time; a built value is valid
//! - Built values are immutable; a change means a new value
//! - Every capacity tier scales to zero when idle (`min_vcpus` is always 0)

mod error;
mod identity;
mod image;
mod queue;
mod template;
mod tier;
mod vault;

pub use error::{DispatchError, ValidationError};
pub use identity::{ExecutionIdentity, Permission, Principal};
pub use image::{ImageReference, ImageSource};
pub use queue::{DispatchQueue, Dispatched, Dispatcher, Placement, TierEntry};
pub use template::{CommandArg, JobTemplate, JobTemplateBuilder, SecretBinding};
pub use tier::{
    CapacityTier, CapacityTierBuilder, InstanceFamilies, InstanceFamily, PriceStrategy,
    Reservation,
};
pub use vault::{CredentialVault, MemoryVault, SecretRef, SecretValue, VaultError};

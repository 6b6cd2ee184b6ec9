//! Error types for graph assembly and compilation.

use thiserror::Error;

/// Errors raised while assembling or compiling a resource graph.
///
/// All variants are synchronous, non-retryable, construction-time
/// failures; a graph that compiles is deployable as declared.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The environment target is malformed.
    #[error("invalid environment target: {message}")]
    InvalidEnvironment { message: String },

    /// Two resources of one kind share a name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    /// A resource references another that does not exist in the graph.
    #[error("{resource} references missing {missing}")]
    MissingReference { resource: String, missing: String },

    /// The tiers of one queue are placed in different perimeters.
    #[error(
        "queue '{queue}' spans perimeters: tier '{tier}' uses '{actual}', expected '{expected}'"
    )]
    QueuePerimeterMismatch {
        queue: String,
        tier: String,
        expected: String,
        actual: String,
    },

    /// A template binds secrets but references no execution identity.
    #[error("template '{template}' binds secrets but has no execution identity")]
    NoIdentityForSecrets { template: String },

    /// A template binds a secret its identity was never granted.
    #[error("identity '{identity}' has no read grant for '{secret}' bound by template '{template}'")]
    MissingGrant {
        template: String,
        identity: String,
        secret: String,
    },

    /// The post-render transform failed.
    #[error(transparent)]
    Override(#[from] OverrideError),
}

/// The secret-injection transform met a rendered structure it does not
/// recognize.
///
/// Surfaced immediately and never ignored: a silently dropped override
/// would deploy a job with no secrets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OverrideError {
    /// The rendered resource's shape does not match what the transform
    /// expects.
    #[error("unsupported rendered shape in '{resource}': {detail}")]
    UnsupportedShape { resource: String, detail: String },

    /// An existing secret entry targets the same environment variable
    /// with a different source.
    #[error("conflicting secret binding for '{env_var}' in '{resource}'")]
    ConflictingBinding { resource: String, env_var: String },
}

//! Error types for model construction and dispatch.

use spotgrid_id::{QueueName, TierName};
use thiserror::Error;

/// Malformed or out-of-range construction input.
///
/// Always raised synchronously at construction, never deferred to deploy
/// time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A job template reserved zero vCPUs.
    #[error("cpu reservation must be positive")]
    ZeroVcpus,

    /// A job template reserved zero memory.
    #[error("memory reservation must be positive")]
    ZeroMemory,

    /// A job template was built without a timeout.
    #[error("job template requires a timeout")]
    MissingTimeout,

    /// A job template's timeout was zero.
    #[error("timeout must be positive")]
    ZeroTimeout,

    /// A job template was built without a command.
    #[error("command must not be empty")]
    EmptyCommand,

    /// A command placeholder references an undeclared parameter.
    #[error("command references undeclared parameter '{name}'")]
    UnknownParameter { name: String },

    /// A parameter reference placeholder is malformed.
    #[error("malformed parameter reference '{arg}'")]
    InvalidParameterRef { arg: String },

    /// A parameter was declared with an invalid name.
    #[error("invalid parameter name '{name}': {reason}")]
    InvalidParameterName { name: String, reason: String },

    /// A secret binding targets an invalid environment variable name.
    #[error("invalid environment variable '{name}': {reason}")]
    InvalidEnvVar { name: String, reason: String },

    /// Two secret bindings target the same environment variable.
    #[error("duplicate secret binding for environment variable '{name}'")]
    DuplicateEnvVar { name: String },

    /// An image reference is malformed.
    #[error("invalid image reference: {reason}")]
    InvalidImage { reason: String },

    /// A spot bid percentage is outside (0, 100].
    #[error("bid percentage {value} is outside (0, 100]")]
    BidOutOfRange { value: u32 },

    /// A capacity tier was built with a zero capacity ceiling.
    #[error("max vCPUs must be positive")]
    ZeroMaxVcpus,

    /// An instance family declares zero capacity.
    #[error("instance family '{name}' must have positive vCPUs and memory")]
    EmptyInstanceFamily { name: String },

    /// A dispatch queue was built with no tiers.
    #[error("dispatch queue requires at least one capacity tier")]
    EmptyQueue,

    /// A dispatch queue lists the same tier twice.
    #[error("tier '{tier}' appears more than once in the queue")]
    DuplicateTier { tier: TierName },

    /// A dispatcher was built over a queue referencing an unknown tier.
    #[error("queue '{queue}' references unknown tier '{tier}'")]
    UnknownTier { queue: QueueName, tier: TierName },
}

/// Errors raised when offering a job to a dispatch queue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No tier in the queue can ever satisfy the job's reservation.
    ///
    /// Raised at submission, before any waiting.
    #[error(
        "no tier in queue '{queue}' can ever satisfy {vcpus} vCPU / {memory_mib} MiB"
    )]
    UnsatisfiableReservation {
        queue: QueueName,
        vcpus: u32,
        memory_mib: u32,
    },
}

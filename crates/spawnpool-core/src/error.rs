//! Error types.
//!
//! Configuration errors are fatal to the pool being built. Everything an
//! activation can run into is recoverable and returned as a value.

use thiserror::Error;

/// Why an auto-calculated distribution was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DistributionFault {
    /// The weighted split needs at least three kinds.
    #[error("at least 3 kinds are required, got {kinds}")]
    TooFewKinds { kinds: usize },
    /// Total population is below `kinds * 5`.
    #[error("total size {total} is below the minimum of {minimum}")]
    TooSmall { total: usize, minimum: usize },
    /// The decrement sweep ran out of adjustable kinds.
    #[error("could not balance distribution to {total} (stuck at {sum})")]
    Unbalanced { total: usize, sum: usize },
}

/// Construction-time failure. The pool is not created.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The template for `kind` does not carry the pooled capability.
    #[error("template for kind {kind} lacks the pooled capability")]
    InvalidReference { kind: usize },
    /// Template count differs from the number of distribution entries.
    #[error("{templates} templates supplied for a distribution of {kinds} kinds")]
    DistributionMismatch { templates: usize, kinds: usize },
    /// Distribution parameters were rejected.
    #[error("invalid distribution: {0}")]
    InvalidDistribution(#[from] DistributionFault),
    /// A category key appears more than once.
    #[error("category at position {position} duplicates an earlier key")]
    DuplicateCategory { position: usize },
    /// No templates were supplied at all.
    #[error("no templates supplied")]
    EmptyTemplates,
}

/// Host-side failure to create one instance.
///
/// The pool logs it and leaves the slot empty.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("instantiation failed: {reason}")]
pub struct SpawnError {
    reason: String,
}

impl SpawnError {
    /// Create a spawn error with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    /// The reason given by the host.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Activation outcome other than success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ActivateError {
    /// No inactive instance is available (or the one dequeued was dead).
    #[error("pool exhausted")]
    Exhausted,
    /// The category key is not known to this pool.
    #[error("unknown category")]
    UnknownCategory,
}

/// Index queue misuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum QueueError {
    /// `take()` was called with nothing in serving order.
    #[error("index queue is empty")]
    EmptyQueue,
}

//! Error types.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by the reactive engine.
///
/// All of them are local to the call that surfaced them. The engine never
/// retries; the graph is left consistent and usable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A node's evaluation re-entered itself, directly or through other nodes.
    /// The node stays dirty, so a corrected graph recovers on the next read.
    #[error("cyclic dependency: {node} was read while it was being evaluated")]
    CyclicDependency { node: NodeId },

    /// Effects kept scheduling further effects for more drain rounds than the
    /// configured cap. Effects not yet run stay pending.
    #[error("effect flush exceeded {iterations} rounds with {pending} effect(s) still pending")]
    ScheduledLoopExceeded { iterations: usize, pending: usize },

    /// A handle was used after its node was disposed or its runtime dropped.
    #[error("{node} was read after it was disposed")]
    StaleReadAfterDispose { node: NodeId },
}

/// Errors raised while loading a [`RuntimeConfig`](crate::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_flush_iterations must be at least 1")]
    ZeroFlushIterations,
}

/// Result alias for engine operations.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

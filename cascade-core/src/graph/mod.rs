//! Dependency Graph
//!
//! This module implements the dependency graph that tracks relationships
//! between signals, computed values and effects.
//!
//! # Overview
//!
//! - Nodes represent signals (sources), computeds (derived) or effects (sinks).
//! - Edges represent reads: if A read B during its last evaluation, A lists B
//!   as a dependency and B lists A as a subscriber.
//!
//! # Design Decisions
//!
//! 1. Nodes live in one id-keyed arena per runtime rather than behind
//!    reference-counted pointers to each other. Edges are plain ids, so a
//!    signal never keeps its subscribers alive and no ownership cycles form.
//!
//! 2. A node's dependency list is discarded and rebuilt on every evaluation.
//!    Conditional reads therefore always yield the exact current edge set.
//!
//! 3. Dependency entries remember the version observed at read time, which
//!    is what lets a `Check` node decide in O(dependencies) whether anything
//!    it actually read has changed.

mod arena;
mod node;

pub(crate) use arena::NodeArena;
pub(crate) use node::{AnyValue, CleanupFn, EqualsFn, Node, NodeBody};
pub use node::{DirtyState, NodeId, NodeKind};

//! Graph Nodes
//!
//! This module defines the node records that live in the dependency graph.
//! A node carries only bookkeeping plus a type-erased body; the typed
//! handles in `reactive` downcast the body on the way out.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

/// Unique identifier for a node in the dependency graph.
///
/// Ids are allocated by the owning runtime and never reused, so a stale id
/// always misses the node table instead of aliasing a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A source node (signal). Written from outside the graph, depends on nothing.
    Signal,

    /// A derived node (computed). Caches the result of its compute function.
    Computed,

    /// A leaf node run for its side effects. Nothing depends on it.
    Effect,
}

/// Dirty state of a node.
///
/// The variants are ordered: marking only ever moves a node towards `Dirty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DirtyState {
    /// The node's value is up-to-date.
    Clean,

    /// Something upstream changed, but not a direct dependency. The node has
    /// to bring its dependencies up to date and compare versions before it
    /// knows whether to recompute.
    Check,

    /// A direct dependency changed. The node must recompute.
    Dirty,
}

/// A type-erased value stored in the graph.
pub(crate) type AnyValue = Rc<dyn Any>;

/// A type-erased equality policy. Both arguments hold the node's value type.
pub(crate) type EqualsFn = Rc<dyn Fn(&dyn Any, &dyn Any) -> bool>;

pub(crate) type ComputeFn = Rc<dyn Fn() -> AnyValue>;

pub(crate) type RunFn = Rc<dyn Fn()>;

pub(crate) type CleanupFn = Box<dyn FnOnce()>;

/// What a node holds besides its bookkeeping.
pub(crate) enum NodeBody {
    Signal {
        value: AnyValue,
        equals: EqualsFn,
    },
    Computed {
        value: Option<AnyValue>,
        compute: ComputeFn,
        equals: EqualsFn,
    },
    Effect {
        run: RunFn,
        cleanups: Vec<CleanupFn>,
    },
}

impl NodeBody {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            NodeBody::Signal { .. } => NodeKind::Signal,
            NodeBody::Computed { .. } => NodeKind::Computed,
            NodeBody::Effect { .. } => NodeKind::Effect,
        }
    }
}

/// A node in the dependency graph.
pub(crate) struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// Bumped every time the node's observable value changes. For effects,
    /// bumped on every run.
    version: u64,

    /// Current dirty state.
    dirty: DirtyState,

    /// Nodes this node read during its last evaluation, in read order, with
    /// the version each had at read time.
    dependencies: IndexMap<NodeId, u64>,

    /// Nodes that read this node during their last evaluation.
    /// Back references only: a subscriber's lifetime is owned by its handle.
    subscribers: IndexSet<NodeId>,

    body: NodeBody,
}

impl Node {
    /// Create a new node. Derived nodes start dirty so the first read computes.
    pub(crate) fn new(id: NodeId, body: NodeBody) -> Self {
        let dirty = match body.kind() {
            NodeKind::Signal => DirtyState::Clean,
            NodeKind::Computed | NodeKind::Effect => DirtyState::Dirty,
        };
        Self {
            id,
            version: 0,
            dirty,
            dependencies: IndexMap::new(),
            subscribers: IndexSet::new(),
            body,
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.body.kind()
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    pub(crate) fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = DirtyState::Clean;
    }

    /// Raise the dirty state to at least `state`.
    pub(crate) fn mark(&mut self, state: DirtyState) {
        if state > self.dirty {
            self.dirty = state;
        }
    }

    pub(crate) fn dependencies(&self) -> &IndexMap<NodeId, u64> {
        &self.dependencies
    }

    pub(crate) fn replace_dependencies(
        &mut self,
        dependencies: IndexMap<NodeId, u64>,
    ) -> IndexMap<NodeId, u64> {
        std::mem::replace(&mut self.dependencies, dependencies)
    }

    pub(crate) fn subscribers(&self) -> &IndexSet<NodeId> {
        &self.subscribers
    }

    pub(crate) fn add_subscriber(&mut self, node_id: NodeId) {
        self.subscribers.insert(node_id);
    }

    pub(crate) fn remove_subscriber(&mut self, node_id: NodeId) {
        self.subscribers.shift_remove(&node_id);
    }

    pub(crate) fn body(&self) -> &NodeBody {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut NodeBody {
        &mut self.body
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("version", &self.version)
            .field("dirty", &self.dirty)
            .field("dependencies", &self.dependencies.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

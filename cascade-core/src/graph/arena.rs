//! Node Arena
//!
//! The arena owns every node of one runtime, indexed by id, and keeps the
//! forward (dependency) and back (subscriber) edges consistent.
//!
//! # Invalidation
//!
//! When a signal changes we traverse its subscribers breadth-first:
//!
//! 1. Direct subscribers are marked `Dirty`: they read the changed value.
//! 2. Everything reachable past them is marked `Check`: an input might
//!    change once the intermediate computeds are recomputed.
//! 3. Effects reached by the traversal are returned so the caller can
//!    schedule them.
//!
//! Nothing is recomputed here. Values are pulled lazily on read.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;

use super::node::{DirtyState, Node, NodeBody, NodeId, NodeKind};

/// Id-keyed table of all nodes in one runtime.
pub(crate) struct NodeArena {
    /// All nodes in the graph, indexed by ID.
    nodes: HashMap<NodeId, Node>,

    /// Next id to hand out. Ids are never reused.
    next_id: u64,
}

impl NodeArena {
    /// Create a new empty arena.
    pub(crate) fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 0,
        }
    }

    /// Insert a node with a fresh id.
    pub(crate) fn insert(&mut self, body: NodeBody) -> NodeId {
        let id = NodeId::from(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, body));
        id
    }

    /// Remove a node from the graph and return it.
    ///
    /// The node disappears from its dependencies' subscriber sets. Everything
    /// downstream is marked stale but no effect is scheduled; subscribers keep
    /// their dependency entry, so their next evaluation reads the missing node.
    ///
    /// The caller must drop the returned node after releasing its borrow of the
    /// arena: the body may own handles whose drop re-enters the runtime.
    pub(crate) fn remove(&mut self, node_id: NodeId) -> Option<Node> {
        self.mark_changed(node_id, &[]);
        let node = self.nodes.remove(&node_id)?;
        for dep_id in node.dependencies().keys() {
            if let Some(dep) = self.nodes.get_mut(dep_id) {
                dep.remove_subscriber(node_id);
            }
        }
        Some(node)
    }

    pub(crate) fn get(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub(crate) fn get_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    pub(crate) fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    pub(crate) fn version(&self, node_id: NodeId) -> Option<u64> {
        self.nodes.get(&node_id).map(Node::version)
    }

    pub(crate) fn kind(&self, node_id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node_id).map(Node::kind)
    }

    /// Replace a node's dependency list with the one recorded by its latest
    /// evaluation, and fix up subscriber back references to match.
    pub(crate) fn rebuild_dependencies(
        &mut self,
        node_id: NodeId,
        dependencies: IndexMap<NodeId, u64>,
    ) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        let old = node.replace_dependencies(dependencies.clone());

        for dep_id in old.keys() {
            if !dependencies.contains_key(dep_id) {
                if let Some(dep) = self.nodes.get_mut(dep_id) {
                    dep.remove_subscriber(node_id);
                }
            }
        }
        for dep_id in dependencies.keys() {
            if let Some(dep) = self.nodes.get_mut(dep_id) {
                dep.add_subscriber(node_id);
            }
        }
    }

    /// Mark everything downstream of `source` stale.
    ///
    /// Returns the effects reached, in discovery order, excluding any listed
    /// in `running` (an effect never re-schedules itself from its own run).
    pub(crate) fn mark_changed(&mut self, source: NodeId, running: &[NodeId]) -> Vec<NodeId> {
        let mut effects = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(node) = self.nodes.get(&source) {
            for subscriber in node.subscribers() {
                queue.push_back((*subscriber, DirtyState::Dirty));
            }
        }

        while let Some((node_id, state)) = queue.pop_front() {
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            node.mark(state);
            if !visited.insert(node_id) {
                continue;
            }

            match node.kind() {
                NodeKind::Effect => {
                    if !running.contains(&node_id) {
                        effects.push(node_id);
                    }
                }
                NodeKind::Computed => {
                    for subscriber in node.subscribers() {
                        queue.push_back((*subscriber, DirtyState::Check));
                    }
                }
                NodeKind::Signal => {}
            }
        }

        effects
    }

    /// Get the total number of nodes in the graph.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Execution Context
//!
//! The execution context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the read is recorded against the computation on top of the stack.
//!
//! # Implementation
//!
//! Each runtime owns one stack. Entering a computation pushes a frame and
//! returns a guard; dropping the guard pops the frame, so the stack is
//! restored even when the computation unwinds. A guard that completes
//! normally hands back the dependencies its frame collected.
//!
//! Only the top frame receives reads. A computed read from inside another
//! computation registers on the reader, and its own reads register on its
//! own frame while it recomputes.

use std::cell::RefCell;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::graph::NodeId;

/// An entry in the context stack.
#[derive(Debug)]
struct Frame {
    /// The node being evaluated, or `None` for an untracked scope.
    node: Option<NodeId>,

    /// Nodes read so far, with the version seen at the first read.
    dependencies: IndexMap<NodeId, u64>,
}

/// Per-runtime stack of running computations.
#[derive(Debug, Default)]
pub(crate) struct ExecutionContext {
    stack: RefCell<SmallVec<[Frame; 8]>>,
}

impl ExecutionContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start evaluating `node`. Reads are recorded until the guard finishes.
    pub(crate) fn enter(&self, node: NodeId) -> FrameGuard<'_> {
        self.push(Some(node))
    }

    /// Start a scope in which reads register nothing.
    pub(crate) fn enter_untracked(&self) -> FrameGuard<'_> {
        self.push(None)
    }

    fn push(&self, node: Option<NodeId>) -> FrameGuard<'_> {
        self.stack.borrow_mut().push(Frame {
            node,
            dependencies: IndexMap::new(),
        });
        FrameGuard {
            context: self,
            node,
            finished: false,
        }
    }

    /// Whether a read right now would be recorded.
    pub(crate) fn is_tracking(&self) -> bool {
        self.current().is_some()
    }

    /// The node that would receive a read right now.
    pub(crate) fn current(&self) -> Option<NodeId> {
        self.stack.borrow().last().and_then(|frame| frame.node)
    }

    /// Whether `node` is anywhere on the stack.
    pub(crate) fn is_evaluating(&self, node: NodeId) -> bool {
        self.stack
            .borrow()
            .iter()
            .any(|frame| frame.node == Some(node))
    }

    /// Every node currently being evaluated, innermost last.
    pub(crate) fn evaluating(&self) -> SmallVec<[NodeId; 8]> {
        self.stack
            .borrow()
            .iter()
            .filter_map(|frame| frame.node)
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.stack.borrow().is_empty()
    }

    /// Record a read of `dependency` at `version` on the top frame.
    ///
    /// Reading the same node twice keeps the first version. Returns the
    /// node the read was attributed to, if any.
    pub(crate) fn track(&self, dependency: NodeId, version: u64) -> Option<NodeId> {
        let mut stack = self.stack.borrow_mut();
        let frame = stack.last_mut()?;
        let node = frame.node?;
        frame.dependencies.entry(dependency).or_insert(version);
        Some(node)
    }
}

/// Pops its frame when dropped.
pub(crate) struct FrameGuard<'a> {
    context: &'a ExecutionContext,
    node: Option<NodeId>,
    finished: bool,
}

impl FrameGuard<'_> {
    /// Pop the frame and return the dependencies it recorded.
    pub(crate) fn finish(mut self) -> IndexMap<NodeId, u64> {
        self.finished = true;
        self.pop().map(|frame| frame.dependencies).unwrap_or_default()
    }

    fn pop(&self) -> Option<Frame> {
        let popped = self.context.stack.borrow_mut().pop();
        if let Some(frame) = &popped {
            debug_assert_eq!(
                frame.node, self.node,
                "ExecutionContext mismatch: expected {:?}, got {:?}",
                self.node, frame.node
            );
        }
        popped
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.pop();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> NodeId {
        NodeId::from(raw)
    }

    #[test]
    fn context_tracks_current_node() {
        let context = ExecutionContext::new();
        assert!(!context.is_tracking());
        assert!(context.current().is_none());

        {
            let _guard = context.enter(id(1));
            assert!(context.is_tracking());
            assert_eq!(context.current(), Some(id(1)));
        }

        // Context should be cleaned up after drop
        assert!(context.is_empty());
        assert!(context.current().is_none());
    }

    #[test]
    fn finish_returns_reads_in_order_without_duplicates() {
        let context = ExecutionContext::new();
        let guard = context.enter(id(1));

        context.track(id(3), 0);
        context.track(id(2), 5);
        context.track(id(3), 9);

        let deps = guard.finish();
        assert_eq!(deps.keys().copied().collect::<Vec<_>>(), vec![id(3), id(2)]);
        assert_eq!(deps[&id(3)], 0);
        assert!(context.is_empty());
    }

    #[test]
    fn only_the_top_frame_receives_reads() {
        let context = ExecutionContext::new();
        let outer = context.enter(id(1));
        context.track(id(10), 0);

        let inner = context.enter(id(2));
        assert_eq!(context.track(id(11), 0), Some(id(2)));
        assert!(context.is_evaluating(id(1)));
        assert_eq!(context.evaluating().as_slice(), &[id(1), id(2)]);
        let inner_deps = inner.finish();

        let outer_deps = outer.finish();
        assert_eq!(inner_deps.len(), 1);
        assert!(inner_deps.contains_key(&id(11)));
        assert_eq!(outer_deps.len(), 1);
        assert!(outer_deps.contains_key(&id(10)));
    }

    #[test]
    fn untracked_scope_swallows_reads() {
        let context = ExecutionContext::new();
        let outer = context.enter(id(1));
        {
            let _untracked = context.enter_untracked();
            assert!(!context.is_tracking());
            assert_eq!(context.track(id(5), 0), None);
            assert!(context.is_evaluating(id(1)));
        }
        assert!(outer.finish().is_empty());
    }

    #[test]
    fn frame_is_popped_on_unwind() {
        let context = ExecutionContext::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = context.enter(id(1));
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(context.is_empty());
    }
}

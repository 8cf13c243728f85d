//! Node handles.
//!
//! Every typed handle (`Signal`, `Computed`, `Effect`) shares one
//! `NodeHandle` per node. The handle owns the node: when the last clone is
//! dropped, the node leaves the graph. The link back to the runtime is
//! weak, so closures stored in the graph that capture handles never keep
//! the runtime itself alive.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::error::{ReactiveError, Result};
use crate::graph::NodeId;

use super::runtime::RuntimeInner;

pub(crate) struct NodeHandle {
    id: NodeId,
    runtime: Weak<RuntimeInner>,

    /// Set when the node should outlive its handles (detached effects).
    detached: Cell<bool>,
}

impl NodeHandle {
    pub(crate) fn new(id: NodeId, runtime: &Rc<RuntimeInner>) -> Rc<Self> {
        Rc::new(Self {
            id,
            runtime: Rc::downgrade(runtime),
            detached: Cell::new(false),
        })
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// The owning runtime, or `StaleReadAfterDispose` once it is gone.
    pub(crate) fn runtime(&self) -> Result<Rc<RuntimeInner>> {
        self.runtime
            .upgrade()
            .ok_or(ReactiveError::StaleReadAfterDispose { node: self.id })
    }

    pub(crate) fn detach(&self) {
        self.detached.set(true);
    }

    pub(crate) fn same_runtime(&self, other: &NodeHandle) -> bool {
        Weak::ptr_eq(&self.runtime, &other.runtime)
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        if self.detached.get() {
            return;
        }
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.release(self.id);
        }
    }
}

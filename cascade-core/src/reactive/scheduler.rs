//! Effect Scheduler
//!
//! The scheduler holds effects waiting to run and the batch depth counter.
//! It decides *when* a flush may happen; the runtime performs it.
//!
//! # Algorithm
//!
//! 1. A signal write marks its downstream graph and enqueues the effects it
//!    reached. Enqueuing an already-pending effect is a no-op, and insertion
//!    order is preserved.
//! 2. While a batch is open (`depth > 0`) nothing runs.
//! 3. When the outermost batch closes, or a write happens outside any batch,
//!    the runtime drains the queue in rounds: each round takes every effect
//!    pending at its start. Effects queued while a round runs form the next
//!    round of the same flush.
//! 4. The number of rounds per flush is capped. Hitting the cap leaves the
//!    remaining effects pending.

use std::cell::{Cell, RefCell};

use indexmap::IndexSet;

use crate::graph::NodeId;

#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    /// Number of open `batch` scopes.
    depth: Cell<usize>,

    /// Whether a flush is draining the queue right now.
    flushing: Cell<bool>,

    /// Effects waiting to run, in the order they were first scheduled.
    pending: RefCell<IndexSet<NodeId>>,

    /// Total effects ever added to the queue. Lets a caller tell whether
    /// its own work scheduled anything.
    scheduled: Cell<u64>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Schedule an effect. Returns false if it was already pending.
    pub(crate) fn enqueue(&self, effect: NodeId) -> bool {
        let inserted = self.pending.borrow_mut().insert(effect);
        if inserted {
            self.scheduled.set(self.scheduled.get() + 1);
        }
        inserted
    }

    pub(crate) fn scheduled_count(&self) -> u64 {
        self.scheduled.get()
    }

    /// Drop an effect from the queue (disposal).
    pub(crate) fn remove(&self, effect: NodeId) {
        self.pending.borrow_mut().shift_remove(&effect);
    }

    pub(crate) fn is_pending(&self, effect: NodeId) -> bool {
        self.pending.borrow().contains(&effect)
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Take every pending effect for one drain round.
    pub(crate) fn take_round(&self) -> Vec<NodeId> {
        self.pending.borrow_mut().drain(..).collect()
    }

    /// Put effects back at the front of the queue, ahead of anything queued
    /// since they were taken.
    pub(crate) fn requeue_front(&self, effects: impl IntoIterator<Item = NodeId>) {
        let mut pending = self.pending.borrow_mut();
        let mut restored: IndexSet<NodeId> = effects.into_iter().collect();
        restored.extend(pending.drain(..));
        *pending = restored;
    }

    /// Open a batch. The batch closes when the guard drops.
    pub(crate) fn open_batch(&self) -> BatchGuard<'_> {
        self.depth.set(self.depth.get() + 1);
        BatchGuard { scheduler: self }
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth.get()
    }

    pub(crate) fn is_flushing(&self) -> bool {
        self.flushing.get()
    }

    /// Whether a write right now should flush on its own.
    pub(crate) fn can_flush(&self) -> bool {
        self.depth.get() == 0 && !self.flushing.get()
    }

    /// Mark a flush as running. Returns `None` if one already is.
    pub(crate) fn begin_flush(&self) -> Option<FlushGuard<'_>> {
        if self.flushing.replace(true) {
            return None;
        }
        Some(FlushGuard { scheduler: self })
    }
}

/// Closes one batch level on drop.
pub(crate) struct BatchGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let depth = self.scheduler.depth.get();
        self.scheduler.depth.set(depth.saturating_sub(1));
    }
}

/// Clears the flushing flag on drop.
pub(crate) struct FlushGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.flushing.set(false);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is queued, never run in place.
//!    The runtime flushes the queue once the current batch completes, so an
//!    effect sees every write of the batch and runs at most once for it.
//!
//! 3. Each run discards the old dependency list and records a new one.
//!
//! # Cleanup
//!
//! An effect body can register cleanup callbacks with
//! [`Runtime::on_cleanup`](super::Runtime::on_cleanup). They run before the
//! next run and when the effect is disposed.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::graph::NodeId;

use super::handle::NodeHandle;

/// Handle to a registered effect.
///
/// Dropping the last handle disposes the effect.
///
/// # Example
///
/// ```rust
/// use cascade_core::Runtime;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let rt = Runtime::new();
/// let count = rt.signal(0);
/// let seen = Rc::new(Cell::new(0));
///
/// let effect = rt.effect({
///     let (count, seen) = (count.clone(), seen.clone());
///     move || seen.set(count.get())
/// }).unwrap();
///
/// count.set(5).unwrap();
/// assert_eq!(seen.get(), 5);
///
/// effect.dispose();
/// count.set(6).unwrap();
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    handle: Rc<NodeHandle>,
}

impl Effect {
    pub(crate) fn from_handle(handle: Rc<NodeHandle>) -> Self {
        Self { handle }
    }

    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    /// Run the effect now, regardless of whether anything changed.
    pub fn run_now(&self) -> Result<()> {
        self.handle.runtime()?.run_effect_now(self.id())
    }

    /// Stop the effect. Its cleanups run, it leaves the pending queue, and it
    /// never runs again.
    pub fn dispose(&self) {
        if let Ok(runtime) = self.handle.runtime() {
            runtime.dispose(self.id());
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.handle
            .runtime()
            .map_or(true, |runtime| !runtime.contains(self.id()))
    }

    /// Keep the effect alive after its handles are dropped, until it is
    /// disposed through another clone or the runtime is dropped.
    pub fn detach(self) {
        self.handle.detach();
    }

    /// Number of times the effect has run.
    pub fn run_count(&self) -> Result<u64> {
        self.handle.runtime()?.version(self.id())
    }

    /// Whether the effect is queued for the next flush.
    pub fn is_scheduled(&self) -> bool {
        self.handle
            .runtime()
            .map_or(false, |runtime| runtime.is_scheduled(self.id()))
    }

    /// Number of nodes read by the last run.
    pub fn dependency_count(&self) -> Result<usize> {
        self.handle.runtime()?.dependency_count(self.id())
    }
}

impl PartialEq for Effect {
    fn eq(&self, other: &Self) -> bool {
        self.handle.id() == other.handle.id() && self.handle.same_runtime(&other.handle)
    }
}

impl Eq for Effect {}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count().ok())
            .field("dependency_count", &self.dependency_count().ok())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

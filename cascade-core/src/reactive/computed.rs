//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computeds Work
//!
//! 1. On first access, the computed runs its function and caches the result.
//!
//! 2. When accessed again, if no dependencies have changed, returns the cache.
//!
//! 3. When a signal it read changes, it is marked `Dirty`. When something
//!    further upstream changes, it is marked `Check`.
//!
//! 4. On next access, a `Check` computed brings its own computed inputs up
//!    to date and compares their versions with the ones it saw. Only if one
//!    moved does it recompute.
//!
//! 5. A recompute that produces an equal value keeps the version, so
//!    computeds further down stay clean.
//!
//! # Why This Matters
//!
//! - A signal changes
//! - 10 computeds depend on it
//! - Only the computeds actually read will recompute
//! - Computeds that are never read stay dirty (no wasted work)

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::{ReactiveError, Result};
use crate::graph::{AnyValue, DirtyState, NodeId};

use super::handle::NodeHandle;
use super::runtime::catch_reactive;
use super::signal::downcast;

/// A read-only, memoized value derived from other reactive values.
///
/// Created with [`Runtime::computed`](super::Runtime::computed).
///
/// # Example
///
/// ```rust
/// use cascade_core::Runtime;
///
/// let rt = Runtime::new();
/// let price = rt.signal(120.0_f64);
/// let quantity = rt.signal(2_u32);
/// let subtotal = rt.computed({
///     let (price, quantity) = (price.clone(), quantity.clone());
///     move || price.get() * f64::from(quantity.get())
/// });
///
/// assert_eq!(subtotal.get(), 240.0);
/// quantity.set(3).unwrap();
/// assert_eq!(subtotal.get(), 360.0);
/// ```
pub struct Computed<T> {
    handle: Rc<NodeHandle>,
    _marker: PhantomData<T>,
}

impl<T: 'static> Computed<T> {
    pub(crate) fn from_handle(handle: Rc<NodeHandle>) -> Self {
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// # Panics
    ///
    /// Panics on a cyclic dependency or a read of a disposed node. Inside
    /// another computed or effect, the failure is reported to the outermost
    /// fallible call instead; use [`try_get`](Self::try_get) to handle it here.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Get the current value, recomputing if necessary.
    pub fn try_get(&self) -> Result<T>
    where
        T: Clone,
    {
        self.try_with(T::clone)
    }

    /// Borrow the current value, recomputing if necessary.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.read() {
            Ok(value) => f(downcast::<T>(&value)),
            Err(err) => self.fail(err),
        }
    }

    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let value = self.read()?;
        Ok(f(downcast::<T>(&value)))
    }

    /// Get the current value without registering a dependency.
    ///
    /// The computed still recomputes if stale, and its own reads are tracked
    /// as usual.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        let read = self.handle.runtime().and_then(|runtime| {
            let scheduled = runtime.scheduled_count();
            let value = catch_reactive(|| runtime.read_computed_untracked(self.id()))?;
            if runtime.scheduled_count() != scheduled {
                runtime.flush_if_idle()?;
            }
            Ok(value)
        });
        match read {
            Ok(value) => downcast::<T>(&value).clone(),
            Err(err) => self.fail(err),
        }
    }

    /// The number of times the value has changed.
    pub fn version(&self) -> Result<u64> {
        self.handle.runtime()?.version(self.id())
    }

    pub fn dirty_state(&self) -> Result<DirtyState> {
        self.handle.runtime()?.dirty_state(self.id())
    }

    /// Whether the cached value may be stale.
    pub fn is_dirty(&self) -> bool {
        !matches!(self.dirty_state(), Ok(DirtyState::Clean))
    }

    /// Number of nodes read by the last evaluation.
    pub fn dependency_count(&self) -> Result<usize> {
        self.handle.runtime()?.dependency_count(self.id())
    }

    pub fn subscriber_count(&self) -> Result<usize> {
        self.handle.runtime()?.subscriber_count(self.id())
    }

    /// Remove the computed from the graph now.
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

    fn read(&self) -> Result<AnyValue> {
        let runtime = self.handle.runtime()?;
        let scheduled = runtime.scheduled_count();
        let value = catch_reactive(|| runtime.read_computed(self.id()))?;
        // Effects scheduled by a write inside a compute run once the
        // outermost read returns. Effects left over from earlier flushes wait.
        if runtime.scheduled_count() != scheduled {
            runtime.flush_if_idle()?;
        }
        Ok(value)
    }

    fn fail(&self, err: ReactiveError) -> ! {
        match self.handle.runtime() {
            Ok(runtime) => runtime.escalate(err),
            Err(_) => panic!("{err}"),
        }
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            handle: Rc::clone(&self.handle),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Computed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle.id() == other.handle.id() && self.handle.same_runtime(&other.handle)
    }
}

impl<T> Eq for Computed<T> {}

impl<T: 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("state", &self.dirty_state().ok())
            .field("version", &self.version().ok())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

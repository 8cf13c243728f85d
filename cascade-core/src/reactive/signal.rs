//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a computed or effect, the read is
//!    recorded against that computation.
//!
//! 2. When a signal is set to a value its equality policy considers
//!    different, its version is bumped and everything downstream is marked
//!    stale. Setting an equal value does nothing at all.
//!
//! 3. Effects reached by the write are flushed once the enclosing batch
//!    (or the write itself, outside any batch) completes.
//!
//! # Memory Layout
//!
//! A `Signal<T>` is one pointer to a shared node handle. The value lives in
//! the runtime's arena behind an `Rc`, so reads clone the `Rc` out and never
//! hold a borrow of the graph while user code runs.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::{ReactiveError, Result};
use crate::graph::{AnyValue, NodeId};

use super::handle::NodeHandle;
use super::mailbox::SignalSender;

/// A reactive cell holding a value of type `T`.
///
/// Created with [`Runtime::signal`](super::Runtime::signal). Clones share
/// the same cell.
///
/// # Example
///
/// ```rust
/// use cascade_core::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.signal(0);
///
/// count.set(5).unwrap();
/// count.update(|v| v + 1).unwrap();
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T> {
    handle: Rc<NodeHandle>,
    _marker: PhantomData<T>,
}

impl<T: 'static> Signal<T> {
    pub(crate) fn from_handle(handle: Rc<NodeHandle>) -> Self {
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    /// Get the signal's node id.
    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    /// Get the current value, registering a dependency if called inside a
    /// computed or effect.
    ///
    /// # Panics
    ///
    /// Panics if the signal was disposed or its runtime dropped. Inside a
    /// computed or effect, the failure is reported to the outermost
    /// fallible call instead.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Like [`get`](Self::get), but returns the error instead of panicking.
    pub fn try_get(&self) -> Result<T>
    where
        T: Clone,
    {
        self.try_with(T::clone)
    }

    /// Get the current value without registering a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        match self.read_untracked() {
            Ok(value) => downcast::<T>(&value).clone(),
            Err(err) => self.fail(err),
        }
    }

    /// Borrow the current value, registering a dependency like `get`.
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

    /// Set a new value.
    ///
    /// A no-op if the value equals the current one. Otherwise dependents are
    /// invalidated and, outside a batch, affected effects run before this
    /// returns. Errors come from that flush.
    pub fn set(&self, value: T) -> Result<()> {
        let runtime = self.handle.runtime()?;
        runtime.write_signal(self.id(), Rc::new(value))
    }

    /// Set the value computed from the current one.
    ///
    /// The read of the current value is not tracked.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<()> {
        let current = self.read_untracked()?;
        let next = f(downcast::<T>(&current));
        drop(current);
        self.set(next)
    }

    /// The number of times the value has changed.
    pub fn version(&self) -> Result<u64> {
        self.handle.runtime()?.version(self.id())
    }

    /// Number of computeds and effects that read this signal last time they ran.
    pub fn subscriber_count(&self) -> Result<usize> {
        self.handle.runtime()?.subscriber_count(self.id())
    }

    /// A read-only view of this signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
        }
    }

    /// A handle other threads can use to set this signal.
    pub fn sender(&self) -> Result<SignalSender<T>>
    where
        T: Send,
    {
        let runtime = self.handle.runtime()?;
        Ok(SignalSender::new(runtime.mailbox().clone(), self.id()))
    }

    /// Remove the signal from the graph now. Every handle to it, and every
    /// computation that reads it, sees `StaleReadAfterDispose` afterwards.
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
        self.handle.runtime()?.read_signal(self.id())
    }

    fn read_untracked(&self) -> Result<AnyValue> {
        self.handle.runtime()?.read_signal_untracked(self.id())
    }

    fn fail(&self, err: ReactiveError) -> ! {
        match self.handle.runtime() {
            Ok(runtime) => runtime.escalate(err),
            Err(_) => panic!("{err}"),
        }
    }
}

pub(crate) fn downcast<T: 'static>(value: &AnyValue) -> &T {
    value
        .downcast_ref::<T>()
        .expect("node value has the type of its handle")
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            handle: Rc::clone(&self.handle),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle.id() == other.handle.id() && self.handle.same_runtime(&other.handle)
    }
}

impl<T> Eq for Signal<T> {}

impl<T> fmt::Debug for Signal<T>
where
    T: fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Signal");
        debug.field("id", &self.id());
        match self.read_untracked() {
            Ok(value) => debug.field("value", downcast::<T>(&value)),
            Err(_) => debug.field("value", &"<disposed>"),
        };
        debug.finish()
    }
}

/// A read-only view of a [`Signal`].
///
/// Hand this out when a component may observe a value but must not write it.
pub struct ReadSignal<T> {
    signal: Signal<T>,
}

impl<T: 'static> ReadSignal<T> {
    pub fn id(&self) -> NodeId {
        self.signal.id()
    }

    /// See [`Signal::get`].
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.signal.get()
    }

    pub fn try_get(&self) -> Result<T>
    where
        T: Clone,
    {
        self.signal.try_get()
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.signal.get_untracked()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    pub fn version(&self) -> Result<u64> {
        self.signal.version()
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> fmt::Debug for ReadSignal<T>
where
    T: fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.signal).finish()
    }
}

impl<T> From<Signal<T>> for ReadSignal<T> {
    fn from(signal: Signal<T>) -> Self {
        Self { signal }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

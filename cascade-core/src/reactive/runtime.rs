//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, computeds
//! and effects. It owns the node arena, the execution context and the
//! scheduler of one engine instance.
//!
//! # How It Works
//!
//! 1. Creating a signal, computed or effect inserts a node into the arena
//!    and hands back a typed handle.
//!
//! 2. When a computed or effect evaluates, its reads are recorded on its
//!    context frame. When it finishes, its dependency list is replaced with
//!    what it actually read.
//!
//! 3. When a signal's value changes, the runtime:
//!    a. Marks direct subscribers `Dirty` and everything further down `Check`
//!    b. Schedules the effects it reached
//!    c. Flushes them if no batch is open
//!    d. Leaves computeds alone; they recompute on next access
//!
//! 4. Bringing a `Check` node up to date first brings its computed
//!    dependencies up to date, then recomputes only if one of them now has a
//!    different version than the one it saw.
//!
//! # Threading
//!
//! A runtime is confined to the thread that created it (`Runtime` is not
//! `Send`). Other threads feed it through [`SignalSender`](super::SignalSender).
//!
//! # Errors inside user code
//!
//! Compute and effect closures return plain values, so an error detected
//! inside one (a cycle, a read of a disposed node) unwinds out of the
//! closure with the [`ReactiveError`] as payload. Fallible entry points
//! catch exactly that payload and return it as `Err`. Other panics pass
//! through untouched. No arena borrow is held while user code runs, so the
//! graph is consistent whichever way a closure exits.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::RuntimeConfig;
use crate::error::{ConfigError, ReactiveError, Result};
use crate::graph::{
    AnyValue, CleanupFn, DirtyState, EqualsFn, Node, NodeArena, NodeBody, NodeId, NodeKind,
};

use super::computed::Computed;
use super::context::ExecutionContext;
use super::effect::Effect;
use super::handle::NodeHandle;
use super::mailbox::Mailbox;
use super::scheduler::Scheduler;
use super::signal::Signal;

/// One reactive engine instance.
///
/// Cloning a `Runtime` yields another handle to the same engine. Signals,
/// computeds and effects only hold a weak link back to it: once every
/// `Runtime` handle is dropped, the graph is freed and remaining node
/// handles report [`ReactiveError::StaleReadAfterDispose`].
///
/// # Example
///
/// ```rust
/// use cascade_core::Runtime;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let rt = Runtime::new();
/// let a = rt.signal(2);
/// let b = rt.signal(3);
/// let sum = rt.computed({
///     let (a, b) = (a.clone(), b.clone());
///     move || a.get() + b.get()
/// });
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let _effect = rt.effect({
///     let (sum, log) = (sum.clone(), log.clone());
///     move || log.borrow_mut().push(sum.get())
/// }).unwrap();
///
/// a.set(5).unwrap();
/// assert_eq!(*log.borrow(), vec![5, 8]);
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    arena: RefCell<NodeArena>,
    context: ExecutionContext,
    scheduler: Scheduler,

    /// Nodes whose last handle dropped while the arena was borrowed.
    deferred: RefCell<Vec<NodeId>>,

    mailbox: Arc<Mailbox>,
}

impl Runtime {
    /// Create a runtime with the default config.
    pub fn new() -> Self {
        Self::build(RuntimeConfig::default())
    }

    /// Create a runtime with an explicit config, rejecting invalid values.
    pub fn with_config(config: RuntimeConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RuntimeConfig) -> Self {
        debug!(max_flush_iterations = config.max_flush_iterations, "runtime created");
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                arena: RefCell::new(NodeArena::new()),
                context: ExecutionContext::new(),
                scheduler: Scheduler::new(),
                deferred: RefCell::new(Vec::new()),
                mailbox: Arc::new(Mailbox::new()),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Create a signal compared with `PartialEq`: setting an equal value is a no-op.
    pub fn signal<T>(&self, value: T) -> Signal<T>
    where
        T: PartialEq + 'static,
    {
        self.signal_with_equals(value, T::eq)
    }

    /// Create a signal with a custom equality policy.
    ///
    /// Use `|_, _| false` to notify on every write, or `Rc::ptr_eq` to compare
    /// shared values by identity.
    pub fn signal_with_equals<T, E>(&self, value: T, equals: E) -> Signal<T>
    where
        T: 'static,
        E: Fn(&T, &T) -> bool + 'static,
    {
        let id = self.inner.arena.borrow_mut().insert(NodeBody::Signal {
            value: Rc::new(value),
            equals: erase_equals(equals),
        });
        trace!(node = %id, "signal created");
        Signal::from_handle(NodeHandle::new(id, &self.inner))
    }

    /// Create a computed value compared with `PartialEq`.
    ///
    /// The function does not run until the first read.
    pub fn computed<T, F>(&self, compute: F) -> Computed<T>
    where
        T: PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        self.computed_with_equals(compute, T::eq)
    }

    /// Create a computed value with a custom equality policy.
    pub fn computed_with_equals<T, F, E>(&self, compute: F, equals: E) -> Computed<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
        E: Fn(&T, &T) -> bool + 'static,
    {
        let id = self.inner.arena.borrow_mut().insert(NodeBody::Computed {
            value: None,
            compute: Rc::new(move || Rc::new(compute()) as AnyValue),
            equals: erase_equals(equals),
        });
        trace!(node = %id, "computed created");
        Computed::from_handle(NodeHandle::new(id, &self.inner))
    }

    /// Create an effect and run it once to discover its dependencies.
    ///
    /// Later runs are scheduled by the runtime. Dropping the last handle
    /// disposes the effect; see [`Effect::detach`] to keep it running
    /// for the life of the runtime.
    pub fn effect<F>(&self, run: F) -> Result<Effect>
    where
        F: Fn() + 'static,
    {
        let id = self.inner.arena.borrow_mut().insert(NodeBody::Effect {
            run: Rc::new(run),
            cleanups: Vec::new(),
        });
        debug!(node = %id, "effect created");
        let effect = Effect::from_handle(NodeHandle::new(id, &self.inner));

        let first_run = {
            let _batch = self.inner.scheduler.open_batch();
            catch_reactive(|| self.inner.run_effect(id))
        };
        first_run?;
        self.inner.flush_if_idle()?;
        Ok(effect)
    }

    /// Run `f` with effects held back, then flush once.
    ///
    /// Nested batches coalesce: only the outermost one flushes. A batch
    /// opened while effects are flushing adds to that flush.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let value = {
            let _batch = self.inner.scheduler.open_batch();
            f()
        };
        self.inner.flush_if_idle()?;
        Ok(value)
    }

    /// Run every pending effect now.
    ///
    /// Needed only to retry after a failed flush; writes flush on their own.
    pub fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    /// Run `f` without recording any reads it makes.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.untracked(f)
    }

    /// Register a callback to run before the current effect runs again, or
    /// when it is disposed.
    ///
    /// Returns `false` (and drops `cleanup`) when no effect is running.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) -> bool {
        self.inner.on_cleanup(Box::new(cleanup))
    }

    /// Apply every value sent through a [`SignalSender`](super::SignalSender)
    /// since the last call, in arrival order, as one batch.
    ///
    /// Returns how many values were applied. Values for disposed signals are
    /// dropped.
    pub fn deliver(&self) -> Result<usize> {
        let deliveries = self.inner.mailbox.take();
        if deliveries.is_empty() {
            return Ok(0);
        }

        let mut applied = 0;
        {
            let _batch = self.inner.scheduler.open_batch();
            for delivery in deliveries {
                let (node, value) = delivery.into_parts();
                match self.inner.write_signal(node, value) {
                    Ok(()) => applied += 1,
                    Err(ReactiveError::StaleReadAfterDispose { .. }) => {
                        trace!(node = %node, "delivery to disposed signal dropped");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        debug!(applied, "mailbox delivered");
        self.inner.flush_if_idle()?;
        Ok(applied)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.inner.arena.borrow().len()
    }

    /// Number of effects waiting for a flush.
    pub fn pending_effects(&self) -> usize {
        self.inner.scheduler.pending_len()
    }

    /// Whether a read right now would register a dependency.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.is_tracking()
    }

    /// The computed or effect currently being evaluated, if any.
    pub fn current_observer(&self) -> Option<NodeId> {
        self.inner.context.current()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.node_count())
            .field("pending_effects", &self.pending_effects())
            .field("batch_depth", &self.inner.scheduler.depth())
            .field("flushing", &self.inner.scheduler.is_flushing())
            .finish()
    }
}

impl RuntimeInner {
    pub(crate) fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    pub(crate) fn scheduled_count(&self) -> u64 {
        self.scheduler.scheduled_count()
    }

    pub(crate) fn is_scheduled(&self, id: NodeId) -> bool {
        self.scheduler.is_pending(id)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Current value of a signal, recording the read on the current frame.
    pub(crate) fn read_signal(&self, id: NodeId) -> Result<AnyValue> {
        let (value, version) = self.signal_value(id)?;
        self.register_read(id, version);
        Ok(value)
    }

    pub(crate) fn read_signal_untracked(&self, id: NodeId) -> Result<AnyValue> {
        self.signal_value(id).map(|(value, _)| value)
    }

    fn signal_value(&self, id: NodeId) -> Result<(AnyValue, u64)> {
        let arena = self.arena.borrow();
        let node = arena
            .get(id)
            .ok_or(ReactiveError::StaleReadAfterDispose { node: id })?;
        match node.body() {
            NodeBody::Signal { value, .. } => Ok((value.clone(), node.version())),
            _ => unreachable!("{id} is a {:?} node, not a signal", node.kind()),
        }
    }

    /// Bring a computed up to date and return its value, recording the read.
    pub(crate) fn read_computed(&self, id: NodeId) -> Result<AnyValue> {
        let (value, version) = self.computed_value(id)?;
        self.register_read(id, version);
        Ok(value)
    }

    pub(crate) fn read_computed_untracked(&self, id: NodeId) -> Result<AnyValue> {
        self.untracked(|| self.computed_value(id).map(|(value, _)| value))
    }

    fn computed_value(&self, id: NodeId) -> Result<(AnyValue, u64)> {
        if self.context.is_evaluating(id) {
            return Err(ReactiveError::CyclicDependency { node: id });
        }
        self.update_if_necessary(id)?;

        let arena = self.arena.borrow();
        let node = arena
            .get(id)
            .ok_or(ReactiveError::StaleReadAfterDispose { node: id })?;
        match node.body() {
            NodeBody::Computed {
                value: Some(value), ..
            } => Ok((value.clone(), node.version())),
            // Disposed from inside its own compute.
            NodeBody::Computed { value: None, .. } => {
                Err(ReactiveError::StaleReadAfterDispose { node: id })
            }
            _ => unreachable!("{id} is a {:?} node, not a computed", node.kind()),
        }
    }

    fn register_read(&self, id: NodeId, version: u64) {
        if let Some(observer) = self.context.track(id, version) {
            if self.config.trace_reads {
                trace!(node = %id, observer = %observer, version, "dependency read");
            }
        }
    }

    pub(crate) fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _untracked = self.context.enter_untracked();
        f()
    }

    pub(crate) fn version(&self, id: NodeId) -> Result<u64> {
        self.arena
            .borrow()
            .version(id)
            .ok_or(ReactiveError::StaleReadAfterDispose { node: id })
    }

    pub(crate) fn dirty_state(&self, id: NodeId) -> Result<DirtyState> {
        self.arena
            .borrow()
            .get(id)
            .map(Node::dirty_state)
            .ok_or(ReactiveError::StaleReadAfterDispose { node: id })
    }

    pub(crate) fn subscriber_count(&self, id: NodeId) -> Result<usize> {
        self.arena
            .borrow()
            .get(id)
            .map(|node| node.subscribers().len())
            .ok_or(ReactiveError::StaleReadAfterDispose { node: id })
    }

    pub(crate) fn dependency_count(&self, id: NodeId) -> Result<usize> {
        self.arena
            .borrow()
            .get(id)
            .map(|node| node.dependencies().len())
            .ok_or(ReactiveError::StaleReadAfterDispose { node: id })
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.arena.borrow().contains(id)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Store a new signal value and push invalidation downstream.
    ///
    /// Equal values are dropped without touching the graph.
    pub(crate) fn write_signal(&self, id: NodeId, value: AnyValue) -> Result<()> {
        let (current, equals) = self.signal_parts(id)?;
        if equals(&*current, &*value) {
            trace!(node = %id, "write suppressed by equality");
            return Ok(());
        }
        drop(current);

        let (replaced, effects) = {
            let mut arena = self.arena.borrow_mut();
            let node = arena
                .get_mut(id)
                .ok_or(ReactiveError::StaleReadAfterDispose { node: id })?;
            node.bump_version();
            let version = node.version();
            let replaced = match node.body_mut() {
                NodeBody::Signal { value: slot, .. } => std::mem::replace(slot, value),
                _ => unreachable!("{id} is not a signal"),
            };
            let running = self.context.evaluating();
            let effects = arena.mark_changed(id, &running);
            trace!(node = %id, version, effects = effects.len(), "signal written");
            (replaced, effects)
        };
        drop(replaced);

        for effect in effects {
            self.scheduler.enqueue(effect);
        }
        self.sweep_deferred();
        self.flush_if_idle()
    }

    fn signal_parts(&self, id: NodeId) -> Result<(AnyValue, EqualsFn)> {
        let arena = self.arena.borrow();
        let node = arena
            .get(id)
            .ok_or(ReactiveError::StaleReadAfterDispose { node: id })?;
        match node.body() {
            NodeBody::Signal { value, equals } => Ok((value.clone(), equals.clone())),
            _ => unreachable!("{id} is a {:?} node, not a signal", node.kind()),
        }
    }

    // ------------------------------------------------------------------
    // Pull
    // ------------------------------------------------------------------

    /// Make a computed or effect clean, recomputing or re-running it only if
    /// something it read has really changed.
    fn update_if_necessary(&self, id: NodeId) -> Result<()> {
        let (state, kind, dependencies) = {
            let arena = self.arena.borrow();
            let node = arena
                .get(id)
                .ok_or(ReactiveError::StaleReadAfterDispose { node: id })?;
            let dependencies: Vec<(NodeId, u64, Option<NodeKind>)> = match node.dirty_state() {
                DirtyState::Check => node
                    .dependencies()
                    .iter()
                    .map(|(&dependency, &seen)| (dependency, seen, arena.kind(dependency)))
                    .collect(),
                _ => Vec::new(),
            };
            (node.dirty_state(), node.kind(), dependencies)
        };

        match state {
            DirtyState::Clean => return Ok(()),
            DirtyState::Check => {
                let mut changed = false;
                for (dependency, seen, dep_kind) in dependencies {
                    if dep_kind == Some(NodeKind::Computed) {
                        if self.context.is_evaluating(dependency) {
                            return Err(ReactiveError::CyclicDependency { node: dependency });
                        }
                        self.update_if_necessary(dependency)?;
                    }
                    if self.arena.borrow().version(dependency) != Some(seen) {
                        changed = true;
                        break;
                    }
                }
                if !changed {
                    if let Some(node) = self.arena.borrow_mut().get_mut(id) {
                        node.mark_clean();
                    }
                    trace!(node = %id, "inputs unchanged, marked clean");
                    return Ok(());
                }
            }
            DirtyState::Dirty => {}
        }

        match kind {
            NodeKind::Computed => self.recompute(id),
            NodeKind::Effect => self.run_effect(id),
            NodeKind::Signal => Ok(()),
        }
    }

    fn recompute(&self, id: NodeId) -> Result<()> {
        let compute = {
            let arena = self.arena.borrow();
            let node = arena
                .get(id)
                .ok_or(ReactiveError::StaleReadAfterDispose { node: id })?;
            match node.body() {
                NodeBody::Computed { compute, .. } => compute.clone(),
                _ => unreachable!("{id} is not a computed"),
            }
        };

        let frame = self.context.enter(id);
        let value = compute();
        let dependencies = frame.finish();

        let (previous, equals) = {
            let arena = self.arena.borrow();
            match arena.get(id).map(Node::body) {
                Some(NodeBody::Computed { value, equals, .. }) => (value.clone(), equals.clone()),
                // Disposed while computing.
                _ => return Ok(()),
            }
        };
        let changed = match &previous {
            Some(previous) => !equals(&**previous, &*value),
            None => true,
        };
        drop(previous);

        // A compute that wrote something it read is already out of date.
        let stale = {
            let arena = self.arena.borrow();
            dependencies
                .iter()
                .any(|(&dependency, &seen)| arena.version(dependency) != Some(seen))
        };

        let discarded = {
            let mut arena = self.arena.borrow_mut();
            arena.rebuild_dependencies(id, dependencies);
            match arena.get_mut(id) {
                Some(node) => {
                    if stale {
                        node.mark(DirtyState::Dirty);
                    } else {
                        node.mark_clean();
                    }
                    if changed {
                        node.bump_version();
                        match node.body_mut() {
                            NodeBody::Computed { value: slot, .. } => slot.replace(value),
                            _ => unreachable!("{id} is not a computed"),
                        }
                    } else {
                        Some(value)
                    }
                }
                None => Some(value),
            }
        };
        drop(discarded);

        if stale {
            trace!(node = %id, "recomputed, but an input moved during evaluation");
        } else if changed {
            trace!(node = %id, "recomputed");
        } else {
            trace!(node = %id, "recomputed to an equal value, version kept");
        }
        self.sweep_deferred();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Run an effect body under its own frame, after its pending cleanups.
    pub(crate) fn run_effect(&self, id: NodeId) -> Result<()> {
        let (run, cleanups) = {
            let mut arena = self.arena.borrow_mut();
            let node = arena
                .get_mut(id)
                .ok_or(ReactiveError::StaleReadAfterDispose { node: id })?;
            match node.body_mut() {
                NodeBody::Effect { run, cleanups } => (run.clone(), std::mem::take(cleanups)),
                _ => unreachable!("{id} is not an effect"),
            }
        };
        self.run_cleanups(cleanups);

        let frame = self.context.enter(id);
        run();
        let dependencies = frame.finish();

        {
            let mut arena = self.arena.borrow_mut();
            arena.rebuild_dependencies(id, dependencies);
            if let Some(node) = arena.get_mut(id) {
                node.mark_clean();
                node.bump_version();
                debug!(node = %id, run = node.version(), "effect ran");
            }
        }
        self.sweep_deferred();
        Ok(())
    }

    /// Re-run an effect on demand, outside the scheduler.
    pub(crate) fn run_effect_now(&self, id: NodeId) -> Result<()> {
        if self.context.is_evaluating(id) {
            return Err(ReactiveError::CyclicDependency { node: id });
        }
        if !self.contains(id) {
            return Err(ReactiveError::StaleReadAfterDispose { node: id });
        }
        {
            let _batch = self.scheduler.open_batch();
            catch_reactive(|| self.run_effect(id))?;
        }
        self.flush_if_idle()
    }

    fn on_cleanup(&self, cleanup: CleanupFn) -> bool {
        let Some(current) = self.context.current() else {
            return false;
        };
        let mut arena = self.arena.borrow_mut();
        match arena.get_mut(current).map(Node::body_mut) {
            Some(NodeBody::Effect { cleanups, .. }) => {
                cleanups.push(cleanup);
                true
            }
            _ => false,
        }
    }

    fn run_cleanups(&self, cleanups: Vec<CleanupFn>) {
        if cleanups.is_empty() {
            return;
        }
        self.untracked(|| {
            for cleanup in cleanups {
                cleanup();
            }
        });
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Flush if nothing is holding effects back and something is pending.
    pub(crate) fn flush_if_idle(&self) -> Result<()> {
        if self.scheduler.can_flush()
            && self.context.is_empty()
            && self.scheduler.pending_len() > 0
        {
            self.flush()
        } else {
            Ok(())
        }
    }

    fn flush(&self) -> Result<()> {
        let Some(_flushing) = self.scheduler.begin_flush() else {
            return Ok(());
        };
        let cap = self.config.max_flush_iterations;
        let mut rounds = 0;

        while self.scheduler.pending_len() > 0 {
            if rounds == cap {
                let pending = self.scheduler.pending_len();
                warn!(iterations = cap, pending, "effect flush exceeded its round cap");
                return Err(ReactiveError::ScheduledLoopExceeded {
                    iterations: cap,
                    pending,
                });
            }
            rounds += 1;

            let round = self.scheduler.take_round();
            debug!(round = rounds, effects = round.len(), "flush round");
            for (index, &effect) in round.iter().enumerate() {
                if !self.contains(effect) {
                    continue;
                }
                if let Err(err) = catch_reactive(|| self.update_if_necessary(effect)) {
                    warn!(node = %effect, error = %err, "effect failed during flush");
                    self.scheduler
                        .requeue_front(round[index + 1..].iter().copied());
                    self.sweep_deferred();
                    return Err(err);
                }
            }
            self.sweep_deferred();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Disposal
    // ------------------------------------------------------------------

    /// Remove a node now. Effects run their cleanups and leave the queue.
    pub(crate) fn dispose(&self, id: NodeId) {
        let removed = self.arena.borrow_mut().remove(id);
        self.finish_removal(removed);
    }

    /// Remove a node whose last handle dropped. Deferred if the arena is
    /// borrowed right now.
    pub(crate) fn release(&self, id: NodeId) {
        let removed = match self.arena.try_borrow_mut() {
            Ok(mut arena) => arena.remove(id),
            Err(_) => {
                self.deferred.borrow_mut().push(id);
                return;
            }
        };
        self.finish_removal(removed);
    }

    fn finish_removal(&self, removed: Option<Node>) {
        let Some(mut node) = removed else {
            return;
        };
        let id = node.id();
        trace!(node = %id, kind = ?node.kind(), "node removed");
        if let NodeBody::Effect { cleanups, .. } = node.body_mut() {
            self.scheduler.remove(id);
            let cleanups = std::mem::take(cleanups);
            self.run_cleanups(cleanups);
        }
        drop(node);
    }

    fn sweep_deferred(&self) {
        loop {
            let Some(id) = self.deferred.borrow_mut().pop() else {
                break;
            };
            self.release(id);
        }
    }

    /// Turn an error into an unwind that the nearest fallible entry point
    /// catches. At top level there is no such entry point, so it becomes an
    /// ordinary panic.
    pub(crate) fn escalate(&self, err: ReactiveError) -> ! {
        if self.context.is_empty() {
            panic!("{err}");
        }
        panic::panic_any(err)
    }
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        self.mailbox.close();
    }
}

/// Run `f`, converting an unwind that carries a [`ReactiveError`] back into
/// `Err`. Any other panic keeps unwinding.
pub(crate) fn catch_reactive<R>(f: impl FnOnce() -> Result<R>) -> Result<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => match payload.downcast::<ReactiveError>() {
            Ok(err) => Err(*err),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

fn erase_equals<T, E>(equals: E) -> EqualsFn
where
    T: 'static,
    E: Fn(&T, &T) -> bool + 'static,
{
    Rc::new(move |a: &dyn Any, b: &dyn Any| {
        match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
            (Some(a), Some(b)) => equals(a, b),
            _ => false,
        }
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, computeds and
//! effects, plus the runtime that connects them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a computed or effect, the read is recorded as a dependency. When
//! the signal's value changes, everything downstream is marked stale.
//!
//! ## Computeds
//!
//! A Computed is a derived value that caches its result. It re-evaluates
//! only when read after one of its dependencies changed.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change, such as writing to storage or logging.
//!
//! # Implementation Notes
//!
//! Each [`Runtime`] owns an execution context stack. When a computed or
//! effect runs, it is pushed on the stack, and every read made while it is
//! on top is attributed to it. There is no hidden global state: two
//! runtimes never see each other's nodes.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod computed;
mod context;
mod effect;
mod handle;
mod mailbox;
mod runtime;
mod scheduler;
mod signal;

pub use computed::Computed;
pub use effect::Effect;
pub use mailbox::SignalSender;
pub use runtime::Runtime;
pub use signal::{ReadSignal, Signal};

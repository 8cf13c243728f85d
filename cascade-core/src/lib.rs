//! Cascade Core
//!
//! This crate provides a fine-grained reactive dependency-tracking engine.
//! It implements:
//!
//! - Reactive primitives (signals, computed values, effects)
//! - Automatic dependency discovery with dynamic re-subscription
//! - Push-invalidate / pull-recompute consistency with equality cut-off
//! - Batched, glitch-free effect scheduling
//! - Cycle and runaway-effect detection
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the runtime and the typed handles built on it
//! - `graph`: node records and the id-keyed arena holding the dependency graph
//! - `config`: runtime tunables
//! - `error`: the error taxonomy
//!
//! # Example
//!
//! ```rust
//! use cascade_core::Runtime;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let rt = Runtime::new();
//!
//! // Create a signal
//! let count = rt.signal(0);
//!
//! // Create a derived value
//! let doubled = rt.computed({
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! // Create an effect
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let _effect = rt.effect({
//!     let (count, doubled, log) = (count.clone(), doubled.clone(), log.clone());
//!     move || log.borrow_mut().push((count.get(), doubled.get()))
//! })
//! .unwrap();
//!
//! // Update the signal; the effect runs before `set` returns
//! count.set(5).unwrap();
//! assert_eq!(*log.borrow(), vec![(0, 0), (5, 10)]);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{RuntimeConfig, DEFAULT_MAX_FLUSH_ITERATIONS};
pub use error::{ConfigError, ReactiveError, Result};
pub use graph::{DirtyState, NodeId, NodeKind};
pub use reactive::{Computed, Effect, ReadSignal, Runtime, Signal, SignalSender};

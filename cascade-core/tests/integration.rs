//! Integration Tests for the Reactive Runtime
//!
//! These tests verify that signals, computeds, and effects work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Once;

use cascade_core::{DirtyState, ReactiveError, Runtime, RuntimeConfig};

static TRACING: Once = Once::new();

fn runtime() -> Runtime {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
    Runtime::new()
}

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

/// Test that an effect sees every settled value and never an intermediate one.
#[test]
fn sum_effect_logs_settled_values() {
    let rt = runtime();
    let a = rt.signal(2);
    let b = rt.signal(3);
    let sum = rt.computed({
        let (a, b) = (a.clone(), b.clone());
        move || a.get() + b.get()
    });

    let log = Rc::new(RefCell::new(Vec::new()));
    let _effect = rt
        .effect({
            let (sum, log) = (sum.clone(), log.clone());
            move || log.borrow_mut().push(sum.get())
        })
        .unwrap();

    a.set(5).unwrap();
    assert_eq!(*log.borrow(), vec![5, 8]);
}

/// Test that a batch of writes yields exactly one effect run.
#[test]
fn batch_runs_effect_once_with_final_value() {
    let rt = runtime();
    let a = rt.signal(2);
    let b = rt.signal(3);
    let sum = rt.computed({
        let (a, b) = (a.clone(), b.clone());
        move || a.get() + b.get()
    });

    let log = Rc::new(RefCell::new(Vec::new()));
    let _effect = rt
        .effect({
            let (sum, log) = (sum.clone(), log.clone());
            move || log.borrow_mut().push(sum.get())
        })
        .unwrap();

    rt.batch(|| {
        a.set(10).unwrap();
        b.set(20).unwrap();
    })
    .unwrap();
    assert_eq!(*log.borrow(), vec![5, 30]);
}

/// Test that a diamond recomputes its join once and the effect never sees a
/// half-updated pair.
#[test]
fn diamond_is_glitch_free() {
    let rt = runtime();
    let source = rt.signal(1);
    let left = rt.computed({
        let source = source.clone();
        move || source.get() * 2
    });
    let right = rt.computed({
        let source = source.clone();
        move || source.get() * 3
    });
    let join_runs = counter();
    let join = rt.computed({
        let (left, right, join_runs) = (left.clone(), right.clone(), join_runs.clone());
        move || {
            join_runs.set(join_runs.get() + 1);
            (left.get(), right.get())
        }
    });

    let seen = Rc::new(RefCell::new(Vec::new()));
    let _effect = rt
        .effect({
            let (join, seen) = (join.clone(), seen.clone());
            move || seen.borrow_mut().push(join.get())
        })
        .unwrap();

    source.set(2).unwrap();
    source.set(5).unwrap();

    assert_eq!(*seen.borrow(), vec![(2, 3), (4, 6), (10, 15)]);
    assert_eq!(join_runs.get(), 3);
    for &(l, r) in seen.borrow().iter() {
        assert_eq!(l * 3, r * 2);
    }
}

/// Test that a computed which settles on an equal value shields its subscribers.
#[test]
fn equal_recompute_cuts_off_downstream_work() {
    let rt = runtime();
    let discount_code = rt.signal(String::from("WELCOME10"));
    let is_valid = rt.computed({
        let discount_code = discount_code.clone();
        move || discount_code.with(|code| code.starts_with("WELCOME"))
    });
    let effect_runs = counter();
    let _effect = rt
        .effect({
            let (is_valid, effect_runs) = (is_valid.clone(), effect_runs.clone());
            move || {
                is_valid.get();
                effect_runs.set(effect_runs.get() + 1);
            }
        })
        .unwrap();

    discount_code.set("WELCOME20".to_string()).unwrap();
    assert_eq!(effect_runs.get(), 1);
    assert_eq!(is_valid.version().unwrap(), 1);

    discount_code.set("SAVE5".to_string()).unwrap();
    assert_eq!(effect_runs.get(), 2);
    assert!(!is_valid.get());
}

/// Test an invoice pipeline: subtotal, tax and total stay consistent with
/// their inputs at every observation.
#[test]
fn invoice_totals_follow_line_items() {
    let rt = runtime();
    let items = rt.signal(vec![(120.0_f64, 2_u32), (15.5, 4)]);
    let tax_rate = rt.signal(0.2_f64);

    let subtotal = rt.computed({
        let items = items.clone();
        move || {
            items.with(|items| {
                items
                    .iter()
                    .map(|(price, quantity)| price * f64::from(*quantity))
                    .sum::<f64>()
            })
        }
    });
    let tax = rt.computed({
        let (subtotal, tax_rate) = (subtotal.clone(), tax_rate.clone());
        move || subtotal.get() * tax_rate.get()
    });
    let total = rt.computed({
        let (subtotal, tax) = (subtotal.clone(), tax.clone());
        move || subtotal.get() + tax.get()
    });

    let totals = Rc::new(RefCell::new(Vec::new()));
    let _effect = rt
        .effect({
            let (total, totals) = (total.clone(), totals.clone());
            move || totals.borrow_mut().push(total.get())
        })
        .unwrap();
    assert_eq!(subtotal.get(), 302.0);

    rt.batch(|| {
        items
            .update(|items| {
                let mut items = items.clone();
                items.push((10.0, 1));
                items
            })
            .unwrap();
        tax_rate.set(0.1).unwrap();
    })
    .unwrap();

    let totals = totals.borrow();
    assert_eq!(totals.len(), 2);
    assert!((totals[0] - 362.4).abs() < 1e-9);
    assert!((totals[1] - 343.2).abs() < 1e-9);
}

/// Test that a branch not taken is not a dependency.
#[test]
fn conditional_reads_resubscribe() {
    let rt = runtime();
    let show_details = rt.signal(false);
    let summary = rt.signal("3 items");
    let details = rt.signal("keyboard, mouse, cable");

    let runs = counter();
    let label = rt.computed({
        let (show_details, summary, details, runs) = (
            show_details.clone(),
            summary.clone(),
            details.clone(),
            runs.clone(),
        );
        move || {
            runs.set(runs.get() + 1);
            if show_details.get() {
                details.get()
            } else {
                summary.get()
            }
        }
    });

    assert_eq!(label.get(), "3 items");
    assert_eq!(details.subscriber_count().unwrap(), 0);

    details.set("keyboard").unwrap();
    assert_eq!(label.dirty_state().unwrap(), DirtyState::Clean);
    assert_eq!(label.get(), "3 items");
    assert_eq!(runs.get(), 1);

    show_details.set(true).unwrap();
    assert_eq!(label.get(), "keyboard");
    assert_eq!(summary.subscriber_count().unwrap(), 0);
    assert_eq!(details.subscriber_count().unwrap(), 1);
}

/// Test that a cycle is reported as an error to the outermost caller.
#[test]
fn cycle_is_reported_to_the_caller() {
    let rt = runtime();
    let slot: Rc<RefCell<Option<cascade_core::Computed<i32>>>> = Rc::new(RefCell::new(None));
    let first = rt.computed({
        let slot = slot.clone();
        move || match slot.borrow().as_ref() {
            Some(second) => second.get() + 1,
            None => 0,
        }
    });
    let second = rt.computed({
        let first = first.clone();
        move || first.get() + 1
    });
    *slot.borrow_mut() = Some(second.clone());

    assert!(matches!(
        second.try_get(),
        Err(ReactiveError::CyclicDependency { .. })
    ));

    // Break the computed reference cycle.
    slot.borrow_mut().take();
}

/// Test that effects created inside a batch run once when it closes.
#[test]
fn effect_created_inside_batch_runs_immediately_once() {
    let rt = runtime();
    let a = rt.signal(1);
    let runs = counter();

    let effect = rt
        .batch(|| {
            let effect = rt
                .effect({
                    let (a, runs) = (a.clone(), runs.clone());
                    move || {
                        a.get();
                        runs.set(runs.get() + 1);
                    }
                })
                .unwrap();
            a.set(2).unwrap();
            effect
        })
        .unwrap();

    assert_eq!(runs.get(), 2);
    assert_eq!(effect.run_count().unwrap(), 2);
}

/// Test that effects run in the order they were scheduled.
#[test]
fn effects_flush_in_schedule_order() {
    let rt = runtime();
    let a = rt.signal(0);
    let b = rt.signal(0);
    let order = Rc::new(RefCell::new(Vec::new()));

    let _on_b = rt
        .effect({
            let (b, order) = (b.clone(), order.clone());
            move || order.borrow_mut().push(("b", b.get()))
        })
        .unwrap();
    let _on_a = rt
        .effect({
            let (a, order) = (a.clone(), order.clone());
            move || order.borrow_mut().push(("a", a.get()))
        })
        .unwrap();
    order.borrow_mut().clear();

    rt.batch(|| {
        a.set(1).unwrap();
        b.set(1).unwrap();
    })
    .unwrap();
    assert_eq!(*order.borrow(), vec![("a", 1), ("b", 1)]);
}

/// Test that an effect writing another signal chains into a second round.
#[test]
fn effect_writes_cascade_to_other_effects() {
    let rt = runtime();
    let celsius = rt.signal(0.0_f64);
    let fahrenheit = rt.signal(32.0_f64);
    let readings = Rc::new(RefCell::new(Vec::new()));

    let _convert = rt
        .effect({
            let (celsius, fahrenheit) = (celsius.clone(), fahrenheit.clone());
            move || fahrenheit.set(celsius.get() * 9.0 / 5.0 + 32.0).unwrap()
        })
        .unwrap();
    let _display = rt
        .effect({
            let (fahrenheit, readings) = (fahrenheit.clone(), readings.clone());
            move || readings.borrow_mut().push(fahrenheit.get())
        })
        .unwrap();

    celsius.set(100.0).unwrap();
    assert_eq!(*readings.borrow(), vec![32.0, 212.0]);
}

/// Test that a runaway loop is stopped by the configured cap.
#[test]
fn runaway_effects_hit_configured_cap() {
    let config = RuntimeConfig::from_json_str(r#"{ "max_flush_iterations": 8 }"#).unwrap();
    let rt = Runtime::with_config(config).unwrap();
    let tick = rt.signal(0_u64);
    let tock = rt.signal(0_u64);

    let _forward = rt
        .effect({
            let (tick, tock) = (tick.clone(), tock.clone());
            move || tock.set(tick.get() + 1).unwrap()
        })
        .unwrap();
    let result = rt.effect({
        let (tick, tock) = (tick.clone(), tock.clone());
        move || tick.set(tock.get() + 1).unwrap()
    });

    assert!(matches!(
        result,
        Err(ReactiveError::ScheduledLoopExceeded { iterations: 8, .. })
    ));
}

/// Test that values sent from other threads are applied in one batch.
#[test]
fn deliver_applies_cross_thread_values_as_one_batch() {
    let rt = runtime();
    let a = rt.signal(0_i64);
    let b = rt.signal(0_i64);
    let log = Rc::new(RefCell::new(Vec::new()));
    let _effect = rt
        .effect({
            let (a, b, log) = (a.clone(), b.clone(), log.clone());
            move || log.borrow_mut().push(a.get() + b.get())
        })
        .unwrap();

    let (send_a, send_b) = (a.sender().unwrap(), b.sender().unwrap());
    let worker = std::thread::spawn(move || {
        for value in 1..=3 {
            assert!(send_a.send(value));
        }
        assert!(send_b.send(10));
    });
    worker.join().unwrap();

    assert_eq!(rt.deliver().unwrap(), 4);
    assert_eq!(*log.borrow(), vec![0, 13]);
    assert_eq!(rt.deliver().unwrap(), 0);
}

/// Test that sends to a disposed signal are dropped at delivery.
#[test]
fn deliver_skips_disposed_signals() {
    let rt = runtime();
    let live = rt.signal(0);
    let gone = rt.signal(0);
    let (to_live, to_gone) = (live.sender().unwrap(), gone.sender().unwrap());

    gone.dispose();
    to_gone.send(5);
    to_live.send(7);

    assert_eq!(rt.deliver().unwrap(), 1);
    assert_eq!(live.get(), 7);
}

/// Test that senders report failure once the runtime is gone.
#[test]
fn sender_outliving_runtime_is_rejected() {
    let rt = runtime();
    let signal = rt.signal(0);
    let sender = signal.sender().unwrap();
    drop(rt);

    assert!(!sender.send(1));
}

/// Test that a computed reading a disposed signal reports a stale read.
#[test]
fn disposed_dependency_surfaces_as_stale_read() {
    let rt = runtime();
    let price = rt.signal(10);
    let doubled = rt.computed({
        let price = price.clone();
        move || price.get() * 2
    });
    assert_eq!(doubled.get(), 20);

    let id = price.id();
    price.dispose();
    assert_eq!(
        doubled.try_get(),
        Err(ReactiveError::StaleReadAfterDispose { node: id })
    );
}

/// Test that the graph is released when the handles go away.
#[test]
fn dropping_handles_frees_the_graph() {
    let rt = runtime();
    {
        let a = rt.signal(1);
        let doubled = rt.computed({
            let a = a.clone();
            move || a.get() * 2
        });
        let _effect = rt
            .effect({
                let doubled = doubled.clone();
                move || {
                    doubled.get();
                }
            })
            .unwrap();
        assert_eq!(rt.node_count(), 3);
    }
    assert_eq!(rt.node_count(), 0);
}

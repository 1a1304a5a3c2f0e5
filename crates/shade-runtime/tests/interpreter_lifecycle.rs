#![forbid(unsafe_code)]

//! End-to-end lifecycle of an interpreter over the scripted counter.

use std::cell::Cell;
use std::rc::Rc;

use shade_core::{EventObject, Mode, ServiceError, StateValue, WorkingStatus};
use shade_harness::fixtures::{Counter, counter_config, counter_machine};
use shade_harness::{ScriptOptions, ScriptedMachine};
use shade_runtime::{Interpreter, InterpreterError, Lifecycle};

fn counter() -> Interpreter<ScriptedMachine<Counter>> {
    Interpreter::new(counter_machine(), counter_config())
}

// ═════════════════════════════════════════════════════════════════════════
// Counting scenario
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn counts_while_idle_then_settles_in_final() {
    let interpreter = counter();
    let iterator = interpreter.context().select(|c| c.iterator);

    interpreter.start().unwrap();
    let service = interpreter.service().unwrap();
    service.advance(10);
    assert_eq!(iterator.get(), 10);
    assert!(interpreter.matches(&["idle"]));

    interpreter.send("NEXT".into()).unwrap();
    assert!(interpreter.matches(&["final"]));
    assert!(!interpreter.matches(&["idle"]));

    service.advance(10);
    assert_eq!(iterator.get(), 10);
}

#[test]
fn snapshot_before_start_reflects_configuration() {
    let interpreter = counter();
    let snapshot = interpreter.snapshot();

    assert_eq!(snapshot.context, Counter { iterator: 0 });
    assert_eq!(snapshot.value, StateValue::atomic("idle"));
    assert_eq!(snapshot.status, WorkingStatus::Idle);
    assert_eq!(snapshot.event, EventObject::Init);
    assert!(snapshot.tags.is_none());
    assert!(snapshot.ui_thread.is_none());
    assert_eq!(interpreter.lifecycle(), Lifecycle::Idle);
}

#[test]
fn partial_pushes_retain_other_fields() {
    let interpreter = counter();
    interpreter.start().unwrap();
    interpreter.service().unwrap().advance(3);

    let snapshot = interpreter.snapshot();
    assert_eq!(snapshot.context.iterator, 3);
    assert_eq!(snapshot.value, StateValue::atomic("idle"));
    assert_eq!(snapshot.status, WorkingStatus::Working);
    assert_eq!(snapshot.event, EventObject::Init);
}

#[test]
fn equality_suppresses_recomputation_downstream() {
    let interpreter = counter();
    let bucket = interpreter.state_by(|s| s.context.iterator, |a, b| a / 5 == b / 5);
    interpreter.start().unwrap();
    let service = interpreter.service().unwrap();

    assert_eq!(bucket.get(), 0);
    let version = bucket.version();

    service.advance(4);
    assert_eq!(bucket.get(), 0, "values in the same bucket keep the old one");
    assert_eq!(bucket.version(), version);

    service.advance(1);
    assert_eq!(bucket.get(), 5);
    assert!(bucket.version() > version);
}

#[test]
fn subscribers_see_every_change() {
    let interpreter = counter();
    let calls = Rc::new(Cell::new(0));
    let sink = Rc::clone(&calls);
    let _sub = interpreter.subscribe(move |_| sink.set(sink.get() + 1));

    interpreter.start().unwrap();
    assert_eq!(calls.get(), 1);
    interpreter.service().unwrap().advance(3);
    assert_eq!(calls.get(), 4);
}

#[test]
fn subscriber_may_send_back() {
    let interpreter = Rc::new(counter());
    let weak = Rc::downgrade(&interpreter);
    let _sub = interpreter.subscribe(move |s| {
        if s.context.iterator == 3
            && let Some(interpreter) = weak.upgrade()
        {
            interpreter.send("NEXT".into()).unwrap();
        }
    });

    interpreter.start().unwrap();
    interpreter.service().unwrap().advance(6);

    assert!(interpreter.matches(&["final"]));
    assert_eq!(interpreter.context().select(|c| c.iterator).get(), 3);
}

// ═════════════════════════════════════════════════════════════════════════
// Delegation
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn service_errors_pass_through() {
    let interpreter = counter();
    assert_eq!(
        interpreter.send("NEXT".into()),
        Err(InterpreterError::Service(ServiceError::NotRunning {
            status: WorkingStatus::Idle
        }))
    );
    assert_eq!(
        interpreter.pause(),
        Err(InterpreterError::Service(ServiceError::NotRunning {
            status: WorkingStatus::Idle
        }))
    );

    interpreter.start().unwrap();
    assert_eq!(
        interpreter.send("JUMP".into()),
        Err(InterpreterError::Service(ServiceError::UnknownEvent {
            name: "JUMP".into()
        }))
    );
}

#[test]
fn pause_resume_stop() {
    let interpreter = counter();
    interpreter.start().unwrap();
    let service = interpreter.service().unwrap();

    interpreter.pause().unwrap();
    assert_eq!(interpreter.lifecycle(), Lifecycle::Paused);
    assert_eq!(interpreter.status(), WorkingStatus::Paused);
    service.advance(3);
    assert_eq!(interpreter.snapshot().context.iterator, 0);

    interpreter.resume().unwrap();
    assert_eq!(interpreter.lifecycle(), Lifecycle::Started);
    assert_eq!(interpreter.status(), WorkingStatus::Working);
    service.advance(2);
    assert_eq!(interpreter.snapshot().context.iterator, 2);

    interpreter.stop().unwrap();
    assert_eq!(interpreter.lifecycle(), Lifecycle::Stopped);
    assert_eq!(interpreter.status(), WorkingStatus::Stopped);
    assert_eq!(interpreter.snapshot().context.iterator, 2);
}

#[test]
fn configuration_is_exposed() {
    let machine = counter_machine();
    let config = counter_config().mode(Mode::Strict).exact(true);
    let interpreter: Interpreter<ScriptedMachine<Counter>> = Interpreter::new(machine, config);

    assert_eq!(interpreter.mode(), Mode::Strict);
    assert!(interpreter.config().exact);
    let service = interpreter.service().unwrap();
    assert_eq!(service.mode(), Mode::Strict);
    assert!(service.is_exact());
    assert_eq!(interpreter.all_values(), vec!["final", "idle"]);
}

// ═════════════════════════════════════════════════════════════════════════
// Options
// ═════════════════════════════════════════════════════════════════════════

fn double_step() -> ScriptOptions<Counter> {
    ScriptOptions::new().action("inc", |c: &Counter| Counter {
        iterator: c.iterator + 2,
    })
}

#[test]
fn add_options_rebinds_actions_in_place() {
    let interpreter = counter();
    assert!(interpreter.options().is_none());

    let merged = interpreter.add_options(double_step()).unwrap();
    assert_eq!(merged.names(), vec!["inc", "init"]);
    assert!(interpreter.options().is_some());

    interpreter.start().unwrap();
    interpreter.service().unwrap().advance(3);
    assert_eq!(interpreter.snapshot().context.iterator, 6);
}

#[test]
fn provide_options_forks_independently() {
    let base = counter();
    let fork = base.provide_options(double_step()).unwrap();

    base.start().unwrap();
    fork.start().unwrap();
    base.service().unwrap().advance(3);
    fork.service().unwrap().advance(3);

    assert_eq!(base.context().select(|c| c.iterator).get(), 3);
    assert_eq!(fork.context().select(|c| c.iterator).get(), 6);
    assert!(base.options().is_none());
    assert!(fork.options().is_some());
    assert_eq!(fork.mode(), base.mode());

    fork.send("NEXT".into()).unwrap();
    assert!(fork.matches(&["final"]));
    assert!(base.matches(&["idle"]));
}

#[test]
fn fork_does_not_inherit_ui_signals() {
    let base = counter();
    base.register_ui_signal("input", serde_json::json!("typed")).unwrap();
    let fork = base.provide_options(ScriptOptions::new()).unwrap();

    assert!(base.is_ui_used());
    assert!(!fork.is_ui_used());
}

#[test]
fn fork_with_ui_registers_its_own_signals() {
    let base = counter();
    base.register_ui_signal("input", serde_json::json!("base")).unwrap();
    let fork = base
        .provide_options_with_ui(double_step(), [("open", serde_json::json!(true))])
        .unwrap();

    assert_eq!(fork.ui_keys(), vec!["open"]);
    assert_eq!(base.ui_keys(), vec!["input"]);
    fork.start().unwrap();
    fork.service().unwrap().advance(1);
    assert_eq!(fork.snapshot().context.iterator, 2);
}

// ═════════════════════════════════════════════════════════════════════════
// Disposal
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn dispose_is_final() {
    let interpreter = counter();
    let iterator = interpreter.context().select(|c| c.iterator);
    interpreter.start().unwrap();
    let service = interpreter.service().unwrap();
    service.advance(2);
    assert_eq!(iterator.get(), 2);

    interpreter.dispose();

    assert_eq!(interpreter.lifecycle(), Lifecycle::Disposed);
    assert!(service.is_disposed());
    assert_eq!(service.listener_count(), 0);
    assert!(!service.tick());
    assert!(iterator.try_get().unwrap_err().is_disposed());
    assert!(interpreter.start().unwrap_err().is_disposed());
    assert!(interpreter.send("NEXT".into()).unwrap_err().is_disposed());
    assert!(matches!(interpreter.service(), Err(e) if e.is_disposed()));
    assert!(matches!(
        interpreter.register_ui_signal("input", serde_json::Value::Null),
        Err(e) if e.is_disposed()
    ));
    assert!(interpreter.provide_options(ScriptOptions::new()).unwrap_err().is_disposed());
    assert!(interpreter.options().is_none());

    // Second call is a no-op.
    interpreter.dispose();
    assert_eq!(interpreter.lifecycle(), Lifecycle::Disposed);
}

#[test]
#[should_panic(expected = "disposed")]
fn selector_read_after_dispose_panics() {
    let interpreter = counter();
    let iterator = interpreter.context().select(|c| c.iterator);
    interpreter.dispose();
    let _ = iterator.get();
}

#[test]
fn dispose_async_completes() {
    let interpreter = counter();
    interpreter.start().unwrap();
    let service = interpreter.service().unwrap();

    pollster::block_on(interpreter.dispose_async());

    assert_eq!(interpreter.lifecycle(), Lifecycle::Disposed);
    assert!(service.is_disposed());
    assert_eq!(service.status(), WorkingStatus::Stopped);
}

#[test]
fn dispose_of_never_started_interpreter() {
    let interpreter = counter();
    let service = interpreter.service().unwrap();
    interpreter.dispose();
    assert!(service.is_disposed());
}

#[test]
fn drop_disposes() {
    let interpreter = counter();
    interpreter.start().unwrap();
    let service = interpreter.service().unwrap();
    drop(interpreter);
    assert!(service.is_disposed());
}

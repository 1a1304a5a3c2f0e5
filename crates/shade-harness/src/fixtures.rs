#![forbid(unsafe_code)]

//! Ready-made machines shared by the test suites.

use serde::Serialize;
use shade_core::{InterpreterConfig, StateValue};

use crate::machine::{ScriptedMachine, StateSpec};

/// Context of [`counter_machine`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Counter {
    pub iterator: i64,
}

/// `idle` increments `iterator` on every tick until `NEXT` moves it to
/// `final`. The `init` entry action resets the counter to zero.
#[must_use]
pub fn counter_machine() -> ScriptedMachine<Counter> {
    ScriptedMachine::builder("idle")
        .state(StateSpec::new("idle").activity("inc").on("NEXT", "final"))
        .state(StateSpec::new("final"))
        .entry("init")
        .action("init", |_: &Counter| Counter { iterator: 0 })
        .action("inc", |c: &Counter| Counter {
            iterator: c.iterator + 1,
        })
        .build()
}

#[must_use]
pub fn counter_config() -> InterpreterConfig<Counter, ()> {
    InterpreterConfig::new(Counter { iterator: 0 }, ())
}

/// Context of [`fetcher_machine`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Fetcher {
    pub attempts: i64,
    pub data: Vec<String>,
}

/// A machine with a compound `working` state.
///
/// ```text
/// idle --FETCH--> working {fetch: pending, ui: busy}   tags: busy
///      --DONE---> working {fetch: done, ui: idle}      tags: busy, loaded
///      --RESET--> idle
/// ```
///
/// While pending, every tick counts an attempt. `DONE` stores a payload.
#[must_use]
pub fn fetcher_machine() -> ScriptedMachine<Fetcher> {
    let working = |fetch: &str, ui: &str| {
        StateValue::compound([(
            "working",
            StateValue::compound([
                ("fetch", StateValue::atomic(fetch)),
                ("ui", StateValue::atomic(ui)),
            ]),
        )])
    };
    ScriptedMachine::builder("idle")
        .state(StateSpec::new("idle").on("FETCH", "pending"))
        .state(
            StateSpec::new("pending")
                .value(working("pending", "busy"))
                .tag("busy")
                .activity("attempt")
                .on_with("DONE", "loaded", ["store"]),
        )
        .state(
            StateSpec::new("loaded")
                .value(working("done", "idle"))
                .tag("busy")
                .tag("loaded")
                .on("RESET", "idle"),
        )
        .action("attempt", |f: &Fetcher| Fetcher {
            attempts: f.attempts + 1,
            ..f.clone()
        })
        .action("store", |f: &Fetcher| {
            let mut next = f.clone();
            next.data.push(format!("payload-{}", f.attempts));
            next
        })
        .build()
}

#[must_use]
pub fn fetcher_config() -> InterpreterConfig<Fetcher, ()> {
    InterpreterConfig::new(Fetcher::default(), ())
}

#![forbid(unsafe_code)]

//! Declarative scripted machines.
//!
//! A [`ScriptedMachine`] is a flat list of named states. Each state reports
//! a [`StateValue`] (atomic or compound), a tag set, event transitions and
//! activities. Activities are action names run on every
//! [`tick`](crate::ScriptedService::tick) while the state is current.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::rc::Rc;

use serde::Serialize;
use shade_core::{InterpreterConfig, Machine, StateValue, decompose_raw};

use crate::options::ScriptOptions;
use crate::service::ScriptedService;

/// Event understood by scripted machines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ScriptEvent {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ScriptEvent {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

impl From<&str> for ScriptEvent {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) target: String,
    pub(crate) actions: Vec<String>,
}

/// One state of a scripted machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSpec {
    pub(crate) name: String,
    pub(crate) value: StateValue,
    pub(crate) tags: Vec<String>,
    pub(crate) on: BTreeMap<String, Transition>,
    pub(crate) activities: Vec<String>,
}

impl StateSpec {
    /// A state reporting the atomic value `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: StateValue::atomic(name.clone()),
            name,
            tags: Vec::new(),
            on: BTreeMap::new(),
            activities: Vec::new(),
        }
    }

    /// Report `value` instead of the state name.
    #[must_use]
    pub fn value(mut self, value: impl Into<StateValue>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Move to `target` on `event`.
    #[must_use]
    pub fn on(self, event: impl Into<String>, target: impl Into<String>) -> Self {
        self.on_with(event, target, std::iter::empty::<String>())
    }

    /// Move to `target` on `event`, running `actions` first.
    #[must_use]
    pub fn on_with<S: Into<String>>(
        mut self,
        event: impl Into<String>,
        target: impl Into<String>,
        actions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.on.insert(
            event.into(),
            Transition {
                target: target.into(),
                actions: actions.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Run `action` on every tick while this state is current.
    #[must_use]
    pub fn activity(mut self, action: impl Into<String>) -> Self {
        self.activities.push(action.into());
        self
    }
}

pub(crate) struct Definition<C> {
    pub(crate) initial: String,
    pub(crate) states: BTreeMap<String, StateSpec>,
    pub(crate) entry: Vec<String>,
    pub(crate) options: ScriptOptions<C>,
}

impl<C> Definition<C> {
    pub(crate) fn state(&self, name: &str) -> Option<&StateSpec> {
        self.states.get(name)
    }

    /// Whether any state reacts to `kind`.
    pub(crate) fn knows_event(&self, kind: &str) -> bool {
        self.states.values().any(|s| s.on.contains_key(kind))
    }
}

/// Builder for [`ScriptedMachine`].
pub struct MachineBuilder<C> {
    initial: String,
    states: Vec<StateSpec>,
    entry: Vec<String>,
    options: ScriptOptions<C>,
}

impl<C> MachineBuilder<C> {
    #[must_use]
    pub fn state(mut self, state: StateSpec) -> Self {
        self.states.push(state);
        self
    }

    /// Run `action` once when the service starts.
    #[must_use]
    pub fn entry(mut self, action: impl Into<String>) -> Self {
        self.entry.push(action.into());
        self
    }

    /// Register a base action implementation.
    #[must_use]
    pub fn action(mut self, name: impl Into<String>, f: impl Fn(&C) -> C + 'static) -> Self {
        self.options = self.options.action(name, f);
        self
    }

    /// Finish the definition.
    ///
    /// # Panics
    ///
    /// Panics if the initial state or a transition target is not declared.
    /// Machine definitions are static test data.
    #[must_use]
    pub fn build(self) -> ScriptedMachine<C> {
        let states: BTreeMap<String, StateSpec> = self
            .states
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        assert!(
            states.contains_key(&self.initial),
            "initial state `{}` is not declared",
            self.initial
        );
        for state in states.values() {
            for (event, transition) in &state.on {
                assert!(
                    states.contains_key(&transition.target),
                    "`{}` on {event} targets undeclared state `{}`",
                    state.name,
                    transition.target
                );
            }
        }
        ScriptedMachine {
            definition: Rc::new(Definition {
                initial: self.initial,
                states,
                entry: self.entry,
                options: self.options,
            }),
        }
    }
}

/// A scripted, deterministic machine definition.
///
/// Cloning is cheap and shares the definition.
pub struct ScriptedMachine<C> {
    pub(crate) definition: Rc<Definition<C>>,
}

impl<C> Clone for ScriptedMachine<C> {
    fn clone(&self) -> Self {
        Self {
            definition: Rc::clone(&self.definition),
        }
    }
}

impl<C> Debug for ScriptedMachine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedMachine")
            .field("initial", &self.definition.initial)
            .field("states", &self.definition.states.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> ScriptedMachine<C> {
    /// Start a definition whose initial state is `initial`.
    #[must_use]
    pub fn builder(initial: impl Into<String>) -> MachineBuilder<C> {
        MachineBuilder {
            initial: initial.into(),
            states: Vec::new(),
            entry: Vec::new(),
            options: ScriptOptions::new(),
        }
    }

    #[must_use]
    pub fn initial_value(&self) -> StateValue {
        self.definition
            .state(&self.definition.initial)
            .map(|s| s.value.clone())
            .unwrap_or_default()
    }
}

impl<C: Clone + PartialEq + Debug + 'static> Machine for ScriptedMachine<C> {
    type Context = C;
    type PrivateContext = ();
    type Event = ScriptEvent;
    type Options = ScriptOptions<C>;
    type Service = ScriptedService<C>;

    fn interpret(&self, config: &InterpreterConfig<C, ()>) -> ScriptedService<C> {
        ScriptedService::new(Rc::clone(&self.definition), config)
    }

    fn state_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for state in self.definition.states.values() {
            for path in decompose_raw(&state.value) {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }
}

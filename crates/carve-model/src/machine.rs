use serde::{Deserialize, Serialize};

use crate::formula::{Assignment, Predicate, Type};

/// Label of the distinguished initialisation event.
pub const INITIALISATION: &str = "INITIALISATION";

/// Whether a variable of a decomposed machine is shared with other
/// sub-machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nature {
    #[default]
    Private,
    Shared,
}

/// Whether an event of a decomposed machine belongs to the sub-machine or
/// stands in for an event of another sub-machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Externality {
    #[default]
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    #[default]
    Ordinary,
    Convergent,
    Anticipated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    /// Type as established by the static checker, when known.
    #[serde(default)]
    pub ty: Option<Type>,
    #[serde(default)]
    pub nature: Nature,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            ty: None,
            nature: Nature::Private,
        }
    }

    pub fn typed(name: impl Into<String>, ty: Type) -> Self {
        Self {
            ty: Some(ty),
            ..Self::new(name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invariant {
    pub label: String,
    pub predicate: Predicate,
    #[serde(default)]
    pub theorem: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guard {
    pub label: String,
    pub predicate: Predicate,
    #[serde(default)]
    pub theorem: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Witness {
    pub label: String,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub label: String,
    pub assignment: Assignment,
}

/// A guarded-action transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub label: String,
    #[serde(default)]
    pub convergence: Convergence,
    /// An extended event inherits the parameters, guards and actions of the
    /// event it refines.
    #[serde(default)]
    pub extended: bool,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub guards: Vec<Guard>,
    #[serde(default)]
    pub witnesses: Vec<Witness>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub refines: Option<String>,
    #[serde(default)]
    pub externality: Externality,
}

impl Event {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            convergence: Convergence::Ordinary,
            extended: false,
            parameters: Vec::new(),
            guards: Vec::new(),
            witnesses: Vec::new(),
            actions: Vec::new(),
            refines: None,
            externality: Externality::Internal,
        }
    }

    pub fn initialisation() -> Self {
        Self::new(INITIALISATION)
    }

    pub fn is_initialisation(&self) -> bool {
        self.label == INITIALISATION
    }

    pub fn with_guard(mut self, label: impl Into<String>, predicate: Predicate) -> Self {
        self.guards.push(Guard {
            label: label.into(),
            predicate,
            theorem: false,
        });
        self
    }

    pub fn with_action(mut self, label: impl Into<String>, assignment: Assignment) -> Self {
        self.actions.push(Action {
            label: label.into(),
            assignment,
        });
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    /// Mark this event as extending the abstract event `label`.
    pub fn extending(mut self, label: impl Into<String>) -> Self {
        self.refines = Some(label.into());
        self.extended = true;
        self
    }

    pub fn refining(mut self, label: impl Into<String>) -> Self {
        self.refines = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub name: String,
    #[serde(default)]
    pub refines: Option<String>,
    #[serde(default)]
    pub sees: Vec<String>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub invariants: Vec<Invariant>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refines: None,
            sees: Vec::new(),
            variables: Vec::new(),
            invariants: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn event(&self, label: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.label == label)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    pub fn initialisation(&self) -> Option<&Event> {
        self.event(INITIALISATION)
    }
}

use serde::{Deserialize, Serialize};

use crate::formula::{Predicate, Type};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    #[serde(default)]
    pub ty: Option<Type>,
}

impl Constant {
    pub fn typed(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axiom {
    pub label: String,
    pub predicate: Predicate,
    #[serde(default)]
    pub theorem: bool,
}

/// Static part of a model: carrier sets, constants and their axioms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub sets: Vec<String>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    #[serde(default)]
    pub axioms: Vec<Axiom>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: Vec::new(),
            sets: Vec::new(),
            constants: Vec::new(),
            axioms: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.constants.is_empty() && self.axioms.is_empty()
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }
}

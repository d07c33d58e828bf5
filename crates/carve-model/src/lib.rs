#![doc = include_str!("../README.md")]

//! Carve model layer.
//!
//! This crate defines the Event-B formula trees with source spans, the
//! printer that renders them, the machine/context data model, and the
//! `Project` arena in which refinement and visibility links are resolved.

pub mod ast;
pub mod builder;
pub mod context;
pub mod errors;
pub mod formula;
pub mod machine;
pub mod printer;
pub mod project;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;

pub use formula::{Assignment, Predicate, Type};
pub use project::{MachineId, Project};

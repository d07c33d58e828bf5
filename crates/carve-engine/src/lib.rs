#![doc = include_str!("../README.md")]

//! Carve decomposition engine.
//!
//! This crate splits an Event-B machine into sub-machines along a partition
//! of its events: formula analysis, refinement flattening, event
//! classification, action projection, the cached partition model, the
//! staged sub-machine builder and the orchestrator, plus the repository,
//! type and progress ports they run against.

pub mod action;
pub mod analyzer;
pub mod builder;
pub mod classify;
pub mod errors;
pub mod flatten;
pub mod options;
pub mod oracle;
pub mod orchestrator;
pub mod partition;
pub mod progress;
pub mod repository;

pub use errors::DecompositionError;
pub use options::{ContextMode, DecompositionManifest, DecompositionOptions};
pub use orchestrator::{DecompositionReport, Decomposer};
pub use partition::{Decomposition, SubModel};

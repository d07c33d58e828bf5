#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use carve_model::errors::ModelError;

use crate::builder::BuildStage;

/// Why an assignment cannot be decomposed. Raised only for trees that
/// violate the shape contract of [`carve_model::ast::Assign`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("assignment `{text}` assigns no identifier")]
    NothingAssigned { text: String },
    #[error("assignment `{text}` assigns {assigned} identifiers but has {values} values")]
    ArityMismatch {
        text: String,
        assigned: usize,
        values: usize,
    },
    #[error("membership assignment `{text}` must assign exactly one identifier, found {assigned}")]
    MembershipArity { text: String, assigned: usize },
    #[error("rebuilt assignment does not fit its text: {0}")]
    Rebuild(String),
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("artifact '{0}' not found")]
    NotFound(String),
    #[error("artifact '{name}' is a {found}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("artifact '{0}' was written before it was created")]
    NotCreated(String),
    #[error("'{0}' cannot be used as an artifact or project name")]
    InvalidName(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum DecompositionError {
    #[error("Event '{event}' of machine '{machine}' extends '{abstract_label}', which cannot be resolved; treated as already flat")]
    #[diagnostic(code(carve::decompose::unresolvable_refinement), severity(Warning))]
    UnresolvableRefinement {
        machine: String,
        event: String,
        abstract_label: String,
    },

    #[error("Sub-model '{sub_model}': action '{action}' of event '{event}' has an unsupported shape: {source}")]
    #[diagnostic(
        code(carve::decompose::unsupported_assignment_shape),
        help("assignments must be `v ≔ E`, `v :∈ S` or `v :∣ P` with matching arity")
    )]
    UnsupportedAssignmentShape {
        sub_model: String,
        event: String,
        action: String,
        #[source]
        source: ShapeError,
    },

    #[error("Sub-model '{sub_model}': no type known for '{identifier}'; typing predicate omitted")]
    #[diagnostic(
        code(carve::decompose::missing_type),
        severity(Warning),
        help("run the static checker on the source model so that types are available")
    )]
    MissingType {
        sub_model: String,
        identifier: String,
    },

    #[error("Repository failure while building '{artifact}': {source}")]
    #[diagnostic(code(carve::decompose::repository))]
    Repository {
        artifact: String,
        #[source]
        source: RepositoryError,
    },

    #[error("Invalid partition:\n{}", .problems.join("\n"))]
    #[diagnostic(code(carve::decompose::invalid_partition))]
    InvalidPartition { problems: Vec<String> },

    #[error("Unknown machine '{0}'")]
    #[diagnostic(code(carve::decompose::unknown_machine))]
    UnknownMachine(String),

    #[error("Sub-model '{sub_model}': stage {attempted:?} requires stage {expected:?}, but the build is at {actual:?}")]
    #[diagnostic(code(carve::decompose::stage_order))]
    StageOrder {
        sub_model: String,
        attempted: BuildStage,
        expected: BuildStage,
        actual: BuildStage,
    },

    #[error("Model error: {0}")]
    #[diagnostic(code(carve::decompose::model))]
    Model(#[from] ModelError),
}

impl DecompositionError {
    /// Recoverable errors are reported as warnings and do not stop a run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DecompositionError::UnresolvableRefinement { .. }
                | DecompositionError::MissingType { .. }
        )
    }

    pub(crate) fn repository(artifact: impl Into<String>, source: RepositoryError) -> Self {
        DecompositionError::Repository {
            artifact: artifact.into(),
            source,
        }
    }
}

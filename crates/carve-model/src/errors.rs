#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("Span {start}..{end} does not fit formula text `{text}`")]
    #[diagnostic(
        code(carve::model::span_out_of_bounds),
        help("spans are byte offsets into the formula text and must fall on character boundaries")
    )]
    SpanOutOfBounds {
        start: usize,
        end: usize,
        text: String,
    },

    #[error("Duplicate {kind} '{name}'")]
    #[diagnostic(code(carve::model::duplicate_artifact))]
    DuplicateArtifact { kind: &'static str, name: String },

    #[error("Duplicate event label '{label}' in machine '{machine}'")]
    #[diagnostic(code(carve::model::duplicate_event))]
    DuplicateEvent { machine: String, label: String },

    #[error("Refinement cycle through machine '{machine}'")]
    #[diagnostic(
        code(carve::model::refinement_cycle),
        help("a machine may not (transitively) refine itself")
    )]
    RefinementCycle { machine: String },
}

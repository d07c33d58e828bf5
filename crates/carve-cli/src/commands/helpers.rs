// Shared helpers for the command handlers: argument parsing and loading of
// the project and manifest files.

use std::fs;
use std::path::Path;

use miette::{miette, IntoDiagnostic, WrapErr};

use carve_engine::{ContextMode, DecompositionManifest};
use carve_model::project::ProjectFile;
use carve_model::Project;

use crate::cli::OutputFormat;

pub(crate) fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(miette!("Unknown output format: {other}. Use 'text' or 'json'.")),
    }
}

pub(crate) fn parse_context_mode(raw: &str) -> miette::Result<ContextMode> {
    match raw {
        "copy" => Ok(ContextMode::Copy),
        "flattened" => Ok(ContextMode::MinimalFlattened),
        other => Err(miette!("Unknown context mode: {other}. Use 'copy' or 'flattened'.")),
    }
}

pub(crate) fn load_project(path: &Path) -> miette::Result<Project> {
    let raw = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read project {}", path.display()))?;
    let file: ProjectFile = serde_json::from_str(&raw)
        .into_diagnostic()
        .wrap_err_with(|| format!("Invalid project file {}", path.display()))?;
    let project = Project::from_file(file)?;
    tracing::info!(
        path = %path.display(),
        machines = project.machines().len(),
        contexts = project.contexts().len(),
        "Loaded project"
    );
    Ok(project)
}

pub(crate) fn load_manifest(path: &Path) -> miette::Result<DecompositionManifest> {
    let raw = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read manifest {}", path.display()))?;
    let manifest: DecompositionManifest = serde_json::from_str(&raw)
        .into_diagnostic()
        .wrap_err_with(|| format!("Invalid manifest {}", path.display()))?;
    let errors = manifest.validate();
    if !errors.is_empty() {
        return Err(miette!(
            "Manifest {} is invalid:\n  - {}",
            path.display(),
            errors.join("\n  - ")
        ));
    }
    Ok(manifest)
}

pub(crate) fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".into()
    } else {
        items.join(", ")
    }
}

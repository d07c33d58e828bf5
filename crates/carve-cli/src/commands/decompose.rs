// Command handler for: Decompose

use std::path::Path;

use miette::IntoDiagnostic;

use carve_engine::oracle::DeclaredTypes;
use carve_engine::progress::{CancellationToken, LoggingProgress};
use carve_engine::repository::DirectoryRepository;
use carve_engine::{Decomposer, DecompositionReport};

use crate::cli::OutputFormat;
use crate::{join_or_dash, load_manifest, load_project, parse_context_mode, parse_output_format};

pub(crate) fn run_decompose_command(
    project_path: &Path,
    manifest_path: &Path,
    out: &Path,
    context_mode: Option<&str>,
    separate_projects: bool,
    format: &str,
) -> miette::Result<()> {
    let output_format = parse_output_format(format)?;
    let project = load_project(project_path)?;
    let manifest = load_manifest(manifest_path)?;

    let mut options = manifest.options.clone();
    if let Some(raw) = context_mode {
        options.context_mode = parse_context_mode(raw)?;
    }
    if separate_projects {
        options.separate_projects = true;
    }

    let mut decomposition = manifest.to_decomposition(&project)?;
    let oracle = DeclaredTypes::new(&project);
    let mut repository = DirectoryRepository::new(out);
    let mut progress = LoggingProgress::new(CancellationToken::new());
    let report = Decomposer::new(&project, &mut repository, &oracle, options)
        .decompose(&mut decomposition, &mut progress)?;

    match output_format {
        OutputFormat::Text => print!("{}", render_report_text(&manifest.machine, out, &report)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
    }
    Ok(())
}

fn render_report_text(machine: &str, out: &Path, report: &DecompositionReport) -> String {
    let mut text = format!(
        "Decomposed '{machine}' into {} sub-machine(s) under {}\n",
        report.outputs.len(),
        out.display()
    );
    for output in &report.outputs {
        text.push_str(&format!("\n{} ({}/{})\n", output.sub_model, output.project, output.machine));
        text.push_str(&format!("  variables: {}\n", join_or_dash(&output.variables)));
        text.push_str(&format!("  shared:    {}\n", join_or_dash(&output.shared)));
        text.push_str(&format!("  internal:  {}\n", join_or_dash(&output.internal)));
        text.push_str(&format!("  external:  {}\n", join_or_dash(&output.external)));
        text.push_str(&format!("  contexts:  {}\n", join_or_dash(&output.contexts)));
    }
    if !report.warnings.is_empty() {
        text.push_str(&format!("\nWarnings ({}):\n", report.warnings.len()));
        for warning in &report.warnings {
            text.push_str(&format!("  - {warning}\n"));
        }
    }
    if report.cancelled {
        text.push_str("\nCancelled before all sub-models were built.\n");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_engine::builder::SubModelOutput;

    #[test]
    fn text_report_lists_every_sub_machine() {
        let report = DecompositionReport {
            outputs: vec![SubModelOutput {
                sub_model: "P".into(),
                project: "decomposed".into(),
                machine: "P".into(),
                contexts: vec!["c0".into()],
                variables: vec!["count".into(), "sent".into()],
                shared: vec!["count".into()],
                internal: vec!["produce".into()],
                external: vec!["INITIALISATION".into()],
            }],
            warnings: Vec::new(),
            cancelled: false,
        };
        let text = render_report_text("m1", Path::new("out"), &report);
        assert!(text.starts_with("Decomposed 'm1' into 1 sub-machine(s) under out"));
        assert!(text.contains("P (decomposed/P)"));
        assert!(text.contains("  shared:    count\n"));
        assert!(!text.contains("Warnings"));
    }
}

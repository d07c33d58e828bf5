// Command handler for: Shared

use std::path::Path;

use miette::IntoDiagnostic;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::{join_or_dash, load_manifest, load_project, parse_output_format};

#[derive(Debug, Serialize)]
struct SharedReport {
    machine: String,
    sub_models: Vec<SubModelVariables>,
    shared: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SubModelVariables {
    name: String,
    events: Vec<String>,
    accessed: Vec<String>,
}

pub(crate) fn run_shared_command(
    project_path: &Path,
    manifest_path: &Path,
    format: &str,
) -> miette::Result<()> {
    let output_format = parse_output_format(format)?;
    let project = load_project(project_path)?;
    let manifest = load_manifest(manifest_path)?;
    let mut decomposition = manifest.to_decomposition(&project)?;
    decomposition.validate(&project)?;

    let mut sub_models = Vec::new();
    for index in 0..decomposition.sub_models().len() {
        let accessed = decomposition
            .accessed_variables(&project, index)
            .iter()
            .cloned()
            .collect();
        let sub_model = decomposition.sub_model(index);
        sub_models.push(SubModelVariables {
            name: sub_model.name().to_string(),
            events: sub_model.event_labels().iter().cloned().collect(),
            accessed,
        });
    }
    let report = SharedReport {
        machine: manifest.machine.clone(),
        shared: decomposition.shared_variables(&project).iter().cloned().collect(),
        sub_models,
    };

    match output_format {
        OutputFormat::Text => print!("{}", render_shared_text(&report)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
    }
    Ok(())
}

fn render_shared_text(report: &SharedReport) -> String {
    let mut text = format!("Machine '{}'\n", report.machine);
    for sub_model in &report.sub_models {
        text.push_str(&format!(
            "  {}: events [{}], accesses [{}]\n",
            sub_model.name,
            sub_model.events.join(", "),
            sub_model.accessed.join(", ")
        ));
    }
    text.push_str(&format!("Shared variables: {}\n", join_or_dash(&report.shared)));
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_marks_missing_shared_variables() {
        let report = SharedReport {
            machine: "twins".into(),
            sub_models: vec![SubModelVariables {
                name: "L".into(),
                events: vec!["left_up".into()],
                accessed: vec!["l".into()],
            }],
            shared: Vec::new(),
        };
        assert_eq!(
            render_shared_text(&report),
            "Machine 'twins'\n  L: events [left_up], accesses [l]\nShared variables: -\n"
        );
    }
}

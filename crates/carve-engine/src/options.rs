//! Run options and the JSON decomposition manifest.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use carve_model::Project;

use crate::errors::DecompositionError;
use crate::partition::{Decomposition, SubModel};
use crate::repository::is_valid_artifact_name;

/// Current schema version for decomposition manifests.
pub const DECOMPOSITION_MANIFEST_SCHEMA_VERSION: u32 = 1;

/// How the contexts seen by the source machine reach the sub-machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Keep the `sees` clause and reuse the source contexts.
    #[default]
    Copy,
    /// Replace the seen contexts by one context per sub-machine holding only
    /// the sets, constants and axioms it refers to.
    #[serde(rename = "flattened")]
    MinimalFlattened,
}

impl ContextMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextMode::Copy => "copy",
            ContextMode::MinimalFlattened => "flattened",
        }
    }
}

impl std::fmt::Display for ContextMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecompositionOptions {
    #[serde(default)]
    pub context_mode: ContextMode,
    /// Put each sub-machine in a project of its own, named after it.
    #[serde(default)]
    pub separate_projects: bool,
    /// Project receiving the sub-machines when `separate_projects` is off.
    #[serde(default = "default_project")]
    pub default_project: String,
}

fn default_project() -> String {
    "decomposed".into()
}

impl Default for DecompositionOptions {
    fn default() -> Self {
        Self {
            context_mode: ContextMode::default(),
            separate_projects: false,
            default_project: default_project(),
        }
    }
}

impl DecompositionOptions {
    /// Project that receives the artifacts of sub-model `sub_model`.
    pub fn project_for(&self, sub_model: &str) -> String {
        if self.separate_projects {
            sub_model.to_string()
        } else {
            self.default_project.clone()
        }
    }
}

/// A user-authored partition of one machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecompositionManifest {
    /// Schema version (must be exactly 1).
    pub schema_version: u32,
    /// Name of the machine to decompose.
    pub machine: String,
    #[serde(default)]
    pub options: DecompositionOptions,
    /// Ordered sub-models; output order follows this list.
    pub sub_models: Vec<SubModelEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubModelEntry {
    pub name: String,
    #[serde(default)]
    pub events: Vec<String>,
}

impl DecompositionManifest {
    /// Check the manifest on its own, without a project.
    ///
    /// Enforces:
    /// - `schema_version` is exactly [`DECOMPOSITION_MANIFEST_SCHEMA_VERSION`].
    /// - `machine` is non-empty.
    /// - `sub_models` is non-empty, with non-empty unique names.
    /// - `options.default_project` is non-empty.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.schema_version != DECOMPOSITION_MANIFEST_SCHEMA_VERSION {
            errors.push(format!(
                "schema_version must be {}, got {}",
                DECOMPOSITION_MANIFEST_SCHEMA_VERSION, self.schema_version
            ));
        }
        if self.machine.trim().is_empty() {
            errors.push("machine must be non-empty".into());
        }
        if self.options.default_project.trim().is_empty() {
            errors.push("options.default_project must be non-empty".into());
        } else if !is_valid_artifact_name(&self.options.default_project) {
            errors.push(format!(
                "options.default_project '{}' must not be '.', '..' or contain path separators",
                self.options.default_project
            ));
        }
        if self.sub_models.is_empty() {
            errors.push("sub_models must be non-empty".into());
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for (i, entry) in self.sub_models.iter().enumerate() {
            if entry.name.trim().is_empty() {
                errors.push(format!("sub_models[{i}]: name must be non-empty"));
            } else if !is_valid_artifact_name(&entry.name) {
                errors.push(format!(
                    "sub_models[{i}]: name '{}' must not be '.', '..' or contain path separators",
                    entry.name
                ));
            } else if !seen.insert(entry.name.as_str()) {
                errors.push(format!("sub_models[{i}]: duplicate name '{}'", entry.name));
            }
        }
        errors
    }

    /// Build the partition this manifest describes on `project`.
    pub fn to_decomposition(&self, project: &Project) -> Result<Decomposition, DecompositionError> {
        let mut decomposition = Decomposition::for_machine(project, &self.machine)?;
        for entry in &self.sub_models {
            decomposition.add_sub_model(SubModel::new(entry.name.clone(), entry.events.clone()));
        }
        Ok(decomposition)
    }
}

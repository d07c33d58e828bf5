//! Partition of a machine's events into sub-models, with cached derived
//! variable sets.
//!
//! Caches are plain `Option`s. Every mutator goes through [`Decomposition`],
//! clears the touched sub-model's cache and then the decomposition's own
//! shared-variable cache. A read of an empty cache recomputes it.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use tracing::{debug, info};

use carve_model::machine::INITIALISATION;
use carve_model::{MachineId, Project};

use crate::analyzer::event_free_identifiers;
use crate::errors::DecompositionError;
use crate::flatten::Flattener;
use crate::repository::is_valid_artifact_name;

/// One element of the partition: a named set of chosen event labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SubModel {
    name: String,
    event_labels: IndexSet<String>,
    accessed: Option<IndexSet<String>>,
}

impl SubModel {
    pub fn new(name: impl Into<String>, event_labels: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            event_labels: event_labels.into_iter().collect(),
            accessed: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_labels(&self) -> &IndexSet<String> {
        &self.event_labels
    }

    /// The cached accessed-variable set, if present.
    pub fn cached_accessed(&self) -> Option<&IndexSet<String>> {
        self.accessed.as_ref()
    }

    pub fn mark_dirty(&mut self) {
        self.accessed = None;
    }
}

/// A partition of one source machine's events.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    machine: MachineId,
    sub_models: Vec<SubModel>,
    shared: Option<IndexSet<String>>,
}

impl Decomposition {
    pub(crate) fn new(machine: MachineId) -> Self {
        Self {
            machine,
            sub_models: Vec::new(),
            shared: None,
        }
    }

    /// A decomposition of the machine called `name`.
    pub fn for_machine(project: &Project, name: &str) -> Result<Self, DecompositionError> {
        project
            .machine_id(name)
            .map(Self::new)
            .ok_or_else(|| DecompositionError::UnknownMachine(name.to_string()))
    }

    pub fn machine(&self) -> MachineId {
        self.machine
    }

    pub fn sub_models(&self) -> &[SubModel] {
        &self.sub_models
    }

    pub fn sub_model(&self, index: usize) -> &SubModel {
        &self.sub_models[index]
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.sub_models.iter().position(|s| s.name == name)
    }

    /// The cached shared-variable set, if present.
    pub fn cached_shared(&self) -> Option<&IndexSet<String>> {
        self.shared.as_ref()
    }

    pub fn mark_dirty(&mut self) {
        self.shared = None;
    }

    /// Whether any derived set has to be recomputed before use.
    pub fn is_out_of_date(&self) -> bool {
        self.shared.is_none() || self.sub_models.iter().any(|s| s.accessed.is_none())
    }

    /// Append a sub-model and return its index.
    pub fn add_sub_model(&mut self, mut sub_model: SubModel) -> usize {
        sub_model.mark_dirty();
        self.sub_models.push(sub_model);
        self.mark_dirty();
        self.sub_models.len() - 1
    }

    pub fn remove_sub_model(&mut self, index: usize) -> SubModel {
        let removed = self.sub_models.remove(index);
        self.mark_dirty();
        removed
    }

    pub fn set_event_labels(&mut self, index: usize, labels: impl IntoIterator<Item = String>) {
        let sub = &mut self.sub_models[index];
        sub.event_labels = labels.into_iter().collect();
        sub.mark_dirty();
        self.mark_dirty();
    }

    pub fn add_event_label(&mut self, index: usize, label: impl Into<String>) {
        let sub = &mut self.sub_models[index];
        sub.event_labels.insert(label.into());
        sub.mark_dirty();
        self.mark_dirty();
    }

    /// Returns whether the label was chosen by the sub-model.
    pub fn remove_event_label(&mut self, index: usize, label: &str) -> bool {
        let sub = &mut self.sub_models[index];
        let removed = sub.event_labels.shift_remove(label);
        if removed {
            sub.mark_dirty();
            self.mark_dirty();
        }
        removed
    }

    /// Variables read or written by the flattened chosen events of sub-model
    /// `index`, in the machine's declaration order.
    pub fn accessed_variables(&mut self, project: &Project, index: usize) -> &IndexSet<String> {
        let machine = self.machine;
        let sub = &mut self.sub_models[index];
        let labels = &sub.event_labels;
        let name = &sub.name;
        sub.accessed.get_or_insert_with(|| {
            let accessed = compute_accessed(project, machine, labels);
            debug!(sub_model = %name, accessed = accessed.len(), "Computed accessed variables");
            accessed
        })
    }

    /// Variables accessed by at least two sub-models, in the machine's
    /// declaration order.
    pub fn shared_variables(&mut self, project: &Project) -> &IndexSet<String> {
        if self.shared.is_none() {
            let mut counts: IndexMap<String, usize> = IndexMap::new();
            for index in 0..self.sub_models.len() {
                for var in self.accessed_variables(project, index) {
                    *counts.entry(var.clone()).or_default() += 1;
                }
            }
            let shared: IndexSet<String> = project
                .machine(self.machine)
                .variables
                .iter()
                .filter(|v| counts.get(&v.name).copied().unwrap_or(0) >= 2)
                .map(|v| v.name.clone())
                .collect();
            debug!(shared = shared.len(), "Computed shared variables");
            self.shared = Some(shared);
        }
        self.shared.get_or_insert_with(IndexSet::new)
    }

    /// Check that the partition is usable on `project`.
    ///
    /// Events chosen by no sub-model are allowed and only logged: they are
    /// emitted as external events where they touch a sub-model and dropped
    /// otherwise.
    pub fn validate(&self, project: &Project) -> Result<(), DecompositionError> {
        let machine = project.machine(self.machine);
        let mut problems = Vec::new();

        if self.sub_models.is_empty() {
            problems.push(format!("machine '{}': no sub-model defined", machine.name));
        }

        let mut names: HashSet<&str> = HashSet::new();
        let mut owners: IndexMap<&str, &str> = IndexMap::new();
        for (i, sub) in self.sub_models.iter().enumerate() {
            if sub.name.trim().is_empty() {
                problems.push(format!("sub_models[{i}]: name must be non-empty"));
            } else if !is_valid_artifact_name(&sub.name) {
                problems.push(format!(
                    "sub_models[{i}]: name '{}' must not be '.', '..' or contain path separators",
                    sub.name
                ));
            } else if !names.insert(sub.name.as_str()) {
                problems.push(format!("sub_models[{i}]: duplicate name '{}'", sub.name));
            }
            for label in &sub.event_labels {
                if label == INITIALISATION {
                    problems.push(format!(
                        "sub-model '{}': {INITIALISATION} is part of every sub-model and cannot be chosen",
                        sub.name
                    ));
                    continue;
                }
                if project.event(self.machine, label).is_none() {
                    problems.push(format!(
                        "sub-model '{}': machine '{}' has no event '{label}'",
                        sub.name, machine.name
                    ));
                    continue;
                }
                if let Some(owner) = owners.insert(label.as_str(), sub.name.as_str()) {
                    problems.push(format!(
                        "event '{label}' is chosen by both '{owner}' and '{}'",
                        sub.name
                    ));
                }
            }
        }

        for event in &machine.events {
            if !event.is_initialisation() && !owners.contains_key(event.label.as_str()) {
                info!(
                    machine = %machine.name,
                    event = %event.label,
                    "Event is not chosen by any sub-model"
                );
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DecompositionError::InvalidPartition { problems })
        }
    }
}

fn compute_accessed(
    project: &Project,
    machine: MachineId,
    labels: &IndexSet<String>,
) -> IndexSet<String> {
    let flattener = Flattener::new(project);
    let seen = project.seen_identifiers(machine);
    let mut touched = IndexSet::new();
    for label in labels {
        let Some(event) = project.event(machine, label) else {
            continue;
        };
        let flat = flattener.flatten(machine, event);
        touched.extend(
            event_free_identifiers(&flat)
                .into_iter()
                .filter(|id| !seen.contains(id) && !flat.parameters.contains(id)),
        );
    }
    project
        .machine(machine)
        .variables
        .iter()
        .filter(|v| touched.contains(&v.name))
        .map(|v| v.name.clone())
        .collect()
}

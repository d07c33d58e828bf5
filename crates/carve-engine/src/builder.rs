//! Construction of one sub-machine.
//!
//! A build walks through the stages of [`BuildStage`] in order. Each stage
//! method checks that the previous stage completed; nothing is retried and a
//! failure abandons the sub-machine.

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use carve_model::context::{Axiom, Constant, Context};
use carve_model::formula::typing_predicate;
use carve_model::machine::{
    Action, Convergence, Event, Externality, Guard, Invariant, Machine, Nature, Variable,
};
use carve_model::{MachineId, Project};

use crate::action::decompose_action;
use crate::analyzer::{event_free_identifiers, free_identifiers};
use crate::classify::{classify, Classification};
use crate::errors::DecompositionError;
use crate::options::{ContextMode, DecompositionOptions};
use crate::oracle::TypeOracle;
use crate::repository::{Artifact, ArtifactHandle, ArtifactKind, ArtifactLocation, ModelRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Created,
    VariablesDone,
    InvariantsDone,
    EventsDone,
    ContextsDone,
    Saved,
}

/// Inputs shared by every sub-machine of one decomposition run.
#[derive(Clone, Copy)]
pub struct BuildInputs<'a> {
    pub project: &'a Project,
    pub oracle: &'a dyn TypeOracle,
    pub options: &'a DecompositionOptions,
    pub source: MachineId,
    /// The source machine's events, already flattened.
    pub events: &'a [Event],
    pub shared: &'a IndexSet<String>,
}

/// What a finished build produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubModelOutput {
    pub sub_model: String,
    pub project: String,
    pub machine: String,
    /// Contexts written for this sub-machine: the copied seen contexts or
    /// the flattened one.
    pub contexts: Vec<String>,
    pub variables: Vec<String>,
    pub shared: Vec<String>,
    pub internal: Vec<String>,
    pub external: Vec<String>,
}

pub struct SubMachineBuilder<'a> {
    inputs: BuildInputs<'a>,
    name: String,
    labels: IndexSet<String>,
    accessed: IndexSet<String>,
    seen: IndexSet<String>,
    handle: ArtifactHandle,
    machine: Machine,
    contexts: Vec<String>,
    internal: Vec<String>,
    external: Vec<String>,
    warnings: Vec<DecompositionError>,
    stage: BuildStage,
}

impl<'a> SubMachineBuilder<'a> {
    /// Create the empty target machine in the repository.
    pub fn create(
        inputs: BuildInputs<'a>,
        name: &str,
        labels: IndexSet<String>,
        accessed: IndexSet<String>,
        repository: &mut dyn ModelRepository,
    ) -> Result<Self, DecompositionError> {
        let location = ArtifactLocation::new(inputs.options.project_for(name), name);
        let handle = repository
            .create_artifact(ArtifactKind::Machine, location)
            .map_err(|e| DecompositionError::repository(name, e))?;
        info!(
            sub_model = %name,
            project = %handle.location.project,
            events = labels.len(),
            accessed = accessed.len(),
            "Building sub-machine"
        );
        Ok(Self {
            seen: inputs.project.seen_identifiers(inputs.source),
            inputs,
            name: name.to_string(),
            labels,
            accessed,
            handle,
            machine: Machine::new(name),
            contexts: Vec::new(),
            internal: Vec::new(),
            external: Vec::new(),
            warnings: Vec::new(),
            stage: BuildStage::Created,
        })
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// The machine as built so far.
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Recoverable problems met so far.
    pub fn take_warnings(&mut self) -> Vec<DecompositionError> {
        std::mem::take(&mut self.warnings)
    }

    /// Run every remaining stage.
    pub fn build(
        &mut self,
        repository: &mut dyn ModelRepository,
    ) -> Result<SubModelOutput, DecompositionError> {
        self.variables()?;
        self.invariants()?;
        self.events()?;
        self.contexts(repository)?;
        self.save(repository)
    }

    fn enter(&self, attempted: BuildStage, expected: BuildStage) -> Result<(), DecompositionError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(DecompositionError::StageOrder {
                sub_model: self.name.clone(),
                attempted,
                expected,
                actual: self.stage,
            })
        }
    }

    fn source(&self) -> &'a Machine {
        self.inputs.project.machine(self.inputs.source)
    }

    fn missing_type(&mut self, identifier: &str) {
        warn!(sub_model = %self.name, identifier, "No type known; typing predicate omitted");
        self.warnings.push(DecompositionError::MissingType {
            sub_model: self.name.clone(),
            identifier: identifier.to_string(),
        });
    }

    /// Declare the accessed variables, shared ones tagged as such.
    pub fn variables(&mut self) -> Result<(), DecompositionError> {
        self.enter(BuildStage::VariablesDone, BuildStage::Created)?;
        let source = self.source();
        for name in &self.accessed {
            let declared = source.variable(name);
            self.machine.variables.push(Variable {
                name: name.clone(),
                comment: declared.and_then(|v| v.comment.clone()),
                ty: self.inputs.oracle.variable_type(&source.name, name),
                nature: if self.inputs.shared.contains(name) {
                    Nature::Shared
                } else {
                    Nature::Private
                },
            });
        }
        debug!(sub_model = %self.name, variables = self.machine.variables.len(), "Variables done");
        self.stage = BuildStage::VariablesDone;
        Ok(())
    }

    /// Typing theorems for the variables, then every invariant of the
    /// refinement chain that only constrains accessed variables.
    pub fn invariants(&mut self) -> Result<(), DecompositionError> {
        self.enter(BuildStage::InvariantsDone, BuildStage::VariablesDone)?;
        let source_name = self.source().name.clone();
        let accessed: Vec<String> = self.accessed.iter().cloned().collect();
        for name in &accessed {
            match self.inputs.oracle.variable_type(&source_name, name) {
                Some(ty) => self.machine.invariants.push(Invariant {
                    label: format!("typing_{name}"),
                    predicate: typing_predicate(name, &ty),
                    theorem: true,
                }),
                None => self.missing_type(name),
            }
        }

        let project = self.inputs.project;
        let mut chain = project.refinement_chain(self.inputs.source);
        chain.reverse();
        for id in chain {
            let machine = project.machine(id);
            let seen = project.seen_identifiers(id);
            for invariant in &machine.invariants {
                let relevant = free_identifiers(&invariant.predicate)
                    .iter()
                    .filter(|name| !seen.contains(*name))
                    .all(|name| self.accessed.contains(name));
                if relevant {
                    self.machine.invariants.push(Invariant {
                        label: format!("{}_{}", machine.name, invariant.label),
                        predicate: invariant.predicate.clone(),
                        theorem: invariant.theorem,
                    });
                }
            }
        }
        debug!(sub_model = %self.name, invariants = self.machine.invariants.len(), "Invariants done");
        self.stage = BuildStage::InvariantsDone;
        Ok(())
    }

    /// Classify every source event and emit the internal and external ones.
    pub fn events(&mut self) -> Result<(), DecompositionError> {
        self.enter(BuildStage::EventsDone, BuildStage::InvariantsDone)?;
        for flat in self.inputs.events {
            let emitted = match classify(&self.labels, &self.accessed, flat) {
                Classification::None => continue,
                Classification::Internal => {
                    self.internal.push(flat.label.clone());
                    internal_event(flat.clone())
                }
                Classification::External => {
                    self.external.push(flat.label.clone());
                    self.external_event(flat.clone())?
                }
            };
            self.machine.events.push(emitted);
        }
        debug!(
            sub_model = %self.name,
            internal = self.internal.len(),
            external = self.external.len(),
            "Events done"
        );
        self.stage = BuildStage::EventsDone;
        Ok(())
    }

    fn external_event(&mut self, flat: Event) -> Result<Event, DecompositionError> {
        let mut actions = Vec::with_capacity(flat.actions.len());
        for action in &flat.actions {
            let decomposed = decompose_action(&action.assignment, &self.accessed).map_err(|source| {
                DecompositionError::UnsupportedAssignmentShape {
                    sub_model: self.name.clone(),
                    event: flat.label.clone(),
                    action: action.label.clone(),
                    source,
                }
            })?;
            if let Some(assignment) = decomposed {
                actions.push(Action {
                    label: action.label.clone(),
                    assignment,
                });
            }
        }

        let mut parameters = flat.parameters.clone();
        let mut guards = flat.guards.clone();
        if !flat.is_initialisation() {
            let source_name = self.source().name.clone();
            for id in event_free_identifiers(&flat) {
                if self.seen.contains(&id) || self.accessed.contains(&id) || parameters.contains(&id) {
                    continue;
                }
                match self.inputs.oracle.variable_type(&source_name, &id) {
                    Some(ty) => guards.push(Guard {
                        label: format!("typing_{id}"),
                        predicate: typing_predicate(&id, &ty),
                        theorem: false,
                    }),
                    None => self.missing_type(&id),
                }
                parameters.push(id);
            }
        }

        Ok(Event {
            label: flat.label,
            convergence: Convergence::Ordinary,
            extended: false,
            parameters,
            guards,
            witnesses: Vec::new(),
            actions,
            refines: None,
            externality: Externality::External,
        })
    }

    /// Make the seen contexts available to the sub-machine.
    pub fn contexts(&mut self, repository: &mut dyn ModelRepository) -> Result<(), DecompositionError> {
        self.enter(BuildStage::ContextsDone, BuildStage::EventsDone)?;
        match self.inputs.options.context_mode {
            ContextMode::Copy => self.copy_contexts(repository)?,
            ContextMode::MinimalFlattened => self.flatten_contexts(repository)?,
        }
        debug!(sub_model = %self.name, contexts = ?self.contexts, "Contexts done");
        self.stage = BuildStage::ContextsDone;
        Ok(())
    }

    fn copy_contexts(&mut self, repository: &mut dyn ModelRepository) -> Result<(), DecompositionError> {
        self.machine.sees = self.source().sees.clone();
        let options = self.inputs.options;
        let destination = &self.handle.location.project;
        if !options.separate_projects || *destination == options.default_project {
            return Ok(());
        }
        let project = self.inputs.project;
        for id in project.seen_contexts(self.inputs.source) {
            let name = &project.context(id).name;
            let handle = ArtifactHandle {
                kind: ArtifactKind::Context,
                location: ArtifactLocation::new(options.default_project.clone(), name.clone()),
            };
            repository
                .copy(&handle, destination)
                .map_err(|e| DecompositionError::repository(name, e))?;
            self.contexts.push(name.clone());
        }
        Ok(())
    }

    fn flatten_contexts(&mut self, repository: &mut dyn ModelRepository) -> Result<(), DecompositionError> {
        self.machine.sees.clear();
        let Some(context) = self.minimal_context() else {
            debug!(sub_model = %self.name, "Flattened context is empty; omitted");
            return Ok(());
        };
        let location = ArtifactLocation::new(self.handle.location.project.clone(), context.name.clone());
        let name = context.name.clone();
        let handle = repository
            .create_artifact(ArtifactKind::Context, location)
            .map_err(|e| DecompositionError::repository(&name, e))?;
        repository
            .write(&handle, Artifact::Context(context))
            .and_then(|()| repository.save(&handle))
            .map_err(|e| DecompositionError::repository(&name, e))?;
        self.machine.sees = vec![name.clone()];
        self.contexts.push(name);
        Ok(())
    }

    /// One context holding the carrier sets and constants the machine refers
    /// to, the carrier sets their types are built from, and the axioms about
    /// them. `None` when nothing is referenced.
    fn minimal_context(&mut self) -> Option<Context> {
        let mut referenced: IndexSet<String> = IndexSet::new();
        for invariant in &self.machine.invariants {
            referenced.extend(free_identifiers(&invariant.predicate));
        }
        for event in &self.machine.events {
            referenced.extend(event_free_identifiers(event));
        }
        referenced.retain(|id| self.seen.contains(id));

        let project = self.inputs.project;
        let sources: Vec<&Context> = project
            .seen_contexts(self.inputs.source)
            .into_iter()
            .map(|id| project.context(id))
            .collect();

        let mut context = Context::new(format!("{}_ctx", self.name));
        let mut sets: IndexSet<String> = IndexSet::new();
        let mut typing = Vec::new();
        for source in &sources {
            for constant in source.constants.iter().filter(|c| referenced.contains(&c.name)) {
                let ty = self.inputs.oracle.constant_type(&source.name, &constant.name);
                match &ty {
                    Some(ty) => {
                        sets.extend(ty.given_sets().into_iter().map(str::to_string));
                        typing.push(Axiom {
                            label: format!("typing_{}", constant.name),
                            predicate: typing_predicate(&constant.name, ty),
                            theorem: true,
                        });
                    }
                    None => self.missing_type(&constant.name),
                }
                context.constants.push(Constant {
                    name: constant.name.clone(),
                    ty,
                });
            }
        }
        for source in &sources {
            context.sets.extend(
                source
                    .sets
                    .iter()
                    .filter(|s| referenced.contains(*s) || sets.contains(*s))
                    .cloned(),
            );
        }

        let kept: IndexSet<&str> = context
            .sets
            .iter()
            .chain(context.constants.iter().map(|c| &c.name))
            .map(String::as_str)
            .collect();
        context.axioms = typing;
        for source in &sources {
            for axiom in &source.axioms {
                let ids = free_identifiers(&axiom.predicate);
                if !ids.is_empty() && ids.iter().all(|id| kept.contains(id.as_str())) {
                    context.axioms.push(Axiom {
                        label: format!("{}_{}", source.name, axiom.label),
                        predicate: axiom.predicate.clone(),
                        theorem: axiom.theorem,
                    });
                }
            }
        }

        (!context.is_empty()).then_some(context)
    }

    /// Write the machine and save it.
    pub fn save(
        &mut self,
        repository: &mut dyn ModelRepository,
    ) -> Result<SubModelOutput, DecompositionError> {
        self.enter(BuildStage::Saved, BuildStage::ContextsDone)?;
        repository
            .write(&self.handle, Artifact::Machine(self.machine.clone()))
            .and_then(|()| repository.save(&self.handle))
            .map_err(|e| DecompositionError::repository(&self.name, e))?;
        self.stage = BuildStage::Saved;
        info!(
            sub_model = %self.name,
            internal = self.internal.len(),
            external = self.external.len(),
            "Sub-machine saved"
        );
        Ok(SubModelOutput {
            sub_model: self.name.clone(),
            project: self.handle.location.project.clone(),
            machine: self.machine.name.clone(),
            contexts: self.contexts.clone(),
            variables: self.accessed.iter().cloned().collect(),
            shared: self
                .accessed
                .iter()
                .filter(|v| self.inputs.shared.contains(*v))
                .cloned()
                .collect(),
            internal: self.internal.clone(),
            external: self.external.clone(),
        })
    }
}

/// A chosen event keeps its parameters, guards, actions and convergence.
fn internal_event(flat: Event) -> Event {
    Event {
        witnesses: Vec::new(),
        refines: None,
        extended: false,
        externality: Externality::Internal,
        ..flat
    }
}

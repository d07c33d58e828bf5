use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::context::Context;
use crate::errors::ModelError;
use crate::machine::{Event, Machine, INITIALISATION};

/// Index of a machine in a [`Project`].
pub type MachineId = usize;
/// Index of a context in a [`Project`].
pub type ContextId = usize;

/// On-disk shape of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub contexts: Vec<Context>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Refines,
    Sees,
    Extends,
}

/// A `refines`/`sees`/`extends` clause naming an artifact that is not part
/// of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub from: String,
    pub kind: ReferenceKind,
    pub target: String,
}

/// Arena of machines and contexts with refinement links resolved once at
/// construction.
#[derive(Debug, Clone)]
pub struct Project {
    machines: Vec<Machine>,
    contexts: Vec<Context>,
    machine_ids: HashMap<String, MachineId>,
    context_ids: HashMap<String, ContextId>,
    abstract_machines: Vec<Option<MachineId>>,
    /// Per machine: event label -> position in `events`.
    event_indices: Vec<HashMap<String, usize>>,
    unresolved: Vec<UnresolvedReference>,
}

impl Project {
    pub fn new(machines: Vec<Machine>, contexts: Vec<Context>) -> Result<Self, ModelError> {
        let mut machine_ids = HashMap::new();
        for (id, machine) in machines.iter().enumerate() {
            if machine_ids.insert(machine.name.clone(), id).is_some() {
                return Err(ModelError::DuplicateArtifact {
                    kind: "machine",
                    name: machine.name.clone(),
                });
            }
        }
        let mut context_ids = HashMap::new();
        for (id, context) in contexts.iter().enumerate() {
            if context_ids.insert(context.name.clone(), id).is_some() {
                return Err(ModelError::DuplicateArtifact {
                    kind: "context",
                    name: context.name.clone(),
                });
            }
        }

        let mut event_indices = Vec::with_capacity(machines.len());
        for machine in &machines {
            let mut index = HashMap::new();
            for (pos, event) in machine.events.iter().enumerate() {
                if index.insert(event.label.clone(), pos).is_some() {
                    return Err(ModelError::DuplicateEvent {
                        machine: machine.name.clone(),
                        label: event.label.clone(),
                    });
                }
            }
            event_indices.push(index);
        }

        let mut unresolved = Vec::new();
        let mut abstract_machines = Vec::with_capacity(machines.len());
        for machine in &machines {
            let resolved = match &machine.refines {
                Some(name) => {
                    let id = machine_ids.get(name).copied();
                    if id.is_none() {
                        unresolved.push(UnresolvedReference {
                            from: machine.name.clone(),
                            kind: ReferenceKind::Refines,
                            target: name.clone(),
                        });
                    }
                    id
                }
                None => None,
            };
            abstract_machines.push(resolved);
            for seen in &machine.sees {
                if !context_ids.contains_key(seen) {
                    unresolved.push(UnresolvedReference {
                        from: machine.name.clone(),
                        kind: ReferenceKind::Sees,
                        target: seen.clone(),
                    });
                }
            }
        }
        for context in &contexts {
            for parent in &context.extends {
                if !context_ids.contains_key(parent) {
                    unresolved.push(UnresolvedReference {
                        from: context.name.clone(),
                        kind: ReferenceKind::Extends,
                        target: parent.clone(),
                    });
                }
            }
        }

        // A machine chain can be at most `machines.len()` long.
        for (id, machine) in machines.iter().enumerate() {
            let mut current = abstract_machines[id];
            let mut steps = 0;
            while let Some(next) = current {
                steps += 1;
                if next == id || steps > machines.len() {
                    return Err(ModelError::RefinementCycle {
                        machine: machine.name.clone(),
                    });
                }
                current = abstract_machines[next];
            }
        }

        debug!(
            machines = machines.len(),
            contexts = contexts.len(),
            unresolved = unresolved.len(),
            "Project resolved"
        );
        Ok(Self {
            machines,
            contexts,
            machine_ids,
            context_ids,
            abstract_machines,
            event_indices,
            unresolved,
        })
    }

    pub fn from_file(file: ProjectFile) -> Result<Self, ModelError> {
        Self::new(file.machines, file.contexts)
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn machine(&self, id: MachineId) -> &Machine {
        &self.machines[id]
    }

    pub fn context(&self, id: ContextId) -> &Context {
        &self.contexts[id]
    }

    pub fn machine_id(&self, name: &str) -> Option<MachineId> {
        self.machine_ids.get(name).copied()
    }

    pub fn context_id(&self, name: &str) -> Option<ContextId> {
        self.context_ids.get(name).copied()
    }

    pub fn machine_by_name(&self, name: &str) -> Option<&Machine> {
        self.machine_id(name).map(|id| &self.machines[id])
    }

    pub fn context_by_name(&self, name: &str) -> Option<&Context> {
        self.context_id(name).map(|id| &self.contexts[id])
    }

    pub fn unresolved_references(&self) -> &[UnresolvedReference] {
        &self.unresolved
    }

    pub fn abstract_machine(&self, id: MachineId) -> Option<MachineId> {
        self.abstract_machines[id]
    }

    /// The machine followed by its abstractions, most concrete first.
    pub fn refinement_chain(&self, id: MachineId) -> Vec<MachineId> {
        let mut chain = vec![id];
        let mut current = self.abstract_machines[id];
        while let Some(next) = current {
            chain.push(next);
            current = self.abstract_machines[next];
        }
        chain
    }

    pub fn event(&self, id: MachineId, label: &str) -> Option<&Event> {
        self.event_indices[id]
            .get(label)
            .map(|&pos| &self.machines[id].events[pos])
    }

    /// The abstract counterpart of `event` (declared in machine `id`).
    ///
    /// `INITIALISATION` is matched positionally against the abstract
    /// machine's initialisation; other events are looked up by their
    /// `refines` label.
    pub fn abstract_event(&self, id: MachineId, event: &Event) -> Option<(MachineId, &Event)> {
        let abstract_id = self.abstract_machines[id]?;
        let label = if event.is_initialisation() {
            INITIALISATION
        } else {
            event.refines.as_deref()?
        };
        self.event(abstract_id, label).map(|e| (abstract_id, e))
    }

    /// Contexts visible to a machine: its `sees` clause closed under
    /// `extends`, ancestors before descendants, without repetition.
    pub fn seen_contexts(&self, id: MachineId) -> Vec<ContextId> {
        let mut out = IndexSet::new();
        for name in &self.machines[id].sees {
            if let Some(ctx) = self.context_id(name) {
                self.collect_context(ctx, &mut out);
            }
        }
        out.into_iter().collect()
    }

    fn collect_context(&self, id: ContextId, out: &mut IndexSet<ContextId>) {
        if out.contains(&id) {
            return;
        }
        for parent in &self.contexts[id].extends {
            if let Some(parent_id) = self.context_id(parent) {
                self.collect_context(parent_id, out);
            }
        }
        out.insert(id);
    }

    /// Carrier sets and constants visible to a machine.
    pub fn seen_identifiers(&self, id: MachineId) -> IndexSet<String> {
        let mut out = IndexSet::new();
        for ctx in self.seen_contexts(id) {
            let context = &self.contexts[ctx];
            out.extend(context.sets.iter().cloned());
            out.extend(context.constants.iter().map(|c| c.name.clone()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Project {
        let mut m0 = Machine::new("m0");
        m0.events.push(Event::initialisation());
        m0.events.push(Event::new("inc"));
        let mut m1 = Machine::new("m1");
        m1.refines = Some("m0".into());
        m1.sees = vec!["c1".into()];
        m1.events.push(Event::initialisation());
        m1.events.push(Event::new("inc").extending("inc"));
        m1.events.push(Event::new("fresh"));
        let mut c0 = Context::new("c0");
        c0.sets.push("S".into());
        let mut c1 = Context::new("c1");
        c1.extends.push("c0".into());
        c1.constants.push(crate::context::Constant {
            name: "k".into(),
            ty: None,
        });
        Project::new(vec![m0, m1], vec![c1, c0]).unwrap()
    }

    #[test]
    fn resolves_abstract_events() {
        let p = chain();
        let m1 = p.machine_id("m1").unwrap();
        let inc = p.event(m1, "inc").unwrap();
        let (abs_id, abs) = p.abstract_event(m1, inc).unwrap();
        assert_eq!(p.machine(abs_id).name, "m0");
        assert_eq!(abs.label, "inc");
        let fresh = p.event(m1, "fresh").unwrap();
        assert!(p.abstract_event(m1, fresh).is_none());
    }

    #[test]
    fn initialisation_matches_positionally() {
        let p = chain();
        let m1 = p.machine_id("m1").unwrap();
        let init = p.event(m1, INITIALISATION).unwrap();
        assert!(init.refines.is_none());
        let (_, abs) = p.abstract_event(m1, init).unwrap();
        assert!(abs.is_initialisation());
    }

    #[test]
    fn seen_identifiers_follow_extends() {
        let p = chain();
        let m1 = p.machine_id("m1").unwrap();
        let seen: Vec<_> = p.seen_identifiers(m1).into_iter().collect();
        assert_eq!(seen, vec!["S".to_string(), "k".to_string()]);
    }

    #[test]
    fn refinement_chain_is_concrete_first() {
        let p = chain();
        let m1 = p.machine_id("m1").unwrap();
        let names: Vec<_> = p
            .refinement_chain(m1)
            .into_iter()
            .map(|id| p.machine(id).name.clone())
            .collect();
        assert_eq!(names, vec!["m1", "m0"]);
    }

    #[test]
    fn unknown_refines_is_recorded() {
        let mut m = Machine::new("m");
        m.refines = Some("ghost".into());
        let p = Project::new(vec![m], vec![]).unwrap();
        assert_eq!(p.unresolved_references().len(), 1);
        assert_eq!(p.unresolved_references()[0].kind, ReferenceKind::Refines);
        assert!(p.abstract_machine(0).is_none());
    }

    #[test]
    fn rejects_refinement_cycles() {
        let mut a = Machine::new("a");
        a.refines = Some("b".into());
        let mut b = Machine::new("b");
        b.refines = Some("a".into());
        let err = Project::new(vec![a, b], vec![]).unwrap_err();
        assert!(matches!(err, ModelError::RefinementCycle { .. }));
    }

    #[test]
    fn rejects_duplicate_event_labels() {
        let mut m = Machine::new("m");
        m.events.push(Event::new("e"));
        m.events.push(Event::new("e"));
        assert!(matches!(
            Project::new(vec![m], vec![]),
            Err(ModelError::DuplicateEvent { .. })
        ));
    }
}

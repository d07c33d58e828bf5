//! Refinement flattening of extended events.

use tracing::warn;

use carve_model::machine::{Event, INITIALISATION};
use carve_model::{MachineId, Project};

use crate::errors::DecompositionError;

/// Resolves extended events against their abstract ancestry.
#[derive(Debug, Clone, Copy)]
pub struct Flattener<'p> {
    project: &'p Project,
}

impl<'p> Flattener<'p> {
    pub fn new(project: &'p Project) -> Self {
        Self { project }
    }

    /// Merge `event` (declared in machine `machine`) with every abstract
    /// event it extends.
    ///
    /// The abstract parameters, guards and actions are placed in front of the
    /// concrete ones and the result is no longer extended. A non-extended
    /// event is returned as is, which makes flattening idempotent.
    pub fn flatten(&self, machine: MachineId, event: &Event) -> Event {
        self.flatten_inner(machine, event, &mut None)
    }

    /// Like [`flatten`](Self::flatten), recording unresolvable refinements.
    pub fn flatten_reporting(
        &self,
        machine: MachineId,
        event: &Event,
        warnings: &mut Vec<DecompositionError>,
    ) -> Event {
        self.flatten_inner(machine, event, &mut Some(warnings))
    }

    /// Flatten every event of `machine` in declaration order. Each
    /// unresolvable refinement is recorded once.
    pub fn flatten_machine(
        &self,
        machine: MachineId,
        warnings: &mut Vec<DecompositionError>,
    ) -> Vec<Event> {
        self.project
            .machine(machine)
            .events
            .iter()
            .map(|event| self.flatten_reporting(machine, event, warnings))
            .collect()
    }

    fn flatten_inner(
        &self,
        machine: MachineId,
        event: &Event,
        warnings: &mut Option<&mut Vec<DecompositionError>>,
    ) -> Event {
        if !event.extended {
            return event.clone();
        }

        let Some((abstract_id, abstract_event)) = self.project.abstract_event(machine, event) else {
            let machine_name = &self.project.machine(machine).name;
            let abstract_label = if event.is_initialisation() {
                INITIALISATION.to_string()
            } else {
                event.refines.clone().unwrap_or_default()
            };
            warn!(
                machine = %machine_name,
                event = %event.label,
                abstract_label = %abstract_label,
                "Extended event has no resolvable abstract event; treating it as flat"
            );
            if let Some(sink) = warnings.as_deref_mut() {
                sink.push(DecompositionError::UnresolvableRefinement {
                    machine: machine_name.clone(),
                    event: event.label.clone(),
                    abstract_label,
                });
            }
            let mut flat = event.clone();
            flat.extended = false;
            return flat;
        };

        let inherited = self.flatten_inner(abstract_id, abstract_event, warnings);
        let mut flat = event.clone();
        flat.parameters = merged(inherited.parameters, &event.parameters);
        flat.guards = merged(inherited.guards, &event.guards);
        flat.actions = merged(inherited.actions, &event.actions);
        flat.extended = false;
        flat
    }
}

fn merged<T: Clone>(mut inherited: Vec<T>, own: &[T]) -> Vec<T> {
    inherited.extend_from_slice(own);
    inherited
}

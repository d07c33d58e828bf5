//! Type information for the identifiers of the source model.

use carve_model::{Project, Type};

/// Answers typing questions about a statically checked source model.
///
/// `None` means the type is not known, for instance because the source was
/// never checked; typing predicates for that identifier are then omitted.
pub trait TypeOracle {
    fn variable_type(&self, machine: &str, variable: &str) -> Option<Type>;
    fn constant_type(&self, context: &str, constant: &str) -> Option<Type>;
}

/// The types declared in a [`Project`].
#[derive(Debug, Clone, Copy)]
pub struct DeclaredTypes<'p> {
    project: &'p Project,
}

impl<'p> DeclaredTypes<'p> {
    pub fn new(project: &'p Project) -> Self {
        Self { project }
    }
}

impl TypeOracle for DeclaredTypes<'_> {
    /// Looks through the refinement chain, since a concrete machine repeats
    /// inherited variables without necessarily restating their type.
    fn variable_type(&self, machine: &str, variable: &str) -> Option<Type> {
        let id = self.project.machine_id(machine)?;
        self.project
            .refinement_chain(id)
            .into_iter()
            .find_map(|m| self.project.machine(m).variable(variable)?.ty.clone())
    }

    fn constant_type(&self, context: &str, constant: &str) -> Option<Type> {
        self.project
            .context_by_name(context)?
            .constant(constant)?
            .ty
            .clone()
    }
}

//! Classification of source events relative to one sub-model.

use indexmap::IndexSet;
use serde::Serialize;

use carve_model::machine::Event;

use crate::analyzer::event_free_identifiers;

/// How an event of the source machine appears in a sub-machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Chosen by the sub-model; copied as is.
    Internal,
    /// Belongs elsewhere but touches the sub-model's variables; kept as an
    /// external stand-in.
    External,
    /// Neither chosen nor touching; left out.
    None,
}

/// Classify `flat`, an already flattened event, against a sub-model's chosen
/// `labels` and `accessed` variables.
///
/// `INITIALISATION` is always external: every sub-machine initialises its
/// own variables.
pub fn classify(
    labels: &IndexSet<String>,
    accessed: &IndexSet<String>,
    flat: &Event,
) -> Classification {
    if flat.is_initialisation() {
        Classification::External
    } else if labels.contains(&flat.label) {
        Classification::Internal
    } else if event_free_identifiers(flat)
        .iter()
        .any(|id| accessed.contains(id))
    {
        Classification::External
    } else {
        Classification::None
    }
}

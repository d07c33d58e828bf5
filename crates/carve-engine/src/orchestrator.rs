//! Sequential decomposition of a machine into its sub-machines.

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{info, warn};

use carve_model::machine::Event;
use carve_model::Project;

use crate::builder::{BuildInputs, SubMachineBuilder, SubModelOutput};
use crate::errors::DecompositionError;
use crate::flatten::Flattener;
use crate::options::{ContextMode, DecompositionOptions};
use crate::oracle::TypeOracle;
use crate::partition::Decomposition;
use crate::progress::ProgressMonitor;
use crate::repository::{Artifact, ArtifactKind, ArtifactLocation, ModelRepository};

/// Result of a decomposition run.
#[derive(Debug, Default, Serialize)]
pub struct DecompositionReport {
    /// Completed sub-machines, in sub-model order.
    pub outputs: Vec<SubModelOutput>,
    /// Recoverable problems, in the order they were met.
    #[serde(serialize_with = "serialize_warnings")]
    pub warnings: Vec<DecompositionError>,
    /// The run stopped early; `outputs` holds what was completed.
    pub cancelled: bool,
}

fn serialize_warnings<S: serde::Serializer>(
    warnings: &[DecompositionError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(warnings.iter().map(|w| w.to_string()))
}

/// Drives the decomposition of one source project.
pub struct Decomposer<'a> {
    project: &'a Project,
    repository: &'a mut dyn ModelRepository,
    oracle: &'a dyn TypeOracle,
    options: DecompositionOptions,
}

impl<'a> Decomposer<'a> {
    pub fn new(
        project: &'a Project,
        repository: &'a mut dyn ModelRepository,
        oracle: &'a dyn TypeOracle,
        options: DecompositionOptions,
    ) -> Self {
        Self {
            project,
            repository,
            oracle,
            options,
        }
    }

    pub fn options(&self) -> &DecompositionOptions {
        &self.options
    }

    /// Build one sub-machine per sub-model of `decomposition`.
    ///
    /// Cancellation is checked before each sub-model; sub-machines saved
    /// before a cancellation or a fatal error are left in the repository.
    /// `progress` is closed with `done()` on every path after `begin_task`.
    pub fn decompose(
        &mut self,
        decomposition: &mut Decomposition,
        progress: &mut dyn ProgressMonitor,
    ) -> Result<DecompositionReport, DecompositionError> {
        let project = self.project;
        decomposition.validate(project)?;
        let source = decomposition.machine();
        let machine_name = &project.machine(source).name;
        let total = decomposition.sub_models().len();
        info!(
            machine = %machine_name,
            sub_models = total,
            context_mode = %self.options.context_mode,
            separate_projects = self.options.separate_projects,
            "Starting decomposition"
        );

        let mut report = DecompositionReport::default();
        for reference in project.unresolved_references() {
            warn!(
                from = %reference.from,
                kind = ?reference.kind,
                target = %reference.target,
                "Unresolved reference in source project"
            );
        }

        let events = Flattener::new(project).flatten_machine(source, &mut report.warnings);
        let shared = decomposition.shared_variables(project).clone();
        if self.options.context_mode == ContextMode::Copy {
            self.publish_seen_contexts(decomposition)?;
        }

        progress.begin_task("decompose", total);
        let outcome = self.build_sub_models(decomposition, &events, &shared, progress, &mut report);
        progress.done();
        outcome?;

        info!(
            machine = %machine_name,
            outputs = report.outputs.len(),
            warnings = report.warnings.len(),
            cancelled = report.cancelled,
            "Decomposition finished"
        );
        Ok(report)
    }

    fn build_sub_models(
        &mut self,
        decomposition: &mut Decomposition,
        events: &[Event],
        shared: &IndexSet<String>,
        progress: &mut dyn ProgressMonitor,
        report: &mut DecompositionReport,
    ) -> Result<(), DecompositionError> {
        let project = self.project;
        let total = decomposition.sub_models().len();
        for index in 0..total {
            if progress.is_cancelled() {
                info!(completed = report.outputs.len(), total, "Decomposition cancelled");
                report.cancelled = true;
                break;
            }
            let accessed = decomposition.accessed_variables(project, index).clone();
            let sub_model = decomposition.sub_model(index);
            let inputs = BuildInputs {
                project,
                oracle: self.oracle,
                options: &self.options,
                source: decomposition.machine(),
                events,
                shared,
            };
            let mut builder = SubMachineBuilder::create(
                inputs,
                sub_model.name(),
                sub_model.event_labels().clone(),
                accessed,
                &mut *self.repository,
            )?;
            let output = builder.build(&mut *self.repository)?;
            report.warnings.extend(builder.take_warnings());
            report.outputs.push(output);
            progress.worked(1);
        }
        Ok(())
    }

    /// Store the contexts seen by the source machine in the default project,
    /// where the sub-machines refer to them or copy them from.
    fn publish_seen_contexts(&mut self, decomposition: &Decomposition) -> Result<(), DecompositionError> {
        let project = self.project;
        for id in project.seen_contexts(decomposition.machine()) {
            let context = project.context(id);
            let location =
                ArtifactLocation::new(self.options.default_project.clone(), context.name.clone());
            let handle = self
                .repository
                .create_artifact(ArtifactKind::Context, location)
                .map_err(|e| DecompositionError::repository(&context.name, e))?;
            self.repository
                .write(&handle, Artifact::Context(context.clone()))
                .and_then(|()| self.repository.save(&handle))
                .map_err(|e| DecompositionError::repository(&context.name, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::DeclaredTypes;
    use crate::partition::SubModel;
    use crate::errors::RepositoryError;
    use crate::progress::{CancellationToken, NullProgress};
    use crate::repository::{ArtifactHandle, InMemoryRepository};
    use std::path::PathBuf;
    use carve_model::builder::*;
    use carve_model::context::Context;
    use carve_model::machine::{Event, Machine, Variable};
    use carve_model::{Assignment, Type};

    fn project() -> Project {
        let mut c = Context::new("c0");
        c.sets.push("S".into());
        let mut m = Machine::new("m");
        m.sees.push("c0".into());
        for v in ["a", "b"] {
            m.variables.push(Variable::typed(v, Type::Integer));
        }
        m.events.push(Event::initialisation().with_action(
            "init",
            Assignment::render(becomes_equal(&["a", "b"], vec![int(0), int(0)])),
        ));
        m.events.push(
            Event::new("ea")
                .with_action("act", Assignment::render(becomes_equal(&["a"], vec![add(ident("a"), int(1))]))),
        );
        m.events.push(
            Event::new("eb")
                .with_action("act", Assignment::render(becomes_equal(&["b"], vec![ident("a")]))),
        );
        Project::new(vec![m], vec![c]).unwrap()
    }

    fn partition(project: &Project) -> Decomposition {
        let mut d = Decomposition::for_machine(project, "m").unwrap();
        d.add_sub_model(SubModel::new("m_a", vec!["ea".to_string()]));
        d.add_sub_model(SubModel::new("m_b", vec!["eb".to_string()]));
        d
    }

    /// Cancels after the first sub-model.
    struct CancelAfterFirst {
        worked: usize,
    }

    impl ProgressMonitor for CancelAfterFirst {
        fn begin_task(&mut self, _name: &str, _total: usize) {}
        fn worked(&mut self, units: usize) {
            self.worked += units;
        }
        fn is_cancelled(&self) -> bool {
            self.worked >= 1
        }
        fn done(&mut self) {}
    }

    #[test]
    fn decomposes_every_sub_model_in_order() {
        let p = project();
        let oracle = DeclaredTypes::new(&p);
        let mut repo = InMemoryRepository::new();
        let mut d = partition(&p);
        let report = Decomposer::new(&p, &mut repo, &oracle, DecompositionOptions::default())
            .decompose(&mut d, &mut NullProgress)
            .unwrap();
        assert!(!report.cancelled);
        let names: Vec<_> = report.outputs.iter().map(|o| o.machine.as_str()).collect();
        assert_eq!(names, vec!["m_a", "m_b"]);
        assert_eq!(report.outputs[0].shared, vec!["a"]);
        assert!(repo.context("decomposed", "c0").is_some());
        assert!(repo.machine("decomposed", "m_b").is_some());
        assert!(!d.is_out_of_date());
    }

    #[test]
    fn cancellation_keeps_completed_sub_machines() {
        let p = project();
        let oracle = DeclaredTypes::new(&p);
        let mut repo = InMemoryRepository::new();
        let mut d = partition(&p);
        let report = Decomposer::new(&p, &mut repo, &oracle, DecompositionOptions::default())
            .decompose(&mut d, &mut CancelAfterFirst { worked: 0 })
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.outputs.len(), 1);
        assert!(repo.machine("decomposed", "m_a").is_some());
        assert!(repo.machine("decomposed", "m_b").is_none());
    }

    #[test]
    fn cancelled_token_builds_nothing() {
        let p = project();
        let oracle = DeclaredTypes::new(&p);
        let mut repo = InMemoryRepository::new();
        let mut d = partition(&p);
        let mut token = CancellationToken::new();
        token.cancel();
        let report = Decomposer::new(&p, &mut repo, &oracle, DecompositionOptions::default())
            .decompose(&mut d, &mut token)
            .unwrap();
        assert!(report.cancelled);
        assert!(report.outputs.is_empty());
    }

    #[test]
    fn invalid_partitions_build_nothing() {
        let p = project();
        let oracle = DeclaredTypes::new(&p);
        let mut repo = InMemoryRepository::new();
        let mut d = partition(&p);
        d.add_event_label(1, "ea");
        let err = Decomposer::new(&p, &mut repo, &oracle, DecompositionOptions::default())
            .decompose(&mut d, &mut NullProgress)
            .unwrap_err();
        assert!(matches!(err, DecompositionError::InvalidPartition { .. }));
        assert_eq!(repo.saved().count(), 0);
    }

    /// Delegates to an in-memory store but fails the second machine save.
    struct FailingSecondMachine {
        inner: InMemoryRepository,
        machine_saves: usize,
    }

    impl ModelRepository for FailingSecondMachine {
        fn create_artifact(
            &mut self,
            kind: ArtifactKind,
            location: ArtifactLocation,
        ) -> Result<ArtifactHandle, RepositoryError> {
            self.inner.create_artifact(kind, location)
        }

        fn open(&self, location: &ArtifactLocation) -> Result<Artifact, RepositoryError> {
            self.inner.open(location)
        }

        fn write(&mut self, handle: &ArtifactHandle, artifact: Artifact) -> Result<(), RepositoryError> {
            self.inner.write(handle, artifact)
        }

        fn save(&mut self, handle: &ArtifactHandle) -> Result<(), RepositoryError> {
            if handle.kind == ArtifactKind::Machine {
                self.machine_saves += 1;
                if self.machine_saves == 2 {
                    return Err(RepositoryError::Io {
                        path: PathBuf::from("m_b.machine.json"),
                        source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                    });
                }
            }
            self.inner.save(handle)
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        begun: bool,
        worked: usize,
        done: bool,
    }

    impl ProgressMonitor for RecordingProgress {
        fn begin_task(&mut self, _name: &str, _total: usize) {
            self.begun = true;
        }
        fn worked(&mut self, units: usize) {
            self.worked += units;
        }
        fn is_cancelled(&self) -> bool {
            false
        }
        fn done(&mut self) {
            self.done = true;
        }
    }

    #[test]
    fn repository_failure_aborts_with_sub_model_context() {
        let p = project();
        let oracle = DeclaredTypes::new(&p);
        let mut repo = FailingSecondMachine {
            inner: InMemoryRepository::new(),
            machine_saves: 0,
        };
        let mut d = partition(&p);
        let mut progress = RecordingProgress::default();
        let err = Decomposer::new(&p, &mut repo, &oracle, DecompositionOptions::default())
            .decompose(&mut d, &mut progress)
            .unwrap_err();

        assert!(matches!(
            &err,
            DecompositionError::Repository { artifact, source: RepositoryError::Io { .. } }
                if artifact == "m_b"
        ));
        assert!(repo.inner.machine("decomposed", "m_a").is_some());
        assert!(repo.inner.machine("decomposed", "m_b").is_none());
        assert!(progress.begun);
        assert_eq!(progress.worked, 1);
        assert!(progress.done);
    }

    #[test]
    fn unresolvable_refinement_is_reported_once_per_run() {
        let mut m = project().machine(0).clone();
        m.events.push(
            Event::new("ec")
                .extending("ghost")
                .with_action("act", Assignment::render(becomes_equal(&["b"], vec![int(0)]))),
        );
        let mut c = Context::new("c0");
        c.sets.push("S".into());
        let p = Project::new(vec![m], vec![c]).unwrap();
        let oracle = DeclaredTypes::new(&p);
        let mut repo = InMemoryRepository::new();
        let mut d = partition(&p);
        d.add_sub_model(SubModel::new("m_c", vec!["ec".to_string()]));

        let report = Decomposer::new(&p, &mut repo, &oracle, DecompositionOptions::default())
            .decompose(&mut d, &mut NullProgress)
            .unwrap();
        assert_eq!(report.outputs.len(), 3);
        let unresolved: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| matches!(w, DecompositionError::UnresolvableRefinement { .. }))
            .collect();
        assert_eq!(unresolved.len(), 1, "{:#?}", report.warnings);
    }

    #[test]
    fn report_serializes_warnings_as_messages() {
        let report = DecompositionReport {
            outputs: Vec::new(),
            warnings: vec![DecompositionError::MissingType {
                sub_model: "m_a".into(),
                identifier: "x".into(),
            }],
            cancelled: false,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["warnings"][0].as_str().unwrap().contains("'x'"));
    }
}

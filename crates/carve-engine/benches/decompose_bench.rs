use criterion::{black_box, criterion_group, criterion_main, Criterion};

use carve_engine::action::decompose_action;
use carve_engine::oracle::DeclaredTypes;
use carve_engine::partition::{Decomposition, SubModel};
use carve_engine::progress::NullProgress;
use carve_engine::repository::InMemoryRepository;
use carve_engine::{Decomposer, DecompositionOptions};
use carve_model::builder::*;
use carve_model::machine::{Event, Machine, Variable};
use carve_model::{Assignment, Predicate, Project, Type};
use indexmap::IndexSet;

const VARIABLES: usize = 24;
const EVENTS: usize = 96;

/// A ring of counters: event `e{i}` reads `v{i}` and `v{i+1}` and writes
/// both.
fn ring_project() -> Project {
    let names: Vec<String> = (0..VARIABLES).map(|i| format!("v{i}")).collect();
    let mut m = Machine::new("ring");
    for name in &names {
        m.variables.push(Variable::typed(name.clone(), Type::Integer));
    }
    let all: Vec<&str> = names.iter().map(String::as_str).collect();
    m.events.push(Event::initialisation().with_action(
        "init",
        Assignment::render(becomes_equal(&all, all.iter().map(|_| int(0)).collect())),
    ));
    for i in 0..EVENTS {
        let a = &names[i % VARIABLES];
        let b = &names[(i + 1) % VARIABLES];
        m.events.push(
            Event::new(format!("e{i}"))
                .with_guard("grd", Predicate::render(lt(ident(a.as_str()), ident(b.as_str()))))
                .with_action(
                    "act",
                    Assignment::render(becomes_equal(
                        &[a.as_str(), b.as_str()],
                        vec![add(ident(a.as_str()), int(1)), sub(ident(b.as_str()), int(1))],
                    )),
                ),
        );
    }
    Project::new(vec![m], vec![]).unwrap()
}

fn ring_partition(project: &Project, sub_models: usize) -> Decomposition {
    let mut d = Decomposition::for_machine(project, "ring").unwrap();
    for s in 0..sub_models {
        let labels = (0..EVENTS)
            .filter(|i| i % sub_models == s)
            .map(|i| format!("e{i}"));
        d.add_sub_model(SubModel::new(format!("ring_{s}"), labels));
    }
    d
}

fn bench_decompose_ring(c: &mut Criterion) {
    let project = ring_project();
    let oracle = DeclaredTypes::new(&project);
    c.bench_function("engine_decompose_ring_4", |b| {
        b.iter(|| {
            let mut repo = InMemoryRepository::new();
            let mut decomposition = ring_partition(&project, 4);
            Decomposer::new(&project, &mut repo, &oracle, DecompositionOptions::default())
                .decompose(black_box(&mut decomposition), &mut NullProgress)
                .unwrap()
        })
    });
}

fn bench_shared_variables(c: &mut Criterion) {
    let project = ring_project();
    c.bench_function("engine_shared_variables_ring_8", |b| {
        b.iter(|| {
            let mut decomposition = ring_partition(&project, 8);
            decomposition.shared_variables(black_box(&project)).len()
        })
    });
}

fn bench_decompose_action(c: &mut Criterion) {
    let names: Vec<String> = (0..VARIABLES).map(|i| format!("v{i}")).collect();
    let all: Vec<&str> = names.iter().map(String::as_str).collect();
    let assignment = Assignment::render(becomes_equal(
        &all,
        all.iter().map(|v| add(ident(*v), int(1))).collect(),
    ));
    let targets: IndexSet<String> = names.iter().step_by(3).cloned().collect();
    c.bench_function("engine_decompose_action_wide", |b| {
        b.iter(|| decompose_action(black_box(&assignment), black_box(&targets)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_decompose_ring,
    bench_shared_variables,
    bench_decompose_action
);
criterion_main!(benches);

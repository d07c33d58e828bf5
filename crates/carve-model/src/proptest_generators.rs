//! Proptest strategies for well-formed formulas, machines and refinement
//! chains.

use proptest::prelude::*;

use crate::builder::*;
use crate::formula::{Assignment, Predicate, Type};
use crate::machine::{Event, Machine, Variable};
use crate::project::Project;

/// Variable names used by the generators.
pub const VARIABLE_POOL: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn pool_subset(min: usize) -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(VARIABLE_POOL.to_vec(), min..=VARIABLE_POOL.len())
}

/// Strategy for an assignment of any of the three shapes over the pool.
///
/// Membership assignments always assign exactly one identifier.
pub fn arb_assignment() -> impl Strategy<Value = Assignment> {
    (
        pool_subset(1),
        0..3u8,
        proptest::collection::vec((0..VARIABLE_POOL.len(), -3..10i64), VARIABLE_POOL.len()),
    )
        .prop_map(|(assigned, shape, operands)| {
            let rhs = |i: usize| {
                let (var, k) = operands[i % operands.len()];
                add(ident(VARIABLE_POOL[var]), int(k))
            };
            match shape {
                0 => Assignment::render(becomes_equal(
                    &assigned,
                    (0..assigned.len()).map(rhs).collect(),
                )),
                1 => Assignment::render(becomes_member(
                    assigned[0],
                    up_to(int(0), ident(VARIABLE_POOL[operands[0].0])),
                )),
                _ => {
                    let conjuncts = assigned
                        .iter()
                        .enumerate()
                        .map(|(i, name)| eq(ident(format!("{name}'")), rhs(i)))
                        .collect();
                    Assignment::render(becomes_such_that(&assigned, and(conjuncts)))
                }
            }
        })
}

/// Strategy for a target variable set drawn from the pool.
pub fn arb_target_set() -> impl Strategy<Value = Vec<&'static str>> {
    pool_subset(0)
}

fn guard_on(var: &str, bound: i64) -> Predicate {
    Predicate::render(ge(ident(var), int(bound)))
}

fn arb_event(label: String) -> impl Strategy<Value = Event> {
    (
        proptest::collection::vec((0..VARIABLE_POOL.len(), 0..5i64), 0..3),
        proptest::collection::vec(arb_assignment(), 0..3),
    )
        .prop_map(move |(guards, actions)| {
            let mut event = Event::new(label.clone());
            for (i, (var, bound)) in guards.into_iter().enumerate() {
                event = event.with_guard(format!("grd{i}"), guard_on(VARIABLE_POOL[var], bound));
            }
            for (i, assignment) in actions.into_iter().enumerate() {
                event = event.with_action(format!("act{i}"), assignment);
            }
            event
        })
}

/// Strategy for a two-level refinement chain `m0 ⊑ m1` in which some
/// concrete events extend their abstract namesake.
///
/// All machines share the variable pool, typed as integers, and both carry
/// an `INITIALISATION` event.
pub fn arb_refinement_project() -> impl Strategy<Value = Project> {
    (1..5usize)
        .prop_flat_map(|nevents| {
            let abstract_events: Vec<_> = (0..nevents).map(|i| arb_event(format!("evt{i}"))).collect();
            let concrete_events: Vec<_> = (0..nevents).map(|i| arb_event(format!("evt{i}"))).collect();
            (
                abstract_events,
                concrete_events,
                proptest::collection::vec(any::<bool>(), nevents),
            )
        })
        .prop_map(|(abstract_events, concrete_events, extended)| {
            let variables: Vec<_> = VARIABLE_POOL
                .iter()
                .map(|name| Variable::typed(*name, Type::Integer))
                .collect();
            let init = Event::initialisation().with_action(
                "init",
                Assignment::render(becomes_equal(
                    &VARIABLE_POOL,
                    VARIABLE_POOL.iter().map(|_| int(0)).collect(),
                )),
            );

            let mut m0 = Machine::new("m0");
            m0.variables = variables.clone();
            m0.events.push(init.clone());
            m0.events.extend(abstract_events);

            let mut m1 = Machine::new("m1");
            m1.refines = Some("m0".into());
            m1.variables = variables;
            let mut concrete_init = Event::initialisation();
            concrete_init.extended = true;
            m1.events.push(concrete_init);
            for (mut event, extends) in concrete_events.into_iter().zip(extended) {
                event.refines = Some(event.label.clone());
                event.extended = extends;
                m1.events.push(event);
            }
            Project::new(vec![m0, m1], vec![]).expect("generated project is well formed")
        })
}

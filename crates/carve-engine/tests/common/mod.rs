#![allow(dead_code)]

use carve_engine::partition::{Decomposition, SubModel};
use carve_model::builder::*;
use carve_model::context::{Axiom, Constant, Context};
use carve_model::machine::{Event, Invariant, Machine, Variable};
use carve_model::{Assignment, Predicate, Project, Type};

pub fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn assign(vars: &[&str], values: Vec<carve_model::ast::Spanned<carve_model::ast::Expr>>) -> Assignment {
    Assignment::render(becomes_equal(vars, values))
}

fn pred(p: carve_model::ast::Spanned<carve_model::ast::Pred>) -> Predicate {
    Predicate::render(p)
}

/// A bounded buffer refined with send/receive counters.
///
/// * `c0`: carrier set `ITEM`, constant `CAP` with `CAP > 0`.
/// * `c1` extends `c0`: constant `item0 ∈ ITEM`.
/// * `m0`: `count` bounded by `CAP`; `produce` / `consume` move it.
/// * `m1` refines `m0`, sees `c1`: adds `sent`, `received` and `last`;
///   every event extends its abstract namesake.
pub fn buffer_project() -> Project {
    let mut c0 = Context::new("c0");
    c0.sets.push("ITEM".into());
    c0.constants.push(Constant::typed("CAP", Type::Integer));
    c0.axioms.push(Axiom {
        label: "axm1".into(),
        predicate: pred(gt(ident("CAP"), int(0))),
        theorem: false,
    });
    let mut c1 = Context::new("c1");
    c1.extends.push("c0".into());
    c1.constants.push(Constant::typed("item0", Type::Given("ITEM".into())));
    c1.axioms.push(Axiom {
        label: "axm1".into(),
        predicate: pred(member(ident("item0"), ident("ITEM"))),
        theorem: false,
    });

    let mut m0 = Machine::new("m0");
    m0.sees.push("c0".into());
    m0.variables.push(Variable::typed("count", Type::Integer));
    m0.invariants.push(Invariant {
        label: "inv1".into(),
        predicate: pred(le(ident("count"), ident("CAP"))),
        theorem: false,
    });
    m0.events.push(
        Event::initialisation().with_action("init1", assign(&["count"], vec![int(0)])),
    );
    m0.events.push(
        Event::new("produce")
            .with_guard("grd1", pred(lt(ident("count"), ident("CAP"))))
            .with_action("act1", assign(&["count"], vec![add(ident("count"), int(1))])),
    );
    m0.events.push(
        Event::new("consume")
            .with_guard("grd1", pred(gt(ident("count"), int(0))))
            .with_action("act1", assign(&["count"], vec![sub(ident("count"), int(1))])),
    );

    let mut m1 = Machine::new("m1");
    m1.refines = Some("m0".into());
    m1.sees.push("c1".into());
    m1.variables.push(Variable::typed("count", Type::Integer));
    m1.variables.push(Variable::typed("sent", Type::Integer));
    m1.variables.push(Variable::typed("received", Type::Integer));
    m1.variables.push(Variable::typed("last", Type::Given("ITEM".into())));
    m1.invariants.push(Invariant {
        label: "inv2".into(),
        predicate: pred(le(ident("received"), ident("sent"))),
        theorem: false,
    });
    let mut init = Event::initialisation()
        .with_action("init2", assign(&["sent", "received"], vec![int(0), int(0)]))
        .with_action(
            "init3",
            Assignment::render(becomes_member("last", ident("ITEM"))),
        );
    init.extended = true;
    m1.events.push(init);
    m1.events.push(
        Event::new("produce")
            .extending("produce")
            .with_parameter("i")
            .with_guard("grd2", pred(member(ident("i"), ident("ITEM"))))
            .with_action(
                "act2",
                assign(&["sent", "last"], vec![add(ident("sent"), int(1)), ident("i")]),
            ),
    );
    m1.events.push(
        Event::new("consume")
            .extending("consume")
            .with_action("act2", assign(&["received"], vec![add(ident("received"), int(1))])),
    );

    Project::new(vec![m0, m1], vec![c0, c1]).expect("fixture is well formed")
}

/// `P` owns `produce`, `C` owns `consume`.
pub fn buffer_partition(project: &Project) -> Decomposition {
    let mut d = Decomposition::for_machine(project, "m1").expect("m1 exists");
    d.add_sub_model(SubModel::new("P", strings(&["produce"])));
    d.add_sub_model(SubModel::new("C", strings(&["consume"])));
    d
}

/// Two halves that never touch each other's variables.
pub fn independent_project() -> Project {
    let mut m = Machine::new("twins");
    for v in ["l", "r"] {
        m.variables.push(Variable::typed(v, Type::Integer));
    }
    m.events.push(
        Event::initialisation().with_action("init", assign(&["l", "r"], vec![int(0), int(0)])),
    );
    for (label, var) in [("left_up", "l"), ("left_down", "l"), ("right_up", "r")] {
        m.events.push(Event::new(label).with_action(
            "act",
            assign(&[var], vec![add(ident(var), int(1))]),
        ));
    }
    Project::new(vec![m], vec![]).expect("fixture is well formed")
}

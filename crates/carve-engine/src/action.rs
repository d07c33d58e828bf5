//! Projection of actions onto a subset of the state variables.
//!
//! The rewritten formulas are assembled from slices of the source text, so
//! every sub-formula that survives keeps its exact textual form.

use indexmap::IndexSet;

use carve_model::ast::{Assign, Connective, Expr, Ident, Pred, Quantifier, RelOp, Span, Spanned};
use carve_model::formula::SliceWriter;
use carve_model::Assignment;

use crate::errors::ShapeError;

/// Check the shape contract of an assignment.
pub fn check_shape(assignment: &Assignment) -> Result<(), ShapeError> {
    let text = || assignment.text().to_string();
    match assignment.root() {
        Assign::BecomesEqualTo { assigned, values } => {
            if assigned.is_empty() {
                return Err(ShapeError::NothingAssigned { text: text() });
            }
            if assigned.len() != values.len() {
                return Err(ShapeError::ArityMismatch {
                    text: text(),
                    assigned: assigned.len(),
                    values: values.len(),
                });
            }
        }
        Assign::BecomesMemberOf { assigned, .. } => {
            if assigned.len() != 1 {
                return Err(ShapeError::MembershipArity {
                    text: text(),
                    assigned: assigned.len(),
                });
            }
        }
        Assign::BecomesSuchThat { assigned, .. } => {
            if assigned.is_empty() {
                return Err(ShapeError::NothingAssigned { text: text() });
            }
        }
    }
    Ok(())
}

/// Restrict `assignment` to the identifiers in `targets`.
///
/// * No assigned identifier is a target: `Ok(None)`, the action is dropped.
/// * Every assigned identifier is a target: the action is returned unchanged.
/// * `v, w ≔ E, F` with `v` kept and `w` dropped becomes `v ≔ E`.
/// * `v, w :∣ P` becomes `v :∣ ∃w'· P`.
///
/// Kept identifiers stay in their original left-to-right order.
pub fn decompose_action(
    assignment: &Assignment,
    targets: &IndexSet<String>,
) -> Result<Option<Assignment>, ShapeError> {
    check_shape(assignment)?;

    let assigned = assignment.assigned();
    let kept: Vec<usize> = (0..assigned.len())
        .filter(|&i| targets.contains(&assigned[i].node))
        .collect();
    if kept.is_empty() {
        return Ok(None);
    }
    if kept.len() == assigned.len() {
        return Ok(Some(assignment.clone()));
    }

    let source = assignment.text();
    let mut w = SliceWriter::new();
    let kept_idents = copy_idents(&mut w, source, assigned, &kept);

    let root = match assignment.root() {
        Assign::BecomesEqualTo { values, .. } => {
            w.push(" ≔ ");
            let mut kept_values = Vec::with_capacity(kept.len());
            for (n, &i) in kept.iter().enumerate() {
                if n > 0 {
                    w.push(", ");
                }
                kept_values.push(w.copy(source, &values[i], values[i].span));
            }
            Assign::BecomesEqualTo {
                assigned: kept_idents,
                values: kept_values,
            }
        }
        Assign::BecomesSuchThat { condition, .. } => {
            w.push(" :∣ ");
            let start = w.len();
            w.push(Quantifier::Exists.symbol());
            let mut bound = Vec::new();
            for (n, ident) in assigned
                .iter()
                .enumerate()
                .filter(|(i, _)| !kept.contains(i))
                .map(|(_, ident)| ident)
                .enumerate()
            {
                if n > 0 {
                    w.push(",");
                }
                bound.push(w.ident(&format!("{}'", ident.node)));
            }
            w.push("· ");
            let body = w.copy(source, condition, condition.span);
            let end = w.len();
            Assign::BecomesSuchThat {
                assigned: kept_idents,
                condition: Spanned::new(
                    Pred::Quantified(Quantifier::Exists, bound, Box::new(body)),
                    Span::new(start, end),
                ),
            }
        }
        // A single assigned identifier is either kept or dropped.
        Assign::BecomesMemberOf { assigned, .. } => {
            return Err(ShapeError::MembershipArity {
                text: source.to_string(),
                assigned: assigned.len(),
            })
        }
    };

    w.finish_assignment(root)
        .map(Some)
        .map_err(|e| ShapeError::Rebuild(e.to_string()))
}

/// Rewrite an assignment into its before-after form `v :∣ P(v, v')`.
///
/// `v, w ≔ E, F` becomes `v, w :∣ v' = E ∧ w' = F` and `v :∈ S` becomes
/// `v :∣ v' ∈ S`; a before-after assignment is returned unchanged.
pub fn to_before_after(assignment: &Assignment) -> Result<Assignment, ShapeError> {
    check_shape(assignment)?;
    let source = assignment.text();
    let assigned = assignment.assigned();
    let all: Vec<usize> = (0..assigned.len()).collect();

    let (op, rhs): (RelOp, Vec<&Spanned<Expr>>) = match assignment.root() {
        Assign::BecomesSuchThat { .. } => return Ok(assignment.clone()),
        Assign::BecomesEqualTo { values, .. } => (RelOp::Eq, values.iter().collect()),
        Assign::BecomesMemberOf { set, .. } => (RelOp::In, vec![set]),
    };

    let mut w = SliceWriter::new();
    let idents = copy_idents(&mut w, source, assigned, &all);
    w.push(" :∣ ");
    let start = w.len();
    let mut conjuncts = Vec::with_capacity(rhs.len());
    for (i, value) in rhs.into_iter().enumerate() {
        if i > 0 {
            w.push(" ∧ ");
        }
        let rel_start = w.len();
        let primed = w.ident(&format!("{}'", assigned[i].node));
        w.push(" ");
        w.push(op.symbol());
        w.push(" ");
        let copied = w.copy(source, value, value.span);
        conjuncts.push(Spanned::new(
            Pred::Relation(
                op,
                Box::new(Spanned::new(Expr::Ident(primed.node), primed.span)),
                Box::new(copied),
            ),
            Span::new(rel_start, w.len()),
        ));
    }
    let condition = if conjuncts.len() == 1 {
        conjuncts.remove(0)
    } else {
        Spanned::new(Pred::Assoc(Connective::And, conjuncts), Span::new(start, w.len()))
    };
    w.finish_assignment(Assign::BecomesSuchThat {
        assigned: idents,
        condition,
    })
    .map_err(|e| ShapeError::Rebuild(e.to_string()))
}

fn copy_idents(w: &mut SliceWriter, source: &str, assigned: &[Ident], which: &[usize]) -> Vec<Ident> {
    let mut out = Vec::with_capacity(which.len());
    for (n, &i) in which.iter().enumerate() {
        if n > 0 {
            w.push(", ");
        }
        out.push(w.copy(source, &assigned[i], assigned[i].span));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_model::builder::*;

    fn targets(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn swap_plus_two() -> Assignment {
        Assignment::render(becomes_equal(
            &["x", "y"],
            vec![add(ident("y"), int(2)), ident("x")],
        ))
    }

    #[test]
    fn before_after_of_swap_decomposes_with_primed_quantifier() {
        let before_after = to_before_after(&swap_plus_two()).unwrap();
        assert_eq!(before_after.text(), "x, y :∣ x' = y + 2 ∧ y' = x");
        let out = decompose_action(&before_after, &targets(&["y"]))
            .unwrap()
            .unwrap();
        assert_eq!(out.text(), "y :∣ ∃x'· x' = y + 2 ∧ y' = x");
    }

    #[test]
    fn deterministic_mixed_keeps_matching_values() {
        let out = decompose_action(&swap_plus_two(), &targets(&["y"]))
            .unwrap()
            .unwrap();
        assert_eq!(out.text(), "y ≔ x");
        let out = decompose_action(&swap_plus_two(), &targets(&["x"]))
            .unwrap()
            .unwrap();
        assert_eq!(out.text(), "x ≔ y + 2");
    }

    #[test]
    fn fully_covered_action_is_unchanged() {
        let a = Assignment::render(becomes_equal(
            &["v", "u"],
            vec![sub(ident("v"), int(1)), ident("e")],
        ));
        let out = decompose_action(&a, &targets(&["v", "u"])).unwrap().unwrap();
        assert_eq!(out, a);
        assert_eq!(out.text(), "v, u ≔ v − 1, e");
    }

    #[test]
    fn unrelated_action_is_dropped() {
        let a = Assignment::render(becomes_such_that(
            &["y"],
            eq(ident("y'"), sub(ident("y"), int(4))),
        ));
        assert_eq!(a.text(), "y :∣ y' = y − 4");
        assert!(decompose_action(&a, &targets(&["z"])).unwrap().is_none());
    }

    #[test]
    fn kept_order_follows_source_not_target_set() {
        let a = Assignment::render(becomes_equal(
            &["a", "b", "c"],
            vec![int(1), int(2), int(3)],
        ));
        let out = decompose_action(&a, &targets(&["c", "a"])).unwrap().unwrap();
        assert_eq!(out.text(), "a, c ≔ 1, 3");
    }

    #[test]
    fn several_dropped_identifiers_share_one_quantifier() {
        let a = Assignment::render(becomes_such_that(
            &["a", "b", "c"],
            and(vec![
                gt(ident("a'"), ident("b")),
                gt(ident("b'"), ident("c")),
                gt(ident("c'"), ident("a")),
            ]),
        ));
        let out = decompose_action(&a, &targets(&["b"])).unwrap().unwrap();
        assert_eq!(out.text(), "b :∣ ∃a',c'· a' > b ∧ b' > c ∧ c' > a");
        // The rebuilt tree slices back to its own text.
        let Assign::BecomesSuchThat { condition, .. } = out.root() else {
            panic!("expected before-after assignment");
        };
        let Pred::Quantified(_, bound, body) = &condition.node else {
            panic!("expected quantifier");
        };
        assert_eq!(out.slice(bound[1].span), "c'");
        assert_eq!(out.slice(body.span), "a' > b ∧ b' > c ∧ c' > a");
    }

    #[test]
    fn membership_is_all_or_nothing() {
        let a = Assignment::render(becomes_member("x", up_to(int(0), ident("n"))));
        assert!(decompose_action(&a, &targets(&["n"])).unwrap().is_none());
        assert_eq!(
            decompose_action(&a, &targets(&["x"])).unwrap().unwrap(),
            a
        );
        let ba = to_before_after(&a).unwrap();
        assert_eq!(ba.text(), "x :∣ x' ∈ 0 ‥ n");
    }

    #[test]
    fn source_layout_is_preserved() {
        // Text laid out by an external parser, not by our printer.
        let text = "x,y := y+2 ,  x";
        let root = Assign::BecomesEqualTo {
            assigned: vec![
                Spanned::new("x".into(), Span::new(0, 1)),
                Spanned::new("y".into(), Span::new(2, 3)),
            ],
            values: vec![
                Spanned::new(
                    Expr::Binary(
                        carve_model::ast::BinaryOp::Add,
                        Box::new(Spanned::new(Expr::Ident("y".into()), Span::new(7, 8))),
                        Box::new(Spanned::new(Expr::Int(2), Span::new(9, 10))),
                    ),
                    Span::new(7, 10),
                ),
                Spanned::new(Expr::Ident("x".into()), Span::new(14, 15)),
            ],
        };
        let a = Assignment::from_parts(text, root).unwrap();
        let out = decompose_action(&a, &targets(&["x"])).unwrap().unwrap();
        assert_eq!(out.text(), "x ≔ y+2");
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        let a = Assignment::render(Assign::BecomesEqualTo {
            assigned: vec![Spanned::bare("x".to_string()), Spanned::bare("y".to_string())],
            values: vec![int(1)],
        });
        assert!(matches!(
            decompose_action(&a, &targets(&["x"])),
            Err(ShapeError::ArityMismatch {
                assigned: 2,
                values: 1,
                ..
            })
        ));
        let a = Assignment::render(Assign::BecomesMemberOf {
            assigned: vec![],
            set: ident("S"),
        });
        assert!(matches!(
            decompose_action(&a, &targets(&["x"])),
            Err(ShapeError::MembershipArity { assigned: 0, .. })
        ));
    }
}

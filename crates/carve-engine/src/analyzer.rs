//! Free and assigned identifiers of formulas and events.
//!
//! All sets are in syntactic order (first occurrence wins) so that anything
//! built from them is reproducible.

use indexmap::IndexSet;

use carve_model::ast::{Assign, Expr, Ident, Pred, Spanned};
use carve_model::machine::Event;
use carve_model::{Assignment, Predicate};

/// Collects free identifiers while tracking the names bound by enclosing
/// quantifiers and comprehensions.
#[derive(Default)]
struct Collector<'a> {
    bound: Vec<&'a str>,
    free: IndexSet<String>,
}

impl<'a> Collector<'a> {
    fn name(&mut self, name: &'a str) {
        if !self.bound.contains(&name) && !self.free.contains(name) {
            self.free.insert(name.to_string());
        }
    }

    fn with_bound(&mut self, names: &'a [Ident], f: impl FnOnce(&mut Self)) {
        let depth = self.bound.len();
        self.bound.extend(names.iter().map(|b| b.node.as_str()));
        f(self);
        self.bound.truncate(depth);
    }

    fn expr(&mut self, e: &'a Spanned<Expr>) {
        match &e.node {
            Expr::Ident(name) => self.name(name),
            Expr::Int(_) | Expr::Atom(_) => {}
            Expr::Unary(_, operand) => self.expr(operand),
            Expr::Binary(_, l, r) | Expr::Apply(l, r) | Expr::Image(l, r) => {
                self.expr(l);
                self.expr(r);
            }
            Expr::SetExtension(members) => {
                for m in members {
                    self.expr(m);
                }
            }
            Expr::Comprehension {
                bound,
                predicate,
                expr,
            } => self.with_bound(bound, |c| {
                c.pred(predicate);
                c.expr(expr);
            }),
            Expr::Bool(p) => self.pred(p),
        }
    }

    fn pred(&mut self, p: &'a Spanned<Pred>) {
        match &p.node {
            Pred::Literal(_) => {}
            Pred::Relation(_, l, r) => {
                self.expr(l);
                self.expr(r);
            }
            Pred::Not(inner) => self.pred(inner),
            Pred::Assoc(_, children) => {
                for child in children {
                    self.pred(child);
                }
            }
            Pred::Implies(l, r) | Pred::Equiv(l, r) => {
                self.pred(l);
                self.pred(r);
            }
            Pred::Quantified(_, bound, body) => self.with_bound(bound, |c| c.pred(body)),
            Pred::Finite(e) => self.expr(e),
        }
    }

    fn assign(&mut self, a: &'a Assign) {
        for ident in a.assigned() {
            self.name(&ident.node);
        }
        match a {
            Assign::BecomesEqualTo { values, .. } => {
                for v in values {
                    self.expr(v);
                }
            }
            Assign::BecomesMemberOf { set, .. } => self.expr(set),
            Assign::BecomesSuchThat {
                assigned,
                condition,
            } => {
                // After-state copies of the assigned identifiers are bound by
                // the assignment itself.
                let primed: Vec<String> = assigned.iter().map(|a| format!("{}'", a.node)).collect();
                let mut inner = Collector {
                    bound: self.bound.clone(),
                    free: std::mem::take(&mut self.free),
                };
                inner.bound.extend(primed.iter().map(String::as_str));
                inner.pred(condition);
                self.free = inner.free;
            }
        }
    }
}

/// Free identifiers of a predicate, in syntactic order.
pub fn free_identifiers(predicate: &Predicate) -> IndexSet<String> {
    let mut c = Collector::default();
    c.pred(predicate.root());
    c.free
}

/// Free identifiers of an assignment: the assigned identifiers followed by
/// those of the right-hand side or before-after condition.
pub fn free_identifiers_of_assignment(assignment: &Assignment) -> IndexSet<String> {
    let mut c = Collector::default();
    c.assign(assignment.root());
    c.free
}

/// Left-hand side identifiers, in their original order.
pub fn assigned_identifiers(assignment: &Assignment) -> Vec<String> {
    assignment
        .assigned()
        .iter()
        .map(|ident| ident.node.clone())
        .collect()
}

/// Free identifiers of an event's guards and actions, in that order.
///
/// Parameters occur here like any other identifier; callers that want state
/// variables only remove them.
pub fn event_free_identifiers(event: &Event) -> IndexSet<String> {
    let mut c = Collector::default();
    for guard in &event.guards {
        c.pred(guard.predicate.root());
    }
    for action in &event.actions {
        c.assign(action.assignment.root());
    }
    c.free
}

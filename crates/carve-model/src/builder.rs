//! Span-less tree constructors.
//!
//! Trees built here carry empty spans; pass them through
//! [`Predicate::render`](crate::formula::Predicate::render) or
//! [`Assignment::render`](crate::formula::Assignment::render) to obtain a
//! formula whose spans index into its printed text.

use crate::ast::*;

pub fn ident(name: impl Into<String>) -> Spanned<Expr> {
    Spanned::bare(Expr::Ident(name.into()))
}

pub fn int(value: i64) -> Spanned<Expr> {
    Spanned::bare(Expr::Int(value))
}

pub fn atom(atom: Atom) -> Spanned<Expr> {
    Spanned::bare(Expr::Atom(atom))
}

pub fn unary(op: UnaryOp, operand: Spanned<Expr>) -> Spanned<Expr> {
    Spanned::bare(Expr::Unary(op, Box::new(operand)))
}

pub fn binary(op: BinaryOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    Spanned::bare(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
}

pub fn add(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinaryOp::Add, lhs, rhs)
}

pub fn sub(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinaryOp::Sub, lhs, rhs)
}

pub fn mul(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinaryOp::Mul, lhs, rhs)
}

pub fn up_to(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinaryOp::UpTo, lhs, rhs)
}

pub fn union(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinaryOp::Union, lhs, rhs)
}

pub fn set_minus(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinaryOp::SetMinus, lhs, rhs)
}

pub fn maplet(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinaryOp::Mapsto, lhs, rhs)
}

pub fn apply(func: Spanned<Expr>, arg: Spanned<Expr>) -> Spanned<Expr> {
    Spanned::bare(Expr::Apply(Box::new(func), Box::new(arg)))
}

pub fn image(rel: Spanned<Expr>, set: Spanned<Expr>) -> Spanned<Expr> {
    Spanned::bare(Expr::Image(Box::new(rel), Box::new(set)))
}

pub fn set_ext(members: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    Spanned::bare(Expr::SetExtension(members))
}

pub fn comprehension(
    bound: &[&str],
    predicate: Spanned<Pred>,
    expr: Spanned<Expr>,
) -> Spanned<Expr> {
    Spanned::bare(Expr::Comprehension {
        bound: idents(bound),
        predicate: Box::new(predicate),
        expr: Box::new(expr),
    })
}

pub fn truth(value: bool) -> Spanned<Pred> {
    Spanned::bare(Pred::Literal(value))
}

pub fn rel(op: RelOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Pred> {
    Spanned::bare(Pred::Relation(op, Box::new(lhs), Box::new(rhs)))
}

pub fn eq(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Pred> {
    rel(RelOp::Eq, lhs, rhs)
}

pub fn lt(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Pred> {
    rel(RelOp::Lt, lhs, rhs)
}

pub fn le(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Pred> {
    rel(RelOp::Le, lhs, rhs)
}

pub fn gt(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Pred> {
    rel(RelOp::Gt, lhs, rhs)
}

pub fn ge(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Pred> {
    rel(RelOp::Ge, lhs, rhs)
}

pub fn member(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Pred> {
    rel(RelOp::In, lhs, rhs)
}

pub fn subset_eq(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Pred> {
    rel(RelOp::SubsetEq, lhs, rhs)
}

pub fn not(p: Spanned<Pred>) -> Spanned<Pred> {
    Spanned::bare(Pred::Not(Box::new(p)))
}

pub fn and(children: Vec<Spanned<Pred>>) -> Spanned<Pred> {
    Spanned::bare(Pred::Assoc(Connective::And, children))
}

pub fn or(children: Vec<Spanned<Pred>>) -> Spanned<Pred> {
    Spanned::bare(Pred::Assoc(Connective::Or, children))
}

pub fn implies(lhs: Spanned<Pred>, rhs: Spanned<Pred>) -> Spanned<Pred> {
    Spanned::bare(Pred::Implies(Box::new(lhs), Box::new(rhs)))
}

pub fn equiv(lhs: Spanned<Pred>, rhs: Spanned<Pred>) -> Spanned<Pred> {
    Spanned::bare(Pred::Equiv(Box::new(lhs), Box::new(rhs)))
}

pub fn forall(bound: &[&str], body: Spanned<Pred>) -> Spanned<Pred> {
    Spanned::bare(Pred::Quantified(
        Quantifier::ForAll,
        idents(bound),
        Box::new(body),
    ))
}

pub fn exists(bound: &[&str], body: Spanned<Pred>) -> Spanned<Pred> {
    Spanned::bare(Pred::Quantified(
        Quantifier::Exists,
        idents(bound),
        Box::new(body),
    ))
}

pub fn finite(e: Spanned<Expr>) -> Spanned<Pred> {
    Spanned::bare(Pred::Finite(Box::new(e)))
}

pub fn becomes_equal(assigned: &[&str], values: Vec<Spanned<Expr>>) -> Assign {
    Assign::BecomesEqualTo {
        assigned: idents(assigned),
        values,
    }
}

pub fn becomes_member(assigned: &str, set: Spanned<Expr>) -> Assign {
    Assign::BecomesMemberOf {
        assigned: idents(&[assigned]),
        set,
    }
}

pub fn becomes_such_that(assigned: &[&str], condition: Spanned<Pred>) -> Assign {
    Assign::BecomesSuchThat {
        assigned: idents(assigned),
        condition,
    }
}

fn idents(names: &[&str]) -> Vec<Ident> {
    names
        .iter()
        .map(|name| Spanned::bare((*name).to_string()))
        .collect()
}

//! Event-B printer.
//!
//! Prints a formula tree and returns a copy of the tree whose spans index
//! into the printed text, so slicing any node yields exactly what was
//! printed for it. Parentheses are inserted from operator precedence; a
//! parenthesized child's span excludes the parentheses.

use crate::ast::*;

const ATOMIC: u8 = 10;
const POSTFIX: u8 = 9;
const NEGATION: u8 = 8;

const PRED_ATOMIC: u8 = 5;
const PRED_NOT: u8 = 4;
const PRED_AND: u8 = 3;
const PRED_OR: u8 = 2;
const PRED_IMPLICATION: u8 = 1;
const PRED_QUANTIFIED: u8 = 0;

fn expr_precedence(e: &Expr) -> u8 {
    match e {
        Expr::Ident(_) | Expr::Atom(_) | Expr::SetExtension(_) => ATOMIC,
        Expr::Comprehension { .. } | Expr::Bool(_) => ATOMIC,
        Expr::Int(v) if *v < 0 => NEGATION,
        Expr::Int(_) => ATOMIC,
        Expr::Unary(UnaryOp::Minus, _) => NEGATION,
        Expr::Unary(UnaryOp::Converse, _) => POSTFIX,
        Expr::Unary(_, _) => ATOMIC,
        Expr::Apply(..) | Expr::Image(..) => POSTFIX,
        Expr::Binary(op, ..) => op.precedence(),
    }
}

fn pred_precedence(p: &Pred) -> u8 {
    match p {
        Pred::Literal(_) | Pred::Relation(..) | Pred::Finite(_) => PRED_ATOMIC,
        Pred::Not(_) => PRED_NOT,
        Pred::Assoc(Connective::And, _) => PRED_AND,
        Pred::Assoc(Connective::Or, _) => PRED_OR,
        Pred::Implies(..) | Pred::Equiv(..) => PRED_IMPLICATION,
        Pred::Quantified(..) => PRED_QUANTIFIED,
    }
}

#[derive(Debug, Default)]
pub struct Printer {
    out: String,
}

impl Printer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn text(&self) -> &str {
        &self.out
    }

    pub fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    pub fn ident(&mut self, ident: &Ident) -> Ident {
        let start = self.out.len();
        self.out.push_str(&ident.node);
        Spanned::new(ident.node.clone(), Span::new(start, self.out.len()))
    }

    fn ident_list(&mut self, idents: &[Ident], sep: &str) -> Vec<Ident> {
        let mut printed = Vec::with_capacity(idents.len());
        for (i, ident) in idents.iter().enumerate() {
            if i > 0 {
                self.push(sep);
            }
            printed.push(self.ident(ident));
        }
        printed
    }

    fn expr_list(&mut self, exprs: &[Spanned<Expr>]) -> Vec<Spanned<Expr>> {
        let mut printed = Vec::with_capacity(exprs.len());
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            printed.push(self.expr(e));
        }
        printed
    }

    fn expr_child(&mut self, e: &Spanned<Expr>, needs_parens: bool) -> Spanned<Expr> {
        if needs_parens {
            self.push("(");
            let printed = self.expr(e);
            self.push(")");
            printed
        } else {
            self.expr(e)
        }
    }

    pub fn expr(&mut self, e: &Spanned<Expr>) -> Spanned<Expr> {
        let start = self.out.len();
        let node = match &e.node {
            Expr::Ident(name) => {
                self.push(name);
                Expr::Ident(name.clone())
            }
            Expr::Int(v) => {
                if *v < 0 {
                    self.push("−");
                    self.push(&v.unsigned_abs().to_string());
                } else {
                    self.push(&v.to_string());
                }
                Expr::Int(*v)
            }
            Expr::Atom(atom) => {
                self.push(atom.symbol());
                Expr::Atom(*atom)
            }
            Expr::Unary(op, operand) => match op {
                UnaryOp::Minus => {
                    self.push(op.symbol());
                    let parens = expr_precedence(&operand.node) < POSTFIX;
                    Expr::Unary(*op, Box::new(self.expr_child(operand, parens)))
                }
                UnaryOp::Converse => {
                    let parens = expr_precedence(&operand.node) < ATOMIC;
                    let inner = self.expr_child(operand, parens);
                    self.push(op.symbol());
                    Expr::Unary(*op, Box::new(inner))
                }
                _ => {
                    self.push(op.symbol());
                    let inner = self.expr_child(operand, true);
                    Expr::Unary(*op, Box::new(inner))
                }
            },
            Expr::Binary(op, lhs, rhs) => {
                let prec = op.precedence();
                let lhs_prec = expr_precedence(&lhs.node);
                let lhs_parens = lhs_prec < prec
                    || (lhs_prec == prec
                        && !matches!(&lhs.node, Expr::Binary(l, ..) if op.chains_left_with(*l)));
                let l = self.expr_child(lhs, lhs_parens);
                self.push(" ");
                self.push(op.symbol());
                self.push(" ");
                let r = self.expr_child(rhs, expr_precedence(&rhs.node) <= prec);
                Expr::Binary(*op, Box::new(l), Box::new(r))
            }
            Expr::Apply(func, arg) => {
                let f = self.expr_child(func, expr_precedence(&func.node) < POSTFIX);
                self.push("(");
                let a = self.expr(arg);
                self.push(")");
                Expr::Apply(Box::new(f), Box::new(a))
            }
            Expr::Image(rel, set) => {
                let r = self.expr_child(rel, expr_precedence(&rel.node) < POSTFIX);
                self.push("[");
                let s = self.expr(set);
                self.push("]");
                Expr::Image(Box::new(r), Box::new(s))
            }
            Expr::SetExtension(members) => {
                self.push("{");
                let printed = self.expr_list(members);
                self.push("}");
                Expr::SetExtension(printed)
            }
            Expr::Comprehension {
                bound,
                predicate,
                expr,
            } => {
                self.push("{");
                let b = self.ident_list(bound, ",");
                self.push(" · ");
                let p = self.pred(predicate);
                self.push(" ∣ ");
                let x = self.expr(expr);
                self.push("}");
                Expr::Comprehension {
                    bound: b,
                    predicate: Box::new(p),
                    expr: Box::new(x),
                }
            }
            Expr::Bool(p) => {
                self.push("bool(");
                let inner = self.pred(p);
                self.push(")");
                Expr::Bool(Box::new(inner))
            }
        };
        Spanned::new(node, Span::new(start, self.out.len()))
    }

    fn pred_child(&mut self, p: &Spanned<Pred>, min_precedence: u8) -> Spanned<Pred> {
        if pred_precedence(&p.node) < min_precedence {
            self.push("(");
            let printed = self.pred(p);
            self.push(")");
            printed
        } else {
            self.pred(p)
        }
    }

    pub fn pred(&mut self, p: &Spanned<Pred>) -> Spanned<Pred> {
        let start = self.out.len();
        let node = match &p.node {
            Pred::Literal(value) => {
                self.push(if *value { "⊤" } else { "⊥" });
                Pred::Literal(*value)
            }
            Pred::Relation(op, lhs, rhs) => {
                let l = self.expr(lhs);
                self.push(" ");
                self.push(op.symbol());
                self.push(" ");
                let r = self.expr(rhs);
                Pred::Relation(*op, Box::new(l), Box::new(r))
            }
            Pred::Not(inner) => {
                self.push("¬");
                Pred::Not(Box::new(self.pred_child(inner, PRED_NOT)))
            }
            Pred::Assoc(connective, children) => {
                let mut printed = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        self.push(" ");
                        self.push(connective.symbol());
                        self.push(" ");
                    }
                    // Mixed ∧/∨ always needs parentheses in Event-B.
                    printed.push(self.pred_child(child, PRED_NOT));
                }
                Pred::Assoc(*connective, printed)
            }
            Pred::Implies(lhs, rhs) | Pred::Equiv(lhs, rhs) => {
                let symbol = if matches!(p.node, Pred::Implies(..)) {
                    "⇒"
                } else {
                    "⇔"
                };
                let l = self.pred_child(lhs, PRED_OR);
                self.push(" ");
                self.push(symbol);
                self.push(" ");
                let r = self.pred_child(rhs, PRED_OR);
                if matches!(p.node, Pred::Implies(..)) {
                    Pred::Implies(Box::new(l), Box::new(r))
                } else {
                    Pred::Equiv(Box::new(l), Box::new(r))
                }
            }
            Pred::Quantified(quantifier, bound, body) => {
                self.push(quantifier.symbol());
                let b = self.ident_list(bound, ",");
                self.push("· ");
                let inner = self.pred(body);
                Pred::Quantified(*quantifier, b, Box::new(inner))
            }
            Pred::Finite(e) => {
                self.push("finite(");
                let inner = self.expr(e);
                self.push(")");
                Pred::Finite(Box::new(inner))
            }
        };
        Spanned::new(node, Span::new(start, self.out.len()))
    }

    pub fn assign(&mut self, a: &Assign) -> Assign {
        match a {
            Assign::BecomesEqualTo { assigned, values } => {
                let idents = self.ident_list(assigned, ", ");
                self.push(" ≔ ");
                let values = self.expr_list(values);
                Assign::BecomesEqualTo {
                    assigned: idents,
                    values,
                }
            }
            Assign::BecomesMemberOf { assigned, set } => {
                let idents = self.ident_list(assigned, ", ");
                self.push(" :∈ ");
                let set = self.expr(set);
                Assign::BecomesMemberOf {
                    assigned: idents,
                    set,
                }
            }
            Assign::BecomesSuchThat {
                assigned,
                condition,
            } => {
                let idents = self.ident_list(assigned, ", ");
                self.push(" :∣ ");
                let condition = self.pred(condition);
                Assign::BecomesSuchThat {
                    assigned: idents,
                    condition,
                }
            }
        }
    }
}

pub fn print_expr(e: &Spanned<Expr>) -> String {
    let mut printer = Printer::new();
    printer.expr(e);
    printer.finish()
}

pub fn print_pred(p: &Spanned<Pred>) -> String {
    let mut printer = Printer::new();
    printer.pred(p);
    printer.finish()
}

use serde::{Deserialize, Serialize};

/// Byte range into the text of the formula a node was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move a span that lies at or after `from` so that `from` maps to `to`.
    pub fn rebase(self, from: usize, to: usize) -> Self {
        Self {
            start: self.start - from + to,
            end: self.end - from + to,
        }
    }
}

/// A spanned AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    /// A node with an empty span, used by the builders before rendering.
    pub fn bare(node: T) -> Self {
        Self {
            node,
            span: Span::default(),
        }
    }
}

/// Identifier occurrence (variable, parameter, constant, carrier set or
/// bound name). Primed after-state names keep their trailing `'`.
pub type Ident = Spanned<String>;

/// Atomic expression constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Atom {
    Integer,
    Natural,
    Natural1,
    Bool,
    EmptySet,
    True,
    False,
}

impl Atom {
    pub fn symbol(self) -> &'static str {
        match self {
            Atom::Integer => "ℤ",
            Atom::Natural => "ℕ",
            Atom::Natural1 => "ℕ1",
            Atom::Bool => "BOOL",
            Atom::EmptySet => "∅",
            Atom::True => "TRUE",
            Atom::False => "FALSE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation `−E`.
    Minus,
    /// Relational converse `E∼` (postfix).
    Converse,
    Card,
    Pow,
    Pow1,
    Dom,
    Ran,
    Union,
    Inter,
    Min,
    Max,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Minus => "−",
            UnaryOp::Converse => "∼",
            UnaryOp::Card => "card",
            UnaryOp::Pow => "ℙ",
            UnaryOp::Pow1 => "ℙ1",
            UnaryOp::Dom => "dom",
            UnaryOp::Ran => "ran",
            UnaryOp::Union => "union",
            UnaryOp::Inter => "inter",
            UnaryOp::Min => "min",
            UnaryOp::Max => "max",
        }
    }

    /// Operators written like a function call, `card(E)`.
    pub fn is_function_like(self) -> bool {
        !matches!(self, UnaryOp::Minus | UnaryOp::Converse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Expn,
    UpTo,
    Union,
    Inter,
    SetMinus,
    Cprod,
    Mapsto,
    Relation,
    TotalFunction,
    PartialFunction,
    TotalInjection,
    PartialInjection,
    TotalSurjection,
    Overwrite,
    DomRestrict,
    DomSubtract,
    RanRestrict,
    RanSubtract,
    ForwardComposition,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "−",
            BinaryOp::Mul => "∗",
            BinaryOp::Div => "÷",
            BinaryOp::Mod => "mod",
            BinaryOp::Expn => "^",
            BinaryOp::UpTo => "‥",
            BinaryOp::Union => "∪",
            BinaryOp::Inter => "∩",
            BinaryOp::SetMinus => "∖",
            BinaryOp::Cprod => "×",
            BinaryOp::Mapsto => "↦",
            BinaryOp::Relation => "↔",
            BinaryOp::TotalFunction => "→",
            BinaryOp::PartialFunction => "⇸",
            BinaryOp::TotalInjection => "↣",
            BinaryOp::PartialInjection => "⤔",
            BinaryOp::TotalSurjection => "↠",
            BinaryOp::Overwrite => "\u{e103}",
            BinaryOp::DomRestrict => "◁",
            BinaryOp::DomSubtract => "⩤",
            BinaryOp::RanRestrict => "▷",
            BinaryOp::RanSubtract => "⩥",
            BinaryOp::ForwardComposition => ";",
        }
    }

    /// Binding strength; larger binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Relation
            | BinaryOp::TotalFunction
            | BinaryOp::PartialFunction
            | BinaryOp::TotalInjection
            | BinaryOp::PartialInjection
            | BinaryOp::TotalSurjection => 1,
            BinaryOp::Mapsto => 2,
            BinaryOp::Union
            | BinaryOp::Inter
            | BinaryOp::SetMinus
            | BinaryOp::Cprod
            | BinaryOp::Overwrite
            | BinaryOp::DomRestrict
            | BinaryOp::DomSubtract
            | BinaryOp::RanRestrict
            | BinaryOp::RanSubtract
            | BinaryOp::ForwardComposition => 3,
            BinaryOp::UpTo => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
            BinaryOp::Expn => 7,
        }
    }

    /// Whether a left operand of equal precedence can go without parentheses.
    pub fn chains_left_with(self, left: BinaryOp) -> bool {
        match self {
            BinaryOp::Add | BinaryOp::Sub => matches!(left, BinaryOp::Add | BinaryOp::Sub),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                matches!(left, BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
            }
            BinaryOp::Mapsto
            | BinaryOp::Union
            | BinaryOp::Inter
            | BinaryOp::Cprod
            | BinaryOp::Overwrite
            | BinaryOp::ForwardComposition => self == left,
            _ => false,
        }
    }
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Ident(String),
    Int(i64),
    Atom(Atom),
    Unary(UnaryOp, Box<Spanned<Expr>>),
    Binary(BinaryOp, Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    /// Function application `f(x)`.
    Apply(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    /// Relational image `r[S]`.
    Image(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    SetExtension(Vec<Spanned<Expr>>),
    /// `{x · P ∣ E}`
    Comprehension {
        bound: Vec<Ident>,
        predicate: Box<Spanned<Pred>>,
        expr: Box<Spanned<Expr>>,
    },
    /// `bool(P)`
    Bool(Box<Spanned<Pred>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Subset,
    SubsetEq,
    NotSubset,
    NotSubsetEq,
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "=",
            RelOp::NotEq => "≠",
            RelOp::Lt => "<",
            RelOp::Le => "≤",
            RelOp::Gt => ">",
            RelOp::Ge => "≥",
            RelOp::In => "∈",
            RelOp::NotIn => "∉",
            RelOp::Subset => "⊂",
            RelOp::SubsetEq => "⊆",
            RelOp::NotSubset => "⊄",
            RelOp::NotSubsetEq => "⊈",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn symbol(self) -> &'static str {
        match self {
            Connective::And => "∧",
            Connective::Or => "∨",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantifier {
    ForAll,
    Exists,
}

impl Quantifier {
    pub fn symbol(self) -> &'static str {
        match self {
            Quantifier::ForAll => "∀",
            Quantifier::Exists => "∃",
        }
    }
}

/// Predicate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pred {
    Literal(bool),
    Relation(RelOp, Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Not(Box<Spanned<Pred>>),
    /// N-ary conjunction or disjunction.
    Assoc(Connective, Vec<Spanned<Pred>>),
    Implies(Box<Spanned<Pred>>, Box<Spanned<Pred>>),
    Equiv(Box<Spanned<Pred>>, Box<Spanned<Pred>>),
    Quantified(Quantifier, Vec<Ident>, Box<Spanned<Pred>>),
    Finite(Box<Spanned<Expr>>),
}

/// Assignment tree. Well-formed assignments have at least one assigned
/// identifier, as many values as identifiers for `BecomesEqualTo`, and a
/// single identifier for `BecomesMemberOf`; the decomposition engine checks
/// this contract instead of assuming it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Assign {
    /// `v ≔ E`
    BecomesEqualTo {
        assigned: Vec<Ident>,
        values: Vec<Spanned<Expr>>,
    },
    /// `v :∈ S`
    BecomesMemberOf {
        assigned: Vec<Ident>,
        set: Spanned<Expr>,
    },
    /// `v :∣ P`
    BecomesSuchThat {
        assigned: Vec<Ident>,
        condition: Spanned<Pred>,
    },
}

impl Assign {
    pub fn assigned(&self) -> &[Ident] {
        match self {
            Assign::BecomesEqualTo { assigned, .. }
            | Assign::BecomesMemberOf { assigned, .. }
            | Assign::BecomesSuchThat { assigned, .. } => assigned,
        }
    }
}

/// Walks every span of a tree.
pub trait SpanWalk {
    fn walk_spans(&self, f: &mut dyn FnMut(Span));
    fn walk_spans_mut(&mut self, f: &mut dyn FnMut(&mut Span));

    /// Shift every span so that offset `from` lands on `to`.
    fn relocate(&mut self, from: usize, to: usize) {
        self.walk_spans_mut(&mut |span| *span = span.rebase(from, to));
    }
}

impl SpanWalk for Ident {
    fn walk_spans(&self, f: &mut dyn FnMut(Span)) {
        f(self.span);
    }

    fn walk_spans_mut(&mut self, f: &mut dyn FnMut(&mut Span)) {
        f(&mut self.span);
    }
}

impl SpanWalk for Spanned<Expr> {
    fn walk_spans(&self, f: &mut dyn FnMut(Span)) {
        f(self.span);
        match &self.node {
            Expr::Ident(_) | Expr::Int(_) | Expr::Atom(_) => {}
            Expr::Unary(_, e) => e.walk_spans(f),
            Expr::Binary(_, l, r) | Expr::Apply(l, r) | Expr::Image(l, r) => {
                l.walk_spans(f);
                r.walk_spans(f);
            }
            Expr::SetExtension(members) => {
                for m in members {
                    m.walk_spans(f);
                }
            }
            Expr::Comprehension {
                bound,
                predicate,
                expr,
            } => {
                for b in bound {
                    b.walk_spans(f);
                }
                predicate.walk_spans(f);
                expr.walk_spans(f);
            }
            Expr::Bool(p) => p.walk_spans(f),
        }
    }

    fn walk_spans_mut(&mut self, f: &mut dyn FnMut(&mut Span)) {
        f(&mut self.span);
        match &mut self.node {
            Expr::Ident(_) | Expr::Int(_) | Expr::Atom(_) => {}
            Expr::Unary(_, e) => e.walk_spans_mut(f),
            Expr::Binary(_, l, r) | Expr::Apply(l, r) | Expr::Image(l, r) => {
                l.walk_spans_mut(f);
                r.walk_spans_mut(f);
            }
            Expr::SetExtension(members) => {
                for m in members {
                    m.walk_spans_mut(f);
                }
            }
            Expr::Comprehension {
                bound,
                predicate,
                expr,
            } => {
                for b in bound {
                    b.walk_spans_mut(f);
                }
                predicate.walk_spans_mut(f);
                expr.walk_spans_mut(f);
            }
            Expr::Bool(p) => p.walk_spans_mut(f),
        }
    }
}

impl SpanWalk for Spanned<Pred> {
    fn walk_spans(&self, f: &mut dyn FnMut(Span)) {
        f(self.span);
        match &self.node {
            Pred::Literal(_) => {}
            Pred::Relation(_, l, r) => {
                l.walk_spans(f);
                r.walk_spans(f);
            }
            Pred::Not(p) => p.walk_spans(f),
            Pred::Assoc(_, children) => {
                for c in children {
                    c.walk_spans(f);
                }
            }
            Pred::Implies(l, r) | Pred::Equiv(l, r) => {
                l.walk_spans(f);
                r.walk_spans(f);
            }
            Pred::Quantified(_, bound, body) => {
                for b in bound {
                    b.walk_spans(f);
                }
                body.walk_spans(f);
            }
            Pred::Finite(e) => e.walk_spans(f),
        }
    }

    fn walk_spans_mut(&mut self, f: &mut dyn FnMut(&mut Span)) {
        f(&mut self.span);
        match &mut self.node {
            Pred::Literal(_) => {}
            Pred::Relation(_, l, r) => {
                l.walk_spans_mut(f);
                r.walk_spans_mut(f);
            }
            Pred::Not(p) => p.walk_spans_mut(f),
            Pred::Assoc(_, children) => {
                for c in children {
                    c.walk_spans_mut(f);
                }
            }
            Pred::Implies(l, r) | Pred::Equiv(l, r) => {
                l.walk_spans_mut(f);
                r.walk_spans_mut(f);
            }
            Pred::Quantified(_, bound, body) => {
                for b in bound {
                    b.walk_spans_mut(f);
                }
                body.walk_spans_mut(f);
            }
            Pred::Finite(e) => e.walk_spans_mut(f),
        }
    }
}

impl SpanWalk for Assign {
    fn walk_spans(&self, f: &mut dyn FnMut(Span)) {
        for ident in self.assigned() {
            ident.walk_spans(f);
        }
        match self {
            Assign::BecomesEqualTo { values, .. } => {
                for v in values {
                    v.walk_spans(f);
                }
            }
            Assign::BecomesMemberOf { set, .. } => set.walk_spans(f),
            Assign::BecomesSuchThat { condition, .. } => condition.walk_spans(f),
        }
    }

    fn walk_spans_mut(&mut self, f: &mut dyn FnMut(&mut Span)) {
        match self {
            Assign::BecomesEqualTo { assigned, values } => {
                for ident in assigned {
                    ident.walk_spans_mut(f);
                }
                for v in values {
                    v.walk_spans_mut(f);
                }
            }
            Assign::BecomesMemberOf { assigned, set } => {
                for ident in assigned {
                    ident.walk_spans_mut(f);
                }
                set.walk_spans_mut(f);
            }
            Assign::BecomesSuchThat {
                assigned,
                condition,
            } => {
                for ident in assigned {
                    ident.walk_spans_mut(f);
                }
                condition.walk_spans_mut(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebase_moves_span_window() {
        let span = Span::new(10, 14);
        assert_eq!(span.rebase(8, 0), Span::new(2, 6));
        assert_eq!(span.rebase(10, 3), Span::new(3, 7));
    }

    #[test]
    fn relocate_touches_nested_spans() {
        let mut e = Spanned::new(
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Spanned::new(Expr::Ident("y".into()), Span::new(20, 21))),
                Box::new(Spanned::new(Expr::Int(2), Span::new(24, 25))),
            ),
            Span::new(20, 25),
        );
        e.relocate(20, 0);
        let mut spans = Vec::new();
        e.walk_spans(&mut |s| spans.push(s));
        assert_eq!(
            spans,
            vec![Span::new(0, 5), Span::new(0, 1), Span::new(4, 5)]
        );
    }

    #[test]
    fn only_equal_arithmetic_chains_left() {
        assert!(BinaryOp::Add.chains_left_with(BinaryOp::Sub));
        assert!(!BinaryOp::Add.chains_left_with(BinaryOp::Mul));
        assert!(BinaryOp::Union.chains_left_with(BinaryOp::Union));
        assert!(!BinaryOp::Union.chains_left_with(BinaryOp::Inter));
    }
}

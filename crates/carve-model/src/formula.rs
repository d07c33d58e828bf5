use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::*;
use crate::errors::ModelError;
use crate::printer::Printer;

/// A predicate together with the text its spans index into.
///
/// Deserialization goes through [`Predicate::from_parts`], so a loaded
/// predicate never carries a span outside its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPredicate")]
pub struct Predicate {
    text: String,
    root: Spanned<Pred>,
}

/// An assignment together with the text its spans index into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAssignment")]
pub struct Assignment {
    text: String,
    root: Assign,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPredicate {
    text: String,
    root: Spanned<Pred>,
}

impl TryFrom<RawPredicate> for Predicate {
    type Error = ModelError;

    fn try_from(raw: RawPredicate) -> Result<Self, Self::Error> {
        Predicate::from_parts(raw.text, raw.root)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAssignment {
    text: String,
    root: Assign,
}

impl TryFrom<RawAssignment> for Assignment {
    type Error = ModelError;

    fn try_from(raw: RawAssignment) -> Result<Self, Self::Error> {
        Assignment::from_parts(raw.text, raw.root)
    }
}

fn check_spans(text: &str, tree: &dyn SpanWalk) -> Result<(), ModelError> {
    let mut bad = None;
    tree.walk_spans(&mut |span| {
        let fits = span.start <= span.end
            && span.end <= text.len()
            && text.is_char_boundary(span.start)
            && text.is_char_boundary(span.end);
        if !fits && bad.is_none() {
            bad = Some(span);
        }
    });
    match bad {
        Some(span) => Err(ModelError::SpanOutOfBounds {
            start: span.start,
            end: span.end,
            text: text.to_string(),
        }),
        None => Ok(()),
    }
}

impl Predicate {
    /// Wrap a tree produced by an upstream parser over `text`.
    pub fn from_parts(text: impl Into<String>, root: Spanned<Pred>) -> Result<Self, ModelError> {
        let text = text.into();
        check_spans(&text, &root)?;
        Ok(Self { text, root })
    }

    /// Print `root` and attach spans into the printed text.
    pub fn render(root: Spanned<Pred>) -> Self {
        let mut printer = Printer::new();
        let root = printer.pred(&root);
        Self {
            text: printer.finish(),
            root,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Spanned<Pred> {
        &self.root
    }

    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.start..span.end]
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Assignment {
    /// Wrap a tree produced by an upstream parser over `text`.
    pub fn from_parts(text: impl Into<String>, root: Assign) -> Result<Self, ModelError> {
        let text = text.into();
        check_spans(&text, &root)?;
        Ok(Self { text, root })
    }

    /// Print `root` and attach spans into the printed text.
    pub fn render(root: Assign) -> Self {
        let mut printer = Printer::new();
        let root = printer.assign(&root);
        Self {
            text: printer.finish(),
            root,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Assign {
        &self.root
    }

    pub fn assigned(&self) -> &[Ident] {
        self.root.assigned()
    }

    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.start..span.end]
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Incrementally assembles new formula text out of slices of existing
/// formulas, relocating the sliced subtrees to their new offsets.
#[derive(Debug, Default)]
pub struct SliceWriter {
    text: String,
}

impl SliceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, s: &str) {
        self.text.push_str(s);
    }

    /// Append the source text of `node` and return it relocated.
    pub fn copy<T>(&mut self, source: &str, node: &T, span: Span) -> T
    where
        T: SpanWalk + Clone,
    {
        let offset = self.text.len();
        self.text.push_str(&source[span.start..span.end]);
        let mut moved = node.clone();
        moved.relocate(span.start, offset);
        moved
    }

    /// Append a fresh identifier.
    pub fn ident(&mut self, name: &str) -> Ident {
        let start = self.text.len();
        self.text.push_str(name);
        Spanned::new(name.to_string(), Span::new(start, self.text.len()))
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn finish_assignment(self, root: Assign) -> Result<Assignment, ModelError> {
        Assignment::from_parts(self.text, root)
    }

    pub fn finish_predicate(self, root: Spanned<Pred>) -> Result<Predicate, ModelError> {
        Predicate::from_parts(self.text, root)
    }
}

/// Event-B types as reported by a static checker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Integer,
    Boolean,
    /// A carrier set.
    Given(String),
    PowerSet(Box<Type>),
    Product(Box<Type>, Box<Type>),
}

impl Type {
    pub fn power_set(inner: Type) -> Self {
        Type::PowerSet(Box::new(inner))
    }

    pub fn product(lhs: Type, rhs: Type) -> Self {
        Type::Product(Box::new(lhs), Box::new(rhs))
    }

    /// The type as a set expression, e.g. `ℙ(S × ℤ)`.
    pub fn to_expr(&self) -> Spanned<Expr> {
        let node = match self {
            Type::Integer => Expr::Atom(Atom::Integer),
            Type::Boolean => Expr::Atom(Atom::Bool),
            Type::Given(name) => Expr::Ident(name.clone()),
            Type::PowerSet(inner) => Expr::Unary(UnaryOp::Pow, Box::new(inner.to_expr())),
            Type::Product(lhs, rhs) => Expr::Binary(
                BinaryOp::Cprod,
                Box::new(lhs.to_expr()),
                Box::new(rhs.to_expr()),
            ),
        };
        Spanned::bare(node)
    }

    /// Carrier sets the type is built from, in order of appearance.
    pub fn given_sets(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_given_sets(&mut out);
        out
    }

    fn collect_given_sets<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Type::Integer | Type::Boolean => {}
            Type::Given(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Type::PowerSet(inner) => inner.collect_given_sets(out),
            Type::Product(lhs, rhs) => {
                lhs.collect_given_sets(out);
                rhs.collect_given_sets(out);
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::printer::print_expr(&self.to_expr()))
    }
}

/// `name ∈ T`, the predicate used for typing theorems and typing guards.
pub fn typing_predicate(name: &str, ty: &Type) -> Predicate {
    Predicate::render(Spanned::bare(Pred::Relation(
        RelOp::In,
        Box::new(Spanned::bare(Expr::Ident(name.to_string()))),
        Box::new(ty.to_expr()),
    )))
}

//! Syntax tree of a traversal.

use crate::span::{Span, Spanned};

/// `source.Start(args).step(args)...`
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalExpr {
    /// Traversal source name, normally `g`.
    pub source: Spanned<String>,
    /// Start step, `V` or `E`.
    pub start: StepCall,
    pub steps: Vec<StepCall>,
    pub span: Span,
}

/// A method call in the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct StepCall {
    pub name: Spanned<String>,
    pub args: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Literal(Spanned<Literal>),
    Predicate(PredicateExpr),
}

impl Argument {
    pub fn span(&self) -> Span {
        match self {
            Argument::Literal(l) => l.span,
            Argument::Predicate(p) => p.span(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Spanned<Literal>>),
    Map(Vec<(Spanned<String>, Spanned<Literal>)>),
}

/// A predicate such as `gt(30)`, `P.within('a', 'b')` or
/// `gt(1).and(lt(5))`.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateExpr {
    Call {
        name: Spanned<String>,
        args: Vec<Spanned<Literal>>,
        span: Span,
    },
    And(Box<PredicateExpr>, Box<PredicateExpr>),
    Or(Box<PredicateExpr>, Box<PredicateExpr>),
}

impl PredicateExpr {
    pub fn span(&self) -> Span {
        match self {
            PredicateExpr::Call { span, .. } => *span,
            PredicateExpr::And(l, r) | PredicateExpr::Or(l, r) => l.span().merge(r.span()),
        }
    }
}

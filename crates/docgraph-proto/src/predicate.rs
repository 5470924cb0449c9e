//! Traversal-level predicates.
//!
//! A predicate is an operator name plus an operand, or a boolean tree of
//! predicates on the same key. Operator names are kept as strings so that
//! predicates from any front end can be carried through and rejected with a
//! precise error by the mapper when there is no pushdown for them.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::value::{RawValue, Value};

/// Known operator names.
pub mod ops {
    pub const EQ: &str = "eq";
    pub const NEQ: &str = "neq";
    pub const LT: &str = "lt";
    pub const LTE: &str = "lte";
    pub const GT: &str = "gt";
    pub const GTE: &str = "gte";
    pub const WITHIN: &str = "within";
    pub const WITHOUT: &str = "without";
    pub const CONTAINING: &str = "containing";
    pub const NOT_CONTAINING: &str = "notContaining";
    pub const STARTING_WITH: &str = "startingWith";
    pub const NOT_STARTING_WITH: &str = "notStartingWith";
    pub const ENDING_WITH: &str = "endingWith";
    pub const NOT_ENDING_WITH: &str = "notEndingWith";
    pub const REGEX: &str = "regex";
    pub const NOT_REGEX: &str = "notRegex";
    pub const AND: &str = "and";
    pub const OR: &str = "or";
}

/// A predicate tested against a single property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// Operator applied to a single operand.
    Compare { op: String, value: Value },
    /// All sub-predicates must hold.
    And { predicates: Vec<Predicate> },
    /// At least one sub-predicate must hold.
    Or { predicates: Vec<Predicate> },
}

impl Predicate {
    /// Create a predicate with an arbitrary operator name.
    pub fn named(op: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            op: op.into(),
            value: value.into(),
        }
    }

    /// Create a predicate from a loosely-typed operand.
    pub fn from_raw(op: impl Into<String>, raw: RawValue) -> Result<Self, ValueError> {
        Ok(Predicate::named(op, Value::of(raw)?))
    }

    pub fn eq(value: impl Into<Value>) -> Self {
        Self::named(ops::EQ, value)
    }

    pub fn neq(value: impl Into<Value>) -> Self {
        Self::named(ops::NEQ, value)
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Self::named(ops::LT, value)
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Self::named(ops::LTE, value)
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Self::named(ops::GT, value)
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Self::named(ops::GTE, value)
    }

    /// Membership in a set of values.
    pub fn within<V: Into<Value>>(values: Vec<V>) -> Self {
        Self::named(
            ops::WITHIN,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Non-membership in a set of values.
    pub fn without<V: Into<Value>>(values: Vec<V>) -> Self {
        Self::named(
            ops::WITHOUT,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn containing(s: impl Into<String>) -> Self {
        Self::named(ops::CONTAINING, s.into())
    }

    pub fn not_containing(s: impl Into<String>) -> Self {
        Self::named(ops::NOT_CONTAINING, s.into())
    }

    pub fn starting_with(s: impl Into<String>) -> Self {
        Self::named(ops::STARTING_WITH, s.into())
    }

    pub fn not_starting_with(s: impl Into<String>) -> Self {
        Self::named(ops::NOT_STARTING_WITH, s.into())
    }

    pub fn ending_with(s: impl Into<String>) -> Self {
        Self::named(ops::ENDING_WITH, s.into())
    }

    pub fn not_ending_with(s: impl Into<String>) -> Self {
        Self::named(ops::NOT_ENDING_WITH, s.into())
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::named(ops::REGEX, pattern.into())
    }

    pub fn not_regex(pattern: impl Into<String>) -> Self {
        Self::named(ops::NOT_REGEX, pattern.into())
    }

    /// Conjunction of two predicates, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Self {
        let mut predicates = match self {
            Predicate::And { predicates } => predicates,
            p => vec![p],
        };
        match other {
            Predicate::And { predicates: rest } => predicates.extend(rest),
            p => predicates.push(p),
        }
        Predicate::And { predicates }
    }

    /// Disjunction of two predicates, flattening nested disjunctions.
    pub fn or(self, other: Predicate) -> Self {
        let mut predicates = match self {
            Predicate::Or { predicates } => predicates,
            p => vec![p],
        };
        match other {
            Predicate::Or { predicates: rest } => predicates.extend(rest),
            p => predicates.push(p),
        }
        Predicate::Or { predicates }
    }

    /// The operator name; `and`/`or` for compound predicates.
    pub fn operator(&self) -> &str {
        match self {
            Predicate::Compare { op, .. } => op,
            Predicate::And { .. } => ops::AND,
            Predicate::Or { .. } => ops::OR,
        }
    }

    /// The operand of a leaf predicate.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Predicate::Compare { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Compare { op, value } => match value {
                Value::List(items) if op == ops::WITHIN || op == ops::WITHOUT => {
                    let parts: Vec<String> = items.iter().map(Value::render).collect();
                    write!(f, "{}({})", op, parts.join(", "))
                }
                _ => write!(f, "{}({})", op, value),
            },
            Predicate::And { predicates } | Predicate::Or { predicates } => {
                let parts: Vec<String> = predicates.iter().map(|p| p.to_string()).collect();
                write!(f, "{}({})", self.operator(), parts.join(", "))
            }
        }
    }
}

//! In-process predicate evaluation.
//!
//! Rows fetched by a scan are re-checked against every absorbed container
//! with the traversal's own comparison rules: a missing property never
//! matches, numbers compare across widths, ordering only holds within one
//! category, and text operators and their negations only match strings.

use std::cmp::Ordering;

use docgraph_proto::traversal::{KEY_ACCESSOR, VALUE_ACCESSOR};
use docgraph_proto::{ops, Element, HasContainer, HasKey, Predicate, Value};
use tracing::trace;

use crate::error::Error;
use crate::identity::{id_predicate, IdFactory};

/// Evaluates traversal predicates against values.
pub struct PredicateEvaluator;

impl PredicateEvaluator {
    /// Test `value` against `predicate`; `None` is a missing property.
    pub fn test(predicate: &Predicate, value: Option<&Value>) -> Result<bool, Error> {
        let (op, operand) = match predicate {
            Predicate::And { predicates } => {
                for p in predicates {
                    if !Self::test(p, value)? {
                        return Ok(false);
                    }
                }
                return Ok(true);
            }
            Predicate::Or { predicates } => {
                for p in predicates {
                    if Self::test(p, value)? {
                        return Ok(true);
                    }
                }
                return Ok(false);
            }
            Predicate::Compare { op, value } => (op.as_str(), value),
        };

        let Some(value) = value else {
            // Still reject operators nothing could satisfy.
            return Self::check_operator(op).map(|_| false);
        };

        let matched = match op {
            ops::EQ => Self::values_equal(value, operand),
            ops::NEQ => !Self::values_equal(value, operand),
            ops::LT => Self::ordered(value, operand, Ordering::is_lt),
            ops::LTE => Self::ordered(value, operand, Ordering::is_le),
            ops::GT => Self::ordered(value, operand, Ordering::is_gt),
            ops::GTE => Self::ordered(value, operand, Ordering::is_ge),
            ops::WITHIN => Self::list(op, operand)?
                .iter()
                .any(|v| Self::values_equal(value, v)),
            ops::WITHOUT => !Self::list(op, operand)?
                .iter()
                .any(|v| Self::values_equal(value, v)),
            ops::CONTAINING => Self::text(op, value, operand, |s, t| s.contains(t))? == Some(true),
            ops::NOT_CONTAINING => {
                Self::text(op, value, operand, |s, t| s.contains(t))? == Some(false)
            }
            ops::STARTING_WITH => {
                Self::text(op, value, operand, |s, t| s.starts_with(t))? == Some(true)
            }
            ops::NOT_STARTING_WITH => {
                Self::text(op, value, operand, |s, t| s.starts_with(t))? == Some(false)
            }
            ops::ENDING_WITH => Self::text(op, value, operand, |s, t| s.ends_with(t))? == Some(true),
            ops::NOT_ENDING_WITH => {
                Self::text(op, value, operand, |s, t| s.ends_with(t))? == Some(false)
            }
            ops::REGEX => Self::regex_match(op, value, operand)? == Some(true),
            ops::NOT_REGEX => Self::regex_match(op, value, operand)? == Some(false),
            other => return Err(Error::UnsupportedOperation(other.to_string())),
        };
        Ok(matched)
    }

    fn check_operator(op: &str) -> Result<(), Error> {
        match op {
            ops::EQ | ops::NEQ | ops::LT | ops::LTE | ops::GT | ops::GTE | ops::WITHIN
            | ops::WITHOUT | ops::CONTAINING | ops::NOT_CONTAINING | ops::STARTING_WITH
            | ops::NOT_STARTING_WITH | ops::ENDING_WITH | ops::NOT_ENDING_WITH | ops::REGEX
            | ops::NOT_REGEX => Ok(()),
            other => Err(Error::UnsupportedOperation(other.to_string())),
        }
    }

    fn list<'a>(op: &str, operand: &'a Value) -> Result<&'a [Value], Error> {
        operand
            .as_list()
            .ok_or_else(|| Error::InvalidPredicate(format!("{} expects a list operand", op)))
    }

    /// Match a text operator; `None` when `value` is not a string.
    ///
    /// Neither a text operator nor its negation holds on a non-string value.
    fn text<F>(op: &str, value: &Value, operand: &Value, matcher: F) -> Result<Option<bool>, Error>
    where
        F: FnOnce(&str, &str) -> bool,
    {
        let needle = operand
            .as_str()
            .ok_or_else(|| Error::InvalidPredicate(format!("{} expects a string operand", op)))?;
        Ok(value.as_str().map(|s| matcher(s, needle)))
    }

    fn regex_match(op: &str, value: &Value, operand: &Value) -> Result<Option<bool>, Error> {
        let pattern = operand
            .as_str()
            .ok_or_else(|| Error::InvalidPredicate(format!("{} expects a string operand", op)))?;
        let regex = regex::Regex::new(pattern)
            .map_err(|e| Error::InvalidPredicate(format!("{} pattern {:?}: {}", op, pattern, e)))?;
        Ok(value.as_str().map(|s| regex.is_match(s)))
    }

    fn ordered(a: &Value, b: &Value, accept: fn(Ordering) -> bool) -> bool {
        Self::compare_values(a, b).is_some_and(accept)
    }

    /// Check if two values are equal, numbers compared by magnitude.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Self::values_equal(x, y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && Self::values_equal(va, vb))
            }
            _ if a.is_number() && b.is_number() => {
                Self::compare_values(a, b) == Some(Ordering::Equal)
            }
            _ => false,
        }
    }

    /// Compare two values, returning their ordering if comparable.
    pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Double(_), _) | (_, Value::Double(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
            _ => Some(a.as_i64()?.cmp(&b.as_i64()?)),
        }
    }
}

/// The in-process half of a scan plan.
#[derive(Debug, Clone)]
pub struct ResidualFilter {
    containers: Vec<HasContainer>,
    ids: IdFactory,
}

impl ResidualFilter {
    pub fn new(containers: Vec<HasContainer>, ids: IdFactory) -> Self {
        Self { containers, ids }
    }

    pub fn containers(&self) -> &[HasContainer] {
        &self.containers
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Whether `element` satisfies every container.
    pub fn test(&self, element: &Element) -> Result<bool, Error> {
        for container in &self.containers {
            if !self.test_container(container, element)? {
                trace!(element = %element.id(), container = %container, "residual reject");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn test_container(&self, container: &HasContainer, element: &Element) -> Result<bool, Error> {
        let predicate = &container.predicate;
        match &container.key {
            HasKey::Label => {
                let label = Value::from(element.label());
                PredicateEvaluator::test(predicate, Some(&label))
            }
            HasKey::Id => {
                let id = self.ids.encode(element.id()).map(Value::String);
                PredicateEvaluator::test(&id_predicate(predicate), id.as_ref())
            }
            HasKey::Property(name) => PredicateEvaluator::test(predicate, element.property(name)),
            HasKey::Synthetic(name) if name == KEY_ACCESSOR => {
                for key in element.properties().keys() {
                    if PredicateEvaluator::test(predicate, Some(&Value::from(key.as_str())))? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            HasKey::Synthetic(name) if name == VALUE_ACCESSOR => {
                for value in element.properties().values() {
                    if PredicateEvaluator::test(predicate, Some(value))? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            HasKey::Synthetic(name) => Err(Error::UnsupportedOperation(format!(
                "accessor {}",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use docgraph_proto::{ElementId, Vertex};

    use crate::config::GraphConfig;

    fn check(predicate: Predicate, value: impl Into<Value>) -> bool {
        PredicateEvaluator::test(&predicate, Some(&value.into())).unwrap()
    }

    fn make_vertex(properties: Vec<(&str, Value)>) -> Element {
        Element::Vertex(Vertex {
            id: ElementId::new("tinkerpop", "vertex", "alice"),
            label: "person".into(),
            revision: Some("1".into()),
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            meta: BTreeMap::new(),
        })
    }

    fn make_residual(containers: Vec<HasContainer>) -> ResidualFilter {
        let config = GraphConfig::new().validate().unwrap();
        ResidualFilter::new(containers, IdFactory::new(Arc::new(config)))
    }

    #[test]
    fn test_equality() {
        assert!(check(Predicate::eq("a"), "a"));
        assert!(!check(Predicate::eq("a"), "b"));
        assert!(check(Predicate::eq(3), 3i64));
        assert!(check(Predicate::eq(3), 3.0));
        assert!(!check(Predicate::eq(3), "3"));
        assert!(check(Predicate::eq(Value::Null), Value::Null));
        assert!(check(Predicate::neq(1), 2));
    }

    #[test]
    fn test_missing_property_never_matches() {
        for predicate in [
            Predicate::eq(Value::Null),
            Predicate::neq(1),
            Predicate::without(vec![1]),
            Predicate::not_containing("x"),
        ] {
            assert!(!PredicateEvaluator::test(&predicate, None).unwrap());
        }
    }

    #[test]
    fn test_ordering_within_category() {
        assert!(check(Predicate::gt(30), 31));
        assert!(check(Predicate::gte(30), 30i64));
        assert!(check(Predicate::lt(1.5), 1));
        assert!(check(Predicate::lte("b"), "a"));
        assert!(!check(Predicate::gt(30), "40"));
        assert!(!check(Predicate::lt(Value::Null), 1));
        assert!(!check(Predicate::gt(0), true));
    }

    #[test]
    fn test_membership() {
        assert!(check(Predicate::within(vec![1, 2]), 2i64));
        assert!(!check(Predicate::within(vec![1, 2]), 3));
        assert!(check(Predicate::without(vec!["a"]), "b"));
    }

    #[test]
    fn test_text_operators() {
        assert!(check(Predicate::containing("li"), "alice"));
        assert!(check(Predicate::starting_with("al"), "alice"));
        assert!(check(Predicate::ending_with("ce"), "alice"));
        assert!(!check(Predicate::containing("1"), 1));
        assert!(check(Predicate::regex("l.c"), "alice"));
        assert!(!check(Predicate::not_regex("^a"), "alice"));
        assert!(check(Predicate::not_containing("x"), "alice"));
        assert!(check(Predicate::not_starting_with("x"), "alice"));
        assert!(check(Predicate::not_ending_with("x"), "alice"));
        assert!(check(Predicate::not_regex("^x"), "alice"));
    }

    #[test]
    fn test_negated_text_operators_reject_non_strings() {
        assert!(!check(Predicate::not_containing("1"), 1));
        assert!(!check(Predicate::not_containing("2"), 1));
        assert!(!check(Predicate::not_starting_with("x"), 1i64));
        assert!(!check(Predicate::not_ending_with("x"), 1.5));
        assert!(!check(Predicate::not_regex("^x"), true));
        assert!(!check(Predicate::not_containing("x"), Value::Null));
    }

    #[test]
    fn test_wide_integers_compare_exactly() {
        let stored = Value::Int64(9_007_199_254_740_992);
        assert!(check(Predicate::neq(Value::Int64(9_007_199_254_740_993)), stored.clone()));
        assert!(!check(Predicate::eq(Value::Int64(9_007_199_254_740_993)), stored));
    }

    #[test]
    fn test_compound() {
        let p = Predicate::gt(1).and(Predicate::lt(10));
        assert!(check(p.clone(), 5));
        assert!(!check(p, 10));

        let p = Predicate::eq("a").or(Predicate::eq("b"));
        assert!(check(p, "b"));
    }

    #[test]
    fn test_unknown_operator() {
        let err = PredicateEvaluator::test(&Predicate::named("near", 1), Some(&Value::Int32(1)))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
        assert!(PredicateEvaluator::test(&Predicate::named("near", 1), None).is_err());
    }

    #[test]
    fn test_residual_filter() {
        let vertex = make_vertex(vec![("age", Value::Int32(30)), ("nick", Value::Null)]);

        let residual = make_residual(vec![
            HasContainer::label(Predicate::eq("person")),
            HasContainer::id(Predicate::eq("alice")),
            HasContainer::property("age", Predicate::gte(30)),
        ]);
        assert!(residual.test(&vertex).unwrap());

        let residual = make_residual(vec![HasContainer::property("nick", Predicate::eq(Value::Null))]);
        assert!(residual.test(&vertex).unwrap());

        let residual = make_residual(vec![HasContainer::property("name", Predicate::eq(Value::Null))]);
        assert!(!residual.test(&vertex).unwrap());
    }

    #[test]
    fn test_residual_integer_ids() {
        let vertex = Element::Vertex(Vertex {
            id: ElementId::new("tinkerpop", "vertex", "1"),
            label: "person".into(),
            revision: None,
            properties: BTreeMap::new(),
            meta: BTreeMap::new(),
        });

        let residual = make_residual(vec![HasContainer::id(Predicate::eq(1))]);
        assert!(residual.test(&vertex).unwrap());

        let residual = make_residual(vec![HasContainer::id(Predicate::within(vec![
            Value::Int64(1),
            Value::Int32(2),
        ]))]);
        assert!(residual.test(&vertex).unwrap());

        let residual = make_residual(vec![HasContainer::id(Predicate::neq(1))]);
        assert!(!residual.test(&vertex).unwrap());
    }

    #[test]
    fn test_residual_synthetic_accessors() {
        let vertex = make_vertex(vec![("age", Value::Int32(30))]);

        let residual = make_residual(vec![HasContainer::new(
            HasKey::parse("~key"),
            Predicate::eq("age"),
        )]);
        assert!(residual.test(&vertex).unwrap());

        let residual = make_residual(vec![HasContainer::new(
            HasKey::parse("~value"),
            Predicate::gt(40),
        )]);
        assert!(!residual.test(&vertex).unwrap());
    }
}

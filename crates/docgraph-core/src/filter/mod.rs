//! Filter algebra for query pushdown.
//!
//! A [`Filter`] is a boolean fragment over one row variable together with
//! its [`Support`] classification. Support is derived from the structure
//! alone; the constructors ([`Filter::not`], [`Filter::and`],
//! [`Filter::or`]) additionally normalize the tree.
//!
//! Composition rules:
//!
//! - `Not(f)` is `Full` only when `f` is; anything else collapses to `Empty`.
//! - `And` is `Full` only when all children are. The constructor drops
//!   `None` children, leaving the caller to re-check what was dropped; an
//!   `And` built directly over a `None` child renders only the rest and so
//!   reports at most `Partial`.
//! - `Or` is `None` as soon as one disjunct is, since dropping a disjunct
//!   would lose matches.

mod mapper;

pub use mapper::map_predicate;

use docgraph_proto::value::quote;
use docgraph_proto::{Support, Value};

/// A pushdown filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Neutral element; never rendered.
    Empty,
    Equals { field: String, value: Value },
    LessThan { field: String, value: Value },
    GreaterThan { field: String, value: Value },
    Within { field: String, values: Vec<Value> },
    TextContains { field: String, value: String },
    TextStartsWith { field: String, value: String },
    /// Suffix match, rendered as an anchored regex over the escaped suffix.
    TextEndsWith { field: String, value: String },
    TextRegex { field: String, pattern: String },
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::LessThan {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::GreaterThan {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn within(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::Within {
            field: field.into(),
            values,
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::TextContains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::TextStartsWith {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::TextEndsWith {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::TextRegex {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Negate a filter; only exact filters survive negation.
    pub fn not(inner: Filter) -> Self {
        if inner.support().is_full() {
            Filter::Not(Box::new(inner))
        } else {
            Filter::Empty
        }
    }

    /// Conjunction, dropping children that cannot be pushed.
    pub fn and(children: Vec<Filter>) -> Self {
        let mut children: Vec<Filter> = children
            .into_iter()
            .filter(|f| f.support().is_pushable())
            .collect();
        match children.len() {
            0 => Filter::Empty,
            1 => children.remove(0),
            _ => Filter::And(children),
        }
    }

    /// Disjunction; `Empty` as soon as any child cannot be pushed.
    pub fn or(mut children: Vec<Filter>) -> Self {
        if children.iter().any(|f| !f.support().is_pushable()) {
            return Filter::Empty;
        }
        match children.len() {
            0 => Filter::Empty,
            1 => children.remove(0),
            _ => Filter::Or(children),
        }
    }

    /// Exactness of this filter, computed bottom-up.
    pub fn support(&self) -> Support {
        match self {
            Filter::Empty => Support::None,
            Filter::Equals { value, .. }
            | Filter::LessThan { value, .. }
            | Filter::GreaterThan { value, .. } => value.support(),
            Filter::Within { values, .. } => Support::join_all(values.iter().map(Value::support)),
            Filter::TextContains { .. }
            | Filter::TextStartsWith { .. }
            | Filter::TextEndsWith { .. }
            | Filter::TextRegex { .. } => Support::Full,
            Filter::Not(inner) => {
                if inner.support().is_full() {
                    Support::Full
                } else {
                    Support::None
                }
            }
            Filter::And(children) => {
                let supports: Vec<Support> = children.iter().map(Filter::support).collect();
                let pushable =
                    Support::join_all(supports.iter().copied().filter(|s| s.is_pushable()));
                if !supports.iter().any(|s| s.is_pushable()) {
                    Support::None
                } else if supports.iter().any(|s| !s.is_pushable()) {
                    // Only the pushable conjuncts are rendered.
                    pushable.join(Support::Partial)
                } else {
                    pushable
                }
            }
            Filter::Or(children) => {
                if children.is_empty() {
                    Support::None
                } else {
                    Support::join_all(children.iter().map(Filter::support))
                }
            }
        }
    }

    /// Render against a row variable; `None` when the filter cannot be pushed.
    pub fn render(&self, var: &str) -> Option<String> {
        if !self.support().is_pushable() {
            return None;
        }
        let rendered = match self {
            Filter::Empty => return None,
            Filter::Equals { field, value } => {
                format!("{} == {}", field_ref(var, field), value.render())
            }
            Filter::LessThan { field, value } => {
                format!("{} < {}", field_ref(var, field), value.render())
            }
            Filter::GreaterThan { field, value } => {
                format!("{} > {}", field_ref(var, field), value.render())
            }
            Filter::Within { field, values } => {
                let parts: Vec<String> = values.iter().map(Value::render).collect();
                format!("{} IN [{}]", field_ref(var, field), parts.join(", "))
            }
            Filter::TextContains { field, value } => {
                format!("CONTAINS({}, {})", field_ref(var, field), quote(value))
            }
            Filter::TextStartsWith { field, value } => {
                format!("STARTS_WITH({}, {})", field_ref(var, field), quote(value))
            }
            Filter::TextEndsWith { field, value } => {
                let pattern = format!("{}$", regex::escape(value));
                format!("REGEX_TEST({}, {})", field_ref(var, field), quote(&pattern))
            }
            Filter::TextRegex { field, pattern } => {
                format!("REGEX_TEST({}, {})", field_ref(var, field), quote(pattern))
            }
            Filter::Not(inner) => format!("NOT({})", inner.render(var)?),
            Filter::And(children) => join_rendered(children, var, " AND ")?,
            Filter::Or(children) => join_rendered(children, var, " OR ")?,
        };
        Some(rendered)
    }
}

fn join_rendered(children: &[Filter], var: &str, separator: &str) -> Option<String> {
    let parts: Vec<String> = children.iter().filter_map(|f| f.render(var)).collect();
    match parts.len() {
        0 => None,
        1 => parts.into_iter().next(),
        _ => Some(format!("({})", parts.join(separator))),
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.render("x") {
            Some(text) => f.write_str(&text),
            None => f.write_str("<empty>"),
        }
    }
}

/// Quote a collection, variable or attribute name with backticks.
pub fn quote_name(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{}`", escaped)
}

fn field_ref(var: &str, field: &str) -> String {
    format!("{}.{}", quote_name(var), quote_name(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Filter {
        Filter::equals("a", "str")
    }

    fn partial() -> Filter {
        Filter::equals("b", Value::Null)
    }

    #[test]
    fn test_equals_render() {
        let f = Filter::equals("field", "str");
        assert_eq!(f.support(), Support::Full);
        assert_eq!(f.render("d").unwrap(), r#"`d`.`field` == "str""#);

        assert_eq!(
            Filter::equals("field", false).render("d").unwrap(),
            "`d`.`field` == false"
        );
        assert_eq!(
            Filter::equals("field", 22).render("d").unwrap(),
            "`d`.`field` == 22"
        );
    }

    #[test]
    fn test_equals_null_is_partial() {
        let f = Filter::equals("field", Value::Null);
        assert_eq!(f.support(), Support::Partial);
        assert_eq!(f.render("d").unwrap(), "`d`.`field` == null");
    }

    #[test]
    fn test_ordering_render() {
        assert_eq!(
            Filter::less_than("age", 30).render("x").unwrap(),
            "`x`.`age` < 30"
        );
        assert_eq!(
            Filter::greater_than("age", 1.5).render("x").unwrap(),
            "`x`.`age` > 1.5"
        );
        assert_eq!(Filter::less_than("age", 30).support(), Support::Full);
    }

    #[test]
    fn test_within() {
        let f = Filter::within("a", vec![Value::from("str"), Value::Int32(11)]);
        assert_eq!(f.support(), Support::Full);
        assert_eq!(f.render("d").unwrap(), r#"`d`.`a` IN ["str", 11]"#);

        let f = Filter::within("a", vec![Value::from("str"), Value::Null]);
        assert_eq!(f.support(), Support::Partial);

        let f = Filter::within("a", vec![]);
        assert_eq!(f.render("d").unwrap(), "`d`.`a` IN []");
    }

    #[test]
    fn test_text_render() {
        assert_eq!(
            Filter::contains("attr", "ab").render("x").unwrap(),
            r#"CONTAINS(`x`.`attr`, "ab")"#
        );
        assert_eq!(
            Filter::starts_with("attr", "ab").render("x").unwrap(),
            r#"STARTS_WITH(`x`.`attr`, "ab")"#
        );
        assert_eq!(
            Filter::regex("attr", "^a.*").render("x").unwrap(),
            r#"REGEX_TEST(`x`.`attr`, "^a.*")"#
        );
        assert_eq!(
            Filter::ends_with("attr", "a.b").render("x").unwrap(),
            r#"REGEX_TEST(`x`.`attr`, "a\\.b$")"#
        );
    }

    #[test]
    fn test_not() {
        let f = Filter::not(Filter::equals("field", "str"));
        assert_eq!(f.support(), Support::Full);
        assert_eq!(f.render("d").unwrap(), r#"NOT(`d`.`field` == "str")"#);

        assert_eq!(Filter::not(partial()), Filter::Empty);
        assert_eq!(Filter::not(Filter::Empty), Filter::Empty);
    }

    #[test]
    fn test_not_structural_support() {
        let f = Filter::Not(Box::new(partial()));
        assert_eq!(f.support(), Support::None);
        assert_eq!(f.render("d"), None);
    }

    #[test]
    fn test_and() {
        let f = Filter::and(vec![Filter::equals("a", "str"), Filter::equals("b", 11)]);
        assert_eq!(f.support(), Support::Full);
        assert_eq!(
            f.render("d").unwrap(),
            r#"(`d`.`a` == "str" AND `d`.`b` == 11)"#
        );

        let f = Filter::and(vec![full(), partial()]);
        assert_eq!(f.support(), Support::Partial);
    }

    #[test]
    fn test_and_drops_empty_children() {
        assert_eq!(Filter::and(vec![]), Filter::Empty);
        assert_eq!(Filter::and(vec![Filter::Empty]), Filter::Empty);
        assert_eq!(Filter::and(vec![Filter::Empty, full()]), full());

        match Filter::and(vec![full(), Filter::Empty, partial()]) {
            Filter::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(children.iter().all(|c| c.support().is_pushable()));
            }
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_or() {
        let f = Filter::or(vec![Filter::equals("a", "str"), Filter::equals("b", 11)]);
        assert_eq!(f.support(), Support::Full);
        assert_eq!(
            f.render("d").unwrap(),
            r#"(`d`.`a` == "str" OR `d`.`b` == 11)"#
        );
        assert_eq!(Filter::or(vec![full(), partial()]).support(), Support::Partial);
        assert_eq!(Filter::or(vec![]), Filter::Empty);
        assert_eq!(Filter::or(vec![partial()]), partial());
    }

    #[test]
    fn test_or_with_unpushable_branch_is_empty() {
        let f = Filter::or(vec![full(), Filter::not(partial())]);
        assert_eq!(f, Filter::Empty);
        assert_eq!(f.support(), Support::None);

        let f = Filter::And(vec![full(), Filter::Empty]);
        assert_eq!(f.support(), Support::Partial);
        assert_eq!(f.render("d").unwrap(), r#"`d`.`a` == "str""#);

        let f = Filter::Or(vec![full(), Filter::Empty]);
        assert_eq!(f.support(), Support::None);
        assert_eq!(f.render("d"), None);
    }

    #[test]
    fn test_empty_cannot_render() {
        assert_eq!(Filter::Empty.support(), Support::None);
        assert_eq!(Filter::Empty.render("d"), None);
        assert_eq!(Filter::Empty.to_string(), "<empty>");
    }

    #[test]
    fn test_support_monotonicity() {
        // Leaves ordered best to worst.
        let leaves = [full(), partial(), Filter::Empty];
        let composites: [fn(Filter, Filter) -> Filter; 4] = [
            |a, b| Filter::And(vec![a, b]),
            |a, b| Filter::Or(vec![a, b]),
            |a, b| Filter::Not(Box::new(Filter::And(vec![a, b]))),
            |a, b| Filter::And(vec![Filter::Or(vec![a, full()]), b]),
        ];

        for build in composites {
            for (i, better) in leaves.iter().enumerate() {
                for worse in &leaves[i..] {
                    for other in &leaves {
                        let base = build(better.clone(), other.clone());
                        let degraded = build(worse.clone(), other.clone());
                        assert!(
                            degraded.support() <= base.support(),
                            "{:?} should not beat {:?}",
                            degraded,
                            base
                        );

                        let base = build(other.clone(), better.clone());
                        let degraded = build(other.clone(), worse.clone());
                        assert!(degraded.support() <= base.support());
                    }
                }
            }
        }
    }

    #[test]
    fn test_quote_name() {
        assert_eq!(quote_name("person"), "`person`");
        assert_eq!(quote_name("we`ird"), "`we\\`ird`");
    }
}

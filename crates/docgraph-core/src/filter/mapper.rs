//! Mapping from traversal predicates to filters.

use docgraph_proto::{ops, Predicate, Value};

use super::Filter;
use crate::error::Error;

/// Map a predicate on `field` to a filter.
///
/// Negated operators map to [`Filter::not`] of their positive form, so they
/// only survive when that form is exact. `lte`/`gte` become a disjunction of
/// the strict comparison and equality.
pub fn map_predicate(field: &str, predicate: &Predicate) -> Result<Filter, Error> {
    let (op, value) = match predicate {
        Predicate::And { predicates } => {
            let children = map_all(field, predicates)?;
            return Ok(Filter::and(children));
        }
        Predicate::Or { predicates } => {
            let children = map_all(field, predicates)?;
            return Ok(Filter::or(children));
        }
        Predicate::Compare { op, value } => (op.as_str(), value),
    };

    let filter = match op {
        ops::EQ => Filter::equals(field, value.clone()),
        ops::LT => Filter::less_than(field, value.clone()),
        ops::GT => Filter::greater_than(field, value.clone()),
        ops::LTE => Filter::or(vec![
            Filter::less_than(field, value.clone()),
            Filter::equals(field, value.clone()),
        ]),
        ops::GTE => Filter::or(vec![
            Filter::greater_than(field, value.clone()),
            Filter::equals(field, value.clone()),
        ]),
        ops::WITHIN => Filter::within(field, list_operand(op, value)?),
        ops::CONTAINING => Filter::contains(field, text_operand(op, value)?),
        ops::STARTING_WITH => Filter::starts_with(field, text_operand(op, value)?),
        ops::ENDING_WITH => Filter::ends_with(field, text_operand(op, value)?),
        ops::REGEX => Filter::regex(field, regex_operand(op, value)?),
        ops::NEQ => Filter::not(Filter::equals(field, value.clone())),
        ops::WITHOUT => Filter::not(Filter::within(field, list_operand(op, value)?)),
        ops::NOT_CONTAINING => Filter::not(Filter::contains(field, text_operand(op, value)?)),
        ops::NOT_STARTING_WITH => {
            Filter::not(Filter::starts_with(field, text_operand(op, value)?))
        }
        ops::NOT_ENDING_WITH => Filter::not(Filter::ends_with(field, text_operand(op, value)?)),
        ops::NOT_REGEX => Filter::not(Filter::regex(field, regex_operand(op, value)?)),
        other => return Err(Error::UnsupportedOperation(other.to_string())),
    };
    Ok(filter)
}

fn map_all(field: &str, predicates: &[Predicate]) -> Result<Vec<Filter>, Error> {
    predicates.iter().map(|p| map_predicate(field, p)).collect()
}

fn list_operand(op: &str, value: &Value) -> Result<Vec<Value>, Error> {
    value.as_list().map(<[Value]>::to_vec).ok_or_else(|| {
        Error::InvalidPredicate(format!(
            "{} expects a list operand, got {}",
            op,
            value.type_name()
        ))
    })
}

fn text_operand<'a>(op: &str, value: &'a Value) -> Result<&'a str, Error> {
    value.as_str().ok_or_else(|| {
        Error::InvalidPredicate(format!(
            "{} expects a string operand, got {}",
            op,
            value.type_name()
        ))
    })
}

fn regex_operand<'a>(op: &str, value: &'a Value) -> Result<&'a str, Error> {
    let pattern = text_operand(op, value)?;
    regex::Regex::new(pattern)
        .map_err(|e| Error::InvalidPredicate(format!("{} pattern {:?}: {}", op, pattern, e)))?;
    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_proto::Support;

    fn map(predicate: Predicate) -> Filter {
        map_predicate("f", &predicate).unwrap()
    }

    #[test]
    fn test_positive_operators() {
        assert_eq!(map(Predicate::eq("v")), Filter::equals("f", "v"));
        assert_eq!(map(Predicate::lt(3)), Filter::less_than("f", 3));
        assert_eq!(map(Predicate::gt(3)), Filter::greater_than("f", 3));
        assert_eq!(
            map(Predicate::within(vec!["a", "b"])),
            Filter::within("f", vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(map(Predicate::containing("x")), Filter::contains("f", "x"));
        assert_eq!(map(Predicate::starting_with("x")), Filter::starts_with("f", "x"));
        assert_eq!(map(Predicate::ending_with("x")), Filter::ends_with("f", "x"));
        assert_eq!(map(Predicate::regex("^x")), Filter::regex("f", "^x"));
    }

    #[test]
    fn test_inclusive_comparisons() {
        let f = map(Predicate::lte(5));
        assert_eq!(f.support(), Support::Full);
        assert_eq!(f.render("x").unwrap(), "(`x`.`f` < 5 OR `x`.`f` == 5)");

        let f = map(Predicate::gte(5));
        assert_eq!(f.render("x").unwrap(), "(`x`.`f` > 5 OR `x`.`f` == 5)");
    }

    #[test]
    fn test_negated_operators() {
        let f = map(Predicate::neq("v"));
        assert_eq!(f.support(), Support::Full);
        assert_eq!(f.render("x").unwrap(), r#"NOT(`x`.`f` == "v")"#);

        assert_eq!(
            map(Predicate::without(vec![1, 2])).render("x").unwrap(),
            "NOT(`x`.`f` IN [1, 2])"
        );
        assert_eq!(
            map(Predicate::not_containing("a")).render("x").unwrap(),
            r#"NOT(CONTAINS(`x`.`f`, "a"))"#
        );
        assert_eq!(map(Predicate::not_starting_with("a")).support(), Support::Full);
        assert_eq!(map(Predicate::not_ending_with("a")).support(), Support::Full);
        assert_eq!(map(Predicate::not_regex("a+")).support(), Support::Full);
    }

    #[test]
    fn test_negated_partial_collapses() {
        assert_eq!(map(Predicate::neq(Value::Null)), Filter::Empty);
        assert_eq!(
            map(Predicate::without(vec![Value::from("a"), Value::Null])),
            Filter::Empty
        );
    }

    #[test]
    fn test_wide_integers_are_not_negated_in_the_store() {
        let wide = Value::Int64(9_007_199_254_740_993);

        let f = map(Predicate::eq(wide.clone()));
        assert_eq!(f.support(), Support::Partial);
        assert_eq!(f.render("x").unwrap(), "`x`.`f` == 9007199254740993");

        assert_eq!(map(Predicate::neq(wide.clone())), Filter::Empty);
        assert_eq!(map(Predicate::without(vec![wide])), Filter::Empty);
        assert_eq!(map(Predicate::neq(Value::Int64(1 << 40))).support(), Support::Full);
    }

    #[test]
    fn test_compound_predicates() {
        let f = map(Predicate::gt(1).and(Predicate::lt(10)));
        assert_eq!(f.render("x").unwrap(), "(`x`.`f` > 1 AND `x`.`f` < 10)");

        let f = map(Predicate::eq(1).or(Predicate::eq(Value::Null)));
        assert_eq!(f.support(), Support::Partial);

        // A conjunct that cannot be pushed is dropped.
        let f = map(Predicate::gt(1).and(Predicate::neq(Value::Null)));
        assert_eq!(f, Filter::greater_than("f", 1));
    }

    #[test]
    fn test_or_with_unpushable_branch() {
        let f = map(Predicate::eq("v").or(Predicate::neq(Value::Null)));
        assert_eq!(f, Filter::Empty);
        assert_eq!(f.support(), Support::None);
    }

    #[test]
    fn test_unknown_operator() {
        let err = map_predicate("f", &Predicate::named("near", 3)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(ref op) if op == "near"));

        let nested = Predicate::eq(1).or(Predicate::named("near", 3));
        assert!(matches!(
            map_predicate("f", &nested),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_invalid_operands() {
        let err = map_predicate("f", &Predicate::named("within", 3)).unwrap_err();
        assert!(matches!(err, Error::InvalidPredicate(_)));
        assert!(err.to_string().contains("list"));

        let err = map_predicate("f", &Predicate::named("containing", 3)).unwrap_err();
        assert!(err.to_string().contains("string"));

        let err = map_predicate("f", &Predicate::regex("(unclosed")).unwrap_err();
        assert!(matches!(err, Error::InvalidPredicate(_)));
    }
}

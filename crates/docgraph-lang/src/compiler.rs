//! Compiles a parsed traversal into step descriptors.

use std::collections::BTreeSet;

use docgraph_proto::traversal::{KEY_ACCESSOR, VALUE_ACCESSOR};
use docgraph_proto::{
    ops, HasContainer, HasKey, HasStep, OtherStep, Predicate, RawValue, Step, Traversal, Value,
};

use crate::ast::*;
use crate::error::CompileError;
use crate::span::{Span, Spanned};

/// The traversal source every traversal must start from.
pub const TRAVERSAL_SOURCE: &str = "g";

/// Compile a parsed traversal.
pub fn compile(expr: TraversalExpr) -> Result<Vec<Step>, CompileError> {
    let mut traversal = compile_start(&expr)?;
    for step in &expr.steps {
        traversal = compile_step(traversal, step)?;
    }
    Ok(traversal.into_steps())
}

fn compile_start(expr: &TraversalExpr) -> Result<Traversal, CompileError> {
    if expr.source.value != TRAVERSAL_SOURCE {
        return Err(CompileError::unknown_source(
            format!(
                "unknown traversal source '{}', expected '{}'",
                expr.source.value, TRAVERSAL_SOURCE
            ),
            expr.source.span,
        ));
    }

    let start = &expr.start;
    let ids = element_ids(start)?;
    match start.name.value.as_str() {
        "V" => Ok(Traversal::vertices(ids)),
        "E" => Ok(Traversal::edges(ids)),
        other => Err(CompileError::unknown_source(
            format!("unknown start step '{}', expected V or E", other),
            start.name.span,
        )),
    }
}

fn compile_step(traversal: Traversal, step: &StepCall) -> Result<Traversal, CompileError> {
    let name = step.name.value.as_str();
    Ok(match name {
        "has" => traversal.with_step(compile_has(step)?),
        "hasLabel" => {
            let predicate = one_of(step, |lit| string_value(step, lit))?;
            traversal.has_container(HasContainer::label(predicate))
        }
        "hasId" => {
            let predicate = one_of(step, |lit| id_value(step, lit).map(Value::String))?;
            traversal.has_container(HasContainer::id(predicate))
        }
        "hasKey" => {
            let predicate = one_of(step, |lit| string_value(step, lit))?;
            let key = HasKey::Synthetic(KEY_ACCESSOR.to_string());
            traversal.has_container(HasContainer::new(key, predicate))
        }
        "hasValue" => {
            let predicate = one_of(step, literal_value)?;
            let key = HasKey::Synthetic(VALUE_ACCESSOR.to_string());
            traversal.has_container(HasContainer::new(key, predicate))
        }
        "barrier" => {
            if step.args.len() > 1 {
                return Err(arity(step, "at most one argument"));
            }
            traversal.barrier()
        }
        "as" => {
            if step.args.is_empty() {
                return Err(arity(step, "at least one step label"));
            }
            let mut traversal = traversal;
            for arg in &step.args {
                traversal = traversal.as_(string_arg(step, arg)?);
            }
            traversal
        }
        _ => {
            let args = step
                .args
                .iter()
                .map(|arg| match arg {
                    Argument::Literal(lit) => literal_value(lit),
                    Argument::Predicate(p) => Err(CompileError::invalid_arguments(
                        format!("step {} does not take predicate arguments", name),
                        p.span(),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?;
            traversal.with_step(Step::Other(OtherStep {
                name: name.to_string(),
                args,
                labels: vec![],
            }))
        }
    })
}

/// `has(key)`, `has(key, value|pred)` and `has(label, key, value|pred)`.
fn compile_has(step: &StepCall) -> Result<Step, CompileError> {
    let mut containers = Vec::with_capacity(2);
    match step.args.as_slice() {
        // Property existence has no container form.
        [key] => {
            return Ok(Step::Other(OtherStep {
                name: step.name.value.clone(),
                args: vec![Value::String(string_arg(step, key)?)],
                labels: vec![],
            }))
        }
        [key, test] => {
            let key = string_arg(step, key)?;
            containers.push(HasContainer::new(HasKey::parse(&key), test_predicate(test)?));
        }
        [label, key, test] => {
            let label = string_arg(step, label)?;
            let key = string_arg(step, key)?;
            containers.push(HasContainer::label(Predicate::eq(label)));
            containers.push(HasContainer::new(HasKey::parse(&key), test_predicate(test)?));
        }
        _ => return Err(arity(step, "one to three arguments")),
    }
    Ok(Step::Has(HasStep {
        containers,
        labels: vec![],
    }))
}

/// A value to compare against, or a predicate used as-is.
fn test_predicate(arg: &Argument) -> Result<Predicate, CompileError> {
    match arg {
        Argument::Literal(lit) => literal_value(lit).map(Predicate::eq),
        Argument::Predicate(p) => compile_predicate(p),
    }
}

/// Arguments of `hasLabel`-style steps: a single predicate, or values
/// matched with `eq` (one) or `within` (several).
fn one_of<F>(step: &StepCall, mut convert: F) -> Result<Predicate, CompileError>
where
    F: FnMut(&Spanned<Literal>) -> Result<Value, CompileError>,
{
    match step.args.as_slice() {
        [] => Err(arity(step, "at least one argument")),
        [Argument::Predicate(p)] => compile_predicate(p),
        args => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                match arg {
                    Argument::Literal(lit) => values.push(convert(lit)?),
                    Argument::Predicate(p) => {
                        return Err(CompileError::invalid_arguments(
                            format!("{} takes a single predicate or values", step.name.value),
                            p.span(),
                        ))
                    }
                }
            }
            if values.len() == 1 {
                Ok(Predicate::eq(values.remove(0)))
            } else {
                Ok(Predicate::within(values))
            }
        }
    }
}

pub(crate) fn compile_predicate(expr: &PredicateExpr) -> Result<Predicate, CompileError> {
    match expr {
        PredicateExpr::And(left, right) => {
            Ok(compile_predicate(left)?.and(compile_predicate(right)?))
        }
        PredicateExpr::Or(left, right) => Ok(compile_predicate(left)?.or(compile_predicate(right)?)),
        PredicateExpr::Call { name, args, span } => compile_call(name, args, *span),
    }
}

fn compile_call(
    name: &Spanned<String>,
    args: &[Spanned<Literal>],
    span: Span,
) -> Result<Predicate, CompileError> {
    let op = name.value.as_str();
    match op {
        ops::WITHIN | ops::WITHOUT => {
            // `within('a', 'b')` and `within(['a', 'b'])` are the same.
            let values = match args {
                [Spanned {
                    value: Literal::List(items),
                    ..
                }] => items.iter().map(literal_value).collect::<Result<Vec<_>, _>>()?,
                _ => args.iter().map(literal_value).collect::<Result<Vec<_>, _>>()?,
            };
            Ok(Predicate::named(op, Value::List(values)))
        }
        "between" | "inside" | "outside" => {
            let [low, high] = args else {
                return Err(CompileError::invalid_arguments(
                    format!("{} takes two arguments, got {}", op, args.len()),
                    span,
                ));
            };
            let (low, high) = (literal_value(low)?, literal_value(high)?);
            Ok(match op {
                "between" => Predicate::gte(low).and(Predicate::lt(high)),
                "inside" => Predicate::gt(low).and(Predicate::lt(high)),
                _ => Predicate::lt(low).or(Predicate::gt(high)),
            })
        }
        // Anything else is a single-operand operator. Unknown names are kept
        // and rejected later with the operator in the message.
        _ => match args {
            [value] => Ok(Predicate::named(op, literal_value(value)?)),
            _ => Err(CompileError::invalid_arguments(
                format!("{} takes one argument, got {}", op, args.len()),
                span,
            )),
        },
    }
}

/// Convert a literal through the value classifier.
pub(crate) fn literal_value(lit: &Spanned<Literal>) -> Result<Value, CompileError> {
    Value::of(raw_value(lit)?).map_err(|e| CompileError::invalid_literal(e.to_string(), lit.span))
}

fn raw_value(lit: &Spanned<Literal>) -> Result<RawValue, CompileError> {
    Ok(match &lit.value {
        Literal::Null => RawValue::Null,
        Literal::Bool(b) => RawValue::Bool(*b),
        Literal::Int(i) => match i32::try_from(*i) {
            Ok(small) => RawValue::Int(small),
            Err(_) => RawValue::Long(*i),
        },
        Literal::Float(f) => RawValue::Double(*f),
        Literal::String(s) => RawValue::String(s.clone()),
        Literal::List(items) => {
            RawValue::List(items.iter().map(raw_value).collect::<Result<_, _>>()?)
        }
        Literal::Map(entries) => {
            let mut seen = BTreeSet::new();
            for (key, _) in entries {
                if !seen.insert(key.value.as_str()) {
                    return Err(CompileError::invalid_literal(
                        format!("duplicate map key '{}'", key.value),
                        key.span,
                    ));
                }
            }
            RawValue::Map(
                entries
                    .iter()
                    .map(|(key, value)| Ok((RawValue::String(key.value.clone()), raw_value(value)?)))
                    .collect::<Result<_, CompileError>>()?,
            )
        }
    })
}

fn string_arg(step: &StepCall, arg: &Argument) -> Result<String, CompileError> {
    match arg {
        Argument::Literal(Spanned {
            value: Literal::String(s),
            ..
        }) => Ok(s.clone()),
        other => Err(CompileError::invalid_arguments(
            format!("{} expects a string here", step.name.value),
            other.span(),
        )),
    }
}

fn string_value(step: &StepCall, lit: &Spanned<Literal>) -> Result<Value, CompileError> {
    match &lit.value {
        Literal::String(s) => Ok(Value::String(s.clone())),
        _ => Err(CompileError::invalid_arguments(
            format!("{} expects strings", step.name.value),
            lit.span,
        )),
    }
}

/// Ids are strings; integer ids are taken as their decimal text.
fn id_value(step: &StepCall, lit: &Spanned<Literal>) -> Result<String, CompileError> {
    match &lit.value {
        Literal::String(s) => Ok(s.clone()),
        Literal::Int(i) => Ok(i.to_string()),
        _ => Err(CompileError::invalid_arguments(
            format!("{} expects string or integer ids", step.name.value),
            lit.span,
        )),
    }
}

/// Ids of `V(...)`/`E(...)`, given inline or as one list.
fn element_ids(start: &StepCall) -> Result<Vec<String>, CompileError> {
    let mut ids = Vec::new();
    for arg in &start.args {
        match arg {
            Argument::Literal(Spanned {
                value: Literal::List(items),
                ..
            }) => {
                for item in items {
                    ids.push(id_value(start, item)?);
                }
            }
            Argument::Literal(lit) => ids.push(id_value(start, lit)?),
            Argument::Predicate(p) => {
                return Err(CompileError::invalid_arguments(
                    format!("{} takes ids, not predicates", start.name.value),
                    p.span(),
                ))
            }
        }
    }
    Ok(ids)
}

fn arity(step: &StepCall, expected: &str) -> CompileError {
    CompileError::invalid_arguments(
        format!(
            "{} takes {}, got {}",
            step.name.value,
            expected,
            step.args.len()
        ),
        step.span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;
    use crate::parser::parse;
    use docgraph_proto::{ElementKind, SelectStep};
    use pretty_assertions::assert_eq;

    fn make_steps(source: &str) -> Vec<Step> {
        compile(parse(source).unwrap()).unwrap()
    }

    fn compile_err(source: &str) -> CompileError {
        compile(parse(source).unwrap()).unwrap_err()
    }

    fn containers(step: &Step) -> &[HasContainer] {
        match step {
            Step::Has(h) => &h.containers,
            other => panic!("expected Has, got {:?}", other),
        }
    }

    #[test]
    fn test_start_steps() {
        assert_eq!(
            make_steps("g.V('a', 'b')"),
            vec![Step::Select(SelectStep {
                kind: ElementKind::Vertex,
                ids: vec!["a".into(), "b".into()],
                labels: vec![],
            })]
        );
        let steps = make_steps("g.E(['x', 7])");
        let Step::Select(select) = &steps[0] else {
            panic!("expected Select");
        };
        assert_eq!(select.kind, ElementKind::Edge);
        assert_eq!(select.ids, vec!["x".to_string(), "7".to_string()]);
    }

    #[test]
    fn test_matches_builder() {
        let compiled = make_steps(
            "g.V().hasLabel('person', 'dog').has('name', 'alice').barrier().out().as('x')",
        );
        let built = Traversal::vertices(Vec::<String>::new())
            .has_label(["person", "dog"])
            .has("name", Predicate::eq("alice"))
            .barrier()
            .step("out")
            .as_("x")
            .into_steps();
        assert_eq!(compiled, built);
    }

    #[test]
    fn test_has_forms() {
        let steps = make_steps(
            "g.V().has('age', gt(30)).has('person', 'name', 'bob').has('~id', 'a')",
        );
        assert_eq!(
            containers(&steps[1]),
            &[HasContainer::property("age", Predicate::gt(30))]
        );
        assert_eq!(
            containers(&steps[2]),
            &[
                HasContainer::label(Predicate::eq("person")),
                HasContainer::property("name", Predicate::eq("bob")),
            ]
        );
        assert_eq!(
            containers(&steps[3]),
            &[HasContainer::id(Predicate::eq("a"))]
        );
    }

    #[test]
    fn test_has_existence_is_opaque() {
        let steps = make_steps("g.V().has('nick')");
        assert_eq!(
            steps[1],
            Step::Other(OtherStep {
                name: "has".into(),
                args: vec![Value::from("nick")],
                labels: vec![],
            })
        );
    }

    #[test]
    fn test_predicates() {
        let steps = make_steps(
            "g.V().has('a', gt(1).and(lt(5)).or(eq(9)))\
             .has('b', within('x', 'y'))\
             .has('c', P.without([1, 2]))\
             .has('d', between(1, 10))\
             .has('e', outside(1, 10))\
             .has('f', TextP.regex('^a'))",
        );
        assert_eq!(
            containers(&steps[1])[0].predicate,
            Predicate::gt(1).and(Predicate::lt(5)).or(Predicate::eq(9))
        );
        assert_eq!(
            containers(&steps[2])[0].predicate,
            Predicate::within(vec!["x", "y"])
        );
        assert_eq!(
            containers(&steps[3])[0].predicate,
            Predicate::without(vec![1, 2])
        );
        assert_eq!(
            containers(&steps[4])[0].predicate,
            Predicate::gte(1).and(Predicate::lt(10))
        );
        assert_eq!(
            containers(&steps[5])[0].predicate,
            Predicate::lt(1).or(Predicate::gt(10))
        );
        assert_eq!(containers(&steps[6])[0].predicate, Predicate::regex("^a"));
    }

    #[test]
    fn test_unknown_operator_is_kept() {
        let steps = make_steps("g.V().has('a', near(3))");
        assert_eq!(
            containers(&steps[1])[0].predicate,
            Predicate::named("near", 3)
        );
    }

    #[test]
    fn test_label_id_key_value_steps() {
        let steps = make_steps(
            "g.V().hasLabel(within('a', 'b')).hasId(1, 'x').hasKey('name').hasValue(3.5)",
        );
        assert_eq!(
            containers(&steps[1]),
            &[HasContainer::label(Predicate::within(vec!["a", "b"]))]
        );
        assert_eq!(
            containers(&steps[2]),
            &[HasContainer::id(Predicate::within(vec!["1", "x"]))]
        );
        assert_eq!(
            containers(&steps[3])[0].key,
            HasKey::Synthetic("~key".into())
        );
        assert_eq!(
            containers(&steps[4])[0],
            HasContainer::new(HasKey::Synthetic("~value".into()), Predicate::eq(3.5))
        );
    }

    #[test]
    fn test_other_steps_keep_arguments() {
        let steps = make_steps("g.V().out('knows').limit(2).valueMap({a: [1, null]})");
        let Step::Other(out) = &steps[1] else {
            panic!("expected Other");
        };
        assert_eq!(out.name, "out");
        assert_eq!(out.args, vec![Value::from("knows")]);
        let Step::Other(value_map) = &steps[3] else {
            panic!("expected Other");
        };
        let Value::Map(map) = &value_map.args[0] else {
            panic!("expected map argument");
        };
        assert_eq!(map["a"], Value::List(vec![Value::Int32(1), Value::Null]));
    }

    #[test]
    fn test_large_integers_widen() {
        let steps = make_steps("g.V().has('n', 5000000000)");
        assert_eq!(
            containers(&steps[1])[0].predicate,
            Predicate::eq(Value::Int64(5_000_000_000))
        );
    }

    #[test]
    fn test_as_labels_select() {
        let steps = make_steps("g.V().as('a', 'b')");
        assert_eq!(steps[0].labels(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_unknown_source() {
        assert_eq!(compile_err("h.V()").kind, CompileErrorKind::UnknownSource);
        let err = compile_err("g.X()");
        assert_eq!(err.kind, CompileErrorKind::UnknownSource);
        assert_eq!(err.span, Span::new(2, 3));
    }

    #[test]
    fn test_invalid_arguments() {
        for source in [
            "g.V().has()",
            "g.V().has(1, 2)",
            "g.V().has('a', 'b', 'c', 'd')",
            "g.V().hasLabel()",
            "g.V().hasLabel(1)",
            "g.V().hasLabel(eq('a'), 'b')",
            "g.V().hasId(true)",
            "g.V(gt(1))",
            "g.V().as()",
            "g.V().barrier(1, 2)",
            "g.V().is(gt(1))",
            "g.V().has('a', gt(1, 2))",
            "g.V().has('a', between(1))",
        ] {
            assert_eq!(
                compile_err(source).kind,
                CompileErrorKind::InvalidArguments,
                "{}",
                source
            );
        }
    }

    #[test]
    fn test_invalid_literal() {
        let huge = format!("g.V().has('a', {}.0)", "9".repeat(400));
        assert_eq!(compile_err(&huge).kind, CompileErrorKind::InvalidLiteral);

        let err = compile_err("g.V().has('m', {a: 1, a: 2})");
        assert_eq!(err.kind, CompileErrorKind::InvalidLiteral);
        assert!(err.message.contains("duplicate"));
    }
}

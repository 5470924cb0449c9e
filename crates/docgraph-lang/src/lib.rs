//! docgraph traversal language
//!
//! Parses Gremlin-style traversal text and compiles it into the step
//! descriptors the planner rewrites.
//!
//! # Syntax
//!
//! ```text
//! g.V()
//! g.V('alice', 'bob').out('knows')
//! g.V().hasLabel('person').has('age', gt(30))
//! g.V().has('person', 'name', within('alice', 'bob')).as('p')
//! g.E().has('weight', gte(0.5).and(lt(1.0))).barrier()
//! g.V().hasKey('nick').hasValue(TextP.startingWith('a'))
//! ```
//!
//! Literals are strings (single or double quoted), integers, floats,
//! `true`, `false`, `null`, lists `[...]` and maps `{key: value}`.
//! Predicates are calls such as `eq(1)` or `P.within('a', 'b')` and chain
//! with `.and(...)` and `.or(...)`.
//!
//! # Usage
//!
//! ```rust
//! use docgraph_lang::{parse, compile, parse_and_compile};
//!
//! let steps = parse_and_compile("g.V().hasLabel('person').has('age', gt(30))").unwrap();
//! assert_eq!(steps.len(), 3);
//!
//! let expr = parse("g.V()").unwrap();
//! let steps = compile(expr).unwrap();
//! assert_eq!(steps.len(), 1);
//! ```

pub mod ast;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;

pub use ast::{Argument, Literal, PredicateExpr, StepCall, TraversalExpr};
pub use error::{CompileError, CompileErrorKind, LangError, ParseError};
pub use span::{Span, Spanned};

use docgraph_proto::Step;

/// Parse traversal text into a syntax tree.
pub fn parse(source: &str) -> Result<TraversalExpr, ParseError> {
    parser::parse(source)
}

/// Compile a syntax tree into steps.
pub fn compile(expr: TraversalExpr) -> Result<Vec<Step>, CompileError> {
    compiler::compile(expr)
}

/// Parse and compile in one step.
///
/// ```rust
/// use docgraph_lang::parse_and_compile;
///
/// let err = parse_and_compile("g.V().has('age' 30)").unwrap_err();
/// assert!(err.format_with_source("g.V().has('age' 30)").contains("line 1"));
/// ```
pub fn parse_and_compile(source: &str) -> Result<Vec<Step>, LangError> {
    let expr = parse(source)?;
    Ok(compile(expr)?)
}

/// Tokenize traversal text, for debugging.
pub fn tokenize(source: &str) -> Result<Vec<lexer::SpannedToken>, ParseError> {
    lexer::tokenize(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_proto::{HasContainer, Predicate, Traversal};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_and_compile() {
        let steps = parse_and_compile(
            r#"
            g.V()
                .hasLabel("person")
                .has("age", gt(30))
                .out("knows")
            "#,
        )
        .unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[2].to_string(), "has(age.gt(30))");
    }

    #[test]
    fn test_same_as_builder() {
        let steps = parse_and_compile("g.E('e1').has('weight', lte(2))").unwrap();
        let built = Traversal::edges(["e1"])
            .has_container(HasContainer::property("weight", Predicate::lte(2)))
            .into_steps();
        assert_eq!(steps, built);
    }

    #[test]
    fn test_errors_keep_their_stage() {
        let source = "g.V().has('age' 30)";
        let err = parse_and_compile(source).unwrap_err();
        assert!(matches!(err, LangError::Parse(_)));
        let formatted = err.format_with_source(source);
        assert!(formatted.contains("line 1:17"));
        assert!(formatted.contains("error"));

        let err = parse_and_compile("g.V().hasLabel(1)").unwrap_err();
        assert!(matches!(
            err,
            LangError::Compile(CompileError {
                kind: CompileErrorKind::InvalidArguments,
                ..
            })
        ));
        assert_eq!(err.span(), Span::new(15, 16));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("g.V()").unwrap().len(), 5);
        assert!(tokenize("g.V() #").is_err());
    }
}

//! Recursive descent parser for traversal text.
//!
//! ```text
//! traversal := IDENT '.' call ('.' call)*
//! call      := IDENT '(' (arg (',' arg)*)? ')'
//! arg       := literal | predicate
//! predicate := (('P' | 'TextP') '.')? IDENT '(' (literal (',' literal)*)? ')'
//!              ('.' ('and' | 'or') '(' predicate ')')*
//! literal   := 'null' | 'true' | 'false' | INT | FLOAT | STRING
//!            | '[' (literal (',' literal)*)? ']'
//!            | '{' ((IDENT | STRING) ':' literal (',' ...)*)? '}'
//! ```

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Lexer, SpannedToken, Token};
use crate::span::{Span, Spanned};

/// Namespaces predicates may be qualified with.
const PREDICATE_NAMESPACES: [&str; 2] = ["P", "TextP"];

pub struct Parser<'source> {
    lexer: Lexer<'source>,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Parse a complete traversal; trailing input is an error.
    pub fn parse_traversal(&mut self) -> Result<TraversalExpr, ParseError> {
        let source = self.expect_ident()?;
        self.expect_token(Token::Dot)?;
        let start = self.parse_call()?;

        let mut steps = Vec::new();
        while self.eat(&Token::Dot)? {
            steps.push(self.parse_call()?);
        }

        if let Some(tok) = self.lexer.next_token()? {
            return Err(ParseError::new(
                format!("expected '.' or end of input, found {}", tok.token.describe()),
                tok.span,
            ));
        }

        let end = steps.last().map_or(start.span, |s| s.span);
        Ok(TraversalExpr {
            span: source.span.merge(end),
            source,
            start,
            steps,
        })
    }

    fn parse_call(&mut self) -> Result<StepCall, ParseError> {
        let name = self.expect_ident()?;
        self.expect_token(Token::LParen).map_err(|e| {
            e.with_hint(format!("steps are called with parentheses: {}()", name.value))
        })?;

        let mut args = Vec::new();
        let end = loop {
            if let Some(end) = self.eat_close(&Token::RParen, args.is_empty())? {
                break end;
            }
            args.push(self.parse_argument()?);
        };

        Ok(StepCall {
            span: name.span.merge(end),
            name,
            args,
        })
    }

    fn parse_argument(&mut self) -> Result<Argument, ParseError> {
        if matches!(self.peek_token()?, Some(Token::Ident(_))) {
            self.parse_predicate().map(Argument::Predicate)
        } else {
            self.parse_literal().map(Argument::Literal)
        }
    }

    fn parse_predicate(&mut self) -> Result<PredicateExpr, ParseError> {
        let mut left = self.parse_predicate_call()?;

        while self.eat(&Token::Dot)? {
            let connective = self.expect_ident()?;
            self.expect_token(Token::LParen)?;
            let right = self.parse_predicate()?;
            self.expect_token(Token::RParen)?;

            left = match connective.value.as_str() {
                "and" => PredicateExpr::And(Box::new(left), Box::new(right)),
                "or" => PredicateExpr::Or(Box::new(left), Box::new(right)),
                other => {
                    return Err(ParseError::new(
                        format!("expected 'and' or 'or' after a predicate, found '{}'", other),
                        connective.span,
                    ))
                }
            };
        }

        Ok(left)
    }

    fn parse_predicate_call(&mut self) -> Result<PredicateExpr, ParseError> {
        let mut name = self.expect_ident()?;
        if PREDICATE_NAMESPACES.contains(&name.value.as_str()) && self.eat(&Token::Dot)? {
            let qualified = self.expect_ident()?;
            name = Spanned::new(qualified.value, name.span.merge(qualified.span));
        }
        self.expect_token(Token::LParen).map_err(|e| {
            e.with_hint("bare identifiers are not values; quote strings with ' or \"")
        })?;

        let mut args = Vec::new();
        let end = loop {
            if let Some(end) = self.eat_close(&Token::RParen, args.is_empty())? {
                break end;
            }
            args.push(self.parse_literal()?);
        };

        Ok(PredicateExpr::Call {
            span: name.span.merge(end),
            name,
            args,
        })
    }

    fn parse_literal(&mut self) -> Result<Spanned<Literal>, ParseError> {
        let tok = self.next_token()?;
        let literal = match tok.token {
            Token::Null => Literal::Null,
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Int(i) => Literal::Int(i),
            Token::Float(f) => Literal::Float(f),
            Token::String(s) | Token::StringSingle(s) => Literal::String(s),
            Token::LBracket => return self.parse_list(tok.span),
            Token::LBrace => return self.parse_map(tok.span),
            other => {
                return Err(ParseError::new(
                    format!("expected literal value, found {}", other.describe()),
                    tok.span,
                ))
            }
        };
        Ok(Spanned::new(literal, tok.span))
    }

    fn parse_list(&mut self, open: Span) -> Result<Spanned<Literal>, ParseError> {
        let mut items = Vec::new();
        let end = loop {
            if let Some(end) = self.eat_close(&Token::RBracket, items.is_empty())? {
                break end;
            }
            items.push(self.parse_literal()?);
        };
        Ok(Spanned::new(Literal::List(items), open.merge(end)))
    }

    fn parse_map(&mut self, open: Span) -> Result<Spanned<Literal>, ParseError> {
        let mut entries = Vec::new();
        let end = loop {
            if let Some(end) = self.eat_close(&Token::RBrace, entries.is_empty())? {
                break end;
            }
            let tok = self.next_token()?;
            let key = match tok.token {
                Token::Ident(s) | Token::String(s) | Token::StringSingle(s) => {
                    Spanned::new(s, tok.span)
                }
                other => {
                    return Err(ParseError::new(
                        format!("expected map key, found {}", other.describe()),
                        tok.span,
                    ))
                }
            };
            self.expect_token(Token::Colon)?;
            entries.push((key, self.parse_literal()?));
        };
        Ok(Spanned::new(Literal::Map(entries), open.merge(end)))
    }

    /// Handle the separator or closing token of a delimited list.
    ///
    /// Returns the closing span once `close` is consumed. Before every item
    /// but the first a `,` is required.
    fn eat_close(&mut self, close: &Token, first: bool) -> Result<Option<Span>, ParseError> {
        if let Some(tok) = self.lexer.peek()? {
            if tok.token == *close {
                let span = tok.span;
                self.lexer.next_token()?;
                return Ok(Some(span));
            }
        }
        if !first {
            let tok = self.next_token()?;
            if tok.token != Token::Comma {
                return Err(ParseError::new(
                    format!(
                        "expected ',' or {}, found {}",
                        close.describe(),
                        tok.token.describe()
                    ),
                    tok.span,
                )
                .with_hint("separate arguments with ','"));
            }
        }
        Ok(None)
    }

    fn peek_token(&mut self) -> Result<Option<&Token>, ParseError> {
        Ok(self.lexer.peek()?.map(|t| &t.token))
    }

    /// Consume the next token if it is `expected`.
    fn eat(&mut self, expected: &Token) -> Result<bool, ParseError> {
        if self.peek_token()? == Some(expected) {
            self.lexer.next_token()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::Ident(name) => Ok(Spanned::new(name, tok.span)),
            other => Err(ParseError::new(
                format!("expected identifier, found {}", other.describe()),
                tok.span,
            )),
        }
    }

    fn expect_token(&mut self, expected: Token) -> Result<SpannedToken, ParseError> {
        let tok = self.next_token()?;
        if tok.token == expected {
            Ok(tok)
        } else {
            Err(ParseError::new(
                format!(
                    "expected {}, found {}",
                    expected.describe(),
                    tok.token.describe()
                ),
                tok.span,
            ))
        }
    }

    fn next_token(&mut self) -> Result<SpannedToken, ParseError> {
        let end = self.lexer.source().len();
        self.lexer
            .next_token()?
            .ok_or_else(|| ParseError::new("unexpected end of input", Span::at(end)))
    }
}

/// Parse traversal text.
pub fn parse(source: &str) -> Result<TraversalExpr, ParseError> {
    Parser::new(source).parse_traversal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(expr: &TraversalExpr) -> Vec<&str> {
        expr.steps.iter().map(|s| s.name.value.as_str()).collect()
    }

    fn literal(arg: &Argument) -> &Literal {
        match arg {
            Argument::Literal(l) => &l.value,
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_start_only() {
        let expr = parse("g.V()").unwrap();
        assert_eq!(expr.source.value, "g");
        assert_eq!(expr.start.name.value, "V");
        assert!(expr.start.args.is_empty());
        assert!(expr.steps.is_empty());
        assert_eq!(expr.span, Span::new(0, 5));
    }

    #[test]
    fn test_parse_chain() {
        let expr = parse(r#"g.V("a", 'b').hasLabel("person").has("age", 30).out()"#).unwrap();
        assert_eq!(expr.start.args.len(), 2);
        assert_eq!(names(&expr), vec!["hasLabel", "has", "out"]);
        assert_eq!(literal(&expr.steps[1].args[1]), &Literal::Int(30));
    }

    #[test]
    fn test_parse_multiline() {
        let source = "g.E()\n  .has('weight', gte(0.5))\n  .barrier()";
        let expr = parse(source).unwrap();
        assert_eq!(expr.start.name.value, "E");
        assert_eq!(names(&expr), vec!["has", "barrier"]);
    }

    #[test]
    fn test_parse_predicate_chain() {
        let expr = parse("g.V().has('age', gt(1).and(lt(5)).or(eq(9)))").unwrap();
        let Argument::Predicate(pred) = &expr.steps[0].args[1] else {
            panic!("expected predicate");
        };
        let PredicateExpr::Or(left, right) = pred else {
            panic!("expected or, got {:?}", pred);
        };
        assert!(matches!(left.as_ref(), PredicateExpr::And(_, _)));
        assert!(matches!(right.as_ref(), PredicateExpr::Call { name, .. } if name.value == "eq"));
    }

    #[test]
    fn test_parse_qualified_predicate() {
        let expr = parse("g.V().has('name', TextP.startingWith('a'))").unwrap();
        let Argument::Predicate(PredicateExpr::Call { name, args, .. }) = &expr.steps[0].args[1]
        else {
            panic!("expected predicate call");
        };
        assert_eq!(name.value, "startingWith");
        assert_eq!(args[0].value, Literal::String("a".into()));
    }

    #[test]
    fn test_parse_collections() {
        let expr = parse("g.V().property('m', {a: 1, 'b c': [true, null]}).inject([])").unwrap();
        let Literal::Map(entries) = literal(&expr.steps[0].args[1]) else {
            panic!("expected map");
        };
        assert_eq!(entries[0].0.value, "a");
        assert_eq!(entries[1].0.value, "b c");
        assert_eq!(
            entries[1].1.value,
            Literal::List(vec![
                Spanned::new(Literal::Bool(true), Span::new(35, 39)),
                Spanned::new(Literal::Null, Span::new(41, 45)),
            ])
        );
        assert_eq!(literal(&expr.steps[1].args[0]), &Literal::List(vec![]));
    }

    #[test]
    fn test_missing_comma() {
        let err = parse("g.V().has('age' 30)").unwrap_err();
        assert!(err.message.contains("expected ',' or ')'"));
        assert_eq!(err.span, Span::new(16, 18));
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_trailing_comma_is_rejected() {
        assert!(parse("g.V('a',)").is_err());
    }

    #[test]
    fn test_missing_parens() {
        let err = parse("g.V().out").unwrap_err();
        assert_eq!(err.message, "unexpected end of input");
        assert_eq!(err.hint.as_deref(), Some("steps are called with parentheses: out()"));
    }

    #[test]
    fn test_bare_identifier_argument() {
        let err = parse("g.V().has(name, 'x')").unwrap_err();
        assert!(err.hint.unwrap().contains("quote strings"));
    }

    #[test]
    fn test_bad_connective() {
        let err = parse("g.V().has('a', gt(1).xor(lt(2)))").unwrap_err();
        assert!(err.message.contains("'xor'"));
    }

    #[test]
    fn test_trailing_input() {
        let err = parse("g.V() g.V()").unwrap_err();
        assert!(err.message.contains("end of input"));
        assert_eq!(err.span, Span::new(6, 7));
    }

    #[test]
    fn test_lexer_error_surfaces() {
        let err = parse("g.V().has('a', 1) ;").unwrap_err();
        assert!(err.message.contains(';'));
    }
}

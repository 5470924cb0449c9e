//! Tokens of the traversal language, produced with logos.

use crate::error::ParseError;
use crate::span::Span;
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+|//[^\n]*")]
pub enum Token {
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape_string(strip_quotes(lex.slice())))]
    String(String),

    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape_string(strip_quotes(lex.slice())))]
    StringSingle(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

impl Token {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Null => "'null'".to_string(),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::String(_) | Token::StringSingle(_) => "string literal".to_string(),
            Token::Int(i) => format!("integer {}", i),
            Token::Float(f) => format!("number {}", f),
            Token::Dot => "'.'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Colon => "':'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    &s[1..s.len() - 1]
}

fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some(quoted @ ('\\' | '"' | '\'')) => result.push(quoted),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Spanned token stream with one token of lookahead.
///
/// Input that matches no token is reported as a [`ParseError`] at the
/// position it occurs.
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    peeked: Option<Option<Result<SpannedToken, Span>>>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<&SpannedToken>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lex());
        }
        match &self.peeked {
            Some(Some(Ok(tok))) => Ok(Some(tok)),
            Some(Some(Err(span))) => Err(invalid_input(self.inner.source(), *span)),
            _ => Ok(None),
        }
    }

    /// Consume the next token; `Ok(None)` at end of input.
    pub fn next_token(&mut self) -> Result<Option<SpannedToken>, ParseError> {
        let next = match self.peeked.take() {
            Some(peeked) => peeked,
            None => self.lex(),
        };
        match next {
            Some(Ok(tok)) => Ok(Some(tok)),
            Some(Err(span)) => Err(invalid_input(self.inner.source(), span)),
            None => Ok(None),
        }
    }

    fn lex(&mut self) -> Option<Result<SpannedToken, Span>> {
        let token = self.inner.next()?;
        let span: Span = self.inner.span().into();
        Some(match token {
            Ok(token) => Ok(SpannedToken { token, span }),
            Err(()) => Err(span),
        })
    }

    pub fn source(&self) -> &'source str {
        self.inner.source()
    }
}

fn invalid_input(source: &str, span: Span) -> ParseError {
    let text = source.get(span.start..span.end).unwrap_or_default();
    let err = ParseError::new(format!("unexpected input '{}'", text), span);
    if text.starts_with('"') || text.starts_with('\'') {
        err.with_hint("string literal is not terminated")
    } else if text.trim_start_matches('-').starts_with(|c: char| c.is_ascii_digit()) {
        err.with_hint("integers must fit in 64 bits")
    } else {
        err
    }
}

/// Tokenize the whole input, stopping at the first invalid input.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(tok) = lexer.next_token()? {
        tokens.push(tok);
    }
    Ok(tokens)
}

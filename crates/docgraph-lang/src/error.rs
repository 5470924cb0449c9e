//! Parse and compile errors.

use crate::span::{offset_to_line_col, Span};
use thiserror::Error;

/// Error while lexing or parsing traversal text.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// Suggested fix, shown under the snippet.
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Render the error with the offending source line underlined.
    pub fn format_with_source(&self, source: &str) -> String {
        let mut out = format!("error: {}\n", self.message);
        write_snippet(&mut out, source, self.span);
        if let Some(hint) = &self.hint {
            out.push_str(&format!("   = hint: {}\n", hint));
        }
        out
    }
}

/// What went wrong while compiling a parsed traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// The traversal does not start with `g.V(...)` or `g.E(...)`.
    UnknownSource,
    /// A step or predicate got arguments it cannot take.
    InvalidArguments,
    /// A literal has no value counterpart.
    InvalidLiteral,
}

/// Error while turning a parsed traversal into steps.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub span: Span,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(message: impl Into<String>, span: Span, kind: CompileErrorKind) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
        }
    }

    pub fn unknown_source(message: impl Into<String>, span: Span) -> Self {
        Self::new(message, span, CompileErrorKind::UnknownSource)
    }

    pub fn invalid_arguments(message: impl Into<String>, span: Span) -> Self {
        Self::new(message, span, CompileErrorKind::InvalidArguments)
    }

    pub fn invalid_literal(message: impl Into<String>, span: Span) -> Self {
        Self::new(message, span, CompileErrorKind::InvalidLiteral)
    }

    pub fn format_with_source(&self, source: &str) -> String {
        let mut out = format!("error[{:?}]: {}\n", self.kind, self.message);
        write_snippet(&mut out, source, self.span);
        out
    }
}

/// Any error from [`crate::parse_and_compile`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LangError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

impl LangError {
    pub fn format_with_source(&self, source: &str) -> String {
        match self {
            LangError::Parse(e) => e.format_with_source(source),
            LangError::Compile(e) => e.format_with_source(source),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            LangError::Parse(e) => e.span,
            LangError::Compile(e) => e.span,
        }
    }
}

fn write_snippet(out: &mut String, source: &str, span: Span) {
    let (line, col) = offset_to_line_col(source, span.start);
    out.push_str(&format!("  --> line {}:{}\n", line, col));

    let Some(text) = source.lines().nth(line - 1) else {
        return;
    };
    out.push_str(&format!("   |\n{:3}| {}\n   |", line, text));
    out.push_str(&" ".repeat(col));
    out.push('^');
    let room = text.chars().count().saturating_sub(col);
    out.push_str(&"~".repeat(span.len().saturating_sub(1).min(room)));
    out.push('\n');
}

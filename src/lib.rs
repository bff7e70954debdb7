//! Hummus - packrat reader for a Kernel-style Lisp surface syntax
//!
//! This crate turns source text into a tree of [`ast::Value`]s. The surface syntax
//! is the usual Lisp fare plus Kernel's constant atoms:
//!
//! ```scheme
//! ;; comments run to the end of the line
//! (define x 42)          ; symbols and integers
//! (1.5 2e3 0x1F 0o17)    ; floats, exponents, hex and octal
//! ("tab\there" "\x41")   ; strings with mnemonic and numeric escapes
//! (a b . c)              ; dotted pairs / improper lists
//! (#t #f #ignore #inert) ; constant atoms
//! ```
//!
//! ## Engine
//!
//! Parsing is done by a packrat engine: every rule application is memoized by
//! (rule, arguments, position) for the duration of one parse call, so
//! backtracking never re-parses the same input with the same rule twice.
//! Directly left-recursive rules are supported through seed-and-grow iteration:
//! a rule that re-enters itself at the same position first fails, the first
//! successful answer becomes a seed, and the rule body is re-run until the
//! answer stops growing.
//!
//! ## Diagnostics
//!
//! The engine remembers the furthest (rule, position) at which anything failed
//! during the whole parse, including on abandoned alternatives. A failed parse
//! reports that point with its line, column, source line and a caret.
//!
//! ## Modules
//!
//! - `ast`: the value tree, symbol interning and printing
//! - `input`: source buffer with line/column lookup
//! - `engine`: memo table, left recursion and combinators
//! - `grammar`: the rules of the surface syntax
//! - `diagnostics`: failure reports
//! - `reader`: public entry points

use thiserror::Error;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax before the end of the input
    InvalidSyntax,
    /// Input ended before the expression was complete (unclosed parens, unterminated string)
    Incomplete,
    /// A rule matched, but input remained after it
    TrailingContent,
    /// Rule nesting exceeded the configured maximum depth
    TooDeeplyNested,
    /// The configured step budget ran out, or the engine hit an internal limit
    ImplementationLimit,
}

impl ParseErrorKind {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            ParseErrorKind::InvalidSyntax => "invalid syntax",
            ParseErrorKind::Incomplete => "unexpected end of input",
            ParseErrorKind::TrailingContent => "unexpected trailing content",
            ParseErrorKind::TooDeeplyNested => "expression too deeply nested",
            ParseErrorKind::ImplementationLimit => "parse step budget exhausted",
        }
    }
}

/// Resource limits for one parse call. Both are off by default: rule bodies run on
/// a stack that grows on demand, so nesting is bounded by memory alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseConfig {
    /// Maximum number of nested rule bodies, if bounded. Nested lists and long
    /// lists both consume nesting levels.
    pub max_depth: Option<usize>,
    /// Maximum number of rule applications, if bounded
    pub max_steps: Option<usize>,
}

impl ParseConfig {
    /// Bound the rule nesting depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Bound the number of rule applications one parse may perform
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }
}

/// Error type for the reader
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("ParseError: {0}")]
    Parse(diagnostics::ParseFailure),
    #[error("unknown grammar rule '{0}'")]
    UnknownRule(String),
}

impl Error {
    /// The parse failure, if this is one
    pub fn as_parse_failure(&self) -> Option<&diagnostics::ParseFailure> {
        match self {
            Error::Parse(failure) => Some(failure),
            Error::UnknownRule(_) => None,
        }
    }
}

pub mod ast;
pub mod diagnostics;
pub mod engine;
pub mod grammar;
pub mod input;
pub mod reader;

pub use ast::{Number, Symbol, Value};
pub use diagnostics::ParseFailure;
pub use engine::ParseStats;
pub use grammar::Rule;
pub use reader::{
    parse_all, parse_all_with_config, parse_rule, parse_rule_with_config, parse_with_stats,
};

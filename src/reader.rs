//! Public entry points.
//!
//! Each call builds a fresh [`Parser`]; memo tables and failure records never
//! outlive the call, so concurrent parses share nothing but the symbol table.

use tracing::debug;

use crate::ast::{Value, list};
use crate::diagnostics::ParseFailure;
use crate::engine::{Capture, Failure, ParseStats, Parser};
use crate::grammar::{Kernel, Rule};
use crate::{Error, ParseConfig, ParseErrorKind};

/// Parse a whole program: one or more expressions surrounded by layout.
/// The result is a proper list of the expressions in source order.
///
/// # Examples
///
/// ```
/// use hummus::parse_all;
///
/// let program = parse_all("(define x 1) x").unwrap();
/// assert_eq!(program.list_len(), Some(2));
/// assert!(matches!(parse_all("(a b"), Err(hummus::Error::Parse(_))));
/// ```
pub fn parse_all(text: &str) -> Result<Value, Error> {
    parse_all_with_config(text, &ParseConfig::default())
}

pub fn parse_all_with_config(text: &str, config: &ParseConfig) -> Result<Value, Error> {
    read(text, Rule::Root, *config).0
}

/// Parse `text` as exactly one instance of the named rule.
///
/// The whole input must be consumed. Rules that produce no value (`skip`,
/// `comment`) read as `()`; rules that produce text (`identifier`, `str_seq`,
/// `escape`) read as strings.
///
/// ```
/// use hummus::{parse_rule, Value};
///
/// assert_eq!(parse_rule("0x1F", "number").unwrap().to_string(), "31");
/// assert_eq!(parse_rule("n", "escape").unwrap(), Value::from("\n"));
/// assert!(parse_rule("1", "no-such-rule").is_err());
/// ```
pub fn parse_rule(text: &str, rule_name: &str) -> Result<Value, Error> {
    parse_rule_with_config(text, rule_name, &ParseConfig::default())
}

pub fn parse_rule_with_config(
    text: &str,
    rule_name: &str,
    config: &ParseConfig,
) -> Result<Value, Error> {
    let rule = lookup(rule_name)?;
    read(text, rule, *config).0
}

/// Like [`parse_rule_with_config`], also returning the engine's counters
pub fn parse_with_stats(
    text: &str,
    rule_name: &str,
    config: &ParseConfig,
) -> (Result<Value, Error>, ParseStats) {
    match lookup(rule_name) {
        Ok(rule) => read(text, rule, *config),
        Err(err) => (Err(err), ParseStats::default()),
    }
}

fn lookup(rule_name: &str) -> Result<Rule, Error> {
    Rule::from_name(rule_name).ok_or_else(|| Error::UnknownRule(rule_name.to_owned()))
}

fn capture_to_value(capture: Capture) -> Value {
    match capture {
        Capture::Unit => Value::Null,
        Capture::Text(text) => Value::String(text),
        Capture::Value(value) => value,
        Capture::Values(values) => list(values),
    }
}

fn read(text: &str, rule: Rule, config: ParseConfig) -> (Result<Value, Error>, ParseStats) {
    debug!(rule = rule.name(), len = text.len(), "parse started");

    let mut parser = Parser::<Kernel>::new(text, config);
    let outcome = parser.apply(rule);
    let input = parser.input();

    let result = match outcome {
        Ok(capture) if parser.at_end() => Ok(capture_to_value(capture)),
        Ok(_) => {
            // a prefix matched; blame whatever got furthest
            let matched_to = parser.pos();
            Err(match parser.failure().furthest() {
                Some((blamed, offset)) if offset > matched_to => {
                    ParseFailure::syntax(blamed, offset, input)
                }
                _ => ParseFailure::new(
                    ParseErrorKind::TrailingContent,
                    rule,
                    matched_to,
                    input,
                ),
            })
        }
        Err(Failure::Miss) => {
            let (blamed, offset) = parser.failure().furthest().unwrap_or((rule, 0));
            Err(ParseFailure::syntax(blamed, offset, input))
        }
        Err(Failure::Halt(halt)) => {
            let (blamed, offset) = match parser.halted() {
                Some(halted) => (halted.rule.unwrap_or(rule), halted.offset),
                None => (rule, parser.pos()),
            };
            Err(ParseFailure::halted(halt, blamed, offset, input))
        }
    };

    let stats = parser.stats();
    match &result {
        Ok(_) => debug!(
            rule = rule.name(),
            applications = stats.applications,
            memo_hits = stats.memo_hits,
            "parse finished"
        ),
        Err(failure) => debug!(
            rule = rule.name(),
            failure = %failure.oneline(),
            "parse failed"
        ),
    }

    (result.map_err(Error::Parse), stats)
}

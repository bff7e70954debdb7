//! The surface syntax as a set of packrat rules.
//!
//! ```text
//! root        = skip expressions skip !.
//! expressions = expression (skip expression)*
//! expression  = number | string | constant | symbol | list
//! list        = "(" skip pairs skip ")"
//! pairs       = expression skip "." skip expression
//!             | pairs skip "." skip expression
//!             | expression skip pairs
//!             | expression
//!             | ε
//! ```
//!
//! `pairs` is directly left-recursive; the engine grows it. The lexical rules
//! (`skip`, `number`, `string`, `escape`, ...) live in [`lexical`].

use crate::ast::{Value, cons, list};
use crate::engine::{Capture, Failure, Grammar, Parser, Step};

pub mod lexical;

/// One tag per production of the grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Skip,
    Comment,
    Identifier,
    Expression,
    Number,
    /// `digits(radix, min, max)`: a run of `min..=max` digits in `radix`
    Digits,
    Escape,
    NumberEscapes,
    Escapes,
    StrSeq,
    String,
    Symbol,
    Constant,
    List,
    Pairs,
    Expressions,
    Root,
}

impl Rule {
    pub const ALL: [Rule; 17] = [
        Rule::Skip,
        Rule::Comment,
        Rule::Identifier,
        Rule::Expression,
        Rule::Number,
        Rule::Digits,
        Rule::Escape,
        Rule::NumberEscapes,
        Rule::Escapes,
        Rule::StrSeq,
        Rule::String,
        Rule::Symbol,
        Rule::Constant,
        Rule::List,
        Rule::Pairs,
        Rule::Expressions,
        Rule::Root,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rule::Skip => "skip",
            Rule::Comment => "comment",
            Rule::Identifier => "identifier",
            Rule::Expression => "expression",
            Rule::Number => "number",
            Rule::Digits => "digits",
            Rule::Escape => "escape",
            Rule::NumberEscapes => "number_escapes",
            Rule::Escapes => "escapes",
            Rule::StrSeq => "str_seq",
            Rule::String => "string",
            Rule::Symbol => "symbol",
            Rule::Constant => "constant",
            Rule::List => "list",
            Rule::Pairs => "pairs",
            Rule::Expressions => "expressions",
            Rule::Root => "root",
        }
    }

    /// The rule's definition, for error messages
    pub fn rendered(self) -> &'static str {
        match self {
            Rule::Skip => r"(comment | /\s/)*",
            Rule::Comment => r"/;[^\n]*/",
            Rule::Identifier => r"/[\p{L}\p{S}\d!@#%&*\-\\:.\/?_]+/",
            Rule::Expression => "number | string | constant | symbol | list",
            Rule::Number => concat!(
                r"/[+-]?0[oO][0-7]+/ | /[+-]?0[xX][0-9a-fA-F]+/ | ",
                r"/[+-]?\d+(\.\d+)?[eE][+-]?\d+/ | /[+-]?\d+\.\d+/ | /[+-]?\d+/"
            ),
            Rule::Digits => "digits(radix, min, max)",
            Rule::Escape => "number_escapes | escapes",
            Rule::NumberEscapes => concat!(
                "/[xX]/ digits(16, 1, 5) | digits(10, 1, 6) | ",
                "/[oO]/ digits(8, 1, 7) | /[uU]/ digits(16, 4, 4)"
            ),
            Rule::Escapes => concat!(
                r#""n" | "s" | "r" | "t" | "v" | "f" | "b" | "a" | "e" | "\\" | "\"" | "#,
                r#""BS" | "HT" | "LF" | "VT" | "FF" | "CR" | "SO" | "SI" | "EM" | "FS" | "#,
                r#""GS" | "RS" | "US" | "SP" | "NUL" | "SOH" | "STX" | "ETX" | "EOT" | "#,
                r#""ENQ" | "ACK" | "BEL" | "DLE" | "DC1" | "DC2" | "DC3" | "DC4" | "NAK" | "#,
                r#""SYN" | "ETB" | "CAN" | "SUB" | "ESC" | "DEL" | ."#
            ),
            Rule::StrSeq => r#"/[^\\"]+/"#,
            Rule::String => r#""\"" ("\\" escape | str_seq)* "\"""#,
            Rule::Symbol => "identifier",
            Rule::Constant => r##""#t" | "#f" | "#ignore" | "#inert""##,
            Rule::List => r#""(" skip pairs skip ")""#,
            Rule::Pairs => concat!(
                r#"expression skip "." skip expression | pairs skip "." skip expression | "#,
                "expression skip pairs | expression | ε"
            ),
            Rule::Expressions => "expression (skip expression)*",
            Rule::Root => "skip expressions skip !.",
        }
    }

    /// Parameterized rules cannot be entered by name
    pub fn takes_arguments(self) -> bool {
        matches!(self, Rule::Digits)
    }

    /// Look up a rule that can be entered without arguments
    pub fn from_name(name: &str) -> Option<Rule> {
        Rule::ALL
            .into_iter()
            .find(|rule| rule.name() == name && !rule.takes_arguments())
    }
}

/// The Kernel surface grammar
pub struct Kernel;

impl Grammar for Kernel {
    type Rule = Rule;

    fn invoke(p: &mut Parser<'_, Self>, rule: Rule, args: &[u32]) -> Step<Capture> {
        match rule {
            Rule::Skip => lexical::skip(p),
            Rule::Comment => lexical::comment(p),
            Rule::Identifier => lexical::identifier(p),
            Rule::Number => lexical::number(p),
            Rule::Digits => lexical::digits(p, args),
            Rule::Escape => lexical::escape(p),
            Rule::NumberEscapes => lexical::number_escapes(p),
            Rule::Escapes => lexical::escapes(p),
            Rule::StrSeq => lexical::str_seq(p),
            Rule::String => lexical::string(p),
            Rule::Symbol => lexical::symbol(p),
            Rule::Constant => lexical::constant(p),
            Rule::Expression => expression(p),
            Rule::List => list_rule(p),
            Rule::Pairs => pairs(p),
            Rule::Expressions => expressions(p),
            Rule::Root => root(p),
        }
    }
}

/// Whitespace and comments between tokens
pub(crate) fn skip(p: &mut Parser<'_, Kernel>) -> Step<()> {
    p.apply(Rule::Skip).map(|_| ())
}

/// Constants come before symbols: the identifier rule would take `#t` as a name.
const EXPRESSION_KINDS: [Rule; 5] = [
    Rule::Number,
    Rule::String,
    Rule::Constant,
    Rule::Symbol,
    Rule::List,
];

fn expression(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    for rule in EXPRESSION_KINDS {
        match p.apply(rule) {
            Err(Failure::Miss) => continue,
            done => return done,
        }
    }
    Err(Failure::Miss)
}

fn list_rule(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.sequence(|p| {
        p.literal("(")?;
        skip(p)?;
        let pairs = p.apply_value(Rule::Pairs)?;
        skip(p)?;
        p.literal(")")?;
        Ok(Capture::Value(pairs))
    })
}

fn pairs(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.first_of(&[dotted_pair, dotted_chain, element_then_rest, single_element, no_elements])
}

/// `a . b`
fn dotted_pair(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.sequence(|p| {
        let head = p.apply_value(Rule::Expression)?;
        skip(p)?;
        p.literal(".")?;
        skip(p)?;
        let tail = p.apply_value(Rule::Expression)?;
        Ok(Capture::Value(cons(head, tail)))
    })
}

/// `<pairs> . b`, the left-recursive alternative
fn dotted_chain(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.sequence(|p| {
        let chain = p.apply_value(Rule::Pairs)?;
        skip(p)?;
        p.literal(".")?;
        skip(p)?;
        let tail = p.apply_value(Rule::Expression)?;
        Ok(Capture::Value(chain.splice_tail(tail)))
    })
}

/// `a <pairs>`
fn element_then_rest(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.sequence(|p| {
        let head = p.apply_value(Rule::Expression)?;
        skip(p)?;
        let rest = p.apply_value(Rule::Pairs)?;
        Ok(Capture::Value(cons(head, rest)))
    })
}

fn single_element(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    let head = p.apply_value(Rule::Expression)?;
    Ok(Capture::Value(cons(head, Value::Null)))
}

fn no_elements(_: &mut Parser<'_, Kernel>) -> Step<Capture> {
    Ok(Capture::Value(Value::Null))
}

fn expressions(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.sequence(|p| {
        let first = p.apply_value(Rule::Expression)?;
        let rest = p.many(|p| {
            p.sequence(|p| {
                skip(p)?;
                p.apply_value(Rule::Expression)
            })
        })?;
        let mut values = Vec::with_capacity(rest.len() + 1);
        values.push(first);
        values.extend(rest);
        Ok(Capture::Values(values))
    })
}

fn root(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.sequence(|p| {
        skip(p)?;
        let values = p.apply(Rule::Expressions)?.into_values()?;
        skip(p)?;
        p.not_ahead(|p| p.any_char())?;
        Ok(Capture::Value(list(values)))
    })
}

//! Token-level rules: whitespace, comments, numbers, strings, symbols and constants.
//!
//! Regular-expression terminals are nom recognizers run through [`Parser::scan`];
//! the engine only sees how many bytes they consumed.

use nom::IResult;
use nom::Parser as _;
use nom::bytes::complete::{is_not, take_till, take_while1};
use nom::character::complete::{char, digit1, hex_digit1, oct_digit1, one_of};
use nom::combinator::{opt, recognize};
use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

use super::{Kernel, Rule};
use crate::ast::{Number, Value, sym};
use crate::engine::{Capture, Failure, Parser, Step};

/// Punctuation allowed in identifiers besides letters, symbols and ASCII digits
const IDENTIFIER_PUNCTUATION: &str = "!@#%&*-\\:./?_";

/// Named escapes in the order they are tried. `SO` precedes `SOH`, so `\SOH`
/// reads as shift-out followed by `H`.
const NAMED_ESCAPES: &[(&str, char)] = &[
    ("n", '\n'),
    ("s", ' '),
    ("r", '\r'),
    ("t", '\t'),
    ("v", '\u{0B}'),
    ("f", '\u{0C}'),
    ("b", '\u{08}'),
    ("a", '\u{07}'),
    ("e", '\u{1B}'),
    ("\\", '\\'),
    ("\"", '"'),
    ("BS", '\u{08}'),
    ("HT", '\t'),
    ("LF", '\n'),
    ("VT", '\u{0B}'),
    ("FF", '\u{0C}'),
    ("CR", '\r'),
    ("SO", '\u{0E}'),
    ("SI", '\u{0F}'),
    ("EM", '\u{19}'),
    ("FS", '\u{1C}'),
    ("GS", '\u{1D}'),
    ("RS", '\u{1E}'),
    ("US", '\u{1F}'),
    ("SP", ' '),
    ("NUL", '\0'),
    ("SOH", '\u{01}'),
    ("STX", '\u{02}'),
    ("ETX", '\u{03}'),
    ("EOT", '\u{04}'),
    ("ENQ", '\u{05}'),
    ("ACK", '\u{06}'),
    ("BEL", '\u{07}'),
    ("DLE", '\u{10}'),
    ("DC1", '\u{11}'),
    ("DC2", '\u{12}'),
    ("DC3", '\u{13}'),
    ("DC4", '\u{14}'),
    ("NAK", '\u{15}'),
    ("SYN", '\u{16}'),
    ("ETB", '\u{17}'),
    ("CAN", '\u{18}'),
    ("SUB", '\u{1A}'),
    ("ESC", '\u{1B}'),
    ("DEL", '\u{7F}'),
];

const CONSTANTS: [(&str, Value); 4] = [
    ("#t", Value::True),
    ("#f", Value::False),
    ("#ignore", Value::Ignore),
    ("#inert", Value::Inert),
];

// === Layout ===

pub(super) fn skip(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.many(|p| p.first_of(&[comment_item, whitespace_item]))?;
    Ok(Capture::Unit)
}

fn comment_item(p: &mut Parser<'_, Kernel>) -> Step<()> {
    p.apply(Rule::Comment).map(|_| ())
}

fn whitespace_item(p: &mut Parser<'_, Kernel>) -> Step<()> {
    p.char_where(char::is_whitespace).map(|_| ())
}

/// `;` up to, not including, the end of the line
pub(super) fn comment(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.scan(|s| recognize((char(';'), take_till(|c: char| c == '\n'))).parse(s))?;
    Ok(Capture::Unit)
}

// === Symbols and constants ===

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_digit()
        || IDENTIFIER_PUNCTUATION.contains(c)
        || matches!(
            c.general_category_group(),
            GeneralCategoryGroup::Letter | GeneralCategoryGroup::Symbol
        )
}

pub(super) fn identifier(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    let name = p.scan(|s| take_while1(is_identifier_char).parse(s))?;
    Ok(Capture::Text(name.to_owned()))
}

pub(super) fn symbol(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    let name = p.apply_text(Rule::Identifier)?;
    Ok(Capture::Value(sym(&name)))
}

pub(super) fn constant(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    for (spelling, value) in CONSTANTS {
        if p.rest().starts_with(spelling) {
            p.literal(spelling)?;
            return Ok(Capture::Value(value));
        }
    }
    p.fail()
}

// === Numbers ===

type Recognized<'a> = IResult<&'a str, &'a str>;

fn signed_octal(s: &str) -> Recognized<'_> {
    recognize((opt(one_of("+-")), char('0'), one_of("oO"), oct_digit1)).parse(s)
}

fn signed_hex(s: &str) -> Recognized<'_> {
    recognize((opt(one_of("+-")), char('0'), one_of("xX"), hex_digit1)).parse(s)
}

fn float_with_exponent(s: &str) -> Recognized<'_> {
    recognize((
        opt(one_of("+-")),
        digit1,
        opt((char('.'), digit1)),
        one_of("eE"),
        opt(one_of("+-")),
        digit1,
    ))
    .parse(s)
}

fn plain_float(s: &str) -> Recognized<'_> {
    recognize((opt(one_of("+-")), digit1, char('.'), digit1)).parse(s)
}

fn decimal(s: &str) -> Recognized<'_> {
    recognize((opt(one_of("+-")), digit1)).parse(s)
}

/// Converts validated integer literal text. Out-of-range magnitudes become floats.
fn integer(text: &str, radix: u32) -> Number {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    // skip the 0x / 0o prefix
    let digits = if radix == 10 {
        unsigned
    } else {
        unsigned.get(2..).unwrap_or_default()
    };

    let signed = if negative {
        format!("-{digits}")
    } else {
        digits.to_owned()
    };
    if let Ok(n) = i64::from_str_radix(&signed, radix) {
        return Number::Integer(n);
    }

    let magnitude = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0f64, |acc, d| acc * f64::from(radix) + f64::from(d));
    Number::Float(if negative { -magnitude } else { magnitude })
}

/// Recognizers in the order they are tried, with the radix of the integer forms
const NUMBER_FORMS: [(fn(&str) -> Recognized<'_>, Option<u32>); 5] = [
    (signed_octal, Some(8)),
    (signed_hex, Some(16)),
    (float_with_exponent, None),
    (plain_float, None),
    (decimal, Some(10)),
];

pub(super) fn number(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    for (recognizer, radix) in NUMBER_FORMS {
        let start = p.pos();
        let text = match p.scan(recognizer) {
            Ok(text) => text,
            Err(Failure::Miss) => continue,
            Err(halt) => return Err(halt),
        };
        let number = match radix {
            Some(radix) => Some(integer(text, radix)),
            None => text.parse().ok().map(Number::Float),
        };
        match number {
            Some(number) => return Ok(Capture::Value(Value::Number(number))),
            None => p.restore(start),
        }
    }
    p.fail()
}

// === Strings ===

pub(super) fn string(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    p.sequence(|p| {
        p.literal("\"")?;
        let pieces = p.many(|p| p.first_of(&[escaped_piece, plain_piece]))?;
        p.literal("\"")?;
        Ok(Capture::Value(Value::String(pieces.concat())))
    })
}

fn escaped_piece(p: &mut Parser<'_, Kernel>) -> Step<String> {
    p.sequence(|p| {
        p.literal("\\")?;
        p.apply_text(Rule::Escape)
    })
}

fn plain_piece(p: &mut Parser<'_, Kernel>) -> Step<String> {
    p.apply_text(Rule::StrSeq)
}

/// A run of characters needing no decoding
pub(super) fn str_seq(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    let text = p.scan(|s| is_not("\\\"").parse(s))?;
    Ok(Capture::Text(text.to_owned()))
}

pub(super) fn escape(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    match p.apply(Rule::NumberEscapes) {
        Err(Failure::Miss) => p.apply(Rule::Escapes),
        done => done,
    }
}

/// Escape body as (radix, min digits, max digits), after an optional marker letter
const NUMERIC_ESCAPES: [(Option<&str>, [u32; 3]); 4] = [
    (Some("xX"), [16, 1, 5]),
    (None, [10, 1, 6]),
    (Some("oO"), [8, 1, 7]),
    (Some("uU"), [16, 4, 4]),
];

pub(super) fn number_escapes(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    for (marker, args) in NUMERIC_ESCAPES {
        let start = p.pos();
        match numeric_escape(p, marker, args) {
            Err(Failure::Miss) => p.restore(start),
            done => return done,
        }
    }
    p.fail()
}

fn numeric_escape(
    p: &mut Parser<'_, Kernel>,
    marker: Option<&str>,
    args: [u32; 3],
) -> Step<Capture> {
    if let Some(marker) = marker {
        p.char_where(|c| marker.contains(c))?;
    }
    let digits = p.apply_with(Rule::Digits, &args)?.into_text()?;
    // digits that name no Unicode scalar value fall through to the next alternative
    match u32::from_str_radix(&digits, args[0]).ok().and_then(char::from_u32) {
        Some(c) => Ok(Capture::Text(c.to_string())),
        None => p.fail(),
    }
}

/// `digits(radix, min, max)`
pub(super) fn digits(p: &mut Parser<'_, Kernel>, args: &[u32]) -> Step<Capture> {
    let &[radix @ 2..=36, min, max] = args else {
        return p.fail();
    };
    let start = p.pos();
    p.repeat_between(min as usize, max as usize, |p| {
        p.char_where(|c| c.is_digit(radix))
    })?;
    Ok(Capture::Text(p.text_since(start).to_owned()))
}

pub(super) fn escapes(p: &mut Parser<'_, Kernel>) -> Step<Capture> {
    for &(mnemonic, replacement) in NAMED_ESCAPES {
        if p.rest().starts_with(mnemonic) {
            p.literal(mnemonic)?;
            return Ok(Capture::Text(replacement.to_string()));
        }
    }
    // unknown escapes keep their backslash
    let c = p.any_char()?;
    Ok(Capture::Text(format!("\\{c}")))
}

//! This module defines the value tree produced by the reader. The main enum, [`Value`],
//! covers every datum the surface syntax can denote: numbers, strings, interned symbols,
//! pairs and the empty list, plus the four constant atoms `#t`, `#f`, `#ignore` and
//! `#inert`. Ergonomic helper functions such as [`val`], [`sym`], [`nil`], [`cons`] and
//! [`list`] are provided for building trees in code and tests, and conversion traits
//! from common Rust types make literal construction short. `Display` prints values back
//! in the surface syntax so that printed output reads back to an equal value; NaN is the
//! one float the reader cannot produce, and it prints as `NaN`, which reads as a symbol.

use std::fmt;
use std::mem;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

/// Process-wide symbol table. Parses only ever add to it.
static SYMBOLS: LazyLock<Mutex<StringInterner<DefaultBackend>>> =
    LazyLock::new(|| Mutex::new(StringInterner::new()));

/// An interned symbol name
///
/// Two symbols with the same name share one id, so comparison and hashing never
/// touch the string itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(DefaultSymbol);

impl Symbol {
    /// Intern `name` and return its symbol
    pub fn intern(name: &str) -> Self {
        let mut table = SYMBOLS.lock().unwrap_or_else(PoisonError::into_inner);
        Symbol(table.get_or_intern(name))
    }

    /// The symbol's name
    pub fn name(&self) -> String {
        let table = SYMBOLS.lock().unwrap_or_else(PoisonError::into_inner);
        table.resolve(self.0).map(str::to_owned).unwrap_or_default()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.name())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Numeric literal value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(n) => write!(f, "{n}"),
            // an overflowing literal is the only spelling that reads back as infinity
            Number::Float(x) if x.is_infinite() => {
                f.write_str(if x.is_sign_positive() { "1e999" } else { "-1e999" })
            }
            // Debug keeps the fractional part or exponent, so the text reads back as a float
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// A datum read from source text
///
/// Lists are chains of `Pair`s ending in `Null` (proper) or in any other value
/// (improper). Children are reference-counted and immutable, so cloning is cheap,
/// subtrees may be shared and a tree is always acyclic.
///
/// To build a tree, use the helper functions:
/// - `val(42)`, `val("text")`, `val(true)` for atoms
/// - `sym("name")` for symbols, `nil()` for the empty list
/// - `val([1, 2, 3])` or `list(vec![sym("f"), val(1)])` for proper lists
/// - `cons(sym("a"), sym("b"))` for a dotted pair
#[derive(Clone, PartialEq)]
pub enum Value {
    Number(Number),
    String(String),
    Symbol(Symbol),
    /// A cons cell: head and tail
    Pair(Arc<Value>, Arc<Value>),
    /// The empty list
    Null,
    /// `#t`
    True,
    /// `#f`
    False,
    /// `#ignore`
    Ignore,
    /// `#inert`
    Inert,
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(Number::Integer(n)) => write!(f, "Integer({n})"),
            Value::Number(Number::Float(x)) => write!(f, "Float({x:?})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Symbol(s) => write!(f, "{s:?}"),
            Value::Pair(head, tail) => write!(f, "Pair({head:?}, {tail:?})"),
            Value::Null => write!(f, "Null"),
            Value::True => write!(f, "True"),
            Value::False => write!(f, "False"),
            Value::Ignore => write!(f, "Ignore"),
            Value::Inert => write!(f, "Inert"),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b { Value::True } else { Value::False }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(Number::Float(x))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(Number::Integer(i64::from(n)))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        list(v)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        list(arr)
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(slice: &[T]) -> Self {
        list(slice.iter().cloned())
    }
}

/// Helper function for creating symbols
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(Symbol::intern(name.as_ref()))
}

/// Helper function for creating Values from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// The empty list
pub fn nil() -> Value {
    Value::Null
}

/// A single pair
pub fn cons(head: impl Into<Value>, tail: impl Into<Value>) -> Value {
    Value::Pair(Arc::new(head.into()), Arc::new(tail.into()))
}

/// A proper list of the given elements, folded right to left onto `Null`
pub fn list<I>(items: I) -> Value
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let items: Vec<Value> = items.into_iter().map(Into::into).collect();
    items
        .into_iter()
        .rev()
        .fold(Value::Null, |tail, head| cons(head, tail))
}

impl Value {
    /// Check if a value is the empty list
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Value::Pair(..))
    }

    /// Check if a value is one of the four constant atoms
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Value::True | Value::False | Value::Ignore | Value::Inert
        )
    }

    pub fn car(&self) -> Option<&Value> {
        match self {
            Value::Pair(head, _) => Some(head.as_ref()),
            _ => None,
        }
    }

    pub fn cdr(&self) -> Option<&Value> {
        match self {
            Value::Pair(_, tail) => Some(tail.as_ref()),
            _ => None,
        }
    }

    /// Iterate over the heads of a pair chain. Stops at the first non-pair tail.
    pub fn iter(&self) -> ListIter<'_> {
        ListIter { current: self }
    }

    /// The final non-pair tail of a chain: `Null` for proper lists
    pub fn last_tail(&self) -> &Value {
        let mut current = self;
        while let Value::Pair(_, tail) = current {
            current = tail.as_ref();
        }
        current
    }

    /// Check if the value is `Null` or a chain of pairs ending in `Null`
    pub fn is_proper_list(&self) -> bool {
        self.last_tail().is_null()
    }

    /// Number of elements of a proper list
    pub fn list_len(&self) -> Option<usize> {
        self.is_proper_list().then(|| self.iter().count())
    }

    /// Elements of a proper list, cloned
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        self.is_proper_list().then(|| self.iter().cloned().collect())
    }

    /// Replace the terminating `Null` of a proper chain with `tail`.
    ///
    /// `(a b)` spliced with `c` gives `(a b . c)`. A chain that is already improper
    /// cannot take another tail and is nested instead: `Pair(chain, tail)`.
    pub fn splice_tail(self, tail: Value) -> Value {
        if !self.is_proper_list() {
            return cons(self, tail);
        }
        let items: Vec<Value> = self.iter().cloned().collect();
        items
            .into_iter()
            .rev()
            .fold(tail, |rest, head| cons(head, rest))
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

/// Unlinks pair chains iteratively. The derived drop would recurse once per list
/// element and overflow the stack on long lists.
impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        take_unshared_children(self, &mut pending);
        while let Some(mut value) = pending.pop() {
            take_unshared_children(&mut value, &mut pending);
        }
    }
}

/// Move the children of a pair out of their `Arc`s when this pair is their only
/// owner, leaving `Null` behind
fn take_unshared_children(value: &mut Value, pending: &mut Vec<Value>) {
    if let Value::Pair(head, tail) = value {
        for child in [head, tail] {
            if let Some(inner) = Arc::get_mut(child)
                && inner.is_pair()
            {
                pending.push(mem::take(inner));
            }
        }
    }
}

/// Iterator over the elements of a pair chain
pub struct ListIter<'a> {
    current: &'a Value,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self.current {
            Value::Pair(head, tail) => {
                self.current = tail.as_ref();
                Some(head.as_ref())
            }
            _ => None,
        }
    }
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            // fixed-width form so a following hex digit is not absorbed on re-read
            c if c.is_control() => write!(f, "\\u{:04X}", u32::from(c))?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write_string_literal(f, s),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Pair(..) => {
                write!(f, "(")?;
                let mut current = self;
                let mut first = true;
                loop {
                    match current {
                        Value::Pair(head, tail) => {
                            if !first {
                                write!(f, " ")?;
                            }
                            write!(f, "{head}")?;
                            first = false;
                            current = tail.as_ref();
                        }
                        Value::Null => break,
                        other => {
                            write!(f, " . {other}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Null => write!(f, "()"),
            Value::True => write!(f, "#t"),
            Value::False => write!(f, "#f"),
            Value::Ignore => write!(f, "#ignore"),
            Value::Inert => write!(f, "#inert"),
        }
    }
}

#[cfg(test)]
mod helper_function_tests {
    use super::*;

    #[test]
    fn test_helper_functions_data_driven() {
        // (helper_result, expected_value)
        let test_cases = vec![
            (val(42), Value::Number(Number::Integer(42))),
            (val(-17), Value::Number(Number::Integer(-17))),
            (val(255u8), Value::Number(Number::Integer(255))),
            (val(-128i8), Value::Number(Number::Integer(-128))),
            (val(4294967295u32), Value::Number(Number::Integer(4294967295))),
            (val(i64::MIN), Value::Number(Number::Integer(i64::MIN))),
            (val(2.5), Value::Number(Number::Float(2.5))),
            (val(true), Value::True),
            (val(false), Value::False),
            (val("hello"), Value::String("hello".to_owned())),
            (val(String::new()), Value::String(String::new())),
            (sym("foo-bar?"), Value::Symbol(Symbol::intern("foo-bar?"))),
            (nil(), Value::Null),
            (
                val([1, 2]),
                Value::Pair(
                    Arc::new(val(1)),
                    Arc::new(Value::Pair(Arc::new(val(2)), Arc::new(Value::Null))),
                ),
            ),
            (
                cons(sym("a"), sym("b")),
                Value::Pair(Arc::new(sym("a")), Arc::new(sym("b"))),
            ),
            (list(Vec::<Value>::new()), Value::Null),
            (
                val(vec![sym("op"), val(1)]),
                cons(sym("op"), cons(1, nil())),
            ),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert_eq!(actual, expected, "Test case {} failed", i + 1);
        }
    }

    #[test]
    fn test_symbols_are_interned() {
        let a = Symbol::intern("interned-name");
        let b = Symbol::intern("interned-name");
        let c = Symbol::intern("other-name");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.name(), "interned-name");
        assert_eq!(format!("{c}"), "other-name");
    }

    #[test]
    fn test_display_round_trippable_forms() {
        let test_cases = vec![
            (val(42), "42"),
            (val(-7), "-7"),
            (val(1000.0), "1000.0"),
            (val(3.25), "3.25"),
            (val("a\"b\\c\n"), r#""a\"b\\c\n""#),
            (val("\u{1b}x"), r#""\u001Bx""#),
            (sym("hello"), "hello"),
            (nil(), "()"),
            (val([1, 2, 3]), "(1 2 3)"),
            (cons(sym("a"), sym("b")), "(a . b)"),
            (cons(sym("a"), cons(sym("b"), sym("c"))), "(a b . c)"),
            (val([val([1]), nil()]), "((1) ())"),
            (val(true), "#t"),
            (val(false), "#f"),
            (Value::Ignore, "#ignore"),
            (Value::Inert, "#inert"),
        ];

        for (value, expected) in test_cases {
            assert_eq!(format!("{value}"), expected);
        }
    }

    #[test]
    fn test_list_helpers() {
        let proper = val([1, 2, 3]);
        assert!(proper.is_proper_list());
        assert_eq!(proper.list_len(), Some(3));
        assert_eq!(proper.to_vec(), Some(vec![val(1), val(2), val(3)]));
        assert_eq!(proper.car(), Some(&val(1)));
        assert_eq!(proper.cdr(), Some(&val([2, 3])));

        let improper = cons(1, cons(2, 3));
        assert!(!improper.is_proper_list());
        assert_eq!(improper.list_len(), None);
        assert_eq!(improper.iter().count(), 2);
        assert_eq!(improper.last_tail(), &val(3));

        assert!(nil().is_proper_list());
        assert_eq!(nil().list_len(), Some(0));
        assert!(Value::Ignore.is_constant());
        assert!(!sym("x").is_constant());
    }

    #[test]
    fn test_splice_tail() {
        assert_eq!(
            val([sym("a"), sym("b")]).splice_tail(sym("c")),
            cons(sym("a"), cons(sym("b"), sym("c")))
        );
        assert_eq!(nil().splice_tail(sym("c")), sym("c"));
        // already improper: nested rather than spliced
        assert_eq!(
            cons(sym("a"), sym("b")).splice_tail(sym("c")),
            cons(cons(sym("a"), sym("b")), sym("c"))
        );
    }

    #[test]
    fn test_infinities_print_as_overflowing_literals() {
        assert_eq!(val(f64::INFINITY).to_string(), "1e999");
        assert_eq!(val(f64::NEG_INFINITY).to_string(), "-1e999");
        assert_eq!(val([f64::INFINITY]).to_string(), "(1e999)");
    }

    #[test]
    fn test_long_chains_clone_and_drop_iteratively() {
        let long = list((0..200_000).map(Value::from));
        let shared = long.clone();
        drop(long);
        assert_eq!(shared.list_len(), Some(200_000));
        drop(shared);

        let nested = (0..100_000).fold(nil(), |inner, _| val([inner]));
        assert!(nested.is_pair());
        drop(nested);
    }
}

#![expect(clippy::unwrap_used)] // test code OK

use proptest::prelude::*;

use hummus::ast::{cons, list, sym};
use hummus::{Number, Value, parse_all, parse_rule};

const MAX_DEPTH: u32 = 4;
const MAX_LIST_LEN: usize = 4;
const MAX_STRING_LEN: usize = 24;
const MAX_IDENT_LEN: usize = 10;

/// Names that cannot be mistaken for numbers or constants
fn symbol_strategy() -> impl Strategy<Value = Value> {
    let rest_char = prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('0', '9'),
        Just('-'),
        Just('?'),
        Just('!'),
        Just('λ'),
    ];
    (
        prop::char::range('a', 'z'),
        prop::collection::vec(rest_char, 0..=MAX_IDENT_LEN),
    )
        .prop_map(|(first, rest)| {
            let mut name = String::new();
            name.push(first);
            name.extend(rest);
            sym(name)
        })
}

fn string_strategy() -> impl Strategy<Value = Value> {
    let ch = prop_oneof![
        4 => prop::char::range('a', 'z'),
        1 => Just(' '),
        1 => Just('"'),
        1 => Just('\\'),
        1 => Just('\n'),
        1 => Just('\t'),
        1 => Just('\u{7}'),
        1 => Just('é'),
    ];
    prop::collection::vec(ch, 0..=MAX_STRING_LEN)
        .prop_map(|chars| Value::String(chars.into_iter().collect()))
}

fn number_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| Value::Number(Number::Integer(n))),
        // quarters print exactly and never in exponent form
        (-4000i32..4000).prop_map(|n| Value::Number(Number::Float(f64::from(n) / 4.0))),
    ]
}

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        number_strategy(),
        string_strategy(),
        symbol_strategy(),
        Just(Value::True),
        Just(Value::False),
        Just(Value::Ignore),
        Just(Value::Inert),
        Just(Value::Null),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(MAX_DEPTH, 48, MAX_LIST_LEN as u32, |inner| {
        let proper = prop::collection::vec(inner.clone(), 1..=MAX_LIST_LEN).prop_map(list);
        let dotted = (
            prop::collection::vec(inner.clone(), 1..=MAX_LIST_LEN),
            leaf_strategy().prop_filter("dotted tail is an atom", |tail| !tail.is_null()),
        )
            .prop_map(|(items, tail)| {
                items
                    .into_iter()
                    .rev()
                    .fold(tail, |rest, item| cons(item, rest))
            });
        prop_oneof![proper, dotted]
    })
}

/// Comments and whitespace that may separate tokens
fn layout_strategy() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        Just(" ".to_owned()),
        Just("\n".to_owned()),
        Just("\t".to_owned()),
        Just("; note\n".to_owned()),
    ];
    prop::collection::vec(piece, 1..=3).prop_map(|pieces| pieces.concat())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn printed_values_read_back(value in value_strategy()) {
        let printed = value.to_string();
        let read = parse_rule(&printed, "expression").unwrap();
        prop_assert_eq!(read, value);
    }

    #[test]
    fn programs_read_in_order(
        values in prop::collection::vec(value_strategy(), 1..=5),
        layout in layout_strategy(),
    ) {
        let program = values
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(&layout);
        let read = parse_all(&format!("{layout}{program}{layout}")).unwrap();
        prop_assert_eq!(read, list(values));
    }
}

//! Proptest strategies for payload-shaped JSON.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Arbitrary JSON values up to a modest depth, keys drawn from a small
/// identifier alphabet so object collisions and re-orderings actually
/// happen under shrinking.
pub fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-z0-9 ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6).prop_map(|m| {
                Value::Object(m.into_iter().collect::<Map<String, Value>>())
            }),
        ]
    })
}

use serde_json::Value as JsonValue;
use std::cmp::Ordering;

use super::{CompareOp, Filter};
use crate::core::Value;

impl Filter {
    /// Evaluates the filter against the JSON image of a document.
    ///
    /// Missing fields read as `null`. On array fields, `Eq` and `In` match
    /// when any element matches. Range operators never match `null` or
    /// values of incomparable types.
    pub fn matches(&self, document: &JsonValue) -> bool {
        match self {
            Filter::All => true,
            Filter::Compare { field, op, value } => {
                let target = lookup(document, field);
                match op {
                    CompareOp::Eq => field_equals(target, value),
                    CompareOp::Ne => !field_equals(target, value),
                    CompareOp::Gt => field_ordering(target, value, |o| o == Ordering::Greater),
                    CompareOp::Gte => field_ordering(target, value, |o| o != Ordering::Less),
                    CompareOp::Lt => field_ordering(target, value, |o| o == Ordering::Less),
                    CompareOp::Lte => field_ordering(target, value, |o| o != Ordering::Greater),
                }
            }
            Filter::In { field, values } => {
                let target = lookup(document, field);
                values.iter().any(|value| field_equals(target, value))
            }
            Filter::Exists { field, exists } => lookup(document, field).is_some() == *exists,
            Filter::And(parts) => parts.iter().all(|part| part.matches(document)),
            Filter::Or(parts) => parts.iter().any(|part| part.matches(document)),
            Filter::Not(inner) => !inner.matches(document),
        }
    }
}

fn lookup<'a>(document: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(document, |current, segment| match current {
            JsonValue::Object(map) => map.get(segment),
            JsonValue::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx)),
            _ => None,
        })
}

fn field_equals(target: Option<&JsonValue>, expected: &Value) -> bool {
    match target {
        None => expected.is_null(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .any(|item| Value::from_json(item).is_some_and(|v| v == *expected)),
        Some(json) => Value::from_json(json).is_some_and(|v| v == *expected),
    }
}

fn field_ordering(
    target: Option<&JsonValue>,
    expected: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    target
        .and_then(Value::from_json)
        .and_then(|actual| actual.compare(expected))
        .is_some_and(accept)
}

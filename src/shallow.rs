//! Single-level structural equality.
//!
//! [`shallow`] compares two values one level deep: children are compared
//! by identity ([`Value::is`]), never recursively. It is the usual
//! `equality_fn` for selector subscriptions whose selector builds a new
//! record or sequence on every call.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::value::{Key, Value};

/// How a structured value takes part in a shallow comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparableShape {
    /// Plain key-value record.
    Record,
    /// Ordered sequence.
    Sequence,
    /// Map or set. A set is a mapping from each member to itself.
    AssociativeCollection,
}

impl ComparableShape {
    /// Shape of a value, or `None` for scalars.
    pub fn of(value: &Value) -> Option<ComparableShape> {
        match value {
            Value::Record(_) => Some(ComparableShape::Record),
            Value::Sequence(_) => Some(ComparableShape::Sequence),
            Value::Map(_) | Value::Set(_) => Some(ComparableShape::AssociativeCollection),
            _ => None,
        }
    }
}

/// Shallow equality of two values.
pub fn shallow(a: &Value, b: &Value) -> bool {
    if a.is(b) {
        return true;
    }

    let (Some(shape_a), Some(shape_b)) = (ComparableShape::of(a), ComparableShape::of(b)) else {
        return false;
    };

    match (shape_a, shape_b) {
        (ComparableShape::Record, _) | (_, ComparableShape::Record) => compare_entries(a, b),
        (ComparableShape::AssociativeCollection, ComparableShape::AssociativeCollection) => {
            compare_entries(a, b)
        }
        _ => compare_ordered(a, b),
    }
}

fn entries(value: &Value) -> BTreeMap<Key, Value> {
    match value {
        Value::Map(m) => m.as_ref().clone(),
        Value::Set(s) => s.iter().map(|k| (k.clone(), k.to_value())).collect(),
        other => other
            .own_entries()
            .into_iter()
            .map(|(k, v)| (Key::from(k), v))
            .collect(),
    }
}

fn compare_entries(a: &Value, b: &Value) -> bool {
    let entries_a = entries(a);
    let entries_b = entries(b);

    if entries_a.len() != entries_b.len() {
        return false;
    }

    entries_a.iter().all(|(key, value)| {
        entries_b
            .get(key)
            .is_some_and(|other| value.is(other))
    })
}

fn ordered_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Sequence(items) => items.as_ref().clone(),
        Value::Set(members) => members.iter().map(Key::to_value).collect(),
        // Iterating a map yields freshly built pairs, which are never
        // identical to anything on the other side.
        Value::Map(m) => m
            .iter()
            .map(|(k, v)| Value::sequence([k.to_value(), v.clone()]))
            .collect(),
        _ => Vec::new(),
    }
}

fn compare_ordered(a: &Value, b: &Value) -> bool {
    let items_a = ordered_items(a);
    let items_b = ordered_items(b);

    items_a.len() == items_b.len() && items_a.iter().zip(&items_b).all(|(x, y)| x.is(y))
}

/// Memoizes a selector so it keeps returning the previous result while
/// each new result is shallow-equal to it.
///
/// Selectors that build a fresh record on every call would otherwise
/// defeat identity-based change detection.
pub struct ShallowMemo<F> {
    selector: F,
    previous: Mutex<Option<Value>>,
}

impl<F> ShallowMemo<F>
where
    F: Fn(&Value) -> Value,
{
    pub fn new(selector: F) -> Self {
        Self {
            selector,
            previous: Mutex::new(None),
        }
    }

    /// Run the selector against `state`.
    pub fn select(&self, state: &Value) -> Value {
        let next = (self.selector)(state);
        let mut previous = self.previous.lock();
        match previous.as_ref() {
            Some(prev) if shallow(prev, &next) => prev.clone(),
            _ => {
                *previous = Some(next.clone());
                next
            }
        }
    }
}

/// Wrap `selector` in a [`ShallowMemo`], returning it as a plain closure.
pub fn use_shallow<F>(selector: F) -> impl Fn(&Value) -> Value + Send + Sync + 'static
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    let memo = ShallowMemo::new(selector);
    move |state: &Value| memo.select(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_values() {
        let v = Value::record([("a", 1)]);
        assert!(shallow(&v, &v.clone()));
        assert!(shallow(&Value::from(1), &Value::from(1)));
        assert!(shallow(&Value::Null, &Value::Null));
    }

    #[test]
    fn test_scalars_are_not_structurally_compared() {
        assert!(!shallow(&Value::from(1), &Value::from(2)));
        assert!(!shallow(&Value::from("a"), &Value::empty_record()));
        assert!(!shallow(&Value::Null, &Value::empty_record()));
    }

    #[test]
    fn test_records() {
        let a = Value::record([("a", 1), ("b", 2)]);
        let b = Value::record([("a", 1), ("b", 2)]);
        let c = Value::record([("a", 1), ("b", 3)]);
        let d = Value::record([("a", 1)]);

        assert!(shallow(&a, &b));
        assert!(!shallow(&a, &c));
        assert!(!shallow(&a, &d));
    }

    #[test]
    fn test_nested_values_compare_by_identity() {
        let inner = Value::record([("x", 1)]);
        let a = Value::record([("inner", inner.clone())]);
        let b = Value::record([("inner", inner)]);
        let c = Value::record([("inner", Value::record([("x", 1)]))]);

        assert!(shallow(&a, &b));
        assert!(!shallow(&a, &c));
    }

    #[test]
    fn test_sequences_are_order_sensitive() {
        assert!(shallow(&Value::sequence([1, 2, 3]), &Value::sequence([1, 2, 3])));
        assert!(!shallow(&Value::sequence([1, 2]), &Value::sequence([2, 1])));
        assert!(!shallow(&Value::sequence([1, 2]), &Value::sequence([1, 2, 3])));
    }

    #[test]
    fn test_maps() {
        assert!(shallow(&Value::map([("x", 1)]), &Value::map([("x", 1)])));
        assert!(!shallow(&Value::map([("x", 1)]), &Value::map([("x", 2)])));
        assert!(!shallow(&Value::map([("x", 1)]), &Value::map([("y", 1)])));
    }

    #[test]
    fn test_sets() {
        assert!(shallow(&Value::set([1, 2]), &Value::set([2, 1])));
        assert!(!shallow(&Value::set([1, 2]), &Value::set([1, 3])));
    }

    #[test]
    fn test_record_against_map_uses_entries() {
        assert!(shallow(&Value::record([("x", 1)]), &Value::map([("x", 1)])));
        assert!(shallow(&Value::record([("0", "a")]), &Value::sequence(["a"])));
    }

    #[test]
    fn test_sequence_against_map_never_matches_pairs() {
        let pair = Value::sequence([Value::from("x"), Value::from(1)]);
        assert!(!shallow(&Value::sequence([pair]), &Value::map([("x", 1)])));
        assert!(shallow(
            &Value::sequence(Vec::<Value>::new()),
            &Value::map(Vec::<(Key, Value)>::new())
        ));
    }

    #[test]
    fn test_shape_dispatch() {
        assert_eq!(ComparableShape::of(&Value::empty_record()), Some(ComparableShape::Record));
        assert_eq!(
            ComparableShape::of(&Value::set([1])),
            Some(ComparableShape::AssociativeCollection)
        );
        assert_eq!(ComparableShape::of(&Value::from("s")), None);
    }

    #[test]
    fn test_use_shallow_keeps_previous_result() {
        let select = use_shallow(|state: &Value| {
            Value::record([
                ("a", state.get("a").cloned().unwrap_or_default()),
                ("b", state.get("b").cloned().unwrap_or_default()),
            ])
        });

        let state = Value::record([("a", 1), ("b", 2), ("c", 3)]);
        let first = select(&state);
        let second = select(&Value::record([("a", 1), ("b", 2), ("c", 4)]));
        assert!(first.is(&second));

        let third = select(&Value::record([("a", 5), ("b", 2)]));
        assert!(!third.is(&first));
        assert_eq!(third.get("a"), Some(&Value::from(5)));
    }
}

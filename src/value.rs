//! Dynamically-shaped state values.
//!
//! A store holds one [`Value`]: a tree of scalars and structured nodes.
//! Structured nodes sit behind an `Arc`, so cloning a value is cheap and
//! two values can be compared by reference with [`Value::is`]. Mutation
//! goes through `Arc::make_mut`, which copies only the nodes on the path
//! being written; untouched children keep their identity.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Plain key-value record, the most common state shape.
pub type Record = BTreeMap<String, Value>;

/// Largest integer magnitude that round-trips through an `f64` unchanged.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Key of an associative collection ([`Value::Map`] or [`Value::Set`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
}

impl Key {
    /// Convert a scalar value into a key. Fractional numbers and
    /// structured values have no key form.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                Some(Key::Int(*n as i64))
            }
            Value::String(s) => Some(Key::Str(s.clone())),
            _ => None,
        }
    }

    /// The key as a state value.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Number(*i as f64),
            Key::Str(s) => Value::String(s.clone()),
        }
    }

    /// The key as a record property name.
    pub fn to_property(&self) -> String {
        match self {
            Key::Bool(b) => b.to_string(),
            Key::Int(i) => i.to_string(),
            Key::Str(s) => s.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_property())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Arc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(Arc::from(s))
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i as i64)
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

/// A state value.
///
/// `PartialEq` is deep structural equality. Reference identity, which is
/// what the store uses to decide whether anything changed, is [`Value::is`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Record(Arc<Record>),
    Sequence(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<Key, Value>>),
    Set(Arc<BTreeSet<Key>>),
}

impl Value {
    /// Build a record from key/value pairs.
    pub fn record<I, K, V>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Record(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// An empty record.
    pub fn empty_record() -> Value {
        Value::Record(Arc::new(Record::new()))
    }

    /// Build an ordered sequence.
    pub fn sequence<I, V>(items: I) -> Value
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Sequence(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Build an associative map.
    pub fn map<I, K, V>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        Value::Map(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Build a set of keys.
    pub fn set<I, K>(members: I) -> Value
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Value::Set(Arc::new(members.into_iter().map(Into::into).collect()))
    }

    /// Reference identity, with `Object.is` semantics for scalars.
    ///
    /// Structured values are identical only when they share the same
    /// allocation. `NaN` is identical to `NaN`; `0.0` is not `-0.0`.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            (Value::Sequence(a), Value::Sequence(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for records, sequences, maps and sets.
    pub fn is_object_like(&self) -> bool {
        matches!(
            self,
            Value::Record(_) | Value::Sequence(_) | Value::Map(_) | Value::Set(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The number as an integer, if it has no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                Some(*n as i64)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Key, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<Key>> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Read a record field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_record().and_then(|r| r.get(key))
    }

    /// Mutable access to the record, copying it first if it is shared.
    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(r) => Some(Arc::make_mut(r)),
            _ => None,
        }
    }

    /// Mutable access to the sequence, copying it first if it is shared.
    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Sequence(s) => Some(Arc::make_mut(s)),
            _ => None,
        }
    }

    /// Mutable access to a record field.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.as_record_mut().and_then(|r| r.get_mut(key))
    }

    /// Insert a record field, returning the previous value.
    ///
    /// A value that is not a record is replaced by an empty record first.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        if !matches!(self, Value::Record(_)) {
            *self = Value::empty_record();
        }
        self.as_record_mut()
            .and_then(|r| r.insert(key.into(), value.into()))
    }

    /// Remove a record field.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.as_record_mut().and_then(|r| r.remove(key))
    }

    /// Append to a sequence. A value that is not a sequence is replaced
    /// by an empty sequence first.
    pub fn push(&mut self, value: impl Into<Value>) {
        if !matches!(self, Value::Sequence(_)) {
            *self = Value::Sequence(Arc::new(Vec::new()));
        }
        if let Some(items) = self.as_sequence_mut() {
            items.push(value.into());
        }
    }

    /// Number of children of a structured value; zero for scalars.
    pub fn len(&self) -> usize {
        match self {
            Value::Record(r) => r.len(),
            Value::Sequence(s) => s.len(),
            Value::Map(m) => m.len(),
            Value::Set(s) => s.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerable own properties, as `Object.assign` would copy them.
    ///
    /// Records yield their fields and sequences their stringified indices.
    /// Every other value has no own properties.
    pub fn own_entries(&self) -> Vec<(String, Value)> {
        match self {
            Value::Record(r) => r.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Value::Sequence(s) => s
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// A fresh record holding the own entries of `target` overlaid by
    /// those of `source`.
    pub fn assign(target: &Value, source: &Value) -> Value {
        let mut merged = Record::new();
        merged.extend(target.own_entries());
        merged.extend(source.own_entries());
        Value::Record(Arc::new(merged))
    }

    /// Convert into a `serde_json::Value`.
    ///
    /// Maps become objects with stringified keys and sets become arrays.
    /// Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Record(r) => serde_json::Value::Object(
                r.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Sequence(s) => serde_json::Value::Array(s.iter().map(Value::to_json).collect()),
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.to_property(), v.to_json())).collect(),
            ),
            Value::Set(s) => {
                serde_json::Value::Array(s.iter().map(|k| k.to_value().to_json()).collect())
            }
        }
    }
}

fn is_whole(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER
}

fn number_to_json(n: f64) -> serde_json::Value {
    if is_whole(n) {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(Arc::from(s)),
            serde_json::Value::Array(items) => {
                Value::Sequence(Arc::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(fields) => Value::Record(Arc::new(
                fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(Arc::new(items))
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(Arc::new(record))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if is_whole(*n) => serializer.serialize_i64(*n as i64),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Record(r) => {
                let mut map = serializer.serialize_map(Some(r.len()))?;
                for (k, v) in r.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m.iter() {
                    map.serialize_entry(&k.to_property(), v)?;
                }
                map.end()
            }
            Value::Set(members) => {
                let mut seq = serializer.serialize_seq(Some(members.len()))?;
                for member in members.iter() {
                    seq.serialize_element(&member.to_value())?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

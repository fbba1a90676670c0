//! Typed values held in a session's state record.
//!
//! The on-disk shape is plain JSON. `StateValue` restricts it to the shapes
//! guards actually store: strings, numbers, booleans, lists and nested maps.
//! JSON `null` has no representation; nulls found on disk are dropped while
//! loading rather than rejecting the whole record.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::BTreeMap;

/// A single value stored under a state key.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    String(String),
    Number(Number),
    Bool(bool),
    List(Vec<StateValue>),
    Map(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Converts a JSON value, returning `None` for `null`.
    pub fn from_json(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(Self::Bool(b)),
            JsonValue::Number(n) => Some(Self::Number(n)),
            JsonValue::String(s) => Some(Self::String(s)),
            JsonValue::Array(items) => Some(Self::List(
                items.into_iter().filter_map(Self::from_json).collect(),
            )),
            JsonValue::Object(map) => Some(Self::Map(map_from_json(map))),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Number(n) => JsonValue::Number(n.clone()),
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, JsonValue>>(),
            ),
        }
    }

    pub fn empty_map() -> Self {
        Self::Map(BTreeMap::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<StateValue>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, StateValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, StateValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Builds a number from an `f64`; non-finite input becomes `0`.
    pub fn from_f64(value: f64) -> Self {
        Self::Number(Number::from_f64(value).unwrap_or_else(|| Number::from(0)))
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl<T: Into<StateValue>> From<Vec<T>> for StateValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(deserializer)?;
        Self::from_json(raw).ok_or_else(|| D::Error::custom("null is not a state value"))
    }
}

fn map_from_json(map: Map<String, JsonValue>) -> BTreeMap<String, StateValue> {
    map.into_iter()
        .filter_map(|(k, v)| StateValue::from_json(v).map(|v| (k, v)))
        .collect()
}

/// The full persisted record for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateRecord {
    entries: BTreeMap<String, StateValue>,
}

impl StateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StateValue> {
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StateValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the map stored at `key`, replacing any non-map value with an
    /// empty map first.
    pub fn map_entry(&mut self, key: &str) -> &mut BTreeMap<String, StateValue> {
        let slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(StateValue::empty_map);
        if !matches!(slot, StateValue::Map(_)) {
            *slot = StateValue::empty_map();
        }
        match slot {
            StateValue::Map(map) => map,
            _ => unreachable!("slot was just normalized to a map"),
        }
    }

    /// Returns the list stored at `key`, replacing any non-list value with an
    /// empty list first.
    pub fn list_entry(&mut self, key: &str) -> &mut Vec<StateValue> {
        let slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StateValue::List(Vec::new()));
        if !matches!(slot, StateValue::List(_)) {
            *slot = StateValue::List(Vec::new());
        }
        match slot {
            StateValue::List(items) => items,
            _ => unreachable!("slot was just normalized to a list"),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl Serialize for StateRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StateRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, JsonValue>::deserialize(deserializer)?;
        Ok(Self {
            entries: map_from_json(raw),
        })
    }
}

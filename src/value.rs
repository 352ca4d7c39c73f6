// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Plain values, variant tags and keys.
//!
//! A [`Value`] is what a node (or a whole tree) represents when projected back out of the tree.
//! It is also what callers hand in when they build or mutate a tree. Unlike JSON, a [`Value`]
//! can be [`Value::Absent`], which models an unset slot in a sparse array.
use crate::error::{Error, Result};
use std::{collections::BTreeMap, fmt};

/// The type tag of a node or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub enum Variant {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Absent,
}

impl Variant {
    /// Containers own children; every other variant is a scalar.
    pub fn is_container(self) -> bool {
        matches!(self, Variant::Array | Variant::Object)
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Null => "null",
            Variant::Boolean => "boolean",
            Variant::Number => "number",
            Variant::String => "string",
            Variant::Array => "array",
            Variant::Object => "object",
            Variant::Absent => "absent",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A plain, owned JSON-like value.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Deserialize, ::serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// An unset array slot.
    Absent,
}

/// Where a value is about to be stored; decides whether [`Value::Absent`] is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    Root,
    Element,
    Property,
}

impl Value {
    pub fn variant(&self) -> Variant {
        match self {
            Value::Null => Variant::Null,
            Value::Bool(_) => Variant::Boolean,
            Value::Number(_) => Variant::Number,
            Value::String(_) => Variant::String,
            Value::Array(_) => Variant::Array,
            Value::Object(_) => Variant::Object,
            Value::Absent => Variant::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Checks that the value can be conjured at `position`.
    ///
    /// Absent object properties are not an error: they are skipped when the object is
    /// conjured, the same way `set` ignores them.
    pub(crate) fn validate(&self, position: Position) -> Result<()> {
        match self {
            Value::Number(n) if !n.is_finite() => {
                Err(Error::InvalidValueType(format!("non-finite number {n}")))
            }
            Value::Absent if position == Position::Root => Err(Error::InvalidElementType),
            Value::Array(items) => items
                .iter()
                .try_for_each(|item| item.validate(Position::Element)),
            Value::Object(props) => props
                .values()
                .filter(|v| !v.is_absent())
                .try_for_each(|v| v.validate(Position::Property)),
            _ => Ok(()),
        }
    }

    /// Drops absent object properties, recursively.
    ///
    /// Conjuring a value and projecting it back yields the normalized value.
    pub fn normalized(self) -> Value {
        match self {
            Value::Array(items) => Value::Array(items.into_iter().map(Value::normalized).collect()),
            Value::Object(props) => Value::Object(
                props
                    .into_iter()
                    .filter(|(_, v)| !v.is_absent())
                    .map(|(k, v)| (k, v.normalized()))
                    .collect(),
            ),
            other => other,
        }
    }
}

macro_rules! impl_from_number {
    ($($t:ty),+) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(n as f64)
            }
        })+
    };
}
impl_from_number!(f64, f32, i64, i32, u64, u32, usize);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(props: BTreeMap<String, Value>) -> Self {
        Value::Object(props)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// The key under which a child is reachable from its parent.
///
/// Array elements are keyed by [`Key::Index`], object properties by [`Key::Name`]. Keys that
/// arrive over the wire as names are interpreted as indices when they address an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Deserialize, ::serde::Serialize),
    serde(untagged)
)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl Key {
    /// The array index this key addresses, if any.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(s) => s.parse().ok(),
        }
    }

    /// The object property this key addresses.
    pub fn to_name(&self) -> String {
        match self {
            Key::Index(i) => i.to_string(),
            Key::Name(s) => s.clone(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(s) => f.write_str(s),
        }
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Name(s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn validate_rejects_non_finite_numbers() {
        let err = Value::Number(f64::NAN).validate(Position::Root).unwrap_err();
        assert!(matches!(err, Error::InvalidValueType(_)));
        let nested = value!([1, { "x": (f64::INFINITY) }]);
        assert!(nested.validate(Position::Root).is_err());
    }

    #[test]
    fn absent_only_allowed_in_arrays() {
        assert_eq!(
            Value::Absent.validate(Position::Root),
            Err(Error::InvalidElementType)
        );
        assert_eq!(Value::Absent.validate(Position::Element), Ok(()));
        assert_eq!(value!([1, (Value::Absent), 3]).validate(Position::Root), Ok(()));
        // absent properties are skipped rather than rejected
        assert_eq!(
            value!({ "a": (Value::Absent) }).validate(Position::Root),
            Ok(())
        );
    }

    #[test]
    fn normalized_drops_absent_properties_only() {
        let v = value!({ "a": (Value::Absent), "b": [(Value::Absent), 1] });
        assert_eq!(v.normalized(), value!({ "b": [(Value::Absent), 1] }));
    }

    #[test]
    fn keys_parse_as_indices() {
        assert_eq!(Key::from("3").as_index(), Some(3));
        assert_eq!(Key::from("x").as_index(), None);
        assert_eq!(Key::Index(7).to_name(), "7");
        assert_eq!(Key::Index(7).to_string(), "7");
    }
}

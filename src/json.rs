// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! JSON representation
//!
//! Any [`serde_json::Value`] converts into a [`Value`](crate::Value), so a tree can be built
//! straight from parsed JSON:
//!
//! ```rust
//! # use tomes::Tree;
//! let tree = Tree::new(serde_json::json!({ "name": "John Doe", "age": 43 }))?;
//! assert_eq!(tree.to_json(tree.root())?["age"], 43);
//! # Ok::<(), tomes::Error>(())
//! ```
//!
//! JSON has no notion of an absent value. When projecting back into JSON, absent array
//! elements become `null`, and absent object properties (which a tree never stores) are left
//! out. Numbers without a fractional part are rendered as JSON integers.
use crate::{NodeId, Tree, error::Result};
use serde_json::Value;

/// Converts a [`serde_json::Value`] to a [`crate::Value`].
impl From<Value> for crate::Value {
    fn from(val: Value) -> Self {
        match val {
            Value::Null => crate::Value::Null,
            Value::Bool(b) => crate::Value::Bool(b),
            Value::Number(n) => n.as_f64().map_or(crate::Value::Null, crate::Value::Number),
            Value::String(s) => crate::Value::String(s),
            Value::Array(items) => crate::Value::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(props) => crate::Value::Object(
                props
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

/// Converts a [`crate::Value`] to a [`serde_json::Value`].
impl From<crate::Value> for Value {
    fn from(val: crate::Value) -> Self {
        match val {
            crate::Value::Null | crate::Value::Absent => Value::Null,
            crate::Value::Bool(b) => b.into(),
            crate::Value::Number(n) => number_to_json(n),
            crate::Value::String(s) => s.into(),
            crate::Value::Array(items) => Value::Array(items.into_iter().map(Into::into).collect()),
            crate::Value::Object(props) => Value::Object(
                props
                    .into_iter()
                    .filter(|(_, value)| !value.is_absent())
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(n: f64) -> Value {
    // i64::MAX is not representable as f64, so compare against 2^63 exclusively
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if n.fract() == 0.0 && (-BOUND..BOUND).contains(&n) {
        (n as i64).into()
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl Tree {
    /// Projects the subtree rooted at `id` into JSON.
    pub fn to_json(&self, id: NodeId) -> Result<Value> {
        Ok(self.value_of(id)?.into())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Tree, Value, value};
    use serde_json::json;

    #[test]
    fn builds_trees_from_json() {
        let tree = Tree::new(json!({ "a": [1, 2.5, null], "b": { "c": "d" } })).unwrap();
        let root = tree.root();
        let a = tree.get(root, "a").unwrap().unwrap();
        assert_eq!(tree.len(a).unwrap(), 3);
        assert_eq!(
            tree.to_json(root).unwrap(),
            json!({ "a": [1, 2.5, null], "b": { "c": "d" } })
        );
    }

    #[test]
    fn absent_values_project_as_null_or_nothing() {
        let tree = Tree::new(value!([1, (Value::Absent), { "x": (Value::Absent) }])).unwrap();
        assert_eq!(tree.to_json(tree.root()).unwrap(), json!([1, null, {}]));
        let loose: serde_json::Value = value!({ "k": (Value::Absent), "j": (-0.5) }).into();
        assert_eq!(loose, json!({ "j": -0.5 }));
    }
}

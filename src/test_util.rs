// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Implementation of the quickcheck::Arbitrary trait for values and for mutations of a tree.
//!
//! Generated values are small: at most three levels deep, with a handful of children per
//! container, a small alphabet of property names and numbers that are exact multiples of a
//! quarter. Bugs in tree bookkeeping rarely need more than that to show up, and small inputs
//! keep the shrunk counterexamples readable.
use crate::{NodeId, Tree, Value, error::Result};
use quickcheck::{Arbitrary, Gen};

const NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

fn arbitrary_name(g: &mut Gen) -> String {
    g.choose(&NAMES).copied().unwrap_or("a").to_string()
}

fn arbitrary_number(g: &mut Gen) -> f64 {
    f64::from(i16::arbitrary(g)) / 4.0
}

fn arbitrary_value(g: &mut Gen, depth: usize) -> Value {
    let choices = if depth == 0 { 4 } else { 6 };
    match u8::arbitrary(g) % choices {
        0 => Value::Null,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => Value::Number(arbitrary_number(g)),
        3 => Value::String(arbitrary_name(g)),
        4 => Value::Array(
            (0..usize::arbitrary(g) % 4)
                .map(|_| arbitrary_element(g, depth - 1))
                .collect(),
        ),
        _ => Value::Object(
            (0..usize::arbitrary(g) % 4)
                .map(|_| (arbitrary_name(g), arbitrary_element(g, depth - 1)))
                .collect(),
        ),
    }
}

/// Like [`arbitrary_value`], but occasionally absent.
fn arbitrary_element(g: &mut Gen, depth: usize) -> Value {
    if u8::arbitrary(g) % 5 == 0 {
        Value::Absent
    } else {
        arbitrary_value(g, depth)
    }
}

fn arbitrary_elements(g: &mut Gen) -> Vec<Value> {
    (0..usize::arbitrary(g) % 3)
        .map(|_| arbitrary_element(g, 1))
        .collect()
}

/// Generates values that are valid roots: never absent, only finite numbers.
impl Arbitrary for Value {
    fn arbitrary(g: &mut Gen) -> Self {
        arbitrary_value(g, 2)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            Value::Number(n) => Box::new(n.shrink().map(Value::Number)),
            Value::String(s) => Box::new(s.shrink().map(Value::String)),
            Value::Array(items) => Box::new(items.shrink().map(Value::Array)),
            Value::Object(props) => Box::new(props.shrink().map(Value::Object)),
            _ => quickcheck::empty_shrinker(),
        }
    }
}

/// One mutation of a tree.
///
/// Targets are given as positions in the depth-first list of nodes (modulo its length), and
/// keys as positions in the target's key list, so that a mutation stays meaningful whatever
/// the current shape of the tree is.
#[derive(Debug, Clone)]
pub enum Mutation {
    Assign { target: usize, value: Value },
    Set { target: usize, key: String, value: Value },
    SetIndex { target: usize, index: usize, value: Value },
    Del { target: usize, pick: usize },
    Inc { target: usize, amount: f64 },
    Rename { target: usize, pick: usize, to: String },
    Push { target: usize, values: Vec<Value> },
    Pop { target: usize },
    Shift { target: usize },
    Unshift { target: usize, values: Vec<Value> },
    Splice {
        target: usize,
        start: isize,
        delete_count: usize,
        items: Vec<Value>,
    },
    Reverse { target: usize },
    Sort { target: usize },
}

impl Arbitrary for Mutation {
    fn arbitrary(g: &mut Gen) -> Self {
        let target = usize::arbitrary(g);
        match u8::arbitrary(g) % 13 {
            0 => Mutation::Assign {
                target,
                value: arbitrary_element(g, 1),
            },
            1 => Mutation::Set {
                target,
                key: arbitrary_name(g),
                value: arbitrary_element(g, 1),
            },
            2 => Mutation::SetIndex {
                target,
                index: usize::arbitrary(g) % 6,
                value: arbitrary_element(g, 1),
            },
            3 => Mutation::Del {
                target,
                pick: usize::arbitrary(g),
            },
            4 => Mutation::Inc {
                target,
                amount: arbitrary_number(g),
            },
            5 => Mutation::Rename {
                target,
                pick: usize::arbitrary(g),
                to: arbitrary_name(g),
            },
            6 => Mutation::Push {
                target,
                values: arbitrary_elements(g),
            },
            7 => Mutation::Pop { target },
            8 => Mutation::Shift { target },
            9 => Mutation::Unshift {
                target,
                values: arbitrary_elements(g),
            },
            10 => Mutation::Splice {
                target,
                start: isize::from(i8::arbitrary(g) % 5),
                delete_count: usize::arbitrary(g) % 3,
                items: arbitrary_elements(g),
            },
            11 => Mutation::Reverse { target },
            _ => Mutation::Sort { target },
        }
    }
}

/// Every live node of `tree`, depth first, parents before children.
pub fn nodes(tree: &Tree) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        out.push(id);
        let mut children = tree.children(id).unwrap_or_default();
        children.reverse();
        stack.extend(children);
    }
    out
}

impl Mutation {
    fn target(&self) -> usize {
        match self {
            Mutation::Assign { target, .. }
            | Mutation::Set { target, .. }
            | Mutation::SetIndex { target, .. }
            | Mutation::Del { target, .. }
            | Mutation::Inc { target, .. }
            | Mutation::Rename { target, .. }
            | Mutation::Push { target, .. }
            | Mutation::Pop { target }
            | Mutation::Shift { target }
            | Mutation::Unshift { target, .. }
            | Mutation::Splice { target, .. }
            | Mutation::Reverse { target }
            | Mutation::Sort { target } => *target,
        }
    }

    /// Applies the mutation to `tree`.
    ///
    /// Many mutations do not make sense for the node they end up targeting (popping from a
    /// string, say); those fail exactly like the corresponding tree operation does.
    pub fn apply(&self, tree: &mut Tree) -> Result<()> {
        let nodes = nodes(tree);
        let id = nodes[self.target() % nodes.len()];
        let pick_key = |tree: &Tree, pick: usize| -> Result<Option<crate::Key>> {
            let keys = tree.keys(id)?;
            Ok((!keys.is_empty()).then(|| keys[pick % keys.len()].clone()))
        };
        match self {
            Mutation::Assign { value, .. } => tree.assign(id, value.clone()),
            Mutation::Set { key, value, .. } => tree.set(id, key.as_str(), value.clone()),
            Mutation::SetIndex { index, value, .. } => tree.set(id, *index, value.clone()),
            Mutation::Del { pick, .. } => match pick_key(&*tree, *pick)? {
                Some(key) => tree.del(id, key),
                None => tree.del(id, "missing"),
            },
            Mutation::Inc { amount, .. } => tree.inc(id, *amount).map(drop),
            Mutation::Rename { pick, to, .. } => match pick_key(&*tree, *pick)? {
                Some(key) => tree.rename(id, key, to.as_str()),
                None => tree.rename(id, "missing", to.as_str()),
            },
            Mutation::Push { values, .. } => tree.push(id, values.clone()).map(drop),
            Mutation::Pop { .. } => tree.pop(id).map(drop),
            Mutation::Shift { .. } => tree.shift(id).map(drop),
            Mutation::Unshift { values, .. } => tree.unshift(id, values.clone()).map(drop),
            Mutation::Splice {
                start,
                delete_count,
                items,
                ..
            } => tree
                .splice(id, *start, *delete_count, items.clone())
                .map(drop),
            Mutation::Reverse { .. } => tree.reverse(id),
            Mutation::Sort { .. } => tree.sort(id),
        }
    }
}

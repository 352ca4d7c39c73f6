// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The node arena and the operations every variant supports.
//!
//! A [`Tree`] owns all nodes of one logical tree. Nodes live in slots of an arena and are
//! addressed by [`NodeId`]s. An id carries the generation of its slot, so a destroyed node's id
//! stays invalid even after the slot has been reused: every operation on it fails with
//! [`Error::Destroyed`].
//!
//! Each node holds exactly one [`Variant`] at a time. The variant of a node only ever changes
//! through a transition, which destroys every child of the node (children first) before the
//! node is reinitialized from the new value.
use crate::{
    Diff, Error, Key, Op, SetOp, TomesRandomState, Value, Variant,
    diff::Chain,
    error::Result,
    events::{Buffer, Event, Listeners},
    value::Position,
};
use indexmap::IndexMap;
use std::fmt;
use tracing::trace;

mod array;
mod object;
mod replay;
mod scalar;

pub use array::ConcatItem;

/// A handle to a node of a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

pub(crate) type Props = IndexMap<String, NodeId, TomesRandomState>;

/// The active variant of a node together with its data.
#[derive(Debug)]
pub(crate) enum Payload {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<NodeId>),
    Object(Props),
    Absent,
}

impl Payload {
    pub(crate) fn variant(&self) -> Variant {
        match self {
            Payload::Null => Variant::Null,
            Payload::Boolean(_) => Variant::Boolean,
            Payload::Number(_) => Variant::Number,
            Payload::String(_) => Variant::String,
            Payload::Array(_) => Variant::Array,
            Payload::Object(_) => Variant::Object,
            Payload::Absent => Variant::Absent,
        }
    }

    pub(crate) fn children(&self) -> Vec<NodeId> {
        match self {
            Payload::Array(items) => items.clone(),
            Payload::Object(props) => props.values().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Whether this scalar payload already represents `value`.
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Payload::Null, Value::Null) | (Payload::Absent, Value::Absent) => true,
            (Payload::Boolean(a), Value::Bool(b)) => a == b,
            (Payload::Number(a), Value::Number(b)) => a == b,
            (Payload::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) payload: Payload,
    parent: Option<NodeId>,
    key: Option<Key>,
    version: u64,
    pub(crate) pending: Diff,
    pub(crate) listeners: Listeners,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// An observable tree mirroring a JSON-like value.
///
/// A tree is single-threaded: listeners are plain closures, so `Tree` is neither `Send` nor
/// `Sync`. Independent trees share no nodes; use [`Diff`] records to carry changes between them.
#[derive(Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    pub(crate) buffer: Option<Buffer>,
    pub(crate) next_listener: u64,
}

impl Tree {
    /// Conjures a new tree from `value`.
    ///
    /// Fails with [`Error::InvalidValueType`] if the value contains a non-finite number, and
    /// with [`Error::InvalidElementType`] if the value itself is [`Value::Absent`]. Object
    /// properties whose value is absent are skipped.
    pub fn new(value: impl Into<Value>) -> Result<Tree> {
        let value = value.into();
        value.validate(Position::Root)?;
        let mut tree = Tree {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            buffer: None,
            next_listener: 0,
        };
        tree.root = tree.conjure(value, None, None);
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns `true` if `id` refers to a live node of this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.lookup(id).is_some()
    }

    pub(crate) fn lookup(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn lookup_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node> {
        self.lookup(id).ok_or(Error::Destroyed(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.lookup_mut(id).ok_or(Error::Destroyed(id))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).expect("a tree holds fewer than 2^32 nodes");
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Makes room for `additional` nodes up front; `false` if the arena cannot grow that much.
    pub(crate) fn reserve_nodes(&mut self, additional: usize) -> bool {
        let needed = additional.saturating_sub(self.free.len());
        self.slots
            .len()
            .checked_add(needed)
            .is_some_and(|total| total <= u32::MAX as usize)
            && self.slots.try_reserve(needed).is_ok()
    }

    fn release(&mut self, id: NodeId) -> Option<Node> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    /// Creates a node (and, recursively, its children) from an already validated value.
    pub(crate) fn conjure(
        &mut self,
        value: Value,
        parent: Option<NodeId>,
        key: Option<Key>,
    ) -> NodeId {
        let id = self.alloc(Node {
            payload: Payload::Null,
            parent,
            key,
            version: 1,
            pending: Diff::default(),
            listeners: Listeners::default(),
        });
        let payload = self.build_payload(id, value);
        if let Some(node) = self.lookup_mut(id) {
            node.payload = payload;
        }
        id
    }

    fn build_payload(&mut self, id: NodeId, value: Value) -> Payload {
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Boolean(b),
            Value::Number(n) => Payload::Number(n),
            Value::String(s) => Payload::String(s),
            Value::Absent => Payload::Absent,
            Value::Array(items) => Payload::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.conjure(item, Some(id), Some(Key::Index(i))))
                    .collect(),
            ),
            Value::Object(props) => {
                let mut children = Props::default();
                for (name, value) in props.into_iter().filter(|(_, v)| !v.is_absent()) {
                    let child = self.conjure(value, Some(id), Some(Key::Name(name.clone())));
                    children.insert(name, child);
                }
                Payload::Object(children)
            }
        }
    }

    /// Destroys every child of `id`, leaving it an empty `null`.
    ///
    /// Always followed by a reinitialization of the node.
    pub(crate) fn reset(&mut self, id: NodeId) {
        let children = self
            .lookup_mut(id)
            .map(|node| std::mem::replace(&mut node.payload, Payload::Null).children())
            .unwrap_or_default();
        for child in children {
            self.destroy(child);
        }
    }

    /// Changes the variant and data of `id` to those of an already validated value.
    pub(crate) fn transition(&mut self, id: NodeId, value: Value) {
        self.reset(id);
        let payload = self.build_payload(id, value);
        if let Some(node) = self.lookup_mut(id) {
            node.payload = payload;
        }
    }

    /// Destroys `id` and its subtree, children first.
    ///
    /// The caller is responsible for unlinking the node from its parent.
    pub(crate) fn destroy(&mut self, id: NodeId) {
        let children = self
            .lookup(id)
            .map(|node| node.payload.children())
            .unwrap_or_default();
        for child in children {
            self.destroy(child);
        }
        trace!(node = %id, "destroying node");
        if self.buffer.is_some() {
            let Some(mut node) = self.release(id) else {
                return;
            };
            let listeners = std::mem::take(&mut node.listeners);
            if let Some(buffer) = &mut self.buffer {
                buffer.push(id, Event::Destroy);
                buffer.bury(id, listeners);
            }
        } else {
            if let Some(node) = self.lookup_mut(id) {
                node.listeners.notify(&Event::Destroy);
            }
            self.release(id);
        }
    }

    /// Records `op` at `id` and chains it, wrapped in the child key of each level, into every
    /// ancestor up to the root.
    ///
    /// Unless the tree is paused, every node on the way emits its aggregate events immediately.
    pub(crate) fn diff(&mut self, id: NodeId, op: Op) {
        trace!(node = %id, op = %op.kind(), "recording diff");
        let paused = self.is_paused();
        let mut chain = Chain::Op(op);
        let mut id = id;
        loop {
            let Some(node) = self.lookup_mut(id) else {
                break;
            };
            node.version += 1;
            node.pending.record(chain.clone());
            let up = node.parent.zip(node.key.clone());
            if !paused {
                self.emit_aggregate(id);
            }
            let Some((parent, key)) = up else {
                break;
            };
            chain = Chain::Child(key, Box::new(chain));
            id = parent;
        }
    }

    pub(crate) fn position_of(&self, id: NodeId) -> Result<Position> {
        let node = self.node(id)?;
        Ok(match node.parent.and_then(|parent| self.lookup(parent)) {
            None => Position::Root,
            Some(parent) if parent.payload.variant() == Variant::Array => Position::Element,
            Some(_) => Position::Property,
        })
    }

    /// Makes `id` represent `value`.
    ///
    /// Assigning an equal scalar is a no-op. When either the current or the new value is a
    /// container, every child is destroyed before the node is reinitialized. Assigning
    /// [`Value::Absent`] is accepted for array elements, ignored for object properties and
    /// rejected for the root.
    pub fn assign(&mut self, id: NodeId, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let position = self.position_of(id)?;
        if value.is_absent() && position == Position::Property {
            return Ok(());
        }
        value.validate(position)?;
        let payload = &self.node(id)?.payload;
        if !payload.variant().is_container()
            && !value.variant().is_container()
            && payload.matches(&value)
        {
            return Ok(());
        }
        let value = value.normalized();
        self.transition(id, value.clone());
        self.diff(id, Op::Assign(value));
        Ok(())
    }

    /// Stores `value` under `key`.
    ///
    /// On arrays, an index key assigns the existing element or extends the array. Anywhere else
    /// the node is treated as an object: a node of any other variant is first reset to an empty
    /// object, an existing property is assigned and a new one is conjured.
    pub fn set(&mut self, id: NodeId, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        if self.variant(id)? == Variant::Array {
            if let Some(index) = key.as_index() {
                return self.set_index(id, index, value);
            }
        }
        if value.is_absent() {
            return Ok(());
        }
        value.validate(Position::Property)?;
        let name = key.to_name();
        let existing = match &self.node(id)?.payload {
            Payload::Object(props) => Some(props.get(&name).copied()),
            _ => None,
        };
        match existing {
            Some(Some(child)) => return self.assign(child, value),
            Some(None) => {}
            None => {
                self.reset(id);
                self.node_mut(id)?.payload = Payload::Object(Props::default());
            }
        }
        let value = value.normalized();
        let child = self.conjure(value.clone(), Some(id), Some(Key::Name(name.clone())));
        if let Payload::Object(props) = &mut self.node_mut(id)?.payload {
            props.insert(name.clone(), child);
        }
        self.emit(id, Event::Add(Key::Name(name.clone())));
        self.diff(
            id,
            Op::Set(SetOp {
                key: Key::Name(name),
                value,
            }),
        );
        Ok(())
    }

    /// Removes the child under `key`.
    ///
    /// Object properties are removed outright. Array elements are destroyed and leave an absent
    /// slot behind, so the indices of the other elements do not change.
    pub fn del(&mut self, id: NodeId, key: impl Into<Key>) -> Result<()> {
        let key = key.into();
        match self.variant(id)? {
            Variant::Array => self.del_index(id, &key),
            Variant::Object => {
                let name = key.to_name();
                let removed = match &mut self.node_mut(id)?.payload {
                    Payload::Object(props) => props.shift_remove(&name),
                    _ => None,
                };
                let child = removed.ok_or(Error::UndefinedKey(key))?;
                self.emit(id, Event::Del(Key::Name(name.clone())));
                self.destroy(child);
                self.diff(id, Op::Del(Key::Name(name)));
                Ok(())
            }
            _ => Err(Error::UndefinedKey(key)),
        }
    }

    pub fn variant(&self, id: NodeId) -> Result<Variant> {
        Ok(self.node(id)?.payload.variant())
    }

    /// Returns the child of `id` reachable under `key`, if any.
    ///
    /// Name keys are parsed as indices when `id` is an array.
    pub fn get(&self, id: NodeId, key: impl Into<Key>) -> Result<Option<NodeId>> {
        let key = key.into();
        Ok(match &self.node(id)?.payload {
            Payload::Array(items) => key.as_index().and_then(|i| items.get(i).copied()),
            Payload::Object(props) => props.get(&key.to_name()).copied(),
            _ => None,
        })
    }

    /// The key under which `id` is reachable from its parent; `None` for the root.
    pub fn key_of(&self, id: NodeId) -> Result<Option<Key>> {
        Ok(self.node(id)?.key.clone())
    }

    pub fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// The children of `id` in key order.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node(id)?.payload.children())
    }

    pub fn keys(&self, id: NodeId) -> Result<Vec<Key>> {
        Ok(match &self.node(id)?.payload {
            Payload::Array(items) => (0..items.len()).map(Key::Index).collect(),
            Payload::Object(props) => props.keys().map(Key::from).collect(),
            _ => Vec::new(),
        })
    }

    /// The number of children of `id`; zero for scalars.
    pub fn len(&self, id: NodeId) -> Result<usize> {
        Ok(match &self.node(id)?.payload {
            Payload::Array(items) => items.len(),
            Payload::Object(props) => props.len(),
            _ => 0,
        })
    }

    /// Starts at 1 and grows with every diff recorded at or below `id`.
    pub fn version(&self, id: NodeId) -> Result<u64> {
        Ok(self.node(id)?.version)
    }

    /// Whether `id` has a pending diff that has not been flushed yet.
    pub fn is_dirty(&self, id: NodeId) -> Result<bool> {
        Ok(!self.node(id)?.pending.is_empty())
    }

    /// The pending diff of `id`.
    pub fn read_diff(&self, id: NodeId) -> Result<&Diff> {
        Ok(&self.node(id)?.pending)
    }

    pub fn as_bool(&self, id: NodeId) -> Result<Option<bool>> {
        Ok(match self.node(id)?.payload {
            Payload::Boolean(b) => Some(b),
            _ => None,
        })
    }

    pub fn as_number(&self, id: NodeId) -> Result<Option<f64>> {
        Ok(match self.node(id)?.payload {
            Payload::Number(n) => Some(n),
            _ => None,
        })
    }

    pub fn as_str(&self, id: NodeId) -> Result<Option<&str>> {
        Ok(match &self.node(id)?.payload {
            Payload::String(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Projects the subtree rooted at `id` back into a plain value.
    pub fn value_of(&self, id: NodeId) -> Result<Value> {
        Ok(self.project(self.node(id)?))
    }

    pub(crate) fn project(&self, node: &Node) -> Value {
        match &node.payload {
            Payload::Null => Value::Null,
            Payload::Boolean(b) => Value::Bool(*b),
            Payload::Number(n) => Value::Number(*n),
            Payload::String(s) => Value::String(s.clone()),
            Payload::Absent => Value::Absent,
            Payload::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|child| self.lookup(*child).map_or(Value::Absent, |c| self.project(c)))
                    .collect(),
            ),
            Payload::Object(props) => Value::Object(
                props
                    .iter()
                    .filter_map(|(name, child)| {
                        self.lookup(*child).map(|c| (name.clone(), self.project(c)))
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Error, Event, EventKind, Key, Op, OpKind, Tree, Value, Variant,
        events::recorder::EventRecorder, value,
    };

    #[test]
    fn conjure_projects_back() {
        let v = value!({ "a": [1, (Value::Absent), "x"], "b": { "c": null, "d": true } });
        let tree = Tree::new(v.clone()).unwrap();
        assert_eq!(tree.value_of(tree.root()).unwrap(), v);
        assert_eq!(tree.variant(tree.root()).unwrap(), Variant::Object);
    }

    #[test]
    fn conjure_validates() {
        assert!(matches!(
            Tree::new(value!([1, (f64::NAN)])),
            Err(Error::InvalidValueType(_))
        ));
        assert_eq!(Tree::new(Value::Absent).unwrap_err(), Error::InvalidElementType);
        let tree = Tree::new(value!({ "a": (Value::Absent), "b": 1 })).unwrap();
        assert_eq!(tree.keys(tree.root()).unwrap(), [Key::from("b")]);
    }

    #[test]
    fn children_know_their_keys_and_parents() {
        let tree = Tree::new(value!({ "list": [10, 20] })).unwrap();
        let root = tree.root();
        let list = tree.get(root, "list").unwrap().unwrap();
        let second = tree.get(list, 1).unwrap().unwrap();
        assert_eq!(tree.get(list, "1").unwrap(), Some(second));
        assert_eq!(tree.key_of(second).unwrap(), Some(Key::Index(1)));
        assert_eq!(tree.parent_of(second).unwrap(), Some(list));
        assert_eq!(tree.parent_of(root).unwrap(), None);
        assert_eq!(tree.key_of(root).unwrap(), None);
        assert_eq!(tree.as_number(second).unwrap(), Some(20.0));
        assert_eq!(tree.len(list).unwrap(), 2);
        assert_eq!(tree.len(second).unwrap(), 0);
    }

    #[test]
    fn set_then_del_on_object() {
        let mut tree = Tree::new(value!({ "a": 1 })).unwrap();
        let root = tree.root();
        let a = tree.get(root, "a").unwrap().unwrap();
        let recorder = EventRecorder::new();
        recorder.attach(&mut tree, root, "root").unwrap();
        recorder.attach(&mut tree, a, "a").unwrap();

        tree.set(root, "b", 2).unwrap();
        assert_eq!(
            recorder.take(),
            ["root: add b", "root: signal", "root: change", "root: diff"]
        );
        assert_eq!(tree.value_of(root).unwrap(), value!({ "a": 1, "b": 2 }));

        tree.del(root, "a").unwrap();
        assert_eq!(
            recorder.take(),
            [
                "root: del a",
                "a: destroy",
                "root: signal",
                "root: change",
                "root: diff"
            ]
        );
        assert_eq!(tree.value_of(root).unwrap(), value!({ "b": 2 }));
        assert!(!tree.contains(a));
        assert_eq!(tree.value_of(a), Err(Error::Destroyed(a)));
    }

    #[test]
    fn del_reports_missing_keys() {
        let mut tree = Tree::new(value!({ "a": 1 })).unwrap();
        let root = tree.root();
        assert_eq!(tree.del(root, "zz"), Err(Error::UndefinedKey(Key::from("zz"))));
        let a = tree.get(root, "a").unwrap().unwrap();
        assert_eq!(tree.del(a, "x"), Err(Error::UndefinedKey(Key::from("x"))));
    }

    #[test]
    fn set_existing_key_assigns_child_in_place() {
        let mut tree = Tree::new(value!({ "a": 1 })).unwrap();
        let root = tree.root();
        let a = tree.get(root, "a").unwrap().unwrap();
        tree.set(root, "a", 5).unwrap();
        assert_eq!(tree.get(root, "a").unwrap(), Some(a));
        assert_eq!(tree.as_number(a).unwrap(), Some(5.0));
        assert!(tree.read_diff(root).unwrap().is_empty());
    }

    #[test]
    fn set_on_scalar_resets_to_object() {
        let mut tree = Tree::new(value!({ "s": 1 })).unwrap();
        let root = tree.root();
        let s = tree.get(root, "s").unwrap().unwrap();
        tree.set(s, "k", "v").unwrap();
        assert_eq!(tree.value_of(root).unwrap(), value!({ "s": { "k": "v" } }));
    }

    #[test]
    fn absent_properties_are_ignored() {
        let mut tree = Tree::new(value!({ "a": 1 })).unwrap();
        let root = tree.root();
        tree.pause();
        tree.set(root, "b", Value::Absent).unwrap();
        let a = tree.get(root, "a").unwrap().unwrap();
        tree.assign(a, Value::Absent).unwrap();
        assert!(!tree.is_dirty(root).unwrap());
        assert_eq!(tree.assign(root, Value::Absent), Err(Error::InvalidElementType));
    }

    #[test]
    fn equal_scalar_assign_is_a_no_op() {
        let mut tree = Tree::new(value!("x")).unwrap();
        let root = tree.root();
        tree.assign(root, "x").unwrap();
        assert_eq!(tree.version(root).unwrap(), 1);
        tree.assign(root, 3).unwrap();
        assert_eq!(tree.version(root).unwrap(), 2);
        assert_eq!(tree.variant(root).unwrap(), Variant::Number);
    }

    #[test]
    fn assign_through_a_container_destroys_children_first() {
        let mut tree = Tree::new(value!({ "v": 1 })).unwrap();
        let root = tree.root();
        let v = tree.get(root, "v").unwrap().unwrap();

        tree.assign(v, value!([1, 2])).unwrap();
        let elements = tree.children(v).unwrap();
        assert_eq!(elements.len(), 2);
        let recorder = EventRecorder::new();
        recorder.attach(&mut tree, elements[0], "first").unwrap();
        recorder.attach(&mut tree, elements[1], "second").unwrap();
        recorder.attach(&mut tree, v, "v").unwrap();

        tree.assign(v, "done").unwrap();
        assert_eq!(
            recorder.changes_seen(),
            [
                "first: destroy",
                "second: destroy",
                "v: signal",
                "v: change",
                "v: diff"
            ]
        );
        assert!(elements.iter().all(|e| !tree.contains(*e)));
        assert_eq!(tree.as_str(v).unwrap(), Some("done"));
        assert_eq!(tree.value_of(root).unwrap(), value!({ "v": "done" }));
    }

    #[test]
    fn assign_validates_before_destroying() {
        let mut tree = Tree::new(value!([1, 2])).unwrap();
        let root = tree.root();
        let first = tree.get(root, 0).unwrap().unwrap();
        assert!(tree.assign(root, value!([(f64::INFINITY)])).is_err());
        assert!(tree.contains(first));
        assert_eq!(tree.version(root).unwrap(), 1);
    }

    #[test]
    fn diffs_chain_to_the_root() {
        let mut tree = Tree::new(value!({ "a": { "b": 1 } })).unwrap();
        let root = tree.root();
        let a = tree.get(root, "a").unwrap().unwrap();
        let b = tree.get(a, "b").unwrap().unwrap();
        tree.pause();
        tree.assign(b, 2).unwrap();
        assert_eq!(tree.version(b).unwrap(), 2);
        assert_eq!(tree.version(a).unwrap(), 2);
        assert_eq!(tree.version(root).unwrap(), 2);

        let nested = tree.read_diff(root).unwrap();
        let at_b = nested
            .child(&Key::from("a"))
            .and_then(|d| d.child(&Key::from("b")))
            .unwrap();
        assert_eq!(
            at_b.op(OpKind::Assign).map(|o| o.iter().cloned().collect::<Vec<_>>()),
            Some(vec![Op::Assign(value!(2))])
        );
        tree.resume();
        assert!(!tree.is_dirty(root).unwrap());
        assert!(!tree.is_dirty(b).unwrap());
    }

    #[test]
    fn destroyed_ids_stay_invalid_after_slot_reuse() {
        let mut tree = Tree::new(value!({ "a": 1 })).unwrap();
        let root = tree.root();
        let a = tree.get(root, "a").unwrap().unwrap();
        tree.del(root, "a").unwrap();
        tree.set(root, "b", 2).unwrap();
        let b = tree.get(root, "b").unwrap().unwrap();
        assert_ne!(a, b);
        assert_eq!(tree.on(a, EventKind::Add, |_: &Event| {}), Err(Error::Destroyed(a)));
        assert_eq!(tree.as_number(b).unwrap(), Some(2.0));
    }
}

// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Diff records: mergeable descriptions of the mutations applied to a node and its descendants.
//!
//! A [`Diff`] is an ordered mapping. Each entry is keyed either by an operation name (the
//! mutation happened on the node itself) or by a child key (the mutation happened somewhere
//! below that child, and the entry nests the child's own record).
//!
//! Operation entries accumulate. The first occurrence of an operation is stored on its own; the
//! second occurrence turns the entry into a list of both, and every further occurrence is
//! appended to that list:
//!
//! ```rust
//! # use tomes::{Diff, Op, Occurrences};
//! let mut diff = Diff::default();
//! diff.record_op(Op::Inc(5.0));
//! assert_eq!(diff.op(Op::Inc(0.0).kind()), Some(&Occurrences::One(Op::Inc(5.0))));
//! diff.record_op(Op::Inc(5.0));
//! assert_eq!(diff.op(Op::Inc(0.0).kind()).map(Occurrences::len), Some(2));
//! ```
//!
//! # Wire format
//!
//! With the `serde` feature, a record serializes as a map. Operation keys map to the list of
//! their occurrence payloads, in order. Child entries use the key `"_"` followed by the child
//! key and nest a record:
//!
//! ```json
//! { "inc": [5.0, 5.0], "_items": { "push": [[{ "number": 1.0 }]] } }
//! ```
//!
//! Since a record groups occurrences by operation name, replaying a record replays all
//! occurrences of its first operation before those of the next one. Records captured one
//! mutation at a time (that is, while the tree is not paused) replay exactly.
use crate::{Key, Value};
use smallvec::{SmallVec, smallvec};
use std::fmt;

/// The name of an operation, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Assign,
    Set,
    Del,
    Inc,
    Rename,
    Push,
    Pop,
    Shift,
    Unshift,
    Splice,
    Reverse,
}

impl OpKind {
    pub const ALL: [OpKind; 11] = [
        OpKind::Assign,
        OpKind::Set,
        OpKind::Del,
        OpKind::Inc,
        OpKind::Rename,
        OpKind::Push,
        OpKind::Pop,
        OpKind::Shift,
        OpKind::Unshift,
        OpKind::Splice,
        OpKind::Reverse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OpKind::Assign => "assign",
            OpKind::Set => "set",
            OpKind::Del => "del",
            OpKind::Inc => "inc",
            OpKind::Rename => "rename",
            OpKind::Push => "push",
            OpKind::Pop => "pop",
            OpKind::Shift => "shift",
            OpKind::Unshift => "unshift",
            OpKind::Splice => "splice",
            OpKind::Reverse => "reverse",
        }
    }

    pub fn from_name(name: &str) -> Option<OpKind> {
        OpKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single `{o, n}` pair of a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct Rename {
    pub o: Key,
    pub n: Key,
}

impl Rename {
    pub fn new(o: impl Into<Key>, n: impl Into<Key>) -> Self {
        Self {
            o: o.into(),
            n: n.into(),
        }
    }
}

/// Payload of a `set` operation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct SetOp {
    pub key: Key,
    pub value: Value,
}

/// Payload of a `splice` operation, with `start` and `delete_count` already clamped.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct SpliceOp {
    pub start: usize,
    pub delete_count: usize,
    pub items: Vec<Value>,
}

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// The node now represents this value.
    Assign(Value),
    /// A child was created under a new key (or index).
    Set(SetOp),
    /// A child was removed.
    Del(Key),
    /// A number was incremented by this amount.
    Inc(f64),
    /// Children were moved from `o` to `n`.
    Rename(Vec<Rename>),
    Push(Vec<Value>),
    Pop(usize),
    Shift(usize),
    Unshift(Vec<Value>),
    Splice(SpliceOp),
    Reverse,
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Assign(_) => OpKind::Assign,
            Op::Set(_) => OpKind::Set,
            Op::Del(_) => OpKind::Del,
            Op::Inc(_) => OpKind::Inc,
            Op::Rename(_) => OpKind::Rename,
            Op::Push(_) => OpKind::Push,
            Op::Pop(_) => OpKind::Pop,
            Op::Shift(_) => OpKind::Shift,
            Op::Unshift(_) => OpKind::Unshift,
            Op::Splice(_) => OpKind::Splice,
            Op::Reverse => OpKind::Reverse,
        }
    }
}

/// Every occurrence of one operation within a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Occurrences<T> {
    One(T),
    Many(SmallVec<[T; 2]>),
}

impl<T> Occurrences<T> {
    fn push(&mut self, value: T) {
        match self {
            Occurrences::Many(values) => values.push(value),
            Occurrences::One(_) => {
                let Occurrences::One(first) =
                    std::mem::replace(self, Occurrences::Many(SmallVec::new()))
                else {
                    unreachable!("matched One above");
                };
                *self = Occurrences::Many(smallvec![first, value]);
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Occurrences::One(_) => 1,
            Occurrences::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (one, many) = match self {
            Occurrences::One(v) => (Some(v), &[][..]),
            Occurrences::Many(values) => (None, &values[..]),
        };
        one.into_iter().chain(many)
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Occurrences::One(v) => vec![v],
            Occurrences::Many(values) => values.into_vec(),
        }
    }

    fn from_vec(mut values: Vec<T>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Occurrences::One),
            _ => Some(Occurrences::Many(values.into())),
        }
    }
}

/// One entry of a [`Diff`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Op(Occurrences<Op>),
    Child(Key, Diff),
}

/// A mergeable description of the mutations applied to a node and its descendants.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diff {
    entries: Vec<Entry>,
}

/// A mutation on its way up the tree: the op itself, wrapped once per level in the key of
/// the child it came through.
#[derive(Debug, Clone)]
pub(crate) enum Chain {
    Op(Op),
    Child(Key, Box<Chain>),
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Returns the occurrences of `kind` recorded on this node itself.
    pub fn op(&self, kind: OpKind) -> Option<&Occurrences<Op>> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Op(ops) if first_kind(ops) == kind => Some(ops),
            _ => None,
        })
    }

    /// Returns the nested record of the child reachable under `key`.
    pub fn child(&self, key: &Key) -> Option<&Diff> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Child(k, diff) if k == key => Some(diff),
            _ => None,
        })
    }

    /// Records an operation performed on this node.
    pub fn record_op(&mut self, op: Op) {
        let kind = op.kind();
        let existing = self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Op(ops) if first_kind(ops) == kind => Some(ops),
            _ => None,
        });
        match existing {
            Some(ops) => ops.push(op),
            None => self.entries.push(Entry::Op(Occurrences::One(op))),
        }
    }

    /// Returns the nested record for the child under `key`, creating it if necessary.
    pub fn child_mut(&mut self, key: Key) -> &mut Diff {
        let position = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Child(k, _) if *k == key));
        let position = position.unwrap_or_else(|| {
            self.entries.push(Entry::Child(key, Diff::default()));
            self.entries.len() - 1
        });
        match &mut self.entries[position] {
            Entry::Child(_, diff) => diff,
            Entry::Op(_) => unreachable!("position points at a child entry"),
        }
    }

    pub(crate) fn record(&mut self, chain: Chain) {
        match chain {
            Chain::Op(op) => self.record_op(op),
            Chain::Child(key, inner) => self.child_mut(key).record(*inner),
        }
    }

    /// Merges every entry of `other` into this record, using the accumulation rule.
    pub fn extend(&mut self, other: Diff) {
        for entry in other.entries {
            match entry {
                Entry::Op(ops) => ops.into_vec().into_iter().for_each(|op| self.record_op(op)),
                Entry::Child(key, diff) => self.child_mut(key).extend(diff),
            }
        }
    }
}

fn first_kind(ops: &Occurrences<Op>) -> OpKind {
    match ops {
        Occurrences::One(op) => op.kind(),
        Occurrences::Many(values) => values
            .first()
            .map(Op::kind)
            .expect("Many always holds at least two occurrences"),
    }
}

impl From<Op> for Diff {
    fn from(op: Op) -> Self {
        let mut diff = Diff::default();
        diff.record_op(op);
        diff
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::{
        Deserialize, Deserializer, Serialize, Serializer,
        de::{self, DeserializeSeed, MapAccess, Visitor},
        ser::{SerializeMap, SerializeSeq},
    };

    const CHILD_PREFIX: char = '_';

    /// Serializes an op as its bare payload; the op name is the enclosing map key.
    struct Payload<'a>(&'a Op);

    impl Serialize for Payload<'_> {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            match self.0 {
                Op::Assign(v) => v.serialize(s),
                Op::Set(set) => set.serialize(s),
                Op::Del(k) => k.serialize(s),
                Op::Inc(n) => n.serialize(s),
                Op::Rename(pairs) => pairs.serialize(s),
                Op::Push(values) | Op::Unshift(values) => values.serialize(s),
                Op::Pop(n) | Op::Shift(n) => n.serialize(s),
                Op::Splice(splice) => splice.serialize(s),
                Op::Reverse => s.serialize_unit(),
            }
        }
    }

    struct AllOccurrences<'a>(&'a Occurrences<Op>);

    impl Serialize for AllOccurrences<'_> {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            let mut seq = s.serialize_seq(Some(self.0.len()))?;
            for op in self.0.iter() {
                seq.serialize_element(&Payload(op))?;
            }
            seq.end()
        }
    }

    impl Serialize for Diff {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            let mut map = s.serialize_map(Some(self.entries.len()))?;
            for entry in &self.entries {
                match entry {
                    Entry::Op(ops) => {
                        map.serialize_entry(first_kind(ops).name(), &AllOccurrences(ops))?
                    }
                    Entry::Child(key, diff) => {
                        map.serialize_entry(&format!("{CHILD_PREFIX}{key}"), diff)?
                    }
                }
            }
            map.end()
        }
    }

    /// Deserializes the list of payloads of one operation kind.
    struct OccurrencesSeed(OpKind);

    impl<'de> DeserializeSeed<'de> for OccurrencesSeed {
        type Value = Vec<Op>;

        fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            fn each<'de, D, T, F>(d: D, f: F) -> Result<Vec<Op>, D::Error>
            where
                D: Deserializer<'de>,
                T: Deserialize<'de>,
                F: Fn(T) -> Op,
            {
                Ok(Vec::<T>::deserialize(d)?.into_iter().map(f).collect())
            }

            match self.0 {
                OpKind::Assign => each(d, Op::Assign),
                OpKind::Set => each(d, Op::Set),
                OpKind::Del => each(d, Op::Del),
                OpKind::Inc => each(d, Op::Inc),
                OpKind::Rename => each(d, Op::Rename),
                OpKind::Push => each(d, Op::Push),
                OpKind::Pop => each(d, Op::Pop),
                OpKind::Shift => each(d, Op::Shift),
                OpKind::Unshift => each(d, Op::Unshift),
                OpKind::Splice => each(d, Op::Splice),
                OpKind::Reverse => each(d, |()| Op::Reverse),
            }
        }
    }

    struct DiffVisitor;

    impl<'de> Visitor<'de> for DiffVisitor {
        type Value = Diff;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a diff record")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Diff, A::Error> {
            let mut entries = Vec::new();
            while let Some(name) = map.next_key::<String>()? {
                if let Some(child) = name.strip_prefix(CHILD_PREFIX) {
                    let diff: Diff = map.next_value()?;
                    entries.push(Entry::Child(Key::Name(child.to_string()), diff));
                    continue;
                }
                let kind = OpKind::from_name(&name)
                    .ok_or_else(|| de::Error::custom(format!("unknown operation `{name}`")))?;
                let ops = map.next_value_seed(OccurrencesSeed(kind))?;
                let ops = Occurrences::from_vec(ops).ok_or_else(|| {
                    de::Error::custom(format!("operation `{name}` without occurrences"))
                })?;
                entries.push(Entry::Op(ops));
            }
            Ok(Diff { entries })
        }
    }

    impl<'de> Deserialize<'de> for Diff {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            d.deserialize_map(DiffVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_first_single_then_list() {
        let mut diff = Diff::default();
        diff.record_op(Op::Inc(5.0));
        assert_eq!(diff.op(OpKind::Inc), Some(&Occurrences::One(Op::Inc(5.0))));
        diff.record_op(Op::Inc(5.0));
        diff.record_op(Op::Inc(1.0));
        assert_eq!(
            diff.op(OpKind::Inc),
            Some(&Occurrences::Many(smallvec![
                Op::Inc(5.0),
                Op::Inc(5.0),
                Op::Inc(1.0)
            ]))
        );
        assert_eq!(diff.entries().len(), 1);
    }

    #[test]
    fn chains_nest_under_child_keys() {
        let mut diff = Diff::default();
        diff.record(Chain::Child(
            Key::from("a"),
            Box::new(Chain::Child(Key::Index(0), Box::new(Chain::Op(Op::Pop(1))))),
        ));
        diff.record(Chain::Child(
            Key::from("a"),
            Box::new(Chain::Op(Op::Push(vec![Value::Null]))),
        ));
        diff.record(Chain::Op(Op::Del(Key::from("b"))));

        let a = diff.child(&Key::from("a")).unwrap();
        assert!(a.op(OpKind::Push).is_some());
        assert_eq!(
            a.child(&Key::Index(0)).unwrap().op(OpKind::Pop),
            Some(&Occurrences::One(Op::Pop(1)))
        );
        assert_eq!(diff.entries().len(), 2);
    }

    #[test]
    fn extend_uses_accumulation_rule() {
        let mut left = Diff::from(Op::Inc(1.0));
        let mut right = Diff::from(Op::Inc(2.0));
        right.child_mut(Key::from("x")).record_op(Op::Reverse);
        left.extend(right);
        assert_eq!(left.op(OpKind::Inc).map(Occurrences::len), Some(2));
        assert!(left.child(&Key::from("x")).is_some());
    }

    #[test]
    fn op_names_round_trip() {
        for kind in OpKind::ALL {
            assert_eq!(OpKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(OpKind::from_name("explode"), None);
    }

    #[cfg(feature = "json")]
    mod wire {
        use super::*;
        use insta::assert_snapshot;

        #[test]
        fn serializes_occurrences_as_lists() {
            let mut diff = Diff::from(Op::Inc(5.0));
            diff.record_op(Op::Inc(5.0));
            diff.child_mut(Key::from("items"))
                .record_op(Op::Push(vec![Value::Number(1.0), Value::Absent]));
            assert_snapshot!(
                serde_json::to_string(&diff).unwrap(),
                @r#"{"inc":[5.0,5.0],"_items":{"push":[[{"number":1.0},"absent"]]}}"#
            );
        }

        #[test]
        fn deserializes_what_it_serializes() {
            let mut diff = Diff::from(Op::Set(SetOp {
                key: Key::Index(4),
                value: Value::String("x".into()),
            }));
            diff.record_op(Op::Splice(SpliceOp {
                start: 1,
                delete_count: 1,
                items: vec![Value::Bool(true)],
            }));
            diff.record_op(Op::Reverse);
            diff.record_op(Op::Rename(vec![Rename::new("a", "b")]));
            diff.child_mut(Key::from("k")).record_op(Op::Del(Key::from("z")));

            let text = serde_json::to_string(&diff).unwrap();
            let back: Diff = serde_json::from_str(&text).unwrap();
            assert_eq!(back, diff);
        }

        #[test]
        fn rejects_unknown_operations() {
            let err = serde_json::from_str::<Diff>(r#"{"explode":[1]}"#).unwrap_err();
            assert!(err.to_string().contains("unknown operation `explode`"));
        }
    }
}

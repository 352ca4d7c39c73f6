// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Replaying diff records against a tree.
//!
//! A record captured on one tree can be merged into any other tree that held the same value
//! when the record started accumulating. Replaying uses the ordinary mutation operations, so
//! the replica records and emits exactly what a local mutation would.
use super::{NodeId, Tree};
use crate::{Diff, Entry, Error, Op, SetOp, SpliceOp, Variant, error::Result};
use std::borrow::Borrow;
use tracing::{debug, warn};

impl Tree {
    /// Replays `diff` against `id`, entry by entry in record order.
    ///
    /// Child entries are replayed against the child under their key, where name keys address
    /// array indices when `id` is an array. Fails with [`Error::UndefinedChild`] if there is no
    /// such child and with [`Error::UnknownOperation`] if an operation does not apply to the
    /// variant of its target. Entries replayed before a failure stay applied.
    pub fn merge(&mut self, id: NodeId, diff: &Diff) -> Result<()> {
        for entry in diff.entries() {
            match entry {
                Entry::Op(ops) => {
                    for op in ops.iter() {
                        self.apply(id, op)?;
                    }
                }
                Entry::Child(key, nested) => {
                    let child = self
                        .get(id, key.clone())?
                        .ok_or_else(|| Error::UndefinedChild(key.clone()))?;
                    self.merge(child, nested)?;
                }
            }
        }
        Ok(())
    }

    /// Merges every record into the root as a single batch.
    ///
    /// Observers see one aggregate event per touched node once all records are merged. The
    /// tree is resumed even if a record fails; the first failure is returned and the records
    /// after it are skipped.
    pub fn consume<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Diff>,
    {
        let was_paused = self.pause();
        let root = self.root();
        let mut merged = 0usize;
        let mut outcome = Ok(());
        for record in records {
            if let Err(error) = self.merge(root, record.borrow()) {
                warn!(%error, merged, "failed to replay diff record");
                outcome = Err(error);
                break;
            }
            merged += 1;
        }
        debug!(records = merged, "consumed diff records");
        if !was_paused {
            self.resume();
        }
        outcome
    }

    fn apply(&mut self, id: NodeId, op: &Op) -> Result<()> {
        let variant = self.variant(id)?;
        match (op, variant) {
            (Op::Assign(value), _) => self.assign(id, value.clone()),
            (Op::Set(SetOp { key, value }), _) => self.set(id, key.clone(), value.clone()),
            (Op::Del(key), Variant::Array | Variant::Object) => self.del(id, key.clone()),
            (Op::Inc(amount), Variant::Number) => self.inc(id, *amount).map(drop),
            (Op::Rename(pairs), Variant::Array | Variant::Object) => {
                self.rename_all(id, pairs.iter().cloned())
            }
            (Op::Push(values), Variant::Array) => self.push(id, values.iter().cloned()).map(drop),
            (Op::Pop(count), Variant::Array) => {
                let count = (*count).min(self.len(id)?);
                for _ in 0..count {
                    self.pop(id)?;
                }
                Ok(())
            }
            (Op::Shift(count), Variant::Array) => {
                let count = (*count).min(self.len(id)?);
                for _ in 0..count {
                    self.shift(id)?;
                }
                Ok(())
            }
            (Op::Unshift(values), Variant::Array) => {
                self.unshift(id, values.iter().cloned()).map(drop)
            }
            (
                Op::Splice(SpliceOp {
                    start,
                    delete_count,
                    items,
                }),
                Variant::Array,
            ) => {
                let start = isize::try_from(*start).unwrap_or(isize::MAX);
                self.splice(id, start, *delete_count, items.iter().cloned())
                    .map(drop)
            }
            (Op::Reverse, Variant::Array) => self.reverse(id),
            (op, variant) => Err(Error::UnknownOperation {
                op: op.kind().name().to_string(),
                variant,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Diff, Entry, Error, Event, EventKind, Key, Op, OpKind, Rename, SetOp, Tree, Value,
        Variant, events::recorder::EventRecorder, value,
    };
    use std::{cell::RefCell, rc::Rc};

    /// Captures every diff the root of `tree` emits.
    fn capture(tree: &mut Tree) -> Rc<RefCell<Vec<Diff>>> {
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&out);
        tree.on(tree.root(), EventKind::Diff, move |e| {
            if let Event::Diff(d) = e {
                sink.borrow_mut().push(d.clone());
            }
        })
        .unwrap();
        out
    }

    #[test]
    fn replays_every_kind_of_mutation() {
        let initial = value!({
            "n": 1,
            "list": [1, 2, 3, 4],
            "obj": { "a": 1, "b": 2 },
            "gone": true
        });
        let mut local = Tree::new(initial.clone()).unwrap();
        let mut remote = Tree::new(initial).unwrap();
        let records = capture(&mut local);
        let root = local.root();
        let n = local.get(root, "n").unwrap().unwrap();
        let list = local.get(root, "list").unwrap().unwrap();
        let obj = local.get(root, "obj").unwrap().unwrap();

        local.inc(n, 2.5).unwrap();
        local.push(list, [5]).unwrap();
        local.unshift(list, [0]).unwrap();
        local.pop(list).unwrap();
        local.shift(list).unwrap();
        local.splice(list, 1, 2, ["x"]).unwrap();
        local.reverse(list).unwrap();
        local.set(list, 5, "far").unwrap();
        local.del(list, 0).unwrap();
        local.sort(list).unwrap();
        local.rename(obj, "a", "c").unwrap();
        local.set(obj, "d", value!([null])).unwrap();
        local.del(root, "gone").unwrap();
        local.assign(n, "text").unwrap();

        remote.consume(records.borrow().iter()).unwrap();
        assert_eq!(
            remote.value_of(remote.root()).unwrap(),
            local.value_of(root).unwrap()
        );
    }

    #[test]
    fn name_keys_address_array_elements() {
        let mut tree = Tree::new(value!({ "xs": [[1], [2]] })).unwrap();
        let mut diff = Diff::default();
        diff.child_mut(Key::from("xs"))
            .child_mut(Key::from("1"))
            .record_op(Op::Push(vec![value!(3)]));
        tree.merge(tree.root(), &diff).unwrap();
        assert_eq!(
            tree.value_of(tree.root()).unwrap(),
            value!({ "xs": [[1], [2, 3]] })
        );
    }

    #[test]
    fn missing_children_are_undefined() {
        let mut tree = Tree::new(value!({ "a": 1 })).unwrap();
        let mut diff = Diff::default();
        diff.child_mut(Key::from("b")).record_op(Op::Inc(1.0));
        assert_eq!(
            tree.merge(tree.root(), &diff),
            Err(Error::UndefinedChild(Key::from("b")))
        );
    }

    #[test]
    fn ops_are_checked_against_the_variant() {
        let mut tree = Tree::new(value!({ "s": "x" })).unwrap();
        let mut diff = Diff::default();
        diff.child_mut(Key::from("s")).record_op(Op::Reverse);
        assert_eq!(
            tree.merge(tree.root(), &diff),
            Err(Error::UnknownOperation {
                op: "reverse".into(),
                variant: Variant::String
            })
        );
        assert_eq!(
            tree.merge(tree.root(), &Diff::from(Op::Inc(1.0))),
            Err(Error::UnknownOperation {
                op: "inc".into(),
                variant: Variant::Object
            })
        );
    }

    #[test]
    fn removal_counts_stop_at_the_array_length() {
        let mut tree = Tree::new(value!({ "xs": [1, 2], "ys": [3] })).unwrap();
        let mut diff = Diff::default();
        diff.child_mut(Key::from("xs")).record_op(Op::Pop(usize::MAX / 2));
        diff.child_mut(Key::from("ys")).record_op(Op::Shift(usize::MAX));
        tree.consume([diff]).unwrap();
        assert_eq!(
            tree.value_of(tree.root()).unwrap(),
            value!({ "xs": [], "ys": [] })
        );
    }

    #[test]
    fn oversized_indices_fail_without_leaving_the_tree_paused() {
        let mut tree = Tree::new(value!({ "xs": [] })).unwrap();
        let mut diff = Diff::default();
        diff.child_mut(Key::from("xs")).record_op(Op::Set(SetOp {
            key: Key::Index(usize::MAX),
            value: Value::Null,
        }));
        assert_eq!(
            tree.consume([diff]),
            Err(Error::IndexOutOfRange(usize::MAX))
        );
        assert!(!tree.is_paused());
        assert_eq!(tree.value_of(tree.root()).unwrap(), value!({ "xs": [] }));
    }

    #[test]
    fn paused_batches_replay_grouped_by_operation_name() {
        let mut local = Tree::new(value!({})).unwrap();
        let mut remote = Tree::new(value!({})).unwrap();
        let records = capture(&mut local);
        let root = local.root();

        local.pause();
        local.set(root, "x", 1).unwrap();
        local.del(root, "x").unwrap();
        local.set(root, "x", 2).unwrap();
        local.resume();
        assert_eq!(local.value_of(root).unwrap(), value!({ "x": 2 }));

        let records = records.borrow();
        assert_eq!(records.len(), 1);
        let kinds: Vec<_> = records[0]
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Op(ops) => Some(ops.iter().map(Op::kind).collect::<Vec<_>>()),
                Entry::Child(..) => None,
            })
            .collect();
        assert_eq!(
            kinds,
            [vec![OpKind::Set, OpKind::Set], vec![OpKind::Del]]
        );

        // both sets replay before the delete, so the replica ends up without `x`
        remote.consume(records.iter()).unwrap();
        assert_eq!(remote.value_of(remote.root()).unwrap(), value!({}));
    }

    #[test]
    fn consume_batches_and_resumes_on_failure() {
        let mut tree = Tree::new(value!({ "a": 1 })).unwrap();
        let root = tree.root();
        let recorder = EventRecorder::new();
        recorder.attach(&mut tree, root, "root").unwrap();

        let good = Diff::from(Op::Set(SetOp {
            key: Key::from("b"),
            value: value!(2),
        }));
        let also_good = Diff::from(Op::Rename(vec![Rename::new("a", "c")]));
        tree.consume([&good, &also_good]).unwrap();
        assert_eq!(
            recorder.take(),
            [
                "root: add b",
                "root: rename a -> c",
                "root: signal",
                "root: change",
                "root: diff"
            ]
        );

        let bad = Diff::from(Op::Del(Key::from("nope")));
        let never = Diff::from(Op::Set(SetOp {
            key: Key::from("z"),
            value: Value::Null,
        }));
        assert_eq!(
            tree.consume(vec![good.clone(), bad, never]),
            Err(Error::UndefinedKey(Key::from("nope")))
        );
        assert!(!tree.is_paused());
        // the first record applied as an update of the existing `b`, the last one never ran
        assert_eq!(tree.value_of(root).unwrap(), value!({ "b": 2, "c": 1 }));
    }
}

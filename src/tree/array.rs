// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Operations on array nodes.
//!
//! Elements are keyed by their index, and every operation restores that after it ran: elements
//! behind an insertion or removal are reindexed silently, while elements moved by
//! [`Tree::reverse`], [`Tree::sort_by`] or a rename emit a [`Event::Rename`] each.
use super::{NodeId, Payload, Tree};
use crate::{
    Error, Key, Op, OpKind, Rename, SetOp, SpliceOp, Value, Variant, error::Result,
    events::Event, value::Position,
};
use std::{cmp::Ordering, ops::Range};

/// The largest index an array element can have; arrays hold at most `u32::MAX` elements.
pub(crate) const MAX_INDEX: usize = u32::MAX as usize - 1;

/// An argument to [`Tree::concat`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConcatItem {
    /// A node of the tree being concatenated from.
    Node(NodeId),
    Value(Value),
}

impl From<NodeId> for ConcatItem {
    fn from(id: NodeId) -> Self {
        ConcatItem::Node(id)
    }
}

impl From<Value> for ConcatItem {
    fn from(value: Value) -> Self {
        ConcatItem::Value(value)
    }
}

/// Validates and normalizes values about to become array elements.
fn elements_from<I>(values: I) -> Result<Vec<Value>>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    values
        .into_iter()
        .map(|value| {
            let value = value.into();
            value.validate(Position::Element)?;
            Ok(value.normalized())
        })
        .collect()
}

/// A total order over values: by variant first (absent last), then by content.
fn natural_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
            Value::Absent => 6,
        }
    }
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl Tree {
    /// The elements of `id`, or [`Error::UnknownOperation`] naming `op` if it is no array.
    fn elements(&self, id: NodeId, op: OpKind) -> Result<&Vec<NodeId>> {
        match &self.node(id)?.payload {
            Payload::Array(items) => Ok(items),
            other => Err(Error::UnknownOperation {
                op: op.name().to_string(),
                variant: other.variant(),
            }),
        }
    }

    fn elements_mut(&mut self, id: NodeId, op: OpKind) -> Result<&mut Vec<NodeId>> {
        match &mut self.node_mut(id)?.payload {
            Payload::Array(items) => Ok(items),
            other => Err(Error::UnknownOperation {
                op: op.name().to_string(),
                variant: other.variant(),
            }),
        }
    }

    /// Rewrites the key of every element from `from` onwards to its current index.
    fn reindex(&mut self, id: NodeId, from: usize, op: OpKind) -> Result<()> {
        let tail = self
            .elements(id, op)?
            .get(from..)
            .unwrap_or_default()
            .to_vec();
        for (offset, child) in tail.into_iter().enumerate() {
            if let Some(node) = self.lookup_mut(child) {
                node.key = Some(Key::Index(from + offset));
            }
        }
        Ok(())
    }

    /// Conjures `values` as elements starting at index `at`, emitting one `add` per element.
    fn insert_elements(
        &mut self,
        id: NodeId,
        at: usize,
        values: Vec<Value>,
        op: OpKind,
    ) -> Result<()> {
        let inserted: Vec<NodeId> = values
            .into_iter()
            .enumerate()
            .map(|(offset, value)| self.conjure(value, Some(id), Some(Key::Index(at + offset))))
            .collect();
        let count = inserted.len();
        self.elements_mut(id, op)?.splice(at..at, inserted);
        self.reindex(id, at + count, op)?;
        for index in at..at + count {
            self.emit(id, Event::Add(Key::Index(index)));
        }
        Ok(())
    }

    /// Removes and destroys the elements in `range`, emitting one `del` per original index.
    fn remove_elements(&mut self, id: NodeId, range: Range<usize>, op: OpKind) -> Result<()> {
        let removed: Vec<NodeId> = self.elements_mut(id, op)?.drain(range.clone()).collect();
        self.reindex(id, range.start, op)?;
        for (index, child) in range.zip(removed) {
            self.emit(id, Event::Del(Key::Index(index)));
            self.destroy(child);
        }
        Ok(())
    }

    /// Reorders the elements so that position `i` holds the element previously at `order[i]`.
    ///
    /// Returns the moves that happened, emitting a `rename` for each.
    fn permute(&mut self, id: NodeId, order: &[usize], op: OpKind) -> Result<Vec<Rename>> {
        let previous = self.elements(id, op)?.clone();
        *self.elements_mut(id, op)? = order.iter().map(|&from| previous[from]).collect();
        self.reindex(id, 0, op)?;
        let moved: Vec<Rename> = order
            .iter()
            .enumerate()
            .filter(|(to, from)| *to != **from)
            .map(|(to, &from)| Rename::new(from, to))
            .collect();
        for rename in &moved {
            self.emit(
                id,
                Event::Rename {
                    from: rename.o.clone(),
                    to: rename.n.clone(),
                },
            );
        }
        Ok(moved)
    }

    /// `set` on an array: assigns an existing element or grows the array up to `index`,
    /// filling the gap with absent elements. An absent slot counts as a new element.
    pub(super) fn set_index(&mut self, id: NodeId, index: usize, value: Value) -> Result<()> {
        value.validate(Position::Element)?;
        let items = self.elements(id, OpKind::Set)?;
        let (existing, len) = (items.get(index).copied(), items.len());
        match existing {
            Some(child) if self.variant(child)? != Variant::Absent => {
                return self.assign(child, value);
            }
            Some(_) if value.is_absent() => return Ok(()),
            Some(hole) => {
                let value = value.normalized();
                let child = self.conjure(value.clone(), Some(id), Some(Key::Index(index)));
                self.elements_mut(id, OpKind::Set)?[index] = child;
                self.emit(id, Event::Add(Key::Index(index)));
                self.destroy(hole);
                self.diff(
                    id,
                    Op::Set(SetOp {
                        key: Key::Index(index),
                        value,
                    }),
                );
                return Ok(());
            }
            None => {}
        }
        if index > MAX_INDEX {
            return Err(Error::IndexOutOfRange(index));
        }
        let gap = index - len;
        let mut fill = Vec::new();
        fill.try_reserve_exact(gap + 1)
            .map_err(|_| Error::IndexOutOfRange(index))?;
        if !self.reserve_nodes(gap + 1) {
            return Err(Error::IndexOutOfRange(index));
        }
        let value = value.normalized();
        fill.resize(gap, Value::Absent);
        fill.push(value.clone());
        self.insert_elements(id, len, fill, OpKind::Set)?;
        self.diff(
            id,
            Op::Set(SetOp {
                key: Key::Index(index),
                value,
            }),
        );
        Ok(())
    }

    /// `del` on an array: the element is destroyed and its slot becomes absent.
    pub(super) fn del_index(&mut self, id: NodeId, key: &Key) -> Result<()> {
        let undefined = || Error::UndefinedKey(key.clone());
        let index = key.as_index().ok_or_else(undefined)?;
        let child = self
            .elements(id, OpKind::Del)?
            .get(index)
            .copied()
            .ok_or_else(undefined)?;
        if self.variant(child)? == Variant::Absent {
            return Err(Error::NotAChild(Key::Index(index)));
        }
        let hole = self.conjure(Value::Absent, Some(id), Some(Key::Index(index)));
        self.elements_mut(id, OpKind::Del)?[index] = hole;
        self.emit(id, Event::Del(Key::Index(index)));
        self.destroy(child);
        self.diff(id, Op::Del(Key::Index(index)));
        Ok(())
    }

    /// Appends `values`, returning the new length.
    pub fn push<I>(&mut self, id: NodeId, values: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let len = self.elements(id, OpKind::Push)?.len();
        let values = elements_from(values)?;
        if values.is_empty() {
            return Ok(len);
        }
        let count = values.len();
        self.insert_elements(id, len, values.clone(), OpKind::Push)?;
        self.diff(id, Op::Push(values));
        Ok(len + count)
    }

    /// Removes the last element and returns its value; `None` if the array is empty.
    pub fn pop(&mut self, id: NodeId) -> Result<Option<Value>> {
        let Some(&last) = self.elements(id, OpKind::Pop)?.last() else {
            return Ok(None);
        };
        let value = self.value_of(last)?;
        let len = self.elements(id, OpKind::Pop)?.len();
        self.remove_elements(id, len - 1..len, OpKind::Pop)?;
        self.diff(id, Op::Pop(1));
        Ok(Some(value))
    }

    /// Removes the first element and returns its value; `None` if the array is empty.
    pub fn shift(&mut self, id: NodeId) -> Result<Option<Value>> {
        let Some(&first) = self.elements(id, OpKind::Shift)?.first() else {
            return Ok(None);
        };
        let value = self.value_of(first)?;
        self.remove_elements(id, 0..1, OpKind::Shift)?;
        self.diff(id, Op::Shift(1));
        Ok(Some(value))
    }

    /// Prepends `values`, returning the new length.
    pub fn unshift<I>(&mut self, id: NodeId, values: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let len = self.elements(id, OpKind::Unshift)?.len();
        let values = elements_from(values)?;
        if values.is_empty() {
            return Ok(len);
        }
        let count = values.len();
        self.insert_elements(id, 0, values.clone(), OpKind::Unshift)?;
        self.diff(id, Op::Unshift(values));
        Ok(len + count)
    }

    /// Removes `delete_count` elements starting at `start` and inserts `items` in their place,
    /// returning the values of the removed elements.
    ///
    /// A negative `start` counts from the end. Both `start` and `delete_count` are clamped to
    /// the array, and the clamped values are what gets recorded.
    pub fn splice<I>(
        &mut self,
        id: NodeId,
        start: isize,
        delete_count: usize,
        items: I,
    ) -> Result<Vec<Value>>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let elements = self.elements(id, OpKind::Splice)?;
        let len = elements.len();
        let start = if start < 0 {
            len.saturating_sub(start.unsigned_abs())
        } else {
            start.unsigned_abs().min(len)
        };
        let delete_count = delete_count.min(len - start);
        let removed_ids = elements[start..start + delete_count].to_vec();
        let items = elements_from(items)?;
        if delete_count == 0 && items.is_empty() {
            return Ok(Vec::new());
        }
        let removed = removed_ids
            .into_iter()
            .map(|child| self.value_of(child))
            .collect::<Result<Vec<_>>>()?;
        self.remove_elements(id, start..start + delete_count, OpKind::Splice)?;
        self.insert_elements(id, start, items.clone(), OpKind::Splice)?;
        self.diff(
            id,
            Op::Splice(SpliceOp {
                start,
                delete_count,
                items,
            }),
        );
        Ok(removed)
    }

    /// Reverses the elements in place.
    pub fn reverse(&mut self, id: NodeId) -> Result<()> {
        let len = self.elements(id, OpKind::Reverse)?.len();
        if len < 2 {
            return Ok(());
        }
        let order: Vec<usize> = (0..len).rev().collect();
        self.permute(id, &order, OpKind::Reverse)?;
        self.diff(id, Op::Reverse);
        Ok(())
    }

    /// Sorts the elements in their natural order: by variant, with absent elements last, then
    /// by content.
    pub fn sort(&mut self, id: NodeId) -> Result<()> {
        self.sort_by(id, natural_order)
    }

    /// Stably sorts the elements by comparing their values.
    ///
    /// Sorting is recorded as a `rename` listing every element that moved.
    pub fn sort_by<F>(&mut self, id: NodeId, mut compare: F) -> Result<()>
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let values = self
            .elements(id, OpKind::Rename)?
            .clone()
            .into_iter()
            .map(|child| self.value_of(child))
            .collect::<Result<Vec<_>>>()?;
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|a, b| compare(&values[*a], &values[*b]));
        if order.iter().enumerate().all(|(to, from)| to == *from) {
            return Ok(());
        }
        let moved = self.permute(id, &order, OpKind::Rename)?;
        self.diff(id, Op::Rename(moved));
        Ok(())
    }

    /// Moves elements from index `o` to index `n` for every pair.
    ///
    /// The pairs must describe a permutation: every index in range, no index moving or being
    /// filled twice, and every vacated index filled again.
    pub(super) fn rename_indices(&mut self, id: NodeId, pairs: Vec<Rename>) -> Result<()> {
        let len = self.elements(id, OpKind::Rename)?.len();
        let mut order: Vec<usize> = (0..len).collect();
        let mut sources = vec![false; len];
        let mut targets = vec![false; len];
        let mut moves = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let (Some(o), Some(n)) = (pair.o.as_index(), pair.n.as_index()) else {
                return Err(Error::InvalidRename(format!(
                    "`{}` -> `{}` is not a pair of indices",
                    pair.o, pair.n
                )));
            };
            if o >= len || n >= len {
                return Err(Error::InvalidRename(format!(
                    "{o} -> {n} is out of bounds for length {len}"
                )));
            }
            if o == n {
                continue;
            }
            if std::mem::replace(&mut sources[o], true) {
                return Err(Error::InvalidRename(format!("index {o} moves twice")));
            }
            if std::mem::replace(&mut targets[n], true) {
                return Err(Error::InvalidRename(format!("index {n} is filled twice")));
            }
            order[n] = o;
            moves.push(Rename::new(o, n));
        }
        if sources != targets {
            return Err(Error::InvalidRename(
                "renames leave an index vacant".to_string(),
            ));
        }
        if moves.is_empty() {
            return Ok(());
        }
        self.permute(id, &order, OpKind::Rename)?;
        self.diff(id, Op::Rename(moves));
        Ok(())
    }

    /// Builds a new tree holding the elements of `id` followed by every item; array items
    /// contribute their elements, anything else is appended as a single element.
    pub fn concat<I>(&self, id: NodeId, items: I) -> Result<Tree>
    where
        I: IntoIterator,
        I::Item: Into<ConcatItem>,
    {
        self.elements(id, OpKind::Push)?;
        let Value::Array(mut out) = self.value_of(id)? else {
            unreachable!("checked to be an array above");
        };
        for item in items {
            let value = match item.into() {
                ConcatItem::Node(node) => self.value_of(node)?,
                ConcatItem::Value(value) => value,
            };
            match value {
                Value::Array(values) => out.extend(values),
                other => out.push(other),
            }
        }
        Tree::new(Value::Array(out))
    }

    /// The index of the first element equal to `value`.
    pub fn index_of(&self, id: NodeId, value: &Value) -> Result<Option<usize>> {
        for (index, child) in self.elements(id, OpKind::Push)?.iter().enumerate() {
            if self.value_of(*child)? == *value {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

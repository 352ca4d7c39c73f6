// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{NodeId, Payload, Props, Tree};
use crate::{Error, Key, Op, Rename, TomesRandomState, Variant, error::Result, events::Event};
use std::collections::HashSet;

impl Tree {
    /// Moves the child under `from` to `to`.
    ///
    /// See [`Tree::rename_all`].
    pub fn rename(&mut self, id: NodeId, from: impl Into<Key>, to: impl Into<Key>) -> Result<()> {
        self.rename_all(id, [Rename::new(from, to)])
    }

    /// Moves children from `o` to `n` for every pair, in order.
    ///
    /// On objects, a missing `o` fails with [`Error::UndefinedKey`] before anything is renamed.
    /// A property already present under `n` is removed and destroyed first, and the renamed
    /// property moves to the end of the key order. All pairs are recorded as a single `rename`.
    ///
    /// On arrays, the pairs must describe a permutation of the indices, otherwise the call fails
    /// with [`Error::InvalidRename`].
    pub fn rename_all<I>(&mut self, id: NodeId, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = Rename>,
    {
        let pairs = pairs.into_iter().collect();
        match self.variant(id)? {
            Variant::Array => self.rename_indices(id, pairs),
            Variant::Object => self.rename_properties(id, pairs),
            variant => Err(Error::UnknownOperation {
                op: "rename".to_string(),
                variant,
            }),
        }
    }

    fn properties_mut(&mut self, id: NodeId) -> Option<&mut Props> {
        match &mut self.lookup_mut(id)?.payload {
            Payload::Object(props) => Some(props),
            _ => None,
        }
    }

    fn rename_properties(&mut self, id: NodeId, pairs: Vec<Rename>) -> Result<()> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|pair| (pair.o.to_name(), pair.n.to_name()))
            .filter(|(o, n)| o != n)
            .collect();
        if pairs.is_empty() {
            return Ok(());
        }

        let mut keys: HashSet<&str, TomesRandomState> = match &self.node(id)?.payload {
            Payload::Object(props) => props.keys().map(String::as_str).collect(),
            _ => HashSet::default(),
        };
        for (o, n) in &pairs {
            if !keys.remove(o.as_str()) {
                return Err(Error::UndefinedKey(Key::Name(o.clone())));
            }
            keys.insert(n.as_str());
        }

        let was_paused = self.pause();
        for (o, n) in &pairs {
            // validated above; the node stays an object while its properties move
            let Some(props) = self.properties_mut(id) else {
                break;
            };
            let Some(child) = props.shift_remove(o) else {
                continue;
            };
            let occupant = props.shift_remove(n);
            props.insert(n.clone(), child);
            if let Some(node) = self.lookup_mut(child) {
                node.key = Some(Key::Name(n.clone()));
            }
            if let Some(occupant) = occupant {
                self.emit(id, Event::Del(Key::Name(n.clone())));
                self.destroy(occupant);
            }
            self.emit(
                id,
                Event::Rename {
                    from: Key::Name(o.clone()),
                    to: Key::Name(n.clone()),
                },
            );
        }
        self.diff(
            id,
            Op::Rename(pairs.into_iter().map(|(o, n)| Rename::new(o, n)).collect()),
        );
        if !was_paused {
            self.resume();
        }
        Ok(())
    }
}

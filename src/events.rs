// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Observe changes to the nodes of a [`Tree`].
//!
//! Every node carries its own listener list. There are seven event kinds:
//!
//! - [`Event::Add`], [`Event::Del`] and [`Event::Rename`] are emitted by a container when one of
//!   its keys appears, disappears or moves.
//! - [`Event::Destroy`] is emitted by a node right before it ceases to exist.
//! - [`Event::Signal`], [`Event::Change`] and [`Event::Diff`] are the aggregate events: they are
//!   emitted by a node whenever it or any of its descendants changed. `Signal` and `Change`
//!   carry the node's current value, `Diff` carries the node's pending [`Diff`] record.
//!
//! Subscribing to [`EventKind::Signal`] immediately invokes the new listener once with the
//! node's current value, so observers get an initial snapshot without special-casing.
//!
//! While a tree is [paused](Tree::pause), structural events are buffered and aggregate events
//! are not emitted at all; [`Tree::resume`] flushes the buffer (all `Add`s, then all `Del`s,
//! then all `Rename`s, then all `Destroy`s) and then emits one aggregate triple per node with a
//! pending diff.
use crate::{Diff, Key, NodeId, Tree, TomesRandomState, Value, create_map, error::Result};
use smallvec::SmallVec;
use std::{collections::HashMap, fmt};
use tracing::debug;

pub mod recorder;

/// An event emitted by a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Add(Key),
    Del(Key),
    Rename { from: Key, to: Key },
    Destroy,
    Signal(Value),
    Change(Value),
    Diff(Diff),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Add(_) => EventKind::Add,
            Event::Del(_) => EventKind::Del,
            Event::Rename { .. } => EventKind::Rename,
            Event::Destroy => EventKind::Destroy,
            Event::Signal(_) => EventKind::Signal,
            Event::Change(_) => EventKind::Change,
            Event::Diff(_) => EventKind::Diff,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Add(key) => write!(f, "add {key}"),
            Event::Del(key) => write!(f, "del {key}"),
            Event::Rename { from, to } => write!(f, "rename {from} -> {to}"),
            Event::Destroy => f.write_str("destroy"),
            Event::Signal(_) => f.write_str("signal"),
            Event::Change(_) => f.write_str("change"),
            Event::Diff(_) => f.write_str("diff"),
        }
    }
}

/// The kind of an [`Event`], used to pick which events a listener receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Add,
    Del,
    Rename,
    Destroy,
    Signal,
    Change,
    Diff,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Add,
        EventKind::Del,
        EventKind::Rename,
        EventKind::Destroy,
        EventKind::Signal,
        EventKind::Change,
        EventKind::Diff,
    ];

    /// The order in which buffered structural events are flushed.
    const FLUSH_ORDER: [EventKind; 4] = [
        EventKind::Add,
        EventKind::Del,
        EventKind::Rename,
        EventKind::Destroy,
    ];
}

/// Identifies a registered listener, for [`Tree::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&Event)>;

#[derive(Default)]
pub(crate) struct Listeners {
    entries: SmallVec<[(ListenerId, EventKind, Listener); 2]>,
}

impl Listeners {
    fn add(&mut self, id: ListenerId, kind: EventKind, listener: Listener) {
        self.entries.push((id, kind, listener));
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(listener_id, _, _)| *listener_id != id);
        self.entries.len() != before
    }

    pub(crate) fn wants(&self, kind: EventKind) -> bool {
        self.entries.iter().any(|(_, k, _)| *k == kind)
    }

    pub(crate) fn notify(&mut self, event: &Event) {
        let kind = event.kind();
        for (_, _, listener) in self.entries.iter_mut().filter(|(_, k, _)| *k == kind) {
            listener(event);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, kind, _)| (id, kind)))
            .finish()
    }
}

/// Structural events deferred while the tree is paused.
#[derive(Debug)]
pub(crate) struct Buffer {
    events: Vec<(NodeId, Event)>,
    // listeners of nodes destroyed while paused; their buffered events still reach them.
    graveyard: HashMap<NodeId, Listeners, TomesRandomState>,
}

impl Default for Buffer {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            graveyard: create_map(),
        }
    }
}

impl Buffer {
    pub(crate) fn push(&mut self, target: NodeId, event: Event) {
        self.events.push((target, event));
    }

    pub(crate) fn bury(&mut self, target: NodeId, listeners: Listeners) {
        if !listeners.entries.is_empty() {
            self.graveyard.insert(target, listeners);
        }
    }
}

impl Tree {
    /// Registers `listener` for events of `kind` emitted by `node`.
    ///
    /// Subscribing to [`EventKind::Signal`] invokes the listener once, immediately, with the
    /// node's current value.
    pub fn on<F>(&mut self, node: NodeId, kind: EventKind, listener: F) -> Result<ListenerId>
    where
        F: FnMut(&Event) + 'static,
    {
        let mut listener: Listener = Box::new(listener);
        if kind == EventKind::Signal {
            listener(&Event::Signal(self.value_of(node)?));
        }
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.node_mut(node)?.listeners.add(id, kind, listener);
        Ok(id)
    }

    /// Removes a listener previously registered on `node`.
    ///
    /// Returns `false` if no such listener was registered.
    pub fn off(&mut self, node: NodeId, listener: ListenerId) -> Result<bool> {
        Ok(self.node_mut(node)?.listeners.remove(listener))
    }

    /// Starts buffering events.
    ///
    /// Returns `false` if the tree was freshly paused and `true` if it was already paused, in
    /// which case this is a no-op. Pausing does not nest: the first [`Tree::resume`] flushes.
    pub fn pause(&mut self) -> bool {
        if self.buffer.is_some() {
            return true;
        }
        debug!("pausing tree");
        self.buffer = Some(Buffer::default());
        false
    }

    /// Flushes buffered events and emits aggregate events for every changed node.
    ///
    /// Returns `false` if the tree was not paused.
    pub fn resume(&mut self) -> bool {
        let Some(Buffer {
            events,
            mut graveyard,
        }) = self.buffer.take()
        else {
            return false;
        };
        debug!(
            events = events.len(),
            destroyed = graveyard.len(),
            "resuming tree"
        );
        for kind in EventKind::FLUSH_ORDER {
            for (target, event) in events.iter().filter(|(_, e)| e.kind() == kind) {
                if let Some(node) = self.lookup_mut(*target) {
                    node.listeners.notify(event);
                } else if let Some(listeners) = graveyard.get_mut(target) {
                    listeners.notify(event);
                }
            }
        }
        self.notify_dirty(self.root());
        true
    }

    /// Returns `true` if the tree is currently paused.
    pub fn is_paused(&self) -> bool {
        self.buffer.is_some()
    }

    /// Emits the aggregate events of `node` and of every descendant with a pending diff, then
    /// clears their pending diffs.
    ///
    /// Calling this twice without an intervening mutation emits nothing the second time.
    pub fn notify(&mut self, node: NodeId) -> Result<()> {
        self.node(node)?;
        self.notify_dirty(node);
        Ok(())
    }

    fn notify_dirty(&mut self, node: NodeId) {
        if !self.emit_aggregate(node) {
            return;
        }
        let dirty: Vec<NodeId> = self
            .lookup(node)
            .map(|n| n.payload.children())
            .unwrap_or_default()
            .into_iter()
            .filter(|child| self.lookup(*child).is_some_and(|c| !c.pending.is_empty()))
            .collect();
        for child in dirty {
            self.notify_dirty(child);
        }
    }

    /// Emits `signal`, `change` and `diff` for the pending diff of `node`, clearing it.
    ///
    /// Returns `false` if nothing was pending.
    pub(crate) fn emit_aggregate(&mut self, node: NodeId) -> bool {
        let Some(n) = self.lookup(node) else {
            return false;
        };
        if n.pending.is_empty() {
            return false;
        }
        let wants_value =
            n.listeners.wants(EventKind::Signal) || n.listeners.wants(EventKind::Change);
        let value = wants_value.then(|| self.project(n));
        let Some(n) = self.lookup_mut(node) else {
            return false;
        };
        let diff = std::mem::take(&mut n.pending);
        if let Some(value) = value {
            n.listeners.notify(&Event::Signal(value.clone()));
            n.listeners.notify(&Event::Change(value));
        }
        n.listeners.notify(&Event::Diff(diff));
        true
    }

    /// Emits a structural event, or buffers it while paused.
    pub(crate) fn emit(&mut self, node: NodeId, event: Event) {
        if let Some(buffer) = &mut self.buffer {
            buffer.push(node, event);
        } else if let Some(n) = self.lookup_mut(node) {
            n.listeners.notify(&event);
        }
    }
}

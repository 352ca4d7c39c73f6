// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! A listener that records every event it receives in a human readable form. This is mostly
//! useful for tests.

use crate::{Event, EventKind, NodeId, Tree, error::Result};
use std::{cell::RefCell, rc::Rc};

/// Records events from any number of nodes into one shared log.
///
/// Each entry reads `"<label>: <event>"`, for example `"root: add b"`.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    log: Rc<RefCell<Vec<String>>>,
}

impl EventRecorder {
    pub fn new() -> EventRecorder {
        EventRecorder::default()
    }

    /// A listener that appends to this recorder's log under `label`.
    pub fn listener(&self, label: &str) -> impl FnMut(&Event) + 'static {
        let log = Rc::clone(&self.log);
        let label = label.to_string();
        move |event| log.borrow_mut().push(format!("{label}: {event}"))
    }

    /// Subscribes to every event kind of `node`.
    ///
    /// The snapshot that a `Signal` subscription replays is not a change and is not recorded.
    pub fn attach(&self, tree: &mut Tree, node: NodeId, label: &str) -> Result<()> {
        let before = self.log.borrow().len();
        for kind in EventKind::ALL {
            tree.on(node, kind, self.listener(label))?;
        }
        self.log.borrow_mut().truncate(before);
        Ok(())
    }

    /// A string-representation of each event seen so far.
    pub fn changes_seen(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Returns and forgets the events seen so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

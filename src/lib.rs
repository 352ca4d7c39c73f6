// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # Tomes: Observable Trees for JSON-like Data
//!
//! This crate maintains an in-memory tree that mirrors a JSON-like value (null, boolean, number,
//! string, array, object; array elements may additionally be [absent](Value::Absent)). Every
//! node of the tree is independently observable, and every mutation produces a small,
//! mergeable [`Diff`] that can be replayed against another copy of the tree.
//!
//! The primary goal of this library is to keep two independently held copies of the same
//! logical state consistent without re-sending the whole value after every change.
//!
//! ## Core Concepts
//!
//! - [`Tree`]: owns every node of one tree. Nodes are addressed by [`NodeId`] handles; the root
//!   is available via [`Tree::root`].
//! - [`Value`]: the plain value a node represents. Trees are built from values and project back
//!   into values with [`Tree::value_of`].
//! - [`Diff`]: a record of the mutations applied to a node and its descendants since the last
//!   flush. Records chain upwards: the root's record describes every change in the tree.
//! - [`Event`]: what listeners registered with [`Tree::on`] receive. Structural events (`Add`,
//!   `Del`, `Rename`, `Destroy`) are local to the node they happen on; aggregate events
//!   (`Signal`, `Change`, `Diff`) are emitted by the changed node and every ancestor.
//!
//! ## Batching
//!
//! [`Tree::pause`] defers every event until [`Tree::resume`]. While paused, diffs accumulate on
//! every touched node, and resuming emits exactly one aggregate event per touched node.
//! [`Tree::consume`] uses this to apply a batch of remote records atomically from the point of
//! view of observers.
//!
//! ## Getting Started: Keeping Two Trees in Sync
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//! use tomes::{Event, EventKind, Tree, value};
//!
//! // 1. SETUP: TWO COPIES OF THE SAME STATE
//! let initial = value!({ "count": 1, "items": ["a"] });
//! let mut alice = Tree::new(initial.clone())?;
//! let mut bob = Tree::new(initial)?;
//!
//! // 2. CAPTURE: collect every diff alice's root emits
//! let outbox = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&outbox);
//! alice.on(alice.root(), EventKind::Diff, move |event| {
//!     if let Event::Diff(diff) = event {
//!         sink.borrow_mut().push(diff.clone());
//!     }
//! })?;
//!
//! // 3. MUTATE
//! let root = alice.root();
//! let count = alice.get(root, "count")?.unwrap();
//! alice.inc(count, 5.0)?;
//! let items = alice.get(root, "items")?.unwrap();
//! alice.push(items, [value!("b")])?;
//!
//! // 4. REPLAY: bob applies the records as one batch
//! bob.consume(outbox.borrow().iter())?;
//! assert_eq!(alice.value_of(root)?, bob.value_of(bob.root())?);
//! # Ok::<(), tomes::Error>(())
//! ```
//!
//! **It does not include any networking protocols.** Shipping diff records between trees is
//! up to you; with the `serde` feature, records serialize to a documented, stable format.
//!
//! ## Features
//!
//! - `json`: Enables conversions to and from `serde_json::Value`. This feature is enabled by
//!   default.
//! - `serde`: Provides `serde` support for [`Diff`], [`Value`] and [`Key`].
//! - `arbitrary`: Implements `quickcheck::Arbitrary` for [`Value`], useful for property-based
//!   testing.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

use ahash::RandomState;
use std::{
    collections::HashMap,
    hash::BuildHasher,
    sync::atomic::{AtomicBool, Ordering},
};

pub mod diff;
pub use diff::{Diff, Entry, Occurrences, Op, OpKind, Rename, SetOp, SpliceOp};
pub mod error;
pub use error::{Error, Result};
pub mod events;
pub use events::{Event, EventKind, ListenerId};
#[cfg(feature = "json")]
mod json;
/// Macros usable for tests and initialization
pub mod macros;
mod tree;
pub use tree::{ConcatItem, NodeId, Tree};
pub mod value;
pub use value::{Key, Value, Variant};

#[cfg(any(test, feature = "arbitrary"))]
pub mod test_util;

/// Seeds every hasher in the crate once [`enable_determinism`] is called.
const FIXED_SEEDS: [u64; 4] = [48, 1516, 23, 42];

static DETERMINISTIC: AtomicBool = AtomicBool::new(false);

/// Switches every hasher created from now on to fixed seeds.
///
/// Meant for benchmarks and tests only: fixed seeds make hash flooding trivial.
#[doc(hidden)]
pub fn enable_determinism() {
    DETERMINISTIC.store(true, Ordering::Release);
}

#[doc(hidden)]
pub fn determinism_enabled() -> bool {
    DETERMINISTIC.load(Ordering::Acquire)
}

pub(crate) fn create_map<K, V>() -> HashMap<K, V, TomesRandomState> {
    HashMap::default()
}

/// The hasher behind every map and set the crate keeps.
///
/// Randomly seeded per instance unless [`enable_determinism`] was called before it was
/// created.
#[derive(Clone, Debug)]
pub struct TomesRandomState(RandomState);

impl Default for TomesRandomState {
    #[inline]
    fn default() -> Self {
        let [k0, k1, k2, k3] = FIXED_SEEDS;
        Self(if determinism_enabled() {
            RandomState::with_seeds(k0, k1, k2, k3)
        } else {
            RandomState::new()
        })
    }
}

impl BuildHasher for TomesRandomState {
    type Hasher = <RandomState as BuildHasher>::Hasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        self.0.build_hasher()
    }
}

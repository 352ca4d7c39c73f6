// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Errors raised by tree operations.
//!
//! Every error is returned synchronously to the caller of the failing operation. Operations
//! validate their input before they touch the tree, so an `Err` never leaves a node half
//! mutated.

use crate::{Key, NodeId, Variant};
use thiserror::Error;

/// Errors that can occur while building, mutating or replaying a tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The value cannot be represented by any of the seven variants.
    #[error("invalid value type: {0}")]
    InvalidValueType(String),

    /// An absent value was supplied outside of an array element position.
    #[error("absent values are only allowed as array elements")]
    InvalidElementType,

    /// The key does not exist on the node.
    #[error("undefined key `{0}`")]
    UndefinedKey(Key),

    /// The key exists but does not reference a managed child.
    #[error("key `{0}` does not reference a child")]
    NotAChild(Key),

    /// A diff record carries an operation the target node cannot interpret.
    #[error("unknown operation `{op}` for a {variant} node")]
    UnknownOperation { op: String, variant: Variant },

    /// A diff record refers to a child that does not exist on the target node.
    #[error("undefined child `{0}`")]
    UndefinedChild(Key),

    /// An increment amount was not a finite number.
    #[error("increment amount is not a number")]
    NotANumber,

    /// The node has been destroyed and its id is no longer valid.
    #[error("node {0} has been destroyed")]
    Destroyed(NodeId),

    /// An array index lies beyond the largest length an array can grow to.
    #[error("index {0} exceeds the maximum array length")]
    IndexOutOfRange(usize),

    /// A bulk array rename does not describe a permutation of the array.
    #[error("invalid rename: {0}")]
    InvalidRename(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

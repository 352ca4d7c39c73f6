// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{NodeId, Payload, Tree};
use crate::{Error, Op, error::Result};

impl Tree {
    /// Adds `amount` to a number node and returns the new value.
    ///
    /// Incrementing by zero records nothing.
    pub fn inc(&mut self, id: NodeId, amount: f64) -> Result<f64> {
        let node = self.node_mut(id)?;
        let variant = node.payload.variant();
        let Payload::Number(n) = &mut node.payload else {
            return Err(Error::UnknownOperation {
                op: "inc".to_string(),
                variant,
            });
        };
        let next = *n + amount;
        if !next.is_finite() {
            return Err(Error::NotANumber);
        }
        if amount == 0.0 {
            return Ok(*n);
        }
        *n = next;
        self.diff(id, Op::Inc(amount));
        Ok(next)
    }
}

//! Provisional serial numbers for staged readings.

use crate::error::StoreError;
use crate::store::Store;
use std::collections::HashMap;
use tracing::debug;

/// Source of the highest serial number already used for an order.
pub trait SerialSource {
    /// Highest serial used for `order_id`; 0 when none.
    fn max_serial(&self, order_id: i64) -> Result<i64, StoreError>;
}

impl SerialSource for Store {
    fn max_serial(&self, order_id: i64) -> Result<i64, StoreError> {
        Store::max_serial(self, order_id)
    }
}

/// Per-session serial cache.
///
/// The persisted maximum is read once per order, then the cache counts up
/// locally. A number is only consumed by [`SerialSequencer::advance`], which
/// the session calls after a batch has been staged.
#[derive(Debug, Default)]
pub struct SerialSequencer {
    last: HashMap<i64, i64>,
}

impl SerialSequencer {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The serial the next staged reading of `order_id` would get.
    pub fn peek(&mut self, source: &dyn SerialSource, order_id: i64) -> Result<i64, StoreError> {
        let last = match self.last.get(&order_id) {
            Some(last) => *last,
            None => {
                let max = source.max_serial(order_id)?;
                debug!(order_id, max, "serial cache primed");
                self.last.insert(order_id, max);
                max
            }
        };
        Ok(last + 1)
    }

    /// Consume the next serial of `order_id` and return it.
    pub fn advance(&mut self, source: &dyn SerialSource, order_id: i64) -> Result<i64, StoreError> {
        let next = self.peek(source, order_id)?;
        self.last.insert(order_id, next);
        Ok(next)
    }

    /// Move the cache past serials the store actually assigned.
    pub fn observe(&mut self, order_id: i64, serial: i64) {
        let last = self.last.entry(order_id).or_insert(serial);
        if *last < serial {
            *last = serial;
        }
    }
}

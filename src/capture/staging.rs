//! In-memory table of validated readings awaiting commit.

use serde::Serialize;
use std::collections::VecDeque;

/// One validated batch, shown to the operator before commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedReading {
    /// Order the batch belongs to
    pub order_id: i64,
    /// Provisional serial number; the store assigns the final one on commit
    pub serial_number: i64,
    /// Component name
    pub component_name: String,
    /// Part number
    pub part_number: String,
    /// Comma-joined parameter names, in selection order
    pub parameter_names: String,
    /// Comma-joined raw responses, parallel to the names
    pub values: String,
    /// Comma-joined range display strings, parallel to the names
    pub ranges: String,
}

impl StagedReading {
    /// The values as they were read, one per parameter.
    pub fn value_list(&self) -> Vec<&str> {
        self.values.split(crate::model::FIELD_SEPARATOR).collect()
    }
}

/// Staged readings, most recent first.
#[derive(Debug, Clone, Default)]
pub struct StagingTable {
    rows: VecDeque<StagedReading>,
}

impl StagingTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reading at the top.
    pub fn stage(&mut self, reading: StagedReading) {
        self.rows.push_front(reading);
    }

    /// Rows as displayed, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &StagedReading> {
        self.rows.iter()
    }

    /// Rows in capture order, oldest first. This is the commit order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &StagedReading> {
        self.rows.iter().rev()
    }

    /// Number of staged rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop every staged row.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

// src/process/mod.rs

pub mod normalize;
pub mod table;

pub use normalize::{normalize_cell, normalize_header};
pub use table::{parse, parse_raw, ParseError, RawTable};

/// A branch's schedule: named columns plus rows of normalized text.
///
/// Every row has exactly one value per column, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ScheduleTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding with empty cells or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// src/export/mod.rs

pub mod artifact;
pub mod index;

pub use artifact::write_table;
pub use index::{export, list_run_dates, scan_output, CourseIndex, IndexReport};

// src/export/artifact.rs

use anyhow::{Context, Result};
use std::{fs, iter, path::Path};

use crate::process::ScheduleTable;

/// Write `table` as CSV at `path`, with a leading unnamed row-index column.
///
/// Written to a dot-prefixed temp file first and renamed over `path`, so a
/// failed write never leaves a truncated artifact behind.
pub fn write_table(path: &Path, table: &ScheduleTable) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("artifact path {:?} has no parent", path))?;
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;

    let file_name = path
        .file_name()
        .with_context(|| format!("artifact path {:?} has no file name", path))?
        .to_string_lossy();
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    {
        let mut wtr = csv::Writer::from_path(&tmp_path)
            .with_context(|| format!("creating {:?}", tmp_path))?;
        wtr.write_record(iter::once("").chain(table.columns().iter().map(String::as_str)))
            .with_context(|| format!("writing header to {:?}", tmp_path))?;
        for (idx, row) in table.rows().iter().enumerate() {
            let index = idx.to_string();
            wtr.write_record(iter::once(index.as_str()).chain(row.iter().map(String::as_str)))
                .with_context(|| format!("writing row {} to {:?}", idx, tmp_path))?;
        }
        wtr.flush()
            .with_context(|| format!("flushing {:?}", tmp_path))?;
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    Ok(())
}

// src/export/index.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::Write,
    path::Path,
};
use tracing::{debug, info, instrument};

use crate::level::ProgramLevel;

pub const DATES_FILE: &str = "dates.json";
pub const COURSE_CODES_FILE: &str = "course_codes.json";
pub const CODES_BY_LEVEL_FILE: &str = "course_codes_by_level.json";

/// Course codes seen, per program level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseIndex {
    by_level: BTreeMap<ProgramLevel, BTreeSet<String>>,
}

impl CourseIndex {
    /// Returns `true` if the code was new for that level.
    pub fn record(&mut self, level: ProgramLevel, code: &str) -> bool {
        self.by_level
            .entry(level)
            .or_default()
            .insert(code.to_string())
    }

    pub fn merge(&mut self, other: &CourseIndex) {
        for (level, codes) in &other.by_level {
            self.by_level
                .entry(*level)
                .or_default()
                .extend(codes.iter().cloned());
        }
    }

    pub fn codes(&self, level: ProgramLevel) -> impl Iterator<Item = &str> + '_ {
        self.by_level
            .get(&level)
            .into_iter()
            .flat_map(|codes| codes.iter().map(String::as_str))
    }

    /// Union across levels.
    pub fn all(&self) -> BTreeSet<String> {
        self.by_level.values().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_level.values().all(BTreeSet::is_empty)
    }
}

/// `{"value": v, "label": v}`, the shape the archive's dropdowns read.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct Choice<'a> {
    value: &'a str,
    label: &'a str,
}

#[derive(Debug, Serialize)]
struct CodesByLevel<'a> {
    all: Vec<&'a str>,
    by_level: BTreeMap<&'static str, Vec<&'a str>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub dates: usize,
    pub codes: usize,
}

/// Sorted names of the immediate subdirectories of `root`.
pub fn list_run_dates(root: &Path) -> Result<Vec<String>> {
    let mut dates = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("listing {:?}", root))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dates.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    dates.sort();
    Ok(dates)
}

/// Rebuild the course index from the CSV files under every run directory.
pub fn scan_output(root: &Path) -> Result<CourseIndex> {
    let mut index = CourseIndex::default();
    for date in list_run_dates(root)? {
        let dir = root.join(&date);
        for entry in fs::read_dir(&dir).with_context(|| format!("listing {:?}", dir))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match ProgramLevel::from_file_stem(stem) {
                Some((level, code)) => {
                    index.record(level, &code);
                }
                None => debug!(path = %path.display(), "not a branch artifact"),
            }
        }
    }
    Ok(index)
}

/// Write `dates.json`, `course_codes.json` and `course_codes_by_level.json`
/// under `root`. Codes are this run's `accumulated` set plus whatever the
/// output tree already holds, so the index always agrees with disk.
#[instrument(level = "info", skip(root, accumulated), fields(root = %root.display()))]
pub fn export(root: &Path, accumulated: &CourseIndex) -> Result<IndexReport> {
    fs::create_dir_all(root).with_context(|| format!("creating {:?}", root))?;

    let dates = list_run_dates(root)?;
    let mut index = scan_output(root)?;
    index.merge(accumulated);
    let all = index.all();

    write_json(&root.join(DATES_FILE), &choices(dates.iter().map(String::as_str)))?;
    write_json(
        &root.join(COURSE_CODES_FILE),
        &choices(all.iter().map(String::as_str)),
    )?;

    let by_level = ProgramLevel::ALL
        .into_iter()
        .map(|level| (level.key(), index.codes(level).collect::<Vec<_>>()))
        .filter(|(_, codes)| !codes.is_empty())
        .collect();
    write_json(
        &root.join(CODES_BY_LEVEL_FILE),
        &CodesByLevel {
            all: all.iter().map(String::as_str).collect(),
            by_level,
        },
    )?;

    info!(dates = dates.len(), codes = all.len(), "index exported");
    Ok(IndexReport {
        dates: dates.len(),
        codes: all.len(),
    })
}

fn choices<'a>(values: impl Iterator<Item = &'a str>) -> Vec<Choice<'a>> {
    values.map(|v| Choice { value: v, label: v }).collect()
}

/// Pretty JSON with a trailing newline, via temp file + rename.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("{:?} has no parent", path))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("{:?} has no file name", path))?
        .to_string_lossy();
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    let mut tmp =
        fs::File::create(&tmp_path).with_context(|| format!("creating {:?}", tmp_path))?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .with_context(|| format!("serializing {:?}", path))?;
    tmp.write_all(b"\n")?;
    drop(tmp);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    Ok(())
}

// src/run.rs

use anyhow::Result;
use std::fmt;
use tracing::{debug, error, info, instrument};

use crate::{
    config::Config,
    export::{self, write_table, CourseIndex, IndexReport},
    fetch::{Branch, Fetcher, SchedulePage, Transport},
    level::ProgramLevel,
    select::{resolve_branches, Selection},
};

/// How a level's part of the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelOutcome {
    Processed,
    /// No branch left to process: the course filter matched none, or the
    /// level listed no branches at all.
    Skipped,
    /// The branch list could not be fetched.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelReport {
    pub level: ProgramLevel,
    pub outcome: LevelOutcome,
    /// Branches selected for processing.
    pub branches: usize,
    pub written: usize,
    /// Branches with no data, no table, or a table without rows.
    pub empty: usize,
    /// Tables that parsed but could not be written.
    pub write_errors: usize,
}

impl LevelReport {
    fn new(level: ProgramLevel) -> Self {
        Self {
            level,
            outcome: LevelOutcome::Processed,
            branches: 0,
            written: 0,
            empty: 0,
            write_errors: 0,
        }
    }
}

/// State threaded through one run: what was written, per level.
#[derive(Debug, Default)]
pub struct RunState {
    pub index: CourseIndex,
    pub reports: Vec<LevelReport>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub run_date: String,
    pub selection: Selection,
    pub reports: Vec<LevelReport>,
    pub index: IndexReport,
}

impl RunSummary {
    /// Every selected level failed to produce a branch list.
    pub fn is_total_failure(&self) -> bool {
        !self.reports.is_empty()
            && self
                .reports
                .iter()
                .all(|r| matches!(r.outcome, LevelOutcome::Failed(_)))
    }

    /// Process exit status: 1 on total failure, 0 otherwise.
    pub fn exit_status(&self) -> u8 {
        u8::from(self.is_total_failure())
    }

    pub fn written(&self) -> usize {
        self.reports.iter().map(|r| r.written).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_date)?;
        writeln!(f, "Filters: {}", self.selection)?;
        for r in &self.reports {
            let label = format!("{:<4}{:<20}", r.level.key(), r.level.label());
            match &r.outcome {
                LevelOutcome::Processed => writeln!(
                    f,
                    "  {}{} branches, {} written, {} without data{}",
                    label,
                    r.branches,
                    r.written,
                    r.empty,
                    if r.write_errors > 0 {
                        format!(", {} write errors", r.write_errors)
                    } else {
                        String::new()
                    }
                )?,
                LevelOutcome::Skipped if self.selection.courses.is_some() => {
                    writeln!(f, "  {}0 branches, skipped (no matching courses)", label)?
                }
                LevelOutcome::Skipped => writeln!(f, "  {}no branches", label)?,
                LevelOutcome::Failed(e) => writeln!(f, "  {}0 branches, failed: {}", label, e)?,
            }
        }
        write!(
            f,
            "Index: {} dates, {} course codes",
            self.index.dates, self.index.codes
        )
    }
}

/// Scrape every selected (level, branch), write the CSV artifacts, then
/// export the index. Only an index export failure is an error here.
pub async fn run<T: Transport>(
    fetcher: &Fetcher<T>,
    config: &Config,
    selection: &Selection,
) -> Result<RunSummary> {
    let mut state = RunState::default();

    for level in selection.resolve_levels() {
        let report = run_level(fetcher, config, selection, level, &mut state.index).await;
        state.reports.push(report);
    }

    let index = export::export(&config.output_root, &state.index)?;

    Ok(RunSummary {
        run_date: config.run_date.clone(),
        selection: selection.clone(),
        reports: state.reports,
        index,
    })
}

#[instrument(level = "info", skip(fetcher, config, selection, level, index), fields(level = %level))]
async fn run_level<T: Transport>(
    fetcher: &Fetcher<T>,
    config: &Config,
    selection: &Selection,
    level: ProgramLevel,
    index: &mut CourseIndex,
) -> LevelReport {
    let mut report = LevelReport::new(level);

    let branches = match resolve_branches(fetcher, level, selection).await {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "branch list unavailable; skipping level");
            report.outcome = LevelOutcome::Failed(e.to_string());
            return report;
        }
    };

    if branches.is_empty() {
        info!("no branches to process; skipping level");
        report.outcome = LevelOutcome::Skipped;
        return report;
    }

    report.branches = branches.len();
    info!(branches = branches.len(), "processing {}", level.label());

    let total = branches.len();
    for (i, branch) in branches.iter().enumerate() {
        info!(progress = %format!("{}/{}", i + 1, total), code = %branch.code, "branch");
        match process_branch(fetcher, config, level, branch).await {
            BranchResult::Written => {
                index.record(level, &branch.code);
                report.written += 1;
            }
            BranchResult::Empty => report.empty += 1,
            BranchResult::WriteFailed => report.write_errors += 1,
        }
    }

    info!(
        written = report.written,
        empty = report.empty,
        write_errors = report.write_errors,
        "level done"
    );
    report
}

enum BranchResult {
    Written,
    Empty,
    WriteFailed,
}

async fn process_branch<T: Transport>(
    fetcher: &Fetcher<T>,
    config: &Config,
    level: ProgramLevel,
    branch: &Branch,
) -> BranchResult {
    let table = match fetcher.fetch_schedule(level, branch.id).await {
        SchedulePage::Table(table) => table,
        SchedulePage::NoData => {
            debug!(code = %branch.code, "no data");
            return BranchResult::Empty;
        }
    };

    if table.is_empty() {
        debug!(code = %branch.code, "schedule has no sections");
        return BranchResult::Empty;
    }

    let path = level.artifact_path(&config.output_root, &config.run_date, &branch.code);
    match write_table(&path, &table) {
        Ok(()) => {
            debug!(code = %branch.code, rows = table.len(), path = %path.display(), "written");
            BranchResult::Written
        }
        Err(e) => {
            error!(code = %branch.code, error = %format!("{:#}", e), "write failed");
            BranchResult::WriteFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(level: ProgramLevel, outcome: LevelOutcome) -> LevelReport {
        LevelReport {
            outcome,
            ..LevelReport::new(level)
        }
    }

    fn summary(reports: Vec<LevelReport>) -> RunSummary {
        filtered_summary(Selection::default(), reports)
    }

    fn filtered_summary(selection: Selection, reports: Vec<LevelReport>) -> RunSummary {
        RunSummary {
            run_date: "2024-09-01".into(),
            selection,
            reports,
            index: IndexReport { dates: 1, codes: 0 },
        }
    }

    #[test]
    fn one_failed_level_is_not_total_failure() {
        let s = summary(vec![
            report(ProgramLevel::Undergraduate, LevelOutcome::Processed),
            report(ProgramLevel::Graduate, LevelOutcome::Failed("HTTP 503".into())),
        ]);
        assert!(!s.is_total_failure());
        assert_eq!(s.exit_status(), 0);
    }

    #[test]
    fn all_levels_failed_is_total_failure() {
        let s = summary(vec![report(
            ProgramLevel::Graduate,
            LevelOutcome::Failed("timeout".into()),
        )]);
        assert!(s.is_total_failure());
        assert_eq!(s.exit_status(), 1);
        assert!(!summary(Vec::new()).is_total_failure());
        assert_eq!(summary(Vec::new()).exit_status(), 0);
    }

    #[test]
    fn summary_lists_every_level() {
        let mut processed = report(ProgramLevel::Undergraduate, LevelOutcome::Processed);
        processed.branches = 2;
        processed.written = 1;
        processed.empty = 1;
        let s = summary(vec![
            processed,
            report(ProgramLevel::Associate, LevelOutcome::Skipped),
            report(ProgramLevel::Graduate, LevelOutcome::Failed("HTTP 503".into())),
        ]);
        let text = s.to_string();
        assert!(text.starts_with("Run 2024-09-01\nFilters: none\n"));
        assert!(text.contains("LS  Undergraduate       2 branches, 1 written, 1 without data\n"));
        assert!(text.contains("OL  Associate           no branches\n"));
        assert!(!text.contains("no matching courses"));
        assert!(text.contains("LU  Graduate            0 branches, failed: HTTP 503"));
        assert!(text.ends_with("Index: 1 dates, 0 course codes"));
        assert_eq!(s.written(), 1);
    }

    #[test]
    fn skipped_level_mentions_the_course_filter_only_when_one_is_set() {
        let s = filtered_summary(
            Selection::new(None, ["ZZZ"]),
            vec![report(ProgramLevel::Associate, LevelOutcome::Skipped)],
        );
        assert!(s
            .to_string()
            .contains("OL  Associate           0 branches, skipped (no matching courses)\n"));
    }
}

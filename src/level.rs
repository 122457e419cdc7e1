// src/level.rs

use clap::ValueEnum;
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Academic tier the remote catalogue is segmented by.
///
/// The set is closed: every level has a remote key (sent as
/// `ProgramSeviyeTipiAnahtari`), a label, and a file naming strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum ProgramLevel {
    #[value(name = "OL", alias = "associate")]
    Associate,
    #[value(name = "LS", alias = "undergraduate")]
    Undergraduate,
    #[value(name = "LU", alias = "graduate")]
    Graduate,
    #[value(name = "LUI", alias = "graduate-evening")]
    GraduateEvening,
}

/// How a level's per-branch CSV files are named inside a run directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNaming {
    /// `<code>.csv`, the layout the archive started with.
    Bare,
    /// `<level-key>-<code>.csv`
    Prefixed,
}

impl ProgramLevel {
    pub const ALL: [ProgramLevel; 4] = [
        ProgramLevel::Associate,
        ProgramLevel::Undergraduate,
        ProgramLevel::Graduate,
        ProgramLevel::GraduateEvening,
    ];

    /// Key the remote service expects, also used as the file prefix.
    pub fn key(self) -> &'static str {
        match self {
            ProgramLevel::Associate => "OL",
            ProgramLevel::Undergraduate => "LS",
            ProgramLevel::Graduate => "LU",
            ProgramLevel::GraduateEvening => "LUI",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgramLevel::Associate => "Associate",
            ProgramLevel::Undergraduate => "Undergraduate",
            ProgramLevel::Graduate => "Graduate",
            ProgramLevel::GraduateEvening => "Graduate (Evening)",
        }
    }

    pub fn naming(self) -> FileNaming {
        match self {
            ProgramLevel::Undergraduate => FileNaming::Bare,
            _ => FileNaming::Prefixed,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.key().eq_ignore_ascii_case(key))
    }

    /// File name for `code` under this level's naming strategy.
    pub fn file_name(self, code: &str) -> String {
        match self.naming() {
            FileNaming::Bare => format!("{}.csv", code),
            FileNaming::Prefixed => format!("{}-{}.csv", self.key(), code),
        }
    }

    /// `<root>/<run_date>/<file_name>`
    pub fn artifact_path(self, root: &Path, run_date: &str, code: &str) -> PathBuf {
        root.join(run_date).join(self.file_name(code))
    }

    /// Recover `(level, code)` from a CSV file stem written by [`Self::file_name`].
    ///
    /// A stem starting with a prefixed level's key and `-` belongs to that
    /// level; any other non-empty stem is a bare code, dashes included.
    pub fn from_file_stem(stem: &str) -> Option<(Self, String)> {
        let prefixed = Self::ALL
            .into_iter()
            .filter(|level| level.naming() == FileNaming::Prefixed)
            .find_map(|level| {
                stem.strip_prefix(level.key())
                    .and_then(|rest| rest.strip_prefix('-'))
                    .map(|code| (level, code))
            });

        let (level, code) = match prefixed {
            Some(found) => found,
            None => {
                let bare = Self::ALL
                    .into_iter()
                    .find(|level| level.naming() == FileNaming::Bare)?;
                (bare, stem)
            }
        };

        if code.is_empty() {
            return None;
        }
        Some((level, code.to_string()))
    }
}

impl fmt::Display for ProgramLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

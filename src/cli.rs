// src/cli.rs

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use url::Url;

use crate::{
    config::{DEFAULT_BASE_URL, DEFAULT_OUTPUT_ROOT},
    level::ProgramLevel,
};

/// Archive the course schedule as one CSV per branch, plus JSON indexes.
#[derive(Debug, Parser)]
#[command(name = "itu-archive", version, about)]
pub struct Args {
    /// Only these course codes (repeat, or separate with commas)
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    pub courses: Vec<String>,

    /// Only this program level
    #[arg(short, long, value_enum, ignore_case = true)]
    pub level: Option<ProgramLevel>,

    /// Output root; each run writes into `<output>/<date>/`
    #[arg(short, long, default_value = DEFAULT_OUTPUT_ROOT)]
    pub output: PathBuf,

    /// Run date used as the directory name [default: today]
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Base URL of the schedule service
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// Skip scraping and only rebuild the index files from disk
    #[arg(long)]
    pub index_only: bool,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
}

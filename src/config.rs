// src/config.rs

use chrono::{Local, NaiveDate};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::{cli::Args, fetch::RetryPolicy};

pub const DEFAULT_OUTPUT_ROOT: &str = "public";
pub const DEFAULT_BASE_URL: &str = "https://obs.itu.edu.tr";
pub const DEFAULT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const RUN_DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything a run needs to know besides what to select.
#[derive(Debug, Clone)]
pub struct Config {
    pub output_root: PathBuf,
    /// Directory name for this run's artifacts.
    pub run_date: String,
    pub base_url: Url,
    /// Sent as `Accept-Language` so the service answers in English.
    pub language: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            run_date: format_run_date(Local::now().date_naive()),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL should parse"),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        let mut config = Self {
            output_root: args.output.clone(),
            base_url: args.base_url.clone(),
            ..Self::default()
        };
        if let Some(date) = args.date {
            config.run_date = format_run_date(date);
        }
        config
    }

    pub fn run_dir(&self) -> PathBuf {
        self.output_root.join(&self.run_date)
    }
}

pub fn format_run_date(date: NaiveDate) -> String {
    date.format(RUN_DATE_FORMAT).to_string()
}

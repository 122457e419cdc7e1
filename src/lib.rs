pub mod cli;
pub mod config;
pub mod export;
pub mod fetch;
pub mod level;
pub mod process;
pub mod run;
pub mod select;

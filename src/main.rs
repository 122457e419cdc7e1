use anyhow::Result;
use clap::Parser;
use itu_archive::{
    cli::Args,
    config::Config,
    export::{self, CourseIndex},
    fetch::{Endpoints, Fetcher, HttpTransport},
    run,
    select::Selection,
};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_filter = if args.verbose {
        "info,itu_archive=debug"
    } else {
        "info,itu_archive=info"
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    match execute(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "run aborted");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(args: Args) -> Result<ExitCode> {
    // ─── 2) configure ────────────────────────────────────────────────
    let config = Config::from_args(&args);
    let selection = Selection::new(args.level, &args.courses);
    info!(
        output = %config.output_root.display(),
        date = %config.run_date,
        filters = %selection,
        "startup"
    );

    // ─── 3) index-only: rebuild from disk, no network ────────────────
    if args.index_only {
        let report = export::export(&config.output_root, &CourseIndex::default())?;
        println!(
            "Index: {} dates, {} course codes",
            report.dates, report.codes
        );
        return Ok(ExitCode::SUCCESS);
    }

    // ─── 4) scrape every selected level ──────────────────────────────
    let transport = HttpTransport::new(&config)?;
    let fetcher = Fetcher::new(
        transport,
        Endpoints::new(config.base_url.clone()),
        config.retry,
    );
    let summary = run::run(&fetcher, &config, &selection).await?;

    // ─── 5) report ───────────────────────────────────────────────────
    println!("{}", summary);
    if summary.is_total_failure() {
        error!("no level could be enumerated");
    } else {
        info!(written = summary.written(), "all done");
    }
    Ok(ExitCode::from(summary.exit_status()))
}

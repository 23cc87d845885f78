//! # Eternal News
//!
//! Scheduled entry point: one invocation is one collection run.
//!
//! ## Usage
//!
//! ```sh
//! eternal_news --data-dir ./data --retention 7
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: every source succeeded, or some did and the store was written
//! - `1`: every source failed, or settings/store errors
//! - `130`: interrupted before the store was written

use chrono::Utc;
use clap::Parser;
use eternal_news::cli::Cli;
use eternal_news::collector::Collector;
use eternal_news::config::Settings;
use eternal_news::error::PipelineError;
use eternal_news::http::HttpClient;
use eternal_news::outputs::Store;
use eternal_news::pipeline::{Pipeline, RunOptions, RunOutcome};
use eternal_news::retry::CancelFlag;
use eternal_news::scrapers::registry;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    // --- Tracing init ---
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("eternal_news starting up");
    debug!(?args, "Parsed CLI arguments");

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings.with_overrides(
            args.data_dir.clone(),
            args.retention.map(|days| days as usize),
        ),
        Err(e) => {
            error!(error = %e, "Failed to load settings");
            return ExitCode::FAILURE;
        }
    };
    debug!(?settings, "Effective settings");

    let http = match HttpClient::new(&settings.user_agent, settings.timeout()) {
        Ok(http) => http,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("Interrupt received; abandoning in-flight requests without writing");
            cancel.cancel();

            if tokio::signal::ctrl_c().await.is_ok() {
                error!("Second interrupt received; exiting immediately");
                std::process::exit(130);
            }
        });
    }

    let collector = Collector::new(registry(&http), settings.retry_policy(), cancel);
    let pipeline = Pipeline::new(collector, Store::new(&settings.data_dir));
    let opts = RunOptions {
        date: args.date.unwrap_or_else(|| Utc::now().date_naive()),
        retention_days: settings.retention_days,
        dry_run: args.dry_run,
    };

    let code = match pipeline.run(&opts).await {
        Ok(summary) => {
            match serde_json::to_string(&summary) {
                Ok(line) => println!("{line}"),
                Err(e) => error!(error = %e, "Failed to serialize run summary"),
            }
            match summary.outcome() {
                RunOutcome::Complete | RunOutcome::Partial => ExitCode::SUCCESS,
                RunOutcome::TotalFailure => ExitCode::FAILURE,
            }
        }
        Err(PipelineError::Cancelled) => {
            warn!("Run cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    code
}

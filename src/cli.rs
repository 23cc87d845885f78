//! Command-line interface definitions for Eternal News.
//!
//! All arguments are optional. Directory and config paths can also be
//! provided through environment variables.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Collect today's AI news into the dated JSON store.
///
/// # Examples
///
/// ```sh
/// # Collect for the current UTC date into ./data
/// eternal_news
///
/// # Backfill a date with a longer retention window
/// eternal_news --date 2025-10-18 --retention 14 --data-dir /srv/news
///
/// # See what would be collected without touching the store
/// eternal_news --dry-run -v
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Date to file the snapshot under (YYYY-MM-DD); defaults to today in UTC
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Number of most recent dates to keep (overrides the config file)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub retention: Option<u64>,

    /// Store directory (overrides the config file)
    #[arg(long, env = "NEWS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Optional path to a YAML settings file
    #[arg(short, long, env = "NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Collect and log results without writing the store
    #[arg(long)]
    pub dry_run: bool,
}

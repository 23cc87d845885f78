//! # Eternal News
//!
//! Collects AI-related news from a fixed set of web sources once per run and
//! files the result as a dated JSON snapshot in a rolling store.
//!
//! ## Architecture
//!
//! 1. **Fetching**: every [`scrapers::Adapter`] runs concurrently behind a
//!    [`retry::RetryFetch`] with bounded exponential backoff
//! 2. **Merging**: [`collector::Collector`] joins the outcomes, removes
//!    duplicate titles across sources and builds a [`models::Snapshot`]
//! 3. **Storing**: [`outputs::Store`] writes `<date>.json` and `today.json`,
//!    then rebuilds `index.json` and prunes dates outside the retention window
//!
//! [`pipeline::Pipeline`] wires the three together for one run.

pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod feeds;
pub mod http;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod retry;
pub mod scrape;
pub mod scrapers;
pub mod utils;

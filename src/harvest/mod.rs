//! Harvest engine: scheduling, fetching and orchestration
//!
//! This module contains the crawl engine core:
//! - The priority scheduler and its bounded worker pool
//! - The abstract fetch capability and its reqwest implementation
//! - The orchestrator tying store, fetcher and scheduler together

mod fetcher;
mod orchestrator;
mod scheduler;

pub use fetcher::{build_http_client, FetchRequest, Fetcher, HttpFetcher, TransportError};
pub use orchestrator::Harvester;
pub use scheduler::{Job, JobAction, PriorityScheduler, SchedulerStats};

use crate::config::Config;
use crate::store::FsStore;
use std::sync::Arc;

/// Runs a complete harvest from a loaded configuration
///
/// Builds the filesystem store and the HTTP fetcher, bootstraps the
/// environment, and returns once the discovered job graph has drained.
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// The scheduler's lifetime counters for the run.
pub async fn run_harvest(config: Config) -> crate::Result<SchedulerStats> {
    let store = Arc::new(FsStore::new(&config.harvest.cache_dir));
    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let harvester = Harvester::new(&config, store, fetcher);
    harvester.run().await
}

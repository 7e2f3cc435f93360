//! Background cache occupancy reporting.
//!
//! Purely observational: the reporter reads cache lengths and never touches cache contents or
//! the range lock state. Runs until the shutdown broadcast fires.

use crate::{
    archive::RangeLock,
    cache::{store::BlockCaches, types::CacheOccupancy},
    metrics::MetricsCollector,
};
use std::sync::Arc;
use tokio::{
    sync::broadcast,
    time::{Duration, MissedTickBehavior},
};
use tracing::{debug, info};

/// Logs and publishes cache occupancy every `interval`.
///
/// # Arguments
/// * `caches` - The cache triplet to report on
/// * `range_lock` - Range lock, for the number of in-flight bundle fetches
/// * `metrics` - Collector receiving the occupancy gauges
/// * `interval` - Time between reports
/// * `shutdown_rx` - Broadcast receiver for shutdown signal
pub async fn run_stats_reporter(
    caches: BlockCaches,
    range_lock: Arc<RangeLock>,
    metrics: Arc<MetricsCollector>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!(interval_secs = interval.as_secs(), "starting cache stats reporter");

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                report(&caches, &range_lock, &metrics);
            }
            _ = shutdown_rx.recv() => {
                debug!("cache stats reporter shutting down");
                break;
            }
        }
    }
}

fn report(caches: &BlockCaches, range_lock: &RangeLock, metrics: &MetricsCollector) -> CacheOccupancy {
    let occupancy = caches.occupancy();
    let in_flight = range_lock.active_ranges();

    info!(
        body_cache = occupancy.body_entries,
        header_cache = occupancy.header_entries,
        hash_cache = occupancy.hash_entries,
        in_flight_ranges = in_flight,
        "block archiver cache stats"
    );

    metrics.record_cache_occupancy(&occupancy);
    metrics.record_in_flight_ranges(in_flight);
    occupancy
}

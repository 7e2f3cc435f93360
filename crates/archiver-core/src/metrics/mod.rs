//! # Metrics
//!
//! Every event is recorded twice:
//!
//! - **Prometheus** counters and gauges through the `metrics` facade, rendered by the server's
//!   `/metrics` endpoint
//! - **Internal** atomic counters, read back as an [`ArchiverMetrics`] snapshot for the health
//!   endpoint and tests
//!
//! Both paths are lock-free. Without an installed recorder the Prometheus path is a no-op.

use crate::cache::types::CacheOccupancy;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    OnceLock,
};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn init_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to install primary Prometheus recorder, attempting fallback"
                );

                let recorder = PrometheusBuilder::new().build_recorder();
                tracing::warn!(
                    "Using fallback Prometheus recorder (install error: {e}) - metrics may not be globally visible"
                );
                recorder.handle()
            }
        })
        .clone()
}

/// How a lookup was answered, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Number,
    Hash,
}

impl LookupKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Hash => "hash",
        }
    }
}

/// Which archive call failed, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStage {
    /// Bundle name lookup, including a reported range that is unusable for the request
    RangeDiscovery,
    BundleFetch,
    HashLookup,
}

impl UpstreamStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RangeDiscovery => "range_discovery",
            Self::BundleFetch => "bundle_fetch",
            Self::HashLookup => "hash_lookup",
        }
    }
}

/// Point-in-time copy of the internal counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArchiverMetrics {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub bundle_fetches: u64,
    pub range_discovery_errors: u64,
    pub bundle_fetch_errors: u64,
    pub hash_lookup_errors: u64,
    pub waits_satisfied: u64,
    pub waits_exhausted: u64,
}

#[derive(Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    bundle_fetches: AtomicU64,
    range_discovery_errors: AtomicU64,
    bundle_fetch_errors: AtomicU64,
    hash_lookup_errors: AtomicU64,
    waits_satisfied: AtomicU64,
    waits_exhausted: AtomicU64,
}

pub struct MetricsCollector {
    counters: Counters,
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    /// Creates a collector, installing the global Prometheus recorder on first use.
    #[must_use]
    pub fn new() -> Self {
        Self { counters: Counters::default(), prometheus_handle: init_prometheus_recorder() }
    }

    pub fn record_cache_hit(&self, kind: LookupKind) {
        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("archiver_cache_hits_total", "lookup" => kind.as_str()).increment(1);
    }

    pub fn record_cache_miss(&self, kind: LookupKind) {
        self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
        counter!("archiver_cache_misses_total", "lookup" => kind.as_str()).increment(1);
    }

    /// Record a completed bundle fetch and how many blocks it populated
    pub fn record_bundle_fetch(&self, blocks: usize, duration_ms: u64) {
        self.counters.bundle_fetches.fetch_add(1, Ordering::Relaxed);
        counter!("archiver_bundle_fetches_total", "result" => "success").increment(1);
        #[allow(clippy::cast_precision_loss)]
        {
            histogram!("archiver_bundle_size_blocks").record(blocks as f64);
            histogram!("archiver_bundle_fetch_duration_seconds").record(duration_ms as f64 / 1000.0);
        }
    }

    pub fn record_upstream_error(&self, stage: UpstreamStage, error_kind: &'static str) {
        let c = &self.counters;
        match stage {
            UpstreamStage::RangeDiscovery => c.range_discovery_errors.fetch_add(1, Ordering::Relaxed),
            UpstreamStage::BundleFetch => {
                counter!("archiver_bundle_fetches_total", "result" => "error").increment(1);
                c.bundle_fetch_errors.fetch_add(1, Ordering::Relaxed)
            }
            UpstreamStage::HashLookup => c.hash_lookup_errors.fetch_add(1, Ordering::Relaxed),
        };
        counter!("archiver_upstream_errors_total", "stage" => stage.as_str(), "error_type" => error_kind)
            .increment(1);
    }

    pub fn record_wait_satisfied(&self, attempts: u32) {
        self.counters.waits_satisfied.fetch_add(1, Ordering::Relaxed);
        histogram!("archiver_wait_attempts").record(f64::from(attempts));
    }

    pub fn record_wait_exhausted(&self) {
        self.counters.waits_exhausted.fetch_add(1, Ordering::Relaxed);
        counter!("archiver_wait_exhausted_total").increment(1);
    }

    /// Record cache occupancy, one gauge per cache
    pub fn record_cache_occupancy(&self, occupancy: &CacheOccupancy) {
        #[allow(clippy::cast_precision_loss)]
        {
            gauge!("archiver_cache_entries", "cache" => "hash").set(occupancy.hash_entries as f64);
            gauge!("archiver_cache_entries", "cache" => "body").set(occupancy.body_entries as f64);
            gauge!("archiver_cache_entries", "cache" => "header").set(occupancy.header_entries as f64);
        }
    }

    pub fn record_in_flight_ranges(&self, ranges: usize) {
        #[allow(clippy::cast_precision_loss)]
        gauge!("archiver_in_flight_ranges").set(ranges as f64);
    }

    /// Record a served JSON-RPC request
    pub fn record_request(&self, method: &str, success: bool, latency_ms: u64) {
        let method = method_label(method);
        let outcome = if success { "success" } else { "error" };
        counter!("archiver_rpc_requests_total", "method" => method, "outcome" => outcome).increment(1);
        #[allow(clippy::cast_precision_loss)]
        histogram!("archiver_rpc_request_duration_seconds", "method" => method)
            .record(latency_ms as f64 / 1000.0);
    }

    #[must_use]
    pub fn snapshot(&self) -> ArchiverMetrics {
        let c = &self.counters;
        ArchiverMetrics {
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            cache_misses: c.cache_misses.load(Ordering::Relaxed),
            bundle_fetches: c.bundle_fetches.load(Ordering::Relaxed),
            range_discovery_errors: c.range_discovery_errors.load(Ordering::Relaxed),
            bundle_fetch_errors: c.bundle_fetch_errors.load(Ordering::Relaxed),
            hash_lookup_errors: c.hash_lookup_errors.load(Ordering::Relaxed),
            waits_satisfied: c.waits_satisfied.load(Ordering::Relaxed),
            waits_exhausted: c.waits_exhausted.load(Ordering::Relaxed),
        }
    }

    /// Renders all recorded metrics in Prometheus text format.
    #[must_use]
    pub fn get_prometheus_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounds label cardinality: unknown methods collapse into one label.
fn method_label(method: &str) -> &'static str {
    match method {
        "eth_blockNumber" => "eth_blockNumber",
        "eth_getBlockByNumber" => "eth_getBlockByNumber",
        "eth_getBlockByHash" => "eth_getBlockByHash",
        _ => "other",
    }
}

use crate::{
    archive::{background, ArchiverConfig, ArchiverError, RangeLock},
    cache::{
        store::{BlockCaches, CacheStoreError},
        types::{ArchivedBlock, BlockHeader, BlockPair},
    },
    metrics::{LookupKind, MetricsCollector, UpstreamStage},
    types::Hash32,
    upstream::{ArchiveClient, HttpClient, RemoteArchive, UpstreamError},
};
use async_trait::async_trait;
use std::{pin::pin, sync::Arc, time::Duration};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

/// Block lookups served from the local cache, falling back to the remote archive.
#[async_trait]
pub trait BlockArchiver: Send + Sync {
    /// Fetches the archive's latest block. Never cached.
    async fn get_latest_block(&self) -> Result<Option<ArchivedBlock>, ArchiverError>;

    async fn get_latest_header(&self) -> Result<Option<Arc<BlockHeader>>, ArchiverError>;

    async fn get_block_by_number(&self, number: u64) -> Result<Option<BlockPair>, ArchiverError>;

    async fn get_block_by_hash(&self, hash: &Hash32) -> Result<Option<BlockPair>, ArchiverError>;
}

/// Coordinates bundle fetches so that concurrent lookups converge on one in-flight request.
///
/// # Lookup Flow
///
/// ```text
/// get_block_by_number(n)
///        │
///        ▼
/// ┌──────────────┐
/// │ Cache check  │ ── hit ──► return
/// └──────┬───────┘
///        │ miss
///        ▼
/// ┌──────────────────┐
/// │ n in a range     │ ── yes ──► wait loop ── cached ──► return
/// │ being fetched?   │                 │
/// └──────┬───────────┘                 └─ attempts exhausted ──► NotFound
///        │ no
///        ▼
/// fetch bundle range [start, end] ──► try_lock_range ── taken ──► wait loop
///        │ reserved
///        ▼
/// fetch bundle ──► populate caches ──► release range (guard drop) ──► return block n
/// ```
///
/// The range guard is dropped on every exit path, including errors and cancellation of the
/// lookup future, so a failed fetch never leaves numbers locked.
pub struct BlockArchiverService {
    remote: Arc<dyn RemoteArchive>,
    caches: BlockCaches,
    range_lock: Arc<RangeLock>,
    metrics: Arc<MetricsCollector>,
    retry_attempts: u32,
    retry_interval: Duration,
    stats_interval: Option<Duration>,
    max_bundle_blocks: u64,
}

impl BlockArchiverService {
    /// Creates a service over externally owned caches and archive client.
    #[must_use]
    pub fn new(
        config: &ArchiverConfig,
        remote: Arc<dyn RemoteArchive>,
        caches: BlockCaches,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            remote,
            caches,
            range_lock: Arc::new(RangeLock::new()),
            metrics,
            retry_attempts: config.retry_attempts,
            retry_interval: config.retry_interval(),
            stats_interval: config.stats_interval(),
            max_bundle_blocks: config.max_bundle_blocks,
        }
    }

    /// Creates a service with its own LRU caches and an [`ArchiveClient`] for
    /// `config.rpc_address`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheStoreError::InvalidConfig`] if `config.block_cache_size` is zero.
    pub fn from_config(
        config: &ArchiverConfig,
        http_client: Arc<HttpClient>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, CacheStoreError> {
        let caches = BlockCaches::with_lru_capacity(config.block_cache_size)?;
        let remote =
            Arc::new(ArchiveClient::new(config.rpc_address.as_str(), http_client, config.request_timeout()));
        Ok(Self::new(config, remote, caches, metrics))
    }

    #[must_use]
    pub fn caches(&self) -> &BlockCaches {
        &self.caches
    }

    #[must_use]
    pub fn range_lock(&self) -> &Arc<RangeLock> {
        &self.range_lock
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Spawns the cache occupancy reporter.
    ///
    /// Returns `None` when reporting is disabled (`stats_interval_seconds = 0`). The task exits
    /// when `shutdown_tx` fires.
    pub fn start_background_tasks(&self, shutdown_tx: &broadcast::Sender<()>) -> Option<JoinHandle<()>> {
        let interval = self.stats_interval?;
        let caches = self.caches.clone();
        let range_lock = Arc::clone(&self.range_lock);
        let metrics = Arc::clone(&self.metrics);
        let shutdown_rx = shutdown_tx.subscribe();

        Some(tokio::spawn(async move {
            background::run_stats_reporter(caches, range_lock, metrics, interval, shutdown_rx).await;
        }))
    }

    /// Number path without the initial cache check.
    async fn lookup_uncached(&self, number: u64) -> Result<Option<BlockPair>, ArchiverError> {
        if self.range_lock.is_within_any_range(number) {
            debug!(block = number, "block is being fetched by another task, waiting");
            return self.wait_for_block(number).await.map(Some);
        }

        self.fetch_bundle(number).await
    }

    /// Re-checks the cache until the block lands or the attempts run out.
    ///
    /// Each attempt waits for the next range release or the retry interval, whichever comes
    /// first. A release that does not populate the block (an unrelated bundle, or a failed
    /// fetch) keeps waiting for the rest of the same attempt's interval.
    async fn wait_for_block(&self, number: u64) -> Result<BlockPair, ArchiverError> {
        for attempt in 1..=self.retry_attempts {
            let deadline = Instant::now() + self.retry_interval;

            loop {
                let mut released = pin!(self.range_lock.notified());
                released.as_mut().enable();

                if let Some(pair) = self.caches.get_by_number(number) {
                    self.metrics.record_wait_satisfied(attempt);
                    return Ok(pair);
                }

                tokio::select! {
                    () = &mut released => {}
                    () = sleep_until(deadline) => break,
                }
            }

            if let Some(pair) = self.caches.get_by_number(number) {
                self.metrics.record_wait_satisfied(attempt);
                return Ok(pair);
            }
            debug!(block = number, attempt = attempt, "block still not cached");
        }

        warn!(
            block = number,
            attempts = self.retry_attempts,
            "gave up waiting for concurrent bundle fetch"
        );
        self.metrics.record_wait_exhausted();
        Err(ArchiverError::NotFound { number, attempts: self.retry_attempts })
    }

    /// Discovers and reserves the bundle containing `number`, fetches it, and populates the
    /// caches with every block it contains.
    ///
    /// A reported range that misses `number` or exceeds `max_bundle_blocks` is rejected before
    /// anything is reserved.
    async fn fetch_bundle(&self, number: u64) -> Result<Option<BlockPair>, ArchiverError> {
        let range = self
            .remote
            .fetch_bundle_range(number)
            .await
            .map_err(|e| self.upstream_failure(UpstreamStage::RangeDiscovery, e))?;

        if !range.contains(number) {
            return Err(self.upstream_failure(
                UpstreamStage::RangeDiscovery,
                UpstreamError::InvalidResponse(format!("bundle {range} does not contain block {number}")),
            ));
        }
        if range.len() > self.max_bundle_blocks {
            return Err(self.upstream_failure(
                UpstreamStage::RangeDiscovery,
                UpstreamError::InvalidResponse(format!(
                    "bundle {range} spans {} blocks, limit is {}",
                    range.len(),
                    self.max_bundle_blocks
                )),
            ));
        }

        let Some(guard) = self.range_lock.try_lock_range(range) else {
            debug!(block = number, range = %range, "bundle reserved by another task, waiting");
            return self.wait_for_block(number).await.map(Some);
        };

        // The previous holder may have finished between the cache check and the reservation
        if let Some(pair) = self.caches.get_by_number(number) {
            return Ok(Some(pair));
        }

        info!(block = number, range = %range, "fetching bundle of blocks");
        let started = Instant::now();

        let blocks = self
            .remote
            .fetch_bundle_blocks(number)
            .await
            .map_err(|e| self.upstream_failure(UpstreamStage::BundleFetch, e))?;

        info!(start = range.from, end = range.to, blocks = blocks.len(), "populating block cache");
        let mut requested = None;
        for block in &blocks {
            self.caches.insert(block.number(), block.hash(), Arc::clone(&block.body), Arc::clone(&block.header));
            if block.number() == number {
                requested = Some(block.to_pair());
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        self.metrics.record_bundle_fetch(blocks.len(), started.elapsed().as_millis() as u64);
        drop(guard);

        if requested.is_none() {
            debug!(block = number, range = %range, "bundle did not contain requested block");
        }
        Ok(requested)
    }

    fn upstream_failure(&self, stage: UpstreamStage, error: UpstreamError) -> ArchiverError {
        warn!(stage = stage.as_str(), error = %error, "archive request failed");
        self.metrics.record_upstream_error(stage, error.kind());
        ArchiverError::Upstream(error)
    }
}

#[async_trait]
impl BlockArchiver for BlockArchiverService {
    async fn get_latest_block(&self) -> Result<Option<ArchivedBlock>, ArchiverError> {
        Ok(self.remote.fetch_latest_block().await?)
    }

    async fn get_latest_header(&self) -> Result<Option<Arc<BlockHeader>>, ArchiverError> {
        Ok(self.get_latest_block().await?.map(|block| block.header))
    }

    async fn get_block_by_number(&self, number: u64) -> Result<Option<BlockPair>, ArchiverError> {
        if let Some(pair) = self.caches.get_by_number(number) {
            self.metrics.record_cache_hit(LookupKind::Number);
            return Ok(Some(pair));
        }
        self.metrics.record_cache_miss(LookupKind::Number);

        self.lookup_uncached(number).await
    }

    async fn get_block_by_hash(&self, hash: &Hash32) -> Result<Option<BlockPair>, ArchiverError> {
        if let Some(pair) = self.caches.get_by_hash(hash) {
            self.metrics.record_cache_hit(LookupKind::Hash);
            return Ok(Some(pair));
        }
        self.metrics.record_cache_miss(LookupKind::Hash);

        let block = self
            .remote
            .fetch_block_by_hash(hash)
            .await
            .map_err(|e| self.upstream_failure(UpstreamStage::HashLookup, e))?;
        let Some(block) = block else {
            debug!(hash = %hash, "archive has no block with this hash");
            return Ok(None);
        };

        let number = block.number();
        if let Some(pair) = self.caches.get_by_number(number) {
            return Ok(Some(pair));
        }
        self.lookup_uncached(number).await
    }
}

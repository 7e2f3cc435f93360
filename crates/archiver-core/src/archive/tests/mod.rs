//! Tests for the archiver service and range lock.
//!
//! Service tests run against [`ScriptedArchive`], an in-memory archive serving fixed-size
//! bundles, with tokio's clock paused so wait intervals and fetch latencies are deterministic.


use crate::{
    archive::{ArchiverConfig, BlockArchiverService},
    cache::{
        store::BlockCaches,
        tests::{create_test_block, test_hash},
        types::ArchivedBlock,
    },
    metrics::MetricsCollector,
    types::{BlockRange, Hash32},
    upstream::{RemoteArchive, UpstreamError},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::time::Duration;

// ============================================================================
// Scripted Archive
// ============================================================================

/// How a scripted call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    Timeout,
    MalformedBundleName,
    /// Bundle range that does not contain the requested block
    WrongRange,
    /// Bundle range spanning every block number
    UnboundedRange,
}

impl Failure {
    fn into_error(self) -> UpstreamError {
        match self {
            Self::Timeout => UpstreamError::Timeout,
            Self::MalformedBundleName => UpstreamError::MalformedBundleName("archive_s100".to_string()),
            Self::WrongRange | Self::UnboundedRange => {
                UpstreamError::InvalidResponse("unreachable".to_string())
            }
        }
    }
}

/// In-memory archive serving bundles of `bundle_size` blocks aligned to multiples of the size.
pub(crate) struct ScriptedArchive {
    bundle_size: u64,
    latest: u64,
    fetch_delay: Mutex<Duration>,
    range_failure: Mutex<Option<Failure>>,
    blocks_failure: Mutex<Option<Failure>>,
    hash_failure: Mutex<Option<Failure>>,
    /// Numbers left out of bundle responses
    missing: Mutex<HashSet<u64>>,
    pub range_calls: AtomicUsize,
    pub bundle_calls: AtomicUsize,
    pub hash_calls: AtomicUsize,
}

impl ScriptedArchive {
    pub(crate) fn new(bundle_size: u64) -> Self {
        Self {
            bundle_size,
            latest: 10_000,
            fetch_delay: Mutex::new(Duration::ZERO),
            range_failure: Mutex::new(None),
            blocks_failure: Mutex::new(None),
            hash_failure: Mutex::new(None),
            missing: Mutex::new(HashSet::new()),
            range_calls: AtomicUsize::new(0),
            bundle_calls: AtomicUsize::new(0),
            hash_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_fetch_delay(self, delay: Duration) -> Self {
        *self.fetch_delay.lock() = delay;
        self
    }

    pub(crate) fn fail_bundle_range(&self, failure: Option<Failure>) {
        *self.range_failure.lock() = failure;
    }

    pub(crate) fn fail_bundle_blocks(&self, failure: Option<Failure>) {
        *self.blocks_failure.lock() = failure;
    }

    pub(crate) fn fail_hash_lookup(&self, failure: Option<Failure>) {
        *self.hash_failure.lock() = failure;
    }

    pub(crate) fn omit_block(&self, number: u64) {
        self.missing.lock().insert(number);
    }

    pub(crate) fn bundle_of(&self, number: u64) -> BlockRange {
        let from = number / self.bundle_size * self.bundle_size;
        BlockRange::new(from, from + self.bundle_size - 1)
    }

    fn number_of(hash: &Hash32) -> Option<u64> {
        let bytes = hash.as_bytes();
        if bytes[..24].iter().any(|b| *b != 0xB1) {
            return None;
        }
        let mut number = [0u8; 8];
        number.copy_from_slice(&bytes[24..]);
        Some(u64::from_be_bytes(number))
    }
}

#[async_trait]
impl RemoteArchive for ScriptedArchive {
    async fn fetch_latest_block(&self) -> Result<Option<ArchivedBlock>, UpstreamError> {
        Ok(Some(create_test_block(self.latest)))
    }

    async fn fetch_block_by_number(&self, number: u64) -> Result<Option<ArchivedBlock>, UpstreamError> {
        Ok((number <= self.latest).then(|| create_test_block(number)))
    }

    async fn fetch_block_by_hash(&self, hash: &Hash32) -> Result<Option<ArchivedBlock>, UpstreamError> {
        self.hash_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = *self.hash_failure.lock() {
            return Err(failure.into_error());
        }
        Ok(Self::number_of(hash).filter(|n| *n <= self.latest).map(create_test_block))
    }

    async fn fetch_bundle_range(&self, number: u64) -> Result<BlockRange, UpstreamError> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        match *self.range_failure.lock() {
            Some(Failure::WrongRange) => {
                let range = self.bundle_of(number);
                let len = range.len();
                Ok(BlockRange::new(range.from + len, range.to + len))
            }
            Some(Failure::UnboundedRange) => Ok(BlockRange::new(0, u64::MAX)),
            Some(failure) => Err(failure.into_error()),
            None => Ok(self.bundle_of(number)),
        }
    }

    async fn fetch_bundle_blocks(&self, number: u64) -> Result<Vec<ArchivedBlock>, UpstreamError> {
        self.bundle_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = *self.blocks_failure.lock() {
            return Err(failure.into_error());
        }

        let missing = self.missing.lock().clone();
        Ok(self
            .bundle_of(number)
            .iter()
            .filter(|n| !missing.contains(n))
            .map(create_test_block)
            .collect())
    }
}

// ============================================================================
// Shared Test Helpers
// ============================================================================

pub(crate) fn test_config() -> ArchiverConfig {
    ArchiverConfig {
        rpc_address: "http://archive.test".to_string(),
        block_cache_size: 1000,
        retry_attempts: 3,
        retry_interval_ms: 2000,
        stats_interval_seconds: 10,
        request_timeout_seconds: 600,
        max_bundle_blocks: 1000,
    }
}

pub(crate) fn create_test_service(archive: Arc<ScriptedArchive>) -> Arc<BlockArchiverService> {
    create_test_service_with_config(archive, &test_config())
}

pub(crate) fn create_test_service_with_config(
    archive: Arc<ScriptedArchive>,
    config: &ArchiverConfig,
) -> Arc<BlockArchiverService> {
    let caches = BlockCaches::with_lru_capacity(config.block_cache_size).expect("valid cache size");
    Arc::new(BlockArchiverService::new(config, archive, caches, Arc::new(MetricsCollector::new())))
}

pub(crate) fn hash_of(number: u64) -> Hash32 {
    test_hash(number)
}

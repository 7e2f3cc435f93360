//! Test Helper Functions and Utilities
//!
//! Block fixtures in the archive's JSON-RPC shape, and client/service constructors pointed at
//! a mock archive.

use archiver_core::{
    archive::{ArchiverConfig, BlockArchiverService},
    cache::BlockCaches,
    metrics::MetricsCollector,
    upstream::{ArchiveClient, HttpClient},
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

/// Hash of fixture block `block_number`.
#[must_use]
pub fn block_hash(block_number: u64) -> String {
    format!("0x{:064x}", block_number + 0xb10c_0000)
}

/// Creates a block in the archive's JSON-RPC shape with `tx_count` full transactions.
#[must_use]
pub fn create_test_block(block_number: u64, tx_count: usize) -> Value {
    let transactions: Vec<Value> = (0..tx_count)
        .map(|i| {
            json!({
                "hash": format!("0x{:064x}", block_number * 1000 + i as u64),
                "nonce": format!("0x{:x}", i),
                "blockHash": block_hash(block_number),
                "blockNumber": format!("0x{:x}", block_number),
                "transactionIndex": format!("0x{:x}", i),
                "from": "0x0000000000000000000000000000000000000001",
                "to": "0x0000000000000000000000000000000000000002",
                "value": "0x0",
                "gas": "0x5208",
                "gasPrice": "0x1",
                "input": "0x"
            })
        })
        .collect();

    json!({
        "number": format!("0x{:x}", block_number),
        "hash": block_hash(block_number),
        "parentHash": block_hash(block_number.saturating_sub(1)),
        "timestamp": format!("0x{:x}", 1_600_000_000 + block_number),
        "transactions": transactions,
        "uncles": [],
        "gasLimit": "0x8583b00",
        "gasUsed": "0x5208",
        "difficulty": "0x2",
        "totalDifficulty": format!("0x{:x}", block_number * 2),
        "extraData": "0xd883010202846765746888676f312e32312e36856c696e7578",
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "miner": "0x0000000000000000000000000000000000000000",
        "mixHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "nonce": "0x0000000000000000",
        "receiptsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
        "sha3Uncles": "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347",
        "stateRoot": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "transactionsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"
    })
}

/// Creates every block of the inclusive bundle `from..=to`, one transaction each.
#[must_use]
pub fn create_test_bundle(from: u64, to: u64) -> Vec<Value> {
    (from..=to).map(|n| create_test_block(n, 1)).collect()
}

/// Creates an [`ArchiveClient`] for the archive at `url`.
#[must_use]
pub fn create_archive_client(url: &str) -> ArchiveClient {
    let http_client = Arc::new(HttpClient::new().expect("http client"));
    ArchiveClient::new(url, http_client, Duration::from_secs(10))
}

/// Creates a [`BlockArchiverService`] for the archive at `url` with a short retry interval.
#[must_use]
pub fn create_archiver_service(url: &str) -> Arc<BlockArchiverService> {
    let config = ArchiverConfig {
        rpc_address: url.to_string(),
        block_cache_size: 1000,
        retry_interval_ms: 200,
        ..ArchiverConfig::default()
    };
    let http_client = Arc::new(HttpClient::new().expect("http client"));
    let service =
        BlockArchiverService::from_config(&config, http_client, Arc::new(MetricsCollector::new()))
            .expect("valid archiver config");
    Arc::new(service)
}

/// Creates a service over an empty cache of the given capacity.
#[must_use]
pub fn create_archiver_service_with_caches(url: &str, capacity: usize) -> Arc<BlockArchiverService> {
    let config = ArchiverConfig { rpc_address: url.to_string(), ..ArchiverConfig::default() };
    let caches = BlockCaches::with_lru_capacity(capacity).expect("valid cache capacity");
    Arc::new(BlockArchiverService::new(
        &config,
        Arc::new(create_archive_client(url)),
        caches,
        Arc::new(MetricsCollector::new()),
    ))
}

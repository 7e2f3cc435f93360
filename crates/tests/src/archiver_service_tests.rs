//! Integration tests for `BlockArchiverService` over HTTP.

use crate::mock_infrastructure::{
    block_hash, create_archiver_service, create_archiver_service_with_caches, create_test_block,
    create_test_bundle, ArchiveMockBuilder,
};
use archiver_core::{archive::BlockArchiver, types::Hash32};
use serde_json::Value;

#[tokio::test]
async fn test_number_lookup_fetches_and_caches_bundle() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_name(150, "archive_s100_e199")
        .mock_bundle_blocks(150, &create_test_bundle(100, 199));

    let service = create_archiver_service(&mock.url());
    let pair = service.get_block_by_number(150).await.unwrap().expect("block 150");

    assert_eq!(pair.number(), 150);
    assert_eq!(service.caches().occupancy().hash_entries, 100);

    // Served from cache: a second bundle fetch would fail the exactly-once expectation
    let neighbour = service.get_block_by_number(199).await.unwrap().expect("block 199");
    assert_eq!(neighbour.number(), 199);
    assert!(mock.verify_all_called());

    let metrics = service.metrics().snapshot();
    assert_eq!(metrics.bundle_fetches, 1);
    assert_eq!(metrics.cache_hits, 1);
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_bundle_fetch() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_name(110, "archive_s100_e199")
        .mock_bundle_name(120, "archive_s100_e199")
        .mock_bundle_name(130, "archive_s100_e199");
    mock.mock_bundle_blocks(110, &create_test_bundle(100, 199));
    mock.mock_bundle_blocks(120, &create_test_bundle(100, 199));
    mock.mock_bundle_blocks(130, &create_test_bundle(100, 199));

    let service = create_archiver_service(&mock.url());
    let (a, b, c) = tokio::join!(
        service.get_block_by_number(110),
        service.get_block_by_number(120),
        service.get_block_by_number(130),
    );

    assert_eq!(a.unwrap().expect("block 110").number(), 110);
    assert_eq!(b.unwrap().expect("block 120").number(), 120);
    assert_eq!(c.unwrap().expect("block 130").number(), 130);

    assert_eq!(service.metrics().snapshot().bundle_fetches, 1, "one bundle download");
    assert!(!service.range_lock().is_within_any_range(150));
}

#[tokio::test]
async fn test_hash_lookup_resolves_number_then_fetches_bundle() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_get_block_by_hash(&block_hash(42), &create_test_block(42, 1))
        .mock_bundle_name(42, "archive_s0_e99")
        .mock_bundle_blocks(42, &create_test_bundle(0, 99));

    let service = create_archiver_service(&mock.url());
    let hash = Hash32::try_from(block_hash(42).as_str()).unwrap();

    let by_hash = service.get_block_by_hash(&hash).await.unwrap().expect("block 42");
    let by_number = service.get_block_by_number(42).await.unwrap().expect("block 42");

    assert_eq!(by_hash, by_number);
    assert!(mock.verify_all_called());
}

#[tokio::test]
async fn test_unknown_hash_is_none() {
    let hash = format!("0x{}", "ee".repeat(32));
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_get_block_by_hash(&hash, &Value::Null);

    let service = create_archiver_service(&mock.url());
    let hash = Hash32::try_from(hash.as_str()).unwrap();

    assert!(service.get_block_by_hash(&hash).await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_bundle_name_fails_without_locking() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_name(150, "archive_e199_s100");

    let service = create_archiver_service(&mock.url());
    let err = service.get_block_by_number(150).await.unwrap_err();

    assert!(err.is_upstream());
    assert_eq!(err.kind(), "malformed_bundle_name");
    assert_eq!(service.range_lock().active_ranges(), 0);
    assert_eq!(service.metrics().snapshot().range_discovery_errors, 1);
}

#[tokio::test]
async fn test_bundle_outside_requested_block_is_rejected() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_name(150, "archive_s200_e299");

    let service = create_archiver_service(&mock.url());
    let err = service.get_block_by_number(150).await.unwrap_err();

    assert!(err.is_upstream());
    assert_eq!(service.range_lock().active_ranges(), 0);
}

#[tokio::test]
async fn test_bundle_rpc_error_releases_range() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_name(150, "archive_s100_e199")
        .mock_rpc_error("eth_getBundledBlockByNumber", -32000, "bundle unavailable");

    let service = create_archiver_service(&mock.url());
    let err = service.get_block_by_number(150).await.unwrap_err();

    assert!(err.is_upstream());
    assert!(!err.is_retry_later());
    assert!(!service.range_lock().is_within_any_range(150));
    assert_eq!(service.caches().occupancy().hash_entries, 0);
}

#[tokio::test]
async fn test_block_missing_from_bundle_is_none() {
    let mut bundle = create_test_bundle(100, 199);
    bundle.retain(|block| block["number"] != "0x96");

    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_name(150, "archive_s100_e199").mock_bundle_blocks(150, &bundle);

    let service = create_archiver_service(&mock.url());

    assert!(service.get_block_by_number(150).await.unwrap().is_none());
    assert_eq!(service.caches().occupancy().hash_entries, 99);
}

#[tokio::test]
async fn test_small_cache_keeps_most_recent_blocks() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_name(150, "archive_s100_e199")
        .mock_bundle_blocks(150, &create_test_bundle(100, 199));

    let service = create_archiver_service_with_caches(&mock.url(), 10);

    // The requested block is returned even when the bundle overflows the cache
    let pair = service.get_block_by_number(150).await.unwrap().expect("block 150");
    assert_eq!(pair.number(), 150);

    let occupancy = service.caches().occupancy();
    assert_eq!(occupancy.hash_entries, 10);
    assert!(service.caches().get_by_number(199).is_some());
    assert!(service.caches().get_by_number(100).is_none());
}

#[tokio::test]
async fn test_latest_block_is_not_cached() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_latest_block(&create_test_block(5000, 2));

    let service = create_archiver_service(&mock.url());
    let header = service.get_latest_header().await.unwrap().expect("latest header");

    assert_eq!(header.number, 5000);
    assert_eq!(service.caches().occupancy().hash_entries, 0);
}

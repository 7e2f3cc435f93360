//! Integration tests for `ArchiveClient` against a mock archive.

use crate::mock_infrastructure::{
    block_hash, create_archive_client, create_test_block, create_test_bundle, ArchiveMockBuilder,
};
use archiver_core::{
    types::{BlockRange, Hash32},
    upstream::{RemoteArchive, UpstreamError},
};
use serde_json::Value;

#[tokio::test]
async fn test_fetch_block_by_number_decodes_block() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_get_block_by_number(100, &create_test_block(100, 3));

    let client = create_archive_client(&mock.url());
    let block = client.fetch_block_by_number(100).await.unwrap().expect("block 100");

    assert_eq!(block.number(), 100);
    assert_eq!(block.hash().to_string(), block_hash(100));
    assert_eq!(block.body.transactions.len(), 3, "full transactions reduced to hashes");
    assert_eq!(block.header.total_difficulty, Some(200));
    assert!(mock.verify_all_called());
}

#[tokio::test]
async fn test_null_result_is_none() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_get_block_by_number(999_999, &Value::Null);

    let client = create_archive_client(&mock.url());
    assert!(client.fetch_block_by_number(999_999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_fetch_block_by_hash() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_get_block_by_hash(&block_hash(77), &create_test_block(77, 0));

    let client = create_archive_client(&mock.url());
    let hash = Hash32::try_from(block_hash(77).as_str()).unwrap();
    let block = client.fetch_block_by_hash(&hash).await.unwrap().expect("block 77");

    assert_eq!(block.number(), 77);
    assert!(block.body.transactions.is_empty());
}

#[tokio::test]
async fn test_rpc_error_maps_to_upstream_rpc_error() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_rpc_error("eth_getBlockByNumber", -32005, "limit exceeded");

    let client = create_archive_client(&mock.url());
    let err = client.fetch_block_by_number(5).await.unwrap_err();

    assert!(matches!(err, UpstreamError::RpcError(-32005, ref message) if message == "limit exceeded"));
}

#[tokio::test]
async fn test_fetch_bundle_range_parses_name() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_name(1500, "bsc_mainnet_s1000_e1999");

    let client = create_archive_client(&mock.url());
    let range = client.fetch_bundle_range(1500).await.unwrap();

    assert_eq!(range, BlockRange::new(1000, 1999));
    assert!(mock.verify_all_called());
}

#[tokio::test]
async fn test_fetch_bundle_range_rejects_malformed_name() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_name(1500, "bundle-1000-1999");

    let client = create_archive_client(&mock.url());
    let err = client.fetch_bundle_range(1500).await.unwrap_err();

    assert!(matches!(err, UpstreamError::MalformedBundleName(ref name) if name == "bundle-1000-1999"));
}

#[tokio::test]
async fn test_fetch_bundle_range_missing_endpoint_is_http_error() {
    let mock = ArchiveMockBuilder::new().await;

    let client = create_archive_client(&mock.url());
    let err = client.fetch_bundle_range(1500).await.unwrap_err();

    assert!(matches!(err, UpstreamError::HttpError(501, _)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_fetch_bundle_blocks_returns_whole_bundle() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_blocks(120, &create_test_bundle(100, 149));

    let client = create_archive_client(&mock.url());
    let blocks = client.fetch_bundle_blocks(120).await.unwrap();

    assert_eq!(blocks.len(), 50);
    assert_eq!(blocks.first().unwrap().number(), 100);
    assert_eq!(blocks.last().unwrap().number(), 149);
    assert!(mock.verify_all_called());
}

#[tokio::test]
async fn test_malformed_block_in_bundle_is_invalid_response() {
    let mut bundle = create_test_bundle(0, 3);
    bundle[2]["hash"] = Value::from("0xnothex");

    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_bundle_blocks(1, &bundle);

    let client = create_archive_client(&mock.url());
    let err = client.fetch_bundle_blocks(1).await.unwrap_err();

    assert!(matches!(err, UpstreamError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_server_error_is_http_error_after_retries() {
    let mut mock = ArchiveMockBuilder::new().await;
    mock.mock_server_error();

    let client = create_archive_client(&mock.url());
    let err = client.fetch_block_by_number(1).await.unwrap_err();

    assert!(matches!(err, UpstreamError::HttpError(500, _)));
    assert!(mock.verify_all_called());
}

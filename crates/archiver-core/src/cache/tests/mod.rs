//! Shared fixtures for cache and archiver tests.

use crate::{
    cache::types::{ArchivedBlock, BlockBody, BlockHeader},
    types::Hash32,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Deterministic, number-unique hash for test blocks.
pub(crate) fn test_hash(block_num: u64) -> Hash32 {
    let mut bytes = [0xB1u8; 32];
    bytes[24..].copy_from_slice(&block_num.to_be_bytes());
    Hash32(bytes)
}

/// Creates a test `BlockHeader` with all required fields.
pub(crate) fn create_test_header(block_num: u64) -> BlockHeader {
    BlockHeader {
        hash: test_hash(block_num),
        number: block_num,
        parent_hash: test_hash(block_num.saturating_sub(1)),
        uncles_hash: Hash32([0x1d; 32]),
        miner: [0xAA; 20],
        state_root: Hash32([0x01; 32]),
        transactions_root: Hash32([0x02; 32]),
        receipts_root: Hash32([0x03; 32]),
        logs_bloom: Arc::new(vec![0; 256]),
        difficulty: 2,
        gas_limit: 30_000_000,
        gas_used: 15_000_000,
        timestamp: block_num * 3,
        extra_data: Arc::new(vec![]),
        mix_hash: Hash32::default(),
        nonce: 0,
        base_fee_per_gas: Some(7),
        withdrawals_root: None,
        total_difficulty: Some(300),
    }
}

/// Creates a test `BlockBody` with the given hash.
pub(crate) fn create_test_body(block_hash: Hash32) -> BlockBody {
    BlockBody {
        hash: block_hash,
        transactions: vec![Hash32([1u8; 32]), Hash32([2u8; 32])],
        uncles: vec![],
    }
}

pub(crate) fn create_test_block(block_num: u64) -> ArchivedBlock {
    let header = create_test_header(block_num);
    let body = create_test_body(header.hash);
    ArchivedBlock { header: Arc::new(header), body: Arc::new(body) }
}

/// JSON-RPC representation of the block produced by [`create_test_block`].
pub(crate) fn json_block(block_num: u64) -> Value {
    json!({
        "hash": test_hash(block_num).to_string(),
        "number": format!("0x{block_num:x}"),
        "parentHash": test_hash(block_num.saturating_sub(1)).to_string(),
        "sha3Uncles": Hash32([0x1d; 32]).to_string(),
        "miner": format!("0x{}", "aa".repeat(20)),
        "stateRoot": Hash32([0x01; 32]).to_string(),
        "transactionsRoot": Hash32([0x02; 32]).to_string(),
        "receiptsRoot": Hash32([0x03; 32]).to_string(),
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "difficulty": "0x2",
        "gasLimit": "0x1c9c380",
        "gasUsed": "0xe4e1c0",
        "timestamp": format!("0x{:x}", block_num * 3),
        "extraData": "0x",
        "mixHash": Hash32::default().to_string(),
        "nonce": "0x0000000000000000",
        "baseFeePerGas": "0x7",
        "totalDifficulty": "0x12c",
        "transactions": [Hash32([1u8; 32]).to_string(), Hash32([2u8; 32]).to_string()],
        "uncles": [],
    })
}

#[test]
fn test_json_fixture_matches_struct_fixture() {
    let parsed = crate::cache::converter::json_block_to_archived_block(&json_block(42))
        .expect("fixture parses");
    assert_eq!(parsed, create_test_block(42));
}

use crate::{
    cache::types::{ArchivedBlock, BlockBody, BlockHeader},
    types::Hash32,
};
use serde_json::Value;
use std::sync::Arc;

// --- Hex Utilities ---

/// Decodes hex string to bytes, stripping optional "0x" prefix.
/// Returns `None` for invalid hex or odd-length strings.
#[must_use]
pub fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    hex::decode(hex.strip_prefix("0x").unwrap_or(hex)).ok()
}

/// Decodes hex string to a fixed-size byte array (e.g., addresses, hashes).
/// Returns `None` if length doesn't match `N*2` or contains invalid hex.
#[must_use]
pub fn hex_to_array<const N: usize>(hex: &str) -> Option<[u8; N]> {
    let hex_str = hex.strip_prefix("0x").unwrap_or(hex);
    if hex_str.len() != N * 2 {
        return None;
    }

    let mut array = [0u8; N];
    hex::decode_to_slice(hex_str, &mut array).ok()?;
    Some(array)
}

fn hex_to_hash(hex: &str) -> Option<Hash32> {
    hex_to_array::<32>(hex).map(Hash32)
}

/// Parses hex or decimal string to u64. Handles "0x" prefix.
/// For unprefixed strings, tries decimal first then hex fallback.
#[must_use]
pub fn hex_to_u64(s: &str) -> Option<u64> {
    if let Some(hex_str) = s.strip_prefix("0x") {
        u64::from_str_radix(hex_str, 16).ok()
    } else {
        s.parse::<u64>().ok().or_else(|| u64::from_str_radix(s, 16).ok())
    }
}

/// Parses a 0x-prefixed quantity into a u128 (total difficulty can exceed 64 bits).
#[must_use]
pub fn hex_to_u128(s: &str) -> Option<u128> {
    u128::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok()
}

#[must_use]
pub fn format_hex_u64(value: u64) -> String {
    format!("0x{value:x}")
}

#[must_use]
pub fn format_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn str_field<'a>(block: &'a Value, field: &str) -> Option<&'a str> {
    block.get(field)?.as_str()
}

/// Reads an optional field; `None` when absent or null, `Some(None)` when present but malformed.
fn optional_field<T>(block: &Value, field: &str, parse: impl Fn(&str) -> Option<T>) -> Option<Option<T>> {
    match block.get(field) {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(s)) if s.is_empty() => Some(None),
        Some(value) => value.as_str().and_then(&parse).map(Some),
    }
}

// --- Block Conversions ---

/// Converts a JSON-RPC block object to the internal `BlockHeader` format.
/// Returns `None` if required fields are missing or malformed.
#[must_use]
pub fn json_block_to_block_header(block: &Value) -> Option<BlockHeader> {
    Some(BlockHeader {
        hash: hex_to_hash(str_field(block, "hash")?)?,
        number: hex_to_u64(str_field(block, "number")?)?,
        parent_hash: hex_to_hash(str_field(block, "parentHash")?)?,
        uncles_hash: hex_to_hash(str_field(block, "sha3Uncles")?)?,
        miner: hex_to_array::<20>(str_field(block, "miner")?)?,
        state_root: hex_to_hash(str_field(block, "stateRoot")?)?,
        transactions_root: hex_to_hash(str_field(block, "transactionsRoot")?)?,
        receipts_root: hex_to_hash(str_field(block, "receiptsRoot")?)?,
        logs_bloom: Arc::new(hex_to_bytes(str_field(block, "logsBloom")?)?),
        difficulty: hex_to_u64(str_field(block, "difficulty")?)?,
        gas_limit: hex_to_u64(str_field(block, "gasLimit")?)?,
        gas_used: hex_to_u64(str_field(block, "gasUsed")?)?,
        timestamp: hex_to_u64(str_field(block, "timestamp")?)?,
        extra_data: Arc::new(hex_to_bytes(str_field(block, "extraData")?)?),
        mix_hash: hex_to_hash(str_field(block, "mixHash")?)?,
        nonce: hex_to_u64(str_field(block, "nonce")?)?,
        base_fee_per_gas: optional_field(block, "baseFeePerGas", hex_to_u64)?,
        withdrawals_root: optional_field(block, "withdrawalsRoot", hex_to_hash)?,
        total_difficulty: optional_field(block, "totalDifficulty", hex_to_u128)?,
    })
}

/// Extracts transaction and uncle hashes from a JSON-RPC block to create `BlockBody`.
/// Handles both formats:
/// - Transaction hashes as strings (when `fullTransactions=false`)
/// - Full transaction objects (when `fullTransactions=true`) - extracts hash from each object
///
/// Returns `None` if any transaction entry cannot be decoded.
#[must_use]
pub fn json_block_to_block_body(block: &Value) -> Option<BlockBody> {
    let hash = hex_to_hash(str_field(block, "hash")?)?;

    let transactions = block
        .get("transactions")?
        .as_array()?
        .iter()
        .map(|tx| match tx {
            Value::String(hash_str) => hex_to_hash(hash_str),
            Value::Object(tx_obj) => tx_obj.get("hash").and_then(Value::as_str).and_then(hex_to_hash),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    let uncles = match block.get("uncles") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => value
            .as_array()?
            .iter()
            .map(|uncle| uncle.as_str().and_then(hex_to_hash))
            .collect::<Option<Vec<_>>>()?,
    };

    Some(BlockBody { hash, transactions, uncles })
}

/// Converts a JSON-RPC block object into an [`ArchivedBlock`].
#[must_use]
pub fn json_block_to_archived_block(block: &Value) -> Option<ArchivedBlock> {
    let header = json_block_to_block_header(block)?;
    let body = json_block_to_block_body(block)?;

    Some(ArchivedBlock { header: Arc::new(header), body: Arc::new(body) })
}

/// Combines header and body into a JSON-RPC block response with transaction hashes.
#[must_use]
pub fn block_to_json(header: &BlockHeader, body: &BlockBody) -> Value {
    let mut block = serde_json::json!({
        "hash": header.hash.to_string(),
        "number": format_hex_u64(header.number),
        "parentHash": header.parent_hash.to_string(),
        "sha3Uncles": header.uncles_hash.to_string(),
        "miner": format_hex(&header.miner),
        "stateRoot": header.state_root.to_string(),
        "transactionsRoot": header.transactions_root.to_string(),
        "receiptsRoot": header.receipts_root.to_string(),
        "logsBloom": format_hex(&header.logs_bloom),
        "difficulty": format_hex_u64(header.difficulty),
        "gasLimit": format_hex_u64(header.gas_limit),
        "gasUsed": format_hex_u64(header.gas_used),
        "timestamp": format_hex_u64(header.timestamp),
        "extraData": format_hex(&header.extra_data),
        "mixHash": header.mix_hash.to_string(),
        "nonce": format!("0x{:016x}", header.nonce),
        "transactions": body.transactions.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "uncles": body.uncles.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });

    if let Value::Object(map) = &mut block {
        if let Some(base_fee) = header.base_fee_per_gas {
            map.insert("baseFeePerGas".to_string(), Value::String(format_hex_u64(base_fee)));
        }
        if let Some(root) = header.withdrawals_root {
            map.insert("withdrawalsRoot".to_string(), Value::String(root.to_string()));
        }
        if let Some(td) = header.total_difficulty {
            map.insert("totalDifficulty".to_string(), Value::String(format!("0x{td:x}")));
        }
    }

    block
}

//! Core type definitions shared by the archive client, the cache, and the server.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: Protocol conformance for both the
//!   outgoing archive calls and the incoming server requests
//!
//! ## Chain Primitives
//! - [`Hash32`]: Block hash, the join key between the number index and the body/header caches
//! - [`BlockRange`]: Inclusive block interval, one archive bundle

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, sync::Arc};

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for JSON-RPC version - zero allocation for static usage.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// JSON-RPC 2.0 request structure.
///
/// # Example
///
/// ```
/// use archiver_core::types::JsonRpcRequest;
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("eth_getBlockByNumber", Some(json!(["0x64", true])), json!(1));
///
/// assert_eq!(request.method, "eth_getBlockByNumber");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default = "default_request_id")]
    pub id: Arc<serde_json::Value>,
}

fn default_request_id() -> Arc<serde_json::Value> {
    Arc::new(serde_json::Value::Null)
}

/// JSON-RPC 2.0 response structure.
///
/// A response contains either a `result` (success) or an `error` (failure), but never both.
/// The archive answers a lookup for an unknown block with `"result": null`, which is why
/// `result` is kept as a raw value instead of being deserialized eagerly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(default = "default_request_id")]
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with zero allocation for the version string.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: serde_json::Value,
    ) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params, id: Arc::new(id) }
    }
}

impl JsonRpcResponse {
    /// Creates a successful JSON-RPC response with zero allocation for the version string.
    #[must_use]
    pub fn success(result: serde_json::Value, id: Arc<serde_json::Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None, id }
    }

    /// Creates an error JSON-RPC response with zero allocation for the version string.
    #[must_use]
    pub fn error(code: i32, message: String, id: Arc<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError { code, message, data: None }),
            id,
        }
    }
}

/// JSON-RPC 2.0 error object.
///
/// Standard error codes follow the JSON-RPC 2.0 convention:
///
/// - `-32700`: Parse error (invalid JSON)
/// - `-32600`: Invalid request (malformed JSON-RPC)
/// - `-32601`: Method not found
/// - `-32602`: Invalid params
/// - `-32603`: Internal error
/// - `-32000` to `-32099`: Server-defined errors (implementation-specific)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Error type for hash parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashParseError {
    #[error("missing 0x prefix")]
    MissingPrefix,
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// 32-byte block hash.
///
/// Provides `TryFrom<&str>` for idiomatic parsing of 0x-prefixed hex strings.
///
/// # Example
/// ```
/// use archiver_core::types::Hash32;
///
/// let hash: Hash32 = "0xabcd1234abcd1234abcd1234abcd1234abcd1234abcd1234abcd1234abcd1234"
///     .try_into()
///     .unwrap();
/// assert_eq!(hash.as_bytes()[0], 0xab);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// Returns the inner byte array.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl TryFrom<&str> for Hash32 {
    type Error = HashParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let hex_str = value.strip_prefix("0x").ok_or(HashParseError::MissingPrefix)?;

        let bytes = hex::decode(hex_str).map_err(|e| HashParseError::InvalidHex(e.to_string()))?;

        if bytes.len() != 32 {
            return Err(HashParseError::InvalidLength(bytes.len()));
        }

        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Hash32(arr))
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(arr: [u8; 32]) -> Self {
        Hash32(arr)
    }
}

impl std::fmt::Display for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for Hash32 {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

/// Inclusive block interval `[from, to]`, the unit the archive bundles blocks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    /// Creates a new block range.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `from > to`.
    #[inline]
    #[must_use]
    pub fn new(from: u64, to: u64) -> Self {
        debug_assert!(from <= to, "Invalid BlockRange: from ({from}) > to ({to})");
        Self { from, to }
    }

    /// Returns the number of blocks in this range (inclusive).
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        self.to.saturating_sub(self.from).saturating_add(1)
    }

    /// Returns true only for inverted ranges where `from > to`.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, block: u64) -> bool {
        block >= self.from && block <= self.to
    }

    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &BlockRange) -> bool {
        self.from <= other.to && self.to >= other.from
    }

    /// Iterates every block number in the range without overflowing at `u64::MAX`.
    pub fn iter(&self) -> impl Iterator<Item = u64> {
        self.from..=self.to
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

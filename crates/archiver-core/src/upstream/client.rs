use crate::{
    cache::{converter::json_block_to_archived_block, types::ArchivedBlock},
    types::{BlockRange, Hash32, JsonRpcRequest, JsonRpcResponse},
    upstream::{
        bundle::{parse_bundle_name, BundleNameResponse},
        http_client::HttpClient,
        UpstreamError,
    },
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tracing::{debug, trace};

/// Network operations the archiver needs from the remote block archive.
///
/// A `None` result means the archive answered but has no such block. Any failure to reach
/// the archive or to decode its answer is an [`UpstreamError`].
#[async_trait]
pub trait RemoteArchive: Send + Sync {
    async fn fetch_latest_block(&self) -> Result<Option<ArchivedBlock>, UpstreamError>;

    async fn fetch_block_by_number(&self, number: u64) -> Result<Option<ArchivedBlock>, UpstreamError>;

    async fn fetch_block_by_hash(&self, hash: &Hash32) -> Result<Option<ArchivedBlock>, UpstreamError>;

    /// Returns the inclusive range of the bundle containing `number`.
    async fn fetch_bundle_range(&self, number: u64) -> Result<BlockRange, UpstreamError>;

    /// Returns every block of the bundle containing `number`, in archive order.
    async fn fetch_bundle_blocks(&self, number: u64) -> Result<Vec<ArchivedBlock>, UpstreamError>;
}

/// JSON-RPC and REST client for a block archive endpoint.
pub struct ArchiveClient {
    rpc_address: Arc<str>,
    http_client: Arc<HttpClient>,
    timeout: Duration,
}

impl ArchiveClient {
    #[must_use]
    pub fn new(rpc_address: impl Into<Arc<str>>, http_client: Arc<HttpClient>, timeout: Duration) -> Self {
        let rpc_address: Arc<str> = rpc_address.into();
        Self { rpc_address, http_client, timeout }
    }

    #[must_use]
    pub fn rpc_address(&self) -> &str {
        &self.rpc_address
    }

    fn bundle_name_url(&self, number: u64) -> String {
        format!("{}/bsc/v1/blocks/{number}/bundle/name", self.rpc_address.trim_end_matches('/'))
    }

    /// Sends a JSON-RPC request and returns its `result`, mapping `null` to `None`.
    async fn call(&self, method: &str, params: Value) -> Result<Option<Value>, UpstreamError> {
        let request = JsonRpcRequest::new(method, Some(params), json!(1));
        let body = serde_json::to_vec(&request)
            .map_err(|e| UpstreamError::InvalidResponse(format!("Failed to encode request: {e}")))?;

        trace!(method = method, "sending archive request");

        let bytes = self
            .http_client
            .post_json(&self.rpc_address, bytes::Bytes::from(body), self.timeout)
            .await?;

        let response: JsonRpcResponse = serde_json::from_slice(&bytes)
            .map_err(|e| UpstreamError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        if let Some(error) = response.error {
            debug!(method = method, code = error.code, message = %error.message, "archive returned rpc error");
            return Err(UpstreamError::RpcError(error.code, error.message));
        }

        Ok(response.result.filter(|value| !value.is_null()))
    }

    async fn call_block(&self, method: &str, params: Value) -> Result<Option<ArchivedBlock>, UpstreamError> {
        self.call(method, params).await?.as_ref().map(decode_block).transpose()
    }
}

fn decode_block(value: &Value) -> Result<ArchivedBlock, UpstreamError> {
    json_block_to_archived_block(value)
        .ok_or_else(|| UpstreamError::InvalidResponse("Malformed block object".to_string()))
}

fn hex_number(number: u64) -> String {
    format!("0x{number:x}")
}

#[async_trait]
impl RemoteArchive for ArchiveClient {
    async fn fetch_latest_block(&self) -> Result<Option<ArchivedBlock>, UpstreamError> {
        self.call_block("eth_getBlockByNumber", json!(["latest", true])).await
    }

    async fn fetch_block_by_number(&self, number: u64) -> Result<Option<ArchivedBlock>, UpstreamError> {
        self.call_block("eth_getBlockByNumber", json!([hex_number(number), true])).await
    }

    async fn fetch_block_by_hash(&self, hash: &Hash32) -> Result<Option<ArchivedBlock>, UpstreamError> {
        self.call_block("eth_getBlockByHash", json!([hash.to_string(), true])).await
    }

    async fn fetch_bundle_range(&self, number: u64) -> Result<BlockRange, UpstreamError> {
        let bytes = self.http_client.get(&self.bundle_name_url(number), self.timeout).await?;
        let response: BundleNameResponse = serde_json::from_slice(&bytes).map_err(|e| {
            UpstreamError::InvalidResponse(format!("Failed to parse bundle name response: {e}"))
        })?;

        parse_bundle_name(&response.data)
    }

    async fn fetch_bundle_blocks(&self, number: u64) -> Result<Vec<ArchivedBlock>, UpstreamError> {
        let Some(result) = self.call("eth_getBundledBlockByNumber", json!([hex_number(number)])).await?
        else {
            return Ok(Vec::new());
        };

        let blocks = result
            .as_array()
            .ok_or_else(|| UpstreamError::InvalidResponse("Bundle result is not an array".to_string()))?;

        blocks.iter().map(decode_block).collect()
    }
}

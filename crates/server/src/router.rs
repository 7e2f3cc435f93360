use archiver_core::{
    archive::{ArchiverError, BlockArchiver, BlockArchiverService},
    cache::{converter::block_to_json, converter::format_hex_u64, converter::hex_to_u64, BlockPair},
    types::{Hash32, JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION},
};
use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value;
use std::{sync::Arc, time::Instant};
use tracing::{debug, info, warn};

type RpcResponse = (StatusCode, Json<Value>);

/// Block tag accepted by `eth_getBlockByNumber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockTag {
    Latest,
    Number(u64),
}

fn invalid_request(message: impl Into<String>) -> JsonRpcError {
    JsonRpcError { code: -32600, message: message.into(), data: None }
}

fn invalid_params(message: impl Into<String>) -> JsonRpcError {
    JsonRpcError { code: -32602, message: message.into(), data: None }
}

fn method_not_found(method: &str) -> JsonRpcError {
    JsonRpcError { code: -32601, message: format!("Method not found: {method}"), data: None }
}

/// Maps lookup failures onto JSON-RPC codes.
///
/// A bounded wait that ran out is reported as a server error with a retry hint, so clients
/// can tell it apart from a failing archive.
fn archiver_error(e: &ArchiverError) -> JsonRpcError {
    let code = if e.is_retry_later() { -32000 } else { -32603 };
    JsonRpcError { code, message: e.to_string(), data: None }
}

fn to_value(response: &JsonRpcResponse) -> Value {
    serde_json::to_value(response).unwrap_or(Value::Null)
}

/// Handles JSON-RPC requests (single or batched).
///
/// The body is parsed here instead of through the `Json` extractor so that malformed JSON is
/// answered with a JSON-RPC parse error (`-32700`) rather than a bare HTTP rejection.
pub async fn handle_rpc(State(archiver): State<Arc<BlockArchiverService>>, body: Bytes) -> impl IntoResponse {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            let response = JsonRpcResponse::error(-32700, format!("Parse error: {e}"), Arc::new(Value::Null));
            return (StatusCode::BAD_REQUEST, Json(to_value(&response)));
        }
    };

    match payload {
        Value::Array(items) => handle_batch_request(archiver, items).await,
        single => handle_single_request(archiver, single).await,
    }
}

async fn handle_single_request(archiver: Arc<BlockArchiverService>, payload: Value) -> RpcResponse {
    let request: JsonRpcRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            let response =
                JsonRpcResponse::error(-32600, format!("Invalid request: {e}"), Arc::new(Value::Null));
            return (StatusCode::BAD_REQUEST, Json(to_value(&response)));
        }
    };

    let response = process_request(&archiver, request).await;
    (StatusCode::OK, Json(to_value(&response)))
}

async fn handle_batch_request(archiver: Arc<BlockArchiverService>, items: Vec<Value>) -> RpcResponse {
    if items.is_empty() {
        let response =
            JsonRpcResponse::error(-32600, "Invalid request: empty batch".to_string(), Arc::new(Value::Null));
        return (StatusCode::BAD_REQUEST, Json(to_value(&response)));
    }

    let batch_size = items.len();
    info!(batch_size, "received batched RPC request");

    let futures = items.into_iter().map(|item| {
        let archiver = Arc::clone(&archiver);
        async move {
            let item_id = match &item {
                Value::Object(map) => Arc::new(map.get("id").cloned().unwrap_or(Value::Null)),
                _ => Arc::new(Value::Null),
            };

            match serde_json::from_value::<JsonRpcRequest>(item) {
                Ok(request) => to_value(&process_request(&archiver, request).await),
                Err(_) => to_value(&JsonRpcResponse::error(
                    -32600,
                    "Invalid request".to_string(),
                    item_id,
                )),
            }
        }
    });

    // join_all preserves input order
    let responses = futures::future::join_all(futures).await;
    (StatusCode::OK, Json(Value::Array(responses)))
}

/// Runs one request against the archiver and records its outcome.
async fn process_request(archiver: &BlockArchiverService, request: JsonRpcRequest) -> JsonRpcResponse {
    let start = Instant::now();
    let id = Arc::clone(&request.id);

    let result = if request.jsonrpc != JSONRPC_VERSION {
        Err(invalid_request(format!("Unsupported JSON-RPC version: {}", request.jsonrpc)))
    } else {
        dispatch(archiver, &request.method, request.params.as_ref()).await
    };

    #[allow(clippy::cast_possible_truncation)]
    let latency_ms = start.elapsed().as_millis() as u64;
    archiver.metrics().record_request(&request.method, result.is_ok(), latency_ms);

    match result {
        Ok(value) => JsonRpcResponse::success(value, id),
        Err(error) => {
            debug!(method = %request.method, code = error.code, error = %error.message, "request failed");
            JsonRpcResponse::error(error.code, error.message, id)
        }
    }
}

async fn dispatch(
    archiver: &BlockArchiverService,
    method: &str,
    params: Option<&Value>,
) -> Result<Value, JsonRpcError> {
    match method {
        "eth_blockNumber" => {
            let header = archiver.get_latest_header().await.map_err(|e| archiver_error(&e))?;
            Ok(header.map_or(Value::Null, |header| Value::String(format_hex_u64(header.number))))
        }
        "eth_getBlockByNumber" => match parse_block_tag(first_param(params)?)? {
            BlockTag::Latest => {
                let block = archiver.get_latest_block().await.map_err(|e| archiver_error(&e))?;
                Ok(block.map_or(Value::Null, |block| block_to_json(&block.header, &block.body)))
            }
            BlockTag::Number(number) => {
                let pair = archiver.get_block_by_number(number).await.map_err(|e| {
                    warn!(block = number, error = %e, "block lookup failed");
                    archiver_error(&e)
                })?;
                Ok(render_pair(pair))
            }
        },
        "eth_getBlockByHash" => {
            let hash = parse_hash(first_param(params)?)?;
            let pair = archiver.get_block_by_hash(&hash).await.map_err(|e| {
                warn!(hash = %hash, error = %e, "block lookup failed");
                archiver_error(&e)
            })?;
            Ok(render_pair(pair))
        }
        other => Err(method_not_found(other)),
    }
}

fn render_pair(pair: Option<BlockPair>) -> Value {
    pair.map_or(Value::Null, |pair| block_to_json(&pair.header, &pair.body))
}

fn first_param(params: Option<&Value>) -> Result<&Value, JsonRpcError> {
    params
        .and_then(Value::as_array)
        .and_then(|params| params.first())
        .ok_or_else(|| invalid_params("Missing block parameter"))
}

fn parse_block_tag(param: &Value) -> Result<BlockTag, JsonRpcError> {
    let tag = param.as_str().ok_or_else(|| invalid_params("Block parameter must be a string"))?;
    match tag {
        "latest" | "safe" | "finalized" => Ok(BlockTag::Latest),
        "earliest" => Ok(BlockTag::Number(0)),
        "pending" => Err(invalid_params("Pending blocks are not archived")),
        number if number.starts_with("0x") => hex_to_u64(number)
            .map(BlockTag::Number)
            .ok_or_else(|| invalid_params(format!("Invalid block number: {number}"))),
        other => Err(invalid_params(format!("Invalid block tag: {other}"))),
    }
}

fn parse_hash(param: &Value) -> Result<Hash32, JsonRpcError> {
    let hash = param.as_str().ok_or_else(|| invalid_params("Block hash must be a string"))?;
    Hash32::try_from(hash).map_err(|e| invalid_params(format!("Invalid block hash: {e}")))
}

#[allow(clippy::unused_async)]
pub async fn handle_metrics(State(archiver): State<Arc<BlockArchiverService>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        archiver.metrics().get_prometheus_metrics(),
    )
}

#[allow(clippy::unused_async)]
pub async fn handle_health(State(archiver): State<Arc<BlockArchiverService>>) -> impl IntoResponse {
    let occupancy = archiver.caches().occupancy();
    let health_status = serde_json::json!({
        "status": "healthy",
        "cache": occupancy,
        "in_flight_ranges": archiver.range_lock().active_ranges(),
        "in_flight_blocks": archiver.range_lock().covered_blocks(),
        "metrics": archiver.metrics().snapshot(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (
        StatusCode::OK,
        [("content-type", "application/json")],
        serde_json::to_string(&health_status).unwrap_or_default(),
    )
}

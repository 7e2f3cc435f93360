//! HTTP application assembly.

use crate::{middleware, router};
use archiver_core::{archive::BlockArchiverService, config::AppConfig};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer};

/// Builds the router: `/health` and `/metrics` (when enabled) are public; JSON-RPC on `/` is
/// bounded by the configured concurrency and body size limits.
pub fn create_app(archiver: Arc<BlockArchiverService>, config: &AppConfig) -> Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();
    let (set_request_id_public, propagate_request_id_public) = middleware::create_request_id_layers();

    let mut public = Router::new().route("/health", get(router::handle_health));
    if config.metrics.enabled {
        public = public.route("/metrics", get(router::handle_metrics));
    }
    let public = public
        .with_state(Arc::clone(&archiver))
        .layer(propagate_request_id_public)
        .layer(set_request_id_public);

    let rpc = Router::new()
        .route("/", post(router::handle_rpc))
        .with_state(archiver)
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
        .layer(CompressionLayer::new())
        // Layers run in reverse order, so propagate runs after set
        .layer(propagate_request_id)
        .layer(set_request_id);

    public.merge(rpc)
}

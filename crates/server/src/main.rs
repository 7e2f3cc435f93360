use anyhow::Result;
use archiver_core::{
    archive::BlockArchiverService, config::AppConfig, metrics::MetricsCollector, upstream::HttpClient,
};
use axum::serve;
use server::app;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{signal, sync::broadcast};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to the archiver crates and
/// everything else logs at `warn`.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,archiver_core={level},server={level},archiver_server={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

/// Builds the HTTP client, caches and archiver service.
fn init_archiver(config: &AppConfig) -> Result<Arc<BlockArchiverService>> {
    let metrics_collector = Arc::new(MetricsCollector::new());

    let http_client = Arc::new(
        HttpClient::with_config(config.http.clone())
            .map_err(|e| anyhow::anyhow!("HTTP client initialization failed: {e}"))?,
    );

    let archiver = BlockArchiverService::from_config(&config.archiver, http_client, metrics_collector)
        .map_err(|e| anyhow::anyhow!("Block cache initialization failed: {e}"))?;

    info!(
        rpc_address = %config.archiver.rpc_address,
        cache_size = config.archiver.block_cache_size,
        retry_attempts = config.archiver.retry_attempts,
        retry_interval_ms = config.archiver.retry_interval_ms,
        max_wait_ms = u64::try_from(config.max_wait().as_millis()).unwrap_or(u64::MAX),
        "Block archiver initialized"
    );

    Ok(Arc::new(archiver))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;

    init_logging(&config);

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    info!(environment = %config.environment, "Starting block archiver server");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let archiver = init_archiver(&config)?;
    let reporter_handle = archiver.start_background_tasks(&shutdown_tx);

    let bind_addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(address = %bind_addr, "RPC server listening");

    let app = app::create_app(archiver, &config);
    let server = serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());

    if let Err(e) = server.with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "RPC server error");
    }

    let _ = shutdown_tx.send(());
    if let Some(handle) = reporter_handle {
        if tokio::time::timeout(Duration::from_secs(GRACEFUL_SHUTDOWN_TIMEOUT_SECS), handle).await.is_err() {
            warn!("Cache stats reporter did not stop in time");
        }
    }
    info!("Server shutdown complete");

    Ok(())
}

/// Graceful shutdown timeout in seconds.
const GRACEFUL_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(
        "Shutdown signal received, starting graceful shutdown (timeout: {}s)",
        GRACEFUL_SHUTDOWN_TIMEOUT_SECS
    );
}

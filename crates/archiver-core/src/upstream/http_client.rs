use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::upstream::UpstreamError;

/// Configuration for HTTP client concurrency and timeout behavior.
///
/// Controls semaphore-based concurrency limiting with adaptive timeouts
/// based on permit availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Maximum number of concurrent HTTP requests allowed
    pub concurrent_limit: usize,
    /// Permit acquisition timeout in milliseconds under normal load
    pub permit_timeout_ms: u64,
    /// Permit acquisition timeout in milliseconds when permits are scarce
    pub permit_timeout_scarce_ms: u64,
    /// Number of available permits below which they are considered scarce
    pub scarce_permit_threshold: usize,
    /// Idle connection lifetime in the pool, in seconds
    pub pool_idle_timeout_seconds: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 1000,
            permit_timeout_ms: 500,
            permit_timeout_scarce_ms: 200,
            scarce_permit_threshold: 100,
            pool_idle_timeout_seconds: 90,
        }
    }
}

/// HTTP client with semaphore-based concurrency control.
///
/// Shared by every archive call. Bundle downloads can be large, so the per-request
/// timeout is supplied by the caller rather than fixed on the client.
pub struct HttpClient {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
    config: HttpClientConfig,
}

/// RAII guard ensuring semaphore permits are always released.
///
/// Uses [`OwnedSemaphorePermit`] which owns an `Arc` to the semaphore,
/// making it safe to hold across async boundaries.
struct PermitGuard {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
}

impl PermitGuard {
    fn new(permit: OwnedSemaphorePermit, semaphore: Arc<Semaphore>) -> Self {
        Self { _permit: permit, semaphore }
    }

    fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Drop for PermitGuard {
    fn drop(&mut self) {
        tracing::trace!(
            available_permits = self.semaphore.available_permits(),
            "permit guard dropped"
        );
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Sanitizes network errors to prevent information disclosure.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else if error.is_redirect() {
            "too many redirects".to_string()
        } else {
            "network error".to_string()
        }
    }

    /// Creates a new HTTP client with the provided configuration.
    ///
    /// Compression is disabled: bundle payloads are already large JSON arrays and the archive
    /// serves them uncompressed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_seconds))
            .pool_max_idle_per_host(config.concurrent_limit)
            .connect_timeout(Duration::from_secs(5))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("block-archiver/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                UpstreamError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self {
            client,
            concurrent_limit: Arc::new(Semaphore::new(config.concurrent_limit)),
            config,
        })
    }

    /// Sends a JSON POST request and returns the raw response body.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Timeout`] if permit acquisition or request times out
    /// - [`UpstreamError::ConcurrencyLimit`] if the semaphore is closed
    /// - [`UpstreamError::HttpError`] for non-success HTTP status codes
    /// - [`UpstreamError::ConnectionFailed`] for network-related failures
    pub async fn post_json(
        &self,
        url: &str,
        body: bytes::Bytes,
        timeout: Duration,
    ) -> Result<bytes::Bytes, UpstreamError> {
        self.execute(url, timeout, || {
            self.client
                .post(url)
                .header("content-type", "application/json")
                // Bytes::clone() is a reference count bump, retries don't copy the payload
                .body(body.clone())
        })
        .await
    }

    /// Sends a GET request and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::post_json`].
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<bytes::Bytes, UpstreamError> {
        self.execute(url, timeout, || self.client.get(url)).await
    }

    async fn acquire_permit(&self, url: &str) -> Result<PermitGuard, UpstreamError> {
        let permit_timeout =
            if self.concurrent_limit.available_permits() < self.config.scarce_permit_threshold {
                Duration::from_millis(self.config.permit_timeout_scarce_ms)
            } else {
                Duration::from_millis(self.config.permit_timeout_ms)
            };

        let permit = tokio::time::timeout(
            permit_timeout,
            Arc::clone(&self.concurrent_limit).acquire_owned(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                url = url,
                available_permits = self.concurrent_limit.available_permits(),
                "http client semaphore acquisition timeout"
            );
            UpstreamError::Timeout
        })?
        .map_err(|_| {
            tracing::warn!(
                url = url,
                available_permits = self.concurrent_limit.available_permits(),
                "http client concurrency limit reached"
            );
            UpstreamError::ConcurrencyLimit(url.to_string())
        })?;

        Ok(PermitGuard::new(permit, self.concurrent_limit.clone()))
    }

    async fn execute<F>(
        &self,
        url: &str,
        timeout: Duration,
        build: F,
    ) -> Result<bytes::Bytes, UpstreamError>
    where
        F: Fn() -> RequestBuilder,
    {
        const MAX_RETRIES: u32 = 2;

        let permit_guard = self.acquire_permit(url).await?;

        tracing::trace!(
            available_permits = permit_guard.available_permits(),
            "http request started"
        );

        let mut retries = 0;

        loop {
            let result = build().timeout(timeout).send().await;

            match result {
                Ok(response) => {
                    if response.status().is_success() {
                        let result = response.bytes().await.map_err(UpstreamError::Network);
                        tracing::trace!(
                            available_permits = permit_guard.available_permits(),
                            "http request completed"
                        );
                        return result;
                    } else if response.status().is_server_error() && retries < MAX_RETRIES {
                        retries += 1;
                        tokio::time::sleep(Duration::from_millis(100 * (1 << retries))).await;
                        continue;
                    }

                    let status = response.status().as_u16();
                    let raw_text = response.text().await.unwrap_or_default();
                    let sanitized_text = if raw_text.len() > 256 {
                        let cut = (0..=256).rev().find(|&i| raw_text.is_char_boundary(i)).unwrap_or(0);
                        format!("{}... (truncated)", &raw_text[..cut])
                    } else {
                        raw_text
                    };
                    tracing::trace!(
                        status = status,
                        available_permits = permit_guard.available_permits(),
                        "http request failed"
                    );
                    return Err(UpstreamError::HttpError(status, sanitized_text));
                }
                Err(_e) if retries < MAX_RETRIES => {
                    retries += 1;
                    tokio::time::sleep(Duration::from_millis(100 * (1 << retries))).await;
                }
                Err(e) => {
                    tracing::trace!(
                        available_permits = permit_guard.available_permits(),
                        "http request error"
                    );
                    if e.is_timeout() {
                        return Err(UpstreamError::Timeout);
                    }
                    return Err(UpstreamError::ConnectionFailed(Self::sanitize_network_error(&e)));
                }
            }
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.concurrent_limit.available_permits()
    }
}

//! # Archiver Core
//!
//! On-demand access to historical blocks held by a remote block archive that serves blocks in
//! fixed contiguous bundles.
//!
//! - **[`archive`]**: The [`BlockArchiverService`](archive::BlockArchiverService) fetch
//!   coordinator, the [`RangeLock`](archive::RangeLock) over bundles being fetched, and the
//!   cache stats reporter.
//!
//! - **[`cache`]**: The number→hash, hash→body and hash→header cache triplet, consumed through
//!   the [`CacheStore`](cache::CacheStore) capability, and JSON-RPC block conversion.
//!
//! - **[`upstream`]**: HTTP transport and the [`RemoteArchive`](upstream::RemoteArchive)
//!   client for the archive's JSON-RPC and bundle name endpoints.
//!
//! - **[`config`]**: Layered configuration (defaults, TOML, environment).
//!
//! - **[`metrics`]**: Prometheus counters and gauges plus an internal snapshot.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    BlockArchiverService                      │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ BlockCaches  │   │  RangeLock   │   │ MetricsCollector │  │
//! │  └──────┬───────┘   └──────────────┘   └──────────────────┘  │
//! │         │                                                    │
//! │  ┌──────▼───────┐   ┌──────────────────────────────────────┐ │
//! │  │ LruStore x3  │   │ RemoteArchive (ArchiveClient)        │ │
//! │  └──────────────┘   │   └── HttpClient (reqwest, rustls)   │ │
//! │                     └──────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod archive;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod types;
pub mod upstream;

//! Communication with the remote block archive.
//!
//! - [`http_client`]: pooled reqwest client with semaphore-based concurrency limiting and
//!   bounded retries on server errors
//! - [`client`]: the [`RemoteArchive`] capability and its JSON-RPC implementation
//!   [`ArchiveClient`]
//! - [`bundle`]: bundle name parsing (`<prefix>_s<start>_e<end>`)
//!
//! ```text
//! BlockArchiverService ──► RemoteArchive ──► ArchiveClient ──► HttpClient ──► archive
//!                                                 │
//!                          POST /                 ├─ eth_getBlockByNumber
//!                                                 ├─ eth_getBlockByHash
//!                                                 └─ eth_getBundledBlockByNumber
//!                          GET /bsc/v1/blocks/{n}/bundle/name
//! ```

pub mod bundle;
pub mod client;
pub mod errors;
pub mod http_client;

pub use bundle::parse_bundle_name;
pub use client::{ArchiveClient, RemoteArchive};
pub use errors::UpstreamError;
pub use http_client::{HttpClient, HttpClientConfig};

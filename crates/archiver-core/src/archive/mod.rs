//! Bundle fetch coordination.
//!
//! The remote archive serves blocks in fixed contiguous bundles. [`BlockArchiverService`]
//! answers lookups from the cache triplet and, on a miss, fetches the whole bundle containing
//! the requested block, caching every block in it. [`RangeLock`] tracks bundles being fetched
//! so that concurrent lookups for blocks in the same bundle wait for the cache instead of
//! issuing a second fetch.
//!
//! # Guarantees
//!
//! - A lookup never returns a partially cached block (hash, body and header are all present)
//! - At most one fetch per bundle is in flight at a time
//! - A registered range is released on every exit path of its fetch
//! - A waiting lookup gives up after `retry_attempts * retry_interval` with
//!   [`ArchiverError::NotFound`], distinct from [`ArchiverError::Upstream`]

pub mod background;
pub mod config;
pub mod errors;
pub mod range_lock;
pub mod service;

pub use config::ArchiverConfig;
pub use errors::ArchiverError;
pub use range_lock::{RangeGuard, RangeLock};
pub use service::{BlockArchiver, BlockArchiverService};

#[cfg(test)]
mod tests;

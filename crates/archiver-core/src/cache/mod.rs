//! Block cache triplet and the block data types stored in it.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       BlockCaches                          │
//! │    (written and read as one unit by the archiver service)  │
//! └────────────────────────────────────────────────────────────┘
//!        │                     │                      │
//! ┌──────▼───────┐     ┌───────▼───────┐      ┌───────▼───────┐
//! │  number→hash │     │  hash→body    │      │  hash→header  │
//! │  LruStore    │     │  LruStore     │      │  LruStore     │
//! └──────────────┘     └───────────────┘      └───────────────┘
//! ```
//!
//! Each store is reached only through the [`CacheStore`] capability trait so the owner of
//! the caches (and of their eviction policy) can live outside this crate.
//!
//! # Error Handling Conventions
//!
//! - **`Option<T>`**: Cache miss (expected, not an error)
//! - **`Result<T, E>`**: Construction errors such as a zero capacity
//!
//! Wire conversion between JSON-RPC block objects and [`types::BlockHeader`] /
//! [`types::BlockBody`] lives in [`converter`].

pub mod converter;
pub mod store;
pub mod types;

pub use store::{BlockCaches, CacheStore, CacheStoreError, LruStore};
pub use types::{ArchivedBlock, BlockBody, BlockHeader, BlockPair, CacheOccupancy};

#[cfg(test)]
pub(crate) mod tests;

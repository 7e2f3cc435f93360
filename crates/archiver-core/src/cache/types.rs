//! Block data types stored in and served from the cache triplet.
//!
//! Headers and bodies are stored behind `Arc` so a cache hit hands out a reference count
//! bump instead of a deep copy. The same `Arc` is shared by the body/header caches and by
//! every caller that received the block, so all callers observe identical content.

use crate::types::Hash32;
use serde::Serialize;
use std::sync::Arc;

/// Block header as served by the archive.
///
/// Large variable-length fields (`extra_data`, `logs_bloom`) are Arc-wrapped for cheap cloning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub hash: Hash32,
    pub number: u64,
    pub parent_hash: Hash32,
    pub uncles_hash: Hash32,
    pub miner: [u8; 20],
    pub state_root: Hash32,
    pub transactions_root: Hash32,
    pub receipts_root: Hash32,
    pub logs_bloom: Arc<Vec<u8>>,
    pub difficulty: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Arc<Vec<u8>>,
    pub mix_hash: Hash32,
    pub nonce: u64,
    /// Present from London onwards
    pub base_fee_per_gas: Option<u64>,
    /// Present from Shanghai onwards
    pub withdrawals_root: Option<Hash32>,
    /// Reported by the archive alongside the header fields
    pub total_difficulty: Option<u128>,
}

/// Block body: transaction and uncle references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBody {
    pub hash: Hash32,
    pub transactions: Vec<Hash32>,
    pub uncles: Vec<Hash32>,
}

/// A complete block as returned by the remote archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedBlock {
    pub header: Arc<BlockHeader>,
    pub body: Arc<BlockBody>,
}

impl ArchivedBlock {
    #[must_use]
    pub fn hash(&self) -> Hash32 {
        self.header.hash
    }

    #[must_use]
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Splits the block into the body/header pair handed to lookup callers.
    #[must_use]
    pub fn to_pair(&self) -> BlockPair {
        BlockPair { body: Arc::clone(&self.body), header: Arc::clone(&self.header) }
    }
}

/// Body/header pair returned by number and hash lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPair {
    pub body: Arc<BlockBody>,
    pub header: Arc<BlockHeader>,
}

impl BlockPair {
    #[must_use]
    pub fn number(&self) -> u64 {
        self.header.number
    }

    #[must_use]
    pub fn hash(&self) -> Hash32 {
        self.header.hash
    }
}

/// Point-in-time occupancy of the three caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheOccupancy {
    pub hash_entries: usize,
    pub body_entries: usize,
    pub header_entries: usize,
}

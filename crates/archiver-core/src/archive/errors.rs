use crate::upstream::UpstreamError;
use thiserror::Error;

/// Errors returned by [`BlockArchiver`](crate::archive::BlockArchiver) lookups.
#[derive(Error, Debug)]
pub enum ArchiverError {
    /// The archive could not be reached or answered with something unusable.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Another task was fetching the block's bundle and it did not land in the cache in time.
    #[error("Block {number} not found after {attempts} attempts, try again later")]
    NotFound { number: u64, attempts: u32 },
}

impl ArchiverError {
    /// `true` when the lookup gave up waiting on a concurrent fetch.
    #[must_use]
    pub fn is_retry_later(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }

    /// Returns a static label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upstream(e) => e.kind(),
            Self::NotFound { .. } => "not_found",
        }
    }
}

//! Bundle name parsing.
//!
//! The archive names each bundle `<prefix>_s<start>_e<end>`, e.g. `archive_s1000_e1999`.
//! The prefix may itself contain underscores, so the name is split from the right.

use crate::{types::BlockRange, upstream::UpstreamError};
use serde::Deserialize;

/// Body of `GET {host}/bsc/v1/blocks/{n}/bundle/name`.
#[derive(Debug, Deserialize)]
pub struct BundleNameResponse {
    pub data: String,
}

/// Extracts the inclusive block range encoded in a bundle name.
///
/// # Errors
///
/// Returns [`UpstreamError::MalformedBundleName`] when either marker segment is missing, is
/// not a decimal number, or describes an inverted range.
pub fn parse_bundle_name(name: &str) -> Result<BlockRange, UpstreamError> {
    let malformed = || UpstreamError::MalformedBundleName(name.to_string());

    let mut parts = name.rsplitn(3, '_');
    let end_part = parts.next().ok_or_else(malformed)?;
    let start_part = parts.next().ok_or_else(malformed)?;
    // Prefix must exist, even if empty
    parts.next().ok_or_else(malformed)?;

    let start = start_part
        .strip_prefix('s')
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(malformed)?;
    let end = end_part
        .strip_prefix('e')
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(malformed)?;

    if start > end {
        return Err(malformed());
    }

    Ok(BlockRange::new(start, end))
}

//! Advisory lock over block ranges that are being fetched from the archive.
//!
//! A bundle fetch registers its whole `[from, to]` range before the network call and removes
//! it when the call ends. Lookups for any number inside a registered range wait for the cache
//! instead of fetching the same bundle again.
//!
//! # State
//!
//! ```text
//! ┌──────────────── Mutex<RangeLockState> ────────────────┐
//! │  ranges: BlockRange → active registrations            │
//! │  lookup: block number → number of covering ranges     │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! `lookup` holds exactly the union of the registered ranges. Both maps change together under
//! one mutex, so [`RangeLock::is_within_any_range`] never sees a half-registered range. The
//! mutex is never held across an `.await`.
//!
//! Every release fires [`RangeLock::notified`], which waiting lookups race against their retry
//! interval.

use crate::types::BlockRange;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{futures::Notified, Notify};
use tracing::trace;

#[derive(Default)]
struct RangeLockState {
    ranges: AHashMap<BlockRange, u32>,
    lookup: AHashMap<u64, u32>,
}

impl RangeLockState {
    fn insert(&mut self, range: BlockRange) {
        *self.ranges.entry(range).or_insert(0) += 1;
        for number in range.iter() {
            *self.lookup.entry(number).or_insert(0) += 1;
        }
    }

    fn remove(&mut self, range: BlockRange) -> bool {
        match self.ranges.get_mut(&range) {
            None => return false,
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.ranges.remove(&range);
            }
        }

        for number in range.iter() {
            if let Some(count) = self.lookup.get_mut(&number) {
                *count -= 1;
                if *count == 0 {
                    self.lookup.remove(&number);
                }
            }
        }
        true
    }

    fn any_in_flight(&self, range: BlockRange) -> bool {
        if self.lookup.is_empty() {
            return false;
        }
        // Compare against registered ranges rather than probing every number of a large bundle
        self.ranges.keys().any(|active| active.overlaps(&range))
    }
}

/// Tracks block numbers covered by in-flight bundle fetches.
#[derive(Default)]
pub struct RangeLock {
    state: Mutex<RangeLockState>,
    released: Notify,
}

impl RangeLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `[from, to]` as in flight. Ranges with `from > to` cover nothing.
    ///
    /// Overlapping registrations are counted, so each must be matched by its own
    /// [`remove_range`](Self::remove_range).
    pub fn add_range(&self, from: u64, to: u64) {
        if from > to {
            return;
        }
        self.state.lock().insert(BlockRange::new(from, to));
        trace!(from = from, to = to, "range registered");
    }

    /// Removes one registration of `[from, to]`.
    ///
    /// Returns `false` if the range was not registered, in which case nothing changes.
    pub fn remove_range(&self, from: u64, to: u64) -> bool {
        if from > to {
            return false;
        }
        let removed = self.state.lock().remove(BlockRange::new(from, to));
        if removed {
            trace!(from = from, to = to, "range released");
            self.released.notify_waiters();
        }
        removed
    }

    /// Returns `true` if `number` lies in any registered range.
    #[must_use]
    pub fn is_within_any_range(&self, number: u64) -> bool {
        self.state.lock().lookup.contains_key(&number)
    }

    /// Registers `range` only if none of its numbers is already in flight.
    ///
    /// The check and the registration happen under the same lock, so of several callers racing
    /// for one bundle exactly one gets a guard. The range is released when the guard drops.
    #[must_use]
    pub fn try_lock_range(self: &Arc<Self>, range: BlockRange) -> Option<RangeGuard> {
        if range.is_empty() {
            return None;
        }

        let mut state = self.state.lock();
        if state.any_in_flight(range) {
            return None;
        }
        state.insert(range);
        drop(state);

        trace!(range = %range, "range reserved");
        Some(RangeGuard { lock: Arc::clone(self), range })
    }

    /// Future that completes on the next range release.
    ///
    /// Call [`Notified::enable`] before checking the condition being waited on, otherwise a
    /// release between the check and the first poll is missed.
    pub fn notified(&self) -> Notified<'_> {
        self.released.notified()
    }

    /// Number of distinct ranges currently registered.
    #[must_use]
    pub fn active_ranges(&self) -> usize {
        self.state.lock().ranges.len()
    }

    /// Number of distinct block numbers currently covered.
    #[must_use]
    pub fn covered_blocks(&self) -> usize {
        self.state.lock().lookup.len()
    }
}

/// Releases a range reserved with [`RangeLock::try_lock_range`] when dropped.
///
/// Dropping covers every exit path of a fetch: success, error return, panic, and cancellation
/// of the owning future.
pub struct RangeGuard {
    lock: Arc<RangeLock>,
    range: BlockRange,
}

impl RangeGuard {
    #[must_use]
    pub fn range(&self) -> BlockRange {
        self.range
    }
}

impl Drop for RangeGuard {
    fn drop(&mut self) {
        self.lock.remove_range(self.range.from, self.range.to);
    }
}

impl std::fmt::Debug for RangeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeGuard").field("range", &self.range).finish()
    }
}

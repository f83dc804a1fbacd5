//! Error object pool: bounded recycling of failure-record storage.
//!
//! High-frequency failure paths can churn through a lot of `FailureRecord`
//! allocations. [`FailurePool`] keeps a bounded free-list of released records
//! and reuses their string buffers on the next acquire.
//!
//! Records are owned moved values: `acquire` moves one out, `release` moves
//! it back in, so use-after-release and double-release cannot be expressed.
//! A caller that drops a record instead of releasing it simply leaks the
//! storage back to the allocator; pool state is never corrupted.

use std::collections::VecDeque;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::core::outcome::FailureRecord;

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
struct PoolCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    creates: AtomicU64,
    returns: AtomicU64,
    active: AtomicU64,
}

/// Snapshot of pool utilization and reuse effectiveness.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Records currently acquired but not yet released.
    pub active_count: u64,
    /// Records currently sitting in the free-list.
    pub pool_size: usize,
    /// Free-list capacity.
    pub max_size: usize,
    /// Acquires served from the free-list.
    pub hits: u64,
    /// Acquires that had to allocate.
    pub misses: u64,
    /// Total fresh allocations.
    pub creates: u64,
    /// Releases that made it back into the free-list.
    pub returns: u64,
    /// `hits / (hits + misses)`, or 0.0 with no acquisitions.
    pub hit_rate: f64,
}

struct PoolInner {
    free: VecDeque<FailureRecord>,
    max_size: usize,
}

/// Identity counter so records carry which pool they belong to.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Bounded free-list of recycled failure records.
pub struct FailurePool {
    id: u64,
    inner: Mutex<PoolInner>,
    counters: PoolCounters,
}

impl FailurePool {
    /// Create a pool that retains at most `max_size` released records.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            inner: Mutex::new(PoolInner {
                free: VecDeque::with_capacity(max_size.min(1024)),
                max_size,
            }),
            counters: PoolCounters::default(),
        }
    }

    /// Acquire a record, recycling storage from the free-list when possible.
    ///
    /// Recycled records are fully reset: context and cause cleared, fresh
    /// timestamp, origin pointing at this call site. Most-recently-freed
    /// storage is reused first to keep buffers warm.
    #[track_caller]
    pub fn acquire(&self, category: &str, message: &str) -> FailureRecord {
        let site = Location::caller();
        let recycled = self.inner.lock().free.pop_back();
        self.counters.active.fetch_add(1, Ordering::Relaxed);
        match recycled {
            Some(mut record) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                record.reset_for_reuse(site, category, message);
                record
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.counters.creates.fetch_add(1, Ordering::Relaxed);
                FailureRecord::at(site, category.to_string(), message.to_string())
                    .mark_pooled(self.id)
            }
        }
    }

    /// Return a record to the pool.
    ///
    /// Records not obtained from this pool are discarded silently; records
    /// released while the free-list is full are dropped (the `returns`
    /// counter only tracks records that made it back in).
    pub fn release(&self, record: FailureRecord) {
        if record.pool_id() != Some(self.id) {
            tracing::debug!(category = record.category(), "discarding foreign record");
            return;
        }
        let _ = self
            .counters
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
        let mut inner = self.inner.lock();
        if inner.free.len() < inner.max_size {
            self.counters.returns.fetch_add(1, Ordering::Relaxed);
            inner.free.push_back(record);
        }
    }

    /// Get a snapshot of current statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let (pool_size, max_size) = {
            let inner = self.inner.lock();
            (inner.free.len(), inner.max_size)
        };
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let acquisitions = hits + misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if acquisitions == 0 {
            0.0
        } else {
            hits as f64 / acquisitions as f64
        };
        PoolStats {
            active_count: self.counters.active.load(Ordering::Relaxed),
            pool_size,
            max_size,
            hits,
            misses,
            creates: self.counters.creates.load(Ordering::Relaxed),
            returns: self.counters.returns.load(Ordering::Relaxed),
            hit_rate,
        }
    }

    /// Update the free-list capacity, trimming least-recently-freed records
    /// first if the list currently exceeds the new size.
    pub fn resize(&self, new_size: usize) {
        let mut inner = self.inner.lock();
        inner.max_size = new_size;
        while inner.free.len() > new_size {
            inner.free.pop_front();
        }
    }

    /// Empty the free-list without touching the counters.
    pub fn clear(&self) {
        self.inner.lock().free.clear();
    }
}

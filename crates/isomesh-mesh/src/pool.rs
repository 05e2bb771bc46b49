//! Object pools for the meshing hot path.
//!
//! A [`Pool`] keeps released instances on a free list and hands them back out
//! on the next [`Pool::acquire`], after resetting them. Backing storage such as
//! `Vec` capacity survives the round trip, so a warmed-up pool serves a chunk
//! build without touching the allocator.
//!
//! # Thread Safety
//!
//! Pools are NOT thread-safe. Each build owns its pools through a
//! [`BuildArena`](crate::arena::BuildArena), which is `!Sync`, so sharing one
//! across concurrent builds does not compile. Aggregated diagnostics across
//! threads go through [`PoolCounters`], which is atomic and can be shared.

use std::any::type_name;
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use isomesh_core::{Error, Result};

/// A value that can be recycled through a [`Pool`].
pub trait Poolable: Default + Send {
    /// Clear all contents while keeping backing storage.
    fn reset(&mut self);
}

impl<T: Send> Poolable for Vec<T> {
    #[inline]
    fn reset(&mut self) {
        self.clear();
    }
}

/// Snapshot of a pool's lifetime statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances created because the free list was empty
    pub allocations: u64,
    /// Acquisitions served from the free list
    pub reuses: u64,
    /// Instances currently acquired and not yet released
    pub live: usize,
    /// Highest value `live` has reached
    pub peak: usize,
}

/// Thread-safe counters that several pools can report into.
///
/// Pools only write to these; reading them never affects pooling.
#[derive(Debug, Default)]
pub struct PoolCounters {
    allocations: AtomicU64,
    reuses: AtomicU64,
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl PoolCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    fn record_acquire(&self, reused: bool) {
        if reused {
            self.reuses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.allocations.fetch_add(1, Ordering::Relaxed);
        }
        let live = self.live.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak.fetch_max(live, Ordering::Relaxed);
    }

    fn record_release(&self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current totals across every pool reporting here.
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            live: self.live.load(Ordering::Relaxed),
            peak: self.peak.load(Ordering::Relaxed),
        }
    }
}

/// A free-list pool of reusable values.
pub struct Pool<T: Poolable> {
    free: Vec<T>,
    stats: PoolStats,
    counters: Option<Arc<PoolCounters>>,
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> Pool<T> {
    /// Create an empty pool
    pub const fn new() -> Self {
        Self {
            free: Vec::new(),
            stats: PoolStats {
                allocations: 0,
                reuses: 0,
                live: 0,
                peak: 0,
            },
            counters: None,
        }
    }

    /// Create an empty pool that also reports into shared counters
    pub fn with_counters(counters: Arc<PoolCounters>) -> Self {
        Self {
            counters: Some(counters),
            ..Self::new()
        }
    }

    /// Report future activity into `counters` instead of the current ones.
    ///
    /// Fails with [`Error::PoolMisuse`] while instances are handed out, since
    /// their release would be recorded in counters that never saw them leave.
    pub fn report_to(&mut self, counters: &Arc<PoolCounters>) -> Result<()> {
        if self
            .counters
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, counters))
        {
            return Ok(());
        }
        if self.stats.live > 0 {
            return Err(Error::PoolMisuse(format!(
                "redirecting counters of a pool of {} with {} live instances",
                type_name::<T>(),
                self.stats.live
            )));
        }
        self.counters = Some(Arc::clone(counters));
        Ok(())
    }

    /// Take a cleared instance, reusing a released one when available.
    pub fn acquire(&mut self) -> T {
        let (value, reused) = match self.free.pop() {
            Some(mut value) => {
                value.reset();
                self.stats.reuses += 1;
                (value, true)
            }
            None => {
                self.stats.allocations += 1;
                (T::default(), false)
            }
        };

        self.stats.live += 1;
        self.stats.peak = self.stats.peak.max(self.stats.live);
        if let Some(counters) = &self.counters {
            counters.record_acquire(reused);
        }
        value
    }

    /// Return an instance to the free list.
    ///
    /// Fails with [`Error::PoolMisuse`] when the pool has no outstanding
    /// instances, which means the value did not come from this pool.
    pub fn release(&mut self, value: T) -> Result<()> {
        if self.stats.live == 0 {
            return Err(Error::PoolMisuse(format!(
                "release into a pool of {} with no live instances",
                type_name::<T>()
            )));
        }

        self.stats.live -= 1;
        if let Some(counters) = &self.counters {
            counters.record_release();
        }
        self.free.push(value);
        Ok(())
    }

    /// Number of instances waiting on the free list
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Lifetime statistics of this pool
    #[inline]
    pub const fn stats(&self) -> PoolStats {
        self.stats
    }
}

/// Scoped handle to a pooled value.
///
/// The value goes back to its pool when the guard drops, so every exit path
/// of a build (including `?` and panics) releases what it acquired.
pub struct Pooled<'p, T: Poolable> {
    value: Option<T>,
    pool: &'p RefCell<Pool<T>>,
}

impl<'p, T: Poolable> Pooled<'p, T> {
    /// Acquire a value from `pool` for the lifetime of the guard
    pub fn acquire(pool: &'p RefCell<Pool<T>>) -> Self {
        let value = pool.borrow_mut().acquire();
        Self {
            value: Some(value),
            pool,
        }
    }
}

impl<T: Poolable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `Drop` takes the value out.
        self.value.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Poolable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Poolable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        let Some(value) = self.value.take() else {
            return;
        };
        let Ok(mut pool) = self.pool.try_borrow_mut() else {
            tracing::error!(kind = type_name::<T>(), "pool busy during release, dropping instance");
            return;
        };
        if let Err(err) = pool.release(value) {
            tracing::error!(%err, "failed to return pooled instance");
        }
    }
}

//! Lock-free pool of reusable render buffers.
//!
//! Every emitted record needs two scratch buffers (colored and plain).
//! [`BufferPool`] hands out [`PooledBuf`] guards over `BytesMut` buffers
//! pre-sized to [`INITIAL_CAPACITY`]; dropping a guard clears the buffer and
//! returns it to a lock-free queue. Buffers that grew beyond
//! [`MAX_POOLED_CAPACITY`] are dropped instead of pooled, so one oversized
//! record cannot inflate the pool's steady-state footprint.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;

/// Starting capacity of a fresh buffer.
pub const INITIAL_CAPACITY: usize = 1024;

/// Largest capacity a buffer may have and still be pooled.
pub const MAX_POOLED_CAPACITY: usize = 16 << 10;

/// Default number of idle buffers kept.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Pool counters.
#[derive(Debug, Default)]
pub struct BufferPoolMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    returns: AtomicU64,
    drops: AtomicU64,
}

/// Point-in-time copy of [`BufferPoolMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Acquisitions served from the pool.
    pub hits: u64,
    /// Acquisitions that allocated.
    pub misses: u64,
    /// Buffers handed back to the pool.
    pub returns: u64,
    /// Buffers discarded (oversized or pool full).
    pub drops: u64,
}

impl BufferPoolMetrics {
    /// Current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// Shared pool of `BytesMut` buffers.
#[derive(Debug)]
pub struct BufferPool {
    queue: ArrayQueue<BytesMut>,
    metrics: BufferPoolMetrics,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl BufferPool {
    /// Create a pool that keeps at most `pool_size` idle buffers.
    ///
    /// Buffers are allocated lazily on first use.
    pub fn new(pool_size: usize) -> Self {
        Self {
            queue: ArrayQueue::new(pool_size.max(1)),
            metrics: BufferPoolMetrics::default(),
        }
    }

    /// Take a buffer, allocating one if the pool is empty.
    #[inline]
    pub fn get(&self) -> PooledBuf<'_> {
        let buf = if let Some(buf) = self.queue.pop() {
            let _ = self.metrics.hits.fetch_add(1, Ordering::Relaxed);
            buf
        } else {
            let _ = self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            BytesMut::with_capacity(INITIAL_CAPACITY)
        };
        PooledBuf { buf, pool: self }
    }

    /// Return a buffer. Called by [`PooledBuf`] on drop.
    fn put(&self, mut buf: BytesMut) {
        if buf.capacity() > MAX_POOLED_CAPACITY {
            let _ = self.metrics.drops.fetch_add(1, Ordering::Relaxed);
            return;
        }
        buf.clear();
        if self.queue.push(buf).is_ok() {
            let _ = self.metrics.returns.fetch_add(1, Ordering::Relaxed);
        } else {
            let _ = self.metrics.drops.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Idle buffers currently held.
    #[inline]
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Pool counters.
    #[inline]
    pub fn metrics(&self) -> &BufferPoolMetrics {
        &self.metrics
    }
}

/// Exclusively owned buffer that returns itself to its pool on drop.
#[derive(Debug)]
pub struct PooledBuf<'a> {
    buf: BytesMut,
    pool: &'a BufferPool,
}

impl Deref for PooledBuf<'_> {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuf<'_> {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Drop for PooledBuf<'_> {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

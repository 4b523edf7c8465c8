//! Fixed-block memory pools
//!
//! Interpreter loops allocate and free a very large number of short-lived
//! values (every arithmetic sub-expression produces one). A [`Pool`] keeps
//! freed blocks of a single type on a free list and hands them back out
//! instead of going through the general-purpose allocator each time.
//!
//! Pools grow in fixed-size chunks. A pool built with a block cap treats
//! exhaustion past that cap as fatal, the same way the global allocator
//! treats out-of-memory.
//!
//! Pools are internally synchronized, so one pool may be shared by several
//! execution threads. Block payloads are always dropped outside the pool lock:
//! dropping a value can release blocks back into the same pool.
//!
//! A [`Pooled`] block is its own reference-counted pointer. The count lives
//! in the block, so cloning and dropping never touch the global allocator;
//! the last drop puts the block back on the free list.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{self, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Number of blocks added each time a pool runs dry.
pub const DEFAULT_CHUNK_BLOCKS: usize = 256;

struct Block<T> {
    refs: AtomicUsize,
    value: UnsafeCell<Option<T>>,
}

impl<T> Block<T> {
    fn empty() -> Box<Self> {
        Box::new(Self {
            refs: AtomicUsize::new(0),
            value: UnsafeCell::new(None),
        })
    }
}

/// Allocation statistics for one pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of successful allocations
    pub allocated: u64,
    /// Total number of blocks returned
    pub deallocated: u64,
    /// Highest number of blocks in use at once
    pub peak: u64,
    /// Blocks owned by the pool, in use or free
    pub capacity: usize,
}

impl PoolStats {
    /// Blocks currently handed out.
    pub fn in_use(&self) -> u64 {
        self.allocated - self.deallocated
    }
}

struct PoolState<T> {
    free: Vec<Box<Block<T>>>,
    stats: PoolStats,
}

/// A pool of equally sized blocks holding `T`.
pub struct Pool<T> {
    name: &'static str,
    chunk_blocks: usize,
    max_blocks: Option<usize>,
    state: Mutex<PoolState<T>>,
}

impl<T> Pool<T> {
    /// Create an uncapped pool growing by [`DEFAULT_CHUNK_BLOCKS`].
    pub fn new(name: &'static str) -> Self {
        Self::with_limits(name, DEFAULT_CHUNK_BLOCKS, None)
    }

    /// Create a pool with an explicit chunk size and optional block cap.
    pub fn with_limits(
        name: &'static str,
        chunk_blocks: usize,
        max_blocks: Option<usize>,
    ) -> Self {
        Self {
            name,
            chunk_blocks: chunk_blocks.max(1),
            max_blocks,
            state: Mutex::new(PoolState {
                free: Vec::new(),
                stats: PoolStats::default(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Snapshot of the allocation statistics.
    pub fn stats(&self) -> PoolStats {
        self.lock().stats
    }

    /// Number of blocks waiting on the free list.
    pub fn free_blocks(&self) -> usize {
        self.lock().free.len()
    }

    /// Move `value` into a pooled block.
    ///
    /// # Panics
    ///
    /// Panics when the pool is capped and every block is in use. This is the
    /// pool's out-of-memory condition and is not recoverable.
    pub fn allocate(self: &Arc<Self>, value: T) -> Pooled<T> {
        let mut block = {
            let mut state = self.lock();
            if state.free.is_empty() {
                self.grow(&mut state);
            }
            let Some(block) = state.free.pop() else {
                self.exhausted(&state.stats)
            };
            state.stats.allocated += 1;
            let in_use = state.stats.in_use();
            if in_use > state.stats.peak {
                state.stats.peak = in_use;
            }
            block
        };

        *block.value.get_mut() = Some(value);
        *block.refs.get_mut() = 1;
        Pooled {
            block: NonNull::from(Box::leak(block)),
            pool: Arc::clone(self),
        }
    }

    fn grow(&self, state: &mut PoolState<T>) {
        let room = match self.max_blocks {
            Some(max) => max.saturating_sub(state.stats.capacity),
            None => self.chunk_blocks,
        };
        let count = self.chunk_blocks.min(room);
        if count == 0 {
            self.exhausted(&state.stats);
        }

        // The free list can hold every block the pool owns, so releasing
        // never reallocates it.
        let capacity = state.stats.capacity + count;
        state.free.reserve(capacity - state.free.len());
        for _ in 0..count {
            state.free.push(Block::empty());
        }
        state.stats.capacity = capacity;
        tracing::debug!(
            pool = self.name,
            added = count,
            capacity = state.stats.capacity,
            "Pool grew"
        );
    }

    fn exhausted(&self, stats: &PoolStats) -> ! {
        tracing::error!(
            pool = self.name,
            capacity = stats.capacity,
            in_use = stats.in_use(),
            "Pool exhausted"
        );
        panic!(
            "pool '{}' exhausted: all {} blocks in use",
            self.name, stats.capacity
        );
    }

    fn release(&self, mut block: Box<Block<T>>) {
        // Drop the payload before taking the lock; it may hold blocks of this pool.
        drop(block.value.get_mut().take());

        let mut state = self.lock();
        state.stats.deallocated += 1;
        state.free.push(block);
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("chunk_blocks", &self.chunk_blocks)
            .field("max_blocks", &self.max_blocks)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Shared pointer to an occupied pool block.
///
/// Clones point at the same block. Dropping the last one returns the block
/// to its pool.
pub struct Pooled<T> {
    block: NonNull<Block<T>>,
    pool: Arc<Pool<T>>,
}

// SAFETY: `Pooled` shares `T` across clones like `Arc<T>` does, and the
// count is atomic.
unsafe impl<T: Send + Sync> Send for Pooled<T> {}
unsafe impl<T: Send + Sync> Sync for Pooled<T> {}

impl<T> Pooled<T> {
    fn block(&self) -> &Block<T> {
        // SAFETY: the block stays allocated while any `Pooled` points at it.
        unsafe { self.block.as_ref() }
    }

    /// The pool this block belongs to.
    pub fn pool(&self) -> &Arc<Pool<T>> {
        &self.pool
    }

    /// Number of pointers to this block.
    pub fn ref_count(this: &Self) -> usize {
        this.block().refs.load(Ordering::Acquire)
    }

    /// Whether both point at the same block.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.block == other.block
    }

    /// Mutable access when this is the only pointer to the block.
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if this.block().refs.load(Ordering::Acquire) != 1 {
            return None;
        }
        // SAFETY: the count is 1 and `this` is borrowed mutably, so no other
        // pointer can observe the value.
        let value = unsafe { &mut *this.block().value.get() };
        value.as_mut()
    }
}

impl<T> Clone for Pooled<T> {
    fn clone(&self) -> Self {
        self.block().refs.fetch_add(1, Ordering::Relaxed);
        Self {
            block: self.block,
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the value is only written through `get_mut`, which needs
        // the sole pointer.
        match unsafe { &*self.block().value.get() } {
            Some(value) => value,
            None => unreachable!("pooled block is occupied until released"),
        }
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        if self.block().refs.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }
        atomic::fence(Ordering::Acquire);
        // SAFETY: this was the last pointer, and the block came from
        // `Box::leak` in `Pool::allocate`.
        let block = unsafe { Box::from_raw(self.block.as_ptr()) };
        self.pool.release(block);
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

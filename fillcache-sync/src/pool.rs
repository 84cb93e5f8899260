//! Reusable byte buffers.

use std::ops::{Deref, DerefMut};

use bytes::BytesMut;
use parking_lot::Mutex;

use fillcache_core::constants::{DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_IDLE_BUFFERS};

/// A bounded free-list of byte buffers.
///
/// Buffers handed out by [`get`](Self::get) are empty and have at least the
/// configured capacity. They return to the pool when the handle drops.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<BytesMut>>,
    buffer_capacity: usize,
    max_idle: usize,
}

impl BufferPool {
    /// Creates a pool of buffers with the given capacity.
    pub fn new(buffer_capacity: usize) -> Self {
        Self::with_max_idle(buffer_capacity, DEFAULT_MAX_IDLE_BUFFERS)
    }

    /// Creates a pool that keeps at most `max_idle` buffers around.
    pub fn with_max_idle(buffer_capacity: usize, max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_idle)),
            buffer_capacity,
            max_idle,
        }
    }

    /// Takes a buffer from the pool, allocating one if none is idle.
    pub fn get(&self) -> PooledBuffer<'_> {
        let buf = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.buffer_capacity));
        PooledBuffer { pool: self, buf }
    }

    /// Returns a buffer to the pool.
    ///
    /// The buffer is cleared. Buffers smaller than the pool's capacity (for
    /// example after `split`) and buffers beyond `max_idle` are dropped.
    pub fn put(&self, mut buf: BytesMut) {
        if buf.capacity() < self.buffer_capacity {
            return;
        }
        buf.clear();

        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(buf);
        }
    }

    /// Number of idle buffers waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Capacity of buffers handed out by this pool.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

/// A buffer borrowed from a [`BufferPool`].
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: BytesMut,
}

impl PooledBuffer<'_> {
    /// Takes the buffer out of the pool's custody for good.
    pub fn detach(mut self) -> BytesMut {
        std::mem::take(&mut self.buf)
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}

//! Shared constants for fillcache.

// ═══════════════════════════════════════════════════════════════════════════════
// CIPHER SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// AES block size in bytes. The streaming cipher IV is exactly one block.
pub const BLOCK_SIZE: usize = 16;

/// Size of the IV prefix written by `CipherWriter::new`.
pub const IV_SIZE: usize = BLOCK_SIZE;

/// Accepted AES key sizes in bytes (AES-128, AES-192, AES-256).
pub const AES_KEY_SIZES: [usize; 3] = [16, 24, 32];

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default interval between sweeper passes, in seconds.
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 60;

/// Default TTL handed out by `CacheConfig::default_ttl`, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Milliseconds per second, used to turn whole-second TTLs into expiry stamps.
pub const MILLIS_PER_SEC: u64 = 1_000;

// ═══════════════════════════════════════════════════════════════════════════════
// BUFFER POOL DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default capacity of a freshly allocated pooled buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 32 * 1024;

/// Default number of idle buffers a pool keeps around.
pub const DEFAULT_MAX_IDLE_BUFFERS: usize = 64;

//! TTL memoization cache for fillcache.
//!
//! Each key caches the last result of a caller-supplied filler until its TTL
//! runs out. Concurrent requests for the same key share a single fill, while
//! different keys never wait on each other. An optional background sweeper
//! drops expired entries.
//!
//! ```rust
//! use std::time::Duration;
//! use fillcache_cache::Cache;
//!
//! let cache: Cache<u64, String> = Cache::new(Duration::ZERO);
//! let answer = cache.get("answer", || Ok(42), Duration::from_secs(30));
//! assert_eq!(answer, Ok(42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod entry;
mod sweeper;

pub use cache::{Cache, CacheConfig, CacheStats};

//! # fillcache Sync
//!
//! Small concurrency utilities used around the cache:
//!
//! - **Flag**: a compare-and-swap boolean ([`AtomicFlag`])
//! - **Pool**: a bounded free-list of reusable byte buffers ([`BufferPool`])
//! - **Closer**: a one-shot shutdown notification triggered by signals or
//!   by hand ([`Closer`])

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod closer;
pub mod flag;
pub mod pool;

pub use closer::{CloseError, Closer};
pub use flag::AtomicFlag;
pub use pool::{BufferPool, PooledBuffer};

//! # fillcache Core
//!
//! Foundational building blocks shared by every fillcache crate:
//!
//! - **Errors**: the library error enum and the thread-safe [`ErrorList`] aggregator
//! - **Constants**: cipher sizes and cache/pool defaults
//! - **Traits**: the [`Clock`] time source used for TTL bookkeeping
//!
//! ## Example
//!
//! ```rust
//! use fillcache_core::{ErrorList, FillcacheError};
//!
//! let errors = ErrorList::new();
//! errors.push(FillcacheError::Closed);
//! assert_eq!(errors.len(), 1);
//! assert!(errors.into_result().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod error_list;
pub mod traits;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{BoxError, FillcacheError, Result};
pub use error_list::ErrorList;
pub use traits::*;

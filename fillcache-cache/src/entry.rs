//! Per-key cache record.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use fillcache_core::constants::MILLIS_PER_SEC;
use fillcache_core::Clock;

/// Computation that produces the cached value for a key.
pub(crate) type Filler<V, E> = Arc<dyn Fn() -> Result<V, E> + Send + Sync>;

/// Where a resolved result came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Source {
    Cached,
    Filled,
}

/// One cached key.
///
/// The mutex guards the cached result and is held for the whole fill, which
/// is what keeps concurrent callers for the same key from recomputing. The
/// expiry stamp lives outside the mutex so the sweeper can read it without
/// waiting on a fill; it is only written while the mutex is held.
///
/// An entry removed from the directory is retired. Callers that looked it up
/// before the removal see the flag once they hold the mutex and go back to
/// the directory instead of filling a detached entry.
pub(crate) struct Entry<V, E> {
    filler: Filler<V, E>,
    ttl_millis: u64,
    /// Milliseconds since the epoch; 0 until the first fill completes.
    expires_at: AtomicU64,
    retired: AtomicBool,
    cached: Mutex<Option<Result<V, E>>>,
}

impl<V: Clone, E: Clone> Entry<V, E> {
    /// Creates an unfilled entry. The TTL is truncated to whole seconds.
    pub(crate) fn new(filler: Filler<V, E>, ttl: Duration) -> Self {
        Self {
            filler,
            ttl_millis: ttl.as_secs().saturating_mul(MILLIS_PER_SEC),
            expires_at: AtomicU64::new(0),
            retired: AtomicBool::new(false),
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached result, running the filler first if the entry has
    /// never been filled or has expired.
    ///
    /// Returns `None` if the entry was retired before the caller got the lock.
    pub(crate) fn resolve(&self, clock: &dyn Clock) -> Option<(Result<V, E>, Source)> {
        let mut cached = self.cached.lock();
        if self.is_retired() {
            return None;
        }
        let now = clock.now_millis();

        if self.expires_at.load(Ordering::Acquire) > now {
            if let Some(result) = cached.as_ref() {
                return Some((result.clone(), Source::Cached));
            }
        }

        let result = (self.filler)();
        *cached = Some(result.clone());
        self.expires_at
            .store(now.saturating_add(self.ttl_millis), Ordering::Release);
        Some((result, Source::Filled))
    }

    /// True once a filled result has reached its expiry.
    ///
    /// Never-filled entries are not expired: they are about to be filled by
    /// the caller that created them.
    pub(crate) fn is_expired(&self, now: u64) -> bool {
        let expires_at = self.expires_at.load(Ordering::Acquire);
        expires_at != 0 && expires_at <= now
    }

    /// Retires the entry if it is expired and nobody is resolving it.
    ///
    /// The check and the flag are both done under the entry lock, so a caller
    /// waiting for the lock either resolves before this or sees the flag.
    pub(crate) fn try_retire_expired(&self, now: u64) -> bool {
        let Some(_guard) = self.cached.try_lock() else {
            return false;
        };
        if !self.is_expired(now) {
            return false;
        }
        self.retire();
        true
    }

    /// Retires the entry unconditionally. A fill already running completes.
    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

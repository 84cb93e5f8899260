//! Lazily-filled TTL cache with per-key stampede protection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use fillcache_core::constants::{DEFAULT_PURGE_INTERVAL_SECS, DEFAULT_TTL_SECS, MILLIS_PER_SEC};
use fillcache_core::{Clock, SystemClock};

use crate::entry::{Entry, Filler, Source};
use crate::sweeper::Sweeper;

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Interval between sweeper passes in milliseconds; 0 disables sweeping
    pub purge_interval_ms: u64,
    /// TTL in seconds suggested to callers that have no better value
    pub default_ttl_seconds: u64,
}

impl CacheConfig {
    /// A configuration with the given sweep interval.
    ///
    /// Non-zero intervals shorter than a millisecond are rounded up to one
    /// millisecond so they still enable the sweeper.
    pub fn with_purge_interval(purge_interval: Duration) -> Self {
        let mut purge_interval_ms = u64::try_from(purge_interval.as_millis()).unwrap_or(u64::MAX);
        if purge_interval_ms == 0 && !purge_interval.is_zero() {
            purge_interval_ms = 1;
        }
        Self {
            purge_interval_ms,
            ..Self::default()
        }
    }

    /// A configuration without a background sweeper.
    pub fn no_sweep() -> Self {
        Self {
            purge_interval_ms: 0,
            ..Self::default()
        }
    }

    /// Interval between sweeper passes.
    pub fn purge_interval(&self) -> Duration {
        Duration::from_millis(self.purge_interval_ms)
    }

    /// Default TTL as a duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            purge_interval_ms: DEFAULT_PURGE_INTERVAL_SECS * MILLIS_PER_SEC,
            default_ttl_seconds: DEFAULT_TTL_SECS,
        }
    }
}

/// Key → entry map shared between callers and the sweeper.
///
/// The map lock only covers the map itself. Entries are cloned out of the map
/// and resolved after the lock is released, so a slow fill never blocks other
/// keys.
pub(crate) struct Directory<V, E> {
    entries: Mutex<HashMap<String, Arc<Entry<V, E>>>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    fills: AtomicU64,
    swept: AtomicU64,
}

impl<V, E> Directory<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            hits: AtomicU64::new(0),
            fills: AtomicU64::new(0),
            swept: AtomicU64::new(0),
        }
    }

    fn lookup(&self, key: &str) -> Option<Arc<Entry<V, E>>> {
        self.entries.lock().get(key).cloned()
    }

    /// Returns the entry for `key`, creating it from `filler` and `ttl` if the
    /// key is new. The boolean is true when this call created it.
    fn lookup_or_insert(
        &self,
        key: &str,
        filler: &Filler<V, E>,
        ttl: Duration,
    ) -> (Arc<Entry<V, E>>, bool) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            return (Arc::clone(entry), false);
        }

        debug!(key, ttl_secs = ttl.as_secs(), "Creating cache entry");
        let entry = Arc::new(Entry::new(Arc::clone(filler), ttl));
        entries.insert(key.to_owned(), Arc::clone(&entry));
        (entry, true)
    }

    fn remove(&self, key: &str) -> bool {
        match self.entries.lock().remove(key) {
            Some(entry) => {
                entry.retire();
                true
            }
            None => false,
        }
    }

    /// Resolves `entry`, or returns `None` if it was retired meanwhile and the
    /// caller has to look the key up again.
    fn resolve(&self, key: &str, entry: &Entry<V, E>) -> Option<Result<V, E>> {
        let Some((result, source)) = entry.resolve(self.clock.as_ref()) else {
            trace!(key, "Entry retired during lookup, retrying");
            return None;
        };
        match source {
            Source::Cached => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key, "Cache hit");
            }
            Source::Filled => {
                self.fills.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache filled");
            }
        }
        Some(result)
    }

    /// Removes every expired entry that nobody is currently resolving.
    #[instrument(skip(self))]
    pub(crate) fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.try_retire_expired(now));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            self.swept.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "Swept expired entries");
        }
        removed
    }
}

/// Memoizing cache keyed by string.
///
/// Each key owns a filler, a TTL, and the last result the filler produced
/// (value or error). The first request for a key binds its filler and TTL;
/// later requests for the same key reuse them until the entry is deleted or
/// swept. Callers that want the binding to be explicit can use
/// [`register`](Self::register) and [`fetch`](Self::fetch) instead of
/// [`get`](Self::get).
///
/// At most one fill per key runs at a time. Callers arriving during a fill
/// wait for it and receive its result. Fills are not cancelled or timed out:
/// a filler that never returns blocks its key forever.
///
/// A background sweeper, if configured, drops expired entries. It is stopped
/// when the cache is dropped.
pub struct Cache<V, E> {
    directory: Arc<Directory<V, E>>,
    sweeper: Mutex<Option<Sweeper>>,
    config: CacheConfig,
}

impl<V, E> Cache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a cache that sweeps every `purge_interval`; zero disables
    /// sweeping.
    pub fn new(purge_interval: Duration) -> Self {
        Self::with_config(CacheConfig::with_purge_interval(purge_interval))
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache that reads time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let directory = Arc::new(Directory::new(clock));
        let sweeper = if config.purge_interval_ms > 0 {
            Sweeper::spawn(Arc::downgrade(&directory), config.purge_interval())
        } else {
            None
        };

        Self {
            directory,
            sweeper: Mutex::new(sweeper),
            config,
        }
    }

    /// Returns the cached result for `key`, filling it if needed.
    ///
    /// `filler` and `ttl` are only used if `key` is not in the cache yet.
    /// Otherwise the entry's original filler and TTL apply, even if they
    /// differ from the ones passed here.
    pub fn get<F>(&self, key: &str, filler: F, ttl: Duration) -> Result<V, E>
    where
        F: Fn() -> Result<V, E> + Send + Sync + 'static,
    {
        let filler: Filler<V, E> = Arc::new(filler);
        loop {
            let (entry, _) = self.directory.lookup_or_insert(key, &filler, ttl);
            if let Some(result) = self.directory.resolve(key, &entry) {
                return result;
            }
        }
    }

    /// Binds `filler` and `ttl` to `key` without running the filler.
    ///
    /// Returns false, leaving the existing binding untouched, if the key is
    /// already present.
    pub fn register<F>(&self, key: &str, filler: F, ttl: Duration) -> bool
    where
        F: Fn() -> Result<V, E> + Send + Sync + 'static,
    {
        let filler: Filler<V, E> = Arc::new(filler);
        self.directory.lookup_or_insert(key, &filler, ttl).1
    }

    /// Resolves a registered key. Returns `None` for unknown keys, including
    /// keys deleted or swept while this call was waiting.
    pub fn fetch(&self, key: &str) -> Option<Result<V, E>> {
        loop {
            let entry = self.directory.lookup(key)?;
            if let Some(result) = self.directory.resolve(key, &entry) {
                return Some(result);
            }
        }
    }

    /// Removes `key`. Returns true if it was present.
    ///
    /// A fill already running for the key still completes and its caller
    /// gets the result; the result is not cached. Callers waiting on that
    /// fill start over and fill a new entry.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.directory.remove(key);
        if removed {
            debug!(key, "Deleted cache entry");
        }
        removed
    }

    /// Returns true if `key` is in the cache (filled or not, expired or not).
    pub fn contains(&self, key: &str) -> bool {
        self.directory.entries.lock().contains_key(key)
    }

    /// Removes all entries.
    pub fn clear(&self) {
        for (_, entry) in self.directory.entries.lock().drain() {
            entry.retire();
        }
    }

    /// Runs one sweep pass now. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        self.directory.purge_expired()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.directory.entries.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.directory.entries.lock().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = self.directory.clock.now_millis();
        let entries = self.directory.entries.lock();
        let expired = entries.values().filter(|e| e.is_expired(now)).count();

        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len().saturating_sub(expired),
            hits: self.directory.hits.load(Ordering::Relaxed),
            fills: self.directory.fills.load(Ordering::Relaxed),
            swept: self.directory.swept.load(Ordering::Relaxed),
        }
    }

    /// Returns the configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns true while the background sweeper is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Stops the background sweeper. Safe to call more than once.
    pub fn shutdown(&self) {
        if let Some(mut sweeper) = self.sweeper.lock().take() {
            sweeper.stop();
        }
    }
}

impl<V, E> Default for Cache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::with_config(CacheConfig::default())
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries in the directory, including expired ones
    pub total_entries: usize,
    /// Filled entries past their expiry that have not been swept yet
    pub expired_entries: usize,
    /// Entries that are not expired
    pub valid_entries: usize,
    /// Lookups served from a cached result
    pub hits: u64,
    /// Filler invocations
    pub fills: u64,
    /// Entries removed by sweep passes
    pub swept: u64,
}

//! Time-bounded search result cache.
//!
//! Entries expire lazily: a stale entry is invisible to [`TtlCache::get`] but
//! stays physically present until it is overwritten, swept, or evicted to
//! make room. The cache holds at most `max_entries` keys; when full, expired
//! entries are purged first and then the oldest entry is dropped.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default TTL shared by every entry (15 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Default capacity bound.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// A stored payload with its insertion time.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    payload: V,
    created_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

/// Thread-safe fingerprint → payload cache with TTL-based invalidation.
#[derive(Clone, Debug)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Create a cache with the given TTL and capacity bound.
    ///
    /// A `max_entries` of 0 is treated as 1.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Return the payload for `key` if an entry exists and is younger than the TTL.
    ///
    /// "Never set" and "expired" are indistinguishable to the caller.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh(self.ttl) {
            debug!("Cache HIT for {}", key);
            Some(entry.payload.clone())
        } else {
            debug!("Cache STALE for {}", key);
            None
        }
    }

    /// Insert or overwrite the entry for `key`, stamped with the current time.
    ///
    /// Inserting a new key never leaves more than `max_entries` entries once
    /// the call returns, even when other threads insert concurrently.
    pub fn set(&self, key: impl Into<String>, payload: V) {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.shrink_to(self.max_entries - 1);
        }
        let replaced = self.entries.insert(
            key,
            CacheEntry {
                payload,
                created_at: Instant::now(),
            },
        );
        // A concurrent insert may have taken the slot freed above
        if replaced.is_none() {
            self.shrink_to(self.max_entries);
        }
    }

    /// Number of physically stored entries, stale ones included.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.is_fresh(ttl));
        before.saturating_sub(self.entries.len())
    }

    /// Evict until at most `limit` entries remain: expired ones first, then
    /// the oldest.
    fn shrink_to(&self, limit: usize) {
        if self.entries.len() <= limit {
            return;
        }
        self.purge_expired();

        while self.entries.len() > limit {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().created_at)
                .map(|entry| entry.key().clone());

            match oldest {
                Some(key) => {
                    debug!("Cache full, evicting oldest entry {}", key);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Spawn a background task that purges expired entries every `period`
    /// until `shutdown` is cancelled.
    pub fn spawn_sweeper(&self, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            debug!("Cache sweep removed {} expired entries", removed);
                        }
                        crate::metrics::set_cache_entries(cache.size());
                    }
                }
            }
        })
    }
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

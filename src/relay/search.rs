//! Cached video search.
//!
//! Results are cached under a fingerprint of `(query, limit)`. Concurrent
//! misses on the same fingerprint share one upstream call.

use crate::{
    cache::TtlCache,
    error::{RelayError, Result},
    metrics,
    models::{NormalizedVideo, UNKNOWN_ARTIST, ZERO_DURATION},
    upstream::{RawVideo, SearchBackend},
};
use dashmap::{DashMap, mapref::entry::Entry};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tracing::{info, warn};

/// Result count used when the client does not pass `limit`.
pub const DEFAULT_LIMIT: usize = 20;

/// Shared, immutable search result list.
pub type SearchResults = Arc<Vec<NormalizedVideo>>;

type InFlight = Shared<BoxFuture<'static, Result<SearchResults>>>;

/// Cache key for a search request.
pub fn fingerprint(query: &str, limit: usize) -> String {
    format!("search:{}:{}", query, limit)
}

/// Map an upstream record into the client-facing shape.
fn normalize(raw: RawVideo) -> NormalizedVideo {
    NormalizedVideo {
        id: raw.id,
        title: raw.title,
        duration: raw
            .timestamp
            .or(raw.duration)
            .unwrap_or_else(|| ZERO_DURATION.to_string()),
        thumbnail_url: raw.thumbnail,
        artist: raw.author.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        view_count: raw.views,
        upload_date: raw.upload_date,
    }
}

/// Search relay: cache lookup, upstream fallback, normalization.
#[derive(Clone)]
pub struct SearchRelay {
    backend: Arc<dyn SearchBackend>,
    cache: TtlCache<SearchResults>,
    inflight: Arc<DashMap<String, InFlight>>,
}

impl SearchRelay {
    pub fn new(backend: Arc<dyn SearchBackend>, cache: TtlCache<SearchResults>) -> Self {
        Self {
            backend,
            cache,
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// The cache this relay populates.
    pub fn cache(&self) -> &TtlCache<SearchResults> {
        &self.cache
    }

    /// Return at most `limit` normalized results for `query`.
    ///
    /// # Errors
    /// - [`RelayError::InvalidInput`] when `query` is blank; no upstream call is made.
    /// - [`RelayError::SearchFailed`] when the backend fails; nothing is cached.
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RelayError::InvalidInput("Query required".to_string()));
        }

        let key = fingerprint(query, limit);
        if let Some(cached) = self.cache.get(&key) {
            info!("Using cached results for: {}", query);
            metrics::record_cache_hit();
            return Ok(cached);
        }

        // Join an identical in-flight search or start one
        let pending = match self.inflight.entry(key.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let shared = self.spawn_fetch(query.to_string(), limit, key);
                entry.insert(shared.clone());
                shared
            }
        };

        pending.await
    }

    /// Run the upstream fetch as its own task so it completes, populates the
    /// cache and clears its in-flight marker even if every caller goes away.
    fn spawn_fetch(&self, query: String, limit: usize, key: String) -> InFlight {
        let relay = self.clone();
        let task = tokio::spawn(async move {
            let result = relay.fetch(&query, limit, &key).await;
            // The only remover of this key is the task that owns it
            relay.inflight.remove(&key);
            result
        });

        task.map(|joined| {
            joined.unwrap_or_else(|e| {
                Err(RelayError::SearchFailed(format!("search task failed: {}", e)))
            })
        })
        .boxed()
        .shared()
    }

    async fn fetch(&self, query: &str, limit: usize, key: &str) -> Result<SearchResults> {
        info!("Searching upstream for: {}", query);
        metrics::record_cache_miss();

        let raw = self.backend.search(query).await.map_err(|e| {
            warn!("Search backend failed for {}: {}", query, e);
            metrics::record_upstream_error("search");
            RelayError::SearchFailed(e.to_string())
        })?;

        let videos: SearchResults = Arc::new(raw.into_iter().take(limit).map(normalize).collect());

        self.cache.set(key, Arc::clone(&videos));
        metrics::set_cache_entries(self.cache.size());

        Ok(videos)
    }
}

use crate::{
    cache::TtlCache,
    config::{Config, UpstreamType},
    relay::{SearchRelay, StreamRelay, search::SearchResults},
    server::origin_guard::AllowedOrigins,
    upstream::{InvidiousClient, SearchBackend, StreamResolver, UpstreamError, YtDlp},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Origin allow-list, fixed at startup
    pub allowed_origins: Arc<AllowedOrigins>,
    /// Search relay owning the result cache
    pub search: SearchRelay,
    /// Uncached stream info relay
    pub streams: StreamRelay,
    /// Prometheus render handle for `/metrics`
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Build state with the upstream provider selected by `config`.
    pub fn new(config: Config) -> Result<Self, UpstreamError> {
        let timeout = config.upstream_timeout();

        let (backend, resolver): (Arc<dyn SearchBackend>, Arc<dyn StreamResolver>) =
            match config.upstream {
                UpstreamType::Invidious => {
                    let base = config.invidious_url.as_deref().ok_or_else(|| {
                        UpstreamError::Malformed("INVIDIOUS_URL is not configured".to_string())
                    })?;
                    let client = Arc::new(InvidiousClient::new(base, timeout)?);
                    let backend: Arc<dyn SearchBackend> = client.clone();
                    let resolver: Arc<dyn StreamResolver> = client;
                    (backend, resolver)
                }
                UpstreamType::YtDlp => {
                    let ytdlp = Arc::new(YtDlp::new(
                        &config.ytdlp_path,
                        config.search_page_size,
                        timeout,
                    ));
                    let backend: Arc<dyn SearchBackend> = ytdlp.clone();
                    let resolver: Arc<dyn StreamResolver> = ytdlp;
                    (backend, resolver)
                }
            };

        Ok(Self::with_upstreams(config, backend, resolver))
    }

    /// Build state around explicit upstream implementations.
    pub fn with_upstreams(
        config: Config,
        backend: Arc<dyn SearchBackend>,
        resolver: Arc<dyn StreamResolver>,
    ) -> Self {
        let cache: TtlCache<SearchResults> =
            TtlCache::new(config.cache_ttl(), config.cache_max_entries);
        let allowed_origins = AllowedOrigins::new(config.allowed_origins.iter().cloned());

        Self {
            config: Arc::new(config),
            allowed_origins: Arc::new(allowed_origins),
            search: SearchRelay::new(backend, cache),
            streams: StreamRelay::new(resolver),
            metrics: crate::metrics::init(),
        }
    }

    /// Physical cache occupancy, stale entries included.
    pub fn cache_size(&self) -> usize {
        self.search.cache().size()
    }
}

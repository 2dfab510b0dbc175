pub mod handlers;
pub mod origin_guard;
pub mod state;

use crate::config::Config;
use axum::{Router, middleware, routing::get};
use state::AppState;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Build the router with all routes, the CORS layer and the origin guard.
///
/// The guard is the outermost layer so rejected origins never reach CORS
/// handling or a handler.
pub fn build_router(state: AppState) -> Router {
    let cors = origin_guard::cors_layer(state.allowed_origins.clone());

    Router::new()
        .route("/api/search", get(handlers::search::search_videos))
        .route("/api/video/{id}", get(handlers::video::video_info))
        .route("/api/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::serve_metrics))
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            origin_guard::origin_guard_middleware,
        ))
        .with_state(state)
}

/// Start the Axum HTTP server and run until `shutdown` is cancelled.
pub async fn start(
    config: Config,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);
    let sweep_every = config.cache_sweep_secs;

    let state = AppState::new(config)?;

    if sweep_every > 0 {
        state
            .search
            .cache()
            .spawn_sweeper(Duration::from_secs(sweep_every), shutdown.clone());
    }

    let origins: Vec<&str> = state.config.allowed_origins.iter().map(String::as_str).collect();
    let app = build_router(state.clone());

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🚂 Relay listening on http://{}", addr);
    info!("✅ CORS allowed origins: {}", origins.join(", "));
    if state.allowed_origins.is_empty() {
        warn!("ALLOWED_ORIGINS is empty, every request with an Origin header will be rejected");
    }

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

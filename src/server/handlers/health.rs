use crate::{metrics, models::HealthResponse, server::state::AppState};
use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};

/// Identity reported by the health endpoint.
pub const SERVER_NAME: &str = "railway-backend";

/// Liveness plus current cache occupancy. Always succeeds.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache_size = state.cache_size();
    metrics::set_cache_entries(cache_size);

    Json(HealthResponse {
        status: "healthy",
        server: SERVER_NAME,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        cache_size,
    })
}
